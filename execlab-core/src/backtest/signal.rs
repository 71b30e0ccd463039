//! Signal source trait and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{Market, PriceBar, Signal};

/// Produces a signal from the history up to and including the current bar.
///
/// Implementations must be pure functions of their inputs: the engine may
/// replay a series and expects identical signals. Sources are shared across
/// runner threads, hence `Send + Sync`.
pub trait SignalSource: Send + Sync {
    fn signal(&self, symbol: &str, history: &[PriceBar], market: Market) -> Signal;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> SignalSource for F
where
    F: Fn(&str, &[PriceBar], Market) -> Signal + Send + Sync,
{
    fn signal(&self, symbol: &str, history: &[PriceBar], market: Market) -> Signal {
        self(symbol, history, market)
    }
}

/// Shared flag checked between bars. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_signal_sources() {
        let source = |_: &str, history: &[PriceBar], _: Market| {
            if history.is_empty() {
                Signal::hold()
            } else {
                Signal::buy(90.0)
            }
        };
        assert_eq!(source.name(), "custom");
        assert_eq!(
            SignalSource::signal(&source, "X", &[], Market::Crypto),
            Signal::hold()
        );
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
