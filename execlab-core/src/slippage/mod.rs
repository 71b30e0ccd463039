//! Slippage model: decomposes execution cost into named components.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive
//! less (lower price). The total rate is the sum of
//! - base: fixed cost, always applied
//! - spread: half the configured spread proxy
//! - time of day: premium near the session open/close (exchange-local time)
//! - volatility: fraction of the intrabar range; on panic bars scaled up and
//!   charged a flat panic premium
//! - order size: market impact of `quantity / ADV`
//!
//! capped at `max_rate`. Degenerate inputs fall back to base + spread.

pub mod config;
pub mod impact;
pub mod session;

pub use config::{ImpactConfig, PanicConfig, SlippageConfig, TimeOfDayConfig, VolatilityConfig};
pub use impact::ImpactModel;
pub use session::SessionWindow;

use serde::{Deserialize, Serialize};

use crate::domain::{Market, OrderSide, PriceBar};
use crate::error::ConfigError;

/// Bar-level context for the optional slippage components.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub bar: &'a PriceBar,
    pub market: Market,
}

impl<'a> BarContext<'a> {
    pub fn new(bar: &'a PriceBar, market: Market) -> Self {
        Self { bar, market }
    }
}

/// Named contributions to the slippage rate, each a fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlippageBreakdown {
    pub base: f64,
    pub spread: f64,
    pub time_of_day: f64,
    pub volatility: f64,
    pub order_size: f64,
}

impl SlippageBreakdown {
    /// Uncapped sum of the components.
    pub fn total(&self) -> f64 {
        self.base + self.spread + self.time_of_day + self.volatility + self.order_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlippageResult {
    pub reference_price: f64,
    pub adjusted_price: f64,
    /// Applied rate: `breakdown.total()` capped at `max_rate`.
    pub slippage_rate: f64,
    pub breakdown: SlippageBreakdown,
    /// The bar range exceeded the panic threshold.
    pub panic: bool,
}

/// Slippage calculator. Owned by one simulator; mutated only through
/// `update_config` and `adjust_for_liquidity`.
#[derive(Debug, Clone)]
pub struct SlippageModel {
    config: SlippageConfig,
    /// Last explicitly configured values; liquidity adjustments scale from here.
    baseline: SlippageConfig,
    liquidity_score: Option<f64>,
}

impl SlippageModel {
    pub fn new(config: SlippageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            baseline: config.clone(),
            config,
            liquidity_score: None,
        })
    }

    /// Effective configuration, including any liquidity adjustment.
    pub fn config(&self) -> &SlippageConfig {
        &self.config
    }

    pub fn liquidity_score(&self) -> Option<f64> {
        self.liquidity_score
    }

    /// Replace the configuration. Clears any liquidity adjustment.
    pub fn update_config(&mut self, config: SlippageConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.baseline = config.clone();
        self.config = config;
        self.liquidity_score = None;
        Ok(())
    }

    /// Rescale spread and impact for a liquidity score in [0, 1] (1 = most liquid).
    ///
    /// Factor is `0.5 + (1 - score)`: a fully liquid name pays half the
    /// configured spread/impact, an illiquid one 1.5x. Always computed from the
    /// baseline, so repeated calls do not compound. Returns the factor applied.
    pub fn adjust_for_liquidity(&mut self, score: f64) -> Result<f64, ConfigError> {
        if !score.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "liquidity_score",
                expected: "finite",
                value: score,
            });
        }
        let score = score.clamp(0.0, 1.0);
        let factor = 0.5 + (1.0 - score);

        let mut adjusted = self.baseline.clone();
        adjusted.spread_bps *= factor;
        adjusted.impact.model = adjusted.impact.model.scaled(factor);
        // Widening the spread may push the floor above the cap.
        let floor = adjusted.base_rate() + adjusted.half_spread_rate();
        if floor > adjusted.max_rate {
            adjusted.spread_bps = ((adjusted.max_rate - adjusted.base_rate()) * 2.0 * 10_000.0).max(0.0);
        }

        self.config = adjusted;
        self.liquidity_score = Some(score);
        tracing::debug!(score, factor, "slippage adjusted for liquidity");
        Ok(factor)
    }

    /// ADV-based impact is configured and usable.
    pub fn has_impact(&self) -> bool {
        self.config.impact.active_adv().is_some()
    }

    /// Market-impact rate for `quantity` alone (0 when impact is inactive).
    pub fn order_size_rate(&self, quantity: f64) -> f64 {
        match self.config.impact.active_adv() {
            Some(adv) => self.config.impact.model.rate(quantity / adv),
            None => 0.0,
        }
    }

    /// Compute the components without applying them to a price.
    pub fn breakdown(
        &self,
        reference_price: f64,
        quantity: f64,
        bar: Option<BarContext<'_>>,
    ) -> (SlippageBreakdown, bool) {
        let cfg = &self.config;
        let mut breakdown = SlippageBreakdown {
            base: cfg.base_rate(),
            spread: cfg.half_spread_rate(),
            ..SlippageBreakdown::default()
        };
        if !(reference_price.is_finite() && reference_price > 0.0) || cfg.impact.adv_unusable() {
            return (breakdown, false);
        }
        let bar = match bar {
            Some(ctx) if !(ctx.bar.close.is_finite() && ctx.bar.close > 0.0) => return (breakdown, false),
            other => other,
        };

        let mut panic = false;
        if let Some(ctx) = bar {
            breakdown.time_of_day =
                session::time_of_day_rate(&cfg.time_of_day, ctx.bar.timestamp, ctx.market);
            if let Some(range) = ctx.bar.range_pct() {
                panic = cfg.panic.enabled && range > cfg.panic.threshold;
                if panic {
                    breakdown.volatility = range * cfg.volatility.multiplier * cfg.panic.multiplier
                        + cfg.panic.premium_rate();
                    tracing::debug!(range, threshold = cfg.panic.threshold, "panic bar");
                } else if cfg.volatility.enabled {
                    breakdown.volatility = range * cfg.volatility.multiplier;
                }
            }
        }
        breakdown.order_size = self.order_size_rate(quantity);
        (breakdown, panic)
    }

    /// Slippage for an order at `reference_price`.
    pub fn calculate(
        &self,
        reference_price: f64,
        side: OrderSide,
        quantity: f64,
        bar: Option<BarContext<'_>>,
    ) -> SlippageResult {
        let (breakdown, panic) = self.breakdown(reference_price, quantity, bar);
        let slippage_rate = self.cap(breakdown.total());
        SlippageResult {
            reference_price,
            adjusted_price: apply_rate(reference_price, side, slippage_rate),
            slippage_rate,
            breakdown,
            panic,
        }
    }

    /// Clamp a rate into `[0, max_rate]`.
    pub fn cap(&self, rate: f64) -> f64 {
        if rate.is_nan() {
            return 0.0;
        }
        rate.clamp(0.0, self.config.max_rate)
    }
}

/// Move a price against the order by `rate`.
pub fn apply_rate(reference_price: f64, side: OrderSide, rate: f64) -> f64 {
    if rate == 0.0 {
        return reference_price;
    }
    reference_price * (1.0 + side.sign() * rate)
}
