//! Time-of-day premium from the bar timestamp in exchange-local time.

use chrono::{DateTime, Utc};

use super::config::TimeOfDayConfig;
use crate::domain::Market;

/// Which end of the session a timestamp falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionWindow {
    Open,
    Close,
    Regular,
    /// Outside the session, or a market without one.
    Outside,
}

/// Classify a timestamp against the market's regular session.
///
/// The open window is `[open, open + window)`; the close window is
/// `(close - window, close)`. When the two overlap the open window wins.
pub fn session_window(timestamp: DateTime<Utc>, market: Market, window_minutes: u32) -> SessionWindow {
    let Some(session) = market.session() else {
        return SessionWindow::Outside;
    };
    let local = timestamp.with_timezone(&market.timezone()).time();
    if local < session.open || local >= session.close {
        return SessionWindow::Outside;
    }
    let window = i64::from(window_minutes) * 60;
    let since_open = (local - session.open).num_seconds();
    let until_close = (session.close - local).num_seconds();
    if since_open < window {
        SessionWindow::Open
    } else if until_close < window {
        SessionWindow::Close
    } else {
        SessionWindow::Regular
    }
}

/// Time-of-day slippage rate (fraction) for a bar timestamp.
pub fn time_of_day_rate(config: &TimeOfDayConfig, timestamp: DateTime<Utc>, market: Market) -> f64 {
    if !config.enabled {
        return 0.0;
    }
    match session_window(timestamp, market, config.window_minutes) {
        SessionWindow::Open => config.open_premium_bps / 10_000.0,
        SessionWindow::Close => config.close_premium_bps / 10_000.0,
        SessionWindow::Regular | SessionWindow::Outside => 0.0,
    }
}
