//! Market identity: exchange timezone and regular trading session.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Supported markets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Market {
    #[default]
    Us,
    Kr,
    Crypto,
}

/// Regular session in exchange-local time, `[open, close)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingSession {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Us, Market::Kr, Market::Crypto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Us => "US",
            Market::Kr => "KR",
            Market::Crypto => "CRYPTO",
        }
    }

    /// Exchange timezone used to compute local time of day.
    pub fn timezone(&self) -> Tz {
        match self {
            Market::Us => chrono_tz::America::New_York,
            Market::Kr => chrono_tz::Asia::Seoul,
            Market::Crypto => chrono_tz::UTC,
        }
    }

    /// Regular trading session. Crypto trades around the clock and has none.
    pub fn session(&self) -> Option<TradingSession> {
        let (open, close) = match self {
            Market::Us => ((9, 30), (16, 0)),
            Market::Kr => ((9, 0), (15, 30)),
            Market::Crypto => return None,
        };
        Some(TradingSession {
            open: NaiveTime::from_hms_opt(open.0, open.1, 0)?,
            close: NaiveTime::from_hms_opt(close.0, close.1, 0)?,
        })
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Market::Us),
            "KR" => Ok(Market::Kr),
            "CRYPTO" => Ok(Market::Crypto),
            _ => Err(ConfigError::UnknownMarket(s.to_string())),
        }
    }
}
