//! Price-series loading for the runner.
//!
//! Two sources:
//! 1. CSV files with the header `timestamp,open,high,low,close,volume`
//!    (column order free, names case-insensitive). Timestamps are RFC 3339
//!    or `YYYY-MM-DD` (midnight UTC). Empty numeric fields load as NaN and
//!    become void bars in the engine rather than load errors.
//! 2. A deterministic random walk seeded from the symbol name, for offline
//!    development. Synthetic series are tagged as such.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::Serialize;
use thiserror::Error;

use execlab_core::domain::{Market, PriceBar};

use crate::config::{DataSourceConfig, RunConfigError, SymbolConfig, SyntheticConfig};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in '{source_name}': {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("'{source_name}' has no '{column}' column")]
    MissingColumn {
        source_name: String,
        column: &'static str,
    },

    #[error("'{source_name}' row {row}: unparseable timestamp '{value}'")]
    Timestamp {
        source_name: String,
        row: usize,
        value: String,
    },

    #[error("'{source_name}' row {row}: column '{column}' is not a number: '{value}'")]
    Number {
        source_name: String,
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error(transparent)]
    Config(#[from] RunConfigError),
}

/// Where a loaded series came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { seed: u64 },
}

/// A symbol's series plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub symbol: String,
    pub market: Market,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
    /// BLAKE3 over timestamps and OHLCV bits.
    pub dataset_hash: String,
}

impl LoadedSeries {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }
}

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Load the configured source for one symbol.
pub fn load_symbol(symbol: &SymbolConfig) -> Result<LoadedSeries, LoadError> {
    let (bars, source) = match symbol.source()? {
        DataSourceConfig::Csv(path) => {
            let bars = load_csv(&path)?;
            (bars, DataSource::Csv { path })
        }
        DataSourceConfig::Synthetic(synthetic) => {
            let seed = synthetic_seed(&symbol.name, &synthetic);
            tracing::warn!(
                symbol = %symbol.name,
                seed,
                "using synthetic data; results are tagged as synthetic"
            );
            let bars = generate_synthetic_series(&symbol.name, symbol.market, &synthetic);
            (bars, DataSource::Synthetic { seed })
        }
    };
    tracing::debug!(symbol = %symbol.name, bars = bars.len(), "series loaded");
    Ok(LoadedSeries {
        symbol: symbol.name.clone(),
        market: symbol.market,
        dataset_hash: dataset_hash(&bars),
        bars,
        source,
    })
}

/// Load a CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<PriceBar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_csv(file, &path.display().to_string())
}

/// Parse CSV from any reader. `source_name` only labels errors.
pub fn read_csv<R: Read>(reader: R, source_name: &str) -> Result<Vec<PriceBar>, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        source_name: source_name.to_string(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let mut index = [0usize; 6];
    for (slot, column) in index.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
            .ok_or(LoadError::MissingColumn {
                source_name: source_name.to_string(),
                column,
            })?;
    }

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // Header is line 1.
        let row = i + 2;
        let field = |k: usize| record.get(index[k]).unwrap_or("");

        let raw_ts = field(0);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Timestamp {
            source_name: source_name.to_string(),
            row,
            value: raw_ts.to_string(),
        })?;

        let mut values = [0.0f64; 5];
        for (k, value) in values.iter_mut().enumerate() {
            let column = COLUMNS[k + 1];
            let raw = field(k + 1);
            *value = parse_number(raw).ok_or_else(|| LoadError::Number {
                source_name: source_name.to_string(),
                row,
                column,
                value: raw.to_string(),
            })?;
        }
        let [open, high, low, close, volume] = values;
        bars.push(PriceBar::new(timestamp, open, high, low, close, volume));
    }
    Ok(bars)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Empty fields are NaN; anything else must parse.
fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return Some(f64::NAN);
    }
    s.parse::<f64>().ok()
}

fn synthetic_seed(symbol: &str, config: &SyntheticConfig) -> u64 {
    config.seed.unwrap_or_else(|| {
        let hash = blake3::hash(symbol.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    })
}

/// Generate a synthetic daily series.
///
/// A uniform random walk from `start_price`. Equity markets skip weekends;
/// crypto trades every day. The same symbol and config always produce the
/// same bars.
pub fn generate_synthetic_series(
    symbol: &str,
    market: Market,
    config: &SyntheticConfig,
) -> Vec<PriceBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(synthetic_seed(symbol, config));
    let mut bars = Vec::with_capacity(config.bars);
    let mut price = config.start_price;
    let mut date = config.start_date;
    let move_bound = config.daily_move;

    while bars.len() < config.bars {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        if weekend && market != Market::Crypto {
            date += Duration::days(1);
            continue;
        }

        let daily_return: f64 = if move_bound > 0.0 {
            rng.gen_range(-move_bound..move_bound)
        } else {
            0.0
        };
        let open = price;
        let close = (price * (1.0 + daily_return)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();

        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_default();
        bars.push(PriceBar::new(timestamp, open, high, low, close, volume));

        price = close;
        date += Duration::days(1);
    }
    bars
}

/// Deterministic BLAKE3 hash over a series.
pub fn dataset_hash(bars: &[PriceBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_micros().to_le_bytes());
        for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_dates_and_rfc3339() {
        let csv = "timestamp,open,high,low,close,volume\n\
                   2024-01-02,100,102,99,101,1000\n\
                   2024-01-03T14:30:00Z,101,103,100,102,1100\n";
        let bars = read_csv(csv.as_bytes(), "inline").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp.to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert_eq!(bars[1].timestamp.to_rfc3339(), "2024-01-03T14:30:00+00:00");
        assert_eq!(bars[1].close, 102.0);
        assert_eq!(bars[1].volume, 1100.0);
    }

    #[test]
    fn column_order_and_case_are_free() {
        let csv = "Close,Volume,Timestamp,Open,High,Low\n101,5,2024-01-02,100,102,99\n";
        let bars = read_csv(csv.as_bytes(), "inline").unwrap();
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[0].volume, 5.0);
    }

    #[test]
    fn empty_fields_become_nan() {
        let csv = "timestamp,open,high,low,close,volume\n2024-01-02,100,,99,,\n";
        let bars = read_csv(csv.as_bytes(), "inline").unwrap();
        assert!(bars[0].high.is_nan());
        assert!(bars[0].close.is_nan());
        assert!(bars[0].volume.is_nan());
        assert!(bars[0].is_void());
    }

    #[test]
    fn garbage_number_is_an_error() {
        let csv = "timestamp,open,high,low,close,volume\n2024-01-02,abc,1,1,1,1\n";
        let err = read_csv(csv.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, LoadError::Number { row: 2, column: "open", .. }));
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let csv = "timestamp,open,high,low,close,volume\n01/02/2024,1,1,1,1,1\n";
        let err = read_csv(csv.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, LoadError::Timestamp { row: 2, .. }));
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,1,1,1\n";
        let err = read_csv(csv.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column: "volume", .. }));
    }

    #[test]
    fn synthetic_is_deterministic_per_symbol() {
        let config = SyntheticConfig {
            bars: 50,
            ..SyntheticConfig::default()
        };
        let a = generate_synthetic_series("SPY", Market::Us, &config);
        let b = generate_synthetic_series("SPY", Market::Us, &config);
        let c = generate_synthetic_series("QQQ", Market::Us, &config);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 50);
        assert!(a.iter().all(|bar| bar.is_sane() && bar.has_volume()));
    }

    #[test]
    fn synthetic_equities_skip_weekends() {
        let config = SyntheticConfig {
            bars: 20,
            ..SyntheticConfig::default()
        };
        let equities = generate_synthetic_series("SPY", Market::Us, &config);
        assert!(equities
            .iter()
            .all(|bar| !matches!(bar.timestamp.weekday(), Weekday::Sat | Weekday::Sun)));
        let crypto = generate_synthetic_series("BTC", Market::Crypto, &config);
        assert_eq!(
            (crypto[19].timestamp - crypto[0].timestamp).num_days(),
            19,
            "crypto series is calendar-daily"
        );
    }

    #[test]
    fn explicit_seed_overrides_symbol_hash() {
        let config = SyntheticConfig {
            bars: 10,
            seed: Some(42),
            ..SyntheticConfig::default()
        };
        let a = generate_synthetic_series("A", Market::Us, &config);
        let b = generate_synthetic_series("B", Market::Us, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let config = SyntheticConfig::default();
        let mut bars = generate_synthetic_series("SPY", Market::Us, &config);
        let before = dataset_hash(&bars);
        bars[3].close += 0.01;
        assert_ne!(before, dataset_hash(&bars));
    }
}
