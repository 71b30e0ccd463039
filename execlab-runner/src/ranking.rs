//! Ranking and screening of per-symbol reports.
//!
//! Reports below `min_trades` are screened out, the rest are sorted by the
//! chosen metric (higher is better) with ties broken by symbol name, so the
//! order is stable regardless of thread completion order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use execlab_core::backtest::PerformanceReport;
use execlab_core::domain::Market;

/// Which report field to sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    WinRate,
    TotalReturn,
    DirectionalAccuracy,
    AverageReturn,
    /// Worst trade, so the least painful loser ranks first.
    WorstTrade,
}

impl RankingMetric {
    pub fn name(&self) -> &'static str {
        match self {
            RankingMetric::WinRate => "win_rate",
            RankingMetric::TotalReturn => "total_return",
            RankingMetric::DirectionalAccuracy => "directional_accuracy",
            RankingMetric::AverageReturn => "average_return",
            RankingMetric::WorstTrade => "worst_trade",
        }
    }

    /// Metric value for a report. Zero-trade reports score 0 on every metric.
    pub fn value(&self, report: &PerformanceReport) -> f64 {
        match self {
            RankingMetric::WinRate => report.win_rate,
            RankingMetric::TotalReturn => report.total_return,
            RankingMetric::DirectionalAccuracy => report.directional_accuracy,
            RankingMetric::AverageReturn => report.average_return,
            RankingMetric::WorstTrade => report.worst_trade.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub metric: RankingMetric,
    /// Reports with fewer completed trades are left out of the ranking.
    pub min_trades: usize,
    /// Keep only the best N; `None` keeps all.
    pub top_n: Option<usize>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            metric: RankingMetric::default(),
            min_trades: 1,
            top_n: None,
        }
    }
}

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based.
    pub rank: usize,
    pub symbol: String,
    pub market: Market,
    pub metric: RankingMetric,
    pub score: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_return: f64,
}

/// Screen and sort reports.
pub fn rank(reports: &[PerformanceReport], config: &RankingConfig) -> Vec<RankedEntry> {
    let mut eligible: Vec<(&PerformanceReport, f64)> = reports
        .iter()
        .filter(|r| r.total_trades >= config.min_trades)
        .map(|r| (r, config.metric.value(r)))
        .collect();

    eligible.sort_by(|(ra, a), (rb, b)| match b.total_cmp(a) {
        Ordering::Equal => ra.symbol.cmp(&rb.symbol),
        other => other,
    });
    if let Some(n) = config.top_n {
        eligible.truncate(n);
    }

    eligible
        .into_iter()
        .enumerate()
        .map(|(i, (report, score))| RankedEntry {
            rank: i + 1,
            symbol: report.symbol.clone(),
            market: report.market,
            metric: config.metric,
            score,
            total_trades: report.total_trades,
            win_rate: report.win_rate,
            total_return: report.total_return,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use execlab_core::backtest::StatsMode;

    fn report(symbol: &str, trades: usize, win_rate: f64, total_return: f64) -> PerformanceReport {
        let mut r = PerformanceReport::empty(symbol, Market::Us, StatsMode::Incremental);
        r.total_trades = trades;
        r.win_rate = win_rate;
        r.total_return = total_return;
        r
    }

    #[test]
    fn sorts_descending_and_screens() {
        let reports = vec![
            report("A", 10, 40.0, 5.0),
            report("B", 10, 60.0, -2.0),
            report("C", 0, 0.0, 0.0),
            report("D", 3, 55.0, 8.0),
        ];
        let ranked = rank(&reports, &RankingConfig::default());
        let order: Vec<&str> = ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ties_break_by_symbol() {
        let reports = vec![report("Z", 5, 50.0, 1.0), report("M", 5, 50.0, 2.0)];
        let ranked = rank(&reports, &RankingConfig::default());
        assert_eq!(ranked[0].symbol, "M");
        assert_eq!(ranked[1].symbol, "Z");
    }

    #[test]
    fn metric_and_top_n() {
        let reports = vec![
            report("A", 10, 40.0, 5.0),
            report("B", 10, 60.0, -2.0),
            report("D", 3, 55.0, 8.0),
        ];
        let config = RankingConfig {
            metric: RankingMetric::TotalReturn,
            min_trades: 5,
            top_n: Some(1),
        };
        let ranked = rank(&reports, &config);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "A");
        assert_eq!(ranked[0].score, 5.0);
    }

    #[test]
    fn metric_parses_snake_case() {
        let config: RankingConfig = toml::from_str("metric = \"directional_accuracy\"").unwrap();
        assert_eq!(config.metric, RankingMetric::DirectionalAccuracy);
        assert_eq!(config.min_trades, 1);
    }
}
