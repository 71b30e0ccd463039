//! Property tests for execution invariants.
//!
//! Uses proptest to verify:
//! 1. Quantity conservation: filled + remaining == requested, fill rate in [floor, 1]
//! 2. Fill-rate monotonicity: larger orders never fill a larger fraction, both
//!    on the curves and through the simulator on one bar
//! 3. Impact ordering: impact models grow with participation, and a fill's
//!    `market_impact` never shrinks as the order grows (ADV and bar-volume paths)
//! 4. Slippage direction: buys never fill below, sells never above, the reference
//! 5. Queue bound: no carryover outlives the maximum queue duration
//! 6. Statistics equivalence: incremental and full-rescan runs agree

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use execlab_core::backtest::{BacktestConfig, BacktestEngine, StatsMode};
use execlab_core::domain::{Market, OrderSide, PriceBar, Signal};
use execlab_core::fill::{FillConfig, FillRateModel, PartialFillSimulator};
use execlab_core::slippage::{BarContext, ImpactModel, SlippageConfig, SlippageModel};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..5_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_quantity() -> impl Strategy<Value = f64> {
    (1.0..1_000_000.0_f64).prop_map(|q| q.round())
}

fn arb_volume() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => (1.0..10_000_000.0_f64),
        1 => Just(0.0),
        1 => Just(-5.0),
        1 => Just(f64::NAN),
    ]
}

fn arb_side() -> impl Strategy<Value = OrderSide> {
    prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)]
}

fn arb_fill_model() -> impl Strategy<Value = FillRateModel> {
    prop_oneof![
        (0.1..10.0_f64).prop_map(|steepness| FillRateModel::Linear { steepness }),
        (0.1..20.0_f64).prop_map(|decay| FillRateModel::Exponential { decay }),
    ]
}

fn arb_bar(price: f64, volume: f64, range: f64, hour: u32) -> PriceBar {
    let ts = Utc.with_ymd_and_hms(2024, 5, 6, hour, 0, 0).unwrap();
    PriceBar::new(ts, price, price * (1.0 + range), price * (1.0 - range), price, volume)
}

fn simulator(model: FillRateModel, max_queue: usize) -> PartialFillSimulator {
    let slippage = SlippageModel::new(SlippageConfig::default()).unwrap();
    let config = FillConfig::default()
        .with_model(model)
        .with_max_queue_duration(max_queue);
    PartialFillSimulator::new(config, slippage, Market::Us).unwrap()
}

/// Random-walk closes driven by a vector of per-bar moves.
fn walk_series(moves: &[f64]) -> Vec<PriceBar> {
    let start = Utc.with_ymd_and_hms(2022, 1, 3, 21, 0, 0).unwrap();
    let mut close = 100.0;
    moves
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let open = close;
            close = (close * (1.0 + m)).max(1.0);
            PriceBar::new(
                start + Duration::days(i as i64),
                open,
                open.max(close) * 1.005,
                open.min(close) * 0.995,
                close,
                200_000.0,
            )
        })
        .collect()
}

fn crossover_source(_: &str, history: &[PriceBar], _: Market) -> Signal {
    let n = history.len();
    if n < 10 {
        return Signal::hold();
    }
    let fast: f64 = history[n - 3..].iter().map(|b| b.close).sum::<f64>() / 3.0;
    let slow: f64 = history[n - 10..].iter().map(|b| b.close).sum::<f64>() / 10.0;
    if fast > slow * 1.002 {
        Signal::buy(65.0)
    } else if fast < slow * 0.998 {
        Signal::sell(65.0)
    } else {
        Signal::hold()
    }
}

// ── 1. Quantity Conservation ─────────────────────────────────────────

proptest! {
    #[test]
    fn filled_plus_remaining_is_requested(
        price in arb_price(),
        qty in arb_quantity(),
        volume in arb_volume(),
        side in arb_side(),
        model in arb_fill_model(),
    ) {
        let mut sim = simulator(model, 5);
        let bar = arb_bar(price, volume, 0.01, 15);
        let result = sim.simulate_fill(price, qty, side, &bar, 0);

        prop_assert!((result.filled_quantity + result.remaining_quantity - qty).abs() <= 1e-6 * qty);
        prop_assert!(result.fill_rate >= 0.3 - 1e-12);
        prop_assert!(result.fill_rate <= 1.0);
        prop_assert!(result.filled_quantity >= 0.0);
        prop_assert!(result.remaining_quantity >= 0.0);
        prop_assert_eq!(result.carryover.is_some(), result.remaining_quantity > 0.0);
    }
}

// ── 2. Fill-Rate Monotonicity ────────────────────────────────────────

proptest! {
    /// Fill rate is non-increasing in the liquidity ratio.
    #[test]
    fn fill_rate_non_increasing(
        model in arb_fill_model(),
        a in 0.0..50.0_f64,
        b in 0.0..50.0_f64,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let r_lo = model.fill_rate(lo, 0.1, 0.3);
        let r_hi = model.fill_rate(hi, 0.1, 0.3);
        prop_assert!(r_hi <= r_lo + 1e-12, "rate({hi}) = {r_hi} > rate({lo}) = {r_lo}");
    }

    /// Through the simulator: on one bar and side, a larger order never fills
    /// a larger fraction. Covers zero, negative and NaN volume bars.
    #[test]
    fn simulated_fill_rate_non_increasing_in_quantity(
        price in arb_price(),
        a in arb_quantity(),
        b in arb_quantity(),
        volume in arb_volume(),
        side in arb_side(),
        model in arb_fill_model(),
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let bar = arb_bar(price, volume, 0.01, 15);
        let small = simulator(model.clone(), 5).simulate_fill(price, lo, side, &bar, 0);
        let large = simulator(model, 5).simulate_fill(price, hi, side, &bar, 0);
        prop_assert!(
            large.fill_rate <= small.fill_rate + 1e-12,
            "qty {hi} filled {} > qty {lo} filled {}", large.fill_rate, small.fill_rate
        );
    }

    /// Everything at or under the threshold fills completely.
    #[test]
    fn under_threshold_fills_fully(model in arb_fill_model(), ratio in 0.0..=0.1_f64) {
        prop_assert_eq!(model.fill_rate(ratio, 0.1, 0.3), 1.0);
    }
}

// ── 3. Impact Ordering ───────────────────────────────────────────────

proptest! {
    #[test]
    fn square_root_dominates_linear_below_one(
        p in 1e-6..1.0_f64,
        coefficient in 0.01..1.0_f64,
    ) {
        let linear = ImpactModel::Linear { coefficient }.rate(p);
        let sqrt = ImpactModel::SquareRoot { coefficient }.rate(p);
        prop_assert!(sqrt >= linear);
    }

    /// Every model grows with participation.
    #[test]
    fn impact_non_decreasing(a in 0.0..10.0_f64, b in 0.0..10.0_f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        for model in [
            ImpactModel::Linear { coefficient: 0.1 },
            ImpactModel::SquareRoot { coefficient: 0.1 },
            ImpactModel::AlmgrenChriss { temporary: 0.05, permanent: 0.1 },
        ] {
            prop_assert!(model.rate(hi) >= model.rate(lo));
        }
    }
}

proptest! {
    /// `FillResult::market_impact` is non-decreasing in order size for a fixed
    /// bar and side, with ADV impact configured or on the bar-volume fallback.
    #[test]
    fn simulated_market_impact_non_decreasing(
        price in arb_price(),
        a in arb_quantity(),
        b in arb_quantity(),
        volume in arb_volume(),
        side in arb_side(),
        adv in prop::option::of(1_000.0..1e8_f64),
        impact in prop_oneof![
            (0.01..1.0_f64).prop_map(|coefficient| ImpactModel::Linear { coefficient }),
            (0.01..1.0_f64).prop_map(|coefficient| ImpactModel::SquareRoot { coefficient }),
            ((0.01..1.0_f64), (0.01..1.0_f64))
                .prop_map(|(temporary, permanent)| ImpactModel::AlmgrenChriss { temporary, permanent }),
        ],
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut config = SlippageConfig::default().with_impact_model(impact);
        if let Some(adv) = adv {
            config = config.with_adv(adv);
        }
        let build = || {
            PartialFillSimulator::new(
                FillConfig::default(),
                SlippageModel::new(config.clone()).unwrap(),
                Market::Us,
            )
            .unwrap()
        };
        let bar = arb_bar(price, volume, 0.01, 15);
        let small = build().simulate_fill(price, lo, side, &bar, 0);
        let large = build().simulate_fill(price, hi, side, &bar, 0);
        prop_assert!(small.market_impact >= 0.0);
        prop_assert!(
            large.market_impact >= small.market_impact,
            "qty {hi} impact {} < qty {lo} impact {}", large.market_impact, small.market_impact
        );
    }
}

// ── 4. Slippage Direction ────────────────────────────────────────────

proptest! {
    #[test]
    fn slippage_always_adverse(
        price in arb_price(),
        qty in arb_quantity(),
        range in 0.0..0.2_f64,
        hour in 0u32..24,
        adv in prop::option::of(1_000.0..1e8_f64),
    ) {
        let mut config = SlippageConfig::default();
        if let Some(adv) = adv {
            config = config.with_adv(adv);
        }
        let model = SlippageModel::new(config).unwrap();
        let bar = arb_bar(price, 1e6, range, hour);

        let buy = model.calculate(price, OrderSide::Buy, qty, Some(BarContext::new(&bar, Market::Us)));
        let sell = model.calculate(price, OrderSide::Sell, qty, Some(BarContext::new(&bar, Market::Us)));
        prop_assert!(buy.adjusted_price >= price);
        prop_assert!(sell.adjusted_price <= price);
        prop_assert!(sell.adjusted_price > 0.0);
        prop_assert!(buy.slippage_rate >= 0.0 && buy.slippage_rate <= model.config().max_rate);
        prop_assert_eq!(buy.slippage_rate, sell.slippage_rate);
    }

    /// Fill prices through the simulator are adverse too.
    #[test]
    fn fill_price_always_adverse(
        price in arb_price(),
        qty in arb_quantity(),
        volume in arb_volume(),
        side in arb_side(),
    ) {
        let mut sim = simulator(FillRateModel::default(), 5);
        let bar = arb_bar(price, volume, 0.02, 14);
        let result = sim.simulate_fill(price, qty, side, &bar, 0);
        match side {
            OrderSide::Buy => prop_assert!(result.fill_price >= price),
            OrderSide::Sell => prop_assert!(result.fill_price <= price),
        }
    }
}

// ── 5. Queue Bound ───────────────────────────────────────────────────

proptest! {
    /// After each processing step, every queued order is within its age limit
    /// and the queue only holds remainders of submitted orders.
    #[test]
    fn queue_never_exceeds_max_duration(
        max_queue in 0usize..6,
        submissions in prop::collection::vec((arb_quantity(), arb_side()), 1..8),
        volumes in prop::collection::vec(10.0..100_000.0_f64, 1..20),
    ) {
        let mut sim = simulator(FillRateModel::default(), max_queue);
        for (i, (qty, side)) in submissions.iter().enumerate() {
            sim.simulate_fill(100.0, *qty, *side, &arb_bar(100.0, 1_000.0, 0.01, 15), i);
        }
        let start = submissions.len();
        for (offset, volume) in volumes.iter().enumerate() {
            let t = start + offset;
            sim.process_queued_orders(&arb_bar(100.0, *volume, 0.01, 15), t).unwrap();
            let status = sim.queue_status();
            prop_assert!(status.total_orders <= submissions.len());
            for order in &status.orders {
                prop_assert!(order.bars_in_queue <= max_queue);
                prop_assert!(t - order.created_bar <= max_queue);
            }
        }
    }
}

// ── 6. Statistics Equivalence ────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn incremental_matches_full_rescan(
        moves in prop::collection::vec(-0.04..0.04_f64, 30..250),
    ) {
        let series = walk_series(&moves);
        let base = BacktestConfig::default().with_min_lookback(10);
        let incremental = BacktestEngine::new(
            base.clone().with_stats_mode(StatsMode::Incremental),
            SlippageConfig::default(),
            FillConfig::default(),
        )
        .unwrap();
        let rescan = BacktestEngine::new(
            base.with_stats_mode(StatsMode::FullRescan),
            SlippageConfig::default(),
            FillConfig::default(),
        )
        .unwrap();

        let a = incremental.run_backtest("PROP", &series, Market::Us, &crossover_source).unwrap();
        let b = rescan.run_backtest("PROP", &series, Market::Us, &crossover_source).unwrap();
        prop_assert_eq!(a.total_trades, b.total_trades);
        prop_assert_eq!(a.winning_trades, b.winning_trades);
        prop_assert!((a.win_rate - b.win_rate).abs() < 1e-6);
        prop_assert!((a.total_return - b.total_return).abs() < 1e-6);
        prop_assert!((a.directional_accuracy - b.directional_accuracy).abs() < 1e-6);
        prop_assert_eq!(a.total_trades, a.winning_trades + a.losing_trades);
    }
}
