//! Invariant tests for the band backtest over generated spreads.

use crate::backtest::{
    run_bollinger_backtest, run_multi_window_backtest, run_multi_window_backtest_parallel,
    TradeSide,
};
use crate::hedge::Spread;
use crate::tests::mock_data::{hourly_timestamps, lcg_noise};

fn mean_reverting_spread(count: usize, seed: u64) -> Spread {
    let noise = lcg_noise(count, seed);
    let mut values = Vec::with_capacity(count);
    let mut level = 0.0;
    for e in &noise {
        level = 0.9 * level + e;
        values.push(level);
    }
    Spread {
        timestamps: hourly_timestamps(count),
        values,
    }
}

#[test]
fn mean_reverting_spread_produces_trades() {
    let spread = mean_reverting_spread(300, 11);
    let result = run_bollinger_backtest(&spread, 20, 1.5, 0.0).unwrap();
    assert!(result.stats.num_trades > 0);
    assert!((0.0..=1.0).contains(&result.stats.win_rate));
    assert!(result.stats.max_drawdown <= 0.0);
}

#[test]
fn trades_are_chronological_and_consistent_with_their_side() {
    let spread = mean_reverting_spread(300, 11);
    let result = run_bollinger_backtest(&spread, 20, 1.5, 0.0).unwrap();
    let mut last_exit = None;
    for trade in &result.trades {
        assert!(trade.exit_time > trade.entry_time);
        if let Some(prev) = last_exit {
            assert!(trade.entry_time >= prev);
        }
        last_exit = Some(trade.exit_time);
        let gross = match trade.side {
            TradeSide::Long => trade.exit_spread - trade.entry_spread,
            TradeSide::Short => trade.entry_spread - trade.exit_spread,
        };
        assert!((trade.pnl - (gross - trade.fee)).abs() < 1e-12);
    }
}

#[test]
fn final_equity_equals_total_pnl() {
    let spread = mean_reverting_spread(250, 23);
    let result = run_bollinger_backtest(&spread, 15, 1.0, 0.05).unwrap();
    let last = result.equity_curve.last().copied().unwrap_or(0.0);
    assert!((last - result.stats.total_pnl).abs() < 1e-9);
}

#[test]
fn runs_are_deterministic() {
    let spread = mean_reverting_spread(200, 5);
    let first = run_bollinger_backtest(&spread, 12, 1.5, 0.02).unwrap();
    let second = run_bollinger_backtest(&spread, 12, 1.5, 0.02).unwrap();
    assert_eq!(first.trades.len(), second.trades.len());
    assert_eq!(first.equity_curve, second.equity_curve);
    assert_eq!(first.stats.total_pnl, second.stats.total_pnl);
}

#[test]
fn parallel_and_sequential_runners_agree_on_noise_data() {
    let spread = mean_reverting_spread(400, 31);
    let windows = [5, 10, 20, 40];
    let sequential = run_multi_window_backtest(&spread, &windows, 1.5, 0.01).unwrap();
    let parallel = run_multi_window_backtest_parallel(&spread, &windows, 1.5, 0.01).unwrap();
    for &window in &windows {
        assert_eq!(
            sequential[&window].equity_curve,
            parallel[&window].equity_curve
        );
        assert_eq!(
            sequential[&window].trades.len(),
            parallel[&window].trades.len()
        );
    }
}

#[test]
fn wider_bands_trade_less_often() {
    let spread = mean_reverting_spread(400, 31);
    let narrow = run_bollinger_backtest(&spread, 20, 0.5, 0.0).unwrap();
    let wide = run_bollinger_backtest(&spread, 20, 3.0, 0.0).unwrap();
    assert!(narrow.stats.num_trades >= wide.stats.num_trades);
}
