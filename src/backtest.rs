//! Single-position spread backtest driven by Bollinger bands.
//!
//! The strategy holds at most one unit of the spread at a time. From flat it
//! enters long when the spread touches the lower band and short when it
//! touches the upper band; positions exit when the spread crosses back
//! through the rolling mean. All threshold comparisons are inclusive. The
//! equity curve records cumulative realized profit at every timestamp, so it
//! only moves on exit bars.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Result;
use crate::hedge::Spread;
use crate::math;
use crate::signals::{self, BollingerBands};

/// Direction of a spread position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    /// Bought the spread at the lower band.
    Long,
    /// Sold the spread at the upper band.
    Short,
}

/// One completed round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// When the position was opened.
    pub entry_time: DateTime<FixedOffset>,
    /// When the position was closed.
    pub exit_time: DateTime<FixedOffset>,
    /// Position direction.
    pub side: TradeSide,
    /// Spread value at entry.
    pub entry_spread: f64,
    /// Spread value at exit.
    pub exit_spread: f64,
    /// Realized profit net of the round-trip fee.
    pub pnl: f64,
    /// Round-trip fee charged on exit.
    pub fee: f64,
}

/// Aggregate performance statistics of a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    /// Completed round trips.
    pub num_trades: usize,
    /// Fraction of trades with strictly positive profit.
    pub win_rate: f64,
    /// Mean profit across winning trades, 0.0 when there are none.
    pub avg_win: f64,
    /// Mean profit across losing trades (negative), 0.0 when there are none.
    pub avg_loss: f64,
    /// Sum of realized profits.
    pub total_pnl: f64,
    /// Mean over standard deviation of per-bar equity changes; 0.0 when the
    /// changes have no variance.
    pub sharpe: f64,
    /// Most negative excursion of equity below its running maximum (<= 0).
    pub max_drawdown: f64,
}

/// Everything produced by one backtest run at a single window length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Bollinger window length used.
    pub window: usize,
    /// The bands the signals were generated from.
    pub bands: BollingerBands,
    /// Completed round trips in chronological order.
    pub trades: Vec<Trade>,
    /// Timestamp index, shared with the input spread.
    pub timestamps: Vec<DateTime<FixedOffset>>,
    /// Cumulative realized profit at every timestamp.
    pub equity_curve: Vec<f64>,
    /// Summary statistics.
    pub stats: BacktestStats,
}

/// Compute summary statistics from an equity curve and its trades.
///
/// An empty equity curve or trade list yields all-zero statistics rather
/// than NaNs.
pub fn compute_stats(equity: &[f64], trades: &[Trade]) -> BacktestStats {
    let num_trades = trades.len();
    let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();

    let win_rate = if num_trades == 0 {
        0.0
    } else {
        wins.len() as f64 / num_trades as f64
    };
    let avg_win = if wins.is_empty() { 0.0 } else { math::mean(&wins) };
    let avg_loss = if losses.is_empty() {
        0.0
    } else {
        math::mean(&losses)
    };
    let total_pnl = trades.iter().map(|t| t.pnl).sum();

    let sharpe = if equity.len() < 2 {
        0.0
    } else {
        let diffs: Vec<f64> = equity.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = math::mean(&diffs);
        let std = math::population_std(&diffs, mean);
        if std == 0.0 {
            0.0
        } else {
            mean / std
        }
    };

    let mut running_max = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0f64;
    for &value in equity {
        running_max = running_max.max(value);
        max_drawdown = max_drawdown.min(value - running_max);
    }

    BacktestStats {
        num_trades,
        win_rate,
        avg_win,
        avg_loss,
        total_pnl,
        sharpe,
        max_drawdown,
    }
}

struct OpenPosition {
    side: TradeSide,
    entry_time: DateTime<FixedOffset>,
    entry_spread: f64,
}

/// Run the band strategy over a spread at one window length.
///
/// `fee` is charged once per round trip, on exit. A position still open at
/// the end of the series is discarded without realizing profit. An empty
/// spread produces a result with no trades and zeroed statistics.
pub fn run_bollinger_backtest(
    spread: &Spread,
    window: usize,
    num_std: f64,
    fee: f64,
) -> Result<BacktestResult> {
    let bands = signals::compute_bollinger_bands(spread, window, num_std)?;

    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve = Vec::with_capacity(spread.len());
    let mut realized = 0.0f64;
    let mut position: Option<OpenPosition> = None;

    for i in 0..spread.len() {
        let value = spread.values[i];
        let defined = (bands.mean[i], bands.upper[i], bands.lower[i]);
        if let (Some(mean), Some(upper), Some(lower)) = defined {
            match &position {
                Some(open) => {
                    let exits = match open.side {
                        TradeSide::Long => value >= mean,
                        TradeSide::Short => value <= mean,
                    };
                    if exits {
                        let gross = match open.side {
                            TradeSide::Long => value - open.entry_spread,
                            TradeSide::Short => open.entry_spread - value,
                        };
                        let pnl = gross - fee;
                        realized += pnl;
                        trades.push(Trade {
                            entry_time: open.entry_time,
                            exit_time: spread.timestamps[i],
                            side: open.side,
                            entry_spread: open.entry_spread,
                            exit_spread: value,
                            pnl,
                            fee,
                        });
                        position = None;
                    }
                }
                None => {
                    if value <= lower {
                        position = Some(OpenPosition {
                            side: TradeSide::Long,
                            entry_time: spread.timestamps[i],
                            entry_spread: value,
                        });
                    } else if value >= upper {
                        position = Some(OpenPosition {
                            side: TradeSide::Short,
                            entry_time: spread.timestamps[i],
                            entry_spread: value,
                        });
                    }
                }
            }
        }
        equity_curve.push(realized);
    }

    if position.is_some() {
        debug!(window, "position still open at end of series, discarded");
    }

    let stats = compute_stats(&equity_curve, &trades);
    debug!(
        window,
        trades = stats.num_trades,
        total_pnl = stats.total_pnl,
        "backtest complete"
    );

    Ok(BacktestResult {
        window,
        bands,
        trades,
        timestamps: spread.timestamps.clone(),
        equity_curve,
        stats,
    })
}

/// Run the strategy once per window length, sequentially.
pub fn run_multi_window_backtest(
    spread: &Spread,
    windows: &[usize],
    num_std: f64,
    fee: f64,
) -> Result<BTreeMap<usize, BacktestResult>> {
    let mut results = BTreeMap::new();
    for &window in windows {
        results.insert(window, run_bollinger_backtest(spread, window, num_std, fee)?);
    }
    info!(windows = windows.len(), "multi-window backtest complete");
    Ok(results)
}

/// Parallel variant of [`run_multi_window_backtest`]. Window runs are
/// independent, so results are identical to the sequential version.
pub fn run_multi_window_backtest_parallel(
    spread: &Spread,
    windows: &[usize],
    num_std: f64,
    fee: f64,
) -> Result<BTreeMap<usize, BacktestResult>> {
    let results = windows
        .par_iter()
        .map(|&window| {
            run_bollinger_backtest(spread, window, num_std, fee).map(|result| (window, result))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;
    info!(windows = windows.len(), "multi-window backtest complete");
    Ok(results)
}
