use crate::models::*;
use serde::Serialize;
use statrs::statistics::Statistics;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub drawdown_stops: usize,
    pub win_rate: f64,
    pub net_pnl: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return_percent: f64,
    pub avg_trade_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub skipped_entries: usize,
}

impl PerformanceSummary {
    pub fn from_outcome(outcome: &BacktestOutcome) -> Self {
        let pnls: Vec<f64> = outcome.trades.iter().map(|trade| trade.pnl).collect();
        let total_trades = pnls.len();
        let winning_trades = pnls.iter().filter(|pnl| **pnl > 0.0).count();
        let losing_trades = pnls.iter().filter(|pnl| **pnl < 0.0).count();
        let drawdown_stops = outcome
            .trades
            .iter()
            .filter(|trade| trade.exit_reason == ExitReason::DrawdownStop)
            .count();

        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };
        let avg_trade_pnl = if pnls.is_empty() {
            0.0
        } else {
            pnls.iter().mean()
        };
        let best_trade = if pnls.is_empty() {
            0.0
        } else {
            Statistics::max(pnls.iter())
        };
        let worst_trade = if pnls.is_empty() {
            0.0
        } else {
            Statistics::min(pnls.iter())
        };

        let net_pnl = outcome.net_pnl();
        let total_return_percent = if outcome.initial_capital > 0.0 {
            (outcome.final_capital - outcome.initial_capital) / outcome.initial_capital * 100.0
        } else {
            0.0
        };
        let drawdown = Self::calculate_max_drawdown(outcome);

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            drawdown_stops,
            win_rate,
            net_pnl,
            initial_capital: outcome.initial_capital,
            final_capital: outcome.final_capital,
            total_return_percent,
            avg_trade_pnl,
            best_trade,
            worst_trade,
            max_drawdown: drawdown.max_drawdown,
            max_drawdown_percent: drawdown.max_drawdown_percent,
            skipped_entries: outcome.skipped_entries,
        }
    }

    /// Deepest fall of the realized capital curve (starting capital followed by each `capital_after`).
    fn calculate_max_drawdown(outcome: &BacktestOutcome) -> DrawdownInfo {
        let mut max_drawdown = 0.0;
        let mut max_drawdown_percent = 0.0;
        let mut peak_value = outcome.initial_capital;

        let curve = std::iter::once(outcome.initial_capital)
            .chain(outcome.trades.iter().map(|trade| trade.capital_after));
        for value in curve {
            if value > peak_value {
                peak_value = value;
                continue;
            }

            let drawdown = peak_value - value;
            let drawdown_percent = if peak_value > 0.0 {
                (drawdown / peak_value) * 100.0
            } else {
                0.0
            };
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
            if drawdown_percent > max_drawdown_percent {
                max_drawdown_percent = drawdown_percent;
            }
        }

        DrawdownInfo {
            max_drawdown,
            max_drawdown_percent,
        }
    }
}

struct DrawdownInfo {
    max_drawdown: f64,
    max_drawdown_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn trade(serial: usize, pnl: f64, capital_after: f64, reason: ExitReason) -> Trade {
        let entry = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
            + Duration::minutes(30 * serial as i64);
        Trade {
            serial,
            entry_time: entry,
            exit_time: entry + Duration::minutes(9),
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 75.0,
            quantity: 75,
            exit_reason: reason,
            pnl,
            capital_after,
        }
    }

    #[test]
    fn summarizes_wins_losses_and_drawdown() {
        let outcome = BacktestOutcome {
            trades: vec![
                trade(1, 2_000.0, 102_000.0, ExitReason::Signal),
                trade(2, -5_100.0, 96_900.0, ExitReason::Signal),
                trade(3, -1_000.0, 95_900.0, ExitReason::DrawdownStop),
                trade(4, 3_000.0, 98_900.0, ExitReason::Signal),
            ],
            initial_capital: 100_000.0,
            final_capital: 98_900.0,
            peak_capital: 102_000.0,
            skipped_entries: 2,
            unclosed_position: None,
        };

        let summary = PerformanceSummary::from_outcome(&outcome);
        assert_eq!(summary.total_trades, 4);
        assert_eq!(summary.winning_trades, 2);
        assert_eq!(summary.losing_trades, 2);
        assert_eq!(summary.drawdown_stops, 1);
        assert!((summary.win_rate - 0.5).abs() < 1e-12);
        assert!((summary.net_pnl + 1_100.0).abs() < 1e-9);
        assert!((summary.avg_trade_pnl + 275.0).abs() < 1e-9);
        assert_eq!(summary.best_trade, 3_000.0);
        assert_eq!(summary.worst_trade, -5_100.0);
        assert!((summary.max_drawdown - 6_100.0).abs() < 1e-9);
        assert!((summary.max_drawdown_percent - 6_100.0 / 102_000.0 * 100.0).abs() < 1e-9);
        assert!((summary.total_return_percent + 1.1).abs() < 1e-9);
        assert_eq!(summary.skipped_entries, 2);
    }

    #[test]
    fn empty_ledger_yields_zeroes() {
        let summary = PerformanceSummary::from_outcome(&BacktestOutcome::empty(50_000.0));
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.avg_trade_pnl, 0.0);
        assert_eq!(summary.final_capital, 50_000.0);
        assert_eq!(summary.max_drawdown, 0.0);
    }
}
