use crate::metrics::timeseries::{
    calculate_returns, conditional_value_at_risk, max_drawdown_pct, value_at_risk, EquityPoint,
};
use crate::portfolio::{TradeRecord, TradeSide};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

const VAR_CONFIDENCE: f64 = 0.95;

//performance metrics for a completed run
//percentages are expressed as 0-100, ratios as plain numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return_usd: f64,
    pub total_return_pct: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    #[serde(with = "crate::metrics::float_repr")]
    pub sortino_ratio: f64,
    pub volatility_pct: f64,
    pub var_95_pct: f64,
    pub cvar_95_pct: f64,
    //every ledger entry, buys and sells
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    #[serde(with = "crate::metrics::float_repr")]
    pub profit_factor: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_profit_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub total_commission: f64,
    pub avg_trade_duration_hours: f64,
    //share of bars spent in a position
    pub exposure_pct: f64,
}

impl PerformanceMetrics {
    //derives every metric from the equity curve and trade ledger
    //return-series metrics see only the curve; `final_equity` feeds the total return
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        initial_capital: f64,
        final_equity: f64,
        annualization_factor: f64,
    ) -> Self {
        let total_return_usd = final_equity - initial_capital;
        let total_return_pct = if initial_capital > 0.0 {
            (final_equity / initial_capital - 1.0) * 100.0
        } else {
            0.0
        };

        let equity_values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();

        let max_drawdown = max_drawdown_pct(&equity_values);
        let returns = calculate_returns(&equity_values);
        let annualize = annualization_factor.max(0.0).sqrt();

        let trade_stats = TradeStats::from_ledger(trades);

        PerformanceMetrics {
            initial_capital,
            final_equity,
            total_return_usd,
            total_return_pct,
            max_drawdown,
            sharpe_ratio: calculate_sharpe_ratio(&returns, annualize),
            sortino_ratio: calculate_sortino_ratio(&returns, annualize),
            volatility_pct: calculate_volatility(&returns, annualize) * 100.0,
            var_95_pct: value_at_risk(&returns, VAR_CONFIDENCE) * 100.0,
            cvar_95_pct: conditional_value_at_risk(&returns, VAR_CONFIDENCE) * 100.0,
            total_trades: trades.len(),
            buy_trades: trade_stats.buys,
            sell_trades: trade_stats.sells,
            winning_trades: trade_stats.wins,
            losing_trades: trade_stats.losses,
            win_rate: trade_stats.win_rate(),
            profit_factor: trade_stats.profit_factor(),
            gross_profit: trade_stats.gross_profit,
            gross_loss: trade_stats.gross_loss,
            avg_profit_pct: trade_stats.avg_profit_pct(),
            best_trade_pct: trade_stats.best_pct.unwrap_or(0.0),
            worst_trade_pct: trade_stats.worst_pct.unwrap_or(0.0),
            total_commission: trade_stats.commission,
            avg_trade_duration_hours: trade_stats.avg_duration_hours(),
            exposure_pct: calculate_exposure(equity_curve, trades) * 100.0,
        }
    }

    //metrics of a run that never traded
    pub fn empty(initial_capital: f64) -> Self {
        PerformanceMetrics::compute(&[], &[], initial_capital, initial_capital, 1.0)
    }

    //builds the metrics table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows = [
            ("Initial Capital", format!("${:.2}", self.initial_capital)),
            ("Final Equity", format!("${:.2}", self.final_equity)),
            (
                "Total Return",
                format!("${:.2} ({:.2}%)", self.total_return_usd, self.total_return_pct),
            ),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown)),
            ("Sharpe Ratio", format!("{:.3}", self.sharpe_ratio)),
            ("Sortino Ratio", format!("{:.3}", self.sortino_ratio)),
            ("Volatility", format!("{:.2}%", self.volatility_pct)),
            ("VaR (95%)", format!("{:.3}%", self.var_95_pct)),
            ("CVaR (95%)", format!("{:.3}%", self.cvar_95_pct)),
            (
                "Trades",
                format!(
                    "{} ({} buys / {} sells)",
                    self.total_trades, self.buy_trades, self.sell_trades
                ),
            ),
            (
                "Win Rate",
                format!(
                    "{:.2}% ({}W / {}L)",
                    self.win_rate, self.winning_trades, self.losing_trades
                ),
            ),
            ("Profit Factor", format!("{:.3}", self.profit_factor)),
            ("Avg Trade", format!("{:.2}%", self.avg_profit_pct)),
            ("Best Trade", format!("{:.2}%", self.best_trade_pct)),
            ("Worst Trade", format!("{:.2}%", self.worst_trade_pct)),
            ("Commission Paid", format!("${:.2}", self.total_commission)),
            (
                "Avg Holding Time",
                format!("{:.1}h", self.avg_trade_duration_hours),
            ),
            ("Exposure", format!("{:.2}%", self.exposure_pct)),
        ];

        for (label, value) in rows {
            table.add_row(Row::new(vec![Cell::new(label), Cell::new(&value)]));
        }

        table
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
    }
}

#[derive(Default)]
struct TradeStats {
    buys: usize,
    sells: usize,
    wins: usize,
    losses: usize,
    gross_profit: f64,
    gross_loss: f64,
    profit_pct_sum: f64,
    best_pct: Option<f64>,
    worst_pct: Option<f64>,
    commission: f64,
    duration_hours_sum: f64,
    round_trips: usize,
}

impl TradeStats {
    fn from_ledger(trades: &[TradeRecord]) -> Self {
        let mut stats = TradeStats::default();
        let mut open_since = None;

        for trade in trades {
            stats.commission += trade.commission;

            match trade.side {
                TradeSide::Buy => {
                    stats.buys += 1;
                    open_since = Some(trade.timestamp);
                }
                TradeSide::Sell => {
                    stats.sells += 1;

                    //break-even closes count as losses so wins + losses == sells
                    let profit_usd = trade.profit_usd.unwrap_or(0.0);
                    if trade.is_win() {
                        stats.wins += 1;
                        stats.gross_profit += profit_usd;
                    } else {
                        stats.losses += 1;
                        stats.gross_loss += profit_usd.abs();
                    }

                    if let Some(pct) = trade.profit_pct {
                        stats.profit_pct_sum += pct;
                        stats.best_pct = Some(stats.best_pct.map_or(pct, |b| b.max(pct)));
                        stats.worst_pct = Some(stats.worst_pct.map_or(pct, |w| w.min(pct)));
                    }

                    if let Some(opened) = open_since.take() {
                        let held = trade.timestamp - opened;
                        stats.duration_hours_sum += held.num_seconds() as f64 / 3600.0;
                        stats.round_trips += 1;
                    }
                }
            }
        }

        stats
    }

    fn win_rate(&self) -> f64 {
        if self.sells == 0 {
            return 0.0;
        }
        self.wins as f64 / self.sells as f64 * 100.0
    }

    fn profit_factor(&self) -> f64 {
        if self.gross_loss > 0.0 {
            self.gross_profit / self.gross_loss
        } else if self.gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    fn avg_profit_pct(&self) -> f64 {
        if self.sells == 0 {
            return 0.0;
        }
        self.profit_pct_sum / self.sells as f64
    }

    fn avg_duration_hours(&self) -> f64 {
        if self.round_trips == 0 {
            return 0.0;
        }
        self.duration_hours_sum / self.round_trips as f64
    }
}

fn calculate_sharpe_ratio(returns: &[f64], annualize: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.mean();
    let std_dev = returns.std_dev();

    if !std_dev.is_finite() || std_dev == 0.0 {
        return 0.0;
    }

    (mean / std_dev) * annualize
}

//downside deviation uses every period, counting gains as zero
fn calculate_sortino_ratio(returns: &[f64], annualize: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.mean();
    let downside_dev = (returns
        .iter()
        .map(|&r| r.min(0.0).powi(2))
        .sum::<f64>()
        / returns.len() as f64)
        .sqrt();

    if downside_dev == 0.0 {
        return if mean > 0.0 { f64::INFINITY } else { 0.0 };
    }

    (mean / downside_dev) * annualize
}

fn calculate_volatility(returns: &[f64], annualize: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let std_dev = returns.std_dev();
    if std_dev.is_finite() {
        std_dev * annualize
    } else {
        0.0
    }
}

//fraction of bars that started with an open position
fn calculate_exposure(equity_curve: &[EquityPoint], trades: &[TradeRecord]) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }

    let mut in_market_count = 0;
    let mut in_position = false;
    let mut trade_idx = 0;

    for point in equity_curve {
        //trades on a bar happen after its point is recorded
        while trade_idx < trades.len() && trades[trade_idx].timestamp < point.timestamp {
            in_position = trades[trade_idx].side == TradeSide::Buy;
            trade_idx += 1;
        }

        if in_position {
            in_market_count += 1;
        }
    }

    in_market_count as f64 / equity_curve.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::TradeReason;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn hour(i: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i)
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint::new(hour(i as i64), v, 1.0))
            .collect()
    }

    fn buy(at: i64) -> TradeRecord {
        TradeRecord {
            timestamp: hour(at),
            side: TradeSide::Buy,
            price: 1.0,
            size: 1.0,
            amount: 1.0,
            commission: 0.001,
            profit_pct: None,
            profit_usd: None,
            reason: TradeReason::Entry,
        }
    }

    fn sell(at: i64, profit_usd: f64, profit_pct: f64) -> TradeRecord {
        TradeRecord {
            timestamp: hour(at),
            side: TradeSide::Sell,
            price: 1.0,
            size: 1.0,
            amount: 1.0,
            commission: 0.001,
            profit_pct: Some(profit_pct),
            profit_usd: Some(profit_usd),
            reason: TradeReason::Signal,
        }
    }

    #[test]
    fn no_trades_yield_zero_fallbacks() {
        let metrics = PerformanceMetrics::compute(&curve(&[1000.0; 10]), &[], 1000.0, 1000.0, 8760.0);

        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.exposure_pct, 0.0);
    }

    #[test]
    fn empty_run_is_all_zero() {
        let metrics = PerformanceMetrics::empty(500.0);
        assert_eq!(metrics.final_equity, 500.0);
        assert_eq!(metrics.total_return_pct, 0.0);
        assert_eq!(metrics.volatility_pct, 0.0);
    }

    #[test]
    fn profit_factor_is_infinite_without_losses() {
        let trades = [buy(1), sell(3, 25.0, 2.5)];
        let metrics = PerformanceMetrics::compute(&curve(&[1000.0; 5]), &trades, 1000.0, 1025.0, 8760.0);

        assert!(metrics.profit_factor.is_infinite());
        assert_eq!(metrics.win_rate, 100.0);
        assert_eq!(metrics.total_trades, 2);
    }

    #[test]
    fn trade_statistics_over_closes() {
        let trades = [
            buy(0),
            sell(2, 30.0, 3.0),
            buy(3),
            sell(4, -10.0, -1.0),
            buy(5),
            sell(9, -5.0, -0.5),
        ];
        let metrics = PerformanceMetrics::compute(&curve(&[1000.0; 10]), &trades, 1000.0, 1015.0, 8760.0);

        assert_eq!(metrics.total_trades, 6);
        assert_eq!(metrics.buy_trades, 3);
        assert_eq!(metrics.sell_trades, 3);
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 2);
        assert_relative_eq!(metrics.win_rate, 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.profit_factor, 2.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.avg_profit_pct, 0.5, epsilon = 1e-12);
        assert_eq!(metrics.best_trade_pct, 3.0);
        assert_eq!(metrics.worst_trade_pct, -1.0);
        assert_relative_eq!(metrics.total_commission, 0.006, epsilon = 1e-12);
        assert_relative_eq!(metrics.avg_trade_duration_hours, 7.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.total_return_pct, 1.5, epsilon = 1e-9);
    }

    #[test]
    fn exposure_counts_bars_started_in_position() {
        //in position during bars 1, 2 and 3
        let trades = [buy(0), sell(3, 1.0, 0.1)];
        let metrics = PerformanceMetrics::compute(&curve(&[1000.0; 10]), &trades, 1000.0, 1001.0, 8760.0);

        assert_relative_eq!(metrics.exposure_pct, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn return_metrics_ignore_final_equity() {
        let metrics = PerformanceMetrics::compute(&curve(&[1000.0, 1100.0]), &[], 1000.0, 990.0, 8760.0);

        assert_eq!(metrics.max_drawdown, 0.0);
        assert_relative_eq!(metrics.total_return_usd, -10.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.total_return_pct, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn single_return_has_zero_sharpe() {
        let metrics = PerformanceMetrics::compute(&curve(&[100.0, 110.0]), &[], 100.0, 110.0, 8760.0);

        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.volatility_pct, 0.0);
    }

    #[test]
    fn sharpe_is_annualized() {
        let values = [100.0, 101.0, 100.5, 102.0, 101.0, 103.0];
        let returns = calculate_returns(&values);
        let expected = returns.clone().mean() / returns.clone().std_dev() * 4.0;

        let metrics = PerformanceMetrics::compute(&curve(&values), &[], 100.0, 103.0, 16.0);
        assert_relative_eq!(metrics.sharpe_ratio, expected, epsilon = 1e-12);
    }

    #[test]
    fn break_even_close_counts_as_loss() {
        let trades = [buy(0), sell(1, 5.0, 0.5), buy(2), sell(3, 0.0, 0.0)];
        let metrics = PerformanceMetrics::compute(&curve(&[1000.0; 5]), &trades, 1000.0, 1005.0, 8760.0);

        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.winning_trades + metrics.losing_trades, metrics.sell_trades);
        assert_eq!(metrics.win_rate, 50.0);
        assert!(metrics.profit_factor.is_infinite());
    }

    #[test]
    fn compute_is_idempotent() {
        let trades = [buy(0), sell(2, 30.0, 3.0)];
        let equity = curve(&[1000.0, 1010.0, 995.0, 1030.0]);

        let first = PerformanceMetrics::compute(&equity, &trades, 1000.0, 1030.0, 8760.0);
        let second = PerformanceMetrics::compute(&equity, &trades, 1000.0, 1030.0, 8760.0);
        assert_eq!(first, second);
    }

    #[test]
    fn table_prints_infinite_profit_factor() {
        let trades = [buy(0), sell(2, 30.0, 3.0)];
        let metrics = PerformanceMetrics::compute(&curve(&[1000.0; 3]), &trades, 1000.0, 1030.0, 8760.0);
        assert!(metrics.to_table().to_string().contains("inf"));
    }
}
