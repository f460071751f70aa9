use crate::config::{ConfigError, RunConfig};
use crate::data::Bar;
use crate::engine::events::{EngineEvent, EventSink, TracingSink};
use crate::metrics::{EquityPoint, PerformanceMetrics};
use crate::portfolio::{Account, Position, TradeReason, TradeRecord};
use crate::risk::{RiskGuard, RiskStatus};
use crate::strategy::{Signal, Strategy};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

//result of a backtest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub parameters: IndexMap<String, f64>,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub risk: RiskStatus,
    //position after the run, always flat
    pub final_position: Position,
    pub bars_processed: usize,
    pub cancelled: bool,
}

impl BacktestResult {
    pub fn initial_capital(&self) -> f64 {
        self.metrics.initial_capital
    }

    pub fn final_equity(&self) -> f64 {
        self.metrics.final_equity
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }
}

//main backtest engine, one instance per concurrent run
pub struct BacktestEngine {
    config: RunConfig,
    account: Account,
    risk: RiskGuard,
    equity_curve: Vec<EquityPoint>,
}

impl BacktestEngine {
    //creates a new backtest engine, correcting values that have a safe default
    pub fn new(config: RunConfig) -> Self {
        let config = config.normalized();
        let account = Account::new(
            config.initial_capital,
            config.commission_rate,
            config.min_trade_size,
            config.sizing_mode(),
        );
        let risk = RiskGuard::new(config.risk_limits(), config.initial_capital);

        BacktestEngine {
            config,
            account,
            risk,
            equity_curve: Vec::new(),
        }
    }

    //creates an engine only if the configuration is usable
    pub fn try_new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(BacktestEngine::new(config))
    }

    //returns a reference to the account
    pub fn account(&self) -> &Account {
        &self.account
    }

    //zero position, cash back to initial capital, empty ledger and curve
    pub fn reset(&mut self) {
        self.account.reset();
        self.risk.reset();
        self.equity_curve.clear();
    }

    //runs the backtest with the given strategy, logging through tracing
    pub fn run(&mut self, bars: &[Bar], strategy: &dyn Strategy) -> BacktestResult {
        self.run_with(bars, strategy, &mut TracingSink, None)
    }

    //runs the backtest, sending events to `sink` and polling `cancel` once per bar
    pub fn run_with(
        &mut self,
        bars: &[Bar],
        strategy: &dyn Strategy,
        sink: &mut dyn EventSink,
        cancel: Option<&AtomicBool>,
    ) -> BacktestResult {
        self.reset();

        if bars.is_empty() {
            return self.build_result(strategy, 0, false);
        }

        let signals = strategy.generate_signals(bars);
        let mut cancelled = false;
        let mut processed = 0;

        //main backtest loop
        for (i, bar) in bars.iter().enumerate() {
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                sink.on_event(&EngineEvent::RunCancelled { bar: i });
                cancelled = true;
                break;
            }

            let price = bar.close;

            //record pre-step equity
            let equity = self.account.equity(price);
            self.equity_curve
                .push(EquityPoint::new(bar.timestamp, equity, price));
            self.risk.observe_equity(equity);
            processed = i + 1;

            //forced exits take priority over the bar's signal
            if let Some(reason) = self.forced_exit(price) {
                self.close_position(i, bar, reason, sink);
                continue;
            }

            match signals.get(i).copied().unwrap_or_default() {
                Signal::Buy => {
                    if self.risk.allows_entries() {
                        self.open_position(i, bar, sink);
                    }
                }
                Signal::Sell => self.close_position(i, bar, TradeReason::Signal, sink),
                Signal::Hold => {}
            }
        }

        //every run ends flat
        if self.account.position.is_open() && processed > 0 {
            let last = processed - 1;
            self.close_position(last, &bars[last], TradeReason::EndOfRun, sink);
        }

        self.build_result(strategy, processed, cancelled)
    }

    fn forced_exit(&self, price: f64) -> Option<TradeReason> {
        let position = &self.account.position;
        if position.is_flat() {
            return None;
        }

        if self.risk.stop_loss_triggered(position, price) {
            Some(TradeReason::StopLoss)
        } else if self.risk.take_profit_triggered(position, price) {
            Some(TradeReason::TakeProfit)
        } else {
            None
        }
    }

    fn open_position(&mut self, index: usize, bar: &Bar, sink: &mut dyn EventSink) {
        let fraction = self.config.position_size_fraction * self.risk.size_multiplier();

        match self.account.buy(bar.timestamp, bar.close, fraction) {
            Ok(record) => sink.on_event(&EngineEvent::PositionOpened {
                bar: index,
                timestamp: record.timestamp,
                price: record.price,
                size: record.size,
                amount: record.amount,
                commission: record.commission,
            }),
            Err(rejection) => sink.on_event(&EngineEvent::TradeSkipped {
                bar: index,
                timestamp: bar.timestamp,
                rejection,
            }),
        }
    }

    fn close_position(
        &mut self,
        index: usize,
        bar: &Bar,
        reason: TradeReason,
        sink: &mut dyn EventSink,
    ) {
        let record = match self.account.sell(bar.timestamp, bar.close, reason) {
            Ok(record) => record.clone(),
            Err(rejection) => {
                sink.on_event(&EngineEvent::TradeSkipped {
                    bar: index,
                    timestamp: bar.timestamp,
                    rejection,
                });
                return;
            }
        };

        let profit_usd = record.profit_usd.unwrap_or(0.0);
        sink.on_event(&EngineEvent::PositionClosed {
            bar: index,
            timestamp: record.timestamp,
            price: record.price,
            size: record.size,
            profit_pct: record.profit_pct.unwrap_or(0.0),
            profit_usd,
            reason,
        });

        if let Some(halt) = self.risk.record_close(profit_usd, self.account.cash) {
            sink.on_event(&EngineEvent::Halted {
                bar: index,
                timestamp: bar.timestamp,
                reason: halt,
            });
        }
    }

    fn build_result(
        &self,
        strategy: &dyn Strategy,
        bars_processed: usize,
        cancelled: bool,
    ) -> BacktestResult {
        let final_equity = match self.equity_curve.last() {
            Some(point) => self.account.equity(point.price),
            None => self.account.cash,
        };

        let metrics = PerformanceMetrics::compute(
            &self.equity_curve,
            &self.account.trade_log,
            self.config.initial_capital,
            final_equity,
            self.config.annualization_factor,
        );

        BacktestResult {
            strategy_name: strategy.name().to_string(),
            parameters: strategy.parameters(),
            metrics,
            trades: self.account.trade_log.clone(),
            equity_curve: self.equity_curve.clone(),
            risk: self.risk.status(),
            final_position: self.account.position,
            bars_processed,
            cancelled,
        }
    }
}
