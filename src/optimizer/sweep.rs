use crate::config::{ComboParams, RunConfig, SmaParams, StrategyParams};
use crate::data::Bar;
use crate::engine::{BacktestEngine, NullSink};
use crate::metrics::PerformanceMetrics;
use crate::risk::RiskStatus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

//rsi gate applied to every fast/slow pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiFilter {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiFilter {
    fn default() -> Self {
        let combo = ComboParams::default();
        RsiFilter {
            period: combo.rsi_period,
            overbought: combo.overbought,
            oversold: combo.oversold,
        }
    }
}

//fast/slow period ranges to sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
    //turns every pair into a combo strategy when set
    pub rsi_filter: Option<RsiFilter>,
}

impl Default for SweepGrid {
    fn default() -> Self {
        SweepGrid {
            fast_periods: (5..=50).step_by(5).collect(),
            slow_periods: (20..=100).step_by(10).collect(),
            rsi_filter: None,
        }
    }
}

impl SweepGrid {
    //builds a grid from inclusive ranges
    pub fn from_ranges(
        fast: (usize, usize, usize),
        slow: (usize, usize, usize),
        rsi_filter: Option<RsiFilter>,
    ) -> Self {
        let range = |(start, end, step): (usize, usize, usize)| -> Vec<usize> {
            (start..=end).step_by(step.max(1)).collect()
        };

        SweepGrid {
            fast_periods: range(fast),
            slow_periods: range(slow),
            rsi_filter,
        }
    }

    //every pair with slow > fast, plus the number of pairs skipped
    pub fn candidates(&self) -> (Vec<StrategyParams>, usize) {
        let mut candidates = Vec::new();
        let mut skipped = 0;

        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                //skip invalid combinations (slow <= fast)
                if slow <= fast {
                    skipped += 1;
                    continue;
                }

                let params = match self.rsi_filter {
                    Some(rsi) => StrategyParams::ComboFilter(ComboParams {
                        fast_window: fast,
                        slow_window: slow,
                        rsi_period: rsi.period,
                        overbought: rsi.overbought,
                        oversold: rsi.oversold,
                    }),
                    None => StrategyParams::Crossover(SmaParams {
                        fast_window: fast,
                        slow_window: slow,
                    }),
                };
                candidates.push(params);
            }
        }

        (candidates, skipped)
    }
}

//metric used to rank sweep entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Objective {
    #[default]
    TotalReturn,
    Sharpe,
    ProfitFactor,
    WinRate,
    //lower is better
    MaxDrawdown,
}

impl Objective {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "return" | "total_return" => Some(Objective::TotalReturn),
            "sharpe" => Some(Objective::Sharpe),
            "profit_factor" | "pf" => Some(Objective::ProfitFactor),
            "win_rate" | "winrate" => Some(Objective::WinRate),
            "drawdown" | "max_drawdown" => Some(Objective::MaxDrawdown),
            _ => None,
        }
    }

    //higher scores rank first
    pub fn score(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Objective::TotalReturn => metrics.total_return_pct,
            Objective::Sharpe => metrics.sharpe_ratio,
            Objective::ProfitFactor => metrics.profit_factor,
            Objective::WinRate => metrics.win_rate,
            Objective::MaxDrawdown => -metrics.max_drawdown,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Objective::TotalReturn => "total return",
            Objective::Sharpe => "sharpe ratio",
            Objective::ProfitFactor => "profit factor",
            Objective::WinRate => "win rate",
            Objective::MaxDrawdown => "max drawdown",
        };
        f.write_str(label)
    }
}

//one completed combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub rank: usize,
    pub params: StrategyParams,
    pub strategy_name: String,
    #[serde(with = "crate::metrics::float_repr")]
    pub score: f64,
    pub metrics: PerformanceMetrics,
    pub risk: RiskStatus,
}

//a combination whose strategy could not be built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub params: StrategyParams,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub objective: Objective,
    //ranked best first
    pub entries: Vec<SweepEntry>,
    pub failures: Vec<SweepFailure>,
    //pairs dropped because slow <= fast
    pub skipped_invalid: usize,
    pub cancelled: bool,
}

impl SweepReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }

    pub fn top(&self, n: usize) -> &[SweepEntry] {
        &self.entries[..n.min(self.entries.len())]
    }
}

enum Outcome {
    Done(SweepEntry),
    Failed(SweepFailure),
    Cancelled,
}

//re-runs the engine over a grid of strategy parameters
//each combination gets its own strategy and engine
pub struct ParameterSweep {
    config: RunConfig,
    objective: Objective,
    parallel: bool,
}

impl ParameterSweep {
    pub fn new(config: RunConfig) -> Self {
        ParameterSweep {
            config,
            objective: Objective::default(),
            parallel: true,
        }
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    //enables or disables parallel execution
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn run(&self, bars: &[Bar], grid: &SweepGrid) -> SweepReport {
        self.run_with_cancel(bars, grid, None)
    }

    //`cancel` is checked before each combination and on every bar of a running one
    pub fn run_with_cancel(
        &self,
        bars: &[Bar],
        grid: &SweepGrid,
        cancel: Option<&AtomicBool>,
    ) -> SweepReport {
        let (candidates, skipped_invalid) = grid.candidates();
        tracing::info!(
            combinations = candidates.len(),
            skipped = skipped_invalid,
            objective = %self.objective,
            parallel = self.parallel,
            "starting parameter sweep"
        );

        let outcomes: Vec<Outcome> = if self.parallel {
            candidates
                .par_iter()
                .map(|params| self.evaluate(bars, params, cancel))
                .collect()
        } else {
            candidates
                .iter()
                .map(|params| self.evaluate(bars, params, cancel))
                .collect()
        };

        let mut entries = Vec::new();
        let mut failures = Vec::new();
        let mut cancelled = false;

        for outcome in outcomes {
            match outcome {
                Outcome::Done(entry) => entries.push(entry),
                Outcome::Failed(failure) => failures.push(failure),
                Outcome::Cancelled => cancelled = true,
            }
        }

        //stable sort keeps grid order for ties
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        tracing::info!(
            completed = entries.len(),
            failed = failures.len(),
            cancelled,
            "parameter sweep finished"
        );

        SweepReport {
            objective: self.objective,
            entries,
            failures,
            skipped_invalid,
            cancelled,
        }
    }

    fn evaluate(&self, bars: &[Bar], params: &StrategyParams, cancel: Option<&AtomicBool>) -> Outcome {
        if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
            return Outcome::Cancelled;
        }

        let strategy = match params.build() {
            Ok(strategy) => strategy,
            Err(err) => {
                tracing::warn!(params = %params.label(), error = %err, "skipping combination");
                return Outcome::Failed(SweepFailure {
                    params: *params,
                    error: err.to_string(),
                });
            }
        };

        let mut engine = BacktestEngine::new(self.config.clone());
        let result = engine.run_with(bars, strategy.as_ref(), &mut NullSink, cancel);
        if result.cancelled {
            return Outcome::Cancelled;
        }

        Outcome::Done(SweepEntry {
            rank: 0,
            params: *params,
            strategy_name: result.strategy_name,
            score: self.objective.score(&result.metrics),
            metrics: result.metrics,
            risk: result.risk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{random_walk, RandomWalkParams};

    fn walk() -> Vec<Bar> {
        random_walk(&RandomWalkParams {
            bars: 400,
            ..RandomWalkParams::default()
        })
    }

    fn small_grid() -> SweepGrid {
        SweepGrid::from_ranges((5, 15, 5), (20, 40, 10), None)
    }

    #[test]
    fn default_grid_skips_inverted_pairs() {
        let (candidates, skipped) = SweepGrid::default().candidates();
        assert_eq!(candidates.len(), 74);
        assert_eq!(skipped, 16);
        assert!(candidates.iter().all(|p| match p {
            StrategyParams::Crossover(sma) => sma.slow_window > sma.fast_window,
            StrategyParams::ComboFilter(_) => false,
        }));
    }

    #[test]
    fn rsi_filter_builds_combo_candidates() {
        let grid = SweepGrid {
            rsi_filter: Some(RsiFilter::default()),
            ..small_grid()
        };
        let (candidates, _) = grid.candidates();
        assert!(candidates
            .iter()
            .all(|p| matches!(p, StrategyParams::ComboFilter(_))));
    }

    #[test]
    fn entries_are_ranked_by_objective() {
        let report = ParameterSweep::new(RunConfig::default())
            .with_objective(Objective::Sharpe)
            .run(&walk(), &small_grid());

        assert_eq!(report.len(), 9);
        assert!(report
            .entries
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
        assert_eq!(report.best().map(|e| e.rank), Some(1));
        assert_eq!(report.top(3).len(), 3);
        assert_eq!(report.top(100).len(), 9);
    }

    #[test]
    fn drawdown_objective_prefers_smaller_drawdown() {
        let report = ParameterSweep::new(RunConfig::default())
            .with_objective(Objective::MaxDrawdown)
            .run(&walk(), &small_grid());

        assert!(report
            .entries
            .windows(2)
            .all(|w| w[0].metrics.max_drawdown <= w[1].metrics.max_drawdown));
    }

    #[test]
    fn parallel_matches_sequential() {
        let bars = walk();
        let parallel = ParameterSweep::new(RunConfig::default()).run(&bars, &small_grid());
        let sequential = ParameterSweep::new(RunConfig::default())
            .with_parallelism(false)
            .run(&bars, &small_grid());

        assert_eq!(parallel.entries, sequential.entries);
    }

    #[test]
    fn failed_combination_is_recorded_and_skipped() {
        let grid = SweepGrid {
            fast_periods: vec![0, 5],
            slow_periods: vec![20],
            rsi_filter: None,
        };
        let report = ParameterSweep::new(RunConfig::default()).run(&walk(), &grid);

        assert_eq!(report.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.cancelled);
    }

    #[test]
    fn cancelled_sweep_reports_flag() {
        let flag = AtomicBool::new(true);
        let report =
            ParameterSweep::new(RunConfig::default()).run_with_cancel(&walk(), &small_grid(), Some(&flag));

        assert!(report.cancelled);
        assert!(report.is_empty());
    }

    #[test]
    fn report_json_reads_back() {
        let report = ParameterSweep::new(RunConfig::default())
            .with_objective(Objective::ProfitFactor)
            .run(&walk(), &small_grid());

        let json = serde_json::to_string(&report).unwrap();
        let back: SweepReport = serde_json::from_str(&json).unwrap();

        assert_eq!(back.objective, Objective::ProfitFactor);
        assert_eq!(back.len(), report.len());
        for (read, written) in back.entries.iter().zip(&report.entries) {
            assert_eq!(read.rank, written.rank);
            assert_eq!(read.strategy_name, written.strategy_name);
            if written.score.is_finite() {
                assert!((read.score - written.score).abs() <= 1e-9 * written.score.abs().max(1.0));
            } else {
                assert_eq!(read.score, written.score);
            }
        }
    }

    #[test]
    fn parses_objectives() {
        assert_eq!(Objective::parse("Sharpe"), Some(Objective::Sharpe));
        assert_eq!(Objective::parse("pf"), Some(Objective::ProfitFactor));
        assert_eq!(Objective::parse("calmar"), None);
    }
}
