pub mod sweep;

pub use sweep::{
    Objective, ParameterSweep, RsiFilter, SweepEntry, SweepFailure, SweepGrid, SweepReport,
};
