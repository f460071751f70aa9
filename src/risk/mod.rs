pub mod guard;

pub use guard::{HaltReason, RiskGuard, RiskLimits, RiskState, RiskStatus};
