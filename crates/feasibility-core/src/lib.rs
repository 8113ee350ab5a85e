//! Property development feasibility engine.
//!
//! Pure functions from a [`scenario::ScenarioSnapshot`] to resolved costs, a
//! monthly cashflow, a prioritised debt drawdown, a project P&L and the
//! equity split. Money is integer cents throughout.

pub mod error;
pub mod time_value;
pub mod types;

pub mod cashflow;
pub mod debt;
pub mod equity;
pub mod feasibility;
pub mod gst;
pub mod resolver;
pub mod scenario;
pub mod summary;

pub use error::FeasibilityError;
pub use feasibility::{run_feasibility, FeasibilityReport};
pub use types::*;

/// Standard result type for all feasibility operations
pub type FeasibilityResult<T> = Result<T, FeasibilityError>;
