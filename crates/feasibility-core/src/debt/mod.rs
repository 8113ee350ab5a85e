pub mod drawdown;
pub mod loans;
pub mod sizing;

pub use drawdown::{run_drawdown, DrawdownInput, DrawdownResult, DrawdownSchedule, FundingStatus};
pub use loans::{loan_cost, LoanCost};
pub use sizing::{resolve_auto_facility_size, size_facilities, SizedFacility, SizingContext};
