pub mod feasibility;
pub mod state;
