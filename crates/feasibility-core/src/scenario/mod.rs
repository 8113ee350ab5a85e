pub mod model;
pub mod state;

pub use model::*;
pub use state::{apply, replay, ScenarioAction};
