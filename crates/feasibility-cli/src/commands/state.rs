use clap::Args;
use serde_json::Value;

use feasibility_core::scenario::{self, ScenarioAction, ScenarioSnapshot};

use crate::input;

/// Arguments for replaying edit actions over a scenario
#[derive(Args)]
pub struct ApplyArgs {
    /// Path to the starting scenario file (.json, .yaml or .yml)
    #[arg(long)]
    pub input: String,

    /// Path to a list of actions; stdin when omitted
    #[arg(long)]
    pub actions: Option<String>,
}

pub fn run_apply(args: ApplyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let initial: ScenarioSnapshot = input::file::read_document(&args.input)?;

    let actions: Vec<ScenarioAction> = if let Some(ref path) = args.actions {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--actions <file> or stdin required".into());
    };

    tracing::debug!(actions = actions.len(), "replaying actions");
    let next = scenario::replay(&initial, actions)?;
    Ok(serde_json::to_value(next)?)
}
