use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use feasibility_core::feasibility;
use feasibility_core::scenario::ScenarioSnapshot;

use crate::input;

/// Arguments shared by every scenario view
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to a scenario file (.json, .yaml or .yml); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Override the scenario tax rate (%)
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Override the annual discount rate used for NPV (%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Override the target development margin (%)
    #[arg(long)]
    pub target_margin: Option<Decimal>,
}

/// Load the snapshot and apply any command-line overrides.
pub fn load_snapshot(args: &ScenarioArgs) -> Result<ScenarioSnapshot, Box<dyn std::error::Error>> {
    let mut snapshot: ScenarioSnapshot = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <scenario.json|yaml> or stdin required".into());
    };

    if let Some(rate) = args.tax_rate {
        snapshot.scenario.tax_rate_pct = rate;
    }
    if let Some(rate) = args.discount_rate {
        snapshot.scenario.discount_rate_pct = rate;
    }
    if let Some(margin) = args.target_margin {
        snapshot.scenario.target_margin_pct = margin;
    }

    tracing::debug!(
        scenario = %snapshot.scenario.name,
        land_lots = snapshot.land_lots.len(),
        line_items = snapshot.line_items.len(),
        sales_units = snapshot.sales_units.len(),
        facilities = snapshot.debt_facilities.len(),
        "scenario loaded"
    );
    Ok(snapshot)
}

pub fn run_report(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args)?;
    let result = feasibility::run_feasibility(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args)?;
    let result = feasibility::run_summary(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_cashflow(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args)?;
    let result = feasibility::run_cashflow(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_drawdown(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args)?;
    let result = feasibility::run_drawdown(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_equity(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args)?;
    let result = feasibility::run_equity(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_gst(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args)?;
    let result = feasibility::run_gst(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_resolve(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args)?;
    let result = feasibility::run_resolve(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}
