use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use feasibility_core::{feasibility, FeasibilityError};
use feasibility_core::scenario::{self, ScenarioAction, ScenarioSnapshot};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json)
        .map_err(FeasibilityError::from)
        .map_err(to_napi_error)
}

fn parse_snapshot(input_json: &str) -> NapiResult<ScenarioSnapshot> {
    parse(input_json)
}

// ---------------------------------------------------------------------------
// Feasibility views
// ---------------------------------------------------------------------------

#[napi]
pub fn run_feasibility(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = feasibility::run_feasibility(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn feasibility_summary(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = feasibility::run_summary(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn generate_cashflow(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = feasibility::run_cashflow(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn debt_drawdown(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = feasibility::run_drawdown(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn equity_distribution(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = feasibility::run_equity(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn gst_summary(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = feasibility::run_gst(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn resolve_line_items(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = feasibility::run_resolve(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenario state
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ApplyInput {
    snapshot: ScenarioSnapshot,
    actions: Vec<ScenarioAction>,
}

/// Replay `{ "snapshot": ..., "actions": [...] }` and return the new snapshot.
#[napi]
pub fn apply_actions(input_json: String) -> NapiResult<String> {
    let input: ApplyInput = parse(&input_json)?;
    let next = scenario::replay(&input.snapshot, input.actions).map_err(to_napi_error)?;
    serde_json::to_string(&next).map_err(to_napi_error)
}
