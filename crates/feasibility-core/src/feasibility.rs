//! End-to-end feasibility run.
//!
//! Wires the leaf calculators together in dependency order: context and
//! line-item resolution, the monthly cashflow, facility sizing on the
//! pre-funding totals, the drawdown waterfall over the cashflow, and finally
//! the summary, equity distribution and GST position. Each stage reads only
//! the snapshot and the outputs of earlier stages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cashflow::{self, CashflowMonth};
use crate::debt::{self, loan_cost, DrawdownInput, DrawdownSchedule, LoanCost, SizedFacility, SizingContext};
use crate::equity::{self, EquityDistribution};
use crate::error::FeasibilityError;
use crate::gst::{self, GstSummary};
use crate::resolver::{self, ResolutionContext, ResolvedLineItem};
use crate::scenario::ScenarioSnapshot;
use crate::summary::{self, FeasibilitySummary, SummaryInput};
use crate::types::{with_metadata, Cents, ComputationOutput, Ratio};
use crate::FeasibilityResult;

/// Longest timeline accepted, in months.
const MAX_PROJECT_MONTHS: u32 = 600;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Everything computed for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub context: ResolutionContext,
    pub line_items: Vec<ResolvedLineItem>,
    pub cashflow: Vec<CashflowMonth>,
    pub facilities: Vec<SizedFacility>,
    pub drawdown: DrawdownSchedule,
    pub loans: Vec<LoanCost>,
    pub summary: FeasibilitySummary,
    pub equity: EquityDistribution,
    pub gst: GstSummary,
    pub reporting: ReportingSnapshot,
}

/// The headline figures external reporting keeps on the scenario row.
///
/// Advisory only: derived from a fresh summary on every run and never read
/// back by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingSnapshot {
    pub total_revenue: Cents,
    pub site_cost: Cents,
    pub construction_cost: Cents,
    pub total_costs: Cents,
    pub profit: Cents,
    pub profit_margin: Ratio,
    pub profit_on_cost: Ratio,
    pub residual_land_value: Cents,
    pub npv: Option<Cents>,
    pub irr: Ratio,
}

impl ReportingSnapshot {
    pub fn from_summary(summary: &FeasibilitySummary) -> Self {
        Self {
            total_revenue: summary.total_revenue,
            site_cost: summary.land_cost,
            construction_cost: summary.construction_cost,
            total_costs: summary.total_costs,
            profit: summary.profit_after_tax,
            profit_margin: summary.profit_margin,
            profit_on_cost: summary.profit_on_cost,
            residual_land_value: summary.residual_land_value,
            npv: summary.npv,
            irr: summary.irr,
        }
    }

    /// Names of the fields in `self` that disagree with `fresh`.
    pub fn stale_fields(&self, fresh: &ReportingSnapshot) -> Vec<&'static str> {
        let checks = [
            ("total_revenue", self.total_revenue == fresh.total_revenue),
            ("site_cost", self.site_cost == fresh.site_cost),
            ("construction_cost", self.construction_cost == fresh.construction_cost),
            ("total_costs", self.total_costs == fresh.total_costs),
            ("profit", self.profit == fresh.profit),
            ("profit_margin", self.profit_margin == fresh.profit_margin),
            ("profit_on_cost", self.profit_on_cost == fresh.profit_on_cost),
            ("residual_land_value", self.residual_land_value == fresh.residual_land_value),
            ("npv", self.npv == fresh.npv),
            ("irr", self.irr == fresh.irr),
        ];
        checks.iter().filter(|(_, same)| !same).map(|(name, _)| *name).collect()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_snapshot(snapshot: &ScenarioSnapshot, warnings: &mut Vec<String>) -> FeasibilityResult<()> {
    let scenario = &snapshot.scenario;

    if scenario.project_length_months > MAX_PROJECT_MONTHS {
        return Err(FeasibilityError::InvalidInput {
            field: "project_length_months".into(),
            reason: format!("Project length must not exceed {MAX_PROJECT_MONTHS} months"),
        });
    }

    if scenario.tax_rate_pct < Decimal::ZERO || scenario.tax_rate_pct > Decimal::ONE_HUNDRED {
        return Err(FeasibilityError::InvalidInput {
            field: "tax_rate_pct".into(),
            reason: "Tax rate must be between 0 and 100".into(),
        });
    }

    if scenario.discount_rate_pct <= -Decimal::ONE_HUNDRED {
        return Err(FeasibilityError::InvalidInput {
            field: "discount_rate_pct".into(),
            reason: "Discount rate must be greater than -100".into(),
        });
    }

    if scenario.start_date.is_none() {
        warnings.push("No start date set; cashflow, drawdown and discounted metrics are empty".into());
    } else if scenario.project_length_months == 0 {
        warnings.push("Project length is zero months; cashflow is empty".into());
    }

    for facility in &snapshot.debt_facilities {
        if facility.lvr_pct > Decimal::ONE_HUNDRED {
            warnings.push(format!(
                "Facility '{}' has an LVR of {}%, above 100%",
                facility.name, facility.lvr_pct
            ));
        }
    }

    Ok(())
}

/// Line items whose cached amount no longer matches the resolved one.
fn stale_line_item_caches(snapshot: &ScenarioSnapshot, resolved: &[ResolvedLineItem], warnings: &mut Vec<String>) {
    for (item, live) in snapshot.line_items.iter().zip(resolved) {
        if let Some(cached) = item.amount_ex_gst {
            if cached != live.amount_ex_gst {
                warnings.push(format!(
                    "Cached amount on line item '{}' is stale ({} vs {} cents); the resolved amount is used",
                    item.description, cached, live.amount_ex_gst
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run every stage for a snapshot, collecting warnings.
pub fn evaluate(snapshot: &ScenarioSnapshot, warnings: &mut Vec<String>) -> FeasibilityResult<FeasibilityReport> {
    validate_snapshot(snapshot, warnings)?;
    let length = snapshot.scenario.project_length_months;

    let context = resolver::build_context(snapshot);
    let line_items = resolver::resolve_line_items(snapshot, &context);
    stale_line_item_caches(snapshot, &line_items, warnings);

    let cashflow = cashflow::generate_cashflow(snapshot, &line_items, warnings)?;

    let sizing = SizingContext {
        total_revenue_ex_gst: summary::total_revenue(snapshot),
        total_costs_ex_funding: summary::cost_totals(snapshot, &line_items).total(),
    };
    let facilities = debt::size_facilities(&snapshot.debt_facilities, &sizing, length);

    let drawdown = debt::run_drawdown(
        &DrawdownInput {
            facilities: facilities.clone(),
            monthly_costs: cashflow::monthly_costs(&cashflow),
            monthly_receipts: cashflow::monthly_revenue(&cashflow),
            equity_available: snapshot.total_equity(),
        },
        warnings,
    );
    for f in &drawdown.facilities {
        tracing::debug!(
            facility = %f.name,
            size = f.size,
            peak = f.peak_drawn,
            interest = f.total_interest,
            "facility drawn"
        );
    }

    let loans = snapshot.debt_loans.iter().map(|l| loan_cost(l, length)).collect();

    let summary = summary::summarize(
        &SummaryInput {
            snapshot,
            resolved: &line_items,
            cashflow: &cashflow,
            facilities: &facilities,
            facility_interest: drawdown.total_interest,
        },
        warnings,
    );

    let equity = equity::distribute_equity(&snapshot.equity_partners, summary.profit_after_tax);
    let gst = gst::summarize_gst(snapshot, &line_items);
    let reporting = ReportingSnapshot::from_summary(&summary);

    Ok(FeasibilityReport {
        context,
        line_items,
        cashflow,
        facilities,
        drawdown,
        loans,
        summary,
        equity,
        gst,
        reporting,
    })
}

/// Full feasibility of a scenario snapshot.
pub fn run_feasibility(snapshot: &ScenarioSnapshot) -> FeasibilityResult<ComputationOutput<FeasibilityReport>> {
    let mut warnings = Vec::new();
    let report = evaluate(snapshot, &mut warnings)?;
    Ok(with_metadata(
        "Development feasibility (resolved costs, monthly cashflow, debt waterfall, returns)",
        &snapshot.scenario,
        warnings,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Single-view entry points
// ---------------------------------------------------------------------------

pub fn run_summary(snapshot: &ScenarioSnapshot) -> FeasibilityResult<ComputationOutput<FeasibilitySummary>> {
    let mut warnings = Vec::new();
    let report = evaluate(snapshot, &mut warnings)?;
    Ok(with_metadata("Feasibility summary", &snapshot.scenario, warnings, report.summary))
}

pub fn run_cashflow(snapshot: &ScenarioSnapshot) -> FeasibilityResult<ComputationOutput<Vec<CashflowMonth>>> {
    let mut warnings = Vec::new();
    validate_snapshot(snapshot, &mut warnings)?;
    let context = resolver::build_context(snapshot);
    let line_items = resolver::resolve_line_items(snapshot, &context);
    let months = cashflow::generate_cashflow(snapshot, &line_items, &mut warnings)?;
    Ok(with_metadata("Monthly cashflow projection", &snapshot.scenario, warnings, months))
}

pub fn run_drawdown(snapshot: &ScenarioSnapshot) -> FeasibilityResult<ComputationOutput<DrawdownSchedule>> {
    let mut warnings = Vec::new();
    let report = evaluate(snapshot, &mut warnings)?;
    Ok(with_metadata(
        "Prioritised facility drawdown waterfall",
        &report.facilities,
        warnings,
        report.drawdown,
    ))
}

pub fn run_equity(snapshot: &ScenarioSnapshot) -> FeasibilityResult<ComputationOutput<EquityDistribution>> {
    let mut warnings = Vec::new();
    let report = evaluate(snapshot, &mut warnings)?;
    Ok(with_metadata(
        "Equity distribution of profit after tax",
        &snapshot.equity_partners,
        warnings,
        report.equity,
    ))
}

pub fn run_gst(snapshot: &ScenarioSnapshot) -> FeasibilityResult<ComputationOutput<GstSummary>> {
    let context = resolver::build_context(snapshot);
    let line_items = resolver::resolve_line_items(snapshot, &context);
    let gst = gst::summarize_gst(snapshot, &line_items);
    Ok(with_metadata("GST position (10% on ex-GST amounts)", &snapshot.scenario, Vec::new(), gst))
}

pub fn run_resolve(snapshot: &ScenarioSnapshot) -> FeasibilityResult<ComputationOutput<Vec<ResolvedLineItem>>> {
    let mut warnings = Vec::new();
    let context = resolver::build_context(snapshot);
    let line_items = resolver::resolve_line_items(snapshot, &context);
    stale_line_item_caches(snapshot, &line_items, &mut warnings);
    Ok(with_metadata("Line-item resolution", &context, warnings, line_items))
}
