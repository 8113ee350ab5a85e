//! Project P&L, funding, leverage and return metrics.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::cashflow::{self, CashflowMonth, CategoryTotals};
use crate::debt::{loan_cost, SizedFacility};
use crate::equity;
use crate::resolver::ResolvedLineItem;
use crate::scenario::{SaleStatus, ScenarioSnapshot};
use crate::time_value;
use crate::types::{pct_to_fraction, per_unit, percent_of, round_cents, Cents, Ratio, RATIO_DP};
use crate::{FeasibilityError, FeasibilityResult};

/// Initial guess for the monthly IRR search.
const MONTHLY_IRR_GUESS: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingCosts {
    pub facility_fees: Cents,
    /// Establishment fees on fixed loans
    pub loan_fees: Cents,
    pub equity_fees: Cents,
    /// Interest from the drawdown waterfall
    pub facility_interest: Cents,
    pub loan_interest: Cents,
    pub total_debt_interest: Cents,
    pub total: Cents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPosition {
    /// Facility limits plus loan principals
    pub total_debt: Cents,
    pub total_equity: Cents,
    pub total_funding: Cents,
    /// Development cost not covered by debt
    pub required_equity: Cents,
    pub equity_shortfall: Cents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCounts {
    pub unsold: u32,
    pub exchanged: u32,
    pub settled: u32,
    pub withdrawn: u32,
}

impl UnitCounts {
    pub fn active(&self) -> u32 {
        self.unsold + self.exchanged + self.settled
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetrics {
    pub units: UnitCounts,
    pub revenue_per_unit: Option<Cents>,
    pub cost_per_unit: Option<Cents>,
    /// Revenue per m² of saleable area
    pub revenue_per_m2: Option<Cents>,
    /// Land cost per m² of site area
    pub land_cost_per_m2: Option<Cents>,
}

/// The full computed feasibility of a scenario. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilitySummary {
    /// Gross realisation value, ex-GST
    pub total_revenue: Cents,
    pub costs_by_category: CategoryTotals,
    pub land_cost: Cents,
    pub construction_cost: Cents,
    pub total_costs_ex_funding: Cents,
    pub ebit: Cents,
    pub funding_costs: FundingCosts,
    pub total_funding_costs: Cents,
    pub total_costs: Cents,
    pub profit_before_tax: Cents,
    pub tax: Cents,
    pub profit_after_tax: Cents,
    pub profit_margin: Ratio,
    pub profit_on_cost: Ratio,
    pub development_margin: Ratio,
    pub funding_position: FundingPosition,
    pub debt_leverage_pct: Ratio,
    pub debt_to_cost_ratio: Ratio,
    pub debt_to_grv_ratio: Ratio,
    pub residual_land_value: Cents,
    pub residual_land_value_at_target: Cents,
    pub npv: Option<Cents>,
    /// Annualised, as a percentage
    pub irr: Ratio,
    pub unit_metrics: UnitMetrics,
}

/// Everything the aggregator reads. All inputs are immutable snapshots.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub snapshot: &'a ScenarioSnapshot,
    pub resolved: &'a [ResolvedLineItem],
    pub cashflow: &'a [CashflowMonth],
    pub facilities: &'a [SizedFacility],
    /// Total facility interest from the drawdown waterfall
    pub facility_interest: Cents,
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Land plus resolved line items, by category.
pub fn cost_totals(snapshot: &ScenarioSnapshot, resolved: &[ResolvedLineItem]) -> CategoryTotals {
    let mut totals = CategoryTotals {
        land: snapshot.land_cost_ex_gst(),
        ..Default::default()
    };
    for item in resolved {
        totals.add(item.section, item.amount_ex_gst);
    }
    totals
}

/// Ex-GST revenue of every active sales unit.
pub fn total_revenue(snapshot: &ScenarioSnapshot) -> Cents {
    snapshot.sales_units.iter().map(|u| u.revenue_ex_gst()).sum()
}

pub fn funding_costs(
    snapshot: &ScenarioSnapshot,
    facilities: &[SizedFacility],
    facility_interest: Cents,
) -> FundingCosts {
    let length = snapshot.scenario.project_length_months;
    let loans: Vec<_> = snapshot.debt_loans.iter().map(|l| loan_cost(l, length)).collect();

    let facility_fees: Cents = facilities.iter().map(SizedFacility::fees).sum();
    let loan_fees: Cents = loans.iter().map(|l| l.establishment_fee).sum();
    let loan_interest: Cents = loans.iter().map(|l| l.interest).sum();
    let equity_fees = equity::equity_fees(&snapshot.equity_partners);
    let total_debt_interest = facility_interest + loan_interest;

    FundingCosts {
        facility_fees,
        loan_fees,
        equity_fees,
        facility_interest,
        loan_interest,
        total_debt_interest,
        total: facility_fees + loan_fees + equity_fees + total_debt_interest,
    }
}

pub fn funding_position(
    snapshot: &ScenarioSnapshot,
    facilities: &[SizedFacility],
    total_costs_ex_funding: Cents,
) -> FundingPosition {
    let total_debt: Cents = facilities.iter().map(|f| f.size).sum::<Cents>()
        + snapshot.debt_loans.iter().map(|l| l.principal).sum::<Cents>();
    let total_equity = snapshot.total_equity();
    let required_equity = (total_costs_ex_funding - total_debt).max(0);

    FundingPosition {
        total_debt,
        total_equity,
        total_funding: total_debt + total_equity,
        required_equity,
        equity_shortfall: (required_equity - total_equity).max(0),
    }
}

fn unit_metrics(snapshot: &ScenarioSnapshot, revenue: Cents, total_costs: Cents, land_cost: Cents) -> UnitMetrics {
    let mut units = UnitCounts::default();
    let mut saleable_area = Decimal::ZERO;
    for unit in &snapshot.sales_units {
        match unit.status {
            SaleStatus::Unsold => units.unsold += 1,
            SaleStatus::Exchanged => units.exchanged += 1,
            SaleStatus::Settled => units.settled += 1,
            SaleStatus::Withdrawn => units.withdrawn += 1,
        }
        if unit.is_active() {
            saleable_area += unit.area_m2;
        }
    }
    let active = Decimal::from(units.active());
    let site_area: Decimal = snapshot.land_lots.iter().map(|l| l.land_area_m2).sum();

    UnitMetrics {
        revenue_per_unit: per_unit(revenue, active),
        cost_per_unit: per_unit(total_costs, active),
        revenue_per_m2: per_unit(revenue, saleable_area),
        land_cost_per_m2: per_unit(land_cost, site_area),
        units,
    }
}

/// NPV of the monthly net cashflow at the scenario's annual discount rate,
/// compounded monthly. `None` without a cashflow.
pub fn cashflow_npv(months: &[CashflowMonth], discount_rate_pct: Decimal) -> Option<Cents> {
    if months.is_empty() {
        return None;
    }
    let flows = time_value::to_decimal_flows(&cashflow::net_series(months));
    let monthly = time_value::monthly_rate_from_annual(discount_rate_pct);
    time_value::npv(monthly, &flows).ok().map(round_cents)
}

/// Annualised IRR of the monthly net cashflow, as a percentage.
///
/// Fails with `InsufficientData` when the series never changes sign and
/// `ConvergenceFailure` when no root can be found.
pub fn cashflow_irr(months: &[CashflowMonth]) -> FeasibilityResult<Decimal> {
    let flows = time_value::to_decimal_flows(&cashflow::net_series(months));
    let monthly = time_value::irr(&flows, MONTHLY_IRR_GUESS)?;
    let annual = time_value::annualise_monthly_rate(monthly).ok_or_else(|| FeasibilityError::InvalidInput {
        field: "irr".into(),
        reason: "annualised rate overflows".into(),
    })?;
    Ok((annual * Decimal::ONE_HUNDRED).round_dp(RATIO_DP))
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Roll a scenario up into its P&L and return metrics.
pub fn summarize(input: &SummaryInput, warnings: &mut Vec<String>) -> FeasibilitySummary {
    let snapshot = input.snapshot;
    let scenario = &snapshot.scenario;

    let total_revenue = total_revenue(snapshot);
    let costs_by_category = cost_totals(snapshot, input.resolved);
    let total_costs_ex_funding = costs_by_category.total();
    let ebit = total_revenue - total_costs_ex_funding;

    let funding_costs = funding_costs(snapshot, input.facilities, input.facility_interest);
    let total_funding_costs = funding_costs.total;
    let total_costs = total_costs_ex_funding + total_funding_costs;

    let profit_before_tax = ebit - total_funding_costs;
    let tax = round_cents(Decimal::from(profit_before_tax.max(0)) * pct_to_fraction(scenario.tax_rate_pct));
    let profit_after_tax = profit_before_tax - tax;

    let funding_position = funding_position(snapshot, input.facilities, total_costs_ex_funding);
    if funding_position.equity_shortfall > 0 {
        warnings.push(format!(
            "Equity shortfall of {} cents: debt and equity do not cover development cost",
            funding_position.equity_shortfall
        ));
    }
    let total_debt = funding_position.total_debt;

    let land_cost = costs_by_category.land;
    let non_land_costs = total_costs_ex_funding - land_cost;
    let residual_land_value = total_revenue - non_land_costs - total_funding_costs;
    let target_margin = round_cents(Decimal::from(total_revenue) * pct_to_fraction(scenario.target_margin_pct));

    let npv = cashflow_npv(input.cashflow, scenario.discount_rate_pct);
    let irr = if input.cashflow.is_empty() {
        None
    } else {
        match cashflow_irr(input.cashflow) {
            Ok(rate) => Some(rate),
            Err(e) => {
                warnings.push(format!("IRR not applicable: {e}"));
                None
            }
        }
    };

    tracing::debug!(
        revenue = total_revenue,
        costs = total_costs,
        profit = profit_after_tax,
        "summary aggregated"
    );

    FeasibilitySummary {
        total_revenue,
        costs_by_category,
        land_cost,
        construction_cost: costs_by_category.construction,
        total_costs_ex_funding,
        ebit,
        funding_costs,
        total_funding_costs,
        total_costs,
        profit_before_tax,
        tax,
        profit_after_tax,
        profit_margin: percent_of(profit_after_tax, total_revenue),
        profit_on_cost: percent_of(profit_after_tax, total_costs),
        development_margin: percent_of(profit_before_tax, total_revenue),
        debt_leverage_pct: percent_of(total_debt, funding_position.total_funding),
        debt_to_cost_ratio: percent_of(total_debt, total_costs),
        debt_to_grv_ratio: percent_of(total_debt, total_revenue),
        funding_position,
        residual_land_value,
        residual_land_value_at_target: residual_land_value - target_margin,
        npv,
        irr,
        unit_metrics: unit_metrics(snapshot, total_revenue, total_costs, land_cost),
    }
}
