//! Monthly cashflow projection.
//!
//! Every resolved line item, land purchase and sales settlement is placed
//! on the 1-based monthly timeline starting at the scenario's start date.
//! Amounts are conserved: the sum of a projection's monthly figures equals
//! the totals the summary reports.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::resolver::ResolvedLineItem;
use crate::scenario::{CostSection, Frequency, ScenarioSnapshot};
use crate::types::{round_cents, Cents};
use crate::FeasibilityResult;

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

/// Cost totals by category: land purchase plus each cost section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub land: Cents,
    pub acquisition: Cents,
    pub professional_fees: Cents,
    pub construction: Cents,
    pub dev_fees: Cents,
    pub land_holding: Cents,
    pub contingency: Cents,
    pub marketing: Cents,
    pub agent_fees: Cents,
    pub legal_fees: Cents,
    pub rental_costs: Cents,
}

impl CategoryTotals {
    fn slot(&mut self, section: CostSection) -> &mut Cents {
        match section {
            CostSection::Acquisition => &mut self.acquisition,
            CostSection::ProfessionalFees => &mut self.professional_fees,
            CostSection::Construction => &mut self.construction,
            CostSection::DevFees => &mut self.dev_fees,
            CostSection::LandHolding => &mut self.land_holding,
            CostSection::Contingency => &mut self.contingency,
            CostSection::Marketing => &mut self.marketing,
            CostSection::AgentFees => &mut self.agent_fees,
            CostSection::LegalFees => &mut self.legal_fees,
            CostSection::RentalCosts => &mut self.rental_costs,
        }
    }

    pub fn add(&mut self, section: CostSection, amount: Cents) {
        *self.slot(section) += amount;
    }

    pub fn get(&self, section: CostSection) -> Cents {
        match section {
            CostSection::Acquisition => self.acquisition,
            CostSection::ProfessionalFees => self.professional_fees,
            CostSection::Construction => self.construction,
            CostSection::DevFees => self.dev_fees,
            CostSection::LandHolding => self.land_holding,
            CostSection::Contingency => self.contingency,
            CostSection::Marketing => self.marketing,
            CostSection::AgentFees => self.agent_fees,
            CostSection::LegalFees => self.legal_fees,
            CostSection::RentalCosts => self.rental_costs,
        }
    }

    /// Land plus every section.
    pub fn total(&self) -> Cents {
        self.land + self.sections_total()
    }

    /// Every section, excluding the land purchase.
    pub fn sections_total(&self) -> Cents {
        CostSection::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One month of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowMonth {
    /// 1-based month index
    pub month: u32,
    /// Short label, e.g. "Jan 26"
    pub label: String,
    pub date: NaiveDate,
    pub revenue: Cents,
    #[serde(flatten)]
    pub costs: CategoryTotals,
    pub total_costs: Cents,
    pub net_cashflow: Cents,
    pub cumulative_cashflow: Cents,
}

// ---------------------------------------------------------------------------
// Spreading
// ---------------------------------------------------------------------------

/// Clamp an optional 1-based month into `[1, length]`.
fn clamp_month(month: Option<u32>, default: u32, length: u32) -> u32 {
    month.unwrap_or(default).clamp(1, length.max(1))
}

/// Place an amount on the timeline according to its frequency.
///
/// A one-off lands entirely in `start`. A recurring amount is split evenly
/// across the payment months inside `[start, start + span - 1]`, truncated at
/// the end of the project; leftover cents go to the last payment so the
/// parts always sum to `amount`.
pub fn spread_amount(
    amount: Cents,
    frequency: Frequency,
    start: u32,
    span: Option<u32>,
    length: u32,
) -> Vec<(u32, Cents)> {
    if length == 0 {
        return Vec::new();
    }
    let start = start.clamp(1, length);

    let cadence = match frequency.cadence_months() {
        None => return vec![(start, amount)],
        Some(c) => c,
    };

    let span = span.unwrap_or(length - start + 1).max(1);
    let end = start.saturating_add(span - 1).min(length);
    let months: Vec<u32> = (start..=end).step_by(cadence as usize).collect();

    let n = months.len() as Cents;
    let per_payment = amount / n;
    let remainder = amount - per_payment * n;

    months
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let extra = if i + 1 == months.len() { remainder } else { 0 };
            (*m, per_payment + extra)
        })
        .collect()
}

fn month_date(start: NaiveDate, month: u32) -> FeasibilityResult<NaiveDate> {
    start
        .checked_add_months(Months::new(month - 1))
        .ok_or_else(|| FeasibilityError::DateError(format!("month {month} overflows the calendar from {start}")))
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Build the monthly cashflow for a snapshot.
///
/// Returns an empty projection when the scenario has no start date or a zero
/// length. Months that had to be clamped into the timeline are reported in
/// `warnings`.
pub fn generate_cashflow(
    snapshot: &ScenarioSnapshot,
    resolved: &[ResolvedLineItem],
    warnings: &mut Vec<String>,
) -> FeasibilityResult<Vec<CashflowMonth>> {
    let scenario = &snapshot.scenario;
    let length = scenario.project_length_months;
    let start_date = match scenario.start_date {
        Some(d) if length > 0 => d,
        _ => return Ok(Vec::new()),
    };

    let n = length as usize;
    let mut revenue = vec![0 as Cents; n];
    let mut costs = vec![CategoryTotals::default(); n];

    for item in resolved {
        let start = item.cashflow_start_month.unwrap_or(1);
        if start == 0 || start > length {
            warnings.push(format!(
                "Line item '{}' starts in month {start}, outside the {length}-month timeline; clamped",
                item.description
            ));
        }
        for (m, amount) in spread_amount(
            item.amount_ex_gst,
            item.frequency,
            start,
            item.cashflow_span_months,
            length,
        ) {
            costs[(m - 1) as usize].add(item.section, amount);
        }
    }

    for lot in &snapshot.land_lots {
        let cost = lot.cost_ex_gst();
        let deposit = if lot.purchase_price == 0 {
            0
        } else {
            round_cents(
                Decimal::from(cost) * Decimal::from(lot.deposit()) / Decimal::from(lot.purchase_price),
            )
        };
        let settlement = clamp_month(lot.settlement_month, 1, length);
        costs[0].land += deposit;
        costs[(settlement - 1) as usize].land += cost - deposit;
    }

    for unit in snapshot.sales_units.iter().filter(|u| u.is_active()) {
        let month = clamp_month(unit.settlement_month, length, length);
        revenue[(month - 1) as usize] += unit.revenue_ex_gst();
    }

    let mut months = Vec::with_capacity(n);
    let mut cumulative: Cents = 0;
    for i in 0..n {
        let month = (i + 1) as u32;
        let date = month_date(start_date, month)?;
        let total_costs = costs[i].total();
        let net_cashflow = revenue[i] - total_costs;
        cumulative += net_cashflow;
        months.push(CashflowMonth {
            month,
            label: date.format("%b %y").to_string(),
            date,
            revenue: revenue[i],
            costs: costs[i],
            total_costs,
            net_cashflow,
            cumulative_cashflow: cumulative,
        });
    }

    tracing::debug!(months = months.len(), closing = cumulative, "cashflow generated");
    Ok(months)
}

/// Monthly total costs of a projection.
pub fn monthly_costs(months: &[CashflowMonth]) -> Vec<Cents> {
    months.iter().map(|m| m.total_costs).collect()
}

/// Monthly revenue of a projection.
pub fn monthly_revenue(months: &[CashflowMonth]) -> Vec<Cents> {
    months.iter().map(|m| m.revenue).collect()
}

/// Monthly net cashflow of a projection.
pub fn net_series(months: &[CashflowMonth]) -> Vec<Cents> {
    months.iter().map(|m| m.net_cashflow).collect()
}
