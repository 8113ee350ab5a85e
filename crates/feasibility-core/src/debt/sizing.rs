use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scenario::{DebtFacility, FacilityPriority, LandLoanType, LvrBasis, SizingMode};
use crate::types::{pct_to_fraction, round_cents, Cents, Percent};

/// Totals an auto-sized facility's LVR can be applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingContext {
    pub total_revenue_ex_gst: Cents,
    pub total_costs_ex_funding: Cents,
}

/// A facility with its limit resolved, ready for the drawdown waterfall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizedFacility {
    pub id: Uuid,
    pub name: String,
    pub priority: FacilityPriority,
    pub sort_order: i32,
    pub size: Cents,
    pub interest_rate_pct: Percent,
    pub land_loan_type: LandLoanType,
    pub interest_provision: Cents,
    pub establishment_fee: Cents,
    pub line_fee: Cents,
}

impl SizedFacility {
    pub fn fees(&self) -> Cents {
        self.establishment_fee + self.line_fee
    }
}

/// Facility limit: the entered amount when manual, otherwise the LVR
/// percentage of total development cost or gross realisation value.
pub fn resolve_auto_facility_size(facility: &DebtFacility, context: &SizingContext) -> Cents {
    match facility.calculation_type {
        SizingMode::Manual => facility.total_facility,
        SizingMode::Auto => {
            let basis = match facility.lvr_method {
                LvrBasis::Grv => context.total_revenue_ex_gst,
                LvrBasis::Tdc => context.total_costs_ex_funding,
            };
            round_cents(Decimal::from(basis) * pct_to_fraction(facility.lvr_pct))
        }
    }
}

/// Establishment fee on the limit, plus the annual line fee pro-rated over
/// the months the facility is open within the project.
fn facility_fees(facility: &DebtFacility, size: Cents, project_length_months: u32) -> (Cents, Cents) {
    let establishment = round_cents(Decimal::from(size) * pct_to_fraction(facility.establishment_fee_pct));

    let open_months = if facility.term_months > 0 {
        facility.term_months.min(project_length_months)
    } else {
        project_length_months
    };
    let line = round_cents(
        Decimal::from(size) * pct_to_fraction(facility.line_fee_pct) * Decimal::from(open_months)
            / Decimal::from(12),
    );

    (establishment, line)
}

/// Size every facility and order them for the waterfall: senior before
/// mezzanine, then by `sort_order`.
pub fn size_facilities(
    facilities: &[DebtFacility],
    context: &SizingContext,
    project_length_months: u32,
) -> Vec<SizedFacility> {
    let mut sized: Vec<SizedFacility> = facilities
        .iter()
        .map(|f| {
            let size = resolve_auto_facility_size(f, context);
            let (establishment_fee, line_fee) = facility_fees(f, size, project_length_months);
            SizedFacility {
                id: f.id,
                name: f.name.clone(),
                priority: f.priority,
                sort_order: f.sort_order,
                size,
                interest_rate_pct: f.interest_rate_pct,
                land_loan_type: f.land_loan_type,
                interest_provision: f.interest_provision,
                establishment_fee,
                line_fee,
            }
        })
        .collect();

    sized.sort_by_key(|f| (f.priority, f.sort_order));
    sized
}
