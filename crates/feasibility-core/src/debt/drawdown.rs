//! Prioritised multi-facility drawdown waterfall.
//!
//! Each month's unfunded cost is met first from remaining equity, then from
//! facilities in priority order. Facilities are non-revolving: headroom is
//! `size - cumulative drawn`, and repayments do not restore it. Interest
//! accrues monthly on the opening outstanding balance; provisioned interest
//! is capitalised against headroom, serviced interest is paid from outside.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sizing::SizedFacility;
use crate::scenario::{FacilityPriority, LandLoanType};
use crate::types::{pct_to_fraction, percent_of, round_cents, Cents, Ratio};

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownInput {
    pub facilities: Vec<SizedFacility>,
    /// Project costs per month, month 1 first
    pub monthly_costs: Vec<Cents>,
    /// Sales receipts per month, applied to repay outstanding balances
    #[serde(default)]
    pub monthly_receipts: Vec<Cents>,
    /// Equity that funds costs before any debt is drawn
    #[serde(default)]
    pub equity_available: Cents,
}

/// Drawdown of a single facility across the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownResult {
    pub facility_id: Uuid,
    pub name: String,
    pub priority: FacilityPriority,
    pub land_loan_type: LandLoanType,
    pub size: Cents,
    /// Cumulative amount drawn at each month end (costs plus capitalised interest)
    pub cumulative_drawn: Vec<Cents>,
    /// Balance owing at each month end after repayments
    pub outstanding: Vec<Cents>,
    pub monthly_interest: Vec<Cents>,
    pub peak_drawn: Cents,
    pub total_interest: Cents,
    pub capitalised_interest: Cents,
    /// Peak drawn as a percentage of size
    pub utilisation: Ratio,
}

/// Whether costs were met by equity and debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FundingStatus {
    FullyFunded,
    Shortfall { amount: Cents },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSchedule {
    pub facilities: Vec<DrawdownResult>,
    /// Equity applied to costs each month
    pub equity_drawn: Vec<Cents>,
    /// Demand left unmet each month after every facility
    pub monthly_shortfall: Vec<Cents>,
    pub total_shortfall: Cents,
    pub total_interest: Cents,
    pub status: FundingStatus,
}

impl DrawdownSchedule {
    pub fn is_fully_funded(&self) -> bool {
        self.status == FundingStatus::FullyFunded
    }
}

// ---------------------------------------------------------------------------
// Waterfall
// ---------------------------------------------------------------------------

/// Running state of one facility.
struct FacilityLedger<'a> {
    facility: &'a SizedFacility,
    drawn: Cents,
    outstanding: Cents,
    result: DrawdownResult,
}

impl<'a> FacilityLedger<'a> {
    fn new(facility: &'a SizedFacility, months: usize) -> Self {
        Self {
            facility,
            drawn: 0,
            outstanding: 0,
            result: DrawdownResult {
                facility_id: facility.id,
                name: facility.name.clone(),
                priority: facility.priority,
                land_loan_type: facility.land_loan_type,
                size: facility.size,
                cumulative_drawn: Vec::with_capacity(months),
                outstanding: Vec::with_capacity(months),
                monthly_interest: Vec::with_capacity(months),
                ..Default::default()
            },
        }
    }

    fn headroom(&self) -> Cents {
        (self.facility.size - self.drawn).max(0)
    }

    fn draw(&mut self, amount: Cents) {
        self.drawn += amount;
        self.outstanding += amount;
    }

    /// Draw against unmet demand, accrue the month's interest and return the
    /// demand still unmet (including interest this facility could not hold).
    fn fund_month(&mut self, demand: Cents) -> Cents {
        let opening = self.outstanding;

        let draw = demand.min(self.headroom());
        self.draw(draw);
        let mut unmet = demand - draw;

        let monthly_rate = pct_to_fraction(self.facility.interest_rate_pct) / Decimal::from(12);
        let interest = round_cents(Decimal::from(opening) * monthly_rate);
        self.result.total_interest += interest;

        if self.facility.land_loan_type == LandLoanType::Provisioned {
            let capitalised = interest.min(self.headroom());
            self.draw(capitalised);
            self.result.capitalised_interest += capitalised;
            unmet += interest - capitalised;
        }

        self.result.monthly_interest.push(interest);
        unmet
    }

    fn repay(&mut self, available: Cents) -> Cents {
        let paid = available.min(self.outstanding);
        self.outstanding -= paid;
        available - paid
    }

    fn close_month(&mut self) {
        self.result.cumulative_drawn.push(self.drawn);
        self.result.outstanding.push(self.outstanding);
    }

    fn finish(mut self, warnings: &mut Vec<String>) -> DrawdownResult {
        let f = self.facility;
        self.result.peak_drawn = self.result.cumulative_drawn.iter().copied().max().unwrap_or(0);
        self.result.utilisation = percent_of(self.result.peak_drawn, f.size);

        if f.size <= 0 {
            warnings.push(format!("Facility '{}' has no lending limit", f.name));
        }
        if f.land_loan_type == LandLoanType::Provisioned
            && f.interest_provision > 0
            && self.result.capitalised_interest > f.interest_provision
        {
            warnings.push(format!(
                "Facility '{}' capitalised interest {} exceeds its interest provision {}",
                f.name, self.result.capitalised_interest, f.interest_provision
            ));
        }

        tracing::debug!(
            facility = %f.name,
            size = f.size,
            peak = self.result.peak_drawn,
            interest = self.result.total_interest,
            "facility drawdown complete"
        );
        self.result
    }
}

/// Allocate each month's costs across equity and the facilities.
///
/// Facilities are ordered senior first, ties broken by `sort_order`,
/// regardless of input order.
pub fn run_drawdown(input: &DrawdownInput, warnings: &mut Vec<String>) -> DrawdownSchedule {
    let months = input.monthly_costs.len();

    let mut ordered: Vec<&SizedFacility> = input.facilities.iter().collect();
    ordered.sort_by_key(|f| (f.priority, f.sort_order));
    let mut ledgers: Vec<FacilityLedger> = ordered.into_iter().map(|f| FacilityLedger::new(f, months)).collect();

    let mut equity_remaining = input.equity_available.max(0);
    let mut equity_drawn = Vec::with_capacity(months);
    let mut monthly_shortfall = Vec::with_capacity(months);

    for (i, cost) in input.monthly_costs.iter().enumerate() {
        let mut demand = (*cost).max(0);

        let from_equity = demand.min(equity_remaining);
        equity_remaining -= from_equity;
        demand -= from_equity;
        equity_drawn.push(from_equity);

        for ledger in ledgers.iter_mut() {
            demand = ledger.fund_month(demand);
        }
        monthly_shortfall.push(demand);

        let mut receipts = input.monthly_receipts.get(i).copied().unwrap_or(0).max(0);
        for ledger in ledgers.iter_mut() {
            receipts = ledger.repay(receipts);
            ledger.close_month();
        }
    }

    let facilities: Vec<DrawdownResult> = ledgers.into_iter().map(|l| l.finish(warnings)).collect();
    let total_shortfall: Cents = monthly_shortfall.iter().sum();
    let total_interest: Cents = facilities.iter().map(|f| f.total_interest).sum();

    let status = if total_shortfall > 0 {
        tracing::warn!(shortfall = total_shortfall, "funding shortfall");
        warnings.push(format!("Funding shortfall of {total_shortfall} cents after all facilities"));
        FundingStatus::Shortfall {
            amount: total_shortfall,
        }
    } else {
        FundingStatus::FullyFunded
    };

    DrawdownSchedule {
        facilities,
        equity_drawn,
        monthly_shortfall,
        total_shortfall,
        total_interest,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn facility(name: &str, priority: FacilityPriority, size: Cents, loan_type: LandLoanType) -> SizedFacility {
        SizedFacility {
            name: name.into(),
            priority,
            size,
            interest_rate_pct: dec!(12),
            land_loan_type: loan_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_serviced_facility_interest_on_opening_balance() {
        let input = DrawdownInput {
            facilities: vec![facility("Senior", FacilityPriority::Senior, 10_000_00, LandLoanType::Serviced)],
            monthly_costs: vec![1_000_00, 1_000_00, 0],
            ..Default::default()
        };
        let schedule = run_drawdown(&input, &mut Vec::new());
        let senior = &schedule.facilities[0];
        assert_eq!(senior.cumulative_drawn, vec![1_000_00, 2_000_00, 2_000_00]);
        // 1% per month on opening 0, 1000, 2000
        assert_eq!(senior.monthly_interest, vec![0, 10_00, 20_00]);
        assert_eq!(senior.total_interest, 30_00);
        assert_eq!(senior.capitalised_interest, 0);
        assert!(schedule.is_fully_funded());
    }

    #[test]
    fn test_provisioned_interest_is_capitalised() {
        let input = DrawdownInput {
            facilities: vec![facility("Senior", FacilityPriority::Senior, 10_000_00, LandLoanType::Provisioned)],
            monthly_costs: vec![1_000_00, 0, 0],
            ..Default::default()
        };
        let schedule = run_drawdown(&input, &mut Vec::new());
        let senior = &schedule.facilities[0];
        // month 2: 1% of 1000.00; month 3: 1% of 1010.00
        assert_eq!(senior.cumulative_drawn, vec![1_000_00, 1_010_00, 1_020_10]);
        assert_eq!(senior.total_interest, 20_10);
        assert_eq!(senior.capitalised_interest, 20_10);
        assert_eq!(senior.peak_drawn, 1_020_10);
    }

    #[test]
    fn test_senior_exhausted_before_mezzanine() {
        let input = DrawdownInput {
            facilities: vec![
                facility("Mezz", FacilityPriority::Mezzanine, 5_000_00, LandLoanType::Serviced),
                facility("Senior", FacilityPriority::Senior, 2_500_00, LandLoanType::Serviced),
            ],
            monthly_costs: vec![1_000_00, 1_000_00, 1_000_00, 1_000_00],
            ..Default::default()
        };
        let schedule = run_drawdown(&input, &mut Vec::new());
        let senior = &schedule.facilities[0];
        let mezz = &schedule.facilities[1];
        assert_eq!(senior.name, "Senior");
        assert_eq!(senior.cumulative_drawn, vec![1_000_00, 2_000_00, 2_500_00, 2_500_00]);
        assert_eq!(mezz.cumulative_drawn, vec![0, 0, 500_00, 1_500_00]);
        assert_eq!(senior.utilisation, Some(dec!(100)));
    }

    #[test]
    fn test_shortfall_is_reported() {
        let input = DrawdownInput {
            facilities: vec![facility("Senior", FacilityPriority::Senior, 1_500_00, LandLoanType::Serviced)],
            monthly_costs: vec![1_000_00, 1_000_00],
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let schedule = run_drawdown(&input, &mut warnings);
        assert_eq!(schedule.monthly_shortfall, vec![0, 500_00]);
        assert_eq!(schedule.status, FundingStatus::Shortfall { amount: 500_00 });
        assert!(!warnings.is_empty());
    }

    #[test]
    fn test_equity_funds_first() {
        let input = DrawdownInput {
            facilities: vec![facility("Senior", FacilityPriority::Senior, 5_000_00, LandLoanType::Serviced)],
            monthly_costs: vec![1_000_00, 1_000_00],
            equity_available: 1_500_00,
            ..Default::default()
        };
        let schedule = run_drawdown(&input, &mut Vec::new());
        assert_eq!(schedule.equity_drawn, vec![1_000_00, 500_00]);
        assert_eq!(schedule.facilities[0].cumulative_drawn, vec![0, 500_00]);
    }

    #[test]
    fn test_receipts_repay_senior_without_restoring_headroom() {
        let input = DrawdownInput {
            facilities: vec![facility("Senior", FacilityPriority::Senior, 1_000_00, LandLoanType::Serviced)],
            monthly_costs: vec![1_000_00, 0, 500_00],
            monthly_receipts: vec![0, 1_000_00, 0],
            ..Default::default()
        };
        let schedule = run_drawdown(&input, &mut Vec::new());
        let senior = &schedule.facilities[0];
        assert_eq!(senior.outstanding, vec![1_000_00, 0, 0]);
        assert_eq!(senior.cumulative_drawn, vec![1_000_00, 1_000_00, 1_000_00]);
        assert_eq!(schedule.monthly_shortfall, vec![0, 0, 500_00]);
    }

    #[test]
    fn test_provisioned_interest_overflow_rolls_to_next_facility() {
        let input = DrawdownInput {
            facilities: vec![
                facility("Senior", FacilityPriority::Senior, 1_000_00, LandLoanType::Provisioned),
                facility("Mezz", FacilityPriority::Mezzanine, 1_000_00, LandLoanType::Serviced),
            ],
            monthly_costs: vec![1_000_00, 0],
            ..Default::default()
        };
        let schedule = run_drawdown(&input, &mut Vec::new());
        assert_eq!(schedule.facilities[0].cumulative_drawn, vec![1_000_00, 1_000_00]);
        assert_eq!(schedule.facilities[0].total_interest, 10_00);
        assert_eq!(schedule.facilities[1].cumulative_drawn, vec![0, 10_00]);
        assert!(schedule.is_fully_funded());
    }

    #[test]
    fn test_interest_provision_warning() {
        let mut senior = facility("Senior", FacilityPriority::Senior, 10_000_00, LandLoanType::Provisioned);
        senior.interest_provision = 5_00;
        let input = DrawdownInput {
            facilities: vec![senior],
            monthly_costs: vec![1_000_00, 0],
            ..Default::default()
        };
        let mut warnings = Vec::new();
        run_drawdown(&input, &mut warnings);
        assert!(warnings.iter().any(|w| w.contains("interest provision")));
    }

    #[test]
    fn test_empty_series() {
        let schedule = run_drawdown(&DrawdownInput::default(), &mut Vec::new());
        assert!(schedule.facilities.is_empty());
        assert!(schedule.is_fully_funded());
    }
}
