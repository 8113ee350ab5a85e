use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scenario::{DebtLoan, RepaymentType};
use crate::time_value;
use crate::types::{pct_to_fraction, round_cents, Cents};

/// Funding cost of a fixed-principal loan over the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCost {
    pub loan_id: Uuid,
    pub name: String,
    pub principal: Cents,
    /// Months of the loan that fall inside the project
    pub months_in_project: u32,
    pub interest: Cents,
    pub establishment_fee: Cents,
    pub total_cost: Cents,
}

/// Interest and fees a loan costs the project.
///
/// Interest-only loans accrue simple interest for the months they run
/// inside the project. Principal-and-interest loans amortise over their full
/// term at the payment period's rate; periods completed inside the project
/// are costed in full and a trailing part period accrues pro rata.
pub fn loan_cost(loan: &DebtLoan, project_length_months: u32) -> LoanCost {
    let months = if loan.term_months > 0 {
        loan.term_months.min(project_length_months)
    } else {
        project_length_months
    };
    let principal = Decimal::from(loan.principal);
    let annual_rate = pct_to_fraction(loan.interest_rate_pct);

    let interest = match loan.repayment_type {
        RepaymentType::InterestOnly => principal * annual_rate * Decimal::from(months) / Decimal::from(12),
        RepaymentType::PrincipalAndInterest => amortising_interest(loan, principal, annual_rate, months),
    };
    let interest = round_cents(interest);

    LoanCost {
        loan_id: loan.id,
        name: loan.name.clone(),
        principal: loan.principal,
        months_in_project: months,
        interest,
        establishment_fee: loan.establishment_fee,
        total_cost: interest + loan.establishment_fee,
    }
}

fn amortising_interest(loan: &DebtLoan, principal: Decimal, annual_rate: Decimal, months: u32) -> Decimal {
    let period_months = loan.payment_period.months();
    let term_months = if loan.term_months > 0 {
        loan.term_months
    } else {
        months
    };
    let total_periods = (term_months / period_months).max(1);
    let periods_in_project = (months / period_months).min(total_periods);

    let period_rate = annual_rate * Decimal::from(period_months) / Decimal::from(12);
    let payment = match time_value::pmt(period_rate, total_periods, principal, Decimal::ZERO) {
        Ok(p) => -p,
        Err(_) => return Decimal::ZERO,
    };

    let mut balance = principal;
    let mut interest = Decimal::ZERO;
    for _ in 0..periods_in_project {
        let period_interest = balance * period_rate;
        interest += period_interest;
        balance -= payment - period_interest;
    }

    let leftover = months % period_months;
    if periods_in_project < total_periods && leftover > 0 {
        interest += balance * period_rate * Decimal::from(leftover) / Decimal::from(period_months);
    }
    interest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::PaymentPeriod;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_interest_only_within_project() {
        let loan = DebtLoan {
            principal: 1_000_000_00,
            interest_rate_pct: dec!(6),
            term_months: 24,
            establishment_fee: 5_000_00,
            ..Default::default()
        };
        let cost = loan_cost(&loan, 12);
        assert_eq!(cost.months_in_project, 12);
        assert_eq!(cost.interest, 60_000_00);
        assert_eq!(cost.total_cost, 65_000_00);
    }

    #[test]
    fn test_principal_and_interest_costs_less_than_interest_only() {
        let mut loan = DebtLoan {
            principal: 1_200_000_00,
            interest_rate_pct: dec!(12),
            term_months: 12,
            payment_period: PaymentPeriod::Monthly,
            ..Default::default()
        };
        let io = loan_cost(&loan, 12).interest;
        loan.repayment_type = RepaymentType::PrincipalAndInterest;
        let pi = loan_cost(&loan, 12).interest;
        assert_eq!(io, 144_000_00);
        assert!(pi < io);
        // 12 level payments of ~106,618.55 on 1.2m at 1% per month
        assert!((pi - 79_422_58).abs() < 100);
    }

    #[test]
    fn test_principal_and_interest_accrues_part_period() {
        let mut loan = DebtLoan {
            principal: 1_000_000_00,
            interest_rate_pct: dec!(12),
            term_months: 24,
            payment_period: PaymentPeriod::Annually,
            ..Default::default()
        };
        let io = loan_cost(&loan, 6).interest;
        loan.repayment_type = RepaymentType::PrincipalAndInterest;
        let pi = loan_cost(&loan, 6).interest;
        assert_eq!(io, 60_000_00);
        assert_eq!(pi, 60_000_00);

        // one full year then six months on the amortised balance
        let pi_18 = loan_cost(&loan, 18).interest;
        let payment = -time_value::pmt(dec!(0.12), 2, dec!(1_000_000_00), Decimal::ZERO).unwrap();
        let balance = dec!(1_000_000_00) - (payment - dec!(120_000_00));
        assert_eq!(pi_18, round_cents(dec!(120_000_00) + balance * dec!(0.06)));
    }

    #[test]
    fn test_zero_rate_loan_costs_only_fee() {
        let loan = DebtLoan {
            principal: 500_000_00,
            repayment_type: RepaymentType::PrincipalAndInterest,
            establishment_fee: 1_000_00,
            ..Default::default()
        };
        let cost = loan_cost(&loan, 12);
        assert_eq!(cost.interest, 0);
        assert_eq!(cost.total_cost, 1_000_00);
    }
}
