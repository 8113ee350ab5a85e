use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::FeasibilityError;
use crate::types::{pct_to_fraction, Cents, Percent};
use crate::FeasibilityResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;

/// Brackets tried, in order, when Newton-Raphson fails to converge.
const IRR_BRACKETS: [(Decimal, Decimal); 3] = [
    (dec!(-0.5), dec!(1.0)),
    (dec!(-0.9), dec!(5.0)),
    (dec!(-0.25), dec!(0.5)),
];

/// Convert an annual percentage rate into the equivalent compounded
/// monthly rate as a fraction: `(1 + r)^(1/12) - 1`.
pub fn monthly_rate_from_annual(annual_pct: Percent) -> Decimal {
    let one_plus_r = Decimal::ONE + pct_to_fraction(annual_pct);
    if one_plus_r <= Decimal::ZERO {
        return dec!(-1);
    }
    match one_plus_r.checked_powd(Decimal::ONE / dec!(12)) {
        Some(root) => root - Decimal::ONE,
        None => Decimal::ZERO,
    }
}

/// Annualise a monthly fraction: `(1 + m)^12 - 1`. `None` on overflow.
pub fn annualise_monthly_rate(monthly: Decimal) -> Option<Decimal> {
    let one_plus_m = Decimal::ONE + monthly;
    let mut factor = Decimal::ONE;
    for _ in 0..12 {
        factor = factor.checked_mul(one_plus_m)?;
    }
    Some(factor - Decimal::ONE)
}

/// Whether a cash flow series contains both strictly positive and strictly
/// negative values. IRR is undefined without one.
pub fn has_sign_change(cash_flows: &[Decimal]) -> bool {
    let positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    positive && negative
}

/// Lift a cents series into decimals for discounting.
pub fn to_decimal_flows(cash_flows: &[Cents]) -> Vec<Decimal> {
    cash_flows.iter().map(|cf| Decimal::from(*cf)).collect()
}

/// Net Present Value of a series of periodic cash flows. The first flow is
/// undiscounted.
pub fn npv(rate: Decimal, cash_flows: &[Decimal]) -> FeasibilityResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(FeasibilityError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    npv_checked(rate, cash_flows).ok_or_else(|| FeasibilityError::DivisionByZero {
        context: "NPV discount factor".into(),
    })
}

/// NPV that returns `None` instead of overflowing or dividing by an
/// underflowed discount factor.
fn npv_checked(rate: Decimal, cash_flows: &[Decimal]) -> Option<Decimal> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        result = result.checked_add(cf.checked_div(discount)?)?;
    }

    Some(result)
}

/// NPV and its first derivative with respect to the rate.
fn npv_and_derivative(rate: Decimal, cash_flows: &[Decimal]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let t_dec = Decimal::from(t as i64);
            let term = t_dec
                .checked_mul(*cf)?
                .checked_div(discount.checked_mul(one_plus_r)?)?;
            dnpv = dnpv.checked_sub(term)?;
        }
    }

    Some((npv_val, dnpv))
}

/// Periodic Internal Rate of Return.
///
/// Newton-Raphson from `guess`, falling back to bisection over a set of
/// brackets. Errors when the series has no sign change or no root is found.
pub fn irr(cash_flows: &[Decimal], guess: Decimal) -> FeasibilityResult<Decimal> {
    if cash_flows.len() < 2 {
        return Err(FeasibilityError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    if !has_sign_change(cash_flows) {
        return Err(FeasibilityError::InsufficientData(
            "IRR requires at least one positive and one negative cash flow".into(),
        ));
    }

    if let Some(rate) = newton_irr(cash_flows, guess) {
        return Ok(rate);
    }

    for (lo, hi) in IRR_BRACKETS {
        if let Some(rate) = bisection_irr(cash_flows, lo, hi) {
            return Ok(rate);
        }
    }

    Err(FeasibilityError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS + MAX_BISECTION_ITERATIONS,
        last_delta: npv_checked(guess, cash_flows).unwrap_or(Decimal::MAX),
    })
}

fn newton_irr(cash_flows: &[Decimal], guess: Decimal) -> Option<Decimal> {
    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_and_derivative(rate, cash_flows)?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Some(rate);
        }
        if dnpv.is_zero() {
            return None;
        }

        rate = rate.checked_sub(npv_val.checked_div(dnpv)?)?;

        // Guard against divergence
        if rate < dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > dec!(100.0) {
            rate = dec!(100.0);
        }
    }

    None
}

fn bisection_irr(cash_flows: &[Decimal], lo: Decimal, hi: Decimal) -> Option<Decimal> {
    let mut lo = lo;
    let mut hi = hi;
    let mut f_lo = npv_checked(lo, cash_flows)?;
    let f_hi = npv_checked(hi, cash_flows)?;

    if f_lo.is_zero() {
        return Some(lo);
    }
    if f_hi.is_zero() {
        return Some(hi);
    }
    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return None;
    }

    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let f_mid = npv_checked(mid, cash_flows)?;

        if f_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo) < CONVERGENCE_THRESHOLD {
            return Some(mid);
        }

        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Some((lo + hi) / dec!(2))
}

/// Level payment per period (PMT) for an amortising loan.
pub fn pmt(rate: Decimal, nper: u32, present_value: Decimal, future_value: Decimal) -> FeasibilityResult<Decimal> {
    if nper == 0 {
        return Err(FeasibilityError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let one_plus_r = Decimal::ONE + rate;
    let factor = one_plus_r
        .checked_powd(Decimal::from(nper))
        .ok_or_else(|| FeasibilityError::InvalidInput {
            field: "rate".into(),
            reason: format!("Compounding over {nper} periods overflows"),
        })?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    if annuity_factor.is_zero() {
        return Err(FeasibilityError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    Ok(-(present_value * factor + future_value) / annuity_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_below_minus_one() {
        assert!(npv(dec!(-1), &[dec!(1)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_no_sign_change_is_error() {
        let cfs = vec![dec!(100), dec!(200), dec!(300)];
        assert!(irr(&cfs, dec!(0.10)).is_err());
    }

    #[test]
    fn test_irr_single_flow_is_error() {
        assert!(irr(&[dec!(-100)], dec!(0.10)).is_err());
    }

    #[test]
    fn test_bisection_finds_root() {
        let cfs = vec![dec!(-100), dec!(0), dec!(121)];
        let rate = bisection_irr(&cfs, dec!(-0.5), dec!(1.0)).unwrap();
        assert!((rate - dec!(0.10)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_monthly_rate_round_trip() {
        let monthly = monthly_rate_from_annual(dec!(10));
        let annual = annualise_monthly_rate(monthly).unwrap();
        assert!((annual - dec!(0.10)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_monthly_rate_zero() {
        assert!(monthly_rate_from_annual(Decimal::ZERO).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_pmt_zero_rate() {
        let result = pmt(Decimal::ZERO, 10, dec!(1000), Decimal::ZERO).unwrap();
        assert_eq!(result, dec!(-100));
    }

    #[test]
    fn test_pmt_amortising() {
        // 1000 over 12 months at 1% per month ≈ 88.85
        let result = pmt(dec!(0.01), 12, dec!(1000), Decimal::ZERO).unwrap();
        assert!((result + dec!(88.85)).abs() < dec!(0.01));
    }
}
