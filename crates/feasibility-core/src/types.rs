use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All money crossing a module boundary, in minor currency units (cents).
pub type Cents = i64;

/// Percentages as plain numbers (65 = 65%). Never as fractions.
pub type Percent = Decimal;

/// Ratios reported as percentages; `None` when the denominator is zero.
pub type Ratio = Option<Decimal>;

/// Number of decimal places kept on reported ratios.
pub const RATIO_DP: u32 = 4;

/// Round a decimal amount of cents half away from zero to whole cents.
pub fn round_cents(amount: Decimal) -> Cents {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(if amount.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
}

/// Convert a percentage (65) into a fraction (0.65).
pub fn pct_to_fraction(pct: Percent) -> Decimal {
    pct / Decimal::ONE_HUNDRED
}

/// `numerator / denominator` as a percentage, or `None` for a zero denominator.
pub fn percent_of(numerator: Cents, denominator: Cents) -> Ratio {
    if denominator == 0 {
        return None;
    }
    let ratio = Decimal::from(numerator) / Decimal::from(denominator) * Decimal::ONE_HUNDRED;
    Some(ratio.round_dp(RATIO_DP))
}

/// `numerator / denominator` as a plain quotient, or `None` for a zero denominator.
pub fn per_unit(numerator: Cents, denominator: Decimal) -> Option<Cents> {
    if denominator.is_zero() {
        return None;
    }
    Some(round_cents(Decimal::from(numerator) / denominator))
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata.
///
/// No timing is recorded: the envelope is a pure function of its inputs.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "integer_cents_decimal_128bit".to_string(),
        },
    }
}
