//! GST normalisation and the scenario's GST position.
//!
//! `calculate_gst` only ever receives GST-exclusive amounts. Anything
//! entered inclusive of GST goes through `normalize_to_ex_gst` first.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::resolver::ResolvedLineItem;
use crate::scenario::ScenarioSnapshot;
use crate::types::{round_cents, Cents};

/// Australian GST rate as a fraction.
pub const GST_RATE: Decimal = dec!(0.1);

/// Tax treatment of an entered price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GstStatus {
    /// GST is added on top of the price
    #[default]
    Exclusive,
    /// The price already contains GST
    Inclusive,
    /// No GST applies
    Exempt,
}

/// GST payable on a GST-exclusive amount.
pub fn calculate_gst(amount: Cents, status: GstStatus) -> Cents {
    match status {
        GstStatus::Exempt => 0,
        GstStatus::Exclusive | GstStatus::Inclusive => round_cents(Decimal::from(amount) * GST_RATE),
    }
}

/// Strip embedded GST from a price, leaving the ex-GST value.
pub fn normalize_to_ex_gst(price: Cents, status: GstStatus) -> Cents {
    match status {
        GstStatus::Exclusive | GstStatus::Exempt => price,
        GstStatus::Inclusive => round_cents(Decimal::from(price) / (Decimal::ONE + GST_RATE)),
    }
}

/// Net GST position of a scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstSummary {
    /// GST collected on active sales
    pub gst_on_sales: Cents,
    /// Input tax credits on cost line items
    pub input_credits_costs: Cents,
    /// Input tax credits on land purchases
    pub input_credits_land: Cents,
    /// Collected less credits; negative means a refund position
    pub net_gst_payable: Cents,
}

/// GST collected on sales less input credits on costs and land.
pub fn summarize_gst(snapshot: &ScenarioSnapshot, resolved: &[ResolvedLineItem]) -> GstSummary {
    let gst_on_sales: Cents = snapshot
        .sales_units
        .iter()
        .filter(|u| u.is_active())
        .map(|u| calculate_gst(u.price_ex_gst(), u.gst_status))
        .sum();

    let input_credits_costs: Cents = resolved
        .iter()
        .map(|r| calculate_gst(r.amount_ex_gst, r.gst_status))
        .sum();

    let input_credits_land: Cents = snapshot.land_lots.iter().map(|l| l.gst_credit()).sum();

    GstSummary {
        gst_on_sales,
        input_credits_costs,
        input_credits_land,
        net_gst_payable: gst_on_sales - input_credits_costs - input_credits_land,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{LandLot, SalesUnit};

    #[test]
    fn test_exempt_has_no_gst() {
        assert_eq!(calculate_gst(123_456, GstStatus::Exempt), 0);
    }

    #[test]
    fn test_gst_is_ten_percent_rounded() {
        assert_eq!(calculate_gst(100_00, GstStatus::Exclusive), 10_00);
        assert_eq!(calculate_gst(105, GstStatus::Exclusive), 11);
        assert_eq!(calculate_gst(104, GstStatus::Exclusive), 10);
    }

    #[test]
    fn test_normalize_inclusive() {
        assert_eq!(normalize_to_ex_gst(110_00, GstStatus::Inclusive), 100_00);
        // 1.00 inclusive -> 0.909 -> 0.91
        assert_eq!(normalize_to_ex_gst(100, GstStatus::Inclusive), 91);
    }

    #[test]
    fn test_normalize_exclusive_and_exempt_unchanged() {
        assert_eq!(normalize_to_ex_gst(110_00, GstStatus::Exclusive), 110_00);
        assert_eq!(normalize_to_ex_gst(110_00, GstStatus::Exempt), 110_00);
    }

    #[test]
    fn test_summary_nets_sales_against_credits() {
        let mut snap = ScenarioSnapshot::default();
        snap.sales_units.push(SalesUnit {
            sale_price: 3_300_000_00,
            gst_status: GstStatus::Inclusive,
            ..Default::default()
        });
        snap.land_lots.push(LandLot {
            purchase_price: 1_100_000_00,
            purchase_price_includes_gst: true,
            entity_gst_registered: true,
            ..Default::default()
        });
        let resolved = vec![ResolvedLineItem {
            amount_ex_gst: 2_000_000_00,
            gst_status: GstStatus::Exclusive,
            ..Default::default()
        }];

        let summary = summarize_gst(&snap, &resolved);
        assert_eq!(summary.gst_on_sales, 300_000_00);
        assert_eq!(summary.input_credits_costs, 200_000_00);
        assert_eq!(summary.input_credits_land, 100_000_00);
        assert_eq!(summary.net_gst_payable, 0);
    }
}
