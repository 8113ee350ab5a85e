//! Line-item amount resolution.
//!
//! A line item's rate is turned into currency against a
//! [`ResolutionContext`] of scenario totals. The context is built once per
//! snapshot and passed explicitly; nothing here reads shared state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gst::{self, GstStatus};
use crate::scenario::{CostSection, Frequency, LineItem, RateType, ScenarioSnapshot};
use crate::types::{pct_to_fraction, round_cents, Cents};

/// Scenario totals a rate can be expressed against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionContext {
    /// Site area in m²
    pub total_land_size: Decimal,
    pub lot_count: u32,
    pub construction_total: Cents,
    /// Gross realisation value, ex-GST
    pub grv_total: Cents,
    pub project_costs_total: Cents,
    pub project_length_months: u32,
}

/// A line item with its live, ex-GST amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLineItem {
    pub id: Uuid,
    pub section: CostSection,
    pub tab: String,
    pub description: String,
    pub rate_type: RateType,
    pub gst_status: GstStatus,
    pub frequency: Frequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashflow_start_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashflow_span_months: Option<u32>,
    pub amount_ex_gst: Cents,
    pub gst_amount: Cents,
}

/// Amount one unit of the item's rate implies, before GST normalisation.
fn unit_gross(item: &LineItem, context: &ResolutionContext) -> Cents {
    let rate = item.rate;

    let amount = match item.rate_type {
        RateType::FixedAmount => rate,
        RateType::PerM2 => rate * context.total_land_size,
        RateType::PerLot => rate * Decimal::from(context.lot_count.max(1)),
        RateType::PercentOfConstruction => pct_to_fraction(rate) * Decimal::from(context.construction_total),
        RateType::PercentOfRevenue => pct_to_fraction(rate) * Decimal::from(context.grv_total),
        RateType::PerMonth => rate * Decimal::from(context.project_length_months),
        RateType::PercentOfProjectCosts => pct_to_fraction(rate) * Decimal::from(context.project_costs_total),
    };

    round_cents(amount)
}

/// Amount implied by the item's rate before any GST normalisation.
pub fn resolve_line_item_gross(item: &LineItem, context: &ResolutionContext) -> Cents {
    round_cents(item.quantity * Decimal::from(unit_gross(item, context)))
}

/// Live ex-GST amount of a line item.
///
/// A single unit is rounded and normalised first, then scaled by quantity,
/// so whole quantities resolve to exact multiples of the unit amount.
pub fn resolve_line_item_amount(item: &LineItem, context: &ResolutionContext) -> Cents {
    let unit_ex_gst = gst::normalize_to_ex_gst(unit_gross(item, context), item.gst_status);
    round_cents(item.quantity * Decimal::from(unit_ex_gst))
}

/// Narrow the context to the land lot an item is scoped to, if any.
///
/// A link to a lot that no longer exists falls back to the whole site.
pub fn scoped_context(
    item: &LineItem,
    snapshot: &ScenarioSnapshot,
    context: &ResolutionContext,
) -> ResolutionContext {
    let lot = item
        .land_lot_id
        .and_then(|id| snapshot.land_lots.iter().find(|l| l.id == id));

    match lot {
        Some(lot) => ResolutionContext {
            total_land_size: lot.land_area_m2,
            lot_count: 1,
            ..context.clone()
        },
        None => context.clone(),
    }
}

fn resolve_scoped(item: &LineItem, snapshot: &ScenarioSnapshot, context: &ResolutionContext) -> Cents {
    resolve_line_item_amount(item, &scoped_context(item, snapshot, context))
}

/// Build the resolution context for a snapshot.
///
/// Totals are accumulated in dependency order: revenue and site figures
/// first, then construction (excluding items that are themselves a share of
/// a cost total), then project costs (everything except items that are a
/// share of project costs).
pub fn build_context(snapshot: &ScenarioSnapshot) -> ResolutionContext {
    let mut context = ResolutionContext {
        total_land_size: snapshot.land_lots.iter().map(|l| l.land_area_m2).sum(),
        lot_count: snapshot.land_lots.len() as u32,
        construction_total: 0,
        grv_total: snapshot.sales_units.iter().map(|u| u.revenue_ex_gst()).sum(),
        project_costs_total: 0,
        project_length_months: snapshot.scenario.project_length_months,
    };

    context.construction_total = snapshot
        .line_items
        .iter()
        .filter(|i| i.section == CostSection::Construction && !i.rate_type.depends_on_costs())
        .map(|i| resolve_scoped(i, snapshot, &context))
        .sum();

    context.project_costs_total = snapshot.land_cost_ex_gst()
        + snapshot
            .line_items
            .iter()
            .filter(|i| i.rate_type != RateType::PercentOfProjectCosts)
            .map(|i| resolve_scoped(i, snapshot, &context))
            .sum::<Cents>();

    tracing::debug!(
        land_size = %context.total_land_size,
        lots = context.lot_count,
        construction = context.construction_total,
        grv = context.grv_total,
        project_costs = context.project_costs_total,
        "resolution context built"
    );

    context
}

/// Resolve every line item of a snapshot against its context.
pub fn resolve_line_items(snapshot: &ScenarioSnapshot, context: &ResolutionContext) -> Vec<ResolvedLineItem> {
    snapshot
        .line_items
        .iter()
        .map(|item| {
            let amount_ex_gst = resolve_scoped(item, snapshot, context);
            ResolvedLineItem {
                id: item.id,
                section: item.section,
                tab: item.tab.clone(),
                description: item.description.clone(),
                rate_type: item.rate_type,
                gst_status: item.gst_status,
                frequency: item.frequency,
                cashflow_start_month: item.cashflow_start_month,
                cashflow_span_months: item.cashflow_span_months,
                amount_ex_gst,
                gst_amount: gst::calculate_gst(amount_ex_gst, item.gst_status),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{LandLot, SalesUnit};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn ctx() -> ResolutionContext {
        ResolutionContext {
            total_land_size: dec!(1000),
            lot_count: 4,
            construction_total: 2_000_000_00,
            grv_total: 5_000_000_00,
            project_costs_total: 3_000_000_00,
            project_length_months: 18,
        }
    }

    fn item(rate_type: RateType, rate: Decimal) -> LineItem {
        LineItem {
            rate_type,
            rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_amount() {
        let mut i = item(RateType::FixedAmount, dec!(2500_00));
        i.quantity = dec!(3);
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 7500_00);
    }

    #[test]
    fn test_per_m2() {
        let i = item(RateType::PerM2, dec!(45_00));
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 45_000_00);
    }

    #[test]
    fn test_per_lot_uses_at_least_one_lot() {
        let i = item(RateType::PerLot, dec!(10_000_00));
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 40_000_00);

        let no_lots = ResolutionContext {
            lot_count: 0,
            ..ctx()
        };
        assert_eq!(resolve_line_item_amount(&i, &no_lots), 10_000_00);
    }

    #[test]
    fn test_percent_types() {
        let construction = item(RateType::PercentOfConstruction, dec!(5));
        assert_eq!(resolve_line_item_amount(&construction, &ctx()), 100_000_00);

        let revenue = item(RateType::PercentOfRevenue, dec!(2.5));
        assert_eq!(resolve_line_item_amount(&revenue, &ctx()), 125_000_00);

        let project = item(RateType::PercentOfProjectCosts, dec!(10));
        assert_eq!(resolve_line_item_amount(&project, &ctx()), 300_000_00);
    }

    #[test]
    fn test_per_month() {
        let i = item(RateType::PerMonth, dec!(1_500_00));
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 27_000_00);
    }

    #[test]
    fn test_zero_context_total_resolves_to_zero() {
        let empty = ResolutionContext::default();
        assert_eq!(resolve_line_item_amount(&item(RateType::PerM2, dec!(45_00)), &empty), 0);
        assert_eq!(
            resolve_line_item_amount(&item(RateType::PercentOfRevenue, dec!(3)), &empty),
            0
        );
    }

    #[test]
    fn test_inclusive_rate_is_normalised() {
        let mut i = item(RateType::FixedAmount, dec!(110_00));
        i.gst_status = GstStatus::Inclusive;
        assert_eq!(resolve_line_item_gross(&i, &ctx()), 110_00);
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 100_00);
    }

    #[test]
    fn test_inclusive_rate_scales_with_quantity() {
        let mut i = item(RateType::FixedAmount, dec!(105));
        i.gst_status = GstStatus::Inclusive;
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 95);

        i.quantity = dec!(2);
        assert_eq!(resolve_line_item_gross(&i, &ctx()), 210);
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 190);
    }

    #[test]
    fn test_cached_amount_is_ignored() {
        let mut i = item(RateType::FixedAmount, dec!(100_00));
        i.amount_ex_gst = Some(999_999_00);
        assert_eq!(resolve_line_item_amount(&i, &ctx()), 100_00);
    }

    #[test]
    fn test_build_context_dependency_order() {
        let mut snap = ScenarioSnapshot::default();
        snap.scenario.project_length_months = 12;
        snap.land_lots.push(LandLot {
            land_area_m2: dec!(800),
            purchase_price: 1_000_000_00,
            ..Default::default()
        });
        snap.sales_units.push(SalesUnit {
            sale_price: 3_300_000_00,
            gst_status: GstStatus::Inclusive,
            ..Default::default()
        });
        snap.line_items.push(LineItem {
            section: CostSection::Construction,
            rate: dec!(2_000_000_00),
            ..Default::default()
        });
        // contingency within construction does not feed its own base
        snap.line_items.push(LineItem {
            section: CostSection::Construction,
            rate_type: RateType::PercentOfConstruction,
            rate: dec!(5),
            ..Default::default()
        });
        snap.line_items.push(LineItem {
            section: CostSection::DevFees,
            rate_type: RateType::PercentOfProjectCosts,
            rate: dec!(2),
            ..Default::default()
        });

        let context = build_context(&snap);
        assert_eq!(context.grv_total, 3_000_000_00);
        assert_eq!(context.construction_total, 2_000_000_00);
        // land + construction + 5% construction contingency
        assert_eq!(context.project_costs_total, 3_100_000_00);

        let resolved = resolve_line_items(&snap, &context);
        assert_eq!(resolved[1].amount_ex_gst, 100_000_00);
        assert_eq!(resolved[2].amount_ex_gst, 62_000_00);
    }

    #[test]
    fn test_scoped_item_uses_its_lot() {
        let lot_id = Uuid::from_u128(1);
        let mut snap = ScenarioSnapshot::default();
        snap.land_lots.push(LandLot {
            id: lot_id,
            land_area_m2: dec!(500),
            ..Default::default()
        });
        snap.land_lots.push(LandLot {
            id: Uuid::from_u128(2),
            land_area_m2: dec!(1500),
            ..Default::default()
        });
        let scoped = LineItem {
            land_lot_id: Some(lot_id),
            rate_type: RateType::PerM2,
            rate: dec!(10_00),
            ..Default::default()
        };
        snap.line_items.push(scoped);

        let context = build_context(&snap);
        assert_eq!(context.total_land_size, dec!(2000));
        let resolved = resolve_line_items(&snap, &context);
        assert_eq!(resolved[0].amount_ex_gst, 5_000_00);
    }
}
