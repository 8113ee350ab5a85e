//! Scenario input records.
//!
//! Every record deserializes leniently: absent fields fall back to the
//! documented defaults (frequency `once`, GST `exclusive`, quantity 1, ...)
//! so partially entered scenarios can still be evaluated.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gst;
use crate::types::{pct_to_fraction, round_cents, Cents, Percent};

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// Kind of development being assessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentType {
    #[default]
    Residential,
    Subdivision,
    Townhouses,
    Apartments,
    Commercial,
    Industrial,
    MixedUse,
}

/// Project-level assumptions owning every child collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub id: Uuid,
    pub name: String,
    pub development_type: DevelopmentType,
    /// Project length in months; the cashflow spans months `1..=length`.
    pub project_length_months: u32,
    /// Month 1 of the cashflow. No cashflow is produced without it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// State or jurisdiction the site sits in (e.g. "NSW").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub target_margin_pct: Percent,
    pub tax_rate_pct: Percent,
    /// Annual discount rate used for NPV.
    pub discount_rate_pct: Percent,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            development_type: DevelopmentType::default(),
            project_length_months: 12,
            start_date: None,
            state: None,
            target_margin_pct: Decimal::ZERO,
            tax_rate_pct: Decimal::ZERO,
            discount_rate_pct: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Land
// ---------------------------------------------------------------------------

/// A parcel of land acquired for the development.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandLot {
    pub id: Uuid,
    pub name: String,
    pub land_area_m2: Decimal,
    pub purchase_price: Cents,
    pub deposit_pct: Percent,
    pub deposit_amount: Cents,
    /// Month the settlement balance is paid (default month 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_month: Option<u32>,
    pub entity_gst_registered: bool,
    pub purchase_price_includes_gst: bool,
    pub margin_scheme_applied: bool,
}

impl LandLot {
    /// Deposit paid on exchange.
    ///
    /// An explicit amount wins; otherwise `deposit_pct` of the purchase price.
    pub fn deposit(&self) -> Cents {
        if self.deposit_amount != 0 || self.deposit_pct <= Decimal::ZERO {
            self.deposit_amount
        } else {
            round_cents(Decimal::from(self.purchase_price) * pct_to_fraction(self.deposit_pct))
        }
    }

    /// Purchase price less the deposit already paid.
    pub fn settlement_balance(&self) -> Cents {
        self.purchase_price - self.deposit()
    }

    /// Whether the GST embedded in the purchase price can be claimed back.
    fn gst_claimable(&self) -> bool {
        self.purchase_price_includes_gst && self.entity_gst_registered && !self.margin_scheme_applied
    }

    /// Land cost to the project, net of any claimable GST.
    pub fn cost_ex_gst(&self) -> Cents {
        if self.gst_claimable() {
            gst::normalize_to_ex_gst(self.purchase_price, gst::GstStatus::Inclusive)
        } else {
            self.purchase_price
        }
    }

    /// Input tax credit available on the purchase.
    pub fn gst_credit(&self) -> Cents {
        if self.gst_claimable() {
            self.purchase_price - self.cost_ex_gst()
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Cost line items
// ---------------------------------------------------------------------------

/// Cost section a line item is reported under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSection {
    Acquisition,
    ProfessionalFees,
    #[default]
    Construction,
    DevFees,
    LandHolding,
    Contingency,
    Marketing,
    AgentFees,
    LegalFees,
    RentalCosts,
}

impl CostSection {
    pub const ALL: [CostSection; 10] = [
        CostSection::Acquisition,
        CostSection::ProfessionalFees,
        CostSection::Construction,
        CostSection::DevFees,
        CostSection::LandHolding,
        CostSection::Contingency,
        CostSection::Marketing,
        CostSection::AgentFees,
        CostSection::LegalFees,
        CostSection::RentalCosts,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CostSection::Acquisition => "Acquisition",
            CostSection::ProfessionalFees => "Professional Fees",
            CostSection::Construction => "Construction",
            CostSection::DevFees => "Development Fees",
            CostSection::LandHolding => "Land Holding",
            CostSection::Contingency => "Contingency",
            CostSection::Marketing => "Marketing",
            CostSection::AgentFees => "Agent Fees",
            CostSection::LegalFees => "Legal Fees",
            CostSection::RentalCosts => "Rental Costs",
        }
    }
}

/// How a line item's rate turns into money.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    #[default]
    FixedAmount,
    PerM2,
    PerLot,
    PercentOfConstruction,
    PercentOfRevenue,
    PerMonth,
    PercentOfProjectCosts,
}

impl RateType {
    /// Rate types whose value depends on a cost total. These are excluded
    /// when building the cost totals themselves.
    pub fn depends_on_costs(self) -> bool {
        matches!(
            self,
            RateType::PercentOfConstruction | RateType::PercentOfProjectCosts
        )
    }
}

/// How often a line item is paid across the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Once,
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

impl Frequency {
    /// Months between payments; `None` for a one-off.
    pub fn cadence_months(self) -> Option<u32> {
        match self {
            Frequency::Once => None,
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::SemiAnnually => Some(6),
            Frequency::Annually => Some(12),
        }
    }
}

/// A single cost line within a section and tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub id: Uuid,
    pub section: CostSection,
    /// Free-text grouping within the section.
    pub tab: String,
    pub description: String,
    /// Restricts per-area and per-lot rates to a single land lot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub rate_type: RateType,
    /// Cents for money rate types, a plain percentage for percent types.
    pub rate: Decimal,
    pub gst_status: gst::GstStatus,
    pub frequency: Frequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashflow_start_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashflow_span_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_facility_id: Option<Uuid>,
    /// Advisory cache of the last resolved amount. Never read by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_ex_gst: Option<Cents>,
    pub sort_order: i32,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            section: CostSection::default(),
            tab: String::new(),
            description: String::new(),
            land_lot_id: None,
            quantity: Decimal::ONE,
            rate_type: RateType::default(),
            rate: Decimal::ZERO,
            gst_status: gst::GstStatus::default(),
            frequency: Frequency::default(),
            cashflow_start_month: None,
            cashflow_span_months: None,
            funding_facility_id: None,
            amount_ex_gst: None,
            sort_order: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Sales
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Unsold,
    Exchanged,
    Settled,
    Withdrawn,
}

/// A saleable product (lot, townhouse, apartment).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesUnit {
    pub id: Uuid,
    pub product_tab: String,
    pub name: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub car_spaces: u32,
    pub area_m2: Decimal,
    pub status: SaleStatus,
    pub sale_price: Cents,
    pub gst_status: gst::GstStatus,
    /// Month the sale settles (default: the final month).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_month: Option<u32>,
}

impl SalesUnit {
    /// Withdrawn units are off the market and carry no revenue.
    pub fn is_active(&self) -> bool {
        self.status != SaleStatus::Withdrawn
    }

    pub fn price_ex_gst(&self) -> Cents {
        gst::normalize_to_ex_gst(self.sale_price, self.gst_status)
    }

    /// Revenue this unit contributes (zero when withdrawn).
    pub fn revenue_ex_gst(&self) -> Cents {
        if self.is_active() {
            self.price_ex_gst()
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Debt
// ---------------------------------------------------------------------------

/// Ranking of a facility in the drawdown waterfall. Senior draws first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityPriority {
    #[default]
    Senior,
    Mezzanine,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    #[default]
    Manual,
    Auto,
}

/// Basis an auto-sized facility's LVR is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LvrBasis {
    /// Total development cost
    #[default]
    Tdc,
    /// Gross realisation value
    Grv,
}

/// How interest on a facility is met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandLoanType {
    /// Capitalised into the drawn balance
    #[default]
    Provisioned,
    /// Paid from funds outside the facility
    Serviced,
}

/// A drawn credit facility taking part in the funding waterfall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebtFacility {
    pub id: Uuid,
    pub name: String,
    pub priority: FacilityPriority,
    /// Tie-break within a priority, ascending.
    pub sort_order: i32,
    pub calculation_type: SizingMode,
    pub lvr_method: LvrBasis,
    pub lvr_pct: Percent,
    pub term_months: u32,
    /// Annual interest rate.
    pub interest_rate_pct: Percent,
    /// Facility limit when sized manually.
    pub total_facility: Cents,
    /// Amount set aside for capitalised interest.
    pub interest_provision: Cents,
    pub land_loan_type: LandLoanType,
    /// One-off fee on the facility limit.
    pub establishment_fee_pct: Percent,
    /// Annual fee on the facility limit.
    pub line_fee_pct: Percent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPeriod {
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl PaymentPeriod {
    pub fn months(self) -> u32 {
        match self {
            PaymentPeriod::Monthly => 1,
            PaymentPeriod::Quarterly => 3,
            PaymentPeriod::Annually => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentType {
    #[default]
    InterestOnly,
    PrincipalAndInterest,
}

/// A fixed-principal loan costed as a flat funding line, outside the
/// drawdown waterfall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebtLoan {
    pub id: Uuid,
    pub name: String,
    pub principal: Cents,
    pub interest_rate_pct: Percent,
    pub payment_period: PaymentPeriod,
    pub term_months: u32,
    pub repayment_type: RepaymentType,
    pub establishment_fee: Cents,
}

// ---------------------------------------------------------------------------
// Equity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionPolicy {
    #[default]
    Proportional,
    Preferred,
    Fixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquityPartner {
    pub id: Uuid,
    pub name: String,
    pub equity_amount: Cents,
    pub return_percentage: Percent,
    pub distribution_policy: DistributionPolicy,
    pub is_developer_equity: bool,
    /// Fee charged on the equity contribution, as a funding cost.
    pub fee_pct: Percent,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable view of a scenario and all of its children. Every engine
/// computation reads one of these; absent collections are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSnapshot {
    pub scenario: Scenario,
    pub land_lots: Vec<LandLot>,
    pub line_items: Vec<LineItem>,
    pub sales_units: Vec<SalesUnit>,
    pub debt_facilities: Vec<DebtFacility>,
    pub debt_loans: Vec<DebtLoan>,
    pub equity_partners: Vec<EquityPartner>,
}

impl ScenarioSnapshot {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            ..Default::default()
        }
    }

    pub fn total_equity(&self) -> Cents {
        self.equity_partners.iter().map(|p| p.equity_amount).sum()
    }

    pub fn land_cost_ex_gst(&self) -> Cents {
        self.land_lots.iter().map(LandLot::cost_ex_gst).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_item_defaults_from_empty_row() {
        let item: LineItem = serde_json::from_str("{}").unwrap();
        assert_eq!(item.frequency, Frequency::Once);
        assert_eq!(item.gst_status, gst::GstStatus::Exclusive);
        assert_eq!(item.rate_type, RateType::FixedAmount);
        assert_eq!(item.quantity, Decimal::ONE);
    }

    #[test]
    fn test_snapshot_missing_collections_are_empty() {
        let snap: ScenarioSnapshot =
            serde_json::from_str(r#"{"scenario": {"name": "Lot 7"}}"#).unwrap();
        assert_eq!(snap.scenario.name, "Lot 7");
        assert_eq!(snap.scenario.project_length_months, 12);
        assert!(snap.line_items.is_empty());
        assert!(snap.debt_facilities.is_empty());
    }

    #[test]
    fn test_enum_wire_names() {
        let rt: RateType = serde_json::from_str("\"percent_of_construction\"").unwrap();
        assert_eq!(rt, RateType::PercentOfConstruction);
        let f: Frequency = serde_json::from_str("\"semi_annually\"").unwrap();
        assert_eq!(f, Frequency::SemiAnnually);
        let p: FacilityPriority = serde_json::from_str("\"mezzanine\"").unwrap();
        assert_eq!(p, FacilityPriority::Mezzanine);
    }

    #[test]
    fn test_priority_orders_senior_first() {
        assert!(FacilityPriority::Senior < FacilityPriority::Mezzanine);
    }

    #[test]
    fn test_settlement_balance() {
        let lot = LandLot {
            purchase_price: 1_000_000_00,
            deposit_amount: 100_000_00,
            ..Default::default()
        };
        assert_eq!(lot.settlement_balance(), 900_000_00);
    }

    #[test]
    fn test_deposit_from_percentage() {
        let mut lot = LandLot {
            purchase_price: 1_000_000_00,
            deposit_pct: dec!(10),
            ..Default::default()
        };
        assert_eq!(lot.deposit(), 100_000_00);
        assert_eq!(lot.settlement_balance(), 900_000_00);

        // an explicit amount takes precedence
        lot.deposit_amount = 50_000_00;
        assert_eq!(lot.deposit(), 50_000_00);
    }

    #[test]
    fn test_land_gst_claimable_only_when_registered_without_margin_scheme() {
        let mut lot = LandLot {
            purchase_price: 1_100_000_00,
            purchase_price_includes_gst: true,
            entity_gst_registered: true,
            ..Default::default()
        };
        assert_eq!(lot.cost_ex_gst(), 1_000_000_00);
        assert_eq!(lot.gst_credit(), 100_000_00);

        lot.margin_scheme_applied = true;
        assert_eq!(lot.cost_ex_gst(), 1_100_000_00);
        assert_eq!(lot.gst_credit(), 0);

        lot.margin_scheme_applied = false;
        lot.entity_gst_registered = false;
        assert_eq!(lot.cost_ex_gst(), 1_100_000_00);
    }

    #[test]
    fn test_withdrawn_unit_has_no_revenue() {
        let unit = SalesUnit {
            sale_price: 500_000_00,
            status: SaleStatus::Withdrawn,
            ..Default::default()
        };
        assert_eq!(unit.revenue_ex_gst(), 0);
        assert_eq!(unit.price_ex_gst(), 500_000_00);
    }
}
