//! After-tax profit distribution across equity partners.
//!
//! Fixed and preferred partners form a priority tier paid their return
//! (`equity × return%`) first, scaled down pro-rata when positive profit
//! cannot cover the whole tier. The residual (which may be a loss) is then
//! split among the proportional and preferred partners by their equity.
//! Fixed partners receive their fixed allocation only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scenario::{DistributionPolicy, EquityPartner};
use crate::types::{pct_to_fraction, percent_of, round_cents, Cents, Ratio};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerDistribution {
    pub partner_id: Uuid,
    pub name: String,
    pub policy: DistributionPolicy,
    pub is_developer_equity: bool,
    pub equity_amount: Cents,
    /// Share of total equity, as a percentage
    pub equity_share: Ratio,
    /// Priority return the policy entitles the partner to
    pub preferred_entitlement: Cents,
    /// Priority return actually paid
    pub preferred_return: Cents,
    pub profit_share: Cents,
    pub total_return: Cents,
    /// `(total_return - equity) / equity`, as a percentage
    pub roi: Ratio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityDistribution {
    pub partners: Vec<PartnerDistribution>,
    pub total_equity: Cents,
    pub profit_after_tax: Cents,
    pub priority_paid: Cents,
    pub residual: Cents,
    /// Profit not allocated to anyone (rounding, or no partner eligible for
    /// the residual)
    pub unallocated: Cents,
}

fn entitlement(partner: &EquityPartner) -> Cents {
    match partner.distribution_policy {
        DistributionPolicy::Proportional => 0,
        DistributionPolicy::Preferred | DistributionPolicy::Fixed => round_cents(
            Decimal::from(partner.equity_amount) * pct_to_fraction(partner.return_percentage),
        ),
    }
}

fn shares_residual(partner: &EquityPartner) -> bool {
    partner.distribution_policy != DistributionPolicy::Fixed
}

/// Allocate after-tax profit across partners.
pub fn distribute_equity(partners: &[EquityPartner], profit_after_tax: Cents) -> EquityDistribution {
    let total_equity: Cents = partners.iter().map(|p| p.equity_amount).sum();

    let entitlements: Vec<Cents> = partners.iter().map(entitlement).collect();
    let tier_total: Cents = entitlements.iter().sum();
    let available = profit_after_tax.max(0);

    let paid: Vec<Cents> = if tier_total <= available {
        entitlements.clone()
    } else {
        entitlements
            .iter()
            .map(|e| round_cents(Decimal::from(*e) * Decimal::from(available) / Decimal::from(tier_total)))
            .collect()
    };
    let priority_paid: Cents = paid.iter().sum();
    let residual = profit_after_tax - priority_paid;

    let eligible_equity: Cents = partners
        .iter()
        .filter(|p| shares_residual(p))
        .map(|p| p.equity_amount)
        .sum();

    let mut distributed = priority_paid;
    let results: Vec<PartnerDistribution> = partners
        .iter()
        .zip(entitlements.iter().zip(paid.iter()))
        .map(|(p, (entitled, preferred))| {
            let profit_share = if shares_residual(p) && eligible_equity != 0 {
                round_cents(
                    Decimal::from(residual) * Decimal::from(p.equity_amount) / Decimal::from(eligible_equity),
                )
            } else {
                0
            };
            distributed += profit_share;
            let total_return = p.equity_amount + preferred + profit_share;

            PartnerDistribution {
                partner_id: p.id,
                name: p.name.clone(),
                policy: p.distribution_policy,
                is_developer_equity: p.is_developer_equity,
                equity_amount: p.equity_amount,
                equity_share: percent_of(p.equity_amount, total_equity),
                preferred_entitlement: *entitled,
                preferred_return: *preferred,
                profit_share,
                total_return,
                roi: percent_of(total_return - p.equity_amount, p.equity_amount),
            }
        })
        .collect();

    EquityDistribution {
        partners: results,
        total_equity,
        profit_after_tax,
        priority_paid,
        residual,
        unallocated: profit_after_tax - distributed,
    }
}

/// Fees charged on equity contributions.
pub fn equity_fees(partners: &[EquityPartner]) -> Cents {
    partners
        .iter()
        .map(|p| round_cents(Decimal::from(p.equity_amount) * pct_to_fraction(p.fee_pct)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn partner(name: &str, equity: Cents, policy: DistributionPolicy, ret: Decimal) -> EquityPartner {
        EquityPartner {
            name: name.into(),
            equity_amount: equity,
            distribution_policy: policy,
            return_percentage: ret,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_proportional_partner_roi() {
        let partners = vec![partner("Dev", 1_000_000_00, DistributionPolicy::Proportional, dec!(8))];
        let dist = distribute_equity(&partners, 250_000_00);
        let p = &dist.partners[0];
        // a proportional partner has no priority return
        assert_eq!(p.preferred_return, 0);
        assert_eq!(p.profit_share, 250_000_00);
        assert_eq!(p.total_return, 1_250_000_00);
        assert_eq!(p.roi, Some(dec!(25)));
        assert_eq!(dist.unallocated, 0);
    }

    #[test]
    fn test_proportional_split() {
        let partners = vec![
            partner("A", 750_00, DistributionPolicy::Proportional, dec!(0)),
            partner("B", 250_00, DistributionPolicy::Proportional, dec!(0)),
        ];
        let dist = distribute_equity(&partners, 1_000_00);
        assert_eq!(dist.partners[0].profit_share, 750_00);
        assert_eq!(dist.partners[1].profit_share, 250_00);
        assert_eq!(dist.partners[0].equity_share, Some(dec!(75)));
    }

    #[test]
    fn test_preferred_paid_before_residual() {
        let partners = vec![
            partner("Investor", 1_000_00, DistributionPolicy::Preferred, dec!(10)),
            partner("Developer", 1_000_00, DistributionPolicy::Proportional, dec!(0)),
        ];
        let dist = distribute_equity(&partners, 500_00);
        assert_eq!(dist.priority_paid, 100_00);
        assert_eq!(dist.residual, 400_00);
        assert_eq!(dist.partners[0].preferred_return, 100_00);
        assert_eq!(dist.partners[0].profit_share, 200_00);
        assert_eq!(dist.partners[1].profit_share, 200_00);
        assert_eq!(dist.unallocated, 0);
    }

    #[test]
    fn test_priority_tier_scaled_when_profit_short() {
        let partners = vec![
            partner("P1", 1_000_00, DistributionPolicy::Preferred, dec!(10)),
            partner("F1", 3_000_00, DistributionPolicy::Fixed, dec!(10)),
        ];
        let dist = distribute_equity(&partners, 200_00);
        // entitlements 100 + 300, only 200 available
        assert_eq!(dist.partners[0].preferred_return, 50_00);
        assert_eq!(dist.partners[1].preferred_return, 150_00);
        assert_eq!(dist.residual, 0);
    }

    #[test]
    fn test_fixed_partner_excluded_from_residual() {
        let partners = vec![
            partner("Fixed", 1_000_00, DistributionPolicy::Fixed, dec!(5)),
            partner("Dev", 1_000_00, DistributionPolicy::Proportional, dec!(0)),
        ];
        let dist = distribute_equity(&partners, 1_050_00);
        assert_eq!(dist.partners[0].total_return, 1_050_00);
        assert_eq!(dist.partners[0].profit_share, 0);
        assert_eq!(dist.partners[1].profit_share, 1_000_00);
    }

    #[test]
    fn test_loss_shared_proportionally() {
        let partners = vec![
            partner("A", 500_00, DistributionPolicy::Proportional, dec!(0)),
            partner("B", 500_00, DistributionPolicy::Preferred, dec!(10)),
        ];
        let dist = distribute_equity(&partners, -200_00);
        assert_eq!(dist.priority_paid, 0);
        assert_eq!(dist.partners[0].profit_share, -100_00);
        assert_eq!(dist.partners[1].roi, Some(dec!(-20)));
    }

    #[test]
    fn test_zero_equity() {
        let partners = vec![partner("Empty", 0, DistributionPolicy::Proportional, dec!(0))];
        let dist = distribute_equity(&partners, 1_000_00);
        assert_eq!(dist.partners[0].equity_share, None);
        assert_eq!(dist.partners[0].roi, None);
        assert_eq!(dist.unallocated, 1_000_00);
    }

    #[test]
    fn test_equity_fees() {
        let mut p = partner("A", 1_000_000_00, DistributionPolicy::Proportional, dec!(0));
        p.fee_pct = dec!(1.5);
        assert_eq!(equity_fees(&[p]), 15_000_00);
    }
}
