//! Pure state transitions over [`ScenarioSnapshot`].
//!
//! Each action produces a new snapshot; the input is never mutated, so a
//! sequence of actions can be replayed deterministically.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::*;
use crate::error::FeasibilityError;
use crate::FeasibilityResult;

/// One add/update/remove on a scenario or one of its child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ScenarioAction {
    UpdateScenario(Scenario),
    AddLandLot(LandLot),
    UpdateLandLot(LandLot),
    RemoveLandLot(Uuid),
    AddLineItem(LineItem),
    UpdateLineItem(LineItem),
    RemoveLineItem(Uuid),
    AddSalesUnit(SalesUnit),
    UpdateSalesUnit(SalesUnit),
    RemoveSalesUnit(Uuid),
    AddDebtFacility(DebtFacility),
    UpdateDebtFacility(DebtFacility),
    RemoveDebtFacility(Uuid),
    AddDebtLoan(DebtLoan),
    UpdateDebtLoan(DebtLoan),
    RemoveDebtLoan(Uuid),
    AddEquityPartner(EquityPartner),
    UpdateEquityPartner(EquityPartner),
    RemoveEquityPartner(Uuid),
}

/// A child record addressable by id within its collection.
trait Record {
    const COLLECTION: &'static str;
    fn id(&self) -> Uuid;
}

macro_rules! impl_record {
    ($ty:ty, $name:literal) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $name;
            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

impl_record!(LandLot, "land_lots");
impl_record!(LineItem, "line_items");
impl_record!(SalesUnit, "sales_units");
impl_record!(DebtFacility, "debt_facilities");
impl_record!(DebtLoan, "debt_loans");
impl_record!(EquityPartner, "equity_partners");

fn add<T: Record>(rows: &mut Vec<T>, row: T) -> FeasibilityResult<()> {
    if rows.iter().any(|r| r.id() == row.id()) {
        return Err(FeasibilityError::DuplicateRecord {
            collection: T::COLLECTION.into(),
            id: row.id().to_string(),
        });
    }
    rows.push(row);
    Ok(())
}

fn update<T: Record>(rows: &mut [T], row: T) -> FeasibilityResult<()> {
    let slot = rows
        .iter_mut()
        .find(|r| r.id() == row.id())
        .ok_or_else(|| not_found::<T>(row.id()))?;
    *slot = row;
    Ok(())
}

fn remove<T: Record>(rows: &mut Vec<T>, id: Uuid) -> FeasibilityResult<()> {
    let before = rows.len();
    rows.retain(|r| r.id() != id);
    if rows.len() == before {
        return Err(not_found::<T>(id));
    }
    Ok(())
}

fn not_found<T: Record>(id: Uuid) -> FeasibilityError {
    FeasibilityError::RecordNotFound {
        collection: T::COLLECTION.into(),
        id: id.to_string(),
    }
}

/// Apply one action to a snapshot, returning the next snapshot.
///
/// Removing a land lot or facility also clears line-item links to it, so no
/// snapshot ever references a missing record.
pub fn apply(state: &ScenarioSnapshot, action: ScenarioAction) -> FeasibilityResult<ScenarioSnapshot> {
    let mut next = state.clone();

    match action {
        ScenarioAction::UpdateScenario(scenario) => {
            if scenario.id != state.scenario.id {
                return Err(FeasibilityError::InvalidInput {
                    field: "scenario.id".into(),
                    reason: "Scenario id cannot change on update".into(),
                });
            }
            next.scenario = scenario;
        }
        ScenarioAction::AddLandLot(row) => add(&mut next.land_lots, row)?,
        ScenarioAction::UpdateLandLot(row) => update(&mut next.land_lots, row)?,
        ScenarioAction::RemoveLandLot(id) => {
            remove(&mut next.land_lots, id)?;
            for item in next.line_items.iter_mut() {
                if item.land_lot_id == Some(id) {
                    item.land_lot_id = None;
                }
            }
        }
        ScenarioAction::AddLineItem(row) => add(&mut next.line_items, row)?,
        ScenarioAction::UpdateLineItem(row) => update(&mut next.line_items, row)?,
        ScenarioAction::RemoveLineItem(id) => remove(&mut next.line_items, id)?,
        ScenarioAction::AddSalesUnit(row) => add(&mut next.sales_units, row)?,
        ScenarioAction::UpdateSalesUnit(row) => update(&mut next.sales_units, row)?,
        ScenarioAction::RemoveSalesUnit(id) => remove(&mut next.sales_units, id)?,
        ScenarioAction::AddDebtFacility(row) => add(&mut next.debt_facilities, row)?,
        ScenarioAction::UpdateDebtFacility(row) => update(&mut next.debt_facilities, row)?,
        ScenarioAction::RemoveDebtFacility(id) => {
            remove(&mut next.debt_facilities, id)?;
            for item in next.line_items.iter_mut() {
                if item.funding_facility_id == Some(id) {
                    item.funding_facility_id = None;
                }
            }
        }
        ScenarioAction::AddDebtLoan(row) => add(&mut next.debt_loans, row)?,
        ScenarioAction::UpdateDebtLoan(row) => update(&mut next.debt_loans, row)?,
        ScenarioAction::RemoveDebtLoan(id) => remove(&mut next.debt_loans, id)?,
        ScenarioAction::AddEquityPartner(row) => add(&mut next.equity_partners, row)?,
        ScenarioAction::UpdateEquityPartner(row) => update(&mut next.equity_partners, row)?,
        ScenarioAction::RemoveEquityPartner(id) => remove(&mut next.equity_partners, id)?,
    }

    Ok(next)
}

/// Fold a sequence of actions over a starting snapshot.
pub fn replay(
    initial: &ScenarioSnapshot,
    actions: impl IntoIterator<Item = ScenarioAction>,
) -> FeasibilityResult<ScenarioSnapshot> {
    actions
        .into_iter()
        .try_fold(initial.clone(), |state, action| apply(&state, action))
}
