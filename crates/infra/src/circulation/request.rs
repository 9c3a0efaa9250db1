use chrono::{DateTime, Utc};

use lendledger_borrowers::BorrowerId;
use lendledger_core::Patch;
use lendledger_inventory::ItemId;
use lendledger_lending::LoanState;

use super::error::CirculationError;

/// Input for a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub checkout_date: DateTime<Utc>,
    /// Overrides the policy due date when present.
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn new(borrower_id: BorrowerId, item_id: ItemId, checkout_date: DateTime<Utc>) -> Self {
        Self {
            borrower_id,
            item_id,
            checkout_date,
            due_date: None,
            notes: None,
        }
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), CirculationError> {
        if let Some(due) = self.due_date {
            if due < self.checkout_date {
                return Err(CirculationError::Validation(
                    "due date cannot precede checkout date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Partial update of a loan. Every field defaults to `Unchanged`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoanChanges {
    pub borrower_id: Patch<BorrowerId>,
    pub item_id: Patch<ItemId>,
    pub checkout_date: Patch<DateTime<Utc>>,
    pub due_date: Patch<DateTime<Utc>>,
    pub return_date: Patch<DateTime<Utc>>,
    pub state: Patch<LoanState>,
    pub notes: Patch<String>,
}

impl LoanChanges {
    pub fn is_empty(&self) -> bool {
        self.borrower_id.is_unchanged()
            && self.item_id.is_unchanged()
            && self.checkout_date.is_unchanged()
            && self.due_date.is_unchanged()
            && self.return_date.is_unchanged()
            && self.state.is_unchanged()
            && self.notes.is_unchanged()
    }

    /// Reject changesets that can never be applied, whatever the loan.
    pub(crate) fn validate(&self) -> Result<(), CirculationError> {
        if self.is_empty() {
            return Err(CirculationError::Validation("no fields to update".to_string()));
        }
        for (cleared, field) in [
            (self.borrower_id == Patch::Clear, "borrower_id"),
            (self.item_id == Patch::Clear, "item_id"),
            (self.checkout_date == Patch::Clear, "checkout_date"),
            (self.state == Patch::Clear, "state"),
        ] {
            if cleared {
                return Err(CirculationError::Validation(format!("{field} cannot be cleared")));
            }
        }
        Ok(())
    }
}
