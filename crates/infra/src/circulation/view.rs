//! Read-side shapes: loan filters, joined views and the consistency audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lendledger_borrowers::{Borrower, BorrowerClass, BorrowerId, BorrowerStatus};
use lendledger_core::AggregateRoot;
use lendledger_inventory::{Item, ItemId};
use lendledger_lending::{Loan, LoanState};

/// Filter criteria for loan listings. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanFilter {
    pub borrower_id: Option<BorrowerId>,
    pub item_id: Option<ItemId>,
    pub state: Option<LoanState>,
    pub checkout_from: Option<DateTime<Utc>>,
    pub checkout_to: Option<DateTime<Utc>>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

impl LoanFilter {
    pub fn for_borrower(borrower_id: BorrowerId) -> Self {
        Self {
            borrower_id: Some(borrower_id),
            ..Self::default()
        }
    }

    pub fn for_item(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: LoanState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn matches(&self, loan: &Loan) -> bool {
        if self.borrower_id.is_some_and(|b| b != loan.borrower_id()) {
            return false;
        }
        if self.item_id.is_some_and(|i| i != loan.item_id()) {
            return false;
        }
        if self.state.is_some_and(|s| s != loan.state()) {
            return false;
        }
        if !in_range(Some(loan.checkout_date()), self.checkout_from, self.checkout_to) {
            return false;
        }
        // A due-date bound excludes closed loans, which have no due date.
        if (self.due_from.is_some() || self.due_to.is_some())
            && !in_range(loan.due_date(), self.due_from, self.due_to)
        {
            return false;
        }
        true
    }
}

fn in_range(
    value: Option<DateTime<Utc>>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    match value {
        Some(v) => from.is_none_or(|f| v >= f) && to.is_none_or(|t| v <= t),
        None => from.is_none() && to.is_none(),
    }
}

/// Newest-created first; ties broken by id, newest first.
pub(crate) fn sort_newest_first(loans: &mut [Loan]) {
    loans.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(a.id()))
    });
}

/// Borrower fields shown next to a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerSummary {
    pub id: BorrowerId,
    pub member_code: String,
    pub full_name: String,
    pub class: BorrowerClass,
    pub status: BorrowerStatus,
}

impl From<&Borrower> for BorrowerSummary {
    fn from(b: &Borrower) -> Self {
        Self {
            id: b.id_typed(),
            member_code: b.profile().member_code.clone(),
            full_name: b.profile().full_name.clone(),
            class: b.class(),
            status: b.status(),
        }
    }
}

/// Item fields shown next to a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub available_units: u32,
    pub total_units: u32,
}

impl From<&Item> for ItemSummary {
    fn from(i: &Item) -> Self {
        Self {
            id: i.id_typed(),
            title: i.catalog().title.clone(),
            author: i.catalog().author.clone(),
            isbn: i.catalog().isbn.clone(),
            available_units: i.available_units(),
            total_units: i.total_units(),
        }
    }
}

/// A loan joined with its borrower and item. Summaries are `None` when the
/// referenced record no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanView {
    pub loan: Loan,
    pub borrower: Option<BorrowerSummary>,
    pub item: Option<ItemSummary>,
}

/// Stored counts of one item next to the loans that hold its units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAudit {
    pub item_id: ItemId,
    pub total_units: u32,
    pub available_units: u32,
    /// Loans referencing the item in a state that holds a unit.
    pub holding_loans: u32,
}

impl InventoryAudit {
    pub fn is_consistent(&self) -> bool {
        self.available_units <= self.total_units
            && self.total_units - self.available_units == self.holding_loans
    }
}
