use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lendledger_borrowers::BorrowerId;
use lendledger_core::{Aggregate, AggregateRoot, DomainError, Patch};
use lendledger_events::Event;
use lendledger_inventory::ItemId;

lendledger_core::typed_id!(
    /// Loan identifier.
    LoanId
);

/// Loan lifecycle.
///
/// `Active` → `Overdue` → `Closed`, or `Active` → `Closed` directly. A closed
/// loan can be reopened to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanState {
    Active,
    Closed,
    Overdue,
}

impl LoanState {
    /// Whether a loan in this state keeps a unit of its item off the shelf.
    pub fn holds_unit(self) -> bool {
        !matches!(self, LoanState::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanState::Active => "Active",
            LoanState::Closed => "Closed",
            LoanState::Overdue => "Overdue",
        }
    }
}

impl core::fmt::Display for LoanState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loan of one unit of one item to one borrower.
///
/// Invariant: `due_date` is set iff the state holds a unit; `return_date` is
/// set iff the state is `Closed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    borrower_id: BorrowerId,
    item_id: ItemId,
    checkout_date: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    return_date: Option<DateTime<Utc>>,
    state: LoanState,
    notes: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    opened: bool,
}

impl Loan {
    /// Create an empty, not-yet-opened instance; `OpenLoan` fills it in.
    pub fn empty(id: LoanId) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id,
            borrower_id: BorrowerId::new(lendledger_core::AggregateId::from_uuid(
                Default::default(),
            )),
            item_id: ItemId::new(lendledger_core::AggregateId::from_uuid(Default::default())),
            checkout_date: epoch,
            due_date: None,
            return_date: None,
            state: LoanState::Active,
            notes: None,
            version: 0,
            created_at: epoch,
            updated_at: epoch,
            opened: false,
        }
    }

    pub fn id_typed(&self) -> LoanId {
        self.id
    }

    pub fn borrower_id(&self) -> BorrowerId {
        self.borrower_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn checkout_date(&self) -> DateTime<Utc> {
        self.checkout_date
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn return_date(&self) -> Option<DateTime<Utc>> {
        self.return_date
    }

    pub fn state(&self) -> LoanState {
        self.state
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records loaded from a store were opened when they were first written.
    pub fn is_opened(&self) -> bool {
        self.opened || self.version > 0
    }

    pub fn holds_unit(&self) -> bool {
        self.state.holds_unit()
    }

    /// Store-owned revision stamp.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Check the date invariants tied to the state.
    pub fn check_dates(&self) -> Result<(), DomainError> {
        match (self.state.holds_unit(), self.due_date, self.return_date) {
            (true, Some(_), None) | (false, None, Some(_)) => Ok(()),
            _ => Err(DomainError::invariant(format!(
                "loan {} in state {} has due_date={:?}, return_date={:?}",
                self.id, self.state, self.due_date, self.return_date
            ))),
        }
    }
}

impl AggregateRoot for Loan {
    type Id = LoanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenLoan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenLoan {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub checkout_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseLoan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseLoan {
    pub loan_id: LoanId,
    pub return_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReopenLoan. The caller supplies the new due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReopenLoan {
    pub loan_id: LoanId,
    pub due_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkOverdue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkOverdue {
    pub loan_id: LoanId,
    pub as_of: DateTime<Utc>,
}

/// Command: AmendDetails. Non-lifecycle fields; `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendDetails {
    pub loan_id: LoanId,
    pub borrower_id: Option<BorrowerId>,
    pub item_id: Option<ItemId>,
    pub checkout_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub notes: Patch<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteLoan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteLoan {
    pub loan_id: LoanId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanCommand {
    OpenLoan(OpenLoan),
    CloseLoan(CloseLoan),
    ReopenLoan(ReopenLoan),
    MarkOverdue(MarkOverdue),
    AmendDetails(AmendDetails),
    DeleteLoan(DeleteLoan),
}

/// Event: LoanOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOpened {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub checkout_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanClosed {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    pub return_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanReopened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReopened {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    pub due_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanMarkedOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanMarkedOverdue {
    pub loan_id: LoanId,
    pub due_date: DateTime<Utc>,
    pub as_of: DateTime<Utc>,
}

/// Event: LoanAmended. Carries the resulting values, not the deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanAmended {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub checkout_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDeleted {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    /// Whether deleting gave a unit back to the shelf.
    pub released_unit: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanOpened(LoanOpened),
    LoanClosed(LoanClosed),
    LoanReopened(LoanReopened),
    LoanMarkedOverdue(LoanMarkedOverdue),
    LoanAmended(LoanAmended),
    LoanDeleted(LoanDeleted),
}

impl Event for LoanEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoanEvent::LoanOpened(_) => "lending.loan.opened",
            LoanEvent::LoanClosed(_) => "lending.loan.closed",
            LoanEvent::LoanReopened(_) => "lending.loan.reopened",
            LoanEvent::LoanMarkedOverdue(_) => "lending.loan.marked_overdue",
            LoanEvent::LoanAmended(_) => "lending.loan.amended",
            LoanEvent::LoanDeleted(_) => "lending.loan.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LoanEvent::LoanOpened(e) => e.occurred_at,
            LoanEvent::LoanClosed(e) => e.occurred_at,
            LoanEvent::LoanReopened(e) => e.occurred_at,
            LoanEvent::LoanMarkedOverdue(e) => e.as_of,
            LoanEvent::LoanAmended(e) => e.occurred_at,
            LoanEvent::LoanDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Loan {
    type Command = LoanCommand;
    type Event = LoanEvent;
    type Error = DomainError;

    /// The record version is stamped by the store, so `apply` leaves it alone.
    fn apply(&mut self, event: &Self::Event) {
        match event {
            LoanEvent::LoanOpened(e) => {
                self.id = e.loan_id;
                self.borrower_id = e.borrower_id;
                self.item_id = e.item_id;
                self.checkout_date = e.checkout_date;
                self.due_date = Some(e.due_date);
                self.return_date = None;
                self.state = LoanState::Active;
                self.notes = e.notes.clone();
                self.created_at = e.occurred_at;
                self.updated_at = e.occurred_at;
                self.opened = true;
            }
            LoanEvent::LoanClosed(e) => {
                self.state = LoanState::Closed;
                self.return_date = Some(e.return_date);
                self.due_date = None;
                self.updated_at = e.occurred_at;
            }
            LoanEvent::LoanReopened(e) => {
                self.state = LoanState::Active;
                self.return_date = None;
                self.due_date = Some(e.due_date);
                self.updated_at = e.occurred_at;
            }
            LoanEvent::LoanMarkedOverdue(e) => {
                self.state = LoanState::Overdue;
                self.updated_at = e.as_of;
            }
            LoanEvent::LoanAmended(e) => {
                self.borrower_id = e.borrower_id;
                self.item_id = e.item_id;
                self.checkout_date = e.checkout_date;
                self.due_date = e.due_date;
                self.return_date = e.return_date;
                self.notes = e.notes.clone();
                self.updated_at = e.occurred_at;
            }
            LoanEvent::LoanDeleted(e) => {
                self.updated_at = e.occurred_at;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LoanCommand::OpenLoan(cmd) => self.handle_open(cmd),
            LoanCommand::CloseLoan(cmd) => self.handle_close(cmd),
            LoanCommand::ReopenLoan(cmd) => self.handle_reopen(cmd),
            LoanCommand::MarkOverdue(cmd) => self.handle_mark_overdue(cmd),
            LoanCommand::AmendDetails(cmd) => self.handle_amend(cmd),
            LoanCommand::DeleteLoan(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Loan {
    fn ensure_loan_id(&self, loan_id: LoanId) -> Result<(), DomainError> {
        if self.id != loan_id {
            return Err(DomainError::invariant("loan_id mismatch"));
        }
        Ok(())
    }

    fn ensure_opened(&self, loan_id: LoanId) -> Result<(), DomainError> {
        if !self.is_opened() {
            return Err(DomainError::not_found());
        }
        self.ensure_loan_id(loan_id)
    }

    fn transition_error(&self, to: LoanState) -> DomainError {
        DomainError::invalid_transition(format!("{} -> {}", self.state, to))
    }

    fn handle_open(&self, cmd: &OpenLoan) -> Result<Vec<LoanEvent>, DomainError> {
        if self.is_opened() {
            return Err(DomainError::conflict("loan already exists"));
        }
        self.ensure_loan_id(cmd.loan_id)?;
        if cmd.due_date < cmd.checkout_date {
            return Err(DomainError::validation("due date cannot precede checkout date"));
        }

        Ok(vec![LoanEvent::LoanOpened(LoanOpened {
            loan_id: cmd.loan_id,
            borrower_id: cmd.borrower_id,
            item_id: cmd.item_id,
            checkout_date: cmd.checkout_date,
            due_date: cmd.due_date,
            notes: normalize_notes(cmd.notes.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseLoan) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(cmd.loan_id)?;
        if !self.state.holds_unit() {
            return Err(self.transition_error(LoanState::Closed));
        }
        if cmd.return_date < self.checkout_date {
            return Err(DomainError::validation("return date cannot precede checkout date"));
        }

        Ok(vec![LoanEvent::LoanClosed(LoanClosed {
            loan_id: cmd.loan_id,
            item_id: self.item_id,
            return_date: cmd.return_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reopen(&self, cmd: &ReopenLoan) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(cmd.loan_id)?;
        if self.state != LoanState::Closed {
            return Err(self.transition_error(LoanState::Active));
        }
        if cmd.due_date < self.checkout_date {
            return Err(DomainError::validation("due date cannot precede checkout date"));
        }

        Ok(vec![LoanEvent::LoanReopened(LoanReopened {
            loan_id: cmd.loan_id,
            item_id: self.item_id,
            due_date: cmd.due_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_overdue(&self, cmd: &MarkOverdue) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(cmd.loan_id)?;
        if self.state != LoanState::Active {
            return Err(self.transition_error(LoanState::Overdue));
        }
        let due_date = self
            .due_date
            .ok_or_else(|| DomainError::invariant("active loan without a due date"))?;
        if due_date >= cmd.as_of {
            return Err(DomainError::invalid_transition(format!(
                "loan is not past due (due {due_date}, as of {})",
                cmd.as_of
            )));
        }

        Ok(vec![LoanEvent::LoanMarkedOverdue(LoanMarkedOverdue {
            loan_id: cmd.loan_id,
            due_date,
            as_of: cmd.as_of,
        })])
    }

    fn handle_amend(&self, cmd: &AmendDetails) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(cmd.loan_id)?;

        let checkout_date = cmd.checkout_date.unwrap_or(self.checkout_date);
        let due_date = match (self.state.holds_unit(), cmd.due_date) {
            (true, Some(d)) => Some(d),
            (true, None) => self.due_date,
            (false, Some(_)) => {
                return Err(DomainError::validation("a closed loan has no due date"));
            }
            (false, None) => None,
        };
        let return_date = match (self.state.holds_unit(), cmd.return_date) {
            (false, Some(d)) => Some(d),
            (false, None) => self.return_date,
            (true, Some(_)) => {
                return Err(DomainError::validation("an open loan has no return date"));
            }
            (true, None) => None,
        };

        if due_date.is_some_and(|d| d < checkout_date) {
            return Err(DomainError::validation("due date cannot precede checkout date"));
        }
        if return_date.is_some_and(|d| d < checkout_date) {
            return Err(DomainError::validation("return date cannot precede checkout date"));
        }

        let notes = normalize_notes(cmd.notes.clone().apply_to(self.notes.clone()));

        Ok(vec![LoanEvent::LoanAmended(LoanAmended {
            loan_id: cmd.loan_id,
            borrower_id: cmd.borrower_id.unwrap_or(self.borrower_id),
            item_id: cmd.item_id.unwrap_or(self.item_id),
            checkout_date,
            due_date,
            return_date,
            notes,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteLoan) -> Result<Vec<LoanEvent>, DomainError> {
        self.ensure_opened(cmd.loan_id)?;

        Ok(vec![LoanEvent::LoanDeleted(LoanDeleted {
            loan_id: cmd.loan_id,
            item_id: self.item_id,
            released_unit: self.state.holds_unit(),
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Decide and apply in one step, returning the produced events.
    pub fn execute(&mut self, command: &LoanCommand) -> Result<Vec<LoanEvent>, DomainError> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}

/// Trim notes; blank notes are stored as absent.
fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 9, 0, 0).unwrap()
    }

    fn opened_loan() -> Loan {
        let loan_id = LoanId::generate();
        let mut loan = Loan::empty(loan_id);
        loan.execute(&LoanCommand::OpenLoan(OpenLoan {
            loan_id,
            borrower_id: BorrowerId::generate(),
            item_id: ItemId::generate(),
            checkout_date: day(1),
            due_date: day(15),
            notes: Some("  first copy  ".to_string()),
            occurred_at: day(1),
        }))
        .unwrap();
        loan
    }

    fn close(loan: &mut Loan, at: DateTime<Utc>) -> Result<Vec<LoanEvent>, DomainError> {
        let loan_id = loan.id_typed();
        loan.execute(&LoanCommand::CloseLoan(CloseLoan {
            loan_id,
            return_date: at,
            occurred_at: at,
        }))
    }

    #[test]
    fn open_emits_loan_opened_and_starts_active() {
        let loan = opened_loan();
        assert_eq!(loan.state(), LoanState::Active);
        assert_eq!(loan.due_date(), Some(day(15)));
        assert_eq!(loan.return_date(), None);
        assert_eq!(loan.notes(), Some("first copy"));
        loan.check_dates().unwrap();
    }

    #[test]
    fn open_rejects_due_date_before_checkout() {
        let loan_id = LoanId::generate();
        let loan = Loan::empty(loan_id);
        let err = loan
            .handle(&LoanCommand::OpenLoan(OpenLoan {
                loan_id,
                borrower_id: BorrowerId::generate(),
                item_id: ItemId::generate(),
                checkout_date: day(10),
                due_date: day(9),
                notes: None,
                occurred_at: day(10),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn close_sets_return_date_and_clears_due_date() {
        let mut loan = opened_loan();
        let events = close(&mut loan, day(5)).unwrap();

        match &events[0] {
            LoanEvent::LoanClosed(e) => assert_eq!(e.return_date, day(5)),
            other => panic!("Expected LoanClosed event, got {other:?}"),
        }
        assert_eq!(loan.state(), LoanState::Closed);
        assert_eq!(loan.return_date(), Some(day(5)));
        assert_eq!(loan.due_date(), None);
        loan.check_dates().unwrap();
    }

    #[test]
    fn closing_twice_is_an_invalid_transition() {
        let mut loan = opened_loan();
        close(&mut loan, day(5)).unwrap();
        let before = loan.clone();

        let err = close(&mut loan, day(6)).unwrap_err();
        match err {
            DomainError::InvalidTransition(msg) if msg == "Closed -> Closed" => {}
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(loan, before);
    }

    #[test]
    fn reopen_requires_closed_and_restores_due_date() {
        let mut loan = opened_loan();
        let loan_id = loan.id_typed();

        let err = loan
            .handle(&LoanCommand::ReopenLoan(ReopenLoan {
                loan_id,
                due_date: day(20),
                occurred_at: day(2),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));

        close(&mut loan, day(5)).unwrap();
        loan.execute(&LoanCommand::ReopenLoan(ReopenLoan {
            loan_id,
            due_date: day(20),
            occurred_at: day(6),
        }))
        .unwrap();

        assert_eq!(loan.state(), LoanState::Active);
        assert_eq!(loan.due_date(), Some(day(20)));
        assert_eq!(loan.return_date(), None);
        loan.check_dates().unwrap();
    }

    #[test]
    fn mark_overdue_only_after_due_date() {
        let mut loan = opened_loan();
        let loan_id = loan.id_typed();

        let not_yet = loan.handle(&LoanCommand::MarkOverdue(MarkOverdue {
            loan_id,
            as_of: day(15),
        }));
        assert!(matches!(not_yet, Err(DomainError::InvalidTransition(_))));

        loan.execute(&LoanCommand::MarkOverdue(MarkOverdue {
            loan_id,
            as_of: day(15) + Duration::seconds(1),
        }))
        .unwrap();
        assert_eq!(loan.state(), LoanState::Overdue);
        assert!(loan.holds_unit());

        // Overdue is not re-entered, and overdue loans can still be closed.
        let again = loan.handle(&LoanCommand::MarkOverdue(MarkOverdue {
            loan_id,
            as_of: day(20),
        }));
        assert!(matches!(again, Err(DomainError::InvalidTransition(_))));
        close(&mut loan, day(21)).unwrap();
        assert_eq!(loan.state(), LoanState::Closed);
    }

    #[test]
    fn amend_rejects_due_date_on_closed_loan() {
        let mut loan = opened_loan();
        close(&mut loan, day(5)).unwrap();
        let loan_id = loan.id_typed();

        let err = loan
            .handle(&LoanCommand::AmendDetails(AmendDetails {
                loan_id,
                borrower_id: None,
                item_id: None,
                checkout_date: None,
                due_date: Some(day(30)),
                return_date: None,
                notes: Patch::Unchanged,
                occurred_at: day(6),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn amend_updates_fields_and_clears_notes() {
        let mut loan = opened_loan();
        let loan_id = loan.id_typed();
        let new_item = ItemId::generate();

        loan.execute(&LoanCommand::AmendDetails(AmendDetails {
            loan_id,
            borrower_id: None,
            item_id: Some(new_item),
            checkout_date: Some(day(2)),
            due_date: Some(day(25)),
            return_date: None,
            notes: Patch::Clear,
            occurred_at: day(3),
        }))
        .unwrap();

        assert_eq!(loan.item_id(), new_item);
        assert_eq!(loan.checkout_date(), day(2));
        assert_eq!(loan.due_date(), Some(day(25)));
        assert_eq!(loan.notes(), None);
        assert_eq!(loan.state(), LoanState::Active);
    }

    #[test]
    fn delete_reports_whether_a_unit_is_released() {
        let mut loan = opened_loan();
        let loan_id = loan.id_typed();
        let delete = LoanCommand::DeleteLoan(DeleteLoan {
            loan_id,
            occurred_at: day(4),
        });

        match &loan.handle(&delete).unwrap()[0] {
            LoanEvent::LoanDeleted(e) => assert!(e.released_unit),
            other => panic!("Expected LoanDeleted event, got {other:?}"),
        }

        close(&mut loan, day(5)).unwrap();
        match &loan.handle(&delete).unwrap()[0] {
            LoanEvent::LoanDeleted(e) => assert!(!e.released_unit),
            other => panic!("Expected LoanDeleted event, got {other:?}"),
        }
    }

    #[test]
    fn commands_against_unopened_loan_are_not_found() {
        let loan_id = LoanId::generate();
        let loan = Loan::empty(loan_id);
        let err = loan
            .handle(&LoanCommand::CloseLoan(CloseLoan {
                loan_id,
                return_date: day(2),
                occurred_at: day(2),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let loan = opened_loan();
        let before = loan.clone();
        let cmd = LoanCommand::CloseLoan(CloseLoan {
            loan_id: loan.id_typed(),
            return_date: day(3),
            occurred_at: day(3),
        });

        let first = loan.handle(&cmd).unwrap();
        let second = loan.handle(&cmd).unwrap();

        assert_eq!(first, second);
        assert_eq!(loan, before);
    }
}
