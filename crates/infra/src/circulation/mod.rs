//! Checkout/return orchestration.
//!
//! `Circulation` coordinates the policy table, the inventory ledger and the
//! loan state machine so each compound operation either completes or leaves
//! the store as it found it.
//!
//! ## Write ordering
//!
//! ```text
//! checkout:  advisory checks → reserve unit → guarded create of the loan
//! close:     close loan (version-checked) → release unit
//! amend:     plan on a copy → reserve new unit → (guarded) loan write → release old unit
//! delete:    delete loan (version-checked) → release unit
//! ```
//!
//! A write that gives a borrower a new hold re-checks the pair and the limit
//! inside the store's guarded write, so concurrent checkouts that all passed
//! the advisory checks cannot together exceed either. Every step after the
//! first has a compensation that undoes the earlier steps if it fails. Only
//! the writer whose version-checked loan write wins touches inventory, so a
//! unit is released at most once per close.
//!
//! Events are published after the writes; the bus is not a source of truth.

mod error;
mod request;
mod view;

pub use error::{CirculationError, ErrorClass};
pub use request::{CheckoutRequest, LoanChanges};
pub use view::{BorrowerSummary, InventoryAudit, ItemSummary, LoanFilter, LoanView};

use chrono::{DateTime, Utc};

use lendledger_borrowers::{Borrower, BorrowerClass, BorrowerId};
use lendledger_core::{AggregateRoot, ExpectedVersion, Patch};
use lendledger_events::{EventBus, EventEnvelope};
use lendledger_inventory::ItemId;
use lendledger_lending::{
    AmendDetails, CloseLoan, DeleteLoan, LendingLimits, Loan, LoanCommand, LoanEvent, LoanId,
    LoanState, MarkOverdue, OpenLoan, PolicyTable, ReopenLoan,
};

use crate::config::CirculationConfig;
use crate::ledger::{InventoryLedger, LedgerError};
use crate::store::{Conditional, RecordStore, Repository, StoreError};

/// Envelope type published for loan events.
pub type LoanEnvelope = EventEnvelope<LoanEvent>;

pub const LOAN_AGGREGATE_TYPE: &str = "lending.loan";

/// The loan a changeset resolves to, before anything is written.
struct AmendPlan {
    next: Loan,
    events: Vec<LoanEvent>,
    /// Limits to enforce atomically with the write when the loan newly holds a
    /// unit for its (borrower, item) pair.
    guard_limits: Option<LendingLimits>,
}

/// Checkout/return orchestrator over an injected record store and event bus.
#[derive(Debug)]
pub struct Circulation<S, B> {
    store: S,
    bus: B,
    policy: PolicyTable,
}

impl<S, B> Circulation<S, B> {
    pub fn new(store: S, bus: B, config: CirculationConfig) -> Self {
        Self {
            store,
            bus,
            policy: config.policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }
}

impl<S, B> Circulation<S, B>
where
    S: RecordStore,
    B: EventBus<LoanEnvelope>,
{
    /// Create an `Active` loan and take one unit of the item off the shelf.
    ///
    /// Checks run in a fixed order so the reported failure is deterministic:
    /// borrower, item, loan limit, duplicate pair, stock.
    pub fn checkout(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        self.checkout_inner(request, now)
            .inspect_err(|err| log_rejection("checkout", err))
    }

    /// Close a loan and return its unit to the shelf. `return_date` defaults
    /// to `now`.
    pub fn close_loan(
        &self,
        loan_id: LoanId,
        return_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        self.close_inner(loan_id, return_date, now)
            .inspect_err(|err| log_rejection("close_loan", err))
    }

    /// Apply a partial update, including reassignment and state changes.
    ///
    /// All-or-nothing: on any failure the loan and the inventory are left as
    /// they were.
    pub fn amend(
        &self,
        loan_id: LoanId,
        changes: LoanChanges,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        self.amend_inner(loan_id, changes, now)
            .inspect_err(|err| log_rejection("amend", err))
    }

    /// Remove a loan, releasing its unit if it still holds one. Returns the
    /// removed record.
    pub fn delete_loan(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<Loan, CirculationError> {
        self.delete_inner(loan_id, now)
            .inspect_err(|err| log_rejection("delete_loan", err))
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Result<Loan, CirculationError> {
        self.load_loan(loan_id)
    }

    /// Loans matching `filter`, newest-created first.
    pub fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<Loan>, CirculationError> {
        let mut loans = self.store.loans().find_all(&|loan| filter.matches(loan))?;
        view::sort_newest_first(&mut loans);
        Ok(loans)
    }

    pub fn get_loan_view(&self, loan_id: LoanId) -> Result<LoanView, CirculationError> {
        let loan = self.load_loan(loan_id)?;
        self.join(loan)
    }

    pub fn list_loan_views(&self, filter: &LoanFilter) -> Result<Vec<LoanView>, CirculationError> {
        self.list_loans(filter)?
            .into_iter()
            .map(|loan| self.join(loan))
            .collect()
    }

    /// Move every `Active` loan due before `as_of` to `Overdue`.
    ///
    /// Loans changed concurrently by another writer are skipped; the next
    /// sweep picks them up if they still qualify.
    pub fn sweep_overdue(&self, as_of: DateTime<Utc>) -> Result<Vec<Loan>, CirculationError> {
        let candidates = self.store.loans().find_all(&|loan| {
            loan.state() == LoanState::Active && loan.due_date().is_some_and(|due| due < as_of)
        })?;

        let mut marked = Vec::with_capacity(candidates.len());
        for loan in candidates {
            let loan_id = loan.id_typed();
            let mut next = loan.clone();
            let events = match next.execute(&LoanCommand::MarkOverdue(MarkOverdue { loan_id, as_of })) {
                Ok(events) => events,
                Err(err) => {
                    tracing::debug!(loan_id = %loan_id, error = %err, "overdue sweep skipped loan");
                    continue;
                }
            };
            match self
                .store
                .loans()
                .update(next, ExpectedVersion::Exact(loan.version()))
            {
                Ok(stored) => {
                    self.publish(&stored, events);
                    marked.push(stored);
                }
                Err(err @ (StoreError::Conflict { .. } | StoreError::NotFound { .. })) => {
                    tracing::debug!(loan_id = %loan_id, error = %err, "overdue sweep lost a race");
                }
                Err(err) => return Err(err.into()),
            }
        }

        view::sort_newest_first(&mut marked);
        tracing::info!(as_of = %as_of, marked = marked.len(), "overdue sweep finished");
        Ok(marked)
    }

    /// Compare an item's stored counts with the loans holding its units.
    ///
    /// Only meaningful while no operation on the item is in flight.
    pub fn audit_item(&self, item_id: ItemId) -> Result<InventoryAudit, CirculationError> {
        let item = self
            .store
            .items()
            .find(&item_id)?
            .ok_or(CirculationError::ItemNotFound(item_id))?;
        let holding = self
            .store
            .loans()
            .count(&|loan| loan.item_id() == item_id && loan.holds_unit())?;

        let audit = InventoryAudit {
            item_id,
            total_units: item.total_units(),
            available_units: item.available_units(),
            holding_loans: u32::try_from(holding).unwrap_or(u32::MAX),
        };
        if !audit.is_consistent() {
            tracing::error!(
                item_id = %item_id,
                total = audit.total_units,
                available = audit.available_units,
                holding = audit.holding_loans,
                "inventory audit failed"
            );
            return Err(CirculationError::InventoryCorruption {
                item_id,
                available: audit.available_units,
                total: audit.total_units,
            });
        }
        Ok(audit)
    }

    fn checkout_inner(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        request.validate()?;
        let CheckoutRequest {
            borrower_id,
            item_id,
            checkout_date,
            due_date,
            notes,
        } = request;

        let borrower = self.active_borrower(borrower_id)?;
        if self.store.items().find(&item_id)?.is_none() {
            return Err(CirculationError::ItemNotFound(item_id));
        }
        let limits = self.policy.limits(borrower.class())?;
        self.check_holds(borrower_id, item_id, limits, None)?;
        let due_date = match due_date {
            Some(due) => due,
            None => self.policy.due_date(checkout_date, borrower.class())?,
        };

        self.ledger().reserve(item_id)?;

        let loan_id = LoanId::generate();
        let mut loan = Loan::empty(loan_id);
        let events = match loan.execute(&LoanCommand::OpenLoan(OpenLoan {
            loan_id,
            borrower_id,
            item_id,
            checkout_date,
            due_date,
            notes,
            occurred_at: now,
        })) {
            Ok(events) => events,
            Err(err) => {
                self.give_back(item_id);
                return Err(CirculationError::from_domain(loan_id, err));
            }
        };

        let created = self.store.loans().create_guarded(
            loan,
            &|other| holds_for(other, borrower_id),
            |held| check_hold(held, borrower_id, item_id, limits, None),
        );
        let loan = match settle(loan_id, created) {
            Ok(loan) => loan,
            Err(err) => {
                self.give_back(item_id);
                return Err(err);
            }
        };

        tracing::info!(
            loan_id = %loan_id,
            borrower_id = %borrower_id,
            item_id = %item_id,
            due_date = %due_date,
            "loan checked out"
        );
        self.publish(&loan, events);
        Ok(loan)
    }

    fn close_inner(
        &self,
        loan_id: LoanId,
        return_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        let current = self.load_loan(loan_id)?;
        if !current.holds_unit() {
            return Err(CirculationError::AlreadyClosed(loan_id));
        }

        let mut next = current.clone();
        let events = next
            .execute(&LoanCommand::CloseLoan(CloseLoan {
                loan_id,
                return_date: return_date.unwrap_or_else(|| default_return_date(&current, now)),
                occurred_at: now,
            }))
            .map_err(|err| CirculationError::from_domain(loan_id, err))?;

        let stored = match self
            .store
            .loans()
            .update(next, ExpectedVersion::Exact(current.version()))
        {
            Ok(stored) => stored,
            Err(StoreError::Conflict { .. }) if self.is_closed(loan_id) => {
                return Err(CirculationError::AlreadyClosed(loan_id));
            }
            Err(err) => return Err(loan_write_error(loan_id, err)),
        };

        if let Err(err) = self.release_unit(current.item_id()) {
            self.restore_loan(&current, &stored);
            return Err(err);
        }

        tracing::info!(loan_id = %loan_id, item_id = %current.item_id(), "loan closed");
        self.publish(&stored, events);
        Ok(stored)
    }

    fn amend_inner(
        &self,
        loan_id: LoanId,
        changes: LoanChanges,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        changes.validate()?;
        let current = self.load_loan(loan_id)?;
        let AmendPlan {
            next,
            events,
            guard_limits,
        } = self.plan_amend(&current, changes, now)?;

        if events.is_empty() {
            return Ok(current);
        }

        let moves_unit = next.holds_unit() && current.holds_unit() && next.item_id() != current.item_id();
        let takes_unit = next.holds_unit() && (!current.holds_unit() || moves_unit);
        let frees_unit = current.holds_unit() && (!next.holds_unit() || moves_unit);

        let next_item = next.item_id();
        if takes_unit {
            self.ledger().reserve(next_item)?;
        }

        let expected = ExpectedVersion::Exact(current.version());
        let written = match guard_limits {
            Some(limits) => {
                let (borrower_id, item_id) = (next.borrower_id(), next_item);
                let outcome = self.store.loans().update_guarded(
                    next,
                    expected,
                    &|other| holds_for(other, borrower_id),
                    |held| check_hold(held, borrower_id, item_id, limits, Some(loan_id)),
                );
                settle(loan_id, outcome)
            }
            None => self
                .store
                .loans()
                .update(next, expected)
                .map_err(|err| loan_write_error(loan_id, err)),
        };
        let stored = match written {
            Ok(stored) => stored,
            Err(err) => {
                if takes_unit {
                    self.give_back(next_item);
                }
                return Err(err);
            }
        };

        if frees_unit {
            if let Err(err) = self.release_unit(current.item_id()) {
                self.restore_loan(&current, &stored);
                if takes_unit {
                    self.give_back(stored.item_id());
                }
                return Err(err);
            }
        }

        tracing::info!(
            loan_id = %loan_id,
            state = %stored.state(),
            item_id = %stored.item_id(),
            borrower_id = %stored.borrower_id(),
            "loan amended"
        );
        self.publish(&stored, events);
        Ok(stored)
    }

    /// Resolve `changes` against `current` without writing anything.
    fn plan_amend(
        &self,
        current: &Loan,
        changes: LoanChanges,
        now: DateTime<Utc>,
    ) -> Result<AmendPlan, CirculationError> {
        let loan_id = current.id_typed();
        let LoanChanges {
            borrower_id,
            item_id,
            checkout_date,
            due_date,
            return_date,
            state,
            notes,
        } = changes;

        let borrower_id = borrower_id.as_set().copied().unwrap_or(current.borrower_id());
        let item_id = item_id.as_set().copied().unwrap_or(current.item_id());
        let target = state.as_set().copied().unwrap_or(current.state());
        let borrower_changed = borrower_id != current.borrower_id();
        let item_changed = item_id != current.item_id();
        let reopening = !current.holds_unit() && target.holds_unit();

        match (&due_date, target.holds_unit()) {
            (Patch::Clear, true) => {
                return Err(CirculationError::Validation(
                    "due_date cannot be cleared on an open loan".to_string(),
                ));
            }
            (Patch::Set(_), false) => {
                return Err(CirculationError::Validation(
                    "a closed loan has no due date".to_string(),
                ));
            }
            _ => {}
        }
        match (&return_date, target.holds_unit()) {
            (Patch::Clear, false) => {
                return Err(CirculationError::Validation(
                    "return_date cannot be cleared on a closed loan".to_string(),
                ));
            }
            (Patch::Set(_), true) => {
                return Err(CirculationError::Validation(
                    "an open loan has no return date".to_string(),
                ));
            }
            _ => {}
        }
        if current.state() == LoanState::Overdue && target == LoanState::Active {
            return Err(CirculationError::InvalidTransition(format!(
                "{} -> {}",
                LoanState::Overdue,
                LoanState::Active
            )));
        }

        let borrower = if borrower_changed || reopening {
            Some(self.active_borrower(borrower_id)?)
        } else {
            None
        };
        if item_changed && self.store.items().find(&item_id)?.is_none() {
            return Err(CirculationError::ItemNotFound(item_id));
        }

        let gains_hold = target.holds_unit() && (reopening || borrower_changed || item_changed);
        let mut guard_limits = None;
        if gains_hold {
            let class = match &borrower {
                Some(b) => b.class(),
                None => self.borrower_class(borrower_id)?,
            };
            let limits = self.policy.limits(class)?;
            self.check_holds(borrower_id, item_id, limits, Some(loan_id))?;
            guard_limits = Some(limits);
        }

        let details = AmendDetails {
            loan_id,
            borrower_id: borrower_changed.then_some(borrower_id),
            item_id: item_changed.then_some(item_id),
            checkout_date: checkout_date.as_set().copied(),
            due_date: if reopening { None } else { due_date.as_set().copied() },
            return_date: if current.holds_unit() { None } else { return_date.as_set().copied() },
            notes,
            occurred_at: now,
        };
        let has_details = details.borrower_id.is_some()
            || details.item_id.is_some()
            || details.checkout_date.is_some()
            || details.due_date.is_some()
            || details.return_date.is_some()
            || !details.notes.is_unchanged();

        let mut next = current.clone();
        let mut events = Vec::new();
        let mut run = |next: &mut Loan, command: LoanCommand| -> Result<(), CirculationError> {
            let produced = next
                .execute(&command)
                .map_err(|err| CirculationError::from_domain(loan_id, err))?;
            events.extend(produced);
            Ok(())
        };

        match (current.state(), target) {
            (from, LoanState::Closed) if from.holds_unit() => {
                run(
                    &mut next,
                    LoanCommand::CloseLoan(CloseLoan {
                        loan_id,
                        return_date: return_date.as_set().copied().unwrap_or_else(|| {
                            now.max(checkout_date.as_set().copied().unwrap_or(current.checkout_date()))
                        }),
                        occurred_at: now,
                    }),
                )?;
                if has_details {
                    run(&mut next, LoanCommand::AmendDetails(details))?;
                }
            }
            (LoanState::Closed, to) if to.holds_unit() => {
                let class = match &borrower {
                    Some(b) => b.class(),
                    None => self.borrower_class(borrower_id)?,
                };
                let due = match due_date.as_set() {
                    Some(due) => *due,
                    None => self.policy.due_date(now, class)?,
                };
                run(
                    &mut next,
                    LoanCommand::ReopenLoan(ReopenLoan {
                        loan_id,
                        due_date: due,
                        occurred_at: now,
                    }),
                )?;
                if has_details {
                    run(&mut next, LoanCommand::AmendDetails(details))?;
                }
                if to == LoanState::Overdue {
                    run(
                        &mut next,
                        LoanCommand::MarkOverdue(MarkOverdue { loan_id, as_of: now }),
                    )?;
                }
            }
            (from, to) => {
                if has_details {
                    run(&mut next, LoanCommand::AmendDetails(details))?;
                }
                if from == LoanState::Active && to == LoanState::Overdue {
                    run(
                        &mut next,
                        LoanCommand::MarkOverdue(MarkOverdue { loan_id, as_of: now }),
                    )?;
                }
            }
        }

        next.check_dates()
            .map_err(|err| CirculationError::from_domain(loan_id, err))?;

        Ok(AmendPlan {
            next,
            events,
            guard_limits,
        })
    }

    fn delete_inner(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<Loan, CirculationError> {
        let current = self.load_loan(loan_id)?;
        let mut doomed = current.clone();
        let events = doomed
            .execute(&LoanCommand::DeleteLoan(DeleteLoan {
                loan_id,
                occurred_at: now,
            }))
            .map_err(|err| CirculationError::from_domain(loan_id, err))?;

        let removed = self
            .store
            .loans()
            .delete(&loan_id, ExpectedVersion::Exact(current.version()))
            .map_err(|err| loan_write_error(loan_id, err))?;

        if removed.holds_unit() {
            if let Err(err) = self.release_unit(removed.item_id()) {
                if let Err(restore) = self.store.loans().restore(removed.clone()) {
                    tracing::error!(
                        loan_id = %loan_id,
                        error = %restore,
                        "failed to restore loan after aborted delete"
                    );
                }
                return Err(err);
            }
        }

        tracing::info!(
            loan_id = %loan_id,
            released_unit = removed.holds_unit(),
            "loan deleted"
        );
        self.publish(&removed, events);
        Ok(removed)
    }

    fn ledger(&self) -> InventoryLedger<'_, S::Items> {
        InventoryLedger::new(self.store.items())
    }

    fn load_loan(&self, loan_id: LoanId) -> Result<Loan, CirculationError> {
        self.store
            .loans()
            .find(&loan_id)?
            .ok_or(CirculationError::LoanNotFound(loan_id))
    }

    fn is_closed(&self, loan_id: LoanId) -> bool {
        matches!(self.store.loans().find(&loan_id), Ok(Some(loan)) if !loan.holds_unit())
    }

    fn active_borrower(&self, borrower_id: BorrowerId) -> Result<Borrower, CirculationError> {
        let borrower = self
            .store
            .borrowers()
            .find(&borrower_id)?
            .ok_or(CirculationError::BorrowerNotFound(borrower_id))?;
        if !borrower.can_borrow() {
            return Err(CirculationError::BorrowerInactive(borrower_id));
        }
        Ok(borrower)
    }

    fn borrower_class(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<BorrowerClass, CirculationError> {
        self.store
            .borrowers()
            .find(&borrower_id)?
            .map(|b| b.class())
            .ok_or(CirculationError::BorrowerNotFound(borrower_id))
    }

    /// Advisory pair/limit check against the current store contents.
    fn check_holds(
        &self,
        borrower_id: BorrowerId,
        item_id: ItemId,
        limits: LendingLimits,
        excluding: Option<LoanId>,
    ) -> Result<(), CirculationError> {
        let held = self
            .store
            .loans()
            .find_all(&|loan| holds_for(loan, borrower_id))?;
        check_hold(&held, borrower_id, item_id, limits, excluding)
    }

    /// Put back a unit this call reserved but could not attach to a loan.
    fn give_back(&self, item_id: ItemId) {
        if let Err(err) = self.ledger().release(item_id) {
            tracing::error!(item_id = %item_id, error = %err, "failed to release reserved unit");
        }
    }

    /// Release the unit a loan held. An item removed from the catalog has
    /// nothing left to release.
    fn release_unit(&self, item_id: ItemId) -> Result<(), CirculationError> {
        match self.ledger().release(item_id) {
            Ok(_) => Ok(()),
            Err(LedgerError::ItemNotFound(_)) => {
                tracing::warn!(item_id = %item_id, "released unit of an item that no longer exists");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write `previous` back over `written`.
    fn restore_loan(&self, previous: &Loan, written: &Loan) {
        if let Err(err) = self
            .store
            .loans()
            .update(previous.clone(), ExpectedVersion::Exact(written.version()))
        {
            tracing::error!(
                loan_id = %previous.id_typed(),
                error = %err,
                "failed to restore loan after aborted operation"
            );
        }
    }

    fn join(&self, loan: Loan) -> Result<LoanView, CirculationError> {
        let borrower = self.store.borrowers().find(&loan.borrower_id())?;
        let item = self.store.items().find(&loan.item_id())?;
        Ok(LoanView {
            borrower: borrower.as_ref().map(BorrowerSummary::from),
            item: item.as_ref().map(ItemSummary::from),
            loan,
        })
    }

    fn publish(&self, loan: &Loan, events: Vec<LoanEvent>) {
        for event in events {
            let envelope = EventEnvelope::wrap(
                loan.id_typed().0,
                LOAN_AGGREGATE_TYPE,
                loan.version(),
                event,
            );
            if let Err(err) = self.bus.publish(envelope) {
                tracing::warn!(loan_id = %loan.id_typed(), error = ?err, "failed to publish loan event");
            }
        }
    }
}

/// `now`, or the checkout date for a loan checked out ahead of time.
fn default_return_date(loan: &Loan, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(loan.checkout_date())
}

fn holds_for(loan: &Loan, borrower_id: BorrowerId) -> bool {
    loan.borrower_id() == borrower_id && loan.holds_unit()
}

/// Whether `borrower_id` may hold one more unit of `item_id`, given the loans
/// it already holds. The limit is checked before the pair.
fn check_hold(
    held: &[Loan],
    borrower_id: BorrowerId,
    item_id: ItemId,
    limits: LendingLimits,
    excluding: Option<LoanId>,
) -> Result<(), CirculationError> {
    let others: Vec<&Loan> = held
        .iter()
        .filter(|loan| Some(loan.id_typed()) != excluding)
        .collect();
    if others.len() >= limits.max_active_loans as usize {
        return Err(CirculationError::LoanLimitReached {
            borrower_id,
            limit: limits.max_active_loans,
        });
    }
    if others.iter().any(|loan| loan.item_id() == item_id) {
        return Err(CirculationError::DuplicateActiveLoan {
            borrower_id,
            item_id,
        });
    }
    Ok(())
}

fn settle(
    loan_id: LoanId,
    outcome: Result<Conditional<Loan, CirculationError>, StoreError>,
) -> Result<Loan, CirculationError> {
    match outcome {
        Ok(Conditional::Applied(loan)) => Ok(loan),
        Ok(Conditional::Rejected(err)) => Err(err),
        Ok(Conditional::Missing) => Err(CirculationError::LoanNotFound(loan_id)),
        Err(err) => Err(loan_write_error(loan_id, err)),
    }
}

fn loan_write_error(loan_id: LoanId, err: StoreError) -> CirculationError {
    match err {
        StoreError::NotFound { .. } => CirculationError::LoanNotFound(loan_id),
        other => other.into(),
    }
}

fn log_rejection(operation: &'static str, err: &CirculationError) {
    match err.class() {
        ErrorClass::Integrity => tracing::error!(operation, error = %err, "integrity failure"),
        ErrorClass::Configuration | ErrorClass::Infrastructure => {
            tracing::warn!(operation, error = %err, "operation failed")
        }
        _ => tracing::debug!(operation, error = %err, "operation rejected"),
    }
}
