use std::sync::Arc;

use thiserror::Error;

use lendledger_borrowers::Borrower;
use lendledger_core::{AggregateRoot, ExpectedVersion};
use lendledger_inventory::Item;
use lendledger_lending::Loan;

/// A record kind the store can hold.
///
/// The store owns `version`: `create` stamps 1 and every successful write
/// bumps it by one.
pub trait Record: AggregateRoot + Clone + Send + Sync + 'static {
    /// Short kind name used in errors and logs (e.g. `"loan"`).
    const KIND: &'static str;

    fn stamp_version(&mut self, version: u64);
}

impl Record for Item {
    const KIND: &'static str = "item";

    fn stamp_version(&mut self, version: u64) {
        self.set_version(version);
    }
}

impl Record for Borrower {
    const KIND: &'static str = "borrower";

    fn stamp_version(&mut self, version: u64) {
        self.set_version(version);
    }
}

impl Record for Loan {
    const KIND: &'static str = "loan";

    fn stamp_version(&mut self, version: u64) {
        self.set_version(version);
    }
}

/// Record store operation error.
///
/// Infrastructure failures only; business rejections travel through
/// [`Conditional::Rejected`] or the caller's own error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: String },

    #[error("{kind} {id} was modified concurrently (expected {expected:?}, found {actual})")]
    Conflict {
        kind: &'static str,
        id: String,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("{0} store lock poisoned")]
    Poisoned(&'static str),
}

impl StoreError {
    pub(crate) fn not_found<R: Record>(id: &R::Id) -> Self {
        StoreError::NotFound {
            kind: R::KIND,
            id: id.to_string(),
        }
    }
}

/// Outcome of a conditional or guarded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional<R, E> {
    /// The mutation ran and was committed; carries the stored record.
    Applied(R),
    /// The mutation refused; nothing was written.
    Rejected(E),
    /// No record with that id.
    Missing,
}

/// Keyed storage for one record kind.
///
/// Reads return owned snapshots. Writes are atomic per record.
pub trait Repository<R: Record>: Send + Sync {
    fn find(&self, id: &R::Id) -> Result<Option<R>, StoreError>;

    /// First record (in no particular order) matching `predicate`.
    fn find_one(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Option<R>, StoreError>;

    fn find_all(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, StoreError>;

    fn count(&self, predicate: &dyn Fn(&R) -> bool) -> Result<usize, StoreError>;

    /// Check-and-mutate one record atomically.
    ///
    /// `mutation` runs on a copy of the stored record while the record is
    /// locked against every other writer. `Ok(())` commits the copy with the
    /// next version; `Err(e)` leaves the stored record untouched and yields
    /// [`Conditional::Rejected`]. The closure must not call back into the
    /// store.
    fn conditional_update<E, F>(&self, id: &R::Id, mutation: F) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&mut R) -> Result<(), E>;

    /// Insert a new record at version 1.
    fn create(&self, record: R) -> Result<R, StoreError>;

    /// Replace a stored record if its version matches `expected`.
    fn update(&self, record: R, expected: ExpectedVersion) -> Result<R, StoreError>;

    /// Insert a new record unless `guard` rejects the stored records that
    /// match `related`.
    ///
    /// Guarded writes are serialized against each other, so two guarded
    /// writes never both pass on a snapshot that misses the other.
    fn create_guarded<E, F>(
        &self,
        record: R,
        related: &dyn Fn(&R) -> bool,
        guard: F,
    ) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&[R]) -> Result<(), E>;

    /// [`update`](Self::update) with the same guard semantics as
    /// [`create_guarded`](Self::create_guarded). The guard also sees the
    /// stored copy of `record` if it matches `related`.
    fn update_guarded<E, F>(
        &self,
        record: R,
        expected: ExpectedVersion,
        related: &dyn Fn(&R) -> bool,
        guard: F,
    ) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&[R]) -> Result<(), E>;

    /// Remove a record if its version matches `expected`. Returns the removed
    /// record.
    fn delete(&self, id: &R::Id, expected: ExpectedVersion) -> Result<R, StoreError>;

    /// Put back a record removed by [`delete`](Self::delete), keeping the
    /// version it was removed at.
    fn restore(&self, record: R) -> Result<R, StoreError>;
}

impl<R, S> Repository<R> for Arc<S>
where
    R: Record,
    S: Repository<R> + ?Sized,
{
    fn find(&self, id: &R::Id) -> Result<Option<R>, StoreError> {
        (**self).find(id)
    }

    fn find_one(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Option<R>, StoreError> {
        (**self).find_one(predicate)
    }

    fn find_all(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, StoreError> {
        (**self).find_all(predicate)
    }

    fn count(&self, predicate: &dyn Fn(&R) -> bool) -> Result<usize, StoreError> {
        (**self).count(predicate)
    }

    fn conditional_update<E, F>(&self, id: &R::Id, mutation: F) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&mut R) -> Result<(), E>,
    {
        (**self).conditional_update(id, mutation)
    }

    fn create(&self, record: R) -> Result<R, StoreError> {
        (**self).create(record)
    }

    fn update(&self, record: R, expected: ExpectedVersion) -> Result<R, StoreError> {
        (**self).update(record, expected)
    }

    fn create_guarded<E, F>(
        &self,
        record: R,
        related: &dyn Fn(&R) -> bool,
        guard: F,
    ) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&[R]) -> Result<(), E>,
    {
        (**self).create_guarded(record, related, guard)
    }

    fn update_guarded<E, F>(
        &self,
        record: R,
        expected: ExpectedVersion,
        related: &dyn Fn(&R) -> bool,
        guard: F,
    ) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&[R]) -> Result<(), E>,
    {
        (**self).update_guarded(record, expected, related, guard)
    }

    fn delete(&self, id: &R::Id, expected: ExpectedVersion) -> Result<R, StoreError> {
        (**self).delete(id, expected)
    }

    fn restore(&self, record: R) -> Result<R, StoreError> {
        (**self).restore(record)
    }
}

/// The three repositories the lending engine works against.
pub trait RecordStore: Send + Sync {
    type Items: Repository<Item>;
    type Borrowers: Repository<Borrower>;
    type Loans: Repository<Loan>;

    fn items(&self) -> &Self::Items;
    fn borrowers(&self) -> &Self::Borrowers;
    fn loans(&self) -> &Self::Loans;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    type Items = S::Items;
    type Borrowers = S::Borrowers;
    type Loans = S::Loans;

    fn items(&self) -> &Self::Items {
        (**self).items()
    }

    fn borrowers(&self) -> &Self::Borrowers {
        (**self).borrowers()
    }

    fn loans(&self) -> &Self::Loans {
        (**self).loans()
    }
}
