use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use lendledger_borrowers::Borrower;
use lendledger_core::{AggregateRoot, ExpectedVersion};
use lendledger_inventory::Item;
use lendledger_lending::Loan;

use super::r#trait::{Conditional, Record, RecordStore, Repository, StoreError};

/// One stored record. `None` marks a record deleted while another writer
/// still held the slot.
type Slot<R> = Arc<Mutex<Option<R>>>;

/// In-memory repository.
///
/// The map lock guards membership; each record has its own mutex, so writers
/// on different records never wait on each other and writers on the same
/// record are serialized. Guarded writes additionally hold the map lock
/// exclusively while they read related records and write.
///
/// Lock order is map then record. Nothing waits for the map lock while
/// holding a record lock.
#[derive(Debug)]
pub struct InMemoryRepository<R: Record> {
    slots: RwLock<HashMap<R::Id, Slot<R>>>,
}

impl<R: Record> InMemoryRepository<R> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &R::Id) -> Result<Option<Slot<R>>, StoreError> {
        let slots = self.slots.read().map_err(|_| StoreError::Poisoned(R::KIND))?;
        Ok(slots.get(id).cloned())
    }

    fn snapshot(&self) -> Result<Vec<Slot<R>>, StoreError> {
        let slots = self.slots.read().map_err(|_| StoreError::Poisoned(R::KIND))?;
        Ok(slots.values().cloned().collect())
    }

    fn lock(slot: &Slot<R>) -> Result<MutexGuard<'_, Option<R>>, StoreError> {
        slot.lock().map_err(|_| StoreError::Poisoned(R::KIND))
    }

    fn collect<'a>(
        slots: impl Iterator<Item = &'a Slot<R>>,
        related: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<R>, StoreError> {
        let mut out = Vec::new();
        for slot in slots {
            if let Some(record) = Self::lock(slot)?.as_ref() {
                if related(record) {
                    out.push(record.clone());
                }
            }
        }
        Ok(out)
    }

    fn replace(
        slot: &Slot<R>,
        mut record: R,
        expected: ExpectedVersion,
    ) -> Result<R, StoreError> {
        let id = *record.id();
        let mut guard = Self::lock(slot)?;
        let current = guard
            .as_ref()
            .ok_or_else(|| StoreError::not_found::<R>(&id))?
            .version();

        if !expected.matches(current) {
            return Err(StoreError::Conflict {
                kind: R::KIND,
                id: id.to_string(),
                expected,
                actual: current,
            });
        }

        record.stamp_version(current + 1);
        *guard = Some(record.clone());
        Ok(record)
    }

    /// Insert `record` as-is; the caller has stamped its version.
    fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut slots = self.slots.write().map_err(|_| StoreError::Poisoned(R::KIND))?;
        let id = *record.id();
        if slots.contains_key(&id) {
            return Err(StoreError::Duplicate {
                kind: R::KIND,
                id: id.to_string(),
            });
        }
        slots.insert(id, Arc::new(Mutex::new(Some(record.clone()))));
        Ok(record)
    }

    fn scan(&self, mut visit: impl FnMut(&R) -> bool) -> Result<(), StoreError> {
        for slot in self.snapshot()? {
            let guard = Self::lock(&slot)?;
            if let Some(record) = guard.as_ref() {
                if !visit(record) {
                    break;
                }
            }
        }
        Ok(())
    }
}

impl<R: Record> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Repository<R> for InMemoryRepository<R> {
    fn find(&self, id: &R::Id) -> Result<Option<R>, StoreError> {
        match self.slot(id)? {
            Some(slot) => Ok(Self::lock(&slot)?.clone()),
            None => Ok(None),
        }
    }

    fn find_one(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Option<R>, StoreError> {
        let mut found = None;
        self.scan(|record| {
            if predicate(record) {
                found = Some(record.clone());
                return false;
            }
            true
        })?;
        Ok(found)
    }

    fn find_all(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, StoreError> {
        let mut out = Vec::new();
        self.scan(|record| {
            if predicate(record) {
                out.push(record.clone());
            }
            true
        })?;
        Ok(out)
    }

    fn count(&self, predicate: &dyn Fn(&R) -> bool) -> Result<usize, StoreError> {
        let mut n = 0;
        self.scan(|record| {
            if predicate(record) {
                n += 1;
            }
            true
        })?;
        Ok(n)
    }

    fn conditional_update<E, F>(&self, id: &R::Id, mutation: F) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&mut R) -> Result<(), E>,
    {
        let Some(slot) = self.slot(id)? else {
            return Ok(Conditional::Missing);
        };
        let mut guard = Self::lock(&slot)?;
        let Some(current) = guard.as_ref() else {
            return Ok(Conditional::Missing);
        };

        let mut next = current.clone();
        if let Err(e) = mutation(&mut next) {
            return Ok(Conditional::Rejected(e));
        }
        next.stamp_version(current.version() + 1);
        *guard = Some(next.clone());
        Ok(Conditional::Applied(next))
    }

    fn create(&self, mut record: R) -> Result<R, StoreError> {
        record.stamp_version(1);
        self.insert(record)
    }

    fn update(&self, record: R, expected: ExpectedVersion) -> Result<R, StoreError> {
        let id = *record.id();
        let slot = self.slot(&id)?.ok_or_else(|| StoreError::not_found::<R>(&id))?;
        Self::replace(&slot, record, expected)
    }

    fn create_guarded<E, F>(
        &self,
        mut record: R,
        related: &dyn Fn(&R) -> bool,
        guard: F,
    ) -> Result<Conditional<R, E>, StoreError>
    where
        F: FnOnce(&[R]) -> Result<(), E>,
    {
        let mut slots = self.slots.write().map_err(|_| StoreError::Poisoned(R::KIND))?;
        let id = *record.id();
        if slots.contains_key(&id) {
            return Err(StoreError::Duplicate {
                kind: R::KIND,
                id: id.to_string(),
            });
        }

        let existing = Self::collect(slots.values(), related)?;
        if let Err(e) = guard(&existing) {
            return Ok(Conditional::Rejected(e));
        }

        record.stamp_version(1);
        slots.insert(id, Arc::new(Mutex::new(Some(record.clone()))));
        Ok(Conditional::Applied(record))
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
        let slots = self.slots.write().map_err(|_| StoreError::Poisoned(R::KIND))?;
        let id = *record.id();
        let Some(slot) = slots.get(&id).cloned() else {
            return Ok(Conditional::Missing);
        };

        let existing = Self::collect(slots.values(), related)?;
        if let Err(e) = guard(&existing) {
            return Ok(Conditional::Rejected(e));
        }

        Self::replace(&slot, record, expected).map(Conditional::Applied)
    }

    fn delete(&self, id: &R::Id, expected: ExpectedVersion) -> Result<R, StoreError> {
        let slot = self.slot(id)?.ok_or_else(|| StoreError::not_found::<R>(id))?;
        let removed = {
            let mut guard = Self::lock(&slot)?;
            let current = guard
                .as_ref()
                .ok_or_else(|| StoreError::not_found::<R>(id))?
                .version();
            if !expected.matches(current) {
                return Err(StoreError::Conflict {
                    kind: R::KIND,
                    id: id.to_string(),
                    expected,
                    actual: current,
                });
            }
            guard.take().ok_or_else(|| StoreError::not_found::<R>(id))?
        };

        let mut slots = self.slots.write().map_err(|_| StoreError::Poisoned(R::KIND))?;
        if slots.get(id).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
            slots.remove(id);
        }
        Ok(removed)
    }

    fn restore(&self, record: R) -> Result<R, StoreError> {
        self.insert(record)
    }
}

/// In-memory [`RecordStore`] for tests, benches and the single-process binary.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    items: InMemoryRepository<Item>,
    borrowers: InMemoryRepository<Borrower>,
    loans: InMemoryRepository<Loan>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    type Items = InMemoryRepository<Item>;
    type Borrowers = InMemoryRepository<Borrower>;
    type Loans = InMemoryRepository<Loan>;

    fn items(&self) -> &Self::Items {
        &self.items
    }

    fn borrowers(&self) -> &Self::Borrowers {
        &self.borrowers
    }

    fn loans(&self) -> &Self::Loans {
        &self.loans
    }
}
