//! Inventory ledger: atomic reserve/release of item units.
//!
//! Each step is one conditional update on the item record, so two callers
//! racing for the last unit see exactly one success.

use thiserror::Error;

use lendledger_inventory::{Item, ItemId, StockError};

use crate::store::{Conditional, Repository, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reserve/release view over the item repository.
#[derive(Debug)]
pub struct InventoryLedger<'a, R> {
    items: &'a R,
}

impl<'a, R> InventoryLedger<'a, R>
where
    R: Repository<Item>,
{
    pub fn new(items: &'a R) -> Self {
        Self { items }
    }

    /// Take one unit of `item_id` off the shelf.
    pub fn reserve(&self, item_id: ItemId) -> Result<Item, LedgerError> {
        self.step(item_id, Item::reserve)
    }

    /// Return one unit of `item_id` to the shelf.
    pub fn release(&self, item_id: ItemId) -> Result<Item, LedgerError> {
        self.step(item_id, Item::release)
    }

    fn step(
        &self,
        item_id: ItemId,
        mutation: fn(&mut Item) -> Result<(), StockError>,
    ) -> Result<Item, LedgerError> {
        match self.items.conditional_update(&item_id, mutation)? {
            Conditional::Applied(item) => {
                tracing::trace!(
                    item_id = %item_id,
                    available = item.available_units(),
                    total = item.total_units(),
                    "inventory step applied"
                );
                Ok(item)
            }
            Conditional::Rejected(err @ StockError::Corruption { .. }) => {
                tracing::error!(item_id = %item_id, error = %err, "inventory counts are corrupt");
                Err(err.into())
            }
            Conditional::Rejected(err) => Err(err.into()),
            Conditional::Missing => Err(LedgerError::ItemNotFound(item_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lendledger_core::AggregateRoot;
    use lendledger_inventory::CatalogInfo;

    use crate::store::InMemoryRepository;

    fn seeded(total: u32, available: u32) -> (InMemoryRepository<Item>, ItemId) {
        let repo = InMemoryRepository::new();
        let id = ItemId::generate();
        let item = Item::with_units(id, CatalogInfo::default(), total, available, Utc::now()).unwrap();
        repo.create(item).unwrap();
        (repo, id)
    }

    #[test]
    fn reserve_then_release_restores_counts() {
        let (repo, id) = seeded(2, 2);
        let ledger = InventoryLedger::new(&repo);

        assert_eq!(ledger.reserve(id).unwrap().available_units(), 1);
        let back = ledger.release(id).unwrap();
        assert_eq!(back.available_units(), 2);
        assert_eq!(back.version(), 3);
    }

    #[test]
    fn reserve_on_empty_shelf_is_out_of_stock() {
        let (repo, id) = seeded(1, 0);
        let ledger = InventoryLedger::new(&repo);
        assert_eq!(
            ledger.reserve(id),
            Err(LedgerError::Stock(StockError::OutOfStock { item_id: id }))
        );
    }

    #[test]
    fn release_on_full_shelf_is_corruption_and_writes_nothing() {
        let (repo, id) = seeded(3, 3);
        let ledger = InventoryLedger::new(&repo);

        assert!(matches!(
            ledger.release(id),
            Err(LedgerError::Stock(StockError::Corruption { available: 3, total: 3, .. }))
        ));
        let stored = repo.find(&id).unwrap().unwrap();
        assert_eq!(stored.available_units(), 3);
        assert_eq!(stored.version(), 1);
    }

    #[test]
    fn unknown_item_is_not_found() {
        let repo = InMemoryRepository::<Item>::new();
        let ledger = InventoryLedger::new(&repo);
        let id = ItemId::generate();
        assert_eq!(ledger.reserve(id), Err(LedgerError::ItemNotFound(id)));
        assert_eq!(ledger.release(id), Err(LedgerError::ItemNotFound(id)));
    }
}
