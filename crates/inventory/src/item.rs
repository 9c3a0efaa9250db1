use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lendledger_core::{AggregateRoot, DomainError};

lendledger_core::typed_id!(
    /// Catalog item identifier.
    ItemId
);

/// Catalog attributes. Opaque to the lending rules; carried for summaries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

/// Failure of a single reserve/release step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("item {item_id} has no available units")]
    OutOfStock { item_id: ItemId },

    /// Stored counts break `0 <= available <= total`.
    #[error("inventory corruption on item {item_id}: available={available}, total={total}")]
    Corruption {
        item_id: ItemId,
        available: u32,
        total: u32,
    },
}

/// A lendable item and its unit counts.
///
/// Invariant: `available_units <= total_units`. Counts are unsigned, so the
/// lower bound holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    catalog: CatalogInfo,
    total_units: u32,
    available_units: u32,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Item {
    /// New item with every unit on the shelf.
    pub fn new(id: ItemId, catalog: CatalogInfo, total_units: u32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            catalog,
            total_units,
            available_units: total_units,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Item with some units already out on loan.
    pub fn with_units(
        id: ItemId,
        catalog: CatalogInfo,
        total_units: u32,
        available_units: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if available_units > total_units {
            return Err(DomainError::validation(format!(
                "available units ({available_units}) cannot exceed total units ({total_units})"
            )));
        }
        let mut item = Self::new(id, catalog, total_units, now);
        item.available_units = available_units;
        Ok(item)
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn catalog(&self) -> &CatalogInfo {
        &self.catalog
    }

    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    pub fn available_units(&self) -> u32 {
        self.available_units
    }

    /// Units currently out on loan (`total - available`).
    pub fn units_on_loan(&self) -> u32 {
        self.total_units.saturating_sub(self.available_units)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Store-owned revision stamp.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Check `available_units <= total_units`.
    pub fn check_counts(&self) -> Result<(), StockError> {
        if self.available_units > self.total_units {
            return Err(self.corruption());
        }
        Ok(())
    }

    pub fn has_available_unit(&self) -> bool {
        self.available_units > 0 && self.available_units <= self.total_units
    }

    /// Take one unit off the shelf.
    pub fn reserve(&mut self) -> Result<(), StockError> {
        self.check_counts()?;
        if self.available_units == 0 {
            return Err(StockError::OutOfStock { item_id: self.id });
        }
        self.available_units -= 1;
        Ok(())
    }

    /// Put one unit back. Never pushes `available_units` past `total_units`;
    /// a release with nothing on loan is reported as corruption and leaves
    /// the counts untouched.
    pub fn release(&mut self) -> Result<(), StockError> {
        self.check_counts()?;
        if self.available_units == self.total_units {
            return Err(self.corruption());
        }
        self.available_units += 1;
        Ok(())
    }

    fn corruption(&self) -> StockError {
        StockError::Corruption {
            item_id: self.id,
            available: self.available_units,
            total: self.total_units,
        }
    }
}

impl AggregateRoot for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_item(total: u32) -> Item {
        Item::new(
            ItemId::generate(),
            CatalogInfo {
                title: "The Rust Programming Language".to_string(),
                author: "Klabnik & Nichols".to_string(),
                isbn: None,
            },
            total,
            Utc::now(),
        )
    }

    #[test]
    fn new_item_has_every_unit_available() {
        let item = test_item(3);
        assert_eq!(item.total_units(), 3);
        assert_eq!(item.available_units(), 3);
        assert_eq!(item.units_on_loan(), 0);
    }

    #[test]
    fn reserve_decrements_until_out_of_stock() {
        let mut item = test_item(1);
        item.reserve().unwrap();
        assert_eq!(item.available_units(), 0);

        let err = item.reserve().unwrap_err();
        assert_eq!(err, StockError::OutOfStock { item_id: item.id_typed() });
        assert_eq!(item.available_units(), 0);
    }

    #[test]
    fn release_on_full_shelf_is_corruption_and_leaves_counts() {
        let mut item = test_item(2);
        match item.release() {
            Err(StockError::Corruption { available: 2, total: 2, .. }) => {}
            other => panic!("expected corruption, got {other:?}"),
        }
        assert_eq!(item.available_units(), 2);
    }

    #[test]
    fn with_units_rejects_more_available_than_total() {
        let err = Item::with_units(
            ItemId::generate(),
            CatalogInfo::default(),
            1,
            2,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_unit_item_can_never_be_reserved() {
        let mut item = test_item(0);
        assert!(!item.has_available_unit());
        assert!(matches!(item.reserve(), Err(StockError::OutOfStock { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any interleaving of reserve/release keeps
        /// `available <= total`, and successful steps move the count by one.
        #[test]
        fn counts_stay_within_bounds(
            total in 0u32..8,
            ops in prop::collection::vec(any::<bool>(), 0..64)
        ) {
            let mut item = test_item(total);
            for reserve in ops {
                let before = item.available_units();
                let result = if reserve { item.reserve() } else { item.release() };
                match result {
                    Ok(()) if reserve => prop_assert_eq!(item.available_units(), before - 1),
                    Ok(()) => prop_assert_eq!(item.available_units(), before + 1),
                    Err(_) => prop_assert_eq!(item.available_units(), before),
                }
                prop_assert!(item.available_units() <= item.total_units());
            }
        }
    }
}
