//! Catalog and membership preload for the in-memory store.
//!
//! ```json
//! {
//!   "items": [{ "title": "Dune", "author": "Frank Herbert", "total_units": 2 }],
//!   "borrowers": [{ "member_code": "S-001", "full_name": "Ada", "class": "Student" }]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use lendledger_borrowers::{Borrower, BorrowerClass, BorrowerId, BorrowerProfile, BorrowerStatus};
use lendledger_infra::store::{RecordStore, Repository};
use lendledger_inventory::{CatalogInfo, Item, ItemId};

/// Path to an optional seed file read by the binary.
pub const SEED_FILE_ENV: &str = "LENDLEDGER_SEED_FILE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub items: Vec<SeedItem>,
    #[serde(default)]
    pub borrowers: Vec<SeedBorrower>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedItem {
    /// Generated when absent.
    pub id: Option<ItemId>,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub isbn: Option<String>,
    pub total_units: u32,
    /// Defaults to `total_units`.
    pub available_units: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedBorrower {
    pub id: Option<BorrowerId>,
    pub member_code: String,
    pub full_name: String,
    pub email: Option<String>,
    pub class: BorrowerClass,
    #[serde(default = "active")]
    pub status: BorrowerStatus,
}

fn active() -> BorrowerStatus {
    BorrowerStatus::Active
}

impl Seed {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
    }

    /// Create every seeded record. Returns the number of items and borrowers
    /// written.
    pub fn load_into<S: RecordStore>(&self, store: &S, now: DateTime<Utc>) -> anyhow::Result<(usize, usize)> {
        for seed in &self.items {
            let id = seed.id.unwrap_or_else(ItemId::generate);
            let catalog = CatalogInfo {
                title: seed.title.clone(),
                author: seed.author.clone(),
                isbn: seed.isbn.clone(),
            };
            let available = seed.available_units.unwrap_or(seed.total_units);
            let item = Item::with_units(id, catalog, seed.total_units, available, now)
                .with_context(|| format!("seed item '{}'", seed.title))?;
            store
                .items()
                .create(item)
                .with_context(|| format!("storing seed item '{}'", seed.title))?;
        }

        for seed in &self.borrowers {
            let borrower = Borrower::new(
                seed.id.unwrap_or_else(BorrowerId::generate),
                BorrowerProfile {
                    member_code: seed.member_code.clone(),
                    full_name: seed.full_name.clone(),
                    email: seed.email.clone(),
                },
                seed.class,
                seed.status,
                now,
            );
            store
                .borrowers()
                .create(borrower)
                .with_context(|| format!("storing seed borrower '{}'", seed.member_code))?;
        }

        tracing::info!(
            items = self.items.len(),
            borrowers = self.borrowers.len(),
            "seed data loaded"
        );
        Ok((self.items.len(), self.borrowers.len()))
    }
}
