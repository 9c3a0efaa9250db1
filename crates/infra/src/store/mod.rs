//! Record store: keyed repositories for items, borrowers and loans.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryRecordStore, InMemoryRepository};
pub use r#trait::{Conditional, Record, RecordStore, Repository, StoreError};
