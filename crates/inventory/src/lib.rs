//! Inventory domain module.
//!
//! Unit counts for lendable items and the pure reserve/release decisions over
//! them (no IO, no storage). Atomicity against concurrent callers is the
//! record store's job; this crate only decides whether a single step is legal.

pub mod item;

pub use item::{CatalogInfo, Item, ItemId, StockError};
