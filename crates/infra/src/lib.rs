//! Infrastructure layer: record store, inventory ledger, circulation
//! orchestration and configuration.

pub mod circulation;
pub mod config;
pub mod ledger;
pub mod store;
