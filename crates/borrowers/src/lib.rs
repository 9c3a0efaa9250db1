//! Borrower records as seen by the lending rules.
//!
//! Registration and profile editing are owned by the catalog side; lending
//! only reads a borrower's class and status.

pub mod borrower;

pub use borrower::{Borrower, BorrowerClass, BorrowerId, BorrowerProfile, BorrowerStatus};
