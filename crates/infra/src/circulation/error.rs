use thiserror::Error;

use lendledger_borrowers::{BorrowerClass, BorrowerId};
use lendledger_core::DomainError;
use lendledger_inventory::{ItemId, StockError};
use lendledger_lending::{LoanId, PolicyError};

use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Coarse failure category, used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed or contradictory input. No side effects.
    Input,
    /// Expected business refusal.
    Policy,
    NotFound,
    /// Another writer changed the record first; the whole call may be retried.
    Conflict,
    /// Stored counts contradict the loans. Not retryable.
    Integrity,
    /// The lending policy is incomplete.
    Configuration,
    Infrastructure,
}

/// Failure of a circulation operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CirculationError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("borrower {0} not found")]
    BorrowerNotFound(BorrowerId),

    #[error("borrower {0} is not active")]
    BorrowerInactive(BorrowerId),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("loan {0} not found")]
    LoanNotFound(LoanId),

    #[error("item {0} has no available units")]
    OutOfStock(ItemId),

    #[error("borrower {borrower_id} already has {limit} active loans")]
    LoanLimitReached { borrower_id: BorrowerId, limit: u32 },

    #[error("borrower {borrower_id} already has an active loan of item {item_id}")]
    DuplicateActiveLoan {
        borrower_id: BorrowerId,
        item_id: ItemId,
    },

    #[error("loan {0} is already closed")]
    AlreadyClosed(LoanId),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("inventory corruption on item {item_id}: available={available}, total={total}")]
    InventoryCorruption {
        item_id: ItemId,
        available: u32,
        total: u32,
    },

    /// A stored loan breaks its own date/state rules.
    #[error("loan record is inconsistent: {0}")]
    CorruptLoan(String),

    #[error("no lending policy for borrower class {0}")]
    UnknownClass(BorrowerClass),

    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl CirculationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CirculationError::Validation(_) => ErrorClass::Input,
            CirculationError::BorrowerInactive(_)
            | CirculationError::OutOfStock(_)
            | CirculationError::LoanLimitReached { .. }
            | CirculationError::DuplicateActiveLoan { .. }
            | CirculationError::AlreadyClosed(_)
            | CirculationError::InvalidTransition(_) => ErrorClass::Policy,
            CirculationError::BorrowerNotFound(_)
            | CirculationError::ItemNotFound(_)
            | CirculationError::LoanNotFound(_) => ErrorClass::NotFound,
            CirculationError::Conflict(_) => ErrorClass::Conflict,
            CirculationError::InventoryCorruption { .. } | CirculationError::CorruptLoan(_) => {
                ErrorClass::Integrity
            }
            CirculationError::UnknownClass(_) => ErrorClass::Configuration,
            CirculationError::Store(_) => ErrorClass::Infrastructure,
        }
    }

    /// Map a loan state machine rejection for `loan_id`.
    pub(crate) fn from_domain(loan_id: LoanId, err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                CirculationError::Validation(msg)
            }
            DomainError::InvalidTransition(msg) => CirculationError::InvalidTransition(msg),
            DomainError::NotFound => CirculationError::LoanNotFound(loan_id),
            DomainError::Conflict(msg) => CirculationError::Conflict(msg),
            DomainError::InvariantViolation(msg) => {
                CirculationError::CorruptLoan(format!("loan {loan_id}: {msg}"))
            }
        }
    }
}

impl From<StoreError> for CirculationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { .. } => CirculationError::Conflict(value.to_string()),
            other => CirculationError::Store(other),
        }
    }
}

impl From<StockError> for CirculationError {
    fn from(value: StockError) -> Self {
        match value {
            StockError::OutOfStock { item_id } => CirculationError::OutOfStock(item_id),
            StockError::Corruption {
                item_id,
                available,
                total,
            } => CirculationError::InventoryCorruption {
                item_id,
                available,
                total,
            },
        }
    }
}

impl From<LedgerError> for CirculationError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::ItemNotFound(id) => CirculationError::ItemNotFound(id),
            LedgerError::Stock(err) => err.into(),
            LedgerError::Store(err) => err.into(),
        }
    }
}

impl From<PolicyError> for CirculationError {
    fn from(value: PolicyError) -> Self {
        match value {
            PolicyError::UnknownClass(class) => CirculationError::UnknownClass(class),
            PolicyError::DateOutOfRange(..) => CirculationError::Validation(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_error_taxonomy() {
        let item = ItemId::generate();
        assert_eq!(CirculationError::OutOfStock(item).class(), ErrorClass::Policy);
        assert_eq!(CirculationError::ItemNotFound(item).class(), ErrorClass::NotFound);
        assert_eq!(
            CirculationError::InventoryCorruption {
                item_id: item,
                available: 2,
                total: 1
            }
            .class(),
            ErrorClass::Integrity
        );
        assert_eq!(
            CirculationError::UnknownClass(BorrowerClass::Staff).class(),
            ErrorClass::Configuration
        );
    }

    #[test]
    fn version_conflicts_surface_as_conflict() {
        let err: CirculationError = StoreError::Conflict {
            kind: "loan",
            id: "x".to_string(),
            expected: lendledger_core::ExpectedVersion::Exact(1),
            actual: 2,
        }
        .into();
        assert_eq!(err.class(), ErrorClass::Conflict);
    }

    #[test]
    fn ledger_errors_map_to_circulation_kinds() {
        let item = ItemId::generate();
        let err: CirculationError = LedgerError::Stock(StockError::OutOfStock { item_id: item }).into();
        assert_eq!(err, CirculationError::OutOfStock(item));
        let err: CirculationError = LedgerError::ItemNotFound(item).into();
        assert_eq!(err, CirculationError::ItemNotFound(item));
    }
}
