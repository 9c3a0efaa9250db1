//! Lending domain module.
//!
//! Lending policy lookup and the loan lifecycle state machine, implemented as
//! deterministic domain logic (no IO, no storage).

pub mod loan;
pub mod policy;

pub use loan::{
    AmendDetails, CloseLoan, DeleteLoan, Loan, LoanAmended, LoanClosed, LoanCommand, LoanDeleted,
    LoanEvent, LoanId, LoanMarkedOverdue, LoanOpened, LoanReopened, LoanState, MarkOverdue,
    OpenLoan, ReopenLoan,
};
pub use policy::{LendingLimits, PolicyError, PolicyTable};
