use serde_json::json;
use thiserror::Error;

use lendledger_infra::circulation::{CirculationError, ErrorClass};

use crate::app::Response;

/// HTTP-style status codes used in responses.
pub mod status {
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const UNPROCESSABLE_ENTITY: u16 = 422;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

/// Malformed request, rejected before anything reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("invalid {field}: '{value}'")]
    InvalidId { field: &'static str, value: String },

    #[error("invalid {field}: '{value}' (expected RFC 3339 or YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid status '{0}'. Must be Active, Closed or Overdue")]
    InvalidStatus(String),

    #[error("a new loan must start Active, not {0}")]
    NotActiveOnCreate(String),
}

pub fn request_error_to_response(err: RequestError) -> Response {
    match err {
        RequestError::UnknownAction(_) => json_error(status::NOT_FOUND, "unknown_action", err.to_string()),
        RequestError::Malformed(_) => json_error(status::BAD_REQUEST, "malformed_request", err.to_string()),
        _ => json_error(status::BAD_REQUEST, "validation_error", err.to_string()),
    }
}

pub fn circulation_error_to_response(err: CirculationError) -> Response {
    let status = match err.class() {
        ErrorClass::Input => status::BAD_REQUEST,
        ErrorClass::NotFound => status::NOT_FOUND,
        ErrorClass::Conflict => status::CONFLICT,
        ErrorClass::Policy => match err {
            CirculationError::BorrowerInactive(_) | CirculationError::InvalidTransition(_) => {
                status::UNPROCESSABLE_ENTITY
            }
            _ => status::CONFLICT,
        },
        ErrorClass::Integrity | ErrorClass::Configuration | ErrorClass::Infrastructure => {
            status::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, error_code(&err), err.to_string())
}

fn error_code(err: &CirculationError) -> &'static str {
    match err {
        CirculationError::Validation(_) => "validation_error",
        CirculationError::BorrowerNotFound(_) => "borrower_not_found",
        CirculationError::BorrowerInactive(_) => "borrower_inactive",
        CirculationError::ItemNotFound(_) => "item_not_found",
        CirculationError::LoanNotFound(_) => "loan_not_found",
        CirculationError::OutOfStock(_) => "out_of_stock",
        CirculationError::LoanLimitReached { .. } => "loan_limit_reached",
        CirculationError::DuplicateActiveLoan { .. } => "duplicate_active_loan",
        CirculationError::AlreadyClosed(_) => "already_closed",
        CirculationError::InvalidTransition(_) => "invalid_transition",
        CirculationError::InventoryCorruption { .. } => "inventory_corruption",
        CirculationError::CorruptLoan(_) => "corrupt_loan",
        CirculationError::UnknownClass(_) => "unknown_class",
        CirculationError::Conflict(_) => "conflict",
        CirculationError::Store(_) => "store_error",
    }
}

pub fn json_error(status: u16, code: &'static str, message: impl Into<String>) -> Response {
    Response::new(
        status,
        json!({
            "error": code,
            "message": message.into(),
        }),
    )
}
