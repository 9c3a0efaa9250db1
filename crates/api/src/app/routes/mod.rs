use serde::de::DeserializeOwned;

use crate::app::errors::{self, RequestError};
use crate::app::{AppCirculation, Request, Response};

pub mod loans;
pub mod system;

/// Route a request to its handler by action name.
pub fn dispatch(circulation: &AppCirculation, request: Request) -> Response {
    let loan_id = request.loan_id.as_deref();
    match request.action.as_str() {
        "health" => system::health(),
        "checkout" | "create_loan" => with_body(request.body, |body| loans::create_loan(circulation, body)),
        "list_loans" => with_body(request.body, |query| loans::list_loans(circulation, query)),
        "get_loan" => loans::get_loan(circulation, loan_id),
        "amend_loan" | "update_loan" => {
            with_body(request.body, |body| loans::amend_loan(circulation, loan_id, body))
        }
        "close_loan" | "return_loan" => {
            with_body(request.body, |body| loans::close_loan(circulation, loan_id, body))
        }
        "delete_loan" => loans::delete_loan(circulation, loan_id),
        "sweep_overdue" => with_body(request.body, |body| system::sweep_overdue(circulation, body)),
        "audit_item" => with_body(request.body, |body| system::audit_item(circulation, body)),
        other => errors::request_error_to_response(RequestError::UnknownAction(other.to_string())),
    }
}

/// Decode `body` (absent or `null` reads as `{}`) and hand it to `handler`.
fn with_body<T: DeserializeOwned>(body: serde_json::Value, handler: impl FnOnce(T) -> Response) -> Response {
    let body = if body.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        body
    };
    match serde_json::from_value(body) {
        Ok(parsed) => handler(parsed),
        Err(err) => errors::request_error_to_response(RequestError::Malformed(err.to_string())),
    }
}
