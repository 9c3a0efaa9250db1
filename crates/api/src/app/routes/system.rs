use chrono::Utc;
use serde_json::json;

use crate::app::errors::{self, status};
use crate::app::{AppCirculation, Response, dto};

pub fn health() -> Response {
    Response::new(status::OK, json!({ "status": "ok" }))
}

pub fn sweep_overdue(circulation: &AppCirculation, body: dto::SweepRequest) -> Response {
    let as_of = match body.as_of(Utc::now()) {
        Ok(t) => t,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.sweep_overdue(as_of) {
        Ok(marked) => Response::new(
            status::OK,
            json!({
                "as_of": as_of.to_rfc3339(),
                "marked": marked.iter().map(dto::loan_to_json).collect::<Vec<_>>(),
            }),
        ),
        Err(e) => errors::circulation_error_to_response(e),
    }
}

pub fn audit_item(circulation: &AppCirculation, body: dto::AuditRequest) -> Response {
    let item_id = match body.item_id() {
        Ok(id) => id,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.audit_item(item_id) {
        Ok(audit) => Response::new(status::OK, dto::audit_to_json(&audit)),
        Err(e) => errors::circulation_error_to_response(e),
    }
}
