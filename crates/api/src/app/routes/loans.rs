use chrono::Utc;
use serde_json::json;

use crate::app::errors::{self, status};
use crate::app::{AppCirculation, Response, dto};

pub fn create_loan(circulation: &AppCirculation, body: dto::CreateLoanRequest) -> Response {
    let now = Utc::now();
    let request = match body.into_checkout(now) {
        Ok(r) => r,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.checkout(request, now) {
        Ok(loan) => Response::new(status::CREATED, dto::loan_to_json(&loan)),
        Err(e) => errors::circulation_error_to_response(e),
    }
}

pub fn list_loans(circulation: &AppCirculation, query: dto::ListLoansQuery) -> Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.list_loan_views(&filter) {
        Ok(views) => Response::new(
            status::OK,
            json!({
                "count": views.len(),
                "loans": views.iter().map(dto::loan_view_to_json).collect::<Vec<_>>(),
            }),
        ),
        Err(e) => errors::circulation_error_to_response(e),
    }
}

pub fn get_loan(circulation: &AppCirculation, loan_id: Option<&str>) -> Response {
    let loan_id = match dto::parse_loan_id(loan_id) {
        Ok(id) => id,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.get_loan_view(loan_id) {
        Ok(view) => Response::new(status::OK, dto::loan_view_to_json(&view)),
        Err(e) => errors::circulation_error_to_response(e),
    }
}

pub fn amend_loan(
    circulation: &AppCirculation,
    loan_id: Option<&str>,
    body: dto::UpdateLoanRequest,
) -> Response {
    let loan_id = match dto::parse_loan_id(loan_id) {
        Ok(id) => id,
        Err(e) => return errors::request_error_to_response(e),
    };
    let changes = match body.into_changes() {
        Ok(c) => c,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.amend(loan_id, changes, Utc::now()) {
        Ok(loan) => Response::new(status::OK, dto::loan_to_json(&loan)),
        Err(e) => errors::circulation_error_to_response(e),
    }
}

pub fn close_loan(
    circulation: &AppCirculation,
    loan_id: Option<&str>,
    body: dto::CloseLoanRequest,
) -> Response {
    let loan_id = match dto::parse_loan_id(loan_id) {
        Ok(id) => id,
        Err(e) => return errors::request_error_to_response(e),
    };
    let return_date = match body.return_date() {
        Ok(d) => d,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.close_loan(loan_id, return_date, Utc::now()) {
        Ok(loan) => Response::new(status::OK, dto::loan_to_json(&loan)),
        Err(e) => errors::circulation_error_to_response(e),
    }
}

pub fn delete_loan(circulation: &AppCirculation, loan_id: Option<&str>) -> Response {
    let loan_id = match dto::parse_loan_id(loan_id) {
        Ok(id) => id,
        Err(e) => return errors::request_error_to_response(e),
    };

    match circulation.delete_loan(loan_id, Utc::now()) {
        Ok(removed) => Response::new(
            status::OK,
            json!({
                "id": loan_id.to_string(),
                "deleted": true,
                "released_unit": removed.holds_unit(),
            }),
        ),
        Err(e) => errors::circulation_error_to_response(e),
    }
}
