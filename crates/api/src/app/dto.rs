use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use lendledger_borrowers::BorrowerId;
use lendledger_core::{AggregateRoot, Patch, deserialize_patch};
use lendledger_infra::circulation::{CheckoutRequest, InventoryAudit, LoanChanges, LoanFilter, LoanView};
use lendledger_inventory::ItemId;
use lendledger_lending::{Loan, LoanId, LoanState};

use crate::app::errors::RequestError;

// -------------------------
// Request DTOs
// -------------------------

/// Field names follow the loan record; the older `reader`/`book`/`borrowDate`
/// spellings are accepted as aliases.
#[derive(Debug, Default, Deserialize)]
pub struct CreateLoanRequest {
    #[serde(alias = "reader")]
    pub borrower: Option<String>,
    #[serde(alias = "book")]
    pub item: Option<String>,
    #[serde(alias = "borrowDate")]
    pub checkout_date: Option<String>,
    #[serde(alias = "dueDate")]
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Absent keys stay unchanged; `null` clears.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLoanRequest {
    #[serde(default, alias = "reader", deserialize_with = "deserialize_patch")]
    pub borrower: Patch<String>,
    #[serde(default, alias = "book", deserialize_with = "deserialize_patch")]
    pub item: Patch<String>,
    #[serde(default, alias = "borrowDate", deserialize_with = "deserialize_patch")]
    pub checkout_date: Patch<String>,
    #[serde(default, alias = "dueDate", deserialize_with = "deserialize_patch")]
    pub due_date: Patch<String>,
    #[serde(default, alias = "returnDate", deserialize_with = "deserialize_patch")]
    pub return_date: Patch<String>,
    #[serde(default, deserialize_with = "deserialize_patch")]
    pub status: Patch<String>,
    #[serde(default, deserialize_with = "deserialize_patch")]
    pub notes: Patch<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseLoanRequest {
    #[serde(alias = "returnDate")]
    pub return_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLoansQuery {
    pub borrower: Option<String>,
    pub item: Option<String>,
    pub status: Option<String>,
    pub checkout_from: Option<String>,
    pub checkout_to: Option<String>,
    pub due_from: Option<String>,
    pub due_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SweepRequest {
    pub as_of: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditRequest {
    pub item: Option<String>,
}

// -------------------------
// Parsing helpers
// -------------------------

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, RequestError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Err(RequestError::Missing(field)),
        Some(v) => Ok(v),
    }
}

fn parse_id<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, RequestError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RequestError::Empty(field));
    }
    raw.parse().map_err(|_| RequestError::InvalidId {
        field,
        value: raw.to_string(),
    })
}

pub fn parse_loan_id(raw: Option<&str>) -> Result<LoanId, RequestError> {
    match raw.map(str::trim) {
        None | Some("") => Err(RequestError::Missing("loan id")),
        Some(v) => parse_id("loan id", v),
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_date(field: &'static str, raw: &str) -> Result<DateTime<Utc>, RequestError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| RequestError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

fn parse_optional_id<T: std::str::FromStr>(
    field: &'static str,
    raw: &Option<String>,
) -> Result<Option<T>, RequestError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_id(field, v).map(Some),
    }
}

fn parse_optional_date(field: &'static str, raw: &Option<String>) -> Result<Option<DateTime<Utc>>, RequestError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}

/// Also accepts the legacy names `Borrowed` and `Returned`.
pub fn parse_status(raw: &str) -> Result<LoanState, RequestError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" | "borrowed" => Ok(LoanState::Active),
        "closed" | "returned" => Ok(LoanState::Closed),
        "overdue" => Ok(LoanState::Overdue),
        _ => Err(RequestError::InvalidStatus(raw.trim().to_string())),
    }
}

fn patch_with<T>(
    patch: Patch<String>,
    parse: impl FnOnce(&str) -> Result<T, RequestError>,
) -> Result<Patch<T>, RequestError> {
    Ok(match patch {
        Patch::Unchanged => Patch::Unchanged,
        Patch::Clear => Patch::Clear,
        Patch::Set(raw) => Patch::Set(parse(&raw)?),
    })
}

impl CreateLoanRequest {
    pub fn into_checkout(self, now: DateTime<Utc>) -> Result<CheckoutRequest, RequestError> {
        let borrower_id: BorrowerId = parse_id("borrower id", required("borrower", &self.borrower)?)?;
        let item_id: ItemId = parse_id("item id", required("item", &self.item)?)?;
        let checkout_date = parse_optional_date("checkout date", &self.checkout_date)?.unwrap_or(now);
        let due_date = parse_optional_date("due date", &self.due_date)?;

        if let Some(raw) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            let state = parse_status(raw)?;
            if state != LoanState::Active {
                return Err(RequestError::NotActiveOnCreate(state.to_string()));
            }
        }

        let mut request = CheckoutRequest::new(borrower_id, item_id, checkout_date);
        if let Some(due) = due_date {
            request = request.with_due_date(due);
        }
        if let Some(notes) = self.notes {
            request = request.with_notes(notes);
        }
        Ok(request)
    }
}

impl UpdateLoanRequest {
    pub fn into_changes(self) -> Result<LoanChanges, RequestError> {
        Ok(LoanChanges {
            borrower_id: patch_with(self.borrower, |raw| parse_id("borrower id", raw))?,
            item_id: patch_with(self.item, |raw| parse_id("item id", raw))?,
            checkout_date: patch_with(self.checkout_date, |raw| parse_date("checkout date", raw))?,
            due_date: patch_with(self.due_date, |raw| parse_date("due date", raw))?,
            return_date: patch_with(self.return_date, |raw| parse_date("return date", raw))?,
            state: patch_with(self.status, parse_status)?,
            notes: self.notes,
        })
    }
}

impl CloseLoanRequest {
    pub fn return_date(&self) -> Result<Option<DateTime<Utc>>, RequestError> {
        parse_optional_date("return date", &self.return_date)
    }
}

impl ListLoansQuery {
    pub fn into_filter(self) -> Result<LoanFilter, RequestError> {
        Ok(LoanFilter {
            borrower_id: parse_optional_id("borrower id", &self.borrower)?,
            item_id: parse_optional_id("item id", &self.item)?,
            state: match self.status.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(v) => Some(parse_status(v)?),
            },
            checkout_from: parse_optional_date("checkout_from", &self.checkout_from)?,
            checkout_to: parse_optional_date("checkout_to", &self.checkout_to)?,
            due_from: parse_optional_date("due_from", &self.due_from)?,
            due_to: parse_optional_date("due_to", &self.due_to)?,
        })
    }
}

impl SweepRequest {
    pub fn as_of(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RequestError> {
        Ok(parse_optional_date("as_of", &self.as_of)?.unwrap_or(now))
    }
}

impl AuditRequest {
    pub fn item_id(&self) -> Result<ItemId, RequestError> {
        parse_id("item id", required("item", &self.item)?)
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn loan_to_json(loan: &Loan) -> serde_json::Value {
    serde_json::json!({
        "id": loan.id_typed().to_string(),
        "borrower": loan.borrower_id().to_string(),
        "item": loan.item_id().to_string(),
        "checkout_date": loan.checkout_date().to_rfc3339(),
        "due_date": loan.due_date().map(|d| d.to_rfc3339()),
        "return_date": loan.return_date().map(|d| d.to_rfc3339()),
        "status": loan.state().as_str(),
        "notes": loan.notes(),
        "version": loan.version(),
        "created_at": loan.created_at().to_rfc3339(),
        "updated_at": loan.updated_at().to_rfc3339(),
    })
}

pub fn loan_view_to_json(view: &LoanView) -> serde_json::Value {
    let mut value = loan_to_json(&view.loan);
    value["borrower_details"] = serde_json::json!(view.borrower);
    value["item_details"] = serde_json::json!(view.item);
    value
}

pub fn audit_to_json(audit: &InventoryAudit) -> serde_json::Value {
    serde_json::json!({
        "item": audit.item_id.to_string(),
        "total_units": audit.total_units,
        "available_units": audit.available_units,
        "holding_loans": audit.holding_loans,
        "consistent": audit.is_consistent(),
    })
}
