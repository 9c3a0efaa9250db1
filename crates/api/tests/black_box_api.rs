use std::io::Write;
use std::process::{Command, Stdio};

use lendledger_api::app::{App, Request, Seed};
use lendledger_borrowers::BorrowerId;
use lendledger_infra::config::CirculationConfig;
use lendledger_inventory::ItemId;
use serde_json::{Value, json};

struct TestApp {
    app: App,
    item: ItemId,
    spare_item: ItemId,
    student: BorrowerId,
    other: BorrowerId,
    suspended: BorrowerId,
}

impl TestApp {
    fn spawn() -> Self {
        let (item, spare_item) = (ItemId::generate(), ItemId::generate());
        let (student, other, suspended) = (BorrowerId::generate(), BorrowerId::generate(), BorrowerId::generate());
        let seed: Seed = serde_json::from_value(json!({
            "items": [
                { "id": item, "title": "Dune", "author": "Frank Herbert", "total_units": 1 },
                { "id": spare_item, "title": "Emma", "author": "Jane Austen", "total_units": 3 },
            ],
            "borrowers": [
                { "id": student, "member_code": "S-1", "full_name": "Ada", "class": "Student" },
                { "id": other, "member_code": "S-2", "full_name": "Alan", "class": "Student" },
                { "id": suspended, "member_code": "S-3", "full_name": "Eve", "class": "Student", "status": "Suspended" },
            ],
        }))
        .unwrap();
        let app = App::build(CirculationConfig::default(), Some(&seed)).unwrap();
        Self {
            app,
            item,
            spare_item,
            student,
            other,
            suspended,
        }
    }

    fn call(&self, request: Value) -> (u16, Value) {
        let line = self.app.handle_line(&request.to_string());
        let response: Value = serde_json::from_str(&line).unwrap();
        (
            response["status"].as_u64().unwrap() as u16,
            response["body"].clone(),
        )
    }

    fn checkout(&self, borrower: BorrowerId, item: ItemId) -> (u16, Value) {
        self.call(json!({
            "action": "checkout",
            "body": { "borrower": borrower.to_string(), "item": item.to_string() },
        }))
    }

    fn available(&self, item: ItemId) -> u64 {
        let (_, body) = self.call(json!({ "action": "audit_item", "body": { "item": item.to_string() } }));
        body["available_units"].as_u64().unwrap()
    }
}

#[test]
fn health_answers_ok() {
    let app = TestApp::spawn();
    let (status, body) = app.call(json!({ "action": "health" }));
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[test]
fn last_unit_checkout_close_checkout() {
    let app = TestApp::spawn();

    let (status, loan) = app.checkout(app.student, app.item);
    assert_eq!(status, 201);
    assert_eq!(loan["status"], "Active");
    assert_eq!(app.available(app.item), 0);

    let (status, body) = app.checkout(app.other, app.item);
    assert_eq!(status, 409);
    assert_eq!(body["error"], "out_of_stock");

    let (status, closed) = app.call(json!({
        "action": "close_loan",
        "loan_id": loan["id"],
    }));
    assert_eq!(status, 200);
    assert_eq!(closed["status"], "Closed");
    assert!(closed["due_date"].is_null());
    assert_eq!(app.available(app.item), 1);

    let (status, _) = app.checkout(app.other, app.item);
    assert_eq!(status, 201);
}

#[test]
fn student_due_date_defaults_to_fourteen_days() {
    let app = TestApp::spawn();
    let (status, loan) = app.call(json!({
        "action": "checkout",
        "body": {
            "reader": app.student.to_string(),
            "book": app.spare_item.to_string(),
            "borrowDate": "2024-01-01",
        },
    }));
    assert_eq!(status, 201);
    assert_eq!(loan["due_date"], "2024-01-15T00:00:00+00:00");
}

#[test]
fn error_responses_carry_codes_and_statuses() {
    let app = TestApp::spawn();

    let (status, body) = app.call(json!({ "action": "checkout", "body": { "item": app.item.to_string() } }));
    assert_eq!((status, body["message"].as_str()), (400, Some("borrower is required")));

    let (status, body) = app.call(json!({
        "action": "checkout",
        "body": { "borrower": "not-a-uuid", "item": app.item.to_string() },
    }));
    assert_eq!((status, body["error"].as_str()), (400, Some("validation_error")));

    let (status, body) = app.checkout(app.suspended, app.item);
    assert_eq!((status, body["error"].as_str()), (422, Some("borrower_inactive")));

    let (status, body) = app.checkout(BorrowerId::generate(), app.item);
    assert_eq!((status, body["error"].as_str()), (404, Some("borrower_not_found")));

    let (status, body) = app.call(json!({ "action": "get_loan", "loan_id": ItemId::generate().to_string() }));
    assert_eq!((status, body["error"].as_str()), (404, Some("loan_not_found")));

    let (status, body) = app.call(json!({ "action": "teleport" }));
    assert_eq!((status, body["error"].as_str()), (404, Some("unknown_action")));

    let line = app.app.handle_line("{ not json");
    assert!(line.contains("malformed_request"));
}

#[test]
fn duplicate_pair_and_double_close_are_conflicts() {
    let app = TestApp::spawn();
    let (_, loan) = app.checkout(app.student, app.spare_item);

    let (status, body) = app.checkout(app.student, app.spare_item);
    assert_eq!((status, body["error"].as_str()), (409, Some("duplicate_active_loan")));

    let (status, _) = app.checkout(app.other, app.spare_item);
    assert_eq!(status, 201);

    let close = json!({ "action": "return_loan", "loan_id": loan["id"], "body": { "returnDate": "2099-01-01" } });
    assert_eq!(app.call(close.clone()).0, 200);
    let (status, body) = app.call(close);
    assert_eq!((status, body["error"].as_str()), (409, Some("already_closed")));
    assert_eq!(app.available(app.spare_item), 2);
}

#[test]
fn amend_uses_null_to_clear_and_legacy_status_to_reopen() {
    let app = TestApp::spawn();
    let (_, loan) = app.call(json!({
        "action": "checkout",
        "body": {
            "borrower": app.student.to_string(),
            "item": app.item.to_string(),
            "notes": "front desk",
        },
    }));
    assert_eq!(loan["notes"], "front desk");

    let (status, cleared) = app.call(json!({
        "action": "amend_loan",
        "loan_id": loan["id"],
        "body": { "notes": null },
    }));
    assert_eq!(status, 200);
    assert!(cleared["notes"].is_null());

    let (status, returned) = app.call(json!({
        "action": "update_loan",
        "loan_id": loan["id"],
        "body": { "status": "Returned" },
    }));
    assert_eq!(status, 200);
    assert_eq!(returned["status"], "Closed");
    assert_eq!(app.available(app.item), 1);

    let (status, reopened) = app.call(json!({
        "action": "update_loan",
        "loan_id": loan["id"],
        "body": { "status": "Borrowed" },
    }));
    assert_eq!(status, 200);
    assert_eq!(reopened["status"], "Active");
    assert!(reopened["return_date"].is_null());
    assert_eq!(app.available(app.item), 0);

    let (status, body) = app.call(json!({ "action": "amend_loan", "loan_id": loan["id"], "body": {} }));
    assert_eq!((status, body["error"].as_str()), (400, Some("validation_error")));
}

#[test]
fn list_returns_joined_views_newest_first() {
    let app = TestApp::spawn();
    let (_, first) = app.checkout(app.student, app.spare_item);
    let (_, second) = app.checkout(app.other, app.spare_item);

    let (status, body) = app.call(json!({
        "action": "list_loans",
        "body": { "item": app.spare_item.to_string(), "status": "Borrowed" },
    }));
    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);
    assert_eq!(body["loans"][0]["id"], second["id"]);
    assert_eq!(body["loans"][1]["id"], first["id"]);
    assert_eq!(body["loans"][0]["item_details"]["title"], "Emma");
    assert_eq!(body["loans"][0]["borrower_details"]["full_name"], "Alan");

    let (status, body) = app.call(json!({ "action": "list_loans", "body": { "status": "Lost" } }));
    assert_eq!((status, body["error"].as_str()), (400, Some("validation_error")));
}

#[test]
fn delete_and_sweep() {
    let app = TestApp::spawn();
    let (_, loan) = app.call(json!({
        "action": "checkout",
        "body": {
            "borrower": app.student.to_string(),
            "item": app.item.to_string(),
            "checkout_date": "2024-01-01",
        },
    }));

    let (status, body) = app.call(json!({ "action": "sweep_overdue", "body": { "as_of": "2024-02-01" } }));
    assert_eq!(status, 200);
    assert_eq!(body["marked"][0]["id"], loan["id"]);
    assert_eq!(body["marked"][0]["status"], "Overdue");

    let (status, body) = app.call(json!({ "action": "delete_loan", "loan_id": loan["id"] }));
    assert_eq!(status, 200);
    assert_eq!(body["released_unit"], true);
    assert_eq!(app.available(app.item), 1);

    let (status, _) = app.call(json!({ "action": "delete_loan", "loan_id": loan["id"] }));
    assert_eq!(status, 404);
}

#[test]
fn request_ids_are_echoed() {
    let app = TestApp::spawn();
    let line = app.app.handle_line(&json!({ "request_id": 42, "action": "health" }).to_string());
    let response: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(response["request_id"], 42);
}

#[test]
fn typed_requests_report_success_by_status() {
    let app = TestApp::spawn();
    let request = |value: Value| -> Request { serde_json::from_value(value).unwrap() };

    let created = app.app.handle(request(json!({
        "action": "checkout",
        "body": { "borrower": app.student.to_string(), "item": app.spare_item.to_string() },
    })));
    assert_eq!(created.status, 201);
    assert!(created.is_success());

    let refused = app.app.handle(request(json!({
        "action": "checkout",
        "body": { "borrower": app.suspended.to_string(), "item": app.spare_item.to_string() },
    })));
    assert_eq!(refused.status, 422);
    assert!(!refused.is_success());
}

#[test]
fn future_checkout_closes_with_default_return_date() {
    let app = TestApp::spawn();
    let (status, loan) = app.call(json!({
        "action": "checkout",
        "body": {
            "borrower": app.student.to_string(),
            "item": app.item.to_string(),
            "checkout_date": "2999-01-01",
        },
    }));
    assert_eq!(status, 201);

    let (status, closed) = app.call(json!({ "action": "close_loan", "loan_id": loan["id"] }));
    assert_eq!(status, 200);
    assert_eq!(closed["return_date"], "2999-01-01T00:00:00+00:00");
    assert_eq!(app.available(app.item), 1);
}

#[test]
fn binary_speaks_ndjson_over_stdio() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lendledger-api"))
        .env_remove("LENDLEDGER_POLICY_FILE")
        .env_remove("LENDLEDGER_SEED_FILE")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, "{}", json!({ "request_id": "a", "action": "health" })).unwrap();
        writeln!(stdin).unwrap();
        writeln!(stdin, "{}", json!({ "request_id": "b", "action": "get_loan" })).unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["request_id"], "a");
    assert_eq!(lines[0]["status"], 200);
    assert_eq!(lines[1]["request_id"], "b");
    assert_eq!(lines[1]["status"], 400);
}
