//! Request layer wiring.
//!
//! - `routes/`: one handler per action
//! - `dto.rs`: request DTOs, input validation and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//! - `seed.rs`: catalog/membership preload

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use lendledger_events::InMemoryEventBus;
use lendledger_infra::circulation::{Circulation, LoanEnvelope};
use lendledger_infra::config::CirculationConfig;
use lendledger_infra::store::InMemoryRecordStore;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod seed;

pub use errors::RequestError;
pub use seed::Seed;

pub type AppCirculation = Circulation<Arc<InMemoryRecordStore>, Arc<InMemoryEventBus<LoanEnvelope>>>;

/// One request line.
///
/// `loan_id` plays the role of a path parameter; `body` carries the action's
/// fields (or query for `list_loans`).
#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub request_id: Option<serde_json::Value>,
    pub action: String,
    #[serde(default)]
    pub loan_id: Option<String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<serde_json::Value>,
    pub status: u16,
    pub body: serde_json::Value,
}

impl Response {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            request_id: None,
            status,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct App {
    circulation: AppCirculation,
}

impl App {
    /// Build the engine over a fresh in-memory store, preloaded from `seed`.
    pub fn build(config: CirculationConfig, seed: Option<&Seed>) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryRecordStore::new());
        if let Some(seed) = seed {
            seed.load_into(&store, Utc::now())?;
        }
        let bus: Arc<InMemoryEventBus<LoanEnvelope>> = Arc::new(InMemoryEventBus::new());
        Ok(Self {
            circulation: Circulation::new(store, bus, config),
        })
    }

    pub fn circulation(&self) -> &AppCirculation {
        &self.circulation
    }

    pub fn handle(&self, request: Request) -> Response {
        let request_id = request.request_id.clone();
        let action = request.action.clone();
        let mut response = routes::dispatch(&self.circulation, request);
        tracing::debug!(
            action = %action,
            status = response.status,
            success = response.is_success(),
            "request handled"
        );
        response.request_id = request_id;
        response
    }

    /// Handle one JSON-encoded request and encode the response.
    pub fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(err) => errors::request_error_to_response(RequestError::Malformed(err.to_string())),
        };
        serde_json::to_string(&response).unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to encode response");
            r#"{"status":500,"body":{"error":"encode_error"}}"#.to_string()
        })
    }
}
