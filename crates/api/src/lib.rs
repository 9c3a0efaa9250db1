//! Request layer: JSON actions in, JSON responses out.
//!
//! Transport-agnostic. The `lendledger-api` binary drives it over
//! newline-delimited JSON on stdin/stdout.

pub mod app;
