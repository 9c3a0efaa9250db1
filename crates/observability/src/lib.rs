//! Process-wide logging setup shared by the lendledger binaries.

/// Subscriber configuration (format, filter).
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat, LogFormatError};

/// Install the global subscriber configured from the environment.
///
/// Safe to call multiple times; only the first call installs anything.
pub fn init() {
    tracing::init(LogConfig::from_env());
}
