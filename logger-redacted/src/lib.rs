//! Tracing setup with automatic redaction of member contact details
//!
//! Membership records carry emails and phone numbers for every principal and
//! dependant. Anything that may end up in a log line (payload summaries,
//! downstream error bodies, member updates) goes through [`redact`] first.
//!
//! # Detected Data Types
//!
//! - **Email Addresses**: jane@example.com → `EMAIL[hash]` or `j***@e***`
//! - **Phone Numbers**: +254 712 345 678 → `PHONE[hash]` or `***678`
//! - **Custom Patterns**: configurable regex replacements
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, redacted_info, LoggerConfig};
//!
//! init_tracing(&LoggerConfig::default()).ok();
//! redacted_info!("Member contact updated to {}", "jane@example.com");
//! ```

pub mod config;
pub mod macros;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static ACTIVE_REDACTOR: OnceLock<PiiRedactor> = OnceLock::new();

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Install the global subscriber and the process-wide redactor
///
/// `RUST_LOG` wins over `config.log_level` when set.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| LoggerError::Filter(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().with_target(false).with_ansi(false).json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init(),
    };
    installed.map_err(|e| LoggerError::Init(e.to_string()))?;

    install_redactor(PiiRedactor::new(RedactionConfig::from(config)));
    Ok(())
}

/// Set the redactor used by [`redact`]. Only the first call takes effect.
pub fn install_redactor(redactor: PiiRedactor) -> bool {
    ACTIVE_REDACTOR.set(redactor).is_ok()
}

/// Redact text with the installed redactor, or the default one
pub fn redact(text: &str) -> String {
    ACTIVE_REDACTOR.get_or_init(PiiRedactor::default).redact(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_redact_hides_email() {
        let redacted = redact("notify jane@example.com");
        assert!(!redacted.contains("jane@example.com"));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggerConfig {
            log_level: "membership=loud".to_string(),
            ..LoggerConfig::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(matches!(init_tracing(&config), Err(LoggerError::Filter(_))));
        }
    }
}
