//! Common error handling utilities for the membership engine
//!
//! Every membership operation reports its outcome through one envelope,
//! [`ServiceResult`], so that the HTTP layer and any other caller can treat
//! success and failure uniformly.
//!
//! # Key Features
//!
//! - **Result Envelope**: `success`, `msg`, `data` and a stable error `code`
//! - **Error Kinds**: validation, not found, conflict, downstream, database, configuration
//! - **Error Codes**: structured codes for API responses (see [`codes`])
//! - **Observability**: failures are logged through `tracing` with kind and code fields
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, ErrorKind, ServiceResult};
//!
//! let ok = ServiceResult::success_with_msg(42, "Payer created");
//! assert!(ok.is_success());
//!
//! let failed: ServiceResult<()> = ServiceResult::failure(
//!     ErrorKind::Validation,
//!     codes::validation::INVALID_INPUT,
//!     "Category name cannot be blank",
//! );
//! assert_eq!(failed.code.as_deref(), Some("VALIDATION_1001"));
//! ```

pub mod codes;
pub mod types;

pub use types::*;
