//! Unified error system for the e-fish domain
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ValidationErrors`]: Aggregate of every field violation found in an input
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Pond errors
//! - 2xxx: Budidaya errors
//! - 3xxx: Order errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::PondNotActive);
//! assert_eq!(err.code.code(), 1004);
//!
//! let err = AppError::validation("Missing required field")
//!     .with_detail("field", "name");
//! assert!(err.details.is_some());
//! ```

mod category;
mod codes;
mod types;
mod validation;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
pub use validation::{FieldViolation, ValidationErrors};
