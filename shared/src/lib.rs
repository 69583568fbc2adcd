//! Shared types for the e-fish domain
//!
//! Entity models, input payloads with their validation, the identity context
//! threaded through every command, and the unified error codes used by the
//! domain crate and its callers.

pub mod error;
pub mod identity;
pub mod models;
pub mod request;
pub mod util;
pub mod validation;

// Re-exports
pub use identity::Identity;
pub use request::{PaginatedResponse, PaginationQuery};
pub use serde::{Deserialize, Serialize};
