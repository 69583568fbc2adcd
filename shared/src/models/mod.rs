//! Data models
//!
//! Entities, their status enums and the input payloads of every command.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `Uuid` (v4); the nil uuid in an input means "not supplied".

pub mod audit;
pub mod budidaya;
pub mod order;
pub mod pond;

// Re-exports
pub use audit::*;
pub use budidaya::*;
pub use order::*;
pub use pond::*;
