//! Input validation helpers
//!
//! Text length constants and field checks that record into a
//! [`ValidationErrors`] aggregate instead of returning on the first problem.

use crate::error::ValidationErrors;
use uuid::Uuid;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: pond, pool, berkas, fish species
pub const MAX_NAME_LEN: usize = 200;

/// Notes and rejection reasons
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: budidaya code, pricelist limit label, pond type
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// URLs / image and file paths
pub const MAX_URL_LEN: usize = 2048;

/// Addresses
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Field checks ────────────────────────────────────────────────────

/// Required string: non-blank and within the length limit.
pub fn require_text(
    errors: &mut ValidationErrors,
    entity: &str,
    field: &str,
    value: &str,
    max_len: usize,
) {
    if value.trim().is_empty() {
        errors.push(entity, field, "is required");
    } else if value.len() > max_len {
        errors.push(
            entity,
            field,
            format!("is too long ({} chars, max {max_len})", value.len()),
        );
    }
}

/// Optional string: only the length limit applies.
pub fn optional_text(
    errors: &mut ValidationErrors,
    entity: &str,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) {
    if let Some(v) = value
        && v.len() > max_len
    {
        errors.push(
            entity,
            field,
            format!("is too long ({} chars, max {max_len})", v.len()),
        );
    }
}

/// Required id: the nil uuid counts as missing.
pub fn require_id(errors: &mut ValidationErrors, entity: &str, field: &str, value: Uuid) {
    if value.is_nil() {
        errors.push(entity, field, "is required");
    }
}

/// Required non-zero number (pool dimensions).
pub fn require_non_zero(errors: &mut ValidationErrors, entity: &str, field: &str, value: f64) {
    if value == 0.0 || !value.is_finite() {
        errors.push(entity, field, "must not be zero");
    }
}
