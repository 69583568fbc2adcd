//! Aggregated field validation errors
//!
//! Input validation never stops at the first problem: every violation is
//! collected so the caller can fix the whole payload in one round trip.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One field-level violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Entity the field belongs to (`pond`, `pool`, `berkas`, ...)
    pub entity: String,
    /// Field path, nested entries are indexed (`pools[1].name`)
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.entity, self.field, self.reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.violations.push(FieldViolation {
            entity: entity.into(),
            field: field.into(),
            reason: reason.into(),
        });
    }

    /// Record `reason` unless `ok` holds
    pub fn check(
        &mut self,
        ok: bool,
        entity: &str,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) {
        if !ok {
            self.push(entity, field, reason);
        }
    }

    /// Merge the violations of a nested item, prefixing its field paths
    pub fn merge_nested(&mut self, prefix: &str, nested: ValidationErrors) {
        for mut v in nested.violations {
            v.field = format!("{prefix}.{}", v.field);
            self.violations.push(v);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.violations.iter()
    }

    /// Whether any violation names exactly this field path
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, v) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = FieldViolation;
    type IntoIter = std::vec::IntoIter<FieldViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_every_violation() {
        let mut errors = ValidationErrors::new();
        errors.check(false, "pond", "name", "is required");
        errors.check(true, "pond", "type", "is required");
        errors.check(false, "pond", "city_id", "is required");

        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("name"));
        assert!(errors.has_field("city_id"));
        assert!(!errors.has_field("type"));
    }

    #[test]
    fn test_merge_nested_prefixes_fields() {
        let mut pool = ValidationErrors::new();
        pool.push("pool", "wide", "must not be zero");

        let mut errors = ValidationErrors::new();
        errors.merge_nested("pools[2]", pool);
        assert!(errors.has_field("pools[2].wide"));
    }

    #[test]
    fn test_display_and_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.push("pond", "name", "is required");
        errors.push("pond", "pools", "at least one pool is required");
        assert_eq!(
            errors.to_string(),
            "validation failed: pond.name: is required; pond.pools: at least one pool is required"
        );
        assert!(errors.into_result().is_err());
    }
}
