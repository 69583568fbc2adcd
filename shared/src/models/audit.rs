//! Audit envelope embedded by every entity

use crate::identity::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Created / updated / deleted markers.
///
/// Each entity owns its own copy (flattened into the row). A set
/// `deleted_at` is the soft-delete marker; rows are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

impl Audit {
    pub fn created(identity: &Identity, at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            created_by: identity.user_id(),
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub fn touch(&mut self, identity: &Identity, at: DateTime<Utc>) {
        self.updated_at = Some(at);
        self.updated_by = identity.user_id();
    }

    /// Set the delete marker. Also counts as an update.
    pub fn soft_delete(&mut self, identity: &Identity, at: DateTime<Utc>) {
        self.touch(identity, at);
        self.deleted_at = Some(at);
        self.deleted_by = identity.user_id();
    }

    /// Clear the delete marker. Also counts as an update.
    pub fn restore(&mut self, identity: &Identity, at: DateTime<Utc>) {
        self.touch(identity, at);
        self.deleted_at = None;
        self.deleted_by = None;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::now;

    #[test]
    fn test_created_by_identity() {
        let user = Uuid::new_v4();
        let audit = Audit::created(&Identity::user(user), now());
        assert_eq!(audit.created_by, Some(user));
        assert!(audit.updated_at.is_none());
        assert!(!audit.is_deleted());
    }

    #[test]
    fn test_anonymous_leaves_by_unset() {
        let mut audit = Audit::created(&Identity::anonymous(), now());
        audit.soft_delete(&Identity::anonymous(), now());
        assert!(audit.created_by.is_none());
        assert!(audit.deleted_by.is_none());
        assert!(audit.is_deleted());
        assert_eq!(audit.updated_at, audit.deleted_at);
    }

    #[test]
    fn test_restore_clears_delete_marker() {
        let user = Uuid::new_v4();
        let mut audit = Audit::created(&Identity::user(user), now());
        audit.soft_delete(&Identity::user(user), now());
        assert!(audit.is_deleted());

        let later = now() + chrono::Duration::seconds(5);
        audit.restore(&Identity::user(user), later);
        assert!(!audit.is_deleted());
        assert!(audit.deleted_by.is_none());
        assert_eq!(audit.updated_at, Some(later));
        assert_eq!(audit.updated_by, Some(user));
    }
}
