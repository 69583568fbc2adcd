//! Identity context
//!
//! The acting user and their roles, passed explicitly into every command.
//! Only used to stamp audit fields; authorization happens upstream.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Acting user, `None` for anonymous/system calls
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

impl Identity {
    /// Identity with no acting user. Audit `*_by` fields stay unset.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: if user_id.is_nil() { None } else { Some(user_id) },
            role_ids: Vec::new(),
        }
    }

    pub fn with_roles(mut self, role_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.role_ids = role_ids.into_iter().filter(|id| !id.is_nil()).collect();
        self
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn role_ids(&self) -> &[Uuid] {
        &self.role_ids
    }

    pub fn has_role(&self, role_id: Uuid) -> bool {
        self.role_ids.contains(&role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_user_is_anonymous() {
        assert_eq!(Identity::user(Uuid::nil()), Identity::anonymous());
    }

    #[test]
    fn test_roles_drop_nil() {
        let role = Uuid::new_v4();
        let identity = Identity::user(Uuid::new_v4()).with_roles([role, Uuid::nil()]);
        assert_eq!(identity.role_ids(), &[role]);
        assert!(identity.has_role(role));
    }
}
