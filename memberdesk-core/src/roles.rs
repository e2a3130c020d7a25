//! Role Records
//!
//! A role is a named bundle of permission grants. Users reference roles
//! by name; the effective permission set of a principal is the union of
//! its role grants.

use crate::permissions::Permission;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Distinguished role name that bypasses permission checks entirely.
pub const SUPER_ADMIN_ROLE: &str = "SUPER_ADMIN";

/// Named permission bundle assignable to users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Role {
    pub name: String,
    pub permissions: HashSet<Permission>,
}

impl Role {
    /// Create a role with an explicit permission set
    pub fn new(name: impl Into<String>, permissions: HashSet<Permission>) -> Self {
        Self {
            name: name.into(),
            permissions,
        }
    }

    /// The bypass role. Its stored grants are irrelevant; the evaluator
    /// allows on the role name alone.
    pub fn super_admin() -> Self {
        Self::new(SUPER_ADMIN_ROLE, HashSet::new())
    }

    /// Full catalog grant without the bypass semantics
    pub fn admin() -> Self {
        Self::new("ADMIN", Permission::ALL.into_iter().collect())
    }

    /// News and social embed management
    pub fn editor() -> Self {
        Self::new(
            "EDITOR",
            [
                Permission::NewsCreate,
                Permission::NewsUpdate,
                Permission::NewsDelete,
                Permission::NewsPublish,
                Permission::EmbedManage,
            ]
            .into_iter()
            .collect(),
        )
    }

    /// Membership application review
    pub fn reviewer() -> Self {
        Self::new(
            "REVIEWER",
            [Permission::MembershipView, Permission::MembershipReview]
                .into_iter()
                .collect(),
        )
    }
}

/// Roles seeded into every fresh installation
pub fn builtin_roles() -> Vec<Role> {
    vec![
        Role::super_admin(),
        Role::admin(),
        Role::editor(),
        Role::reviewer(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_every_catalog_permission() {
        let admin = Role::admin();
        for permission in Permission::ALL {
            assert!(admin.permissions.contains(&permission));
        }
    }

    #[test]
    fn editor_cannot_review_memberships() {
        let editor = Role::editor();
        assert!(editor.permissions.contains(&Permission::NewsPublish));
        assert!(!editor.permissions.contains(&Permission::MembershipReview));
    }

    #[test]
    fn builtin_names_are_stable() {
        let names: Vec<String> = builtin_roles().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["SUPER_ADMIN", "ADMIN", "EDITOR", "REVIEWER"]);
    }
}
