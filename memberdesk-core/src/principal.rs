//! Request Principal
//!
//! The authenticated caller as seen by the authorization guard: identity
//! fields plus the flattened permission set resolved from the caller's
//! roles at request time. Resolving per request means a revoked role
//! takes effect on the next call, not at the next login.

use crate::permissions::Permission;
use crate::roles::{Role, SUPER_ADMIN_ROLE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Authenticated caller with flattened permission grants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    /// Resolved role names
    pub roles: HashSet<String>,
    /// Union of the grants of every resolved role
    pub permissions: HashSet<Permission>,
}

impl Principal {
    /// Build a principal by flattening resolved role records
    pub fn from_roles(
        id: impl Into<String>,
        username: impl Into<String>,
        display_name: Option<String>,
        roles: &[Role],
    ) -> Self {
        let mut names = HashSet::new();
        let mut permissions = HashSet::new();
        for role in roles {
            names.insert(role.name.clone());
            permissions.extend(role.permissions.iter().cloned());
        }
        Self {
            id: id.into(),
            username: username.into(),
            display_name,
            roles: names,
            permissions,
        }
    }

    /// Whether this principal carries the bypass role
    pub fn is_super_admin(&self) -> bool {
        self.roles.contains(SUPER_ADMIN_ROLE)
    }

    /// Check a single permission, honoring the super admin bypass
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.is_super_admin() || self.permissions.contains(permission)
    }
}

/// Decide whether a caller may perform an operation requiring `required`.
///
/// An empty requirement allows any caller. A missing principal denies any
/// non-empty requirement. Otherwise every required permission must be
/// granted; a single missing key denies.
pub fn evaluate(required: &[Permission], principal: Option<&Principal>) -> bool {
    if required.is_empty() {
        return true;
    }
    match principal {
        Some(principal) => required.iter().all(|p| principal.has_permission(p)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal_with(permissions: &[Permission]) -> Principal {
        Principal::from_roles(
            "u-1",
            "tester",
            None,
            &[Role::new("TEST", permissions.iter().cloned().collect())],
        )
    }

    #[test]
    fn empty_requirement_allows_anyone() {
        assert!(evaluate(&[], None));
        assert!(evaluate(&[], Some(&principal_with(&[]))));
    }

    #[test]
    fn missing_principal_denies_any_requirement() {
        assert!(!evaluate(&[Permission::NewsCreate], None));
    }

    #[test]
    fn super_admin_bypasses_every_check() {
        let root = Principal::from_roles("u-0", "root", None, &[Role::super_admin()]);
        assert!(root.permissions.is_empty());
        assert!(evaluate(&Permission::ALL, Some(&root)));
    }

    #[test]
    fn all_required_permissions_must_be_granted() {
        let editor = principal_with(&[Permission::NewsCreate]);
        assert!(evaluate(&[Permission::NewsCreate], Some(&editor)));
        assert!(!evaluate(
            &[Permission::NewsCreate, Permission::NewsPublish],
            Some(&editor)
        ));
    }

    #[test]
    fn single_missing_key_denies() {
        let almost: Vec<Permission> = Permission::ALL
            .into_iter()
            .filter(|p| *p != Permission::AuditView)
            .collect();
        let principal = principal_with(&almost);
        assert!(!evaluate(&[Permission::AuditView], Some(&principal)));
        assert!(evaluate(&almost, Some(&principal)));
    }

    #[test]
    fn flattening_unions_role_grants() {
        let principal = Principal::from_roles(
            "u-2",
            "mixed",
            Some("Mixed".to_string()),
            &[Role::editor(), Role::reviewer()],
        );
        assert!(principal.roles.contains("EDITOR"));
        assert!(principal.roles.contains("REVIEWER"));
        assert!(principal.has_permission(&Permission::NewsCreate));
        assert!(principal.has_permission(&Permission::MembershipReview));
        assert!(!principal.has_permission(&Permission::UserManage));
    }
}
