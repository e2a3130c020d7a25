//! Route authorization policies
//!
//! A declarative table mapping route patterns to the permissions a
//! caller must hold. The guard middleware resolves the matched route
//! pattern here before the handler runs.

use std::collections::HashMap;

use axum::http::Method;
use memberdesk_core::Permission;

/// Requirements for a single route
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    /// Reachable without authentication
    pub public: bool,
    /// Permissions the caller must hold, all of them
    pub required: Vec<Permission>,
}

impl RoutePolicy {
    pub fn public() -> Self {
        Self {
            public: true,
            required: Vec::new(),
        }
    }

    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn require(permissions: Vec<Permission>) -> Self {
        Self {
            public: false,
            required: permissions,
        }
    }
}

/// Permission requirements for the whole route tree.
///
/// Exact method-and-pattern entries win over prefix groups; among
/// groups the longest matching prefix wins. Routes absent from the
/// table fall back to requiring authentication, so forgetting an entry
/// can never open an endpoint to anonymous callers.
#[derive(Debug, Default)]
pub struct PolicyTable {
    ops: HashMap<(Method, String), RoutePolicy>,
    groups: Vec<(String, RoutePolicy)>,
}

impl PolicyTable {
    pub fn builder() -> PolicyTableBuilder {
        PolicyTableBuilder {
            table: Self::default(),
        }
    }

    /// Resolve the policy for a matched route pattern
    pub fn resolve(&self, method: &Method, pattern: &str) -> RoutePolicy {
        if let Some(policy) = self.ops.get(&(method.clone(), pattern.to_string())) {
            return policy.clone();
        }

        self.groups
            .iter()
            .filter(|(prefix, _)| prefix_matches(prefix, pattern))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, policy)| policy.clone())
            .unwrap_or_else(RoutePolicy::authenticated)
    }
}

/// Path prefixes only match on segment boundaries, so a group for
/// `/api/news` covers `/api/news/{id}` but not `/api/newsletter`.
fn prefix_matches(prefix: &str, pattern: &str) -> bool {
    match pattern.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub struct PolicyTableBuilder {
    table: PolicyTable,
}

impl PolicyTableBuilder {
    /// Exempt a route from authentication entirely
    pub fn public(mut self, method: Method, pattern: &str) -> Self {
        self.table
            .ops
            .insert((method, pattern.to_string()), RoutePolicy::public());
        self
    }

    /// Require a signed-in caller but no particular permission
    pub fn authenticated(mut self, method: Method, pattern: &str) -> Self {
        self.table
            .ops
            .insert((method, pattern.to_string()), RoutePolicy::authenticated());
        self
    }

    /// Require every listed permission for one route
    pub fn require(mut self, method: Method, pattern: &str, permissions: &[Permission]) -> Self {
        self.table.ops.insert(
            (method, pattern.to_string()),
            RoutePolicy::require(permissions.to_vec()),
        );
        self
    }

    /// Require every listed permission for all routes under a prefix
    pub fn group(mut self, prefix: &str, permissions: &[Permission]) -> Self {
        self.table.groups.push((
            prefix.to_string(),
            RoutePolicy::require(permissions.to_vec()),
        ));
        self
    }

    pub fn build(self) -> PolicyTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PolicyTable {
        PolicyTable::builder()
            .public(Method::GET, "/api/health")
            .public(Method::POST, "/api/memberships")
            .require(
                Method::GET,
                "/api/news/drafts",
                &[Permission::NewsCreate, Permission::NewsUpdate],
            )
            .group("/api/news", &[Permission::NewsCreate])
            .group("/api/admin", &[Permission::UserManage])
            .group("/api/admin/roles", &[Permission::RoleManage])
            .build()
    }

    #[test]
    fn exact_entry_wins_over_group() {
        let policy = table().resolve(&Method::GET, "/api/news/drafts");
        assert_eq!(
            policy.required,
            vec![Permission::NewsCreate, Permission::NewsUpdate]
        );
    }

    #[test]
    fn longest_group_prefix_wins() {
        let policy = table().resolve(&Method::POST, "/api/admin/roles/{name}");
        assert_eq!(policy.required, vec![Permission::RoleManage]);

        let policy = table().resolve(&Method::POST, "/api/admin/users");
        assert_eq!(policy.required, vec![Permission::UserManage]);
    }

    #[test]
    fn group_prefix_respects_segment_boundaries() {
        let table = table();
        assert!(prefix_matches("/api/news", "/api/news"));
        assert!(prefix_matches("/api/news", "/api/news/{id}"));
        assert!(!prefix_matches("/api/news", "/api/newsletter"));

        // An unlisted route that merely shares characters with a group
        // name falls back to the authenticated default.
        let policy = table.resolve(&Method::GET, "/api/newsletter");
        assert!(!policy.public);
        assert!(policy.required.is_empty());
    }

    #[test]
    fn unlisted_routes_require_authentication() {
        let policy = table().resolve(&Method::DELETE, "/api/unknown");
        assert!(!policy.public);
        assert!(policy.required.is_empty());
    }

    #[test]
    fn public_routes_are_method_specific() {
        let table = table();
        assert!(table.resolve(&Method::POST, "/api/memberships").public);
        assert!(!table.resolve(&Method::GET, "/api/memberships").public);
    }
}
