//! Permission Catalog
//!
//! Closed set of permission keys checked by the authorization guard.
//! Keys are opaque SCREAMING_SNAKE strings on the wire and in storage;
//! handlers and policies only ever reference the enum variants.

use serde::{Deserialize, Serialize};

/// Specific permissions that can be granted to roles
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Permission {
    /// View membership applications
    MembershipView,
    /// Approve or reject membership applications
    MembershipReview,
    /// Create news articles
    NewsCreate,
    /// Edit existing news articles
    NewsUpdate,
    /// Delete news articles
    NewsDelete,
    /// Publish news articles to the public site
    NewsPublish,
    /// Manage social media embeds
    EmbedManage,
    /// Manage user accounts
    UserManage,
    /// Manage roles and their grants
    RoleManage,
    /// Read the audit log
    AuditView,
}

impl Permission {
    /// Every permission in the catalog, in declaration order.
    pub const ALL: [Permission; 10] = [
        Permission::MembershipView,
        Permission::MembershipReview,
        Permission::NewsCreate,
        Permission::NewsUpdate,
        Permission::NewsDelete,
        Permission::NewsPublish,
        Permission::EmbedManage,
        Permission::UserManage,
        Permission::RoleManage,
        Permission::AuditView,
    ];
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::MembershipView => write!(f, "MEMBERSHIP_VIEW"),
            Permission::MembershipReview => write!(f, "MEMBERSHIP_REVIEW"),
            Permission::NewsCreate => write!(f, "NEWS_CREATE"),
            Permission::NewsUpdate => write!(f, "NEWS_UPDATE"),
            Permission::NewsDelete => write!(f, "NEWS_DELETE"),
            Permission::NewsPublish => write!(f, "NEWS_PUBLISH"),
            Permission::EmbedManage => write!(f, "EMBED_MANAGE"),
            Permission::UserManage => write!(f, "USER_MANAGE"),
            Permission::RoleManage => write!(f, "ROLE_MANAGE"),
            Permission::AuditView => write!(f, "AUDIT_VIEW"),
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MEMBERSHIP_VIEW" => Ok(Permission::MembershipView),
            "MEMBERSHIP_REVIEW" => Ok(Permission::MembershipReview),
            "NEWS_CREATE" => Ok(Permission::NewsCreate),
            "NEWS_UPDATE" => Ok(Permission::NewsUpdate),
            "NEWS_DELETE" => Ok(Permission::NewsDelete),
            "NEWS_PUBLISH" => Ok(Permission::NewsPublish),
            "EMBED_MANAGE" => Ok(Permission::EmbedManage),
            "USER_MANAGE" => Ok(Permission::UserManage),
            "ROLE_MANAGE" => Ok(Permission::RoleManage),
            "AUDIT_VIEW" => Ok(Permission::AuditView),
            _ => Err(format!("Unknown permission: {}", s)),
        }
    }
}
