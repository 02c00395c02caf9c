//! Permission checks
//!
//! Authorization belongs to the host application. Bricks only ask whether a
//! user holds the permission specs a descriptor lists.

use crate::error::Result;
use brick_types::{Record, RoleId, User};
use std::collections::{HashMap, HashSet};

/// Host-provided permission oracle
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, user: &User, permission: &str) -> Result<bool>;

    /// Whether the user may view a record.
    fn can_view(&self, user: &User, record: &Record) -> Result<bool> {
        let _ = (user, record);
        Ok(true)
    }
}

/// Grants everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllPermissions;

impl PermissionChecker for AllowAllPermissions {
    fn has_permission(&self, _user: &User, _permission: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Static role-to-permission grants. Superusers hold every permission;
/// users without a role get the default grants.
#[derive(Debug, Default, Clone)]
pub struct RolePermissions {
    grants: HashMap<RoleId, HashSet<String>>,
    default_grants: HashSet<String>,
}

impl RolePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: impl Into<RoleId>, permission: impl Into<String>) -> Self {
        self.grants
            .entry(role.into())
            .or_default()
            .insert(permission.into());
        self
    }

    pub fn grant_default(mut self, permission: impl Into<String>) -> Self {
        self.default_grants.insert(permission.into());
        self
    }
}

impl PermissionChecker for RolePermissions {
    fn has_permission(&self, user: &User, permission: &str) -> Result<bool> {
        if user.is_superuser {
            return Ok(true);
        }

        let granted = match &user.role {
            Some(role) => self
                .grants
                .get(role)
                .is_some_and(|perms| perms.contains(permission)),
            None => self.default_grants.contains(permission),
        };
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_grants() {
        let perms = RolePermissions::new()
            .grant("sales", "billing")
            .grant_default("persons");

        let sales = User::new("u1").with_role("sales");
        let nobody = User::new("u2");
        let admin = User::new("u3").superuser();

        assert!(perms.has_permission(&sales, "billing").unwrap());
        assert!(!perms.has_permission(&sales, "persons").unwrap());
        assert!(perms.has_permission(&nobody, "persons").unwrap());
        assert!(!perms.has_permission(&nobody, "billing").unwrap());
        assert!(perms.has_permission(&admin, "anything").unwrap());
    }
}
