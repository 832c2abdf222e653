// MedDesk
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Permission resolution
//!
//! Pure functions over a [`UserProfile`]. Nothing here performs I/O or
//! returns an error: unknown or malformed input degrades to "no permission".
//!
//! ```text
//! effective = role_permissions(role) ∪ department_permissions(department) ∪ custom
//!             (empty unless status == active)
//! ```

use crate::rbac::catalog::{Permission, catalog_permissions};
use crate::rbac::roles::{Role, department_permissions, role_permissions};
use crate::users::UserProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Parse a serialized custom permission list.
///
/// Invalid JSON yields an empty set; entries that are not catalog
/// permissions are skipped.
pub fn parse_custom_permissions(raw: Option<&str>) -> BTreeSet<Permission> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return BTreeSet::new();
    };

    let entries: Vec<String> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed custom permission list");
            return BTreeSet::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| match entry.parse::<Permission>() {
            Ok(permission) => Some(permission),
            Err(_) => {
                debug!(identifier = %entry, "Skipping unknown custom permission");
                None
            }
        })
        .collect()
}

/// Serialize custom permissions as a sorted JSON array of identifiers
pub fn encode_custom_permissions<'a>(permissions: impl IntoIterator<Item = &'a Permission>) -> String {
    let keys: BTreeSet<String> = permissions.into_iter().map(Permission::key).collect();
    let keys: Vec<String> = keys.into_iter().collect();
    serde_json::Value::from(keys).to_string()
}

/// All permissions the user currently holds
pub fn effective_permissions(user: &UserProfile) -> BTreeSet<Permission> {
    if !user.is_active() {
        return BTreeSet::new();
    }

    let mut permissions = role_permissions(user.role);
    permissions.extend(department_permissions(user.department));
    permissions.extend(parse_custom_permissions(user.permissions.as_deref()));
    permissions
}

pub fn has_permission(user: &UserProfile, permission: Permission) -> bool {
    effective_permissions(user).contains(&permission)
}

/// True when every permission is held; vacuously true for an empty list
pub fn has_all_permissions(user: &UserProfile, permissions: &[Permission]) -> bool {
    let effective = effective_permissions(user);
    permissions.iter().all(|p| effective.contains(p))
}

/// True when at least one permission is held; false for an empty list
pub fn has_any_permission(user: &UserProfile, permissions: &[Permission]) -> bool {
    let effective = effective_permissions(user);
    permissions.iter().any(|p| effective.contains(p))
}

/// Requested permissions the user does not hold, in request order
pub fn missing_permissions(user: &UserProfile, permissions: &[Permission]) -> Vec<Permission> {
    let effective = effective_permissions(user);
    let mut missing = Vec::new();
    for permission in permissions {
        if !effective.contains(permission) && !missing.contains(permission) {
            missing.push(*permission);
        }
    }
    missing
}

/// Minimum role check under the fixed role ordering
pub fn has_role_level(user_role: Role, min_role: Role) -> bool {
    user_role.level() >= min_role.level()
}

/// Minimum role check on raw identifiers.
///
/// An unknown user role ranks below every known level, so it never passes.
/// An unknown *minimum* role is also a failure rather than "below everything":
/// a misspelled requirement such as `"admn"` must not open the gate to all
/// known users. Parse into [`Role`] first to reject bad requirements loudly.
pub fn has_role_level_named(user_role: &str, min_role: &str) -> bool {
    match (user_role.parse::<Role>(), min_role.parse::<Role>()) {
        (Ok(user_role), Ok(min_role)) => has_role_level(user_role, min_role),
        _ => {
            debug!(user_role = %user_role, min_role = %min_role, "Unknown role identifier in level check");
            false
        }
    }
}

/// Where a permission comes from for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub permission: Permission,
    pub from_role: bool,
    pub from_department: bool,
    pub custom: bool,
    /// Held right now (granted by some source and the account is active)
    pub effective: bool,
}

impl PermissionGrant {
    pub fn is_granted(&self) -> bool {
        self.from_role || self.from_department || self.custom
    }
}

/// Source breakdown for every catalog permission
pub fn explain(user: &UserProfile) -> Vec<PermissionGrant> {
    let role = role_permissions(user.role);
    let department = department_permissions(user.department);
    let custom = parse_custom_permissions(user.permissions.as_deref());

    catalog_permissions()
        .map(|permission| {
            let mut grant = PermissionGrant {
                permission,
                from_role: role.contains(&permission),
                from_department: department.contains(&permission),
                custom: custom.contains(&permission),
                effective: false,
            };
            grant.effective = user.is_active() && grant.is_granted();
            grant
        })
        .collect()
}
