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

//! Role and department definitions
//!
//! Roles form a total order (`viewer < technician < manager < admin`) and
//! each role inherits everything granted to the roles below it. Departments
//! grant an additive set independent of role.

use crate::error::AccessError;
use crate::rbac::catalog::{Action, Permission, Resource, catalog_permissions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Console role, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access to device and maintenance data
    Viewer,
    /// Field technician: maintains devices and files reports
    Technician,
    /// Department manager: approves work and manages staff
    Manager,
    /// Full access
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Technician, Role::Manager, Role::Admin];

    /// Position in the role ordering (viewer = 1)
    pub fn level(&self) -> u8 {
        match self {
            Role::Viewer => 1,
            Role::Technician => 2,
            Role::Manager => 3,
            Role::Admin => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Technician => "technician",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Permissions added by this role on top of the roles below it
    fn grants(&self) -> &'static [Permission] {
        match self {
            Role::Viewer => VIEWER_GRANTS,
            Role::Technician => TECHNICIAN_GRANTS,
            Role::Manager => MANAGER_GRANTS,
            Role::Admin => &[],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL.into_iter().find(|r| r.as_str() == s).ok_or_else(|| AccessError::UnknownRole { identifier: s.to_string() })
    }
}

/// Organizational unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Ophthalmology,
    Biomedical,
    It,
    Administration,
}

impl Department {
    pub const ALL: [Department; 4] = [Department::Ophthalmology, Department::Biomedical, Department::It, Department::Administration];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Ophthalmology => "ophthalmology",
            Department::Biomedical => "biomedical",
            Department::It => "it",
            Department::Administration => "administration",
        }
    }

    fn grants(&self) -> &'static [Permission] {
        match self {
            Department::Ophthalmology => OPHTHALMOLOGY_GRANTS,
            Department::Biomedical => BIOMEDICAL_GRANTS,
            Department::It => IT_GRANTS,
            Department::Administration => ADMINISTRATION_GRANTS,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| AccessError::UnknownDepartment { identifier: s.to_string() })
    }
}

const fn p(resource: Resource, action: Action) -> Permission {
    Permission::of(resource, action)
}

const VIEWER_GRANTS: &[Permission] = &[
    p(Resource::Users, Action::Read),
    p(Resource::Devices, Action::Read),
    p(Resource::Maintenance, Action::Read),
    p(Resource::Alerts, Action::Read),
    p(Resource::Reports, Action::Read),
    p(Resource::Analytics, Action::Read),
    p(Resource::Compliance, Action::Read),
];

const TECHNICIAN_GRANTS: &[Permission] = &[
    p(Resource::Devices, Action::Update),
    p(Resource::Maintenance, Action::Create),
    p(Resource::Maintenance, Action::Update),
    p(Resource::Alerts, Action::Update),
    p(Resource::Reports, Action::Create),
    p(Resource::Files, Action::Create),
    p(Resource::Files, Action::Read),
];

const MANAGER_GRANTS: &[Permission] = &[
    p(Resource::Users, Action::Update),
    p(Resource::Users, Action::Export),
    p(Resource::Devices, Action::Create),
    p(Resource::Devices, Action::Configure),
    p(Resource::Maintenance, Action::Approve),
    p(Resource::Maintenance, Action::Assign),
    p(Resource::Alerts, Action::Delete),
    p(Resource::Reports, Action::Update),
    p(Resource::Reports, Action::Export),
    p(Resource::Analytics, Action::Export),
    p(Resource::Compliance, Action::Update),
    p(Resource::Compliance, Action::Export),
    p(Resource::Roles, Action::Read),
    p(Resource::Files, Action::Delete),
];

const OPHTHALMOLOGY_GRANTS: &[Permission] = &[p(Resource::Devices, Action::Read), p(Resource::Reports, Action::Create)];

const BIOMEDICAL_GRANTS: &[Permission] = &[
    p(Resource::Devices, Action::Update),
    p(Resource::Devices, Action::Configure),
    p(Resource::Maintenance, Action::Create),
    p(Resource::Maintenance, Action::Update),
];

const IT_GRANTS: &[Permission] = &[
    p(Resource::System, Action::Read),
    p(Resource::System, Action::Configure),
    p(Resource::Users, Action::Read),
    p(Resource::Files, Action::Read),
];

const ADMINISTRATION_GRANTS: &[Permission] = &[
    p(Resource::Users, Action::Read),
    p(Resource::Reports, Action::Read),
    p(Resource::Reports, Action::Export),
    p(Resource::Compliance, Action::Read),
];

/// Permissions mapped from a role, including everything inherited from lower roles
pub fn role_permissions(role: Role) -> BTreeSet<Permission> {
    if role == Role::Admin {
        return catalog_permissions().collect();
    }

    Role::ALL.iter().filter(|r| **r <= role).flat_map(|r| r.grants().iter().copied()).collect()
}

/// Permissions granted by membership in a department
pub fn department_permissions(department: Department) -> BTreeSet<Permission> {
    department.grants().iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(key: &str) -> Permission {
        key.parse().unwrap()
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Viewer < Role::Technician);
        assert!(Role::Technician < Role::Manager);
        assert!(Role::Manager < Role::Admin);
        assert!(Role::ALL.windows(2).all(|w| w[0].level() < w[1].level()));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!("it".parse::<Department>().unwrap(), Department::It);
        assert!("radiology".parse::<Department>().is_err());
    }

    #[test]
    fn test_roles_inherit_lower_grants() {
        for pair in Role::ALL.windows(2) {
            let lower = role_permissions(pair[0]);
            let higher = role_permissions(pair[1]);
            assert!(lower.is_subset(&higher), "{} should include {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_admin_holds_entire_catalog() {
        assert_eq!(role_permissions(Role::Admin).len(), catalog_permissions().count());
    }

    #[test]
    fn test_viewer_cannot_configure_system() {
        let viewer = role_permissions(Role::Viewer);
        assert!(viewer.contains(&perm("users:read")));
        assert!(!viewer.contains(&perm("users:create")));
        assert!(!viewer.contains(&perm("system:configure")));
    }

    #[test]
    fn test_department_grants() {
        assert!(department_permissions(Department::It).contains(&perm("system:configure")));
        assert!(department_permissions(Department::Biomedical).contains(&perm("devices:configure")));
        assert!(!department_permissions(Department::Administration).contains(&perm("system:configure")));
    }

    #[test]
    fn test_static_tables_only_reference_catalog_entries() {
        let tables = [VIEWER_GRANTS, TECHNICIAN_GRANTS, MANAGER_GRANTS, OPHTHALMOLOGY_GRANTS, BIOMEDICAL_GRANTS, IT_GRANTS, ADMINISTRATION_GRANTS];

        for permission in tables.iter().flat_map(|t| t.iter()) {
            assert!(Permission::new(permission.resource(), permission.action()).is_ok(), "{permission} is not in the catalog");
        }
    }
}
