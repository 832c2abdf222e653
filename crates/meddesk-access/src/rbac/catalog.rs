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

//! Permission catalog
//!
//! The closed set of resources and actions, and the `resource:action`
//! permissions the console recognises. A [`Permission`] can only be built from
//! a pair listed in the catalog, so every permission in circulation is known.

use crate::error::{AccessError, AccessResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Resource a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Users,
    Devices,
    Maintenance,
    Alerts,
    Reports,
    Analytics,
    Compliance,
    Roles,
    Files,
    System,
}

impl Resource {
    /// All resources in catalog order
    pub const ALL: [Resource; 10] = [
        Resource::Users,
        Resource::Devices,
        Resource::Maintenance,
        Resource::Alerts,
        Resource::Reports,
        Resource::Analytics,
        Resource::Compliance,
        Resource::Roles,
        Resource::Files,
        Resource::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Devices => "devices",
            Resource::Maintenance => "maintenance",
            Resource::Alerts => "alerts",
            Resource::Reports => "reports",
            Resource::Analytics => "analytics",
            Resource::Compliance => "compliance",
            Resource::Roles => "roles",
            Resource::Files => "files",
            Resource::System => "system",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL.into_iter().find(|r| r.as_str() == s).ok_or_else(|| AccessError::UnknownPermission { identifier: s.to_string() })
    }
}

/// Operation performed on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Export,
    Approve,
    Assign,
    Configure,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Export,
        Action::Approve,
        Action::Assign,
        Action::Configure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Export => "export",
            Action::Approve => "approve",
            Action::Assign => "assign",
            Action::Configure => "configure",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL.into_iter().find(|a| a.as_str() == s).ok_or_else(|| AccessError::UnknownPermission { identifier: s.to_string() })
    }
}

/// A capability identifier: one action on one resource.
///
/// Serialized as `resource:action`. Only catalog pairs can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission {
    resource: Resource,
    action: Action,
}

impl Permission {
    /// Build a permission, rejecting pairs the catalog does not declare
    pub fn new(resource: Resource, action: Action) -> AccessResult<Self> {
        let permission = Self { resource, action };
        if entry(permission).is_some() {
            Ok(permission)
        } else {
            Err(AccessError::UnknownPermission {
                identifier: permission.key(),
            })
        }
    }

    /// Unchecked constructor for the static tables in this crate
    pub(crate) const fn of(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Get the permission key (`resource:action`)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for Permission {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || AccessError::UnknownPermission { identifier: s.to_string() };

        let (resource, action) = s.split_once(':').ok_or_else(unknown)?;
        let resource = resource.parse::<Resource>().map_err(|_| unknown())?;
        let action = action.parse::<Action>().map_err(|_| unknown())?;

        Permission::new(resource, action).map_err(|_| unknown())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

use Action::*;
use Resource::*;

/// Catalog entries: every valid permission and its label, grouped by resource
const CATALOG: &[(Resource, &[(Action, &str)])] = &[
    (
        Users,
        &[
            (Create, "Create user accounts"),
            (Read, "View user accounts"),
            (Update, "Edit user accounts"),
            (Delete, "Delete user accounts"),
            (Export, "Export user data"),
        ],
    ),
    (
        Devices,
        &[
            (Create, "Register medical devices"),
            (Read, "View medical devices"),
            (Update, "Edit device records"),
            (Delete, "Decommission devices"),
            (Configure, "Configure device settings"),
        ],
    ),
    (
        Maintenance,
        &[
            (Create, "Schedule maintenance"),
            (Read, "View maintenance schedules"),
            (Update, "Update maintenance records"),
            (Delete, "Cancel maintenance"),
            (Approve, "Approve maintenance work"),
            (Assign, "Assign maintenance technicians"),
        ],
    ),
    (Alerts, &[(Read, "View device alerts"), (Update, "Acknowledge alerts"), (Delete, "Dismiss alerts")]),
    (
        Reports,
        &[
            (Create, "Create reports"),
            (Read, "View reports"),
            (Update, "Edit reports"),
            (Delete, "Delete reports"),
            (Export, "Export reports"),
        ],
    ),
    (Analytics, &[(Read, "View analytics dashboards"), (Export, "Export analytics data")]),
    (Compliance, &[(Read, "View compliance records"), (Update, "Update compliance records"), (Export, "Export compliance audits")]),
    (Roles, &[(Read, "View role assignments"), (Update, "Edit role definitions"), (Assign, "Assign roles to users")]),
    (Files, &[(Create, "Upload files for analysis"), (Read, "View uploaded files"), (Delete, "Delete uploaded files")]),
    (System, &[(Read, "View system settings"), (Configure, "Configure system settings")]),
];

fn entry(permission: Permission) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|(resource, _)| *resource == permission.resource)
        .and_then(|(_, actions)| actions.iter().find(|(action, _)| *action == permission.action))
        .map(|(_, description)| *description)
}

/// Human-readable label for a permission, falling back to its identifier
pub fn describe(permission: Permission) -> String {
    entry(permission).map(str::to_string).unwrap_or_else(|| permission.key())
}

/// Describe a raw identifier; unknown identifiers are returned unchanged
pub fn describe_identifier(identifier: &str) -> String {
    identifier.parse::<Permission>().map(describe).unwrap_or_else(|_| identifier.to_string())
}

/// Label used in denial reasons: description plus identifier
pub fn label(permission: &Permission) -> String {
    format!("{} ({})", describe(*permission), permission)
}

/// Every catalog permission, grouped by resource in declaration order
pub fn all_permissions() -> BTreeMap<Resource, Vec<Permission>> {
    CATALOG
        .iter()
        .map(|(resource, actions)| (*resource, actions.iter().map(|(action, _)| Permission::of(*resource, *action)).collect()))
        .collect()
}

/// Flat iterator over every catalog permission
pub fn catalog_permissions() -> impl Iterator<Item = Permission> {
    CATALOG.iter().flat_map(|(resource, actions)| actions.iter().map(move |(action, _)| Permission::of(*resource, *action)))
}
