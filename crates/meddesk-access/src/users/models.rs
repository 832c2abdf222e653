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

//! User directory data models

use crate::config::Config;
use crate::error::AccessError;
use crate::rbac::roles::{Department, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// User profile as persisted in the users table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Identity assigned by the authentication provider
    pub id: String,

    /// User's email address
    pub email: String,

    /// First name
    #[serde(default)]
    pub first_name: String,

    /// Last name
    #[serde(default)]
    pub last_name: String,

    /// Console role
    pub role: Role,

    /// Organizational unit
    pub department: Department,

    /// Current account status
    pub status: UserStatus,

    /// Contact phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Profile picture location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Free-form biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Hire date as stored (ISO 8601 date)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<String>,

    /// Professional license number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,

    /// Last login timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,

    /// Account creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// Custom permission grants, stored as a JSON array of `resource:action` strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,

    /// Columns this crate does not model (row keys such as `_id`), kept so
    /// that writing a profile back never drops them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Create an active profile with no custom permissions
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role, department: Department) -> Self {
        let now = Utc::now();

        Self {
            id: id.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            department,
            status: UserStatus::Active,
            phone: None,
            avatar_url: None,
            bio: None,
            hire_date: None,
            license_number: None,
            last_login: None,
            created_at: now,
            updated_at: now,
            permissions: None,
            extra: Map::new(),
        }
    }

    /// Profile created on first login, using the configured defaults.
    ///
    /// The first name falls back to the local part of the email address.
    pub fn provisioned(id: impl Into<String>, email: &str, name: Option<&str>, config: &Config) -> Self {
        let first_name = name.filter(|n| !n.trim().is_empty()).map(str::to_string).unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());

        let mut profile = Self::new(id, email, config.default_role, config.default_department);
        profile.first_name = first_name;
        profile.permissions = Some("[]".to_string());
        profile.last_login = Some(profile.created_at);
        profile
    }

    /// Set the display name
    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Set the account status
    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the serialized custom permission list
    pub fn with_custom_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() { self.email.clone() } else { name.to_string() }
    }

    /// Bump `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// User account status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Account can be used
    Active,

    /// Account is disabled
    Inactive,

    /// Account is temporarily blocked
    Suspended,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [UserStatus::Active, UserStatus::Inactive, UserStatus::Suspended];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserStatus::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| AccessError::UnknownStatus { identifier: s.to_string() })
    }
}

/// Directory listing filter. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub department: Option<Department>,
    pub status: Option<UserStatus>,

    /// Case-insensitive substring of name, email, department or role
    pub search: Option<String>,

    /// Maximum number of profiles returned
    pub limit: Option<usize>,
}

impl UserFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    pub fn status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, profile: &UserProfile) -> bool {
        if self.role.is_some_and(|role| role != profile.role) {
            return false;
        }
        if self.department.is_some_and(|department| department != profile.department) {
            return false;
        }
        if self.status.is_some_and(|status| status != profile.status) {
            return false;
        }

        match self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                [profile.first_name.as_str(), profile.last_name.as_str(), profile.email.as_str(), profile.department.as_str(), profile.role.as_str()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            None => true,
        }
    }

    /// Matching profiles, newest first (ties by ID), truncated to `limit`
    pub fn apply(&self, profiles: impl IntoIterator<Item = UserProfile>) -> Vec<UserProfile> {
        let mut matched: Vec<UserProfile> = profiles.into_iter().filter(|p| self.matches(p)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Directory statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    /// Total number of profiles
    pub total: usize,

    /// Profiles per role
    pub by_role: BTreeMap<Role, usize>,

    /// Profiles per department
    pub by_department: BTreeMap<Department, usize>,

    /// Profiles per status
    pub by_status: BTreeMap<UserStatus, usize>,
}

impl UserStats {
    pub fn from_profiles<'a>(profiles: impl IntoIterator<Item = &'a UserProfile>) -> Self {
        let mut stats = Self::default();

        for profile in profiles {
            stats.total += 1;
            *stats.by_role.entry(profile.role).or_insert(0) += 1;
            *stats.by_department.entry(profile.department).or_insert(0) += 1;
            *stats.by_status.entry(profile.status).or_insert(0) += 1;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserializes_from_table_row() {
        let json = r#"{
            "id": "uid-1",
            "email": "ana@clinic.example",
            "first_name": "Ana",
            "role": "technician",
            "department": "biomedical",
            "status": "suspended",
            "permissions": "[\"devices:create\"]"
        }"#;

        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.role, Role::Technician);
        assert_eq!(profile.department, Department::Biomedical);
        assert_eq!(profile.status, UserStatus::Suspended);
        assert_eq!(profile.permissions.as_deref(), Some("[\"devices:create\"]"));
        assert!(!profile.is_active());
    }

    #[test]
    fn test_profile_keeps_unmodelled_columns() {
        let json = r#"{
            "_id": "row-17",
            "id": "uid-4",
            "email": "kim@clinic.example",
            "role": "viewer",
            "department": "ophthalmology",
            "status": "active",
            "license_number": "LIC-42",
            "bio": "Retina specialist",
            "shift": "night"
        }"#;

        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.license_number.as_deref(), Some("LIC-42"));
        assert_eq!(profile.bio.as_deref(), Some("Retina specialist"));
        assert_eq!(profile.extra.get("_id"), Some(&Value::from("row-17")));

        let written = serde_json::to_value(&profile).unwrap();
        assert_eq!(written["_id"], "row-17");
        assert_eq!(written["shift"], "night");
        assert_eq!(written["license_number"], "LIC-42");
        assert!(written.get("hire_date").is_none());
    }

    #[test]
    fn test_provisioned_profile_uses_defaults() {
        let config = Config::default();
        let profile = UserProfile::provisioned("uid-2", "sam@clinic.example", None, &config);

        assert_eq!(profile.role, Role::Viewer);
        assert_eq!(profile.department, Department::Administration);
        assert_eq!(profile.first_name, "sam");
        assert_eq!(profile.permissions.as_deref(), Some("[]"));
        assert!(profile.is_active());
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let profile = UserProfile::new("uid-3", "x@clinic.example", Role::Viewer, Department::It);
        assert_eq!(profile.display_name(), "x@clinic.example");

        let profile = profile.with_name("Lee", "Park");
        assert_eq!(profile.display_name(), "Lee Park");
    }

    #[test]
    fn test_user_filter() {
        let profiles = vec![
            UserProfile::new("a", "ana@clinic.example", Role::Admin, Department::It).with_name("Ana", "Ruiz"),
            UserProfile::new("b", "ben@clinic.example", Role::Viewer, Department::It).with_status(UserStatus::Inactive),
            UserProfile::new("c", "cho@clinic.example", Role::Viewer, Department::Biomedical).with_name("Cho", "Anders"),
        ];
        let created = DateTime::parse_from_rfc3339("2025-03-01T08:00:00Z").unwrap().with_timezone(&Utc);
        let mut profiles: Vec<UserProfile> = profiles.into_iter().map(|mut p| {
            p.created_at = created;
            p
        }).collect();

        let ids = |filter: UserFilter| filter.apply(profiles.clone()).into_iter().map(|p| p.id).collect::<Vec<_>>();

        assert_eq!(ids(UserFilter::new()).len(), 3);
        assert_eq!(ids(UserFilter::new().role(Role::Viewer)), vec!["b", "c"]);
        assert_eq!(ids(UserFilter::new().department(Department::It).status(UserStatus::Active)), vec!["a"]);
        assert_eq!(ids(UserFilter::new().search("AND")), vec!["c"]);
        assert_eq!(ids(UserFilter::new().search("biomed")), vec!["c"]);
        assert_eq!(ids(UserFilter::new().search("admin")), vec!["a"]);
        assert_eq!(ids(UserFilter::new().search("   ")).len(), 3);
        assert!(ids(UserFilter::new().search("zed")).is_empty());
        assert_eq!(ids(UserFilter::new().role(Role::Viewer).limit(1)), vec!["b"]);

        // newest first
        profiles[2].created_at = created + chrono::Duration::days(1);
        let ids = UserFilter::new().apply(profiles).into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_user_stats() {
        let profiles = vec![
            UserProfile::new("a", "a@x", Role::Admin, Department::It),
            UserProfile::new("b", "b@x", Role::Viewer, Department::It).with_status(UserStatus::Inactive),
            UserProfile::new("c", "c@x", Role::Viewer, Department::Biomedical),
        ];

        let stats = UserStats::from_profiles(&profiles);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_role[&Role::Viewer], 2);
        assert_eq!(stats.by_department[&Department::It], 2);
        assert_eq!(stats.by_status[&UserStatus::Active], 2);
        assert_eq!(stats.by_status.get(&UserStatus::Suspended), None);
    }
}
