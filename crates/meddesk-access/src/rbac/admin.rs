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

//! Permission administration
//!
//! Custom grants, role and department assignment, account status and
//! first-login provisioning. Every change is written back through the
//! [`UserStore`] and recorded in the audit log when one is attached.

use crate::config::Config;
use crate::error::{AccessError, AccessResult};
use crate::rbac::audit::{AuditEvent, AuditEventType, AuditLogger, AuditResult};
use crate::rbac::catalog::Permission;
use crate::rbac::resolver::parse_custom_permissions;
use crate::rbac::roles::{Department, Role};
use crate::users::{UserFilter, UserProfile, UserStats, UserStatus, UserStore};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Administrative operations on user profiles
pub struct PermissionAdmin<S: UserStore + ?Sized> {
    store: Arc<S>,
    audit_logger: Option<Arc<AuditLogger>>,
    config: Config,
}

impl<S: UserStore + ?Sized> PermissionAdmin<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self { store, audit_logger: None, config }
    }

    /// Record changes in `audit_logger` (only when auditing is enabled)
    pub fn with_audit_logger(mut self, audit_logger: Arc<AuditLogger>) -> Self {
        if self.config.audit_enabled {
            self.audit_logger = Some(audit_logger);
        }
        self
    }

    async fn load(&self, user_id: &str) -> AccessResult<UserProfile> {
        self.store.fetch_user_profile(user_id).await?.ok_or_else(|| AccessError::UserNotFound { user_id: user_id.to_string() })
    }

    async fn save(&self, mut profile: UserProfile) -> AccessResult<UserProfile> {
        profile.touch();
        self.store.save_user_profile(profile.clone()).await?;
        Ok(profile)
    }

    /// Custom grants currently stored for a user
    pub async fn custom_permissions(&self, user_id: &str) -> AccessResult<BTreeSet<Permission>> {
        let profile = self.load(user_id).await?;
        Ok(parse_custom_permissions(profile.permissions.as_deref()))
    }

    /// Add a custom grant. Granting an already granted permission changes nothing.
    ///
    /// Stored entries this catalog does not know are kept; a stored list that
    /// cannot be read is refused with [`AccessError::BadRequest`].
    pub async fn grant_permission(&self, actor: &str, user_id: &str, permission: Permission) -> AccessResult<UserProfile> {
        let mut profile = self.load(user_id).await?;
        let mut stored = stored_identifiers(&profile)?;

        if !stored.insert(permission.key()) {
            debug!(user_id = %user_id, permission = %permission, "Custom permission already granted");
            return Ok(profile);
        }

        profile.permissions = Some(encode_identifiers(&stored));
        let profile = self.save(profile).await?;

        if let Some(audit_logger) = &self.audit_logger {
            audit_logger.log_permission_granted(actor, user_id, permission).await;
        }

        info!(user_id = %user_id, permission = %permission, granted_by = %actor, "Custom permission granted");
        Ok(profile)
    }

    /// Remove a custom grant. Role and department grants are not affected.
    pub async fn revoke_permission(&self, actor: &str, user_id: &str, permission: Permission) -> AccessResult<UserProfile> {
        let mut profile = self.load(user_id).await?;
        let mut stored = stored_identifiers(&profile)?;

        if !stored.remove(&permission.key()) {
            debug!(user_id = %user_id, permission = %permission, "No custom grant to revoke");
            return Ok(profile);
        }

        profile.permissions = Some(encode_identifiers(&stored));
        let profile = self.save(profile).await?;

        if let Some(audit_logger) = &self.audit_logger {
            audit_logger.log_permission_revoked(actor, user_id, permission).await;
        }

        info!(user_id = %user_id, permission = %permission, revoked_by = %actor, "Custom permission revoked");
        Ok(profile)
    }

    pub async fn change_role(&self, actor: &str, user_id: &str, role: Role) -> AccessResult<UserProfile> {
        let mut profile = self.load(user_id).await?;
        let previous = profile.role;
        if previous == role {
            return Ok(profile);
        }

        profile.role = role;
        let profile = self.save(profile).await?;
        self.audit_change(AuditEventType::RoleChanged, actor, user_id, previous.as_str(), role.as_str()).await;

        info!(user_id = %user_id, from = %previous, to = %role, changed_by = %actor, "User role changed");
        Ok(profile)
    }

    pub async fn change_department(&self, actor: &str, user_id: &str, department: Department) -> AccessResult<UserProfile> {
        let mut profile = self.load(user_id).await?;
        let previous = profile.department;
        if previous == department {
            return Ok(profile);
        }

        profile.department = department;
        let profile = self.save(profile).await?;
        self.audit_change(AuditEventType::DepartmentChanged, actor, user_id, previous.as_str(), department.as_str()).await;

        info!(user_id = %user_id, from = %previous, to = %department, changed_by = %actor, "User department changed");
        Ok(profile)
    }

    pub async fn change_status(&self, actor: &str, user_id: &str, status: UserStatus) -> AccessResult<UserProfile> {
        let mut profile = self.load(user_id).await?;
        let previous = profile.status;
        if previous == status {
            return Ok(profile);
        }

        profile.status = status;
        let profile = self.save(profile).await?;
        self.audit_change(AuditEventType::StatusChanged, actor, user_id, previous.as_str(), status.as_str()).await;

        info!(user_id = %user_id, from = %previous, to = %status, changed_by = %actor, "User status changed");
        Ok(profile)
    }

    /// Login hook: create the profile with configured defaults when it does
    /// not exist yet, otherwise record the login time.
    pub async fn provision_profile(&self, user_id: &str, email: &str, name: Option<&str>) -> AccessResult<UserProfile> {
        if user_id.is_empty() {
            return Err(AccessError::BadRequest {
                message: "user id must not be empty".to_string(),
            });
        }

        if let Some(mut profile) = self.store.fetch_user_profile(user_id).await? {
            profile.last_login = Some(Utc::now());
            debug!(user_id = %user_id, "Login recorded for existing profile");
            return self.save(profile).await;
        }

        let profile = UserProfile::provisioned(user_id, email, name, &self.config);
        self.store.save_user_profile(profile.clone()).await?;

        if let Some(audit_logger) = &self.audit_logger {
            let event = AuditEvent::new(AuditEventType::ProfileProvisioned, user_id, AuditResult::Success, "User profile provisioned on first login")
                .with_target_user(user_id)
                .with_detail("role", profile.role.as_str())
                .with_detail("department", profile.department.as_str());
            audit_logger.log_event(event).await;
        }

        info!(user_id = %user_id, role = %profile.role, department = %profile.department, "User profile provisioned");
        Ok(profile)
    }

    /// Directory listing with role, department, status and text filters
    pub async fn list_users(&self, filter: &UserFilter) -> AccessResult<Vec<UserProfile>> {
        let profiles = self.store.list_user_profiles().await?;
        let total = profiles.len();
        let matched = filter.apply(profiles);

        debug!(total = total, matched = matched.len(), "User directory listed");
        Ok(matched)
    }

    /// Directory counts by role, department and status
    pub async fn user_stats(&self) -> AccessResult<UserStats> {
        let profiles = self.store.list_user_profiles().await?;
        Ok(UserStats::from_profiles(&profiles))
    }

    async fn audit_change(&self, event_type: AuditEventType, actor: &str, user_id: &str, from: &str, to: &str) {
        if let Some(audit_logger) = &self.audit_logger {
            audit_logger.log_profile_change(event_type, actor, user_id, from, to).await;
        }
    }
}

/// Raw identifiers in a stored custom permission list, unknown ones included
fn stored_identifiers(profile: &UserProfile) -> AccessResult<BTreeSet<String>> {
    let Some(raw) = profile.permissions.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(BTreeSet::new());
    };

    let entries: Vec<String> = serde_json::from_str(raw).map_err(|e| {
        warn!(user_id = %profile.id, error = %e, "Refusing to rewrite malformed custom permission list");
        AccessError::BadRequest {
            message: format!("stored custom permission list for {} is not a JSON array of strings: {e}", profile.id),
        }
    })?;

    Ok(entries.into_iter().collect())
}

fn encode_identifiers(identifiers: &BTreeSet<String>) -> String {
    serde_json::Value::from(identifiers.iter().cloned().collect::<Vec<_>>()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::rbac::resolver::{effective_permissions, has_permission};
    use crate::users::{InMemoryUserStore, MockUserStore};

    fn perm(key: &str) -> Permission {
        key.parse().unwrap()
    }

    fn setup() -> (PermissionAdmin<InMemoryUserStore>, Arc<InMemoryUserStore>, Arc<AuditLogger>) {
        let store = Arc::new(InMemoryUserStore::with_profiles(vec![
            UserProfile::new("uid-1", "v@clinic.example", Role::Viewer, Department::Ophthalmology),
            UserProfile::new("uid-2", "m@clinic.example", Role::Manager, Department::Biomedical),
        ]));
        let audit_logger = Arc::new(AuditLogger::new());
        let admin = PermissionAdmin::new(Arc::clone(&store), Config::default()).with_audit_logger(Arc::clone(&audit_logger));
        (admin, store, audit_logger)
    }

    #[tokio::test]
    async fn test_grant_and_revoke_custom_permission() {
        let (admin, store, audit_logger) = setup();

        let profile = admin.grant_permission("admin-1", "uid-1", perm("devices:create")).await.unwrap();
        assert!(has_permission(&profile, perm("devices:create")));
        assert_eq!(profile.permissions.as_deref(), Some(r#"["devices:create"]"#));

        let stored = store.fetch_user_profile("uid-1").await.unwrap().unwrap();
        assert!(has_permission(&stored, perm("devices:create")));

        let profile = admin.revoke_permission("admin-1", "uid-1", perm("devices:create")).await.unwrap();
        assert!(!has_permission(&profile, perm("devices:create")));

        let events = audit_logger.get_user_events("uid-1", None).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::PermissionRevoked);
        assert_eq!(events[1].event_type, AuditEventType::PermissionGranted);
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let (admin, _store, audit_logger) = setup();

        admin.grant_permission("admin-1", "uid-1", perm("alerts:update")).await.unwrap();
        admin.grant_permission("admin-1", "uid-1", perm("alerts:update")).await.unwrap();

        assert_eq!(admin.custom_permissions("uid-1").await.unwrap().len(), 1);
        assert_eq!(audit_logger.get_events(None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_grant_keeps_unknown_stored_entries() {
        let store = Arc::new(InMemoryUserStore::with_profiles(vec![
            UserProfile::new("uid-1", "v@clinic.example", Role::Viewer, Department::Ophthalmology).with_custom_permissions(r#"["users:create","inventory:read"]"#),
        ]));
        let admin = PermissionAdmin::new(Arc::clone(&store), Config::default());

        let profile = admin.grant_permission("admin-1", "uid-1", perm("devices:create")).await.unwrap();
        assert_eq!(profile.permissions.as_deref(), Some(r#"["devices:create","inventory:read","users:create"]"#));

        let profile = admin.revoke_permission("admin-1", "uid-1", perm("users:create")).await.unwrap();
        assert_eq!(profile.permissions.as_deref(), Some(r#"["devices:create","inventory:read"]"#));

        let stored = store.fetch_user_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(stored.permissions.as_deref(), Some(r#"["devices:create","inventory:read"]"#));
    }

    #[tokio::test]
    async fn test_malformed_stored_list_is_not_overwritten() {
        let store = Arc::new(InMemoryUserStore::with_profiles(vec![
            UserProfile::new("uid-1", "v@clinic.example", Role::Viewer, Department::Ophthalmology).with_custom_permissions("{users:create"),
        ]));
        let audit_logger = Arc::new(AuditLogger::new());
        let admin = PermissionAdmin::new(Arc::clone(&store), Config::default()).with_audit_logger(Arc::clone(&audit_logger));

        let err = admin.grant_permission("admin-1", "uid-1", perm("devices:create")).await.unwrap_err();
        assert!(matches!(err, AccessError::BadRequest { .. }));

        let err = admin.revoke_permission("admin-1", "uid-1", perm("devices:create")).await.unwrap_err();
        assert!(matches!(err, AccessError::BadRequest { .. }));

        let stored = store.fetch_user_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(stored.permissions.as_deref(), Some("{users:create"));
        assert!(audit_logger.get_events(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_does_not_touch_role_grants() {
        let (admin, _store, audit_logger) = setup();

        let profile = admin.revoke_permission("admin-1", "uid-1", perm("devices:read")).await.unwrap();

        assert!(has_permission(&profile, perm("devices:read")));
        assert!(audit_logger.get_events(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_change_role_department_and_status() {
        let (admin, _store, audit_logger) = setup();

        let profile = admin.change_role("admin-1", "uid-1", Role::Manager).await.unwrap();
        assert_eq!(profile.role, Role::Manager);

        let profile = admin.change_department("admin-1", "uid-1", Department::It).await.unwrap();
        assert!(has_permission(&profile, perm("system:configure")));

        let profile = admin.change_status("admin-1", "uid-1", UserStatus::Suspended).await.unwrap();
        assert!(effective_permissions(&profile).is_empty());

        let events = audit_logger.get_user_events("uid-1", None).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, AuditEventType::StatusChanged);
        assert_eq!(events[0].details.get("from").map(String::as_str), Some("active"));
        assert_eq!(events[0].details.get("to").map(String::as_str), Some("suspended"));
    }

    #[tokio::test]
    async fn test_unchanged_role_is_not_audited() {
        let (admin, _store, audit_logger) = setup();

        admin.change_role("admin-1", "uid-2", Role::Manager).await.unwrap();
        assert!(audit_logger.get_events(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (admin, _store, _audit_logger) = setup();

        let err = admin.grant_permission("admin-1", "nobody", perm("users:read")).await.unwrap_err();
        assert_eq!(err.error_type(), "user_not_found");

        let err = admin.change_status("admin-1", "nobody", UserStatus::Inactive).await.unwrap_err();
        assert!(matches!(err, AccessError::UserNotFound { user_id } if user_id == "nobody"));
    }

    #[tokio::test]
    async fn test_provision_profile() {
        let (admin, store, audit_logger) = setup();

        let profile = admin.provision_profile("uid-9", "new.hire@clinic.example", None).await.unwrap();
        assert_eq!(profile.role, Role::Viewer);
        assert_eq!(profile.department, Department::Administration);
        assert_eq!(profile.first_name, "new.hire");
        assert!(store.fetch_user_profile("uid-9").await.unwrap().is_some());
        assert_eq!(audit_logger.get_events_by_type(AuditEventType::ProfileProvisioned, None).await.len(), 1);

        // a second login keeps the stored role
        admin.change_role("admin-1", "uid-9", Role::Technician).await.unwrap();
        let profile = admin.provision_profile("uid-9", "new.hire@clinic.example", Some("Robin")).await.unwrap();
        assert_eq!(profile.role, Role::Technician);
        assert_eq!(profile.first_name, "new.hire");
        assert!(profile.last_login.is_some());
        assert_eq!(audit_logger.get_events_by_type(AuditEventType::ProfileProvisioned, None).await.len(), 1);

        assert!(matches!(admin.provision_profile("", "x@clinic.example", None).await, Err(AccessError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_provision_uses_configured_defaults() {
        let store = Arc::new(InMemoryUserStore::new());
        let config = Config {
            default_role: Role::Technician,
            default_department: Department::Biomedical,
            ..Config::default()
        };
        let admin = PermissionAdmin::new(store, config);

        let profile = admin.provision_profile("uid-1", "t@clinic.example", Some("Toni")).await.unwrap();
        assert_eq!(profile.role, Role::Technician);
        assert_eq!(profile.department, Department::Biomedical);
        assert_eq!(profile.first_name, "Toni");
    }

    #[tokio::test]
    async fn test_user_stats() {
        let (admin, _store, _audit_logger) = setup();
        admin.change_status("admin-1", "uid-1", UserStatus::Inactive).await.unwrap();

        let stats = admin.user_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_role[&Role::Viewer], 1);
        assert_eq!(stats.by_status[&UserStatus::Inactive], 1);
    }

    #[tokio::test]
    async fn test_list_users() {
        let (admin, _store, _audit_logger) = setup();
        admin.change_status("admin-1", "uid-1", UserStatus::Suspended).await.unwrap();

        assert_eq!(admin.list_users(&UserFilter::new()).await.unwrap().len(), 2);

        let suspended = admin.list_users(&UserFilter::new().status(UserStatus::Suspended)).await.unwrap();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].id, "uid-1");

        let found = admin.list_users(&UserFilter::new().search("M@CLINIC")).await.unwrap();
        assert_eq!(found.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["uid-2"]);

        assert!(admin.list_users(&UserFilter::new().role(Role::Admin)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockUserStore::new();
        store.expect_fetch_user_profile().times(1).returning(|_| Err(StoreError::Unavailable { message: "timeout".to_string() }));
        store.expect_save_user_profile().times(0);
        let admin = PermissionAdmin::new(Arc::new(store), Config::default());

        let err = admin.grant_permission("admin-1", "uid-1", perm("users:read")).await.unwrap_err();
        assert_eq!(err.error_type(), "store_error");
    }
}
