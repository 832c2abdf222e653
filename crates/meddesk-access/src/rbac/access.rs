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

//! Access decision facade
//!
//! [`AccessController::evaluate`] turns a [`Session`] and an [`AccessRequest`]
//! into an [`AccessDecision`]. Checks run in a fixed order and the first
//! failing one decides the reason:
//!
//! 1. caller authenticated (no fetch otherwise)
//! 2. profile exists
//! 3. account active
//! 4. exact role
//! 5. minimum role level
//! 6. single permission
//! 7. permission list (all or any)
//!
//! Each evaluation fetches the profile exactly once. Store failures become
//! denials; nothing is propagated to the caller.

use crate::config::Config;
use crate::error::Denial;
use crate::rbac::audit::AuditLogger;
use crate::rbac::catalog::Permission;
use crate::rbac::resolver::{has_any_permission, has_permission, has_role_level, missing_permissions};
use crate::rbac::roles::Role;
use crate::session::Session;
use crate::users::{UserProfile, UserStore};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// What the caller wants to be allowed to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRequest {
    /// A single required permission
    #[serde(default)]
    pub permission: Option<Permission>,

    /// Several permissions, combined according to `require_all`
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// `true`: every entry of `permissions` is required. `false`: any one is enough.
    #[serde(default)]
    pub require_all: bool,

    /// Exact role required
    #[serde(default)]
    pub role: Option<Role>,

    /// Minimum role in the role ordering
    #[serde(default)]
    pub min_role_level: Option<Role>,
}

impl AccessRequest {
    /// Request with no constraints; any active profile passes
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Require every listed permission
    pub fn all_of(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self.require_all = true;
        self
    }

    /// Require at least one listed permission
    pub fn any_of(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self.require_all = false;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn min_role_level(mut self, role: Role) -> Self {
        self.min_role_level = Some(role);
        self
    }

    /// Checks 3 to 7 against an already fetched profile.
    ///
    /// Returns the first failing check, or `None` when access is allowed.
    pub fn denial_for(&self, profile: &UserProfile) -> Option<Denial> {
        if !profile.is_active() {
            return Some(Denial::InactiveAccount { status: profile.status });
        }

        if let Some(required) = self.role {
            if profile.role != required {
                return Some(Denial::InsufficientRole { required, actual: profile.role });
            }
        }

        if let Some(required) = self.min_role_level {
            if !has_role_level(profile.role, required) {
                return Some(Denial::InsufficientRoleLevel { required, actual: profile.role });
            }
        }

        if let Some(permission) = self.permission {
            if !has_permission(profile, permission) {
                return Some(Denial::MissingPermission { missing: permission });
            }
        }

        if !self.permissions.is_empty() {
            if self.require_all {
                let missing = missing_permissions(profile, &self.permissions);
                if !missing.is_empty() {
                    return Some(Denial::MissingPermissions { missing });
                }
            } else if !has_any_permission(profile, &self.permissions) {
                return Some(Denial::MissingAnyPermission { requested: self.permissions.clone() });
            }
        }

        None
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,

    /// Empty when allowed, otherwise the operator-facing denial reason
    pub reason: String,

    /// The caller's profile, when it was fetched
    pub profile: Option<UserProfile>,

    #[serde(skip)]
    pub denial: Option<Denial>,
}

impl AccessDecision {
    pub fn allow(profile: UserProfile) -> Self {
        Self {
            allowed: true,
            reason: String::new(),
            profile: Some(profile),
            denial: None,
        }
    }

    pub fn deny(denial: Denial, profile: Option<UserProfile>) -> Self {
        Self {
            allowed: false,
            reason: denial.to_string(),
            profile,
            denial: Some(denial),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn denial(&self) -> Option<&Denial> {
        self.denial.as_ref()
    }

    /// Metric/log label for the outcome
    pub fn outcome(&self) -> &'static str {
        match &self.denial {
            None => "allowed",
            Some(denial) => denial.kind(),
        }
    }
}

/// Evaluates access requests against a user store
pub struct AccessController<S: UserStore + ?Sized> {
    store: Arc<S>,
    audit_logger: Option<Arc<AuditLogger>>,
    config: Config,
}

impl<S: UserStore + ?Sized> Clone for AccessController<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            audit_logger: self.audit_logger.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: UserStore + ?Sized> AccessController<S> {
    /// Create a controller with default configuration and no audit log
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: Arc<S>, config: Config) -> Self {
        Self { store, audit_logger: None, config }
    }

    /// Record every decision in `audit_logger` (only when auditing is enabled)
    pub fn with_audit_logger(mut self, audit_logger: Arc<AuditLogger>) -> Self {
        if self.config.audit_enabled {
            self.audit_logger = Some(audit_logger);
        }
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn audit_logger(&self) -> Option<&Arc<AuditLogger>> {
        self.audit_logger.as_ref()
    }

    /// Evaluate a request for the session's caller
    pub async fn evaluate(&self, session: &Session, request: &AccessRequest) -> AccessDecision {
        let start_time = Instant::now();

        let decision = self.decide(session, request).await;

        let duration = start_time.elapsed();
        let user_id = session.identity().unwrap_or("anonymous");

        if duration > self.config.slow_check_threshold {
            warn!(
                user_id = %user_id,
                duration_ms = %duration.as_millis(),
                "Slow access check detected"
            );
        }

        if decision.allowed {
            debug!(
                user_id = %user_id,
                outcome = decision.outcome(),
                duration_ms = %duration.as_millis(),
                "Access check completed"
            );
        } else {
            warn!(
                user_id = %user_id,
                outcome = decision.outcome(),
                reason = %decision.reason,
                duration_ms = %duration.as_millis(),
                "Access denied"
            );
        }

        counter!("meddesk_access_decisions_total", 1, "outcome" => decision.outcome());

        if let Some(audit_logger) = &self.audit_logger {
            audit_logger.log_access_check(user_id, decision.allowed, &decision.reason).await;
        }

        decision
    }

    async fn decide(&self, session: &Session, request: &AccessRequest) -> AccessDecision {
        let Some(user_id) = session.identity() else {
            return AccessDecision::deny(Denial::NotAuthenticated, None);
        };

        let profile = match self.store.fetch_user_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return AccessDecision::deny(Denial::ProfileNotFound, None),
            Err(e) => {
                return AccessDecision::deny(Denial::CollaboratorFailure { message: e.to_string() }, None);
            }
        };

        match request.denial_for(&profile) {
            Some(denial) => AccessDecision::deny(denial, Some(profile)),
            None => AccessDecision::allow(profile),
        }
    }

    pub async fn check_permission(&self, session: &Session, permission: Permission) -> bool {
        self.evaluate(session, &AccessRequest::new().permission(permission)).await.allowed
    }

    /// All (`require_all`) or any of `permissions`. An empty list with
    /// `require_all == false` is denied.
    pub async fn check_permissions(&self, session: &Session, permissions: &[Permission], require_all: bool) -> bool {
        if permissions.is_empty() && !require_all {
            return false;
        }

        let request = AccessRequest {
            permissions: permissions.to_vec(),
            require_all,
            ..AccessRequest::default()
        };
        self.evaluate(session, &request).await.allowed
    }

    pub async fn check_role(&self, session: &Session, role: Role) -> bool {
        self.evaluate(session, &AccessRequest::new().role(role)).await.allowed
    }

    pub async fn check_min_role_level(&self, session: &Session, min_role: Role) -> bool {
        self.evaluate(session, &AccessRequest::new().min_role_level(min_role)).await.allowed
    }
}
