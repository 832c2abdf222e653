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

//! Audit logging for access decisions and permission administration

use crate::error::StoreError;
use crate::rbac::catalog::Permission;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Audit event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuditEventType {
    /// Access request evaluated
    AccessCheck,
    /// Custom permission granted to a user
    PermissionGranted,
    /// Custom permission removed from a user
    PermissionRevoked,
    /// User role changed
    RoleChanged,
    /// User department changed
    DepartmentChanged,
    /// Account status changed
    StatusChanged,
    /// Profile created on first login
    ProfileProvisioned,
}

/// Audit event result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditResult {
    /// Operation succeeded
    Success,
    /// Operation failed
    Failure,
    /// Access was denied
    Denied,
}

/// Audit event entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: String,

    /// Event type
    pub event_type: AuditEventType,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// User who performed the action (`anonymous` for unauthenticated checks)
    pub actor: String,

    /// Target user (if applicable)
    pub target_user: Option<String>,

    /// Permission involved (if applicable)
    pub permission: Option<Permission>,

    /// Event result
    pub result: AuditResult,

    /// Human-readable description
    pub description: String,

    /// Additional event details
    pub details: HashMap<String, String>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(event_type: AuditEventType, actor: impl Into<String>, result: AuditResult, description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            actor: actor.into(),
            target_user: None,
            permission: None,
            result,
            description: description.into(),
            details: HashMap::new(),
        }
    }

    /// Set target user
    pub fn with_target_user(mut self, target_user: impl Into<String>) -> Self {
        self.target_user = Some(target_user.into());
        self
    }

    /// Set permission
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Add detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    fn involves(&self, user_id: &str) -> bool {
        self.actor == user_id || self.target_user.as_deref() == Some(user_id)
    }
}

/// Audit logger keeping the most recent events in memory, optionally
/// mirrored to an append-only JSON lines journal
#[derive(Debug)]
pub struct AuditLogger {
    events: RwLock<VecDeque<AuditEvent>>,

    /// Maximum number of events to keep in memory
    max_events: usize,

    journal: Option<PathBuf>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new() -> Self {
        Self::with_max_events(10_000)
    }

    /// Create audit logger with custom max events
    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
            journal: None,
        }
    }

    /// Open a journal file, loading its most recent `max_events` entries.
    ///
    /// A missing file starts an empty log; lines that do not parse are skipped.
    /// Every event logged afterwards is appended to the file.
    pub async fn open_journal<P: AsRef<Path>>(path: P, max_events: usize) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut events = VecDeque::new();
        for (index, line) in raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str::<AuditEvent>(line) {
                Ok(event) => {
                    events.push_back(event);
                    if events.len() > max_events {
                        events.pop_front();
                    }
                }
                Err(e) => warn!(path = %path.display(), line = index + 1, error = %e, "Skipping unreadable audit journal entry"),
            }
        }

        debug!(path = %path.display(), event_count = events.len(), "Audit journal opened");
        Ok(Self {
            events: RwLock::new(events),
            max_events,
            journal: Some(path.to_path_buf()),
        })
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.as_deref()
    }

    async fn append_to_journal(path: &Path, event: &AuditEvent) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Log an audit event
    pub async fn log_event(&self, event: AuditEvent) {
        match event.result {
            AuditResult::Success => {
                info!(
                    event_type = ?event.event_type,
                    actor = %event.actor,
                    target_user = ?event.target_user,
                    permission = ?event.permission.map(|p| p.key()),
                    "Audit event: {}", event.description
                );
            }
            AuditResult::Failure | AuditResult::Denied => {
                warn!(
                    event_type = ?event.event_type,
                    actor = %event.actor,
                    target_user = ?event.target_user,
                    permission = ?event.permission.map(|p| p.key()),
                    result = ?event.result,
                    "Audit event: {}", event.description
                );
            }
        }

        let mut events = self.events.write().await;

        // Journal failures are reported but never fail the audited operation
        if let Some(path) = &self.journal {
            if let Err(e) = Self::append_to_journal(path, &event).await {
                warn!(path = %path.display(), error = %e, "Failed to append audit journal entry");
            }
        }

        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    /// Log an access check outcome
    pub async fn log_access_check(&self, actor: &str, allowed: bool, reason: &str) {
        let result = if allowed { AuditResult::Success } else { AuditResult::Denied };
        let description = if allowed { "Access granted".to_string() } else { format!("Access denied: {reason}") };

        self.log_event(AuditEvent::new(AuditEventType::AccessCheck, actor, result, description)).await;
    }

    /// Log a custom permission grant
    pub async fn log_permission_granted(&self, actor: &str, user_id: &str, permission: Permission) {
        let event = AuditEvent::new(AuditEventType::PermissionGranted, actor, AuditResult::Success, format!("{permission} permission granted to user"))
            .with_target_user(user_id)
            .with_permission(permission);

        self.log_event(event).await;
    }

    /// Log a custom permission revocation
    pub async fn log_permission_revoked(&self, actor: &str, user_id: &str, permission: Permission) {
        let event = AuditEvent::new(AuditEventType::PermissionRevoked, actor, AuditResult::Success, format!("{permission} permission revoked from user"))
            .with_target_user(user_id)
            .with_permission(permission);

        self.log_event(event).await;
    }

    /// Log a profile field change (role, department, status)
    pub async fn log_profile_change(&self, event_type: AuditEventType, actor: &str, user_id: &str, from: &str, to: &str) {
        let event = AuditEvent::new(event_type, actor, AuditResult::Success, format!("User profile updated from {from} to {to}"))
            .with_target_user(user_id)
            .with_detail("from", from)
            .with_detail("to", to);

        self.log_event(event).await;
    }

    /// Get audit events, newest first
    pub async fn get_events(&self, limit: Option<usize>) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.iter().rev().take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    /// Get events where the user is actor or target, newest first
    pub async fn get_user_events(&self, user_id: &str, limit: Option<usize>) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.iter().rev().filter(|event| event.involves(user_id)).take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    /// Get events by type, newest first
    pub async fn get_events_by_type(&self, event_type: AuditEventType, limit: Option<usize>) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.iter().rev().filter(|event| event.event_type == event_type).take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    /// Clear all audit events
    pub async fn clear_events(&self) {
        self.events.write().await.clear();
        info!("Audit log cleared");
    }

    /// Get audit statistics
    pub async fn get_statistics(&self) -> AuditStatistics {
        let events = self.events.read().await;

        let mut stats = AuditStatistics {
            total_events: events.len(),
            ..Default::default()
        };

        for event in events.iter() {
            match event.result {
                AuditResult::Success => stats.successful_events += 1,
                AuditResult::Failure => stats.failed_events += 1,
                AuditResult::Denied => stats.denied_events += 1,
            }

            *stats.events_by_type.entry(event.event_type).or_insert(0) += 1;
        }

        stats
    }
}

/// Audit statistics
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuditStatistics {
    /// Total number of events
    pub total_events: usize,

    /// Number of successful events
    pub successful_events: usize,

    /// Number of failed events
    pub failed_events: usize,

    /// Number of denied events
    pub denied_events: usize,

    /// Events by type
    pub events_by_type: BTreeMap<AuditEventType, usize>,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
