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

//! Configuration management for the access engine

use crate::rbac::roles::{Department, Role};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default slow check threshold in milliseconds
pub const DEFAULT_SLOW_CHECK_MS: u64 = 5;

/// Configuration for the access engine
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON user directory used by the operator tooling
    pub users_file: Option<PathBuf>,

    /// Append-only audit journal (JSON lines). The CLI defaults it to a file next to the user directory.
    pub audit_file: Option<PathBuf>,

    /// Role given to profiles provisioned on first login
    pub default_role: Role,

    /// Department given to profiles provisioned on first login
    pub default_department: Department,

    /// Record access decisions and admin changes in the audit log
    pub audit_enabled: bool,

    /// Maximum number of audit events kept in memory
    pub audit_max_events: usize,

    /// Checks slower than this are logged as warnings
    pub slow_check_threshold: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            users_file: None,
            audit_file: None,
            default_role: Role::Viewer,
            default_department: Department::Administration,
            audit_enabled: true,
            audit_max_events: 10_000,
            slow_check_threshold: Duration::from_millis(DEFAULT_SLOW_CHECK_MS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            users_file: lookup("MEDDESK_USERS_FILE").map(PathBuf::from),

            audit_file: lookup("MEDDESK_AUDIT_FILE").map(PathBuf::from),

            default_role: parse_or(&lookup, "MEDDESK_DEFAULT_ROLE", defaults.default_role),

            default_department: parse_or(&lookup, "MEDDESK_DEFAULT_DEPARTMENT", defaults.default_department),

            audit_enabled: parse_or(&lookup, "MEDDESK_AUDIT_ENABLED", defaults.audit_enabled),

            audit_max_events: parse_or(&lookup, "MEDDESK_AUDIT_MAX_EVENTS", defaults.audit_max_events),

            slow_check_threshold: Duration::from_millis(parse_or(&lookup, "MEDDESK_SLOW_CHECK_MS", DEFAULT_SLOW_CHECK_MS)),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Ignoring unparseable configuration value");
            default
        }),
        None => default,
    }
}
