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

//! Error handling for the access engine
//!
//! Two families live here:
//! - [`AccessError`] / [`StoreError`]: failures of library operations
//!   (administration, directory loading, parsing at the catalog boundary).
//! - [`Denial`]: the reason an access decision came out negative. A denial is
//!   never propagated as a fault; it travels inside an
//!   [`AccessDecision`](crate::rbac::AccessDecision).

use crate::rbac::catalog::{Permission, label};
use crate::rbac::roles::Role;
use crate::users::UserStatus;
use thiserror::Error;

/// Failures reported by a [`UserStore`](crate::users::UserStore) implementation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Invalid record for user {user_id}: {message}")]
    InvalidRecord { user_id: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

/// Library error type
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Unknown permission: {identifier}")]
    UnknownPermission { identifier: String },

    #[error("Unknown role: {identifier}")]
    UnknownRole { identifier: String },

    #[error("Unknown department: {identifier}")]
    UnknownDepartment { identifier: String },

    #[error("Unknown user status: {identifier}")]
    UnknownStatus { identifier: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AccessError {
    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            AccessError::UserNotFound { .. } => "user_not_found",
            AccessError::UnknownPermission { .. } => "unknown_permission",
            AccessError::UnknownRole { .. } => "unknown_role",
            AccessError::UnknownDepartment { .. } => "unknown_department",
            AccessError::UnknownStatus { .. } => "unknown_status",
            AccessError::BadRequest { .. } => "bad_request",
            AccessError::Config { .. } => "config_error",
            AccessError::Store(_) => "store_error",
        }
    }
}

/// Result type for access engine operations
pub type AccessResult<T> = Result<T, AccessError>;

/// Why an access request was refused.
///
/// The `Display` output is the operator-facing reason shown by guards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("User profile not found")]
    ProfileNotFound,

    #[error("Account is {status}")]
    InactiveAccount { status: UserStatus },

    #[error("Requires {required} role (current: {actual})")]
    InsufficientRole { required: Role, actual: Role },

    #[error("Requires minimum {required} role level (current: {actual})")]
    InsufficientRoleLevel { required: Role, actual: Role },

    #[error("Missing required permission: {}", label(.missing))]
    MissingPermission { missing: Permission },

    #[error("Missing required permissions: {}", join_labels(.missing))]
    MissingPermissions { missing: Vec<Permission> },

    #[error("Missing any of required permissions: {}", join_labels(.requested))]
    MissingAnyPermission { requested: Vec<Permission> },

    #[error("Permission check failed: {message}")]
    CollaboratorFailure { message: String },
}

impl Denial {
    /// Returns the denial category
    pub fn kind(&self) -> &'static str {
        match self {
            Denial::NotAuthenticated => "not_authenticated",
            Denial::ProfileNotFound => "profile_missing",
            Denial::InactiveAccount { .. } => "inactive_account",
            Denial::InsufficientRole { .. } => "insufficient_role",
            Denial::InsufficientRoleLevel { .. } => "insufficient_role_level",
            Denial::MissingPermission { .. } | Denial::MissingPermissions { .. } | Denial::MissingAnyPermission { .. } => "missing_permissions",
            Denial::CollaboratorFailure { .. } => "collaborator_failure",
        }
    }
}

fn join_labels(permissions: &[Permission]) -> String {
    permissions.iter().map(label).collect::<Vec<_>>().join(", ")
}
