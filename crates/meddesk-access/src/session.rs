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

//! Caller session context
//!
//! A [`Session`] is handed to every access check. It replaces a process-wide
//! auth store: tests and callers fabricate whatever session they need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication state of the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Subject (user ID) issued by the authentication provider
    user_id: Option<String>,

    /// Whether the one-time-passcode flow completed
    authenticated: bool,

    /// Email the passcode was verified for
    email: Option<String>,

    /// When the session was established
    established_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session with no identity
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            authenticated: false,
            email: None,
            established_at: None,
        }
    }

    /// Session for a verified user
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            authenticated: true,
            email: None,
            established_at: Some(Utc::now()),
        }
    }

    /// Set the verified email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The identity to check, if the caller is authenticated and carries one
    pub fn identity(&self) -> Option<&str> {
        if !self.authenticated {
            return None;
        }
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn established_at(&self) -> Option<DateTime<Utc>> {
        self.established_at
    }

    /// Returns the logged-out session
    pub fn logout(&self) -> Self {
        Self::anonymous()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Some(id) => write!(f, "user:{id}"),
            None => f.write_str("anonymous"),
        }
    }
}
