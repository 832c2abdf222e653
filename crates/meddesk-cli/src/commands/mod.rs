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

pub mod admin;
pub mod directory;
pub mod inspect;
pub mod matrix;

use anyhow::{Context, Result};
use meddesk_access::{AccessError, Config};
use meddesk_access::rbac::{AccessController, AuditLogger, PermissionAdmin};
use meddesk_access::users::InMemoryUserStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct CommandContext {
    pub config: Config,
    pub users_file: PathBuf,
    pub store: Arc<InMemoryUserStore>,
    pub audit_logger: Arc<AuditLogger>,
}

impl CommandContext {
    /// Load the user directory named on the command line or in the environment
    pub async fn load(config: Config, users_file: Option<PathBuf>) -> Result<Self> {
        let Some(users_file) = users_file.or_else(|| config.users_file.clone()) else {
            return Err(AccessError::Config {
                message: "no user directory given; pass --users or set MEDDESK_USERS_FILE".to_string(),
            }
            .into());
        };

        let store = InMemoryUserStore::load_json_file(&users_file).await.with_context(|| format!("failed to load user directory {}", users_file.display()))?;
        let audit_file = config.audit_file.clone().unwrap_or_else(|| default_audit_file(&users_file));
        let audit_logger = AuditLogger::open_journal(&audit_file, config.audit_max_events)
            .await
            .with_context(|| format!("failed to open audit journal {}", audit_file.display()))?;

        debug!(path = %users_file.display(), audit = %audit_file.display(), "Command context ready");
        Ok(Self {
            config,
            users_file,
            store: Arc::new(store),
            audit_logger: Arc::new(audit_logger),
        })
    }

    pub fn controller(&self) -> AccessController<InMemoryUserStore> {
        AccessController::with_config(Arc::clone(&self.store), self.config.clone()).with_audit_logger(Arc::clone(&self.audit_logger))
    }

    pub fn admin(&self) -> PermissionAdmin<InMemoryUserStore> {
        PermissionAdmin::new(Arc::clone(&self.store), self.config.clone()).with_audit_logger(Arc::clone(&self.audit_logger))
    }

    /// Write the directory back after a change
    pub async fn persist(&self) -> Result<()> {
        self.store.save_json_file(&self.users_file).await.with_context(|| format!("failed to write user directory {}", self.users_file.display()))
    }
}

/// `users.json` journals to `users.audit.jsonl` alongside it
fn default_audit_file(users_file: &Path) -> PathBuf {
    users_file.with_extension("audit.jsonl")
}
