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

//! User store contract and an in-memory implementation

use crate::error::StoreError;
use crate::users::models::UserProfile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Access to persisted user profiles.
///
/// The hosted table store sits behind this trait; the access engine never
/// talks to it directly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a profile by user ID
    async fn fetch_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// List every profile
    async fn list_user_profiles(&self) -> Result<Vec<UserProfile>, StoreError>;

    /// Insert or replace a profile
    async fn save_user_profile(&self, profile: UserProfile) -> Result<(), StoreError>;
}

/// User store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with profiles
    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let profiles = profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { profiles: RwLock::new(profiles) }
    }

    /// Load a JSON array of profiles. Duplicate IDs are rejected.
    pub async fn load_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let entries: Vec<UserProfile> = serde_json::from_str(&raw)?;

        let mut profiles = HashMap::with_capacity(entries.len());
        for profile in entries {
            if profiles.contains_key(&profile.id) {
                return Err(StoreError::InvalidRecord {
                    user_id: profile.id,
                    message: "duplicate user id".to_string(),
                });
            }
            profiles.insert(profile.id.clone(), profile);
        }

        info!(path = %path.as_ref().display(), user_count = profiles.len(), "User directory loaded");
        Ok(Self { profiles: RwLock::new(profiles) })
    }

    /// Write all profiles as a JSON array, ordered by ID
    pub async fn save_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let mut profiles = self.list_user_profiles().await?;
        profiles.sort_by(|a, b| a.id.cmp(&b.id));

        let json = serde_json::to_string_pretty(&profiles)?;
        tokio::fs::write(path.as_ref(), json).await?;

        debug!(path = %path.as_ref().display(), user_count = profiles.len(), "User directory written");
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn list_user_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        Ok(self.profiles.read().await.values().cloned().collect())
    }

    async fn save_user_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.profiles.write().await.insert(profile.id.clone(), profile);
        Ok(())
    }
}
