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

//! MedDesk access engine
//!
//! Decides what a console user may see or do from their role, department,
//! account status and custom permission grants.
//!
//! ```no_run
//! use meddesk_access::rbac::{AccessController, AccessRequest};
//! use meddesk_access::session::Session;
//! use meddesk_access::users::InMemoryUserStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryUserStore::load_json_file("users.json").await?);
//! let controller = AccessController::new(store);
//!
//! let request = AccessRequest::new().permission("devices:update".parse()?);
//! let decision = controller.evaluate(&Session::authenticated("uid-1"), &request).await;
//! println!("allowed: {} {}", decision.allowed, decision.reason);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod rbac;
pub mod session;
pub mod users;

pub use config::Config;
pub use error::{AccessError, AccessResult, Denial, StoreError};
