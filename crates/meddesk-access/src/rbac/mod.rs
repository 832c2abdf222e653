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

//! Role-based access control for the device-management console
//!
//! - Closed permission catalog with role and department grants
//! - Pure permission resolution
//! - Async access decisions over an injected user store
//! - Guard, visibility and button adapters
//! - Custom permission administration
//! - Audit logging

pub mod access;
pub mod admin;
pub mod audit;
pub mod catalog;
pub mod guard;
pub mod resolver;
pub mod roles;

pub use access::*;
pub use admin::*;
pub use audit::*;
pub use catalog::*;
pub use guard::*;
pub use resolver::*;
pub use roles::*;
