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

use super::CommandContext;
use anyhow::{Result, anyhow};
use meddesk_access::rbac::{AccessRequest, Permission, Role, describe, explain};
use meddesk_access::session::Session;
use meddesk_access::users::UserStore;

pub fn build_request(permission: Option<Permission>, permissions: Vec<Permission>, require_all: bool, role: Option<Role>, min_role: Option<Role>) -> AccessRequest {
    AccessRequest {
        permission,
        permissions,
        require_all,
        role,
        min_role_level: min_role,
    }
}

/// Print the source breakdown of every permission for one user
pub async fn explain_user(ctx: &CommandContext, user_id: &str) -> Result<()> {
    let profile = ctx.store.fetch_user_profile(user_id).await?.ok_or_else(|| anyhow!("user {user_id} not found"))?;

    println!("User:       {} <{}>", profile.display_name(), profile.email);
    println!("Role:       {}", profile.role);
    println!("Department: {}", profile.department);
    println!("Status:     {}", profile.status);
    println!();

    let grants: Vec<_> = explain(&profile).into_iter().filter(|g| g.is_granted()).collect();
    if grants.is_empty() {
        println!("No permissions granted.");
        return Ok(());
    }

    println!("{:<22} {:<6} {:<6} {:<7} {:<10} {}", "Permission", "Role", "Dept", "Custom", "Effective", "Description");
    println!("{}", "-".repeat(90));

    let mark = |granted: bool| if granted { "x" } else { "" };
    for grant in &grants {
        println!(
            "{:<22} {:<6} {:<6} {:<7} {:<10} {}",
            grant.permission.to_string(),
            mark(grant.from_role),
            mark(grant.from_department),
            mark(grant.custom),
            if grant.effective { "yes" } else { "no" },
            describe(grant.permission)
        );
    }

    if !profile.is_active() {
        println!();
        println!("Account is {}: no permission is effective.", profile.status);
    }

    Ok(())
}

/// Evaluate a request and print the decision. Returns whether access was allowed.
pub async fn check_access(ctx: &CommandContext, user_id: Option<&str>, request: &AccessRequest, json: bool) -> Result<bool> {
    let session = user_id.map(Session::authenticated).unwrap_or_default();
    let decision = ctx.controller().evaluate(&session, request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else if decision.allowed {
        println!("ALLOWED");
    } else {
        println!("DENIED ({}): {}", decision.outcome(), decision.reason);
    }

    Ok(decision.allowed)
}
