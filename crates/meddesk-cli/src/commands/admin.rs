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
use anyhow::Result;
use meddesk_access::rbac::{Department, Permission, Role, parse_custom_permissions};
use meddesk_access::users::{UserProfile, UserStatus};

fn print_profile(profile: &UserProfile) {
    let custom = parse_custom_permissions(profile.permissions.as_deref());
    let custom: Vec<String> = custom.iter().map(Permission::key).collect();

    println!("  ID:         {}", profile.id);
    println!("  Role:       {}", profile.role);
    println!("  Department: {}", profile.department);
    println!("  Status:     {}", profile.status);
    println!("  Custom:     {}", if custom.is_empty() { "-".to_string() } else { custom.join(", ") });
}

pub async fn grant(ctx: &CommandContext, actor: &str, user_id: &str, permission: Permission) -> Result<()> {
    let profile = ctx.admin().grant_permission(actor, user_id, permission).await?;
    ctx.persist().await?;

    println!("Granted {permission}:");
    print_profile(&profile);
    Ok(())
}

pub async fn revoke(ctx: &CommandContext, actor: &str, user_id: &str, permission: Permission) -> Result<()> {
    let profile = ctx.admin().revoke_permission(actor, user_id, permission).await?;
    ctx.persist().await?;

    println!("Revoked {permission}:");
    print_profile(&profile);
    Ok(())
}

pub async fn set_role(ctx: &CommandContext, actor: &str, user_id: &str, role: Role) -> Result<()> {
    let profile = ctx.admin().change_role(actor, user_id, role).await?;
    ctx.persist().await?;

    println!("Role updated:");
    print_profile(&profile);
    Ok(())
}

pub async fn set_department(ctx: &CommandContext, actor: &str, user_id: &str, department: Department) -> Result<()> {
    let profile = ctx.admin().change_department(actor, user_id, department).await?;
    ctx.persist().await?;

    println!("Department updated:");
    print_profile(&profile);
    Ok(())
}

pub async fn set_status(ctx: &CommandContext, actor: &str, user_id: &str, status: UserStatus) -> Result<()> {
    let profile = ctx.admin().change_status(actor, user_id, status).await?;
    ctx.persist().await?;

    println!("Status updated:");
    print_profile(&profile);
    Ok(())
}

pub async fn provision(ctx: &CommandContext, user_id: &str, email: &str, name: Option<&str>) -> Result<()> {
    let profile = ctx.admin().provision_profile(user_id, email, name).await?;
    ctx.persist().await?;

    println!("Profile ready for {}:", profile.display_name());
    print_profile(&profile);
    Ok(())
}

pub async fn show_stats(ctx: &CommandContext) -> Result<()> {
    let stats = ctx.admin().user_stats().await?;

    println!("Total users: {}", stats.total);

    println!();
    println!("By role:");
    for (role, count) in &stats.by_role {
        println!("  {:<16} {}", role.as_str(), count);
    }

    println!();
    println!("By department:");
    for (department, count) in &stats.by_department {
        println!("  {:<16} {}", department.as_str(), count);
    }

    println!();
    println!("By status:");
    for (status, count) in &stats.by_status {
        println!("  {:<16} {}", status.as_str(), count);
    }

    Ok(())
}
