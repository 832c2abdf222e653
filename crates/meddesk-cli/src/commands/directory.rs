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
use meddesk_access::rbac::AuditEvent;
use meddesk_access::users::UserFilter;

/// Print the user directory, filtered
pub async fn list_users(ctx: &CommandContext, filter: &UserFilter, json: bool) -> Result<()> {
    let users = ctx.admin().list_users(filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No matching users.");
        return Ok(());
    }

    println!("{:<20} {:<28} {:<32} {:<11} {:<15} {}", "ID", "Name", "Email", "Role", "Department", "Status");
    println!("{}", "-".repeat(116));

    for user in &users {
        println!(
            "{:<20} {:<28} {:<32} {:<11} {:<15} {}",
            user.id,
            user.display_name(),
            user.email,
            user.role.as_str(),
            user.department.as_str(),
            user.status.as_str()
        );
    }

    println!();
    println!("{} user(s)", users.len());
    Ok(())
}

/// Print recorded activity, newest first
pub async fn show_activity(ctx: &CommandContext, user_id: Option<&str>, limit: usize, json: bool) -> Result<()> {
    let events = match user_id {
        Some(user_id) => ctx.audit_logger.get_user_events(user_id, Some(limit)).await,
        None => ctx.audit_logger.get_events(Some(limit)).await,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No recorded activity.");
        return Ok(());
    }

    for event in &events {
        print_event(event);
    }

    Ok(())
}

fn print_event(event: &AuditEvent) {
    let target = event.target_user.as_deref().map(|t| format!(" -> {t}")).unwrap_or_default();

    println!(
        "{}  {:<20} {:<9} {}{}  {}",
        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
        format!("{:?}", event.event_type),
        format!("{:?}", event.result),
        event.actor,
        target,
        event.description
    );
}
