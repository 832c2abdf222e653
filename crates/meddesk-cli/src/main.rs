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

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use crate::commands::CommandContext;
use anyhow::Result;
use meddesk_access::Config;
use meddesk_access::rbac::{Department, Permission, Role};
use meddesk_access::users::{UserFilter, UserStatus};
use tracing_subscriber::EnvFilter;

/// Operator CLI for MedDesk access control
#[derive(Parser, Debug)]
#[command(name = "meddesk", about = "MedDesk permission inspection and administration")]
pub struct Cli {
    /// JSON user directory (overrides $MEDDESK_USERS_FILE)
    #[arg(long, global = true)]
    pub users: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands for meddesk
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the permission catalog with role and department grants
    Matrix {
        /// Only list permissions held by this role
        #[arg(long)]
        role: Option<Role>,

        /// Only list permissions granted by this department
        #[arg(long)]
        department: Option<Department>,
    },

    /// Show where each of a user's permissions comes from
    Explain {
        /// User ID
        user: String,
    },

    /// List users, optionally filtered
    List {
        #[arg(long)]
        role: Option<Role>,

        #[arg(long)]
        department: Option<Department>,

        #[arg(long)]
        status: Option<UserStatus>,

        /// Case-insensitive match on name, email, department or role
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show recorded activity, newest first
    Activity {
        /// Only events where this user is actor or target
        user: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Evaluate an access request for a user
    Check {
        /// User ID (omit to check as an unauthenticated caller)
        user: Option<String>,

        /// Single required permission
        #[arg(long)]
        permission: Option<Permission>,

        /// Comma-separated permission list
        #[arg(long, value_delimiter = ',')]
        permissions: Vec<Permission>,

        /// Require every permission in the list instead of any one
        #[arg(long)]
        require_all: bool,

        /// Exact role required
        #[arg(long)]
        role: Option<Role>,

        /// Minimum role level required
        #[arg(long)]
        min_role: Option<Role>,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grant a custom permission
    Grant {
        user: String,
        permission: Permission,

        /// Who is making the change
        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Revoke a custom permission
    Revoke {
        user: String,
        permission: Permission,

        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Change a user's role
    SetRole {
        user: String,
        role: Role,

        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Change a user's department
    SetDepartment {
        user: String,
        department: Department,

        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Change a user's account status
    SetStatus {
        user: String,
        status: UserStatus,

        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Create a profile with the configured defaults, or record a login
    Provision {
        user: String,
        email: String,

        /// Display name (defaults to the email local part)
        #[arg(long)]
        name: Option<String>,
    },

    /// Directory counts by role, department and status
    Stats,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    // The matrix needs no user directory
    if let Commands::Matrix { role, department } = &cli.command {
        commands::matrix::print_matrix(*role, *department);
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = CommandContext::load(config, cli.users).await?;

    match cli.command {
        Commands::Matrix { .. } => {}
        Commands::Explain { user } => {
            commands::inspect::explain_user(&ctx, &user).await?;
        }
        Commands::List {
            role,
            department,
            status,
            search,
            limit,
            json,
        } => {
            let filter = UserFilter {
                role,
                department,
                status,
                search,
                limit,
            };
            commands::directory::list_users(&ctx, &filter, json).await?;
        }
        Commands::Activity { user, limit, json } => {
            commands::directory::show_activity(&ctx, user.as_deref(), limit, json).await?;
        }
        Commands::Check {
            user,
            permission,
            permissions,
            require_all,
            role,
            min_role,
            json,
        } => {
            let request = commands::inspect::build_request(permission, permissions, require_all, role, min_role);
            let allowed = commands::inspect::check_access(&ctx, user.as_deref(), &request, json).await?;
            if !allowed {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Grant { user, permission, actor } => {
            commands::admin::grant(&ctx, &actor, &user, permission).await?;
        }
        Commands::Revoke { user, permission, actor } => {
            commands::admin::revoke(&ctx, &actor, &user, permission).await?;
        }
        Commands::SetRole { user, role, actor } => {
            commands::admin::set_role(&ctx, &actor, &user, role).await?;
        }
        Commands::SetDepartment { user, department, actor } => {
            commands::admin::set_department(&ctx, &actor, &user, department).await?;
        }
        Commands::SetStatus { user, status, actor } => {
            commands::admin::set_status(&ctx, &actor, &user, status).await?;
        }
        Commands::Provision { user, email, name } => {
            commands::admin::provision(&ctx, &user, &email, name.as_deref()).await?;
        }
        Commands::Stats => {
            commands::admin::show_stats(&ctx).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
