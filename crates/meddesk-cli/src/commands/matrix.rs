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

use meddesk_access::rbac::{Department, Role, all_permissions, department_permissions, describe, role_permissions};

/// Print every catalog permission with the roles and departments granting it
pub fn print_matrix(role: Option<Role>, department: Option<Department>) {
    let role_sets: Vec<_> = Role::ALL.iter().map(|r| role_permissions(*r)).collect();
    let department_sets: Vec<_> = Department::ALL.iter().map(|d| department_permissions(*d)).collect();
    let role_filter = role.map(role_permissions);
    let department_filter = department.map(department_permissions);

    println!("{:<22} {:<12} {:<12} {:<12} {:<12} {:<36} {}", "Permission", "viewer", "technician", "manager", "admin", "Departments", "Description");
    println!("{}", "-".repeat(140));

    for permissions in all_permissions().into_values() {
        let mut printed = false;

        for permission in permissions {
            if role_filter.as_ref().is_some_and(|set| !set.contains(&permission)) {
                continue;
            }
            if department_filter.as_ref().is_some_and(|set| !set.contains(&permission)) {
                continue;
            }

            let marks: Vec<&str> = role_sets.iter().map(|set| if set.contains(&permission) { "yes" } else { "-" }).collect();
            let departments: Vec<&str> = Department::ALL.iter().zip(&department_sets).filter(|(_, set)| set.contains(&permission)).map(|(d, _)| d.as_str()).collect();

            println!(
                "{:<22} {:<12} {:<12} {:<12} {:<12} {:<36} {}",
                permission.to_string(),
                marks[0],
                marks[1],
                marks[2],
                marks[3],
                if departments.is_empty() { "-".to_string() } else { departments.join(",") },
                describe(permission)
            );
            printed = true;
        }

        if printed {
            println!();
        }
    }
}
