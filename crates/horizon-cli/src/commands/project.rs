use anyhow::Result;
use comfy_table::{Cell, Table};
use horizon_models::{MessageRole, Project};
use horizon_storage::{SimpleStorage, Storage};
use serde_json::json;
use std::path::PathBuf;

use crate::cli::ProjectCommands;
use crate::commands::utils::{format_timestamp, preview_text, resolve_project, short_id};
use crate::output::{OutputFormat, json::print_json};

pub fn run(storage: &Storage, command: ProjectCommands, format: OutputFormat) -> Result<()> {
    match command {
        ProjectCommands::New { name } => create_project(storage, name, format),
        ProjectCommands::List => list_projects(storage, format),
        ProjectCommands::Show { id } => show_project(storage, &id, format),
        ProjectCommands::Delete { id } => delete_project(storage, &id, format),
        ProjectCommands::Export { id, output } => export_project(storage, &id, output, format),
        ProjectCommands::Clear { id } => clear_project(storage, &id, format),
    }
}

/// Create and persist a project, naming it "Project N" when no name is given.
pub fn new_project(storage: &Storage, name: Option<String>) -> Result<Project> {
    let name = match name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => Project::default_name(storage.projects.count()?),
    };
    let project = Project::new(name);
    storage.projects.save(&project)?;
    tracing::info!(project_id = %project.id, name = %project.name, "Created project");
    Ok(project)
}

fn create_project(storage: &Storage, name: Option<String>, format: OutputFormat) -> Result<()> {
    let project = new_project(storage, name)?;

    if format.is_json() {
        return print_json(&project);
    }

    println!("Created project: {} ({})", project.name, project.id);
    Ok(())
}

fn list_projects(storage: &Storage, format: OutputFormat) -> Result<()> {
    let projects = storage.projects.list()?;

    if format.is_json() {
        let summaries: Vec<_> = projects
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "name": p.name,
                    "messageCount": p.messages.len(),
                    "createdAt": p.created_at,
                    "updatedAt": p.updated_at,
                })
            })
            .collect();
        return print_json(&summaries);
    }

    if projects.is_empty() {
        println!("No projects yet. Create one with: horizon project new");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Messages", "Code", "Updated"]);

    for project in projects {
        table.add_row(vec![
            Cell::new(short_id(&project.id)),
            Cell::new(&project.name),
            Cell::new(project.messages.len()),
            Cell::new(format!("{} B", project.html_code.len())),
            Cell::new(format_timestamp(Some(project.updated_at))),
        ]);
    }

    crate::output::table::print_table(table)
}

fn show_project(storage: &Storage, id: &str, format: OutputFormat) -> Result<()> {
    let project = resolve_project(storage, id)?;

    if format.is_json() {
        return print_json(&project);
    }

    println!("Project: {} ({})", project.name, project.id);
    println!("Messages: {}", project.messages.len());
    println!("Code: {} bytes", project.html_code.len());
    println!("Created: {}", format_timestamp(Some(project.created_at)));
    println!("Updated: {}", format_timestamp(Some(project.updated_at)));
    println!();

    for msg in &project.messages {
        let role = match msg.role {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        };

        println!("{} [{}]", role, format_timestamp(Some(msg.timestamp)));
        println!("{}", preview_text(&msg.content, 200));
        println!();
    }

    Ok(())
}

fn delete_project(storage: &Storage, id: &str, format: OutputFormat) -> Result<()> {
    let resolved = match storage.projects.resolve_id(id)? {
        Some(id) => id,
        None => {
            if format.is_json() {
                return print_json(&json!({ "deleted": false, "id": id }));
            }
            println!("Project not found: {}", id);
            return Ok(());
        }
    };

    let deleted = storage.projects.delete(&resolved)?;
    if deleted {
        tracing::info!(project_id = %resolved, "Deleted project");
    }

    if format.is_json() {
        return print_json(&json!({
            "deleted": deleted,
            "id": resolved,
        }));
    }

    if deleted {
        println!("Deleted project: {}", resolved);
    } else {
        println!("Project not found: {}", resolved);
    }

    Ok(())
}

fn export_project(
    storage: &Storage,
    id: &str,
    output: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let project = resolve_project(storage, id)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(export_file_name(&project.name)));

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &project.html_code)?;

    if format.is_json() {
        return print_json(&json!({
            "id": project.id,
            "path": path.display().to_string(),
            "bytes": project.html_code.len(),
        }));
    }

    println!("Exported {} to {}", project.name, path.display());
    Ok(())
}

fn clear_project(storage: &Storage, id: &str, format: OutputFormat) -> Result<()> {
    let mut project = resolve_project(storage, id)?;
    let cleared = project.messages.len();
    project.clear_messages();
    storage.projects.save(&project)?;

    if format.is_json() {
        return print_json(&json!({ "id": project.id, "cleared": cleared }));
    }

    println!("Cleared {} messages from {}", cleared, project.name);
    Ok(())
}

/// File name for an export: the project name reduced to `[a-z0-9-]`.
fn export_file_name(name: &str) -> String {
    let mut slug = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "project.html".to_string()
    } else {
        format!("{slug}.html")
    }
}
