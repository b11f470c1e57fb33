//! CLI output formatting.
//!
//! Renders listing results either as a plain-text table or as pretty JSON.
//! Rendering is kept apart from printing so the formatters are testable.

use clap::ValueEnum;

use crate::error::Result;
use crate::models::{Database, Project, Table};

/// Output format for CLI subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    Table,
    /// Pretty-printed JSON.
    Json,
}

/// Render a database listing.
pub fn render_databases(
    databases: &[Database],
    verbose: bool,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            if verbose {
                Ok(serde_json::to_string_pretty(databases)?)
            } else {
                let names: Vec<&str> = databases.iter().map(|db| db.name.as_str()).collect();
                Ok(serde_json::to_string_pretty(&names)?)
            }
        }
        OutputFormat::Table => {
            if databases.is_empty() {
                return Ok("No databases found.".to_string());
            }
            if !verbose {
                return Ok(databases
                    .iter()
                    .map(|db| db.name.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"));
            }
            let headers = ["Name", "Rows", "Created", "Updated", "Permission", "Protected"];
            let rows: Vec<Vec<String>> = databases
                .iter()
                .map(|db| {
                    vec![
                        db.name.clone(),
                        db.count.to_string(),
                        db.created_at.clone(),
                        db.updated_at.clone(),
                        db.permission.clone(),
                        yes_no(db.delete_protected),
                    ]
                })
                .collect();
            Ok(render_table(&headers, &rows))
        }
    }
}

/// Render one database as key-value lines or JSON.
pub fn render_database(database: &Database, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(database)?),
        OutputFormat::Table => {
            let mut lines = vec![
                format!("Name: {}", database.name),
                format!("Rows: {}", database.count),
                format!("Created: {}", database.created_at),
                format!("Updated: {}", database.updated_at),
                format!("Permission: {}", database.permission),
                format!("Protected: {}", yes_no(database.delete_protected)),
            ];
            if let Some(org) = &database.organization {
                lines.push(format!("Organization: {}", org));
            }
            Ok(lines.join("\n"))
        }
    }
}

/// Render a table listing.
pub fn render_tables(tables: &[Table], verbose: bool, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            if verbose {
                Ok(serde_json::to_string_pretty(tables)?)
            } else {
                let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
                Ok(serde_json::to_string_pretty(&names)?)
            }
        }
        OutputFormat::Table => {
            if tables.is_empty() {
                return Ok("No tables found.".to_string());
            }
            if !verbose {
                return Ok(tables
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"));
            }
            let headers = ["Name", "Type", "Rows", "Size (bytes)", "Created", "Updated", "Protected"];
            let rows: Vec<Vec<String>> = tables
                .iter()
                .map(|t| {
                    vec![
                        t.name.clone(),
                        t.table_type.clone(),
                        t.count.to_string(),
                        t.estimated_storage_size.to_string(),
                        t.created_at.clone(),
                        t.updated_at.clone(),
                        yes_no(t.delete_protected),
                    ]
                })
                .collect();
            Ok(render_table(&headers, &rows))
        }
    }
}

/// Render a workflow project listing.
pub fn render_projects(
    projects: &[Project],
    verbose: bool,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            if verbose {
                Ok(serde_json::to_string_pretty(projects)?)
            } else {
                let brief: Vec<serde_json::Value> = projects
                    .iter()
                    .map(|p| serde_json::json!({ "id": p.id, "name": p.name }))
                    .collect();
                Ok(serde_json::to_string_pretty(&brief)?)
            }
        }
        OutputFormat::Table => {
            if projects.is_empty() {
                return Ok("No projects found.".to_string());
            }
            if !verbose {
                return Ok(projects
                    .iter()
                    .map(|p| format!("{}\t{}", p.id, p.name))
                    .collect::<Vec<_>>()
                    .join("\n"));
            }
            let headers = ["Id", "Name", "Revision", "Created", "Updated"];
            let rows: Vec<Vec<String>> = projects
                .iter()
                .map(|p| {
                    vec![
                        p.id.clone(),
                        p.name.clone(),
                        p.revision.clone(),
                        p.created_at.clone(),
                        p.updated_at.clone(),
                    ]
                })
                .collect();
            Ok(render_table(&headers, &rows))
        }
    }
}

/// Render one project as key-value lines or JSON.
pub fn render_project(project: &Project, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(project)?),
        OutputFormat::Table => {
            let mut lines = vec![
                format!("Id: {}", project.id),
                format!("Name: {}", project.name),
                format!("Revision: {}", project.revision),
                format!("Created: {}", project.created_at),
                format!("Updated: {}", project.updated_at),
                format!("Archive Type: {}", project.archive_type),
                format!("Archive Md5: {}", project.archive_md5),
            ];
            for meta in &project.metadata {
                lines.push(format!("Metadata: {}={}", meta.key, meta.value));
            }
            Ok(lines.join("\n"))
        }
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let header_line = headers.join(" | ");
    let mut out = vec![header_line.clone(), "-".repeat(header_line.len())];
    for row in rows {
        out.push(row.join(" | "));
    }
    out.join("\n")
}
