//! Project search tools.
//!
//! Tools: td_find_project, td_get_project_by_name

use std::collections::BTreeMap;

use serde_json::{json, Map, Value as JsonValue};

use crate::client::{ListParams, TdClient};
use crate::error::{Result, TdError};
use crate::models::Project;
use crate::schema;
use crate::tools::{get_string_arg, ToolDef};

/// Fetch size for the workflow fallback phase of td_find_project.
const FALLBACK_FETCH_COUNT: usize = 1_000;

/// Get all search tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "td_find_project",
            "Find workflow projects by name (exact match first, then substring, \
             case-insensitive). When the project listing has no match, falls back \
             to scanning workflows for projects only visible there; such results \
             carry \"source\": \"workflows\" and a per-project workflow count.",
            schema!(object {
                required: { "name": string }
            }),
        ),
        ToolDef::new(
            "td_get_project_by_name",
            "Get full details of a workflow project by its exact name \
             (case-insensitive). Combines name lookup with the detail fetch, so \
             the caller does not need the numeric project id. Returns a null \
             project when no project has that name.",
            schema!(object {
                required: { "name": string }
            }),
        ),
    ]
}

/// Dispatch a search tool call.
pub async fn dispatch(
    client: &TdClient,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "td_find_project" => {
            let target = require_name(&args)?;
            let needle = target.to_lowercase();

            let projects = client.list_projects(ListParams::all()).await?;
            let matches = match_by_name(&projects, &needle);
            if !matches.is_empty() {
                let found: Vec<JsonValue> = matches
                    .iter()
                    .map(|p| {
                        json!({
                            "id": p.id,
                            "name": p.name,
                            "created_at": p.created_at,
                            "updated_at": p.updated_at,
                        })
                    })
                    .collect();
                return Ok(json!({
                    "found": true,
                    "count": found.len(),
                    "projects": found,
                }));
            }

            // Some projects only surface through their workflows, so scan
            // those before declaring the name missing.
            let workflows = client.list_workflows(FALLBACK_FETCH_COUNT).await?;
            let mut by_project: BTreeMap<String, (String, usize)> = BTreeMap::new();
            for w in &workflows {
                let project = w.project.name.to_lowercase();
                if project == needle || project.contains(&needle) {
                    let entry = by_project
                        .entry(w.project.id.clone())
                        .or_insert_with(|| (w.project.name.clone(), 0));
                    entry.1 += 1;
                }
            }

            if by_project.is_empty() {
                return Ok(json!({
                    "found": false,
                    "count": 0,
                    "message": format!("No project matching '{}' found", target),
                }));
            }

            let found: Vec<JsonValue> = by_project
                .iter()
                .map(|(id, (name, count))| {
                    json!({ "id": id, "name": name, "workflow_count": count })
                })
                .collect();
            Ok(json!({
                "found": true,
                "count": found.len(),
                "source": "workflows",
                "projects": found,
            }))
        }

        "td_get_project_by_name" => {
            let target = require_name(&args)?;
            let needle = target.to_lowercase();

            let projects = client.list_projects(ListParams::all()).await?;
            let hit = projects.iter().find(|p| p.name.to_lowercase() == needle);

            match hit {
                Some(p) => match client.get_project(&p.id).await? {
                    Some(project) => Ok(json!({ "project": project })),
                    None => Ok(not_found(&target)),
                },
                None => Ok(not_found(&target)),
            }
        }

        _ => Err(TdError::UnknownTool(name.to_string())),
    }
}

fn require_name(args: &Map<String, JsonValue>) -> Result<String> {
    let name = get_string_arg(args, "name")?;
    if name.is_empty() {
        return Err(TdError::InvalidArg {
            name: "name".to_string(),
            reason: "project name must not be empty".to_string(),
        });
    }
    Ok(name)
}

/// Exact matches win; fall back to substring matches only when there are none.
fn match_by_name<'a>(projects: &'a [Project], needle: &str) -> Vec<&'a Project> {
    let exact: Vec<&Project> = projects
        .iter()
        .filter(|p| p.name.to_lowercase() == needle)
        .collect();
    if !exact.is_empty() {
        return exact;
    }
    projects
        .iter()
        .filter(|p| p.name.to_lowercase().contains(needle))
        .collect()
}

fn not_found(target: &str) -> JsonValue {
    json!({
        "project": JsonValue::Null,
        "message": format!("Project '{}' not found", target),
    })
}
