//! Workflow tools.
//!
//! Tools: td_list_workflows, td_find_workflow

use serde_json::{json, Map, Value as JsonValue};

use crate::client::TdClient;
use crate::error::{Result, TdError};
use crate::models::Workflow;
use crate::schema;
use crate::tools::{get_bool_arg, get_optional_string, get_optional_usize, get_string_arg, ToolDef};

/// Default number of workflows fetched by td_list_workflows.
const DEFAULT_WORKFLOW_COUNT: usize = 50;

/// Hard cap on how many workflows one call fetches.
const MAX_WORKFLOW_COUNT: usize = 12_000;

/// Fetch size used when searching for a workflow by name.
const SEARCH_FETCH_COUNT: usize = 1_000;

/// Get all workflow tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "td_list_workflows",
            "List workflows with their last execution status. Returns a summary \
             per workflow by default; set verbose=true for recent session details. \
             Filter with status_filter (\"success\", \"error\", \"running\") or \
             search (substring match on workflow and project names). Workflows in \
             system-generated projects are hidden unless include_system=true.",
            schema!(object {
                optional: {
                    "verbose": boolean,
                    "count": integer,
                    "include_system": boolean,
                    "status_filter": string,
                    "search": string
                }
            }),
        ),
        ToolDef::new(
            "td_find_workflow",
            "Find workflows by name (exact match first, then substring). Optionally \
             narrow by project_name (substring) and status_filter on the latest run. \
             Returns matching workflows with their project and latest session.",
            schema!(object {
                required: { "name": string },
                optional: {
                    "project_name": string,
                    "status_filter": string
                }
            }),
        ),
    ]
}

/// Dispatch a workflow tool call.
pub async fn dispatch(
    client: &TdClient,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "td_list_workflows" => {
            let count = get_optional_usize(&args, "count")?
                .unwrap_or(DEFAULT_WORKFLOW_COUNT)
                .min(MAX_WORKFLOW_COUNT);
            let mut workflows = client.list_workflows(count).await?;

            if !get_bool_arg(&args, "include_system") {
                workflows.retain(|w| !w.project.is_system());
            }
            if let Some(status) = get_optional_string(&args, "status_filter") {
                workflows.retain(|w| w.last_status() == Some(status.as_str()));
            }
            if let Some(search) = get_optional_string(&args, "search") {
                let needle = search.to_lowercase();
                workflows.retain(|w| {
                    w.name.to_lowercase().contains(&needle)
                        || w.project.name.to_lowercase().contains(&needle)
                });
            }

            let verbose = get_bool_arg(&args, "verbose");
            let rendered: Vec<JsonValue> = workflows
                .iter()
                .map(|w| {
                    if verbose {
                        verbose_workflow(w)
                    } else {
                        summary_workflow(w)
                    }
                })
                .collect();

            Ok(json!({
                "workflows": rendered,
                "total_count": rendered.len(),
            }))
        }

        "td_find_workflow" => {
            let target = get_string_arg(&args, "name")?;
            if target.is_empty() {
                return Err(TdError::InvalidArg {
                    name: "name".to_string(),
                    reason: "workflow name must not be empty".to_string(),
                });
            }
            let project_name = get_optional_string(&args, "project_name");
            let status_filter = get_optional_string(&args, "status_filter");

            let mut workflows = client.list_workflows(SEARCH_FETCH_COUNT).await?;

            if let Some(project) = &project_name {
                let needle = project.to_lowercase();
                workflows.retain(|w| w.project.name.to_lowercase().contains(&needle));
            }
            if let Some(status) = &status_filter {
                workflows.retain(|w| w.last_status() == Some(status.as_str()));
            }

            let needle = target.to_lowercase();
            let mut matches: Vec<&Workflow> = workflows
                .iter()
                .filter(|w| w.name.to_lowercase() == needle)
                .collect();
            if matches.is_empty() {
                matches = workflows
                    .iter()
                    .filter(|w| w.name.to_lowercase().contains(&needle))
                    .collect();
            }

            if matches.is_empty() {
                return Ok(json!({
                    "found": false,
                    "count": 0,
                    "message": format!("No workflow matching '{}' found", target),
                }));
            }

            let found: Vec<JsonValue> = matches.iter().map(|w| found_workflow(w)).collect();
            Ok(json!({
                "found": true,
                "count": found.len(),
                "workflows": found,
            }))
        }

        _ => Err(TdError::UnknownTool(name.to_string())),
    }
}

/// One-line summary used by the non-verbose listing.
fn summary_workflow(w: &Workflow) -> JsonValue {
    json!({
        "id": w.id,
        "name": w.name,
        "project": w.project.name,
        "last_status": w.last_status().unwrap_or("no_runs"),
        "scheduled": w.is_scheduled(),
    })
}

/// Verbose listing entry with the three most recent sessions.
fn verbose_workflow(w: &Workflow) -> JsonValue {
    let sessions: Vec<JsonValue> = w
        .latest_sessions
        .iter()
        .take(3)
        .map(|s| {
            json!({
                "session_time": s.session_time,
                "status": s.last_attempt.status,
                "success": s.last_attempt.success,
            })
        })
        .collect();

    json!({
        "id": w.id,
        "name": w.name,
        "project": { "id": w.project.id, "name": w.project.name },
        "timezone": w.timezone,
        "scheduled": w.is_scheduled(),
        "sessions": sessions,
    })
}

/// Match entry returned by td_find_workflow, latest session only.
fn found_workflow(w: &Workflow) -> JsonValue {
    let latest = w.latest_sessions.first().map(|s| {
        json!({
            "session_time": s.session_time,
            "status": s.last_attempt.status,
            "success": s.last_attempt.success,
        })
    });

    json!({
        "id": w.id,
        "name": w.name,
        "project": { "id": w.project.id, "name": w.project.name },
        "timezone": w.timezone,
        "scheduled": w.is_scheduled(),
        "latest_session": latest,
    })
}
