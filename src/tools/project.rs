//! Workflow project tools.
//!
//! Tools: td_list_projects, td_get_project

use serde_json::{json, Map, Value as JsonValue};

use crate::archive::valid_project_id;
use crate::client::TdClient;
use crate::error::{Result, TdError};
use crate::schema;
use crate::tools::{get_bool_arg, get_list_params, get_string_arg, ToolDef};

/// Get all project tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "td_list_projects",
            "List workflow projects containing Digdag workflows and SQL queries. \
             Returns project ids and names by default; set verbose=true for full \
             details. System-generated projects are hidden unless \
             include_system=true.",
            schema!(object {
                optional: {
                    "verbose": boolean,
                    "limit": integer,
                    "offset": integer,
                    "all_results": boolean,
                    "include_system": boolean
                }
            }),
        ),
        ToolDef::new(
            "td_get_project",
            "Get detailed information about a workflow project, including revision \
             and archive checksum. Use the numeric project id (e.g. \"123456\"), not \
             the project name. Returns a null project when the id does not exist.",
            schema!(object {
                required: { "project_id": string }
            }),
        ),
    ]
}

/// Dispatch a project tool call.
pub async fn dispatch(
    client: &TdClient,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "td_list_projects" => {
            let params = get_list_params(&args)?;
            let mut projects = client.list_projects(params).await?;

            if !get_bool_arg(&args, "include_system") {
                projects.retain(|p| !p.is_system());
            }

            if get_bool_arg(&args, "verbose") {
                Ok(json!({ "projects": projects }))
            } else {
                let brief: Vec<JsonValue> = projects
                    .iter()
                    .map(|p| json!({ "id": p.id, "name": p.name }))
                    .collect();
                Ok(json!({ "projects": brief }))
            }
        }

        "td_get_project" => {
            let project_id = get_string_arg(&args, "project_id")?;
            if !valid_project_id(&project_id) {
                return Err(TdError::InvalidArg {
                    name: "project_id".to_string(),
                    reason: "invalid project id format".to_string(),
                });
            }

            match client.get_project(&project_id).await? {
                Some(project) => Ok(json!({ "project": project })),
                None => Ok(json!({
                    "project": JsonValue::Null,
                    "message": format!("Project with id '{}' not found", project_id),
                })),
            }
        }

        _ => Err(TdError::UnknownTool(name.to_string())),
    }
}
