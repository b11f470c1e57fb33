//! Tool registry and argument helpers.
//!
//! Provides the infrastructure for registering and dispatching MCP tools.
//! Handlers are pure functions receiving an explicit [`TdClient`]; nothing
//! here holds state between calls.

pub mod archive;
pub mod database;
pub mod project;
pub mod search;
pub mod table;
pub mod workflow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::client::{ListParams, TdClient, DEFAULT_LIMIT};
use crate::error::{Result, TdError};

/// A tool definition for the MCP tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (e.g., "td_list_databases")
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonValue,
}

impl ToolDef {
    /// Create a new tool definition.
    pub fn new(name: &str, description: &str, input_schema: JsonValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Registry of all available tools.
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    /// Create a new registry with all tools registered.
    pub fn new() -> Self {
        let mut tools = Vec::new();

        tools.extend(database::tools());
        tools.extend(table::tools());
        tools.extend(project::tools());
        tools.extend(workflow::tools());
        tools.extend(search::tools());
        tools.extend(archive::tools());

        Self { tools }
    }

    /// Get all tool definitions.
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    /// Dispatch a tool call to the appropriate handler.
    pub async fn dispatch(
        &self,
        client: &TdClient,
        name: &str,
        args: Map<String, JsonValue>,
    ) -> Result<JsonValue> {
        match name {
            "td_list_databases" | "td_get_database" => {
                database::dispatch(client, name, args).await
            }
            "td_list_tables" => table::dispatch(client, name, args).await,
            "td_list_projects" | "td_get_project" => project::dispatch(client, name, args).await,
            "td_list_workflows" | "td_find_workflow" => {
                workflow::dispatch(client, name, args).await
            }
            "td_find_project" | "td_get_project_by_name" => {
                search::dispatch(client, name, args).await
            }
            "td_download_project_archive" | "td_list_project_files" | "td_read_project_file" => {
                archive::dispatch(client, name, args).await
            }
            _ => Err(TdError::UnknownTool(name.to_string())),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to get a required string argument from JSON arguments.
pub fn get_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| TdError::MissingArg(name.to_string()))
}

/// Helper to get an optional string argument; absent and null both map to None.
pub fn get_optional_string(args: &Map<String, JsonValue>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Helper to get an optional boolean argument, defaulting to false.
pub fn get_bool_arg(args: &Map<String, JsonValue>, name: &str) -> bool {
    args.get(name).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Helper to get an optional non-negative integer argument.
pub fn get_optional_usize(args: &Map<String, JsonValue>, name: &str) -> Result<Option<usize>> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => v.as_u64().map(|n| Some(n as usize)).ok_or_else(|| {
            TdError::InvalidArg {
                name: name.to_string(),
                reason: "expected a non-negative integer".to_string(),
            }
        }),
    }
}

/// Extract the shared pagination arguments: `limit`, `offset`, `all_results`.
pub fn get_list_params(args: &Map<String, JsonValue>) -> Result<ListParams> {
    Ok(ListParams {
        limit: get_optional_usize(args, "limit")?.unwrap_or(DEFAULT_LIMIT),
        offset: get_optional_usize(args, "offset")?.unwrap_or(0),
        all_results: get_bool_arg(args, "all_results"),
    })
}

/// Helper macro for creating JSON Schema for tool input parameters.
#[macro_export]
macro_rules! schema {
    // Object with required and optional properties
    (object {
        required: { $($req_name:literal : $req_type:tt),* $(,)? },
        optional: { $($opt_name:literal : $opt_type:tt),* $(,)? }
    }) => {{
        // Typed so the zero-required expansions still infer.
        let mut required: Vec<&str> = Vec::new();
        $(required.push($req_name);)*

        let mut props = serde_json::Map::new();
        $(props.insert($req_name.to_string(), schema!(@type $req_type));)*
        $(props.insert($opt_name.to_string(), schema!(@type $opt_type));)*

        serde_json::json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }};

    // Object with only required properties
    (object {
        required: { $($req_name:literal : $req_type:tt),* $(,)? }
    }) => {{
        schema!(object { required: { $($req_name : $req_type),* }, optional: {} })
    }};

    // Object with only optional properties
    (object {
        optional: { $($opt_name:literal : $opt_type:tt),* $(,)? }
    }) => {{
        schema!(object { required: {}, optional: { $($opt_name : $opt_type),* } })
    }};

    // Type mappings
    (@type string) => { serde_json::json!({"type": "string"}) };
    (@type integer) => { serde_json::json!({"type": "integer"}) };
    (@type boolean) => { serde_json::json!({"type": "boolean"}) };
}
