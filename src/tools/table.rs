//! Table tools.
//!
//! Tools: td_list_tables

use serde_json::{json, Map, Value as JsonValue};

use crate::client::TdClient;
use crate::error::{Result, TdError};
use crate::schema;
use crate::tools::{get_bool_arg, get_list_params, get_string_arg, ToolDef};

/// Get all table tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![ToolDef::new(
        "td_list_tables",
        "List tables in a Treasure Data database. Returns table names by default; set \
         verbose=true for full details including the parsed column schema. Supports \
         pagination via limit/offset, or all_results=true for the complete list.",
        schema!(object {
            required: { "database_name": string },
            optional: {
                "verbose": boolean,
                "limit": integer,
                "offset": integer,
                "all_results": boolean
            }
        }),
    )]
}

/// Dispatch a table tool call.
pub async fn dispatch(
    client: &TdClient,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "td_list_tables" => {
            let database_name = get_string_arg(&args, "database_name")?;
            if database_name.trim().is_empty() {
                return Err(TdError::InvalidArg {
                    name: "database_name".to_string(),
                    reason: "database name cannot be empty".to_string(),
                });
            }

            // The table listing endpoint answers an empty list for unknown
            // databases, so check existence explicitly to report it.
            if client.get_database(&database_name).await?.is_none() {
                return Err(TdError::InvalidArg {
                    name: "database_name".to_string(),
                    reason: format!("database '{}' not found", database_name),
                });
            }

            let params = get_list_params(&args)?;
            let tables = client.list_tables(&database_name, params).await?;

            if get_bool_arg(&args, "verbose") {
                let detailed: Vec<JsonValue> = tables
                    .iter()
                    .map(|table| {
                        let mut value = json!(table);
                        // The raw schema string stays; parsed columns are an
                        // add-on, omitted when the descriptor is malformed.
                        if let Ok(columns) = table.columns() {
                            value["columns"] = json!(columns);
                        }
                        value
                    })
                    .collect();
                Ok(json!({ "database": database_name, "tables": detailed }))
            } else {
                let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
                Ok(json!({ "database": database_name, "tables": names }))
            }
        }

        _ => Err(TdError::UnknownTool(name.to_string())),
    }
}
