//! Database tools.
//!
//! Tools: td_list_databases, td_get_database

use serde_json::{json, Map, Value as JsonValue};

use crate::client::TdClient;
use crate::error::{Result, TdError};
use crate::schema;
use crate::tools::{get_bool_arg, get_list_params, get_string_arg, ToolDef};

/// Get all database tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "td_list_databases",
            "List Treasure Data databases. Returns database names by default; set \
             verbose=true for full details. Supports pagination via limit/offset, or \
             all_results=true for the complete list.",
            schema!(object {
                optional: {
                    "verbose": boolean,
                    "limit": integer,
                    "offset": integer,
                    "all_results": boolean
                }
            }),
        ),
        ToolDef::new(
            "td_get_database",
            "Get detailed information about a specific database, including row count, \
             permission level, and delete protection. Returns a null database when the \
             name does not exist.",
            schema!(object {
                required: { "database_name": string }
            }),
        ),
    ]
}

/// Dispatch a database tool call.
pub async fn dispatch(
    client: &TdClient,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "td_list_databases" => {
            let params = get_list_params(&args)?;
            let databases = client.list_databases(params).await?;

            if get_bool_arg(&args, "verbose") {
                Ok(json!({ "databases": databases }))
            } else {
                let names: Vec<&str> = databases.iter().map(|db| db.name.as_str()).collect();
                Ok(json!({ "databases": names }))
            }
        }

        "td_get_database" => {
            let database_name = get_string_arg(&args, "database_name")?;
            if database_name.trim().is_empty() {
                return Err(TdError::InvalidArg {
                    name: "database_name".to_string(),
                    reason: "database name cannot be empty".to_string(),
                });
            }

            // Absence is a branchable result, not an error.
            match client.get_database(&database_name).await? {
                Some(database) => Ok(json!({ "database": database })),
                None => Ok(json!({
                    "database": JsonValue::Null,
                    "message": format!("Database '{}' not found", database_name),
                })),
            }
        }

        _ => Err(TdError::UnknownTool(name.to_string())),
    }
}
