//! Archive inspection tools.
//!
//! Tools: td_download_project_archive, td_list_project_files,
//!        td_read_project_file

use std::path::Path;

use serde_json::{json, Map, Value as JsonValue};

use crate::archive;
use crate::client::TdClient;
use crate::error::{Result, TdError};
use crate::schema;
use crate::tools::{get_string_arg, ToolDef};

/// Get all archive tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "td_download_project_archive",
            "Download a workflow project's archive (tar.gz) to local storage and \
             return its path. The archive contains the project's SQL queries, Digdag \
             (.dig) files, and scripts. The staged file is kept until the caller \
             deletes it.",
            schema!(object {
                required: { "project_id": string }
            }),
        ),
        ToolDef::new(
            "td_list_project_files",
            "List all files contained in a previously downloaded project archive, \
             with sizes and a coarse file-type classification.",
            schema!(object {
                required: { "archive_path": string }
            }),
        ),
        ToolDef::new(
            "td_read_project_file",
            "Read the text content of one file from a previously downloaded project \
             archive, without extracting the whole archive.",
            schema!(object {
                required: { "archive_path": string, "file_path": string }
            }),
        ),
    ]
}

/// Dispatch an archive tool call.
pub async fn dispatch(
    client: &TdClient,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "td_download_project_archive" => {
            let project_id = get_string_arg(&args, "project_id")?;
            match archive::download_archive(client, &project_id).await? {
                Some(download) => Ok(json!({
                    "success": true,
                    "project_id": download.project_id,
                    "project_name": download.project_name,
                    "archive_path": download.archive_path,
                })),
                None => Err(TdError::InvalidArg {
                    name: "project_id".to_string(),
                    reason: format!("project with id '{}' not found", project_id),
                }),
            }
        }

        "td_list_project_files" => {
            let archive_path = checked_archive_path(&args)?;
            let files = archive::list_entries(Path::new(&archive_path))?;
            Ok(json!({
                "archive_path": archive_path,
                "file_count": files.len(),
                "files": files,
            }))
        }

        "td_read_project_file" => {
            let archive_path = checked_archive_path(&args)?;
            let file_path = get_string_arg(&args, "file_path")?;
            let content = archive::read_entry(Path::new(&archive_path), &file_path)?;
            Ok(json!(content))
        }

        _ => Err(TdError::UnknownTool(name.to_string())),
    }
}

/// Archive paths come from the outside world; only staged tar.gz files under
/// the temp dir are accepted.
fn checked_archive_path(args: &Map<String, JsonValue>) -> Result<String> {
    let archive_path = get_string_arg(args, "archive_path")?;
    if !archive::valid_archive_path(Path::new(&archive_path)) {
        return Err(TdError::InvalidArg {
            name: "archive_path".to_string(),
            reason: "expected a staged .tar.gz path under the temp directory".to_string(),
        });
    }
    Ok(archive_path)
}
