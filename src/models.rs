//! Typed records for Treasure Data API responses.
//!
//! All records are plain immutable values deserialized from one API call and
//! handed to the caller; nothing here is cached or mutated.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TdError};

/// A Treasure Data database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// Database name, unique within the account.
    pub name: String,
    /// Creation timestamp, as returned by the API.
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
    /// Row count across the database's tables.
    pub count: u64,
    /// Owning organization, if any.
    #[serde(default)]
    pub organization: Option<String>,
    /// Caller's permission level (e.g. "administrator", "query_only").
    pub permission: String,
    /// Whether the database is protected from deletion.
    pub delete_protected: bool,
}

/// A table within a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Numeric table id.
    pub id: u64,
    /// Table name, unique within its database.
    pub name: String,
    /// Estimated storage size in bytes.
    pub estimated_storage_size: u64,
    /// When the row counter was last refreshed.
    #[serde(default)]
    pub counter_updated_at: Option<String>,
    /// Timestamp of the newest log record, if any.
    #[serde(default)]
    pub last_log_timestamp: Option<String>,
    /// Whether the table is protected from deletion.
    pub delete_protected: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
    /// Table type tag, "log" or "view".
    #[serde(rename = "type")]
    pub table_type: String,
    /// Whether the implicit `v` column is included.
    #[serde(default)]
    pub include_v: bool,
    /// Row count.
    pub count: u64,
    /// Schema descriptor: a JSON-encoded string of `[name, type]` tuples.
    /// Parse with [`Table::columns`].
    #[serde(rename = "schema", default)]
    pub schema: Option<String>,
    /// Retention period in days, if configured.
    #[serde(default)]
    pub expire_days: Option<u32>,
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type (e.g. "string", "long").
    #[serde(rename = "type")]
    pub column_type: String,
    /// Query-facing alias, present on some tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Table {
    /// Decode the embedded schema string into ordered columns.
    ///
    /// The API delivers the schema as a JSON string like
    /// `[["time","long"],["user_id","string","uid"]]`, where the optional
    /// third element is an alias. A table without a schema yields an empty
    /// list; a malformed descriptor is a [`TdError::Parse`].
    pub fn columns(&self) -> Result<Vec<Column>> {
        let raw = match &self.schema {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(Vec::new()),
        };

        let tuples: Vec<Vec<String>> = serde_json::from_str(raw)
            .map_err(|e| TdError::Parse(format!("invalid schema descriptor: {}", e)))?;

        tuples
            .into_iter()
            .map(|tuple| {
                let mut parts = tuple.into_iter();
                let name = parts.next().ok_or_else(|| {
                    TdError::Parse("schema column missing name".to_string())
                })?;
                let column_type = parts.next().ok_or_else(|| {
                    TdError::Parse(format!("schema column '{}' missing type", name))
                })?;
                Ok(Column {
                    name,
                    column_type,
                    alias: parts.next(),
                })
            })
            .collect()
    }
}

/// A key-value metadata tag on a workflow project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// A workflow project: a container of Digdag workflow definitions and the
/// SQL/script files they reference, versioned by revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project id (numeric, but delivered as a string).
    pub id: String,
    /// Project name.
    pub name: String,
    /// Revision hash of the current archive.
    pub revision: String,
    /// Creation timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Last-update timestamp.
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    /// Deletion timestamp, if the project was deleted.
    #[serde(rename = "deletedAt", default)]
    pub deleted_at: Option<String>,
    /// Archive format, normally "db".
    #[serde(rename = "archiveType")]
    pub archive_type: String,
    /// MD5 checksum of the archive.
    #[serde(rename = "archiveMd5")]
    pub archive_md5: String,
    /// Key-value metadata tags.
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

impl Project {
    /// System-generated projects are tagged with a `sys` metadata key by
    /// convention; there is no dedicated flag.
    pub fn is_system(&self) -> bool {
        self.metadata.iter().any(|m| m.key == "sys")
    }
}

/// The owning project, as embedded in a workflow record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowProject {
    /// Project id.
    pub id: String,
    /// Project name.
    pub name: String,
    /// Key-value metadata tags, when the API includes them.
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

impl WorkflowProject {
    /// Same `sys` metadata-key convention as [`Project::is_system`].
    pub fn is_system(&self) -> bool {
        self.metadata.iter().any(|m| m.key == "sys")
    }
}

/// The last attempt of a workflow session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowAttempt {
    /// Attempt status: "success", "error", or "running".
    pub status: String,
    /// Whether the attempt succeeded; null while still running.
    #[serde(default)]
    pub success: Option<bool>,
}

/// One recent execution session of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSession {
    /// Scheduled session time.
    pub session_time: String,
    /// The most recent attempt for this session.
    pub last_attempt: WorkflowAttempt,
}

/// A workflow definition with its recent execution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow id (numeric, but delivered as a string).
    pub id: String,
    /// Workflow name.
    pub name: String,
    /// Owning project.
    pub project: WorkflowProject,
    /// Timezone the schedule is evaluated in.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Schedule definition; null for unscheduled workflows.
    #[serde(default)]
    pub schedule: Option<serde_json::Value>,
    /// Recent sessions, newest first; empty for never-run workflows.
    #[serde(default)]
    pub latest_sessions: Vec<WorkflowSession>,
}

impl Workflow {
    /// Status of the newest session's last attempt, if the workflow has run.
    pub fn last_status(&self) -> Option<&str> {
        self.latest_sessions
            .first()
            .map(|s| s.last_attempt.status.as_str())
    }

    /// Whether the workflow has a schedule attached.
    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_some()
    }
}
