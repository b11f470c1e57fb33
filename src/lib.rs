//! # td-mcp
//!
//! MCP (Model Context Protocol) server and CLI for the Treasure Data REST API.
//!
//! This crate exposes database listing, table listing, and workflow project
//! archive inspection as MCP tools for AI agents, speaking JSON-RPC 2.0 over
//! stdin/stdout, plus an equivalent set of CLI subcommands.
//!
//! ## Tools
//!
//! - `td_list_databases` / `td_get_database`
//! - `td_list_tables`
//! - `td_list_projects` / `td_get_project`
//! - `td_list_workflows` / `td_find_workflow`
//! - `td_find_project` / `td_get_project_by_name`
//! - `td_download_project_archive` / `td_list_project_files` / `td_read_project_file`
//!
//! ## Usage
//!
//! The server is typically configured in an MCP host such as Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "treasure-data": {
//!       "command": "/path/to/td-mcp",
//!       "args": ["serve"],
//!       "env": { "TD_API_KEY": "..." }
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use td_mcp::{ListParams, TdClient};
//!
//! # async fn example() -> td_mcp::Result<()> {
//! let client = TdClient::from_env(None, None, None)?;
//! let databases = client.list_databases(ListParams::all()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod server;
pub mod tools;

pub use archive::{ArchiveDownload, ArchiveEntry, EntryContent};
pub use client::{ListParams, TdClient, AGGREGATION_PAGE_SIZE, DEFAULT_LIMIT};
pub use config::ClientConfig;
pub use error::{Result, TdError};
pub use models::{
    Column, Database, Metadata, Project, Table, Workflow, WorkflowAttempt, WorkflowProject,
    WorkflowSession,
};
pub use output::OutputFormat;
pub use server::{JsonRpcRequest, JsonRpcResponse, McpServer};
pub use tools::{ToolDef, ToolRegistry};
