//! CLI and MCP server entry point for the Treasure Data API.
//!
//! Run `td-mcp serve` for the MCP stdio server, or one of the listing
//! subcommands for direct command-line access.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use td_mcp::client::{ListParams, TdClient, DEFAULT_LIMIT};
use td_mcp::output::{self, OutputFormat};
use td_mcp::server::McpServer;
use td_mcp::{archive, TdError};

/// Treasure Data API command-line interface and MCP server.
///
/// Credentials come from --api-key or the TD_API_KEY environment variable;
/// the environment wins when both are set.
#[derive(Parser)]
#[command(name = "td-mcp")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Treasure Data API key (default: TD_API_KEY env var).
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    /// API endpoint (default: api.treasuredata.com for US,
    /// api.treasuredata.co.jp for Japan).
    #[arg(long, global = true, value_name = "HOST")]
    endpoint: Option<String>,

    /// Workflow API endpoint (default: derived from --endpoint).
    #[arg(long, global = true, value_name = "HOST")]
    workflow_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by the listing subcommands.
#[derive(Args)]
struct ListOpts {
    /// Show full details instead of names only.
    #[arg(long, short)]
    verbose: bool,

    /// Maximum number of items to retrieve.
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Index to start retrieving from.
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Retrieve all items, ignoring --limit and --offset.
    #[arg(long = "all")]
    all_results: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl ListOpts {
    fn params(&self) -> ListParams {
        ListParams {
            limit: self.limit,
            offset: self.offset,
            all_results: self.all_results,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List databases in the account.
    ListDatabases(ListOpts),

    /// Get information about a specific database.
    GetDatabase {
        /// Name of the database to retrieve.
        database_name: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// List tables in a specific database.
    ListTables {
        /// Name of the database to retrieve tables from.
        database_name: String,

        #[command(flatten)]
        opts: ListOpts,
    },

    /// List workflow projects.
    ListProjects {
        #[command(flatten)]
        opts: ListOpts,

        /// Include system-generated projects.
        #[arg(long)]
        include_system: bool,
    },

    /// Get information about a specific workflow project.
    GetProject {
        /// Id of the project to retrieve.
        project_id: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Download a project's archive and print the staged path.
    DownloadArchive {
        /// Id of the project whose archive to download.
        project_id: String,
    },

    /// List the files inside a downloaded project archive.
    ArchiveFiles {
        /// Path to the downloaded .tar.gz archive.
        archive_path: PathBuf,
    },

    /// Print one file from a downloaded project archive.
    ArchiveRead {
        /// Path to the downloaded .tar.gz archive.
        archive_path: PathBuf,

        /// Path of the file within the archive.
        file_path: String,
    },

    /// Run as an MCP server on stdin/stdout.
    Serve,
}

#[tokio::main]
async fn main() {
    // stdout carries command output (and, under `serve`, the protocol), so
    // logging goes to stderr and is controlled by RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), TdError> {
    let Cli {
        api_key,
        endpoint,
        workflow_endpoint,
        command,
    } = cli;
    let client = || {
        TdClient::from_env(
            api_key.as_deref(),
            endpoint.as_deref(),
            workflow_endpoint.as_deref(),
        )
    };

    match command {
        Command::ListDatabases(opts) => {
            let databases = client()?.list_databases(opts.params()).await?;
            println!(
                "{}",
                output::render_databases(&databases, opts.verbose, opts.format)?
            );
        }

        Command::GetDatabase {
            database_name,
            format,
        } => match client()?.get_database(&database_name).await? {
            Some(database) => println!("{}", output::render_database(&database, format)?),
            None => {
                eprintln!("Database '{}' not found.", database_name);
                std::process::exit(1);
            }
        },

        Command::ListTables {
            database_name,
            opts,
        } => {
            let tables = client()?.list_tables(&database_name, opts.params()).await?;
            println!(
                "{}",
                output::render_tables(&tables, opts.verbose, opts.format)?
            );
        }

        Command::ListProjects {
            opts,
            include_system,
        } => {
            let mut projects = client()?.list_projects(opts.params()).await?;
            if !include_system {
                projects.retain(|p| !p.is_system());
            }
            println!(
                "{}",
                output::render_projects(&projects, opts.verbose, opts.format)?
            );
        }

        Command::GetProject { project_id, format } => {
            match client()?.get_project(&project_id).await? {
                Some(project) => println!("{}", output::render_project(&project, format)?),
                None => {
                    eprintln!("Project with id '{}' not found.", project_id);
                    std::process::exit(1);
                }
            }
        }

        Command::DownloadArchive { project_id } => {
            match archive::download_archive(&client()?, &project_id).await? {
                Some(download) => {
                    println!("{}", download.archive_path.display());
                }
                None => {
                    eprintln!("Project with id '{}' not found.", project_id);
                    std::process::exit(1);
                }
            }
        }

        Command::ArchiveFiles { archive_path } => {
            // Local operation on a path the user already owns; no client.
            let files = archive::list_entries(&archive_path)?;
            for file in files {
                match file.file_type.as_deref() {
                    Some(file_type) => {
                        println!("{}\t{}\t{}", file.name, file.size, file_type)
                    }
                    None => println!("{}/", file.name.trim_end_matches('/')),
                }
            }
        }

        Command::ArchiveRead {
            archive_path,
            file_path,
        } => {
            let content = archive::read_entry(&archive_path, &file_path)?;
            print!("{}", content.content);
        }

        Command::Serve => {
            let client = client()?;
            tracing::info!(
                endpoint = %client.config().endpoint,
                "starting MCP server on stdio"
            );
            McpServer::new(client).run().await?;
        }
    }

    Ok(())
}
