//! Treasure Data REST API client.
//!
//! One authenticated HTTP call per page fetch; JSON bodies are mapped into
//! the typed records in [`crate::models`]. The pagination aggregator lives
//! here too: listing endpoints take [`ListParams`] and either return one page
//! verbatim or loop until the remote signals exhaustion with a short page.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, TdError};
use crate::models::{Database, Project, Table, Workflow};

/// Default page size when the caller does not specify a limit.
pub const DEFAULT_LIMIT: usize = 30;

/// Internal page size used when aggregating all results.
pub const AGGREGATION_PAGE_SIZE: usize = 100;

/// Pagination parameters shared by every listing operation.
///
/// With `all_results` set, `limit` and `offset` are ignored and the client
/// fetches successive pages of [`AGGREGATION_PAGE_SIZE`] until a short page.
#[derive(Debug, Clone, Copy)]
pub struct ListParams {
    /// Maximum number of items to return.
    pub limit: usize,
    /// Index of the first item to return.
    pub offset: usize,
    /// Fetch every item, ignoring `limit` and `offset`.
    pub all_results: bool,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            all_results: false,
        }
    }
}

impl ListParams {
    /// Parameters requesting the complete listing.
    pub fn all() -> Self {
        Self {
            all_results: true,
            ..Self::default()
        }
    }
}

/// Client for the Treasure Data REST and workflow APIs.
///
/// Stateless apart from the resolved configuration; safe to share behind a
/// reference across concurrent tool calls.
pub struct TdClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl TdClient {
    /// Build a client from an already-resolved configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("TD1 {}", config.api_key))
            .map_err(|_| TdError::Authentication("API key contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    /// Resolve configuration (environment first, parameters second) and
    /// build a client. Fails before any network call if no API key is found.
    pub fn from_env(
        api_key: Option<&str>,
        endpoint: Option<&str>,
        workflow_endpoint: Option<&str>,
    ) -> Result<Self> {
        Self::new(ClientConfig::resolve(api_key, endpoint, workflow_endpoint)?)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// List databases in the account.
    pub async fn list_databases(&self, params: ListParams) -> Result<Vec<Database>> {
        self.fetch_list(&self.config.base_url(), "database/list", "databases", params)
            .await
    }

    /// Look up one database by name. `Ok(None)` when it does not exist.
    pub async fn get_database(&self, name: &str) -> Result<Option<Database>> {
        let databases = self.list_databases(ListParams::all()).await?;
        Ok(databases.into_iter().find(|db| db.name == name))
    }

    /// List tables in a database.
    pub async fn list_tables(&self, database: &str, params: ListParams) -> Result<Vec<Table>> {
        let path = format!("table/list/{}", database);
        self.fetch_list(&self.config.base_url(), &path, "tables", params)
            .await
    }

    /// List workflow projects.
    pub async fn list_projects(&self, params: ListParams) -> Result<Vec<Project>> {
        self.fetch_list(&self.config.workflow_base_url(), "projects", "projects", params)
            .await
    }

    /// List workflows with recent session history.
    ///
    /// The workflow API has no offset paging here; `count` caps how many
    /// workflows come back in the single response.
    pub async fn list_workflows(&self, count: usize) -> Result<Vec<Workflow>> {
        self.fetch_envelope(
            &self.config.workflow_base_url(),
            "workflows",
            "workflows",
            &[("count", count)],
        )
        .await
    }

    /// Look up one workflow project by id. `Ok(None)` on a 404.
    pub async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let url = format!("{}/projects/{}", self.config.workflow_base_url(), project_id);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(TdError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let project = response
            .json::<Project>()
            .await
            .map_err(|e| TdError::Parse(format!("invalid project response: {}", e)))?;
        Ok(Some(project))
    }

    /// Download a project's archive as raw bytes.
    ///
    /// The workflow API streams the current revision's tar.gz; a project
    /// without an archive answers 404, surfaced as `Api { status: 404 }`.
    pub async fn download_project_archive(&self, project_id: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/projects/{}/archive",
            self.config.workflow_base_url(),
            project_id
        );
        debug!(project_id, "downloading project archive");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TdError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Fetch one page or aggregate all pages, per `params`.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        envelope: &str,
        params: ListParams,
    ) -> Result<Vec<T>> {
        if !params.all_results {
            return self
                .fetch_page(base_url, path, envelope, params.limit, params.offset)
                .await;
        }

        // Pages are fetched strictly sequentially: the decision to fetch
        // page N+1 depends on page N coming back full. Offset paging is
        // trusted to be stable between calls; a dataset mutating underneath
        // can still skip or duplicate rows.
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .fetch_page::<T>(base_url, path, envelope, AGGREGATION_PAGE_SIZE, offset)
                .await?;
            let fetched = page.len();
            all.extend(page);
            if fetched < AGGREGATION_PAGE_SIZE {
                break;
            }
            offset += AGGREGATION_PAGE_SIZE;
        }
        debug!(path, total = all.len(), "aggregated all pages");
        Ok(all)
    }

    /// Issue one limit/offset listing call and unwrap its envelope field.
    async fn fetch_page<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        envelope: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<T>> {
        self.fetch_envelope(base_url, path, envelope, &[("limit", limit), ("offset", offset)])
            .await
    }

    /// Issue exactly one listing call and unwrap its envelope field.
    async fn fetch_envelope<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        envelope: &str,
        query: &[(&str, usize)],
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", base_url, path);
        debug!(%url, ?query, "fetching listing");

        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TdError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| TdError::Parse(format!("invalid JSON response: {}", e)))?;

        let items = body
            .get(envelope)
            .cloned()
            .ok_or_else(|| TdError::Parse(format!("response missing '{}' field", envelope)))?;

        serde_json::from_value(items)
            .map_err(|e| TdError::Parse(format!("invalid '{}' items: {}", envelope, e)))
    }
}
