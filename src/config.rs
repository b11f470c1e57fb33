//! Client configuration and credential resolution.
//!
//! Credentials and endpoints are resolved once, at client construction.
//! Environment variables win over explicit parameters, so a deployment can
//! override whatever a host process passes in.

use crate::error::{Result, TdError};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "TD_API_KEY";
/// Environment variable overriding the REST endpoint.
pub const ENV_ENDPOINT: &str = "TD_ENDPOINT";
/// Environment variable overriding the workflow endpoint.
pub const ENV_WORKFLOW_ENDPOINT: &str = "TD_WORKFLOW_ENDPOINT";

/// Default REST endpoint (US region).
pub const DEFAULT_ENDPOINT: &str = "api.treasuredata.com";

/// Resolved client configuration.
///
/// `endpoint` and `workflow_endpoint` are hosts ("api.treasuredata.com") or
/// full base URLs ("http://127.0.0.1:9999"); a value containing `://` is used
/// verbatim, anything else is wrapped in `https://`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key sent as `Authorization: TD1 {key}`.
    pub api_key: String,
    /// REST API endpoint.
    pub endpoint: String,
    /// Workflow API endpoint.
    pub workflow_endpoint: String,
}

impl ClientConfig {
    /// Resolve configuration from explicit parameters and the environment.
    ///
    /// Resolution order for each value: environment variable first, explicit
    /// parameter second. Fails with [`TdError::Authentication`] when no API
    /// key can be found, before any network call is made.
    pub fn resolve(
        api_key: Option<&str>,
        endpoint: Option<&str>,
        workflow_endpoint: Option<&str>,
    ) -> Result<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| api_key.map(|k| k.to_string()))
            .ok_or_else(|| {
                TdError::Authentication(format!(
                    "API key must be provided via parameter or {} env var",
                    ENV_API_KEY
                ))
            })?;

        let endpoint = std::env::var(ENV_ENDPOINT)
            .ok()
            .filter(|e| !e.is_empty())
            .or_else(|| endpoint.map(|e| e.to_string()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let workflow_endpoint = std::env::var(ENV_WORKFLOW_ENDPOINT)
            .ok()
            .filter(|e| !e.is_empty())
            .or_else(|| workflow_endpoint.map(|e| e.to_string()))
            .unwrap_or_else(|| derive_workflow_endpoint(&endpoint));

        Ok(Self {
            api_key,
            endpoint,
            workflow_endpoint,
        })
    }

    /// Base URL for the REST API, e.g. `https://api.treasuredata.com/v3`.
    pub fn base_url(&self) -> String {
        format!("{}/v3", expand_host(&self.endpoint))
    }

    /// Base URL for the workflow API, e.g. `https://api-workflow.treasuredata.com/api`.
    pub fn workflow_base_url(&self) -> String {
        format!("{}/api", expand_host(&self.workflow_endpoint))
    }
}

/// The workflow host mirrors the REST host with an `api-workflow.` label.
fn derive_workflow_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("api.") {
        endpoint.replacen("api.", "api-workflow.", 1)
    } else {
        endpoint.to_string()
    }
}

fn expand_host(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", endpoint)
    }
}
