//! Configuration for the Promptgate client
//!
//! Options are constructed through a builder; the gateway URL and API key
//! can also come from environment variables so deployments do not have to
//! hardcode credentials.

use std::env;

/// Default public gateway endpoint.
pub const DEFAULT_BASE_URL: &str = "https://gateway.promptgate.dev/api/v3";

/// Get the gateway base URL from the environment or a fallback.
///
/// Priority:
/// 1. `PROMPTGATE_BASE_URL` environment variable
/// 2. `fallback` parameter
/// 3. [`DEFAULT_BASE_URL`]
pub fn get_base_url(fallback: Option<&str>) -> String {
    if let Ok(url) = env::var("PROMPTGATE_BASE_URL") {
        return url;
    }
    fallback.unwrap_or(DEFAULT_BASE_URL).to_string()
}

/// Get the API key from the `PROMPTGATE_API_KEY` environment variable.
pub fn get_api_key() -> Option<String> {
    env::var("PROMPTGATE_API_KEY").ok()
}

/// Options for configuring a [`Client`](crate::Client)
#[derive(Clone)]
pub struct ClientOptions {
    /// Gateway endpoint URL
    pub base_url: String,

    /// API key sent as a bearer token
    pub api_key: String,

    /// Project the prompts belong to
    pub project_id: u64,

    /// Version to resolve prompts at; `None` means the live version
    pub version_uuid: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("project_id", &self.project_id)
            .field("version_uuid", &self.version_uuid)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientOptions {
    /// Create a new builder for ClientOptions
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }
}

/// Builder for ClientOptions
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    project_id: Option<u64>,
    version_uuid: Option<String>,
    timeout: Option<u64>,
}

impl ClientOptionsBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn project_id(mut self, id: u64) -> Self {
        self.project_id = Some(id);
        self
    }

    pub fn version_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.version_uuid = Some(uuid.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> crate::Result<ClientOptions> {
        let api_key = self
            .api_key
            .or_else(get_api_key)
            .ok_or_else(|| crate::Error::config("api_key is required"))?;

        let project_id = self
            .project_id
            .ok_or_else(|| crate::Error::config("project_id is required"))?;

        Ok(ClientOptions {
            base_url: self.base_url.unwrap_or_else(|| get_base_url(None)),
            api_key,
            project_id,
            version_uuid: self.version_uuid,
            timeout: self.timeout.unwrap_or(60),
        })
    }
}
