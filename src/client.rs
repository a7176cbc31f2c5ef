//! HTTP client for the Promptgate proxy.
//!
//! The client wraps a shared `reqwest::Client` and a [`TemplateEngine`]: a
//! prompt's templated content is compiled against the caller's variables
//! before anything leaves the process, and the variables themselves are
//! forwarded so the proxy can log the run against its own copy.
//!
//! Endpoints (relative to the configured base URL):
//!
//! - `GET  /projects/{project}/prompts/{path}`: fetch a prompt document
//! - `POST /projects/{project}/prompts/run`: run a prompt (creates a thread)
//! - `POST /threads/{uuid}/chat`: continue a thread
//! - `GET  /threads/{uuid}/messages`: read a thread back

use crate::config::ClientOptions;
use crate::streaming::{parse_event_stream, ChunkStream};
use crate::template::TemplateEngine;
use crate::types::{ChatRequest, Message, Prompt, RunRequest, RunResult};
use crate::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Client for the Promptgate proxy.
///
/// Cheap to clone is not a goal; share it behind an `Arc` if needed. All
/// methods take `&self`, the template engine is immutable after
/// construction.
pub struct Client {
    options: ClientOptions,
    http: reqwest::Client,
    engine: TemplateEngine,
}

impl Client {
    /// Create a client from validated options.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout))
            .build()?;
        Ok(Self {
            options,
            http,
            engine: TemplateEngine::new(),
        })
    }

    /// The template engine used for prompt compilation.
    ///
    /// Exposed so callers can compile or inspect templates locally without a
    /// round trip.
    pub fn template_engine(&self) -> &TemplateEngine {
        &self.engine
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}", self.options.base_url.trim_end_matches('/'), suffix)
    }

    fn request(&self, method: reqwest::Method, suffix: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, self.url(suffix))
            .header(
                "Authorization",
                format!("Bearer {}", self.options.api_key),
            )
            .header("Content-Type", "application/json");
        if let Some(version) = &self.options.version_uuid {
            req = req.header("X-Promptgate-Version", version);
        }
        req
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(Error::api(format!("API error {status}: {body}")))
    }

    /// Fetch a prompt document by its project-relative path.
    pub async fn get_prompt(&self, path: &str) -> Result<Prompt> {
        let suffix = format!(
            "projects/{}/prompts/{}",
            self.options.project_id,
            path.trim_start_matches('/')
        );
        log::debug!("GET {suffix}");
        let response = self.request(reqwest::Method::GET, &suffix).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch a prompt and compile its content locally.
    ///
    /// The returned prompt has its templated text and image-URL fields
    /// rendered against `variables`. Rendering is best-effort: a part that
    /// fails to compile stays as its source text.
    pub async fn render_prompt(
        &self,
        path: &str,
        variables: &HashMap<String, String>,
    ) -> Result<Prompt> {
        let mut prompt = self.get_prompt(path).await?;
        if let Some(content) = self.engine.compile_content(Some(&prompt.content), variables) {
            prompt.content = content;
        }
        Ok(prompt)
    }

    /// Run a prompt and wait for the buffered result.
    ///
    /// The proxy compiles and dispatches the prompt server-side; a new
    /// thread is created and returned with the full conversation.
    pub async fn run(
        &self,
        path: &str,
        variables: &HashMap<String, String>,
    ) -> Result<RunResult> {
        let body = RunRequest {
            path: path.to_string(),
            parameters: Some(serde_json::to_value(variables)?),
            stream: false,
        };
        let suffix = format!("projects/{}/prompts/run", self.options.project_id);
        log::debug!("POST {suffix} path={path}");
        let response = self
            .request(reqwest::Method::POST, &suffix)
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Run a prompt and stream the model output as parsed chunks.
    pub async fn run_stream(
        &self,
        path: &str,
        variables: &HashMap<String, String>,
    ) -> Result<ChunkStream> {
        let body = RunRequest {
            path: path.to_string(),
            parameters: Some(serde_json::to_value(variables)?),
            stream: true,
        };
        let suffix = format!("projects/{}/prompts/run", self.options.project_id);
        log::debug!("POST {suffix} path={path} (stream)");
        let response = self
            .request(reqwest::Method::POST, &suffix)
            .json(&body)
            .send()
            .await?;
        Ok(parse_event_stream(Self::check(response).await?))
    }

    /// Append messages to an existing thread and wait for the response.
    ///
    /// Templated message content is compiled against `variables` before
    /// dispatch so client-side templates behave the same as stored prompts.
    pub async fn chat(
        &self,
        thread_uuid: &str,
        messages: Vec<Message>,
        variables: &HashMap<String, String>,
    ) -> Result<RunResult> {
        let body = ChatRequest {
            messages: self.compile_messages(messages, variables),
            stream: false,
        };
        let suffix = format!("threads/{thread_uuid}/chat");
        log::debug!("POST {suffix}");
        let response = self
            .request(reqwest::Method::POST, &suffix)
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Append messages to an existing thread and stream the response.
    pub async fn chat_stream(
        &self,
        thread_uuid: &str,
        messages: Vec<Message>,
        variables: &HashMap<String, String>,
    ) -> Result<ChunkStream> {
        let body = ChatRequest {
            messages: self.compile_messages(messages, variables),
            stream: true,
        };
        let suffix = format!("threads/{thread_uuid}/chat");
        log::debug!("POST {suffix} (stream)");
        let response = self
            .request(reqwest::Method::POST, &suffix)
            .json(&body)
            .send()
            .await?;
        Ok(parse_event_stream(Self::check(response).await?))
    }

    /// Fetch the messages of an existing thread, oldest first.
    pub async fn get_messages(&self, thread_uuid: &str) -> Result<Vec<Message>> {
        let suffix = format!("threads/{thread_uuid}/messages");
        log::debug!("GET {suffix}");
        let response = self.request(reqwest::Method::GET, &suffix).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    fn compile_messages(
        &self,
        messages: Vec<Message>,
        variables: &HashMap<String, String>,
    ) -> Vec<Message> {
        messages
            .into_iter()
            .map(|mut message| {
                if let Some(content) =
                    self.engine.compile_content(Some(&message.content), variables)
                {
                    message.content = content;
                }
                message
            })
            .collect()
    }
}
