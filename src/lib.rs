//! # Promptgate SDK
//!
//! A Rust client for the Promptgate prompt proxy: versioned prompt
//! management, a constrained Handlebars template engine for prompt
//! compilation, and streaming chat over Server-Sent Events.
//!
//! ## Overview
//!
//! Prompts live on the proxy as versioned documents whose text (and image
//! URLs) are templates. This SDK fetches them, compiles them against your
//! variables, runs them against the configured model provider, and keeps
//! multi-turn conversations in server-side threads.
//!
//! ## Key Features
//!
//! - **Prompt compilation**: constrained Handlebars dialect with
//!   comparison, logic, date, and message-formatting helpers
//! - **Variable extraction**: statically list the variables a template needs
//! - **Best-effort rendering**: a broken template degrades to its source
//!   text instead of failing the request
//! - **Streaming responses**: token-by-token SSE streaming with tool-call
//!   delta aggregation
//! - **Threads**: create, continue, and read back server-side conversations
//! - **Retry logic**: exponential backoff with jitter for transient failures
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use promptgate::{Client, ClientOptions};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions::builder()
//!         .api_key("pk-...")
//!         .project_id(42)
//!         .build()?;
//!     let client = Client::new(options)?;
//!
//!     let variables: HashMap<String, String> =
//!         [("name".to_string(), "Ada".to_string())].into();
//!
//!     let result = client.run("onboarding/welcome", &variables).await?;
//!     if let Some(response) = result.response {
//!         println!("{:?}", response.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Local template compilation
//!
//! The template engine is usable without any network access:
//!
//! ```rust
//! use promptgate::{extract_variables, TemplateEngine};
//! use std::collections::HashMap;
//!
//! let engine = TemplateEngine::new();
//! let variables: HashMap<String, String> =
//!     [("name".to_string(), "Ada".to_string())].into();
//!
//! let out = engine.compile_text("Hello, {{name}}!", &variables);
//! assert_eq!(out.text, "Hello, Ada!");
//! assert_eq!(extract_variables("Hello, {{name}}!"), vec!["name"]);
//! ```

/// HTTP client for the prompt proxy: prompt fetch/run, thread chat,
/// streaming and buffered variants.
mod client;

/// Client options builder and environment-variable resolution for the
/// gateway URL and API key.
mod config;

/// Error types and conversions. Defines the `Error` enum and `Result<T>`
/// alias used across all public APIs.
mod error;

/// SSE decoding and delta aggregation for streamed runs.
mod streaming;

/// Prompt template compilation and static variable extraction.
mod template;

/// Messages, content parts, prompt documents, and wire DTOs.
mod types;

/// Retry utilities with exponential backoff and jitter. Public as a module
/// so callers can wrap their own operations.
pub mod retry;

// --- Client API ---

pub use client::Client;

// --- Configuration ---

pub use config::{ClientOptions, ClientOptionsBuilder, DEFAULT_BASE_URL, get_api_key, get_base_url};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Template Engine ---

pub use template::{CompiledText, TemplateEngine, extract_variables};

// --- Streaming ---

pub use streaming::{ChunkStream, DeltaAggregator, parse_event_stream};

// --- Core Types ---

pub use types::{
    ChatChoice, ChatChunk, ChatDelta, ContentPart, ImagePart, Message, MessageRole, Prompt,
    PromptContent, RunResult, TextPart, ToolCall,
};

/// Convenience module with the most commonly used items.
/// Import with `use promptgate::prelude::*;`.
pub mod prelude {
    pub use crate::{
        ChatChunk, Client, ClientOptions, CompiledText, ContentPart, DeltaAggregator, Error,
        Message, MessageRole, Prompt, PromptContent, Result, TemplateEngine, extract_variables,
    };
}
