//! Core types for the Promptgate SDK
//!
//! Messages and content parts are shared between the template engine (which
//! compiles templated text and image URLs inside them) and the HTTP client
//! (which sends them to the prompt proxy).

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call attached to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Prompt or message content: either a single templated string or an ordered
/// sequence of content parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PromptContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl PromptContent {
    pub fn text(text: impl Into<String>) -> Self {
        PromptContent::Text(text.into())
    }
}

/// A single part of structured content.
///
/// Only the `Text` and `Image` variants carry templated fields; anything the
/// proxy introduces later deserializes into `Other` and passes through the
/// template engine untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text(TextPart),
    Image(ImagePart),
    #[serde(untagged)]
    Other(serde_json::Value),
}

/// Text content part whose `text` field is a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    pub text: String,
}

impl TextPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Image content part whose URL field is itself a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagePart {
    pub image: String,
}

impl ImagePart {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }
}

/// A message in a conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: PromptContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: PromptContent) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, PromptContent::text(text))
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, PromptContent::text(text))
    }

    pub fn assistant(content: PromptContent) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A versioned prompt document fetched from the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Project-relative path of the prompt, e.g. `"onboarding/welcome"`.
    pub path: String,
    /// Version identifier this document was resolved at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_uuid: Option<String>,
    /// The prompt body; text and image-URL fields are templates.
    pub content: PromptContent,
    /// Provider configuration attached to the prompt (model, temperature, ...).
    /// Opaque to this SDK; forwarded as-is.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

/// Request body for running a prompt through the proxy.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    pub stream: bool,
}

/// Buffered result of a prompt run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunResult {
    /// Thread created (or continued) by this run.
    pub uuid: String,
    /// Full conversation after the run, newest message last.
    #[serde(default)]
    pub conversation: Vec<Message>,
    /// The assistant response produced by the run, if any.
    #[serde(default)]
    pub response: Option<Message>,
}

/// Request body for appending messages to an existing thread.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub stream: bool,
}

/// One streamed chunk relayed by the proxy (OpenAI-style delta shape).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChatChoice>,
}

/// One choice inside a streamed chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub delta: ChatDelta,
    pub finish_reason: Option<String>,
}

/// Incremental delta inside a streamed choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Fragment of a tool call, assembled across chunks by the aggregator.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

/// Fragment of a tool call's function name/arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert!(matches!(msg.role, MessageRole::User));
        assert_eq!(msg.content, PromptContent::Text("Hello".to_string()));
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageRole::User).unwrap(),
            "\"user\""
        );
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_content_part_text_serialization() {
        let part = ContentPart::Text(TextPart::new("Hello {{name}}"));
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        assert!(json.contains("Hello {{name}}"));
    }

    #[test]
    fn test_content_part_unknown_kind_roundtrip() {
        let raw = serde_json::json!({"type": "audio", "url": "https://x/y.mp3"});
        let part: ContentPart = serde_json::from_value(raw.clone()).unwrap();
        match &part {
            ContentPart::Other(v) => assert_eq!(v, &raw),
            other => panic!("expected passthrough part, got {other:?}"),
        }
        assert_eq!(serde_json::to_value(&part).unwrap(), raw);
    }

    #[test]
    fn test_prompt_content_untagged() {
        let text: PromptContent = serde_json::from_str("\"plain\"").unwrap();
        assert_eq!(text, PromptContent::Text("plain".to_string()));

        let parts: PromptContent =
            serde_json::from_str(r#"[{"type":"text","text":"hi"}]"#).unwrap();
        assert!(matches!(parts, PromptContent::Parts(ref p) if p.len() == 1));
    }

    #[test]
    fn test_chat_chunk_deserialization() {
        let json = r#"{
            "id": "chunk_1",
            "object": "chat.completion.chunk",
            "created": 1234567890,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "delta": { "content": "Hello" },
                "finish_reason": null
            }]
        }"#;

        let chunk: ChatChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.id, "chunk_1");
        assert_eq!(chunk.choices[0].delta.content, Some("Hello".to_string()));
    }
}
