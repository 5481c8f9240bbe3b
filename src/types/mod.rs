//! Wire-format records for requests and responses.
//!
//! These are plain serde structs; closed enums reject unknown values during
//! deserialization, which is the only validation they perform.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Function declaration exposed to the model as a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub description: String,
    /// JSON schema describing the arguments.
    pub parameters: Map<String, Value>,
}

/// Tool category; only functions exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    #[default]
    Function,
}

/// Tool entry sent with a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default)]
    pub kind: ToolType,
    pub function: Function,
}

impl ToolDefinition {
    pub fn function(function: Function) -> Self {
        Self {
            kind: ToolType::Function,
            function,
        }
    }
}

/// Function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as produced by the model.
    pub arguments: String,
}

fn default_tool_call_id() -> String {
    "null".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default = "default_tool_call_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: ToolType,
    pub function: FunctionCall,
}

/// How the model may pick tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Any,
    None,
}

impl fmt::Display for ToolChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolChoice::Auto => "auto",
            ToolChoice::Any => "any",
            ToolChoice::None => "none",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormats {
    #[default]
    Text,
    JsonObject,
}

/// Requested output format, e.g. `{"type": "json_object"}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: ResponseFormats,
}

/// Message content: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<String>),
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One entry of a chat conversation.
///
/// # Examples
///
/// ```
/// use mistral_client::types::ChatMessage;
///
/// let message = ChatMessage::new("user", "What is the best French cheese?");
/// let value = serde_json::to_value(&message).unwrap();
/// assert_eq!(value, serde_json::json!({"role": "user", "content": "What is the best French cheese?"}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
            tool_calls: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Incremental message fragment carried by stream chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Error,
    ToolCalls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub total_tokens: u64,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponseChoice {
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Full response of the chat and completion endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionResponseChoice>,
    pub usage: UsageInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponseStreamChoice {
    pub index: u32,
    pub delta: DeltaMessage,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// One streamed chunk. The opening chunk usually omits `object` and `created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionStreamResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<ChatCompletionResponseStreamChoice>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingObject {
    pub object: String,
    pub embedding: Vec<f64>,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub id: String,
    pub object: String,
    pub data: Vec<EmbeddingObject>,
    pub model: String,
    pub usage: UsageInfo,
}

/// Embedding input: one text or a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl From<&str> for EmbeddingInput {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for EmbeddingInput {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(value: Vec<String>) -> Self {
        Self::Batch(value)
    }
}

impl From<Vec<&str>> for EmbeddingInput {
    fn from(value: Vec<&str>) -> Self {
        Self::Batch(value.into_iter().map(str::to_string).collect())
    }
}

fn default_true() -> bool {
    true
}

fn default_organization() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPermission {
    pub id: String,
    pub object: String,
    pub created: i64,
    #[serde(default)]
    pub allow_create_engine: bool,
    #[serde(default = "default_true")]
    pub allow_sampling: bool,
    #[serde(default = "default_true")]
    pub allow_logprobs: bool,
    #[serde(default)]
    pub allow_search_indices: bool,
    #[serde(default = "default_true")]
    pub allow_view: bool,
    #[serde(default)]
    pub allow_fine_tuning: bool,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub is_blocking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub permission: Vec<ModelPermission>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stream_chunk_without_object_deserializes() {
        let chunk: ChatCompletionStreamResponse = serde_json::from_value(json!({
            "id": "cmpl-1",
            "model": "mistral-small-latest",
            "choices": [{"index": 0, "delta": {"role": "assistant"}, "finish_reason": null}]
        }))
        .expect("chunk");
        assert_eq!(chunk.object, None);
        assert_eq!(chunk.choices[0].delta.role.as_deref(), Some("assistant"));
        assert_eq!(chunk.choices[0].finish_reason, None);
    }

    #[test]
    fn unknown_finish_reason_is_rejected() {
        let result = serde_json::from_value::<ChatCompletionResponseChoice>(json!({
            "index": 0,
            "message": {"role": "assistant", "content": "hi"},
            "finish_reason": "exploded"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn model_permission_applies_defaults() {
        let permission: ModelPermission = serde_json::from_value(json!({
            "id": "modelperm-1",
            "object": "model_permission",
            "created": 1703186988
        }))
        .expect("permission");
        assert!(permission.allow_sampling);
        assert!(!permission.allow_fine_tuning);
        assert_eq!(permission.organization, "*");
    }

    #[test]
    fn tool_call_id_defaults_to_null_string() {
        let call: ToolCall = serde_json::from_value(json!({
            "function": {"name": "retrieve_payment_status", "arguments": "{\"transaction_id\":\"T1001\"}"}
        }))
        .expect("tool call");
        assert_eq!(call.id, "null");
        assert_eq!(call.kind, ToolType::Function);
    }

    #[test]
    fn tool_choice_displays_wire_name() {
        assert_eq!(ToolChoice::Any.to_string(), "any");
        assert_eq!(
            serde_json::to_value(ResponseFormat {
                kind: ResponseFormats::JsonObject
            })
            .unwrap(),
            json!({"type": "json_object"})
        );
    }
}
