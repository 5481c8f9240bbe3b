//! Request body construction for the chat, completion and embeddings endpoints.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::MistralError;
use crate::types::{ChatMessage, EmbeddingInput, ResponseFormat, ToolChoice, ToolDefinition};

/// Either a typed record or a caller-supplied JSON value passed through unchanged.
///
/// # Examples
///
/// ```
/// use mistral_client::request::Structured;
/// use mistral_client::types::ChatMessage;
/// use serde_json::json;
///
/// let typed: Structured<ChatMessage> = ChatMessage::new("user", "hi").into();
/// let plain: Structured<ChatMessage> = json!({"role": "user", "content": "hi"}).into();
/// assert_eq!(typed.to_plain().unwrap(), plain.to_plain().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Structured<T> {
    Model(T),
    Plain(Value),
}

impl<T: Serialize> Structured<T> {
    /// Converts the entry into its plain JSON form.
    pub fn to_plain(&self) -> Result<Value, MistralError> {
        match self {
            Structured::Model(model) => serde_json::to_value(model).map_err(|err| {
                MistralError::configuration(format!("failed to serialize request field: {err}"))
            }),
            Structured::Plain(value) => Ok(value.clone()),
        }
    }
}

macro_rules! structured_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Structured<$ty> {
                fn from(value: $ty) -> Self {
                    Structured::Model(value)
                }
            }

            impl From<Value> for Structured<$ty> {
                fn from(value: Value) -> Self {
                    Structured::Plain(value)
                }
            }
        )*
    };
}

structured_from!(ChatMessage, ToolDefinition, ToolChoice, ResponseFormat);

impl From<&str> for Structured<ToolChoice> {
    fn from(value: &str) -> Self {
        Structured::Plain(Value::String(value.to_string()))
    }
}

/// Parameters of a chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatParams {
    pub messages: Vec<Structured<ChatMessage>>,
    pub model: Option<String>,
    pub tools: Option<Vec<Structured<ToolDefinition>>>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub random_seed: Option<u64>,
    /// Deprecated alias of `safe_prompt`; either flag enables it.
    pub safe_mode: bool,
    pub safe_prompt: bool,
    pub tool_choice: Option<Structured<ToolChoice>>,
    pub response_format: Option<Structured<ResponseFormat>>,
}

impl ChatParams {
    pub fn new<I, M>(messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Structured<ChatMessage>>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn tools<I, T>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Structured<ToolDefinition>>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn safe_prompt(mut self, enabled: bool) -> Self {
        self.safe_prompt = enabled;
        self
    }

    pub fn tool_choice(mut self, choice: impl Into<Structured<ToolChoice>>) -> Self {
        self.tool_choice = Some(choice.into());
        self
    }

    pub fn response_format(mut self, format: impl Into<Structured<ResponseFormat>>) -> Self {
        self.response_format = Some(format.into());
        self
    }
}

/// Parameters of a fill-in-the-middle completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionParams {
    pub prompt: String,
    pub suffix: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub random_seed: Option<u64>,
    pub stop: Option<Vec<String>>,
}

impl CompletionParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }
}

/// Builds request bodies, applying the configured default model.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    default_model: Option<String>,
}

impl RequestBuilder {
    pub fn new(default_model: Option<String>) -> Self {
        Self { default_model }
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    fn resolve_model(&self, model: Option<&str>) -> Result<String, MistralError> {
        model
            .or(self.default_model.as_deref())
            .map(str::to_string)
            .ok_or_else(|| MistralError::configuration("model must be provided"))
    }

    /// Builds the chat completions body.
    ///
    /// `stream` is omitted from the body when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MistralError::Configuration`] when no model is given and no default
    /// model applies.
    pub fn chat_body(&self, params: &ChatParams, stream: Option<bool>) -> Result<Value, MistralError> {
        let mut body = Map::new();
        body.insert(
            "messages".to_string(),
            Value::Array(
                params
                    .messages
                    .iter()
                    .map(Structured::to_plain)
                    .collect::<Result<_, _>>()?,
            ),
        );
        body.insert(
            "safe_prompt".to_string(),
            Value::Bool(params.safe_mode || params.safe_prompt),
        );
        body.insert(
            "model".to_string(),
            Value::String(self.resolve_model(params.model.as_deref())?),
        );
        if let Some(tools) = &params.tools {
            body.insert("tools".to_string(), Value::Array(convert_tools(tools)?));
        }
        insert_sampling(
            &mut body,
            params.temperature,
            params.max_tokens,
            params.top_p,
            params.random_seed,
        );
        if let Some(stream) = stream {
            body.insert("stream".to_string(), Value::Bool(stream));
        }
        if let Some(choice) = &params.tool_choice {
            body.insert("tool_choice".to_string(), convert_tool_choice(choice));
        }
        if let Some(format) = &params.response_format {
            body.insert("response_format".to_string(), format.to_plain()?);
        }

        let body = Value::Object(body);
        tracing::debug!(body = %body, "chat request");
        Ok(body)
    }

    /// Builds the fill-in-the-middle completions body.
    pub fn completion_body(
        &self,
        params: &CompletionParams,
        stream: bool,
    ) -> Result<Value, MistralError> {
        let mut body = Map::new();
        body.insert("prompt".to_string(), Value::String(params.prompt.clone()));
        if let Some(suffix) = &params.suffix {
            body.insert("suffix".to_string(), Value::String(suffix.clone()));
        }
        body.insert(
            "model".to_string(),
            Value::String(self.resolve_model(params.model.as_deref())?),
        );
        body.insert("stream".to_string(), Value::Bool(stream));
        if let Some(stop) = &params.stop {
            body.insert(
                "stop".to_string(),
                Value::Array(stop.iter().cloned().map(Value::String).collect()),
            );
        }
        insert_sampling(
            &mut body,
            params.temperature,
            params.max_tokens,
            params.top_p,
            params.random_seed,
        );

        let body = Value::Object(body);
        tracing::debug!(body = %body, "completion request");
        Ok(body)
    }

    /// Builds the embeddings body. The model is required here; no default applies.
    pub fn embeddings_body(&self, model: &str, input: &EmbeddingInput) -> Result<Value, MistralError> {
        let input = serde_json::to_value(input).map_err(|err| {
            MistralError::configuration(format!("failed to serialize embeddings input: {err}"))
        })?;
        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(model.to_string()));
        body.insert("input".to_string(), input);
        Ok(Value::Object(body))
    }
}

fn insert_sampling(
    body: &mut Map<String, Value>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    top_p: Option<f64>,
    random_seed: Option<u64>,
) {
    if let Some(temperature) = temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = max_tokens {
        body.insert("max_tokens".to_string(), Value::from(max_tokens));
    }
    if let Some(top_p) = top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(seed) = random_seed {
        body.insert("random_seed".to_string(), Value::from(seed));
    }
}

/// Keeps only function tools, normalized to `{type, function}`.
fn convert_tools(tools: &[Structured<ToolDefinition>]) -> Result<Vec<Value>, MistralError> {
    let mut converted = Vec::new();
    for tool in tools {
        let value = tool.to_plain()?;
        if value.get("type").and_then(Value::as_str) != Some("function") {
            continue;
        }
        let mut entry = Map::new();
        entry.insert("type".to_string(), Value::String("function".to_string()));
        entry.insert(
            "function".to_string(),
            value.get("function").cloned().unwrap_or(Value::Null),
        );
        converted.push(Value::Object(entry));
    }
    Ok(converted)
}

fn convert_tool_choice(choice: &Structured<ToolChoice>) -> Value {
    match choice {
        Structured::Model(choice) => Value::String(choice.to_string()),
        Structured::Plain(value) => value.clone(),
    }
}
