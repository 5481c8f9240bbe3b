use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ClientConfig, ResolvedConfig};
use crate::dispatcher::{Dispatcher, EndpointCall};
use crate::error::MistralError;
use crate::http::DynHttpTransport;
use crate::http::reqwest::default_dyn_transport;
use crate::request::{ChatParams, CompletionParams, RequestBuilder};
use crate::retry::DynSleeper;
use crate::types::{
    ChatCompletionResponse, ChatCompletionStreamResponse, EmbeddingInput, EmbeddingResponse,
    ModelList,
};

const CHAT_PATH: &str = "v1/chat/completions";
const FIM_PATH: &str = "v1/fim/completions";
const EMBEDDINGS_PATH: &str = "v1/embeddings";
const MODELS_PATH: &str = "v1/models";

/// Typed stream of chat or completion chunks.
pub type ChatStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionStreamResponse, MistralError>> + Send>>;

/// Mistral API 调用入口
///
/// 克隆开销很小，克隆体可并发使用
#[derive(Clone)]
pub struct MistralClient {
    dispatcher: Dispatcher,
    requests: RequestBuilder,
}

impl MistralClient {
    /// 创建 Builder，使用默认 endpoint、重试次数与超时
    pub fn builder() -> MistralClientBuilder {
        MistralClientBuilder::default()
    }

    /// Builds a client from `MISTRAL_API_KEY` and defaults for everything else.
    pub fn from_env() -> Result<Self, MistralError> {
        Self::builder().build()
    }

    pub fn config(&self) -> &ResolvedConfig {
        self.dispatcher.config()
    }

    /// 发送同步聊天请求
    pub async fn chat(&self, params: ChatParams) -> Result<ChatCompletionResponse, MistralError> {
        let body = self.requests.chat_body(&params, Some(false))?;
        let value = self
            .dispatcher
            .single(EndpointCall::post(CHAT_PATH, body))
            .await?;
        from_payload(value)
    }

    /// 发起流式聊天请求
    pub async fn chat_stream(&self, params: ChatParams) -> Result<ChatStream, MistralError> {
        let body = self.requests.chat_body(&params, Some(true))?;
        self.open_stream(EndpointCall::post(CHAT_PATH, body)).await
    }

    /// Fill-in-the-middle completion between `prompt` and an optional `suffix`.
    pub async fn completion(
        &self,
        params: CompletionParams,
    ) -> Result<ChatCompletionResponse, MistralError> {
        let body = self.requests.completion_body(&params, false)?;
        let value = self
            .dispatcher
            .single(EndpointCall::post(FIM_PATH, body))
            .await?;
        from_payload(value)
    }

    /// Streaming variant of [`MistralClient::completion`].
    pub async fn completion_stream(
        &self,
        params: CompletionParams,
    ) -> Result<ChatStream, MistralError> {
        let body = self.requests.completion_body(&params, true)?;
        self.open_stream(EndpointCall::post(FIM_PATH, body)).await
    }

    /// Embeds one text or a batch of texts.
    pub async fn embeddings(
        &self,
        model: &str,
        input: impl Into<EmbeddingInput>,
    ) -> Result<EmbeddingResponse, MistralError> {
        let body = self.requests.embeddings_body(model, &input.into())?;
        let value = self
            .dispatcher
            .single(EndpointCall::post(EMBEDDINGS_PATH, body))
            .await?;
        from_payload(value)
    }

    /// 列出当前 API Key 可用的模型
    pub async fn list_models(&self) -> Result<ModelList, MistralError> {
        let value = self.dispatcher.single(EndpointCall::get(MODELS_PATH)).await?;
        from_payload(value)
    }

    async fn open_stream(&self, call: EndpointCall) -> Result<ChatStream, MistralError> {
        let payloads = self.dispatcher.streaming(call).await?;
        Ok(Box::pin(payloads.map(|item| {
            item.and_then(from_payload::<ChatCompletionStreamResponse>)
        })))
    }
}

fn from_payload<T: DeserializeOwned>(value: Value) -> Result<T, MistralError> {
    serde_json::from_value(value)
        .map_err(|err| MistralError::decode(format!("unexpected payload shape: {err}")))
}

/// Collects configuration and collaborators for a [`MistralClient`].
#[derive(Default)]
pub struct MistralClientBuilder {
    config: ClientConfig,
    transport: Option<DynHttpTransport>,
    sleeper: Option<DynSleeper>,
}

impl MistralClientBuilder {
    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Base unit of the `2^attempt` backoff schedule.
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.config.backoff_unit = unit;
        self
    }

    /// Uses a custom transport instead of the default reqwest client.
    pub fn transport(mut self, transport: DynHttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sleeper(mut self, sleeper: DynSleeper) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Resolves the configuration and wires the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`MistralError::Configuration`] when no API key is given and
    /// `MISTRAL_API_KEY` is unset, or when the default HTTP client cannot be built.
    pub fn build(self) -> Result<MistralClient, MistralError> {
        let config = self.config.resolve()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_dyn_transport(config.timeout)?,
        };
        let requests = RequestBuilder::new(config.default_model.clone());

        let mut dispatcher = Dispatcher::new(transport, Arc::new(config));
        if let Some(sleeper) = self.sleeper {
            dispatcher = dispatcher.with_sleeper(sleeper);
        }

        Ok(MistralClient {
            dispatcher,
            requests,
        })
    }
}
