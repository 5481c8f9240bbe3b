//! Orchestrates one logical API call: transport, status classification, bounded retry
//! with exponential backoff, and decoding of single or streamed payloads.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use futures_util::stream;
use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::error::MistralError;
use crate::http::{
    DynHttpTransport, HttpBodyStream, HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse,
    collect_body,
};
use crate::retry::{DynSleeper, TokioSleeper, backoff_delay};
use crate::sse::SseLineStream;
use crate::status::{StatusClass, classify};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("mistral-client-rust/", env!("CARGO_PKG_VERSION"));

/// Lazily decoded payloads of a streaming call.
pub type PayloadStream = Pin<Box<dyn Stream<Item = Result<Value, MistralError>> + Send>>;

/// One API invocation: method, path relative to the endpoint, optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub stream: bool,
}

impl EndpointCall {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
            stream: false,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
            stream: false,
        }
    }

    /// Marks the call as an SSE stream.
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Terminal outcome of a successful call.
pub enum CallOutcome {
    Single(Value),
    Stream(PayloadStream),
}

impl std::fmt::Debug for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallOutcome::Single(value) => f.debug_tuple("Single").field(value).finish(),
            CallOutcome::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Completed HTTP exchange, buffered or still streaming.
enum Exchange {
    Buffered(HttpResponse),
    Streaming(HttpStreamResponse),
}

impl Exchange {
    fn status(&self) -> u16 {
        match self {
            Exchange::Buffered(response) => response.status,
            Exchange::Streaming(response) => response.status,
        }
    }

    /// Consumes the body; used for error reporting and non-streaming decoding.
    async fn into_parts(self) -> Result<(u16, HashMap<String, String>, String), MistralError> {
        match self {
            Exchange::Buffered(response) => {
                let body = String::from_utf8_lossy(&response.body).into_owned();
                Ok((response.status, response.headers, body))
            }
            Exchange::Streaming(response) => {
                let body = collect_body(response.body).await?;
                Ok((response.status, response.headers, body))
            }
        }
    }

    fn into_body_stream(self) -> HttpBodyStream {
        match self {
            Exchange::Buffered(response) => Box::pin(stream::once(async move {
                Ok::<_, MistralError>(response.body)
            })),
            Exchange::Streaming(response) => response.body,
        }
    }
}

/// Issues calls against the configured endpoint.
///
/// Cloning is cheap; clones share the transport and the immutable configuration.
/// Retry state lives on the stack of each call.
#[derive(Clone)]
pub struct Dispatcher {
    transport: DynHttpTransport,
    config: Arc<ResolvedConfig>,
    sleeper: DynSleeper,
}

impl Dispatcher {
    pub fn new(transport: DynHttpTransport, config: Arc<ResolvedConfig>) -> Self {
        Self {
            transport,
            config,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper used between retry attempts.
    pub fn with_sleeper(mut self, sleeper: DynSleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Runs a call and returns a single payload or a payload stream, per `call.stream`.
    ///
    /// # Errors
    ///
    /// - [`MistralError::Connection`] when the server cannot be reached (never retried).
    /// - [`MistralError::ApiStatus`] when a retryable status outlives the retry budget.
    /// - [`MistralError::Api`] on other 4xx statuses or an `object: "error"` payload.
    /// - [`MistralError::Unexpected`] on other 5xx statuses, transport failures or a
    ///   payload without `object`.
    /// - [`MistralError::Decode`] when a non-streaming body is not JSON.
    pub async fn call(&self, call: &EndpointCall) -> Result<CallOutcome, MistralError> {
        let exchange = self.execute(call).await?;
        if call.stream {
            Ok(CallOutcome::Stream(Box::pin(SseLineStream::new(
                exchange.into_body_stream(),
            ))))
        } else {
            parse_single(exchange).await.map(CallOutcome::Single)
        }
    }

    /// Runs a non-streaming call and returns its payload.
    pub async fn single(&self, call: EndpointCall) -> Result<Value, MistralError> {
        let call = EndpointCall {
            stream: false,
            ..call
        };
        let exchange = self.execute(&call).await?;
        parse_single(exchange).await
    }

    /// Runs a streaming call and returns the lazy payload stream.
    ///
    /// Dropping the stream releases the underlying connection.
    pub async fn streaming(&self, call: EndpointCall) -> Result<PayloadStream, MistralError> {
        let call = call.streaming();
        let exchange = self.execute(&call).await?;
        Ok(Box::pin(SseLineStream::new(exchange.into_body_stream())))
    }

    fn build_request(&self, call: &EndpointCall) -> Result<HttpRequest, MistralError> {
        let accept = if call.stream {
            "text/event-stream"
        } else {
            "application/json"
        };
        let headers = HashMap::from([
            ("Accept".to_string(), accept.to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ]);

        let mut request = HttpRequest::new(call.method, self.config.url(&call.path))
            .with_headers(headers)
            .with_timeout(self.config.timeout);
        if let Some(body) = &call.body {
            let payload = serde_json::to_vec(body).map_err(|err| {
                MistralError::unexpected(format!("failed to serialize request: {err}"))
            })?;
            request = request.with_body(payload);
        }
        Ok(request)
    }

    /// Sends the request until a non-retryable outcome, re-issuing it unchanged
    /// after each retryable status.
    async fn execute(&self, call: &EndpointCall) -> Result<Exchange, MistralError> {
        let request = self.build_request(call)?;
        let max_retries = self.config.max_retries;
        let mut attempt: u32 = 1;

        loop {
            tracing::debug!(
                method = call.method.as_str(),
                url = %request.url,
                stream = call.stream,
                attempt,
                "sending request"
            );

            let exchange = if call.stream {
                Exchange::Streaming(self.transport.send_stream(request.clone()).await?)
            } else {
                Exchange::Buffered(self.transport.send(request.clone()).await?)
            };

            match classify(exchange.status()) {
                StatusClass::Success => return Ok(exchange),
                StatusClass::Retryable => {
                    let (status, headers, body) = exchange.into_parts().await?;
                    if attempt > max_retries {
                        tracing::error!(status, attempt, "retry budget exhausted");
                        return Err(MistralError::ApiStatus {
                            message: format!("Status: {status}. Message: {body}"),
                            status,
                            body,
                            headers,
                        });
                    }
                    let delay = backoff_delay(attempt, self.config.backoff_unit);
                    tracing::warn!(status, attempt, ?delay, "retryable status, backing off");
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                StatusClass::ClientError => {
                    let (status, headers, body) = exchange.into_parts().await?;
                    return Err(MistralError::Api {
                        message: format!("Status: {status}. Message: {body}"),
                        status: Some(status),
                        body,
                        headers,
                    });
                }
                StatusClass::ServerError => {
                    let (status, _, body) = exchange.into_parts().await?;
                    return Err(MistralError::unexpected(format!(
                        "Status: {status}. Message: {body}"
                    )));
                }
            }
        }
    }
}

/// Decodes a complete body and checks the `object` discriminator.
async fn parse_single(exchange: Exchange) -> Result<Value, MistralError> {
    let (status, headers, body) = exchange.into_parts().await?;
    let value: Value = serde_json::from_str(&body)
        .map_err(|err| MistralError::decode(format!("Failed to decode json body: {body} ({err})")))?;

    match value.get("object") {
        None => Err(MistralError::unexpected(format!(
            "Unexpected response: {value}"
        ))),
        Some(Value::String(object)) if object == "error" => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(MistralError::Api {
                message,
                status: Some(status),
                body,
                headers,
            })
        }
        Some(_) => Ok(value),
    }
}
