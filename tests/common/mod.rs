#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use mistral_client::error::MistralError;
use mistral_client::http::{
    HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};
use mistral_client::retry::Sleeper;
use mistral_client::{MistralClient, MistralClientBuilder};
use serde_json::{Value, json};

pub const TEST_ENDPOINT: &str = "https://api.mistral.ai";
pub const TEST_API_KEY: &str = "test_api_key";

/// Replays scripted responses in order and records every request it sees.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back((status, body.into()));
    }

    pub fn push_json(&self, status: u16, body: &Value) {
        self.push(status, body.to_string());
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: HttpRequest) -> (u16, String) {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left")
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MistralError> {
        let (status, body) = self.next(request);
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.into_bytes(),
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, MistralError> {
        let (status, body) = self.next(request);
        // One chunk per line, as a server flushing each event would produce.
        let chunks: Vec<Result<Vec<u8>, MistralError>> = body
            .split_inclusive('\n')
            .map(|line| Ok(line.as_bytes().to_vec()))
            .collect();
        let body: HttpBodyStream = Box::pin(stream::iter(chunks));
        Ok(HttpStreamResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    }
}

/// Records backoff delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub fn builder(
    transport: &Arc<MockTransport>,
    sleeper: &Arc<RecordingSleeper>,
) -> MistralClientBuilder {
    MistralClient::builder()
        .api_key(TEST_API_KEY)
        .endpoint(TEST_ENDPOINT)
        .transport(transport.clone())
        .sleeper(sleeper.clone())
}

pub fn client(transport: &Arc<MockTransport>) -> MistralClient {
    builder(transport, &RecordingSleeper::new())
        .build()
        .expect("client")
}

pub fn chat_response() -> Value {
    json!({
        "id": "chat-98c8c60e3fbf4fc49658eddaf447357c",
        "object": "chat.completion",
        "created": 1703165682,
        "model": "mistral-small",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "What is the best French cheese?"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 90, "total_tokens": 180, "completion_tokens": 90}
    })
}

/// Role chunk, ten content chunks and the terminator.
pub fn chat_stream_body() -> String {
    let mut lines = vec![stream_chunk(json!({"role": "assistant"}), None)];
    for index in 0..10 {
        lines.push(stream_chunk(
            json!({"content": format!("stream response {index}")}),
            None,
        ));
    }
    let mut body: String = lines
        .into_iter()
        .map(|chunk| format!("data: {chunk}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn stream_chunk(delta: Value, finish_reason: Option<&str>) -> Value {
    json!({
        "id": "cmpl-8cd9019d21ba490aa6b9740f5d0a883e",
        "model": "mistral-small",
        "object": "chat.completion.chunk",
        "created": 1703168544,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    })
}

pub fn embeddings_response(count: usize) -> Value {
    let data: Vec<Value> = (0..count)
        .map(|index| {
            json!({
                "object": "embedding",
                "embedding": [-0.018585205078125, 0.027099609375, 0.02587890625],
                "index": index
            })
        })
        .collect();
    json!({
        "id": "embd-98c8c60e3fbf4fc49658eddaf447357c",
        "object": "list",
        "data": data,
        "model": "mistral-embed",
        "usage": {"prompt_tokens": 90, "total_tokens": 90, "completion_tokens": 0}
    })
}

pub fn models_response() -> Value {
    json!({
        "object": "list",
        "data": [
            {"id": "mistral-medium", "object": "model", "created": 1703186988, "owned_by": "mistralai", "root": null, "parent": null, "permission": [
                {"id": "modelperm-15bebaf316264adb84b891bf06a84933", "object": "model_permission", "created": 1703186988, "allow_create_engine": false, "allow_sampling": true, "allow_logprobs": false, "allow_search_indices": false, "allow_view": true, "allow_fine_tuning": false, "organization": "*", "group": null, "is_blocking": false}
            ]},
            {"id": "mistral-small", "object": "model", "created": 1703186988, "owned_by": "mistralai", "root": null, "parent": null, "permission": []},
            {"id": "mistral-tiny", "object": "model", "created": 1703186988, "owned_by": "mistralai", "root": null, "parent": null, "permission": []},
            {"id": "mistral-embed", "object": "model", "created": 1703186988, "owned_by": "mistralai", "root": null, "parent": null, "permission": []}
        ]
    })
}
