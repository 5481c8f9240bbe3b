//! Async client for the Mistral AI API: chat, fill-in-the-middle completion,
//! embeddings and model listing, with SSE streaming and retry with backoff.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod logging;
pub mod request;
pub mod retry;
pub mod sse;
pub mod status;
pub mod types;

pub use client::{ChatStream, MistralClient, MistralClientBuilder};
pub use config::ClientConfig;
pub use error::MistralError;
pub use request::{ChatParams, CompletionParams, Structured};
pub use types::*;
