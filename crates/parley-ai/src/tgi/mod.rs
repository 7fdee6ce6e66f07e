//! Client for Hugging Face Text Generation Inference and other servers that
//! speak the OpenAI chat-completions protocol.
//!
//! Streams over SSE from `{base}/v1/chat/completions`. No authentication is
//! needed for a local server; `HF_TOKEN` is sent as a bearer token if set.

mod api;
mod client;
mod config;

pub use client::TgiClient;
pub use config::TgiConfig;
