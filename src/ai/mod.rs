pub mod backoff;
pub mod client;
pub mod sse;

pub use client::{AiClient, AiConfig, AiError, Rewrite};
pub use sse::SseParser;
