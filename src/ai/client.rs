use crate::ai::backoff::retry_delay;
use crate::ai::sse::SseParser;
use crate::chunker;
use futures::StreamExt;
use regex::Regex;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const MODEL: &str = "deepseek-chat";
const DONE_SENTINEL: &str = "[DONE]";
const MAX_ATTEMPTS: u32 = 5;
/// Articles estimated above this many tokens are rewritten in chunks.
const MAX_CHUNK_TOKENS: usize = 2500;
const FULL_MAX_TOKENS: u32 = 4096;
const CHUNK_MAX_TOKENS: u32 = 3000;
const INTERLINK_TEMPERATURE: f64 = 0.5;

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap());

#[derive(Error, Debug)]
pub enum AiError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("http error {0}")]
    Http(reqwest::StatusCode),

    #[error("empty response from model")]
    Empty,

    #[error("unparseable model response: {0}")]
    Parse(String),

    #[error("model response is missing title or body")]
    Incomplete,

    #[error("giving up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<AiError>,
    },
}

/// Per-run rewriting parameters, resolved from the stored AI settings.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub prompt: String,
    pub temperature: f64,
}

/// Structured rewrite result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    pub title: String,
    pub description: String,
    pub body: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Streaming chat-completion client for the rewriting model.
pub struct AiClient {
    http: Client,
    base_url: String,
}

impl AiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(300))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Rewrite an article, returning the new title, meta description and
    /// body. Long content is split per [`chunker::split`]: the first chunk
    /// yields the full structured result, remaining chunks are rewritten as
    /// plain text and fall back to their original text on failure.
    pub async fn rewrite(
        &self,
        cfg: &AiConfig,
        title: &str,
        content: &str,
    ) -> Result<Rewrite, AiError> {
        if chunker::estimate_tokens(content) <= MAX_CHUNK_TOKENS {
            return self.rewrite_chunk(cfg, title, content, true).await;
        }

        let chunks = chunker::split(content, MAX_CHUNK_TOKENS);
        debug!(chunks = chunks.len(), "rewriting long article in chunks");

        let first = self.rewrite_chunk(cfg, title, &chunks[0], true).await?;
        let mut parts = vec![first.body];

        for chunk in &chunks[1..] {
            match self.rewrite_chunk(cfg, title, chunk, false).await {
                Ok(part) if !part.body.is_empty() => parts.push(part.body),
                Ok(_) => parts.push(chunk.clone()),
                Err(err) => {
                    warn!(error = %err, "chunk rewrite failed, keeping original text");
                    parts.push(chunk.clone());
                }
            }
        }

        Ok(Rewrite {
            title: first.title,
            description: first.description,
            body: parts.join("\n\n"),
        })
    }

    /// Weave `url` into `body` as an in-place hyperlink via a second model
    /// pass. Never fatal: any failure returns the body unchanged.
    pub async fn weave_link(&self, cfg: &AiConfig, body: &str, url: &str) -> String {
        let system = format!(
            "Weave the URL \"{url}\" organically into the main text as a hyperlink. \
             Return only the updated text, without commentary."
        );
        match self
            .chat_stream(cfg, &system, body, INTERLINK_TEMPERATURE, FULL_MAX_TOKENS)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("interlink pass returned empty text, keeping original body");
                body.to_string()
            }
            Err(err) => {
                warn!(error = %err, "interlink pass failed, keeping original body");
                body.to_string()
            }
        }
    }

    /// One rewrite call with retry. `include_title` asks the model for the
    /// full JSON object; otherwise only rewritten plain text is requested.
    async fn rewrite_chunk(
        &self,
        cfg: &AiConfig,
        title: &str,
        content: &str,
        include_title: bool,
    ) -> Result<Rewrite, AiError> {
        let user = if include_title {
            format!("Title: {title}\n\nArticle text:\n{content}")
        } else {
            format!(
                "Rewrite the following text in the same style, preserving its meaning. \
                 Return only the rewritten text, without JSON:\n\n{content}"
            )
        };
        let max_tokens = if include_title {
            FULL_MAX_TOKENS
        } else {
            CHUNK_MAX_TOKENS
        };

        let mut last_error = AiError::Empty;
        for attempt in 1..=MAX_ATTEMPTS {
            let result = self
                .attempt_rewrite(cfg, &user, max_tokens, include_title)
                .await;
            match result {
                Ok(rewrite) => return Ok(rewrite),
                Err(err) => {
                    last_error = err;
                    if attempt < MAX_ATTEMPTS {
                        let delay = retry_delay(attempt);
                        debug!(
                            attempt,
                            delay_secs = delay.as_secs(),
                            error = %last_error,
                            "rewrite attempt failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(AiError::Exhausted {
            attempts: MAX_ATTEMPTS,
            source: Box::new(last_error),
        })
    }

    async fn attempt_rewrite(
        &self,
        cfg: &AiConfig,
        user: &str,
        max_tokens: u32,
        include_title: bool,
    ) -> Result<Rewrite, AiError> {
        let text = self
            .chat_stream(cfg, &cfg.prompt, user, cfg.temperature, max_tokens)
            .await?;
        if text.trim().is_empty() {
            return Err(AiError::Empty);
        }
        if include_title {
            parse_rewrite_json(&text)
        } else {
            Ok(Rewrite {
                title: String::new(),
                description: String::new(),
                body: text.trim().to_string(),
            })
        }
    }

    /// Issue one streamed chat-completion request and assemble the streamed
    /// text fragments in arrival order.
    async fn chat_stream(
        &self,
        cfg: &AiConfig,
        system: &str,
        user: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, AiError> {
        let request = ChatRequest {
            model: MODEL,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
            stream: true,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&cfg.api_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Http(status));
        }

        let mut parser = SseParser::new();
        let mut full = String::new();
        let mut stream = response.bytes_stream();

        'stream: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AiError::Request(e.to_string()))?;
            for payload in parser.push(&chunk) {
                if payload == DONE_SENTINEL {
                    break 'stream;
                }
                if let Some(delta) = extract_delta(&payload) {
                    full.push_str(&delta);
                }
            }
        }

        Ok(full)
    }
}

/// Text fragment carried by one streamed event; malformed events are skipped,
/// as are events without content (role announcements, finish reasons).
fn extract_delta(payload: &str) -> Option<String> {
    let parsed: StreamChunk = serde_json::from_str(payload).ok()?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
}

/// Parse the model's JSON answer, tolerating a markdown code fence around it.
/// Missing or empty `title`/`body` is a parse failure.
fn parse_rewrite_json(text: &str) -> Result<Rewrite, AiError> {
    let payload = CODE_FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(text);

    #[derive(Deserialize)]
    struct Raw {
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        body: String,
    }

    let raw: Raw = serde_json::from_str(payload).map_err(|e| AiError::Parse(e.to_string()))?;
    if raw.title.is_empty() || raw.body.is_empty() {
        return Err(AiError::Incomplete);
    }
    Ok(Rewrite {
        title: raw.title,
        description: raw.description,
        body: raw.body,
    })
}
