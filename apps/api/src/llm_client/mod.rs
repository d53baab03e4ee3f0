//! LLM client for notification copy. Calls sit on the request path of
//! `notify-completion`, so the budget is one short retry; callers fall back on error.
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 300;
const ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(300);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("reply is not the expected JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("reply has no JSON object")]
    NoJson,
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Turn<'a>; 1],
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct Reply {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: Option<String>,
}

impl Reply {
    fn joined_text(self) -> String {
        self.content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Overload and rate limiting are worth one more try; anything else is final.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// The outermost `{ ... }` span of a reply, tolerating code fences and chatter.
fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
        })
    }

    async fn send_once(&self, request: &Request<'_>) -> Result<String, LlmError> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }
        Ok(response.json::<Reply>().await?.joined_text())
    }

    /// Asks for a JSON object and decodes it into `T`.
    pub async fn ask_json<T: DeserializeOwned>(&self, system: &str, prompt: &str) -> Result<T, LlmError> {
        let request = Request {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [Turn {
                role: "user",
                content: prompt,
            }],
        };

        let started = Instant::now();
        let mut attempt = 1;
        let text = loop {
            match self.send_once(&request).await {
                Ok(text) => break text,
                Err(LlmError::Status { status, body }) if is_retryable(status) && attempt < ATTEMPTS => {
                    warn!("LLM returned {status}, retrying: {body}");
                }
                Err(LlmError::Transport(e)) if e.is_timeout() && attempt < ATTEMPTS => {
                    warn!("LLM request timed out, retrying");
                }
                Err(e) => return Err(e),
            }
            attempt += 1;
            tokio::time::sleep(RETRY_DELAY).await;
        };
        debug!(
            "LLM replied in {}ms after {attempt} attempt(s)",
            started.elapsed().as_millis()
        );

        let object = json_object(&text).ok_or(LlmError::NoJson)?;
        Ok(serde_json::from_str(object)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object_inside_fence_and_prose() {
        let reply = "Here you go:\n```json\n{\"content\": \"Nice work!\", \"sentiment\": 0.8}\n```";
        assert_eq!(
            json_object(reply),
            Some("{\"content\": \"Nice work!\", \"sentiment\": 0.8}")
        );
    }

    #[test]
    fn test_json_object_missing() {
        assert_eq!(json_object("Sorry, I can't help with that."), None);
        assert_eq!(json_object("} backwards {"), None);
    }

    #[test]
    fn test_only_overload_and_rate_limit_retry() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_reply_text_joins_text_blocks() {
        let reply: Reply = serde_json::from_str(
            r#"{"content": [{"type": "thinking"}, {"type": "text", "text": "{\"content\":"},
                            {"type": "text", "text": " \"hi\"}"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.joined_text(), "{\"content\": \"hi\"}");
    }
}
