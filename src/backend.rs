//! Backend clients: the [`VisionBackend`] seam, the Gemini REST
//! implementation, and the [`ClientPool`] of per-key clients.
//!
//! ## Why a pool of clients instead of one?
//!
//! Free-tier vision quotas are enforced per API key, and a scanning session
//! can burn through one key's daily allowance in minutes. Binding one client
//! per key and rotating between them turns N keys into N times the quota
//! without any coordination beyond the dispatcher's shuffle.
//!
//! The pool is constructed once at startup and passed explicitly into every
//! batch call — there is no process-wide default list hiding behind the API.

use crate::error::{BackendError, BatchError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// MIME type declared for every dispatched half.
pub const IMAGE_MIME: &str = "image/jpeg";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One backend access handle bound to one credential.
///
/// The dispatcher only ever talks to this trait, so tests (and alternative
/// backends) plug in without touching retry logic.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Short non-secret tag identifying the credential in logs.
    fn label(&self) -> &str;

    /// Send one (image, instruction) pair to `model` and await the reply text.
    ///
    /// Any failure is a [`BackendError`] and is retryable from the caller's
    /// point of view.
    async fn generate(
        &self,
        model: &str,
        image: &[u8],
        mime: &str,
        instruction: &str,
    ) -> Result<String, BackendError>;
}

// ── Gemini wire types ────────────────────────────────────────────────────
//
// Only the fields this crate reads/writes; the REST surface is much larger.

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Concatenate the first candidate's text parts, if any.
fn reply_text(resp: GenerateResponse) -> Option<String> {
    let content = resp.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ── Gemini client ────────────────────────────────────────────────────────

/// A Gemini `generateContent` client bound to a single API key.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    key_tag: String,
}

impl GeminiClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), api_key)
    }

    /// Create a client sharing an existing `reqwest::Client`.
    ///
    /// [`ClientPool::from_gemini_keys`] uses this so N keys share one
    /// connection pool instead of opening N.
    pub fn with_http(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let key_tag = key_tag(&api_key);
        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            key_tag,
        }
    }

    /// Point the client at a different endpoint (self-hosted proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Last four characters of the key, for log lines. Never the full secret.
fn key_tag(api_key: &str) -> String {
    let tail: String = api_key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("key…{tail}")
}

#[async_trait]
impl VisionBackend for GeminiClient {
    fn label(&self) -> &str {
        &self.key_tag
    }

    async fn generate(
        &self,
        model: &str,
        image: &[u8],
        mime: &str,
        instruction: &str,
    ) -> Result<String, BackendError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        // Part order matters to the deployed prompt: image first, then text.
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: mime.to_string(),
                            data: STANDARD.encode(image),
                        },
                    },
                    RequestPart::Text {
                        text: instruction.to_string(),
                    },
                ],
            }],
        };

        debug!("{}: POST {} ({} image bytes)", self.key_tag, url, image.len());

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                detail: truncate(&detail, 200),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(format!("decoding reply: {e}")))?;

        reply_text(parsed).ok_or(BackendError::EmptyReply)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}…")
    }
}

// ── Client pool ──────────────────────────────────────────────────────────

/// An explicit, immutable pool of backend clients, one per credential.
#[derive(Clone)]
pub struct ClientPool {
    clients: Vec<Arc<dyn VisionBackend>>,
}

impl ClientPool {
    /// Build a pool from pre-constructed clients.
    pub fn new(clients: Vec<Arc<dyn VisionBackend>>) -> Result<Self, BatchError> {
        if clients.is_empty() {
            return Err(BatchError::EmptyClientPool);
        }
        Ok(Self { clients })
    }

    /// Build one [`GeminiClient`] per key, all sharing one HTTP client.
    pub fn from_gemini_keys<I, S>(keys: I) -> Result<Self, BatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| BatchError::InvalidConfig(format!("HTTP client: {e}")))?;

        let clients: Vec<Arc<dyn VisionBackend>> = keys
            .into_iter()
            .map(|k| Arc::new(GeminiClient::with_http(http.clone(), k)) as Arc<dyn VisionBackend>)
            .collect();
        Self::new(clients)
    }

    /// Build a pool from the `GEMINI_API_KEY` environment variable, which may
    /// hold one key or a comma-separated list.
    pub fn from_env() -> Result<Self, BatchError> {
        let raw = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        Self::from_gemini_keys(keys)
    }

    pub fn clients(&self) -> &[Arc<dyn VisionBackend>] {
        &self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("clients", &self.clients.len())
            .finish()
    }
}
