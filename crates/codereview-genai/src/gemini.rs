use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{truncate_utf8, GenerationError, GenerationOutcome, Generator, SystemInstruction};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Whole-request deadline, including reading the body.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let model = self.model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{base}/v1beta/models/{model}:generateContent")
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// [`Generator`] backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    config: GeminiConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("codereview/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Self {
        let endpoint = config.endpoint();
        Self {
            config,
            endpoint,
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.config.timeout)
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn backend(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        instruction: SystemInstruction,
        input: &str,
    ) -> Result<GenerationOutcome, GenerationError> {
        let body = GenerateContentRequest::new(instruction.text(), input);
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        debug!(
            target: "codereview::genai",
            model = %self.config.model,
            status = status.as_u16(),
            bytes = bytes.len(),
            "gemini response received"
        );
        if !status.is_success() {
            return Err(decode_failure(status.as_u16(), &bytes));
        }
        decode_success(&bytes)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: RequestContent<'a>,
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(instruction: &'a str, input: &'a str) -> Self {
        Self {
            system_instruction: RequestContent {
                role: None,
                parts: [RequestPart { text: instruction }],
            },
            contents: [RequestContent {
                role: Some("user"),
                parts: [RequestPart { text: input }],
            }],
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all non-thought parts joined in order.
    fn text(&self) -> String {
        let Some(content) = self.candidates.first().and_then(|c| c.content.as_ref()) else {
            return String::new();
        };
        content
            .parts
            .iter()
            .filter(|part| part.thought != Some(true))
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

fn decode_success(bytes: &[u8]) -> Result<GenerationOutcome, GenerationError> {
    let parsed: GenerateContentResponse =
        serde_json::from_slice(bytes).map_err(|err| GenerationError::Decode(err.to_string()))?;
    let text = parsed.text();
    if text.is_empty() {
        let block_reason = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        let finish_reason = parsed
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref());
        warn!(
            target: "codereview::genai",
            candidates = parsed.candidates.len(),
            block_reason,
            finish_reason,
            "gemini returned no text"
        );
    }
    Ok(GenerationOutcome::from_text(text))
}

fn decode_failure(status: u16, bytes: &[u8]) -> GenerationError {
    let message = serde_json::from_slice::<ErrorEnvelope>(bytes)
        .ok()
        .and_then(|env| env.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let raw = String::from_utf8_lossy(bytes);
            let raw = raw.trim();
            if raw.is_empty() {
                format!("provider returned HTTP {status}")
            } else {
                truncate_utf8(raw, ERROR_BODY_LIMIT).to_string()
            }
        });
    GenerationError::Provider { status, message }
}
