use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use codereview_genai::{GeminiConfig, SystemInstruction, DEFAULT_BASE_URL, DEFAULT_MODEL};
use url::Url;

pub(crate) const DEFAULT_PORT: u16 = 3000;
pub(crate) const DEFAULT_BIND: &str = "0.0.0.0";
pub(crate) const DEFAULT_PING_URL: &str = "https://codeaireview.onrender.com/";
/// 14 minutes 30 seconds: just under the host's 15 minute idle cutoff.
pub(crate) const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(14 * 60 + 30);
const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_GEN_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_CONC: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("GOOGLE_GEMINI_KEY environment variable is not set")]
    MissingApiKey,
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
    #[error("invalid CODEREVIEW_BIND: {0}")]
    InvalidBind(String),
    #[error("invalid {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("invalid CODEREVIEW_PROMPT: {0} (expected standard or strict)")]
    InvalidPrompt(String),
    #[error("invalid RENDER_EXTERNAL_URL: {0}")]
    InvalidPingUrl(String),
}

#[derive(Clone, Debug)]
pub(crate) struct HttpConfig {
    pub addr: SocketAddr,
    pub concurrency_limit: usize,
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    pub access_log: bool,
    pub trust_forward: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct KeepaliveConfig {
    pub enabled: bool,
    pub url: Url,
    pub interval: Duration,
    pub timeout: Duration,
}

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Clone, Debug)]
pub(crate) struct ServerConfig {
    pub http: HttpConfig,
    pub gemini: GeminiConfig,
    pub instruction: SystemInstruction,
    pub keepalive: KeepaliveConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("GOOGLE_GEMINI_KEY").ok_or(ConfigError::MissingApiKey)?;
        let gemini = GeminiConfig::new(api_key)
            .with_model(get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()))
            .with_base_url(get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))
            .with_timeout(secs(
                get("CODEREVIEW_GEN_TIMEOUT_SECS"),
                "CODEREVIEW_GEN_TIMEOUT_SECS",
                DEFAULT_GEN_TIMEOUT,
            )?);

        let instruction = match get("CODEREVIEW_PROMPT") {
            Some(raw) => SystemInstruction::parse(&raw).ok_or(ConfigError::InvalidPrompt(raw))?,
            None => SystemInstruction::default(),
        };

        Ok(Self {
            http: http_config(&get)?,
            gemini,
            instruction,
            keepalive: keepalive_config(&get)?,
        })
    }
}

fn http_config<G>(get: &G) -> Result<HttpConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let port = match get("PORT") {
        Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
        None => DEFAULT_PORT,
    };
    let bind = get("CODEREVIEW_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
    let ip = if bind.eq_ignore_ascii_case("localhost") {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        bind.trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidBind(bind.clone()))?
    };
    let concurrency_limit = match get("CODEREVIEW_HTTP_MAX_CONC") {
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ConfigError::InvalidNumber {
                key: "CODEREVIEW_HTTP_MAX_CONC",
                value: raw,
            })?,
        None => DEFAULT_MAX_CONC,
    };
    let cors_origins = get("CODEREVIEW_CORS_ORIGINS").and_then(|raw| {
        let origins: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    });

    Ok(HttpConfig {
        addr: SocketAddr::new(ip, port),
        concurrency_limit,
        cors_origins,
        // The rolling sink only receives lines the middleware emits.
        access_log: get("CODEREVIEW_ACCESS_LOG").is_some_and(|v| truthy(&v))
            || get("CODEREVIEW_ACCESS_LOG_ROLL").as_deref() == Some("1"),
        trust_forward: get("CODEREVIEW_TRUST_FORWARD_HEADERS").is_some_and(|v| truthy(&v)),
    })
}

fn keepalive_config<G>(get: &G) -> Result<KeepaliveConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let raw_url = get("RENDER_EXTERNAL_URL").unwrap_or_else(|| DEFAULT_PING_URL.to_string());
    let url = Url::parse(&raw_url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .ok_or(ConfigError::InvalidPingUrl(raw_url))?;
    Ok(KeepaliveConfig {
        enabled: get("CODEREVIEW_KEEPALIVE").map_or(true, |v| !falsy(&v)),
        url,
        interval: secs(
            get("CODEREVIEW_KEEPALIVE_INTERVAL_SECS"),
            "CODEREVIEW_KEEPALIVE_INTERVAL_SECS",
            DEFAULT_KEEPALIVE_INTERVAL,
        )?,
        timeout: secs(
            get("CODEREVIEW_KEEPALIVE_TIMEOUT_SECS"),
            "CODEREVIEW_KEEPALIVE_TIMEOUT_SECS",
            DEFAULT_KEEPALIVE_TIMEOUT,
        )?,
    })
}

fn secs(raw: Option<String>, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidNumber { key, value: raw }),
    }
}

fn truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn falsy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
