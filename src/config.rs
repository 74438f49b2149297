//! Configuration management for the relay
//!
//! Configuration is loaded from environment variables once at startup. The
//! upstream credential decides which mode the relay runs in.

use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;

/// Default per-call upstream timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default model used in direct mode
pub const DEFAULT_API_MODEL: &str = "gpt-3.5-turbo";

/// Label reported for each upstream mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiModel {
    #[serde(rename = "ChatGPTAPI")]
    ChatGptApi,
    #[serde(rename = "ChatGPTUnofficialProxyAPI")]
    ChatGptUnofficialProxyApi,
}

impl ApiModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiModel::ChatGptApi => "ChatGPTAPI",
            ApiModel::ChatGptUnofficialProxyApi => "ChatGPTUnofficialProxyAPI",
        }
    }
}

impl fmt::Display for ApiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream authentication mode, selected once from the credentials present
#[derive(Clone, PartialEq, Eq)]
pub enum UpstreamMode {
    /// OpenAI chat completions API authenticated with an API key
    Direct {
        api_key: String,
        api_base_url: Option<String>,
        model: String,
    },
    /// ChatGPT web backend reached through a reverse proxy with an access token
    Proxy {
        access_token: String,
        reverse_proxy_url: Option<String>,
    },
}

impl UpstreamMode {
    pub fn api_model(&self) -> ApiModel {
        match self {
            UpstreamMode::Direct { .. } => ApiModel::ChatGptApi,
            UpstreamMode::Proxy { .. } => ApiModel::ChatGptUnofficialProxyApi,
        }
    }

    pub fn reverse_proxy_url(&self) -> Option<&str> {
        match self {
            UpstreamMode::Proxy {
                reverse_proxy_url, ..
            } => reverse_proxy_url.as_deref(),
            UpstreamMode::Direct { .. } => None,
        }
    }
}

// Credentials stay out of log output.
impl fmt::Debug for UpstreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamMode::Direct {
                api_base_url,
                model,
                ..
            } => f
                .debug_struct("Direct")
                .field("api_key", &"<redacted>")
                .field("api_base_url", api_base_url)
                .field("model", model)
                .finish(),
            UpstreamMode::Proxy {
                reverse_proxy_url, ..
            } => f
                .debug_struct("Proxy")
                .field("access_token", &"<redacted>")
                .field("reverse_proxy_url", reverse_proxy_url)
                .finish(),
        }
    }
}

/// SOCKS proxy all outbound upstream traffic is routed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocksProxy {
    pub host: String,
    pub port: u16,
}

impl SocksProxy {
    /// Proxy URL understood by reqwest; `socks5h` resolves DNS on the proxy
    pub fn url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for SocksProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Upstream mode and its credentials
    pub mode: UpstreamMode,
    /// `API_REVERSE_PROXY` as set, whichever mode is active
    pub api_reverse_proxy: Option<String>,
    /// Optional SOCKS proxy for upstream requests
    pub socks_proxy: Option<SocksProxy>,
    /// Per-call upstream timeout (in milliseconds)
    pub timeout_ms: u64,

    /// Path of the token allow-list
    pub auth_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let api_reverse_proxy = var("API_REVERSE_PROXY");

        let mode = if let Some(api_key) = var("OPENAI_API_KEY") {
            UpstreamMode::Direct {
                api_key,
                api_base_url: var("OPENAI_API_BASE_URL").map(|v| v.trim().to_string()),
                model: var("OPENAI_API_MODEL").unwrap_or_else(|| DEFAULT_API_MODEL.to_string()),
            }
        } else if let Some(access_token) = var("OPENAI_ACCESS_TOKEN") {
            UpstreamMode::Proxy {
                access_token,
                reverse_proxy_url: api_reverse_proxy.clone(),
            }
        } else {
            bail!("Missing OPENAI_API_KEY or OPENAI_ACCESS_TOKEN environment variable");
        };

        let socks_proxy = match (var("SOCKS_PROXY_HOST"), var("SOCKS_PROXY_PORT")) {
            (Some(host), Some(port)) => Some(SocksProxy {
                host,
                port: port.trim().parse().context("Invalid SOCKS_PROXY_PORT")?,
            }),
            _ => None,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "3002".to_string())
                .parse()
                .context("Invalid PORT")?,

            mode,
            api_reverse_proxy,
            socks_proxy,
            timeout_ms: var("TIMEOUT_MS")
                .as_deref()
                .map(parse_timeout)
                .unwrap_or(DEFAULT_TIMEOUT_MS),

            auth_file: var("AUTH_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("auth.json")),
        })
    }

    pub fn api_model(&self) -> ApiModel {
        self.mode.api_model()
    }
}

/// Non-numeric or zero timeouts fall back to the default
fn parse_timeout(raw: &str) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => ms,
        _ => DEFAULT_TIMEOUT_MS,
    }
}
