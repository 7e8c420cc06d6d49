use std::thread;
use std::time::Duration;

use log::{debug, warn};
use mediarecon_recon::{FetchJson, ReconcileError};
use serde_json::Value;

// ── Constants ───────────────────────────────────────────────────────

pub const DEFAULT_USER_AGENT: &str = concat!("mediarecon/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest body excerpt kept in an error message.
const BODY_EXCERPT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection, timeout, or body read failure.
    Network(String),
    /// Non-success status with a body excerpt.
    Http(u16, String),
    /// Body was not JSON.
    Parse(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ClientError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Engine-level error for a failed call to `endpoint`.
    pub fn into_remote(self, endpoint: &str) -> ReconcileError {
        ReconcileError::remote(endpoint, self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Extra attempts after a 429/5xx or a network failure. `0` disables retry.
    pub max_retries: u32,
    /// First retry delay; doubled after each retry.
    pub backoff: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            backoff: Duration::from_secs(1),
        }
    }
}

// ── HttpFetcher ─────────────────────────────────────────────────────

/// Blocking JSON-over-GET transport.
pub struct HttpFetcher {
    http: reqwest::blocking::Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Network(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { http, max_retries: settings.max_retries, backoff: settings.backoff })
    }

    /// GET `url?params` and decode the body as JSON.
    ///
    /// 4xx other than 429 fails at once. 429, 5xx, and network failures are
    /// retried up to `max_retries` times with exponential backoff; a 429's
    /// `Retry-After` (seconds) overrides the computed delay.
    pub fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ClientError> {
        let mut delay = self.backoff;

        for attempt in 0..=self.max_retries {
            let last = attempt == self.max_retries;

            let resp = match self.http.get(url).query(params).send() {
                Ok(resp) => resp,
                Err(e) => {
                    if last {
                        return Err(ClientError::Network(e.to_string()));
                    }
                    warn!("retry {}/{} in {:?} ({})", attempt + 1, self.max_retries, delay, e);
                    thread::sleep(delay);
                    delay *= 2;
                    continue;
                }
            };

            let status = resp.status().as_u16();
            debug!("GET {} -> {}", url, status);

            // Retryable: 429, 5xx
            if status == 429 || status >= 500 {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                if last {
                    return Err(ClientError::Http(status, excerpt(&resp.text().unwrap_or_default())));
                }
                let wait = if status == 429 { retry_after.unwrap_or(delay) } else { delay };
                warn!("retry {}/{} in {:?} (HTTP {})", attempt + 1, self.max_retries, wait, status);
                thread::sleep(wait);
                delay *= 2;
                continue;
            }

            if status >= 400 {
                return Err(ClientError::Http(status, excerpt(&resp.text().unwrap_or_default())));
            }

            let text = resp
                .text()
                .map_err(|e| ClientError::Network(format!("failed to read response body: {}", e)))?;
            let trimmed = text.trim_start_matches('\u{feff}');
            return serde_json::from_str(trimmed)
                .map_err(|e| ClientError::Parse(format!("{} (body: {})", e, excerpt(trimmed))));
        }

        Err(ClientError::Network(format!("no attempt made for {}", url)))
    }
}

impl FetchJson for HttpFetcher {
    fn fetch_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ReconcileError> {
        self.get_json(url, params).map_err(|e| e.into_remote(url))
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((end, _)) => format!("{}…", &body[..end]),
        None => body.to_string(),
    }
}
