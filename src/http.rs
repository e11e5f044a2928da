//! Blocking REST client shared by the Bitbucket and Jira plugins.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::BasicAuth;
use crate::errors::MenuError;

pub const TIMEOUT_ENV: &str = "ARGOS_MENUS_HTTP_TIMEOUT";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

fn timeout_from_env() -> Duration {
    parse_timeout(std::env::var(TIMEOUT_ENV).ok().as_deref())
}

/// Whole seconds; unset, unparsable or zero means the default.
fn parse_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    host: String,
    auth: BasicAuth,
}

impl RestClient {
    pub fn new(host: &str, auth: BasicAuth) -> Result<Self, MenuError> {
        let client = Client::builder()
            .timeout(timeout_from_env())
            .user_agent(concat!("argos-menus/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.auth.user
    }

    /// Absolute URL for an API path, with query pairs encoded.
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, MenuError> {
        let mut url = Url::parse(&format!("{}{}", self.host, path))
            .map_err(|e| MenuError::Parse(format!("bad url for {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Authenticated GET decoded as JSON.
    pub fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, MenuError> {
        tracing::debug!(url = %url, "GET");
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.auth.user, Some(&self.auth.token))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()?;
        let resp = check_status(resp)?;
        Ok(resp.json()?)
    }

    /// Authenticated GET of raw bytes (avatars, issue type icons).
    /// Relative URLs are resolved against the host.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, MenuError> {
        let absolute = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.host, url)
        };
        tracing::debug!(url = %absolute, "GET bytes");
        let resp = self
            .client
            .get(&absolute)
            .basic_auth(&self.auth.user, Some(&self.auth.token))
            .send()?;
        let resp = check_status(resp)?;
        Ok(resp.bytes()?.to_vec())
    }
}

/// Whether `host` answers a HEAD request within a few seconds (any status counts).
pub fn probe(host: &str) -> bool {
    let client = match Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(c) => c,
        Err(_) => return false,
    };
    match client.head(host).send() {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(host, error = %e, "host probe failed");
            false
        }
    }
}

fn check_status(resp: Response) -> Result<Response, MenuError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let message = api_error_message(&body)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    Err(MenuError::Api(message))
}

/// First human readable message from a Bitbucket (`errors[].message`) or Jira
/// (`errorMessages[]`) error payload.
pub fn api_error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(msg) = v
        .get("errors")
        .and_then(|e| e.get(0))
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Some(msg.to_string());
    }
    v.get("errorMessages")
        .and_then(|e| e.get(0))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
