use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use switchboard_core::{AgentError, AgentKind, AgentResult};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthScheme {
    Bearer,
    Header(&'static str),
}

pub(crate) struct HttpReply {
    pub headers: HeaderMap,
    pub body: Value,
}

/// One configured remote API. Holds a client whose total request time is
/// capped at `timeout_secs`.
pub(crate) struct HttpEndpoint {
    agent: AgentKind,
    section: &'static str,
    base_url: Option<String>,
    api_key: Option<SecretString>,
    auth: AuthScheme,
    timeout_secs: u64,
    client: Result<Client, String>,
}

impl HttpEndpoint {
    pub fn new(
        agent: AgentKind,
        section: &'static str,
        base_url: Option<String>,
        api_key: Option<SecretString>,
        auth: AuthScheme,
        timeout_secs: u64,
    ) -> Self {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|error| format!("failed to build HTTP client: {error}"));

        Self {
            agent,
            section,
            base_url: base_url.filter(|url| !url.trim().is_empty()),
            api_key,
            auth,
            timeout_secs,
            client,
        }
    }

    pub fn missing_settings(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.base_url.is_none() {
            missing.push(format!("{}.base_url", self.section));
        }
        if self.api_key().is_none() {
            missing.push(format!("{}.api_key", self.section));
        }
        missing
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret()).filter(|key| !key.trim().is_empty())
    }

    fn missing(&self, key: &str) -> AgentError {
        AgentError::Configuration { agent: self.agent, setting: format!("{}.{key}", self.section) }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        resource: &str,
    ) -> AgentResult<HttpReply> {
        let base_url = self.base_url.as_deref().ok_or_else(|| self.missing("base_url"))?;
        let api_key = self.api_key().ok_or_else(|| self.missing("api_key"))?;
        let client = self.client.as_ref().map_err(|message| AgentError::Transport {
            agent: self.agent,
            message: message.clone(),
        })?;

        let url = join_url(base_url, path);
        let mut request = client.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        request = match self.auth {
            AuthScheme::Bearer => request.bearer_auth(api_key),
            AuthScheme::Header(name) => request.header(name, api_key),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(
            event_name = "agent.http.request",
            agent = %self.agent,
            method = %method,
            path,
            "sending agent request"
        );

        let response = request.send().await.map_err(|error| self.transport_error(error))?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(|error| self.transport_error(error))?;

        if !status.is_success() {
            warn!(
                event_name = "agent.http.rejected",
                agent = %self.agent,
                method = %method,
                path,
                status = status.as_u16(),
                "agent request returned non-success status"
            );
            return Err(AgentError::from_status(self.agent, status.as_u16(), &text, resource));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|error| AgentError::InvalidResponse {
                agent: self.agent,
                message: format!("response body is not JSON: {error}"),
            })?
        };

        Ok(HttpReply { headers, body })
    }

    fn transport_error(&self, error: reqwest::Error) -> AgentError {
        if error.is_timeout() {
            AgentError::Timeout { agent: self.agent, timeout_secs: self.timeout_secs }
        } else {
            AgentError::Transport { agent: self.agent, message: error.to_string() }
        }
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Rejects identifiers that would escape their path segment.
pub(crate) fn path_segment(agent: AgentKind, label: &str, value: &str) -> AgentResult<String> {
    let trimmed = value.trim();
    let valid = !trimmed.is_empty()
        && trimmed.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && trimmed != "."
        && trimmed != "..";
    if !valid {
        return Err(AgentError::InvalidRequest {
            agent,
            message: format!("`{value}` is not a valid {label}"),
        });
    }
    Ok(trimmed.to_string())
}

/// Unwraps list responses that may be a bare array or wrapped in `data`/`records`.
pub(crate) fn list_items<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Some(items) = body.as_array() {
        return Some(items);
    }
    keys.iter().find_map(|key| body.get(*key).and_then(Value::as_array))
}

pub(crate) fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
