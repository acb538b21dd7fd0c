use thiserror::Error;

use crate::agents::AgentKind;

/// Failure returned across an agent client's contract boundary.
///
/// Agents never panic or leak transport errors to callers; every failure is
/// translated into one of these variants and carried back as `Err`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("{agent} agent is not configured: missing `{setting}`")]
    Configuration { agent: AgentKind, setting: String },
    #[error("{agent} agent rejected the request: invalid credential")]
    Unauthorized { agent: AgentKind },
    #[error("{resource} was not found on the {agent} service, it may already be deleted")]
    NotFound { agent: AgentKind, resource: String },
    #[error("{agent} service is rate limiting requests")]
    RateLimited { agent: AgentKind },
    #[error("{agent} service returned HTTP {status}: {message}")]
    Remote { agent: AgentKind, status: u16, message: String },
    #[error("{agent} service did not respond within {timeout_secs}s")]
    Timeout { agent: AgentKind, timeout_secs: u64 },
    #[error("could not reach the {agent} service: {message}")]
    Transport { agent: AgentKind, message: String },
    #[error("{agent} agent cannot run this request: {message}")]
    InvalidRequest { agent: AgentKind, message: String },
    #[error("{agent} service returned an unexpected response: {message}")]
    InvalidResponse { agent: AgentKind, message: String },
}

pub type AgentResult<T> = Result<T, AgentError>;

impl AgentError {
    /// Translates a non-2xx HTTP status into the domain taxonomy.
    pub fn from_status(
        agent: AgentKind,
        status: u16,
        body: &str,
        resource: impl Into<String>,
    ) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { agent },
            404 => Self::NotFound { agent, resource: resource.into() },
            429 => Self::RateLimited { agent },
            _ => Self::Remote { agent, status, message: summarize_body(body) },
        }
    }

    pub fn agent(&self) -> AgentKind {
        match self {
            Self::Configuration { agent, .. }
            | Self::Unauthorized { agent }
            | Self::NotFound { agent, .. }
            | Self::RateLimited { agent }
            | Self::Remote { agent, .. }
            | Self::Timeout { agent, .. }
            | Self::Transport { agent, .. }
            | Self::InvalidRequest { agent, .. }
            | Self::InvalidResponse { agent, .. } => *agent,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Corrective action shown to the user next to the error message.
    pub fn user_hint(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => {
                "Add the missing setting to switchboard.toml or the environment, then retry."
            }
            Self::Unauthorized { .. } => "Check the API key configured for this agent.",
            Self::NotFound { .. } => "Check the identifier, or list the available items first.",
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Transport { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Remote { .. } | Self::InvalidResponse { .. } => {
                "The remote service reported a problem. Please retry or ask for help."
            }
            Self::InvalidRequest { .. } => {
                "Rephrase the request with the missing details, or ask for help."
            }
        }
    }
}

fn summarize_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }

    let message = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|field| field.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| trimmed.to_string());

    if message.chars().count() > MAX_CHARS {
        let truncated = message.chars().take(MAX_CHARS).collect::<String>();
        format!("{truncated}…")
    } else {
        message
    }
}
