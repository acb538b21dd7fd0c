use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use switchboard_core::config::CompletionConfig;
use switchboard_core::{AgentClient, AgentError, AgentKind, AgentResult, CompletionAgent};

use crate::http::{AuthScheme, HttpEndpoint};

const SYSTEM_PROMPT: &str = "You are Switchboard, an operations assistant. You can list, run and \
delete workflows, deploy services, read database tables, send emails and analyze uploaded files. \
Answer briefly. When the user wants one of those actions, tell them the phrasing to use.";

/// Chat-completions client used for free-form conversation.
pub struct HttpCompletionClient {
    endpoint: HttpEndpoint,
    model: String,
}

impl HttpCompletionClient {
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            endpoint: HttpEndpoint::new(
                AgentKind::Completion,
                "completion",
                config.base_url.clone(),
                config.api_key.clone(),
                AuthScheme::Bearer,
                config.timeout_secs,
            ),
            model: config.model.clone(),
        }
    }
}

impl AgentClient for HttpCompletionClient {
    fn kind(&self) -> AgentKind {
        AgentKind::Completion
    }

    fn missing_settings(&self) -> Vec<String> {
        self.endpoint.missing_settings()
    }
}

#[async_trait]
impl CompletionAgent for HttpCompletionClient {
    async fn complete(&self, prompt: &str, context: &str) -> AgentResult<String> {
        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        if !context.trim().is_empty() {
            messages.push(json!({
                "role": "system",
                "content": format!("Recent conversation:\n{context}")
            }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let payload = json!({ "model": self.model, "messages": messages });
        let reply = self
            .endpoint
            .request(Method::POST, "chat/completions", &[], Some(&payload), "completion model")
            .await?;
        extract_reply(&reply.body)
    }
}

fn extract_reply(body: &Value) -> AgentResult<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| AgentError::InvalidResponse {
            agent: AgentKind::Completion,
            message: "completion response has no message content".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::extract_reply;

    #[test]
    fn extracts_first_choice_content() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Hello there.  " } }]
        });
        assert_eq!(extract_reply(&body).expect("reply"), "Hello there.");
    }

    #[test]
    fn empty_choices_are_an_invalid_response() {
        assert!(extract_reply(&json!({ "choices": [] })).is_err());
        assert!(extract_reply(&json!({ "choices": [{ "message": { "content": " " } }] })).is_err());
    }
}
