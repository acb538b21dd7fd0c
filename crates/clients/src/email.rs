use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use switchboard_core::agents::{EmailMessage, EmailReceipt};
use switchboard_core::config::EmailConfig;
use switchboard_core::{AgentClient, AgentError, AgentKind, AgentResult, EmailAgent};
use tracing::info;
use uuid::Uuid;

use crate::http::{AuthScheme, HttpEndpoint};

/// Transactional email client. In simulate mode nothing leaves the process
/// and the receipt is flagged as simulated.
pub struct HttpEmailClient {
    endpoint: HttpEndpoint,
    from_address: Option<String>,
    simulate: bool,
}

impl HttpEmailClient {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            endpoint: HttpEndpoint::new(
                AgentKind::Email,
                "email",
                config.base_url.clone(),
                config.api_key.clone(),
                AuthScheme::Bearer,
                config.timeout_secs,
            ),
            from_address: config.from_address.clone().filter(|from| !from.trim().is_empty()),
            simulate: config.simulate,
        }
    }
}

impl AgentClient for HttpEmailClient {
    fn kind(&self) -> AgentKind {
        AgentKind::Email
    }

    fn missing_settings(&self) -> Vec<String> {
        if self.simulate {
            return Vec::new();
        }
        let mut missing = self.endpoint.missing_settings();
        if self.from_address.is_none() {
            missing.push("email.from_address".to_string());
        }
        missing
    }
}

#[async_trait]
impl EmailAgent for HttpEmailClient {
    async fn send(&self, message: &EmailMessage) -> AgentResult<EmailReceipt> {
        validate_message(message)?;

        if self.simulate {
            info!(
                event_name = "agent.email.simulated",
                subject = %message.subject,
                "email send simulated"
            );
            return Ok(EmailReceipt {
                status: "simulated".to_string(),
                message_id: Some(format!("simulated-{}", Uuid::new_v4())),
                simulated: true,
            });
        }

        self.ensure_configured()?;
        let from_address = self.from_address.as_deref().unwrap_or_default();
        let payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": from_address },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.content }]
        });

        let reply = self
            .endpoint
            .request(Method::POST, "mail/send", &[], Some(&payload), "mail endpoint")
            .await?;

        let message_id = reply
            .headers
            .get("x-message-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(EmailReceipt { status: "accepted".to_string(), message_id, simulated: false })
    }
}

fn validate_message(message: &EmailMessage) -> AgentResult<()> {
    let to = message.to.trim();
    let valid_recipient = to
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid_recipient {
        return Err(AgentError::InvalidRequest {
            agent: AgentKind::Email,
            message: format!("`{}` is not a valid recipient address", message.to),
        });
    }
    if message.content.trim().is_empty() {
        return Err(AgentError::InvalidRequest {
            agent: AgentKind::Email,
            message: "the email has no content".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use switchboard_core::agents::EmailMessage;
    use switchboard_core::config::EmailConfig;
    use switchboard_core::{AgentClient, AgentError, AgentKind, EmailAgent};

    use super::HttpEmailClient;

    fn config(simulate: bool) -> EmailConfig {
        EmailConfig {
            base_url: Some("https://api.sendgrid.com/v3".to_string()),
            api_key: None,
            from_address: None,
            simulate,
            timeout_secs: 10,
        }
    }

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Weekly report".to_string(),
            content: "All workflows are green.".to_string(),
        }
    }

    #[tokio::test]
    async fn simulate_mode_returns_simulated_receipt() {
        let client = HttpEmailClient::new(&config(true));
        assert!(client.missing_settings().is_empty());

        let receipt = client.send(&message("ops@example.com")).await.expect("simulated send");
        assert!(receipt.simulated);
        assert_eq!(receipt.status, "simulated");
        assert!(receipt.message_id.is_some_and(|id| id.starts_with("simulated-")));
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_before_any_call() {
        let client = HttpEmailClient::new(&config(true));
        let error = client.send(&message("not-an-address")).await.expect_err("should fail");
        assert!(matches!(error, AgentError::InvalidRequest { agent: AgentKind::Email, .. }));
    }

    #[tokio::test]
    async fn live_mode_requires_credentials() {
        let client = HttpEmailClient::new(&config(false));
        assert_eq!(
            client.missing_settings(),
            vec!["email.api_key".to_string(), "email.from_address".to_string()]
        );

        let error = client.send(&message("ops@example.com")).await.expect_err("should fail");
        assert_eq!(
            error,
            AgentError::Configuration {
                agent: AgentKind::Email,
                setting: "email.api_key".to_string(),
            }
        );
    }
}
