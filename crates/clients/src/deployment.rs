use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use switchboard_core::agents::{DeploymentStatus, ServiceSummary};
use switchboard_core::config::EndpointConfig;
use switchboard_core::{AgentClient, AgentError, AgentKind, AgentResult, DeploymentAgent};

use crate::http::{list_items, path_segment, string_field, AuthScheme, HttpEndpoint};

const SERVICE_PAGE_SIZE: u32 = 50;

/// Client for the hosting platform that builds and runs services.
pub struct HttpDeploymentClient {
    endpoint: HttpEndpoint,
}

impl HttpDeploymentClient {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            endpoint: HttpEndpoint::new(
                AgentKind::Deployment,
                "deployment",
                config.base_url.clone(),
                config.api_key.clone(),
                AuthScheme::Bearer,
                config.timeout_secs,
            ),
        }
    }
}

impl AgentClient for HttpDeploymentClient {
    fn kind(&self) -> AgentKind {
        AgentKind::Deployment
    }

    fn missing_settings(&self) -> Vec<String> {
        self.endpoint.missing_settings()
    }
}

#[async_trait]
impl DeploymentAgent for HttpDeploymentClient {
    async fn deploy(&self, service_id: &str) -> AgentResult<DeploymentStatus> {
        let id = path_segment(AgentKind::Deployment, "service id", service_id)?;
        let reply = self
            .endpoint
            .request(
                Method::POST,
                &format!("services/{id}/deploys"),
                &[],
                Some(&json!({ "clearCache": "do_not_clear" })),
                &format!("service {id}"),
            )
            .await?;

        Ok(DeploymentStatus {
            deploy_id: string_field(&reply.body, &["id"]),
            status: string_field(&reply.body, &["status"]).unwrap_or_else(|| "created".to_string()),
            service_id: id,
        })
    }

    async fn status(&self, service_id: &str) -> AgentResult<DeploymentStatus> {
        let id = path_segment(AgentKind::Deployment, "service id", service_id)?;
        let reply = self
            .endpoint
            .request(
                Method::GET,
                &format!("services/{id}/deploys"),
                &[("limit", "1".to_string())],
                None,
                &format!("service {id}"),
            )
            .await?;
        parse_latest_deploy(&id, &reply.body)
    }

    async fn list(&self) -> AgentResult<Vec<ServiceSummary>> {
        let reply = self
            .endpoint
            .request(
                Method::GET,
                "services",
                &[("limit", SERVICE_PAGE_SIZE.to_string())],
                None,
                "services",
            )
            .await?;
        parse_services(&reply.body)
    }
}

/// List entries may arrive wrapped as `{ "cursor": .., "service": {..} }`.
fn unwrap_entry<'a>(entry: &'a Value, key: &str) -> &'a Value {
    entry.get(key).filter(|inner| inner.is_object()).unwrap_or(entry)
}

fn parse_latest_deploy(service_id: &str, body: &Value) -> AgentResult<DeploymentStatus> {
    let items = list_items(body, &["deploys", "data"]).ok_or_else(|| {
        AgentError::InvalidResponse {
            agent: AgentKind::Deployment,
            message: "expected a list of deploys".to_string(),
        }
    })?;

    let Some(latest) = items.first().map(|entry| unwrap_entry(entry, "deploy")) else {
        return Ok(DeploymentStatus {
            service_id: service_id.to_string(),
            deploy_id: None,
            status: "never_deployed".to_string(),
        });
    };

    Ok(DeploymentStatus {
        service_id: service_id.to_string(),
        deploy_id: string_field(latest, &["id"]),
        status: string_field(latest, &["status"]).unwrap_or_else(|| "unknown".to_string()),
    })
}

fn parse_services(body: &Value) -> AgentResult<Vec<ServiceSummary>> {
    let items = list_items(body, &["services", "data"]).ok_or_else(|| {
        AgentError::InvalidResponse {
            agent: AgentKind::Deployment,
            message: "expected a list of services".to_string(),
        }
    })?;

    Ok(items
        .iter()
        .map(|entry| unwrap_entry(entry, "service"))
        .filter_map(|service| {
            let id = string_field(service, &["id"])?;
            Some(ServiceSummary {
                name: string_field(service, &["name"]).unwrap_or_else(|| id.clone()),
                kind: string_field(service, &["type"]),
                url: service
                    .get("serviceDetails")
                    .and_then(|details| string_field(details, &["url"]))
                    .or_else(|| string_field(service, &["url"])),
                suspended: matches!(
                    service.get("suspended").and_then(Value::as_str),
                    Some("suspended")
                ),
                id,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_latest_deploy, parse_services};

    #[test]
    fn parses_latest_deploy_from_wrapped_entries() {
        let body = json!([
            { "cursor": "abc", "deploy": { "id": "dep-1", "status": "live" } },
            { "cursor": "def", "deploy": { "id": "dep-0", "status": "deactivated" } }
        ]);

        let status = parse_latest_deploy("srv-abc123", &body).expect("should parse");
        assert_eq!(status.deploy_id.as_deref(), Some("dep-1"));
        assert_eq!(status.status, "live");
        assert_eq!(status.service_id, "srv-abc123");
    }

    #[test]
    fn empty_deploy_history_reports_never_deployed() {
        let status = parse_latest_deploy("srv-abc123", &json!([])).expect("should parse");
        assert_eq!(status.status, "never_deployed");
        assert!(status.deploy_id.is_none());
    }

    #[test]
    fn parses_service_list_with_details() {
        let body = json!([
            {
                "cursor": "x",
                "service": {
                    "id": "srv-abc123",
                    "name": "api",
                    "type": "web_service",
                    "suspended": "not_suspended",
                    "serviceDetails": { "url": "https://api.onrender.com" }
                }
            },
            { "service": { "id": "srv-def456", "suspended": "suspended" } }
        ]);

        let services = parse_services(&body).expect("should parse");
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].url.as_deref(), Some("https://api.onrender.com"));
        assert!(!services[0].suspended);
        assert_eq!(services[1].name, "srv-def456");
        assert!(services[1].suspended);
    }
}
