use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use switchboard_core::agents::{ExecutionReceipt, WorkflowDetails, WorkflowSummary};
use switchboard_core::config::EndpointConfig;
use switchboard_core::{AgentClient, AgentError, AgentKind, AgentResult, WorkflowAgent};

use crate::http::{list_items, path_segment, string_field, AuthScheme, HttpEndpoint};

const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Client for the workflow-automation engine's REST API.
pub struct HttpWorkflowClient {
    endpoint: HttpEndpoint,
}

impl HttpWorkflowClient {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            endpoint: HttpEndpoint::new(
                AgentKind::Workflow,
                "workflow",
                config.base_url.clone(),
                config.api_key.clone(),
                AuthScheme::Header(API_KEY_HEADER),
                config.timeout_secs,
            ),
        }
    }
}

impl AgentClient for HttpWorkflowClient {
    fn kind(&self) -> AgentKind {
        AgentKind::Workflow
    }

    fn missing_settings(&self) -> Vec<String> {
        self.endpoint.missing_settings()
    }
}

#[async_trait]
impl WorkflowAgent for HttpWorkflowClient {
    async fn list_all(&self) -> AgentResult<Vec<WorkflowSummary>> {
        let reply = self.endpoint.request(Method::GET, "workflows", &[], None, "workflows").await?;
        parse_workflow_list(&reply.body)
    }

    async fn get_by_id(&self, workflow_id: &str) -> AgentResult<WorkflowDetails> {
        let id = path_segment(AgentKind::Workflow, "workflow id", workflow_id)?;
        let reply = self
            .endpoint
            .request(Method::GET, &format!("workflows/{id}"), &[], None, &format!("workflow {id}"))
            .await?;
        parse_workflow_details(&reply.body)
    }

    async fn execute(
        &self,
        workflow_id: &str,
        data: Option<Value>,
    ) -> AgentResult<ExecutionReceipt> {
        let id = path_segment(AgentKind::Workflow, "workflow id", workflow_id)?;
        let payload = json!({ "data": data.unwrap_or_else(|| json!({})) });
        let reply = self
            .endpoint
            .request(
                Method::POST,
                &format!("workflows/{id}/execute"),
                &[],
                Some(&payload),
                &format!("workflow {id}"),
            )
            .await?;

        Ok(ExecutionReceipt {
            workflow_id: id,
            execution_id: string_field(&reply.body, &["executionId", "id"]),
            status: string_field(&reply.body, &["status"]).unwrap_or_else(|| "started".to_string()),
            data: reply.body,
        })
    }

    async fn delete(&self, workflow_id: &str) -> AgentResult<()> {
        let id = path_segment(AgentKind::Workflow, "workflow id", workflow_id)?;
        let (path, resource) = (format!("workflows/{id}"), format!("workflow {id}"));
        self.endpoint.request(Method::DELETE, &path, &[], None, &resource).await?;
        Ok(())
    }
}

fn parse_workflow_list(body: &Value) -> AgentResult<Vec<WorkflowSummary>> {
    let items = list_items(body, &["data", "workflows"]).ok_or_else(|| {
        AgentError::InvalidResponse {
            agent: AgentKind::Workflow,
            message: "expected a list of workflows".to_string(),
        }
    })?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let id = string_field(item, &["id"])?;
            Some(WorkflowSummary {
                name: string_field(item, &["name"]).unwrap_or_else(|| "(unnamed)".to_string()),
                active: item.get("active").and_then(Value::as_bool).unwrap_or(false),
                id,
            })
        })
        .collect())
}

fn parse_workflow_details(body: &Value) -> AgentResult<WorkflowDetails> {
    let body = body.get("data").filter(|data| data.is_object()).unwrap_or(body);
    let id = string_field(body, &["id"]).ok_or_else(|| AgentError::InvalidResponse {
        agent: AgentKind::Workflow,
        message: "workflow payload has no id".to_string(),
    })?;

    let tags = body
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| match tag {
                    Value::String(name) => Some(name.clone()),
                    other => string_field(other, &["name"]),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(WorkflowDetails {
        id,
        name: string_field(body, &["name"]).unwrap_or_else(|| "(unnamed)".to_string()),
        active: body.get("active").and_then(Value::as_bool).unwrap_or(false),
        node_count: body.get("nodes").and_then(Value::as_array).map(Vec::len).unwrap_or(0),
        tags,
        updated_at: string_field(body, &["updatedAt"]),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use switchboard_core::config::EndpointConfig;
    use switchboard_core::{AgentClient, AgentError, AgentKind, WorkflowAgent};

    use super::{parse_workflow_details, parse_workflow_list, HttpWorkflowClient};

    #[test]
    fn parses_wrapped_workflow_list() {
        let body = json!({
            "data": [
                { "id": "ABCDEFGH12345678", "name": "Invoice sync", "active": true },
                { "id": "ZYXWVUTS87654321", "name": "Old import", "active": false },
                { "name": "missing id is skipped" }
            ],
            "nextCursor": null
        });

        let workflows = parse_workflow_list(&body).expect("list should parse");
        assert_eq!(workflows.len(), 2);
        assert!(workflows[0].active);
        assert_eq!(workflows[1].name, "Old import");
    }

    #[test]
    fn rejects_non_list_payload() {
        let error = parse_workflow_list(&json!({ "message": "nope" })).expect_err("should fail");
        assert!(matches!(error, AgentError::InvalidResponse { .. }));
    }

    #[test]
    fn parses_workflow_details_with_tag_objects() {
        let body = json!({
            "id": "ABCDEFGH12345678",
            "name": "Invoice sync",
            "active": false,
            "nodes": [{}, {}, {}],
            "tags": [{ "id": "1", "name": "finance" }, "nightly"],
            "updatedAt": "2026-01-05T10:00:00.000Z"
        });

        let details = parse_workflow_details(&body).expect("details should parse");
        assert_eq!(details.node_count, 3);
        assert_eq!(details.tags, vec!["finance".to_string(), "nightly".to_string()]);
        assert_eq!(details.updated_at.as_deref(), Some("2026-01-05T10:00:00.000Z"));
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_at_call_time() {
        let client = HttpWorkflowClient::new(&EndpointConfig {
            base_url: Some("https://n8n.example.com/api/v1".to_string()),
            api_key: None,
            timeout_secs: 10,
        });

        assert_eq!(client.missing_settings(), vec!["workflow.api_key".to_string()]);
        let error = client.delete("ABCDEFGH12345678").await.expect_err("should fail");
        assert_eq!(
            error,
            AgentError::Configuration {
                agent: AgentKind::Workflow,
                setting: "workflow.api_key".to_string(),
            }
        );
    }
}
