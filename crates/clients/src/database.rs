use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use switchboard_core::agents::RecordPage;
use switchboard_core::config::DatabaseConfig;
use switchboard_core::{AgentClient, AgentError, AgentKind, AgentResult, DatabaseAgent};

use crate::http::{list_items, path_segment, AuthScheme, HttpEndpoint};

const DEFAULT_MAX_RECORDS: u32 = 20;
const MAX_RECORDS_CAP: u32 = 100;

/// Client for the spreadsheet-style database. Tables live under one base.
pub struct HttpDatabaseClient {
    endpoint: HttpEndpoint,
    base_id: Option<String>,
}

impl HttpDatabaseClient {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            endpoint: HttpEndpoint::new(
                AgentKind::Database,
                "database",
                config.base_url.clone(),
                config.api_key.clone(),
                AuthScheme::Bearer,
                config.timeout_secs,
            ),
            base_id: config.base_id.clone().filter(|id| !id.trim().is_empty()),
        }
    }
}

impl AgentClient for HttpDatabaseClient {
    fn kind(&self) -> AgentKind {
        AgentKind::Database
    }

    fn missing_settings(&self) -> Vec<String> {
        let mut missing = self.endpoint.missing_settings();
        if self.base_id.is_none() {
            missing.push("database.base_id".to_string());
        }
        missing
    }
}

#[async_trait]
impl DatabaseAgent for HttpDatabaseClient {
    async fn list_records(
        &self,
        table_id: &str,
        max_records: Option<u32>,
    ) -> AgentResult<RecordPage> {
        self.ensure_configured()?;
        let base_id = self.base_id.as_deref().unwrap_or_default();
        let table = path_segment(AgentKind::Database, "table id", table_id)?;
        let limit = max_records.unwrap_or(DEFAULT_MAX_RECORDS).clamp(1, MAX_RECORDS_CAP);

        let reply = self
            .endpoint
            .request(
                Method::GET,
                &format!("{base_id}/{table}"),
                &[("maxRecords", limit.to_string())],
                None,
                &format!("table {table}"),
            )
            .await?;
        parse_records(&reply.body)
    }
}

fn parse_records(body: &Value) -> AgentResult<RecordPage> {
    let records = list_items(body, &["records"]).ok_or_else(|| AgentError::InvalidResponse {
        agent: AgentKind::Database,
        message: "expected a `records` list".to_string(),
    })?;

    Ok(RecordPage { count: records.len(), records: records.clone() })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use switchboard_core::config::DatabaseConfig;
    use switchboard_core::{AgentClient, AgentError, AgentKind, DatabaseAgent};

    use super::{parse_records, HttpDatabaseClient};

    #[test]
    fn parses_record_page() {
        let body = json!({
            "records": [
                { "id": "rec1", "fields": { "Name": "Alice" } },
                { "id": "rec2", "fields": { "Name": "Bob" } }
            ],
            "offset": "itr123"
        });

        let page = parse_records(&body).expect("should parse");
        assert_eq!(page.count, 2);
        assert_eq!(page.records[1]["fields"]["Name"], "Bob");
    }

    #[tokio::test]
    async fn missing_base_id_names_the_setting() {
        let client = HttpDatabaseClient::new(&DatabaseConfig {
            base_url: Some("https://api.airtable.com/v0".to_string()),
            api_key: Some("pat-test".to_string().into()),
            base_id: None,
            timeout_secs: 10,
        });

        assert_eq!(client.missing_settings(), vec!["database.base_id".to_string()]);
        let error = client.list_records("tblCustomers", None).await.expect_err("should fail");
        assert_eq!(
            error,
            AgentError::Configuration {
                agent: AgentKind::Database,
                setting: "database.base_id".to_string(),
            }
        );
    }
}
