//! Contracts for the external systems the orchestrator delegates to.
//!
//! Each trait mirrors one remote API with a handful of operations. Every
//! operation is a single best-effort call: implementations never retry and
//! never panic, they translate failures into [`AgentError`].

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Workflow,
    Deployment,
    Database,
    Email,
    File,
    Completion,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Workflow,
        AgentKind::Deployment,
        AgentKind::Database,
        AgentKind::Email,
        AgentKind::File,
        AgentKind::Completion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Deployment => "deployment",
            Self::Database => "database",
            Self::Email => "email",
            Self::File => "file",
            Self::Completion => "completion",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared surface of every agent client.
pub trait AgentClient: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Settings this client needs but does not have, as `section.key` paths.
    fn missing_settings(&self) -> Vec<String>;

    /// Lazily checks configuration at call time.
    fn ensure_configured(&self) -> AgentResult<()> {
        match self.missing_settings().into_iter().next() {
            Some(setting) => Err(AgentError::Configuration { agent: self.kind(), setting }),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDetails {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub node_count: usize,
    pub tags: Vec<String>,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
    pub workflow_id: String,
    pub execution_id: Option<String>,
    pub status: String,
    pub data: Value,
}

#[async_trait]
pub trait WorkflowAgent: AgentClient {
    async fn list_all(&self) -> AgentResult<Vec<WorkflowSummary>>;
    async fn get_by_id(&self, workflow_id: &str) -> AgentResult<WorkflowDetails>;
    async fn execute(&self, workflow_id: &str, data: Option<Value>)
        -> AgentResult<ExecutionReceipt>;
    async fn delete(&self, workflow_id: &str) -> AgentResult<()>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub service_id: String,
    pub deploy_id: Option<String>,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    pub kind: Option<String>,
    pub url: Option<String>,
    pub suspended: bool,
}

#[async_trait]
pub trait DeploymentAgent: AgentClient {
    async fn deploy(&self, service_id: &str) -> AgentResult<DeploymentStatus>;
    async fn status(&self, service_id: &str) -> AgentResult<DeploymentStatus>;
    async fn list(&self) -> AgentResult<Vec<ServiceSummary>>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub count: usize,
    pub records: Vec<Value>,
}

#[async_trait]
pub trait DatabaseAgent: AgentClient {
    async fn list_records(&self, table_id: &str, max_records: Option<u32>)
        -> AgentResult<RecordPage>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailReceipt {
    pub status: String,
    pub message_id: Option<String>,
    pub simulated: bool,
}

#[async_trait]
pub trait EmailAgent: AgentClient {
    async fn send(&self, message: &EmailMessage) -> AgentResult<EmailReceipt>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Text,
    Markdown,
    Csv,
    Json,
    Code,
    Other,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "txt" | "log" => Self::Text,
            "md" | "markdown" => Self::Markdown,
            "csv" | "tsv" => Self::Csv,
            "json" => Self::Json,
            "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "cpp" | "h" | "toml" | "yaml"
            | "yml" | "sh" => Self::Code,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Code => "code",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub kind: FileKind,
    pub size_bytes: usize,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub name: String,
    pub kind: FileKind,
    pub size_bytes: usize,
    pub lines: usize,
    pub words: usize,
    pub characters: usize,
    pub csv_columns: Option<usize>,
    pub csv_rows: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub files: Vec<FileStats>,
    pub insights: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub file: String,
    pub line_number: usize,
    pub line: String,
}

/// File operations are scoped to an owner; one user never sees another's files.
#[async_trait]
pub trait FileAgent: AgentClient {
    async fn list(&self, owner: &str) -> AgentResult<Vec<FileMetadata>>;
    async fn analyze(&self, owner: &str, files: &[String]) -> AgentResult<FileAnalysis>;
    async fn search(&self, owner: &str, query: &str) -> AgentResult<Vec<SearchMatch>>;
}

#[async_trait]
pub trait CompletionAgent: AgentClient {
    async fn complete(&self, prompt: &str, context: &str) -> AgentResult<String>;
}

#[cfg(test)]
mod tests {
    use super::{AgentClient, AgentKind, FileKind};
    use crate::errors::AgentError;

    struct Unconfigured;

    impl AgentClient for Unconfigured {
        fn kind(&self) -> AgentKind {
            AgentKind::Database
        }

        fn missing_settings(&self) -> Vec<String> {
            vec!["database.api_key".to_string(), "database.base_id".to_string()]
        }
    }

    #[test]
    fn ensure_configured_reports_first_missing_setting() {
        let error = Unconfigured.ensure_configured().expect_err("should be unconfigured");
        assert_eq!(
            error,
            AgentError::Configuration {
                agent: AgentKind::Database,
                setting: "database.api_key".to_string(),
            }
        );
    }

    #[test]
    fn file_kind_is_detected_from_extension() {
        assert_eq!(FileKind::from_name("report.CSV"), FileKind::Csv);
        assert_eq!(FileKind::from_name("notes.md"), FileKind::Markdown);
        assert_eq!(FileKind::from_name("main.rs"), FileKind::Code);
        assert_eq!(FileKind::from_name("README"), FileKind::Other);
    }
}
