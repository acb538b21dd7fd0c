//! In-process agent doubles for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use switchboard_clients::InMemoryFileStore;
use switchboard_core::agents::{
    DeploymentStatus, EmailMessage, EmailReceipt, ExecutionReceipt, RecordPage, ServiceSummary,
    WorkflowDetails, WorkflowSummary,
};
use switchboard_core::{
    AgentClient, AgentError, AgentKind, AgentResult, CompletionAgent, DatabaseAgent,
    DeploymentAgent, EmailAgent, WorkflowAgent,
};

use crate::registry::AgentRegistry;

#[derive(Default)]
pub struct FakeWorkflows {
    workflows: Mutex<Vec<WorkflowSummary>>,
    failing: Vec<String>,
    sticky: Vec<String>,
    unreadable: Vec<String>,
    hang: bool,
    panic_on_list: bool,
    panic_on_settings: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeWorkflows {
    pub fn with(workflows: &[(&str, &str, bool)]) -> Self {
        let workflows = workflows
            .iter()
            .map(|(id, name, active)| WorkflowSummary {
                id: id.to_string(),
                name: name.to_string(),
                active: *active,
            })
            .collect();
        Self { workflows: Mutex::new(workflows), ..Self::default() }
    }

    /// Deletes of these ids fail with a remote error.
    pub fn failing(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Deletes of these ids report success without removing anything.
    pub fn sticky(mut self, ids: &[&str]) -> Self {
        self.sticky = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Reads of these ids fail with a remote error.
    pub fn unreadable(mut self, ids: &[&str]) -> Self {
        self.unreadable = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_list = true;
        self
    }

    pub fn panicking_settings(mut self) -> Self {
        self.panic_on_settings = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn remaining(&self) -> Vec<String> {
        self.workflows.lock().expect("workflows lock").iter().map(|w| w.id.clone()).collect()
    }

    fn log(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn find(&self, workflow_id: &str) -> Option<WorkflowSummary> {
        self.workflows
            .lock()
            .expect("workflows lock")
            .iter()
            .find(|workflow| workflow.id == workflow_id)
            .cloned()
    }

    fn not_found(workflow_id: &str) -> AgentError {
        AgentError::NotFound {
            agent: AgentKind::Workflow,
            resource: format!("workflow {workflow_id}"),
        }
    }
}

impl AgentClient for FakeWorkflows {
    fn kind(&self) -> AgentKind {
        AgentKind::Workflow
    }

    fn missing_settings(&self) -> Vec<String> {
        if self.panic_on_settings {
            panic!("workflow settings exploded");
        }
        Vec::new()
    }
}

#[async_trait]
impl WorkflowAgent for FakeWorkflows {
    async fn list_all(&self) -> AgentResult<Vec<WorkflowSummary>> {
        self.log("list".to_string());
        if self.panic_on_list {
            panic!("workflow listing exploded");
        }
        if self.hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(self.workflows.lock().expect("workflows lock").clone())
    }

    async fn get_by_id(&self, workflow_id: &str) -> AgentResult<WorkflowDetails> {
        self.log(format!("get:{workflow_id}"));
        if self.unreadable.iter().any(|id| id == workflow_id) {
            return Err(AgentError::Remote {
                agent: AgentKind::Workflow,
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        let workflow = self.find(workflow_id).ok_or_else(|| Self::not_found(workflow_id))?;
        Ok(WorkflowDetails {
            id: workflow.id,
            name: workflow.name,
            active: workflow.active,
            node_count: 3,
            tags: vec!["finance".to_string()],
            updated_at: None,
        })
    }

    async fn execute(
        &self,
        workflow_id: &str,
        data: Option<Value>,
    ) -> AgentResult<ExecutionReceipt> {
        self.log(format!("execute:{workflow_id}"));
        self.find(workflow_id).ok_or_else(|| Self::not_found(workflow_id))?;
        Ok(ExecutionReceipt {
            workflow_id: workflow_id.to_string(),
            execution_id: Some("exec-1".to_string()),
            status: "started".to_string(),
            data: data.unwrap_or_else(|| json!({})),
        })
    }

    async fn delete(&self, workflow_id: &str) -> AgentResult<()> {
        self.log(format!("delete:{workflow_id}"));
        if self.failing.iter().any(|id| id == workflow_id) {
            return Err(AgentError::Remote {
                agent: AgentKind::Workflow,
                status: 500,
                message: "internal error".to_string(),
            });
        }
        if self.find(workflow_id).is_none() {
            return Err(Self::not_found(workflow_id));
        }
        if !self.sticky.iter().any(|id| id == workflow_id) {
            self.workflows.lock().expect("workflows lock").retain(|w| w.id != workflow_id);
        }
        Ok(())
    }
}

pub struct FakeDeployments;

impl AgentClient for FakeDeployments {
    fn kind(&self) -> AgentKind {
        AgentKind::Deployment
    }

    fn missing_settings(&self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
impl DeploymentAgent for FakeDeployments {
    async fn deploy(&self, service_id: &str) -> AgentResult<DeploymentStatus> {
        Ok(DeploymentStatus {
            service_id: service_id.to_string(),
            deploy_id: Some("dep-1".to_string()),
            status: "created".to_string(),
        })
    }

    async fn status(&self, service_id: &str) -> AgentResult<DeploymentStatus> {
        Ok(DeploymentStatus {
            service_id: service_id.to_string(),
            deploy_id: Some("dep-1".to_string()),
            status: "live".to_string(),
        })
    }

    async fn list(&self) -> AgentResult<Vec<ServiceSummary>> {
        Ok(Vec::new())
    }
}

/// Database client whose base id was never configured.
pub struct UnconfiguredDatabase;

impl AgentClient for UnconfiguredDatabase {
    fn kind(&self) -> AgentKind {
        AgentKind::Database
    }

    fn missing_settings(&self) -> Vec<String> {
        vec!["database.base_id".to_string()]
    }
}

#[async_trait]
impl DatabaseAgent for UnconfiguredDatabase {
    async fn list_records(
        &self,
        _table_id: &str,
        _max_records: Option<u32>,
    ) -> AgentResult<RecordPage> {
        self.ensure_configured()?;
        Ok(RecordPage { count: 0, records: Vec::new() })
    }
}

pub struct SimulatedEmail;

impl AgentClient for SimulatedEmail {
    fn kind(&self) -> AgentKind {
        AgentKind::Email
    }

    fn missing_settings(&self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
impl EmailAgent for SimulatedEmail {
    async fn send(&self, _message: &EmailMessage) -> AgentResult<EmailReceipt> {
        Ok(EmailReceipt {
            status: "simulated".to_string(),
            message_id: Some("simulated-1".to_string()),
            simulated: true,
        })
    }
}

/// Completion backend that echoes the prompt and the context it was given.
pub struct EchoCompletion;

impl AgentClient for EchoCompletion {
    fn kind(&self) -> AgentKind {
        AgentKind::Completion
    }

    fn missing_settings(&self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
impl CompletionAgent for EchoCompletion {
    async fn complete(&self, prompt: &str, context: &str) -> AgentResult<String> {
        let context_lines = context.lines().count();
        Ok(format!("echo: {prompt} ({context_lines} context lines)"))
    }
}

pub fn registry(workflows: Arc<FakeWorkflows>) -> AgentRegistry {
    registry_with_files(workflows, Arc::new(InMemoryFileStore::new()))
}

pub fn registry_with_files(
    workflows: Arc<FakeWorkflows>,
    files: Arc<InMemoryFileStore>,
) -> AgentRegistry {
    AgentRegistry {
        workflow: workflows,
        deployment: Arc::new(FakeDeployments),
        database: Arc::new(UnconfiguredDatabase),
        email: Arc::new(SimulatedEmail),
        files,
        completion: None,
    }
}
