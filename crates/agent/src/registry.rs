use std::sync::Arc;

use serde::{Deserialize, Serialize};
use switchboard_core::{
    AgentClient, AgentKind, CompletionAgent, DatabaseAgent, DeploymentAgent, EmailAgent,
    FileAgent, WorkflowAgent,
};

/// The agent clients one runtime delegates to. Completion is optional:
/// without it generic conversation is answered locally.
#[derive(Clone)]
pub struct AgentRegistry {
    pub workflow: Arc<dyn WorkflowAgent>,
    pub deployment: Arc<dyn DeploymentAgent>,
    pub database: Arc<dyn DatabaseAgent>,
    pub email: Arc<dyn EmailAgent>,
    pub files: Arc<dyn FileAgent>,
    pub completion: Option<Arc<dyn CompletionAgent>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReadiness {
    pub agent: AgentKind,
    pub configured: bool,
    pub missing_settings: Vec<String>,
}

impl AgentRegistry {
    pub fn with_completion(mut self, completion: Arc<dyn CompletionAgent>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Configuration state of every registered client, in registration order.
    pub fn readiness(&self) -> Vec<AgentReadiness> {
        let mut readiness = vec![
            readiness_of(self.workflow.as_ref()),
            readiness_of(self.deployment.as_ref()),
            readiness_of(self.database.as_ref()),
            readiness_of(self.email.as_ref()),
            readiness_of(self.files.as_ref()),
        ];
        if let Some(completion) = &self.completion {
            readiness.push(readiness_of(completion.as_ref()));
        }
        readiness
    }

    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }
}

fn readiness_of<C: AgentClient + ?Sized>(client: &C) -> AgentReadiness {
    let missing_settings = client.missing_settings();
    AgentReadiness {
        agent: client.kind(),
        configured: missing_settings.is_empty(),
        missing_settings,
    }
}
