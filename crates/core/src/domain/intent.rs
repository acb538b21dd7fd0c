use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::AgentKind;

/// Every intent the classifier can emit. Classifier, delegator and formatter
/// all dispatch on this single tag set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    #[serde(rename = "workflow.delete")]
    WorkflowDelete,
    #[serde(rename = "workflow.delete_multiple")]
    WorkflowDeleteMultiple,
    #[serde(rename = "workflow.delete_all_inactive")]
    WorkflowDeleteAllInactive,
    #[serde(rename = "workflow.list")]
    WorkflowList,
    #[serde(rename = "workflow.execute")]
    WorkflowExecute,
    #[serde(rename = "workflow.details")]
    WorkflowDetails,
    #[serde(rename = "workflow.status")]
    WorkflowStatus,
    #[serde(rename = "file.list")]
    FileList,
    #[serde(rename = "file.analyze")]
    FileAnalyze,
    #[serde(rename = "file.search")]
    FileSearch,
    #[serde(rename = "deployment.deploy")]
    DeploymentDeploy,
    #[serde(rename = "deployment.status")]
    DeploymentStatus,
    #[serde(rename = "deployment.list")]
    DeploymentList,
    #[serde(rename = "database.list_records")]
    DatabaseListRecords,
    #[serde(rename = "email.send")]
    EmailSend,
    #[serde(rename = "security.audit")]
    SecurityAudit,
    #[serde(rename = "help")]
    Help,
    #[serde(rename = "conversation.history")]
    ConversationHistory,
    #[serde(rename = "conversation.reset")]
    ConversationReset,
    #[serde(rename = "generic.conversation")]
    GenericConversation,
}

impl IntentKind {
    pub const ALL: [IntentKind; 20] = [
        IntentKind::WorkflowDelete,
        IntentKind::WorkflowDeleteMultiple,
        IntentKind::WorkflowDeleteAllInactive,
        IntentKind::WorkflowList,
        IntentKind::WorkflowExecute,
        IntentKind::WorkflowDetails,
        IntentKind::WorkflowStatus,
        IntentKind::FileList,
        IntentKind::FileAnalyze,
        IntentKind::FileSearch,
        IntentKind::DeploymentDeploy,
        IntentKind::DeploymentStatus,
        IntentKind::DeploymentList,
        IntentKind::DatabaseListRecords,
        IntentKind::EmailSend,
        IntentKind::SecurityAudit,
        IntentKind::Help,
        IntentKind::ConversationHistory,
        IntentKind::ConversationReset,
        IntentKind::GenericConversation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowDelete => "workflow.delete",
            Self::WorkflowDeleteMultiple => "workflow.delete_multiple",
            Self::WorkflowDeleteAllInactive => "workflow.delete_all_inactive",
            Self::WorkflowList => "workflow.list",
            Self::WorkflowExecute => "workflow.execute",
            Self::WorkflowDetails => "workflow.details",
            Self::WorkflowStatus => "workflow.status",
            Self::FileList => "file.list",
            Self::FileAnalyze => "file.analyze",
            Self::FileSearch => "file.search",
            Self::DeploymentDeploy => "deployment.deploy",
            Self::DeploymentStatus => "deployment.status",
            Self::DeploymentList => "deployment.list",
            Self::DatabaseListRecords => "database.list_records",
            Self::EmailSend => "email.send",
            Self::SecurityAudit => "security.audit",
            Self::Help => "help",
            Self::ConversationHistory => "conversation.history",
            Self::ConversationReset => "conversation.reset",
            Self::GenericConversation => "generic.conversation",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw.trim())
    }

    /// Agent bound to this intent. `None` marks intents answered locally.
    /// Generic conversation is bound to the completion agent, which the
    /// delegator treats as optional.
    pub fn agent(&self) -> Option<AgentKind> {
        match self {
            Self::WorkflowDelete
            | Self::WorkflowDeleteMultiple
            | Self::WorkflowDeleteAllInactive
            | Self::WorkflowList
            | Self::WorkflowExecute
            | Self::WorkflowDetails
            | Self::WorkflowStatus => Some(AgentKind::Workflow),
            Self::FileList | Self::FileAnalyze | Self::FileSearch => Some(AgentKind::File),
            Self::DeploymentDeploy | Self::DeploymentStatus | Self::DeploymentList => {
                Some(AgentKind::Deployment)
            }
            Self::DatabaseListRecords => Some(AgentKind::Database),
            Self::EmailSend => Some(AgentKind::Email),
            Self::GenericConversation => Some(AgentKind::Completion),
            Self::SecurityAudit
            | Self::Help
            | Self::ConversationHistory
            | Self::ConversationReset => None,
        }
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, Self::WorkflowDeleteMultiple | Self::WorkflowDeleteAllInactive)
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values extracted from the utterance. Absent values stay `None`/empty and
/// downstream stages must handle them explicitly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflow_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_records: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IntentParameters {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Structured interpretation of one utterance. Built once per message and
/// consumed by the delegator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    pub parameters: IntentParameters,
    pub confidence: f32,
}

impl Intent {
    pub fn new(kind: IntentKind, parameters: IntentParameters, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        Self { kind, parameters, confidence }
    }

    pub fn bare(kind: IntentKind, confidence: f32) -> Self {
        Self::new(kind, IntentParameters::default(), confidence)
    }
}
