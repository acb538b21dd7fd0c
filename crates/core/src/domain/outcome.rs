use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::AgentKind;
use crate::errors::AgentError;

/// Result of delegating one intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationOutcome {
    pub success: bool,
    pub details: Option<Value>,
    /// Every agent actually called, in first-call order, failures included.
    pub agents_invoked: Vec<AgentKind>,
    pub error_message: Option<String>,
    pub error_hint: Option<String>,
}

impl DelegationOutcome {
    pub fn succeeded(details: Value, agents_invoked: Vec<AgentKind>) -> Self {
        Self {
            success: true,
            details: Some(details),
            agents_invoked,
            error_message: None,
            error_hint: None,
        }
    }

    pub fn local(details: Value) -> Self {
        Self::succeeded(details, Vec::new())
    }

    pub fn failed(error: &AgentError, agents_invoked: Vec<AgentKind>) -> Self {
        Self {
            success: false,
            details: None,
            agents_invoked,
            error_message: Some(error.to_string()),
            error_hint: Some(error.user_hint().to_string()),
        }
    }

    pub fn internal_failure(message: impl Into<String>, agents_invoked: Vec<AgentKind>) -> Self {
        Self {
            success: false,
            details: None,
            agents_invoked,
            error_message: Some(message.into()),
            error_hint: Some("Please retry, or ask for help if the problem persists.".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedItem {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
}

/// Aggregate of a partial-failure-tolerant bulk deletion. Per-item failures
/// are data here, the bulk operation itself still completes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteReport {
    pub deleted_count: usize,
    pub deleted: Vec<DeletedItem>,
    pub failed: Vec<FailedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kept_count: Option<usize>,
}

impl BulkDeleteReport {
    pub fn from_items(
        items: Vec<(DeletedItem, Result<(), AgentError>)>,
        kept_count: Option<usize>,
    ) -> Self {
        let mut report = Self { kept_count, ..Self::default() };
        for (item, result) in items {
            match result {
                Ok(()) => report.deleted.push(item),
                Err(error) => {
                    report.failed.push(FailedItem { id: item.id, error: error.to_string() })
                }
            }
        }
        report.deleted_count = report.deleted.len();
        report
    }
}
