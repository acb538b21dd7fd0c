//! Maps a classified intent onto agent calls.
//!
//! Every agent call is bounded by the configured timeout and recorded in the
//! outcome's `agents_invoked`, failures included. A failing call ends the
//! delegation for that intent, except inside bulk deletions where per-item
//! failures are collected into the report.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use switchboard_core::agents::EmailMessage;
use switchboard_core::config::DelegationConfig;
use switchboard_core::{
    AgentError, AgentKind, AgentResult, BulkDeleteReport, ConversationId, DelegationOutcome,
    DeletedItem, Intent, IntentKind,
};
use tracing::{debug, error, warn};

use crate::classifier::RequestContext;
use crate::help;
use crate::memory::ConversationMemory;
use crate::registry::AgentRegistry;

pub const ANONYMOUS_OWNER: &str = "anonymous";

const DEFAULT_HISTORY_TURNS: usize = 10;
const DEFAULT_EMAIL_SUBJECT: &str = "Message from Switchboard";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationPolicy {
    /// Read a workflow back after deleting it and require a not-found answer.
    pub verify_after_delete: bool,
    pub call_timeout: Duration,
    pub bulk_concurrency: usize,
}

impl Default for DelegationPolicy {
    fn default() -> Self {
        Self {
            verify_after_delete: true,
            call_timeout: Duration::from_secs(30),
            bulk_concurrency: 4,
        }
    }
}

impl From<&DelegationConfig> for DelegationPolicy {
    fn from(config: &DelegationConfig) -> Self {
        Self {
            verify_after_delete: config.verify_after_delete,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            bulk_concurrency: config.bulk_concurrency.max(1),
        }
    }
}

/// What a single delete actually achieved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReceipt {
    pub workflow_id: String,
    pub deleted: bool,
    pub already_removed: bool,
    pub verified: bool,
}

/// Agents called so far, unique and in first-call order.
#[derive(Debug, Default)]
struct Invocations(Vec<AgentKind>);

impl Invocations {
    fn record(&mut self, agent: AgentKind) {
        if !self.0.contains(&agent) {
            self.0.push(agent);
        }
    }

    fn into_vec(self) -> Vec<AgentKind> {
        self.0
    }
}

pub struct Delegator {
    agents: AgentRegistry,
    memory: Arc<ConversationMemory>,
    policy: DelegationPolicy,
}

impl Delegator {
    pub fn new(
        agents: AgentRegistry,
        memory: Arc<ConversationMemory>,
        policy: DelegationPolicy,
    ) -> Self {
        Self { agents, memory, policy }
    }

    pub fn policy(&self) -> &DelegationPolicy {
        &self.policy
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Never panics. A panic inside an agent call becomes an internal
    /// failure that still lists the agents called before it.
    pub async fn delegate(
        &self,
        intent: &Intent,
        conversation: &ConversationId,
        context: &RequestContext,
    ) -> DelegationOutcome {
        let mut invoked = Invocations::default();
        let result = AssertUnwindSafe(self.dispatch(intent, conversation, context, &mut invoked))
            .catch_unwind()
            .await;
        let invoked = invoked.into_vec();

        let result = match result {
            Ok(result) => result,
            Err(_) => {
                error!(
                    event_name = "agent.delegation.panicked",
                    intent = %intent.kind,
                    conversation_id = %conversation,
                    agents_invoked = ?invoked,
                    "delegation panicked"
                );
                return DelegationOutcome::internal_failure(
                    format!("an internal error interrupted the {} request", intent.kind),
                    invoked,
                );
            }
        };

        match result {
            Ok(details) => DelegationOutcome::succeeded(details, invoked),
            Err(error) => {
                warn!(
                    event_name = "agent.delegation.failed",
                    intent = %intent.kind,
                    agent = %error.agent(),
                    error = %error,
                    "delegation failed"
                );
                DelegationOutcome::failed(&error, invoked)
            }
        }
    }

    async fn dispatch(
        &self,
        intent: &Intent,
        conversation: &ConversationId,
        context: &RequestContext,
        invoked: &mut Invocations,
    ) -> AgentResult<Value> {
        let parameters = &intent.parameters;
        let owner = context.user.as_deref().unwrap_or(ANONYMOUS_OWNER);
        let workflow_id =
            || required(AgentKind::Workflow, &parameters.workflow_id, "workflow identifier");
        let service_id =
            || required(AgentKind::Deployment, &parameters.service_id, "service identifier");

        match intent.kind {
            IntentKind::WorkflowDelete => {
                let id = workflow_id()?;
                invoked.record(AgentKind::Workflow);
                let receipt = self.delete_workflow(id).await?;
                Ok(to_details(&receipt))
            }
            IntentKind::WorkflowDeleteMultiple => {
                if parameters.workflow_ids.is_empty() {
                    return Err(missing_parameter(AgentKind::Workflow, "workflow identifiers"));
                }
                invoked.record(AgentKind::Workflow);
                let targets = parameters
                    .workflow_ids
                    .iter()
                    .map(|id| DeletedItem { id: id.clone(), name: None })
                    .collect();
                let report = self.bulk_delete(targets, None).await;
                Ok(to_details(&report))
            }
            IntentKind::WorkflowDeleteAllInactive => {
                let workflows = self
                    .call(AgentKind::Workflow, invoked, self.agents.workflow.list_all())
                    .await?;
                let (active, inactive): (Vec<_>, Vec<_>) =
                    workflows.into_iter().partition(|workflow| workflow.active);
                let targets = inactive
                    .into_iter()
                    .map(|workflow| DeletedItem { id: workflow.id, name: Some(workflow.name) })
                    .collect();
                let report = self.bulk_delete(targets, Some(active.len())).await;
                Ok(to_details(&report))
            }
            IntentKind::WorkflowList => {
                let workflows = self
                    .call(AgentKind::Workflow, invoked, self.agents.workflow.list_all())
                    .await?;
                Ok(json!({ "count": workflows.len(), "workflows": workflows }))
            }
            IntentKind::WorkflowExecute => {
                let id = workflow_id()?;
                let data = parameters.execution_data.clone();
                let receipt = self
                    .call(AgentKind::Workflow, invoked, self.agents.workflow.execute(id, data))
                    .await?;
                Ok(to_details(&receipt))
            }
            IntentKind::WorkflowDetails => {
                let id = workflow_id()?;
                let details = self
                    .call(AgentKind::Workflow, invoked, self.agents.workflow.get_by_id(id))
                    .await?;
                Ok(to_details(&details))
            }
            IntentKind::WorkflowStatus => {
                let workflows = self
                    .call(AgentKind::Workflow, invoked, self.agents.workflow.list_all())
                    .await?;
                let active = workflows.iter().filter(|workflow| workflow.active).count();
                Ok(json!({
                    "total": workflows.len(),
                    "active": active,
                    "inactive": workflows.len() - active,
                }))
            }
            IntentKind::FileList => {
                let files =
                    self.call(AgentKind::File, invoked, self.agents.files.list(owner)).await?;
                Ok(json!({ "count": files.len(), "files": files }))
            }
            IntentKind::FileAnalyze => {
                let analysis = self.agents.files.analyze(owner, &parameters.files);
                let analysis = self.call(AgentKind::File, invoked, analysis).await?;
                Ok(to_details(&analysis))
            }
            IntentKind::FileSearch => {
                let query = required(AgentKind::File, &parameters.query, "search query")?;
                let matches = self.agents.files.search(owner, query);
                let matches = self.call(AgentKind::File, invoked, matches).await?;
                Ok(json!({ "query": query, "count": matches.len(), "matches": matches }))
            }
            IntentKind::DeploymentDeploy => {
                let service = service_id()?;
                let status = self
                    .call(AgentKind::Deployment, invoked, self.agents.deployment.deploy(service))
                    .await?;
                Ok(to_details(&status))
            }
            IntentKind::DeploymentStatus => {
                let service = service_id()?;
                let status = self
                    .call(AgentKind::Deployment, invoked, self.agents.deployment.status(service))
                    .await?;
                Ok(to_details(&status))
            }
            IntentKind::DeploymentList => {
                let services =
                    self.call(AgentKind::Deployment, invoked, self.agents.deployment.list()).await?;
                Ok(json!({ "count": services.len(), "services": services }))
            }
            IntentKind::DatabaseListRecords => {
                let table =
                    required(AgentKind::Database, &parameters.table_id, "table identifier")?;
                let page = self
                    .call(
                        AgentKind::Database,
                        invoked,
                        self.agents.database.list_records(table, parameters.max_records),
                    )
                    .await?;
                Ok(json!({ "tableId": table, "count": page.count, "records": page.records }))
            }
            IntentKind::EmailSend => {
                let to = required(AgentKind::Email, &parameters.to, "recipient address")?;
                let message = EmailMessage {
                    to: to.to_string(),
                    subject: parameters
                        .subject
                        .clone()
                        .unwrap_or_else(|| DEFAULT_EMAIL_SUBJECT.to_string()),
                    content: parameters.content.clone().unwrap_or_default(),
                };
                let receipt =
                    self.call(AgentKind::Email, invoked, self.agents.email.send(&message)).await?;
                Ok(json!({ "to": message.to, "subject": message.subject, "receipt": receipt }))
            }
            IntentKind::SecurityAudit => {
                let readiness = self.agents.readiness();
                let configured = readiness.iter().filter(|agent| agent.configured).count();
                Ok(json!({
                    "agents": readiness,
                    "configuredCount": configured,
                    "completionEnabled": self.agents.has_completion(),
                    "verifyAfterDelete": self.policy.verify_after_delete,
                }))
            }
            IntentKind::Help => Ok(help::examples()),
            IntentKind::ConversationHistory => {
                let limit = parameters.history_limit.unwrap_or(DEFAULT_HISTORY_TURNS);
                let turns = self.memory.recent(conversation, limit);
                Ok(json!({ "count": turns.len(), "turns": turns }))
            }
            IntentKind::ConversationReset => {
                let cleared = self.memory.reset(conversation);
                Ok(json!({ "cleared": cleared }))
            }
            IntentKind::GenericConversation => {
                let message = parameters.message.clone().unwrap_or_default();
                let Some(completion) = &self.agents.completion else {
                    return Ok(json!({ "reply": Value::Null, "fallback": true }));
                };
                if message.trim().is_empty() {
                    return Ok(json!({ "reply": Value::Null, "fallback": true }));
                }
                let context_summary = self.memory.context_summary(conversation);
                let reply = self
                    .call(
                        AgentKind::Completion,
                        invoked,
                        completion.complete(&message, &context_summary),
                    )
                    .await?;
                Ok(json!({ "reply": reply, "fallback": false }))
            }
        }
    }

    /// Records the agent, then runs the call under the configured timeout.
    async fn call<T>(
        &self,
        agent: AgentKind,
        invoked: &mut Invocations,
        operation: impl Future<Output = AgentResult<T>>,
    ) -> AgentResult<T> {
        invoked.record(agent);
        self.timed(agent, operation).await
    }

    async fn timed<T>(
        &self,
        agent: AgentKind,
        operation: impl Future<Output = AgentResult<T>>,
    ) -> AgentResult<T> {
        match tokio::time::timeout(self.policy.call_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                agent,
                timeout_secs: self.policy.call_timeout.as_secs(),
            }),
        }
    }

    /// Deletes one workflow. Not-found counts as already achieved. With
    /// verification on, success is only reported once a read-back confirms
    /// the workflow is gone.
    pub async fn delete_workflow(&self, workflow_id: &str) -> AgentResult<DeleteReceipt> {
        let workflows = &self.agents.workflow;
        let already_removed =
            match self.timed(AgentKind::Workflow, workflows.delete(workflow_id)).await {
                Ok(()) => false,
                Err(error) if error.is_not_found() => true,
                Err(error) => return Err(error),
            };

        let mut verified = false;
        if self.policy.verify_after_delete && !already_removed {
            match self.timed(AgentKind::Workflow, workflows.get_by_id(workflow_id)).await {
                Err(error) if error.is_not_found() => verified = true,
                Ok(_) => {
                    warn!(
                        event_name = "agent.workflow.delete_not_applied",
                        workflow_id,
                        "delete reported success but the workflow is still present"
                    );
                    return Err(AgentError::InvalidResponse {
                        agent: AgentKind::Workflow,
                        message: format!(
                            "delete of workflow {workflow_id} reported success \
                             but the workflow still exists"
                        ),
                    });
                }
                Err(error) => {
                    return Err(AgentError::InvalidResponse {
                        agent: AgentKind::Workflow,
                        message: format!(
                            "deletion of workflow {workflow_id} could not be verified: {error}"
                        ),
                    });
                }
            }
        }

        debug!(
            event_name = "agent.workflow.deleted",
            workflow_id,
            already_removed,
            verified,
            "workflow delete settled"
        );
        Ok(DeleteReceipt {
            workflow_id: workflow_id.to_string(),
            deleted: true,
            already_removed,
            verified: verified || already_removed,
        })
    }

    /// Deletes every target independently with bounded concurrency. Results
    /// land in per-item slots in target order and are merged afterwards.
    async fn bulk_delete(
        &self,
        targets: Vec<DeletedItem>,
        kept_count: Option<usize>,
    ) -> BulkDeleteReport {
        let items = stream::iter(targets)
            .map(|item| async move {
                let result = self.delete_workflow(&item.id).await.map(|_| ());
                (item, result)
            })
            .buffered(self.policy.bulk_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        BulkDeleteReport::from_items(items, kept_count)
    }
}

fn required<'a>(
    agent: AgentKind,
    value: &'a Option<String>,
    label: &str,
) -> AgentResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing_parameter(agent, label))
}

fn missing_parameter(agent: AgentKind, label: &str) -> AgentError {
    AgentError::InvalidRequest { agent, message: format!("no {label} was found in the request") }
}

fn to_details<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use switchboard_core::{
        AgentKind, ConversationId, ConversationTurn, Intent, IntentKind, IntentParameters,
    };

    use super::{DelegationPolicy, Delegator};
    use crate::classifier::RequestContext;
    use crate::fakes::{registry, FakeWorkflows};
    use crate::memory::ConversationMemory;

    fn delegator(workflows: Arc<FakeWorkflows>, policy: DelegationPolicy) -> Delegator {
        Delegator::new(registry(workflows), Arc::new(ConversationMemory::default()), policy)
    }

    fn delete_intent(id: &str) -> Intent {
        Intent::new(
            IntentKind::WorkflowDelete,
            IntentParameters { workflow_id: Some(id.to_string()), ..IntentParameters::default() },
            0.95,
        )
    }

    const WORKFLOW_ID: &str = "ABCDEFGH12345678";

    fn conversation() -> ConversationId {
        ConversationId::from("c-1")
    }

    #[tokio::test]
    async fn deleting_an_already_deleted_workflow_succeeds() {
        let workflows = Arc::new(FakeWorkflows::default());
        let delegator = delegator(workflows.clone(), DelegationPolicy::default());

        let outcome = delegator
            .delegate(&delete_intent(WORKFLOW_ID), &conversation(), &RequestContext::default())
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.agents_invoked, vec![AgentKind::Workflow]);
        let details = outcome.details.expect("details");
        assert_eq!(details["alreadyRemoved"], json!(true));
        assert_eq!(workflows.calls(), vec!["delete:ABCDEFGH12345678".to_string()]);
    }

    #[tokio::test]
    async fn verified_delete_reads_the_workflow_back() {
        let workflows = Arc::new(FakeWorkflows::with(&[(WORKFLOW_ID, "Invoice sync", false)]));
        let delegator = delegator(workflows.clone(), DelegationPolicy::default());

        let outcome = delegator
            .delegate(&delete_intent(WORKFLOW_ID), &conversation(), &RequestContext::default())
            .await;

        assert!(outcome.success);
        let details = outcome.details.expect("details");
        assert_eq!(details["verified"], json!(true));
        assert_eq!(details["alreadyRemoved"], json!(false));
        assert_eq!(
            workflows.calls(),
            vec!["delete:ABCDEFGH12345678".to_string(), "get:ABCDEFGH12345678".to_string()]
        );
    }

    #[tokio::test]
    async fn false_positive_delete_is_reported_as_failure() {
        let workflows = Arc::new(
            FakeWorkflows::with(&[("ABCDEFGH12345678", "Invoice sync", false)])
                .sticky(&["ABCDEFGH12345678"]),
        );
        let delegator = delegator(workflows, DelegationPolicy::default());

        let outcome = delegator
            .delegate(&delete_intent(WORKFLOW_ID), &conversation(), &RequestContext::default())
            .await;

        assert!(!outcome.success);
        assert!(outcome.error_message.expect("message").contains("still exists"));
        assert_eq!(outcome.agents_invoked, vec![AgentKind::Workflow]);
    }

    #[tokio::test]
    async fn unreadable_workflow_after_delete_is_reported_as_unverified() {
        let workflows = Arc::new(
            FakeWorkflows::with(&[(WORKFLOW_ID, "Invoice sync", false)])
                .unreadable(&[WORKFLOW_ID]),
        );
        let delegator = delegator(workflows.clone(), DelegationPolicy::default());

        let outcome = delegator
            .delegate(&delete_intent(WORKFLOW_ID), &conversation(), &RequestContext::default())
            .await;

        assert!(!outcome.success);
        let message = outcome.error_message.expect("message");
        assert!(message.contains("could not be verified"), "{message}");
        assert_eq!(
            workflows.calls(),
            vec!["delete:ABCDEFGH12345678".to_string(), "get:ABCDEFGH12345678".to_string()]
        );
    }

    #[tokio::test]
    async fn verification_can_be_turned_off() {
        let workflows = Arc::new(
            FakeWorkflows::with(&[("ABCDEFGH12345678", "Invoice sync", false)])
                .sticky(&["ABCDEFGH12345678"]),
        );
        let policy = DelegationPolicy { verify_after_delete: false, ..DelegationPolicy::default() };
        let delegator = delegator(workflows.clone(), policy);

        let outcome = delegator
            .delegate(&delete_intent(WORKFLOW_ID), &conversation(), &RequestContext::default())
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.details.expect("details")["verified"], json!(false));
        assert_eq!(workflows.calls(), vec!["delete:ABCDEFGH12345678".to_string()]);
    }

    #[tokio::test]
    async fn missing_identifier_is_rejected_without_calling_the_agent() {
        let workflows = Arc::new(FakeWorkflows::default());
        let delegator = delegator(workflows.clone(), DelegationPolicy::default());

        let outcome = delegator
            .delegate(
                &Intent::bare(IntentKind::WorkflowDelete, 0.6),
                &conversation(),
                &RequestContext::default(),
            )
            .await;

        assert!(!outcome.success);
        assert!(outcome.agents_invoked.is_empty());
        assert!(outcome.error_message.expect("message").contains("workflow identifier"));
        assert!(workflows.calls().is_empty());
    }

    #[tokio::test]
    async fn bulk_delete_tolerates_partial_failures() {
        let workflows = Arc::new(
            FakeWorkflows::with(&[
                ("AAAAAAAAAAAAAAA1", "One", false),
                ("AAAAAAAAAAAAAAA2", "Two", false),
                ("AAAAAAAAAAAAAAA3", "Three", false),
                ("AAAAAAAAAAAAAAA4", "Four", false),
            ])
            .failing(&["AAAAAAAAAAAAAAA2", "AAAAAAAAAAAAAAA4"]),
        );
        let delegator = delegator(workflows, DelegationPolicy::default());
        let ids = [
            "AAAAAAAAAAAAAAA1",
            "AAAAAAAAAAAAAAA2",
            "AAAAAAAAAAAAAAA3",
            "AAAAAAAAAAAAAAA4",
            "GONEGONEGONEGONE",
        ];
        let intent = Intent::new(
            IntentKind::WorkflowDeleteMultiple,
            IntentParameters {
                workflow_ids: ids.iter().map(|id| id.to_string()).collect(),
                ..IntentParameters::default()
            },
            0.95,
        );

        let outcome =
            delegator.delegate(&intent, &conversation(), &RequestContext::default()).await;

        assert!(outcome.success);
        let details = outcome.details.expect("details");
        assert_eq!(details["deletedCount"], json!(3));
        let failed = details["failed"].as_array().expect("failed list");
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0]["id"], json!("AAAAAAAAAAAAAAA2"));
        assert!(failed.iter().all(|item| !item["error"].as_str().unwrap_or("").is_empty()));
        let deleted: Vec<&str> = details["deleted"]
            .as_array()
            .expect("deleted list")
            .iter()
            .filter_map(|item| item["id"].as_str())
            .collect();
        assert_eq!(deleted, vec!["AAAAAAAAAAAAAAA1", "AAAAAAAAAAAAAAA3", "GONEGONEGONEGONE"]);
    }

    #[tokio::test]
    async fn delete_all_inactive_keeps_active_workflows() {
        let workflows = Arc::new(FakeWorkflows::with(&[
            ("AAAAAAAAAAAAAAA1", "Live sync", true),
            ("AAAAAAAAAAAAAAA2", "Old import", false),
            ("AAAAAAAAAAAAAAA3", "Draft", false),
        ]));
        let delegator = delegator(workflows.clone(), DelegationPolicy::default());

        let outcome = delegator
            .delegate(
                &Intent::bare(IntentKind::WorkflowDeleteAllInactive, 0.9),
                &conversation(),
                &RequestContext::default(),
            )
            .await;

        assert!(outcome.success);
        let details = outcome.details.expect("details");
        assert_eq!(details["deletedCount"], json!(2));
        assert_eq!(details["keptCount"], json!(1));
        assert_eq!(details["deleted"][0]["name"], json!("Old import"));
        assert_eq!(workflows.remaining(), vec!["AAAAAAAAAAAAAAA1".to_string()]);
    }

    #[tokio::test]
    async fn delete_all_inactive_reports_workflows_that_survive_the_delete() {
        let workflows = Arc::new(
            FakeWorkflows::with(&[
                ("AAAAAAAAAAAAAAA1", "Live sync", true),
                ("AAAAAAAAAAAAAAA2", "Old import", false),
                ("AAAAAAAAAAAAAAA3", "Draft", false),
                ("AAAAAAAAAAAAAAA4", "Scratch", false),
            ])
            .sticky(&["AAAAAAAAAAAAAAA3"]),
        );
        let delegator = delegator(workflows.clone(), DelegationPolicy::default());

        let outcome = delegator
            .delegate(
                &Intent::bare(IntentKind::WorkflowDeleteAllInactive, 0.9),
                &conversation(),
                &RequestContext::default(),
            )
            .await;

        assert!(outcome.success);
        let details = outcome.details.expect("details");
        assert_eq!(details["deletedCount"], json!(2));
        let deleted: Vec<&str> = details["deleted"]
            .as_array()
            .expect("deleted list")
            .iter()
            .filter_map(|item| item["id"].as_str())
            .collect();
        assert_eq!(deleted, vec!["AAAAAAAAAAAAAAA2", "AAAAAAAAAAAAAAA4"]);

        let failed = details["failed"].as_array().expect("failed list");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["id"], json!("AAAAAAAAAAAAAAA3"));
        assert!(failed[0]["error"].as_str().unwrap_or_default().contains("still exists"));
        assert_eq!(
            workflows.remaining(),
            vec!["AAAAAAAAAAAAAAA1".to_string(), "AAAAAAAAAAAAAAA3".to_string()]
        );
    }

    #[tokio::test]
    async fn slow_agents_resolve_as_timeouts() {
        let workflows = Arc::new(FakeWorkflows::default().hanging());
        let policy = DelegationPolicy {
            call_timeout: Duration::from_millis(20),
            ..DelegationPolicy::default()
        };
        let delegator = delegator(workflows, policy);

        let outcome = delegator
            .delegate(
                &Intent::bare(IntentKind::WorkflowList, 0.9),
                &conversation(),
                &RequestContext::default(),
            )
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.agents_invoked, vec![AgentKind::Workflow]);
        assert!(outcome.error_message.expect("message").contains("did not respond"));
    }

    #[tokio::test]
    async fn status_counts_active_and_inactive() {
        let workflows = Arc::new(FakeWorkflows::with(&[
            ("AAAAAAAAAAAAAAA1", "Live sync", true),
            ("AAAAAAAAAAAAAAA2", "Old import", false),
        ]));
        let delegator = delegator(workflows, DelegationPolicy::default());

        let outcome = delegator
            .delegate(
                &Intent::bare(IntentKind::WorkflowStatus, 0.8),
                &conversation(),
                &RequestContext::default(),
            )
            .await;

        assert_eq!(outcome.details, Some(json!({ "total": 2, "active": 1, "inactive": 1 })));
    }

    #[tokio::test]
    async fn local_intents_invoke_no_agent() {
        let workflows = Arc::new(FakeWorkflows::default());
        let memory = Arc::new(ConversationMemory::default());
        memory.append(&conversation(), ConversationTurn::user("hello", None));
        let delegator =
            Delegator::new(registry(workflows), memory.clone(), DelegationPolicy::default());

        for kind in [
            IntentKind::Help,
            IntentKind::SecurityAudit,
            IntentKind::ConversationHistory,
            IntentKind::GenericConversation,
        ] {
            let outcome = delegator
                .delegate(&Intent::bare(kind, 0.9), &conversation(), &RequestContext::default())
                .await;
            assert!(outcome.success, "{kind}");
            assert!(outcome.agents_invoked.is_empty(), "{kind}");
        }

        let reset = delegator
            .delegate(
                &Intent::bare(IntentKind::ConversationReset, 0.9),
                &conversation(),
                &RequestContext::default(),
            )
            .await;
        assert_eq!(reset.details, Some(json!({ "cleared": 1 })));
        assert!(memory.is_empty(&conversation()));
    }

    #[tokio::test]
    async fn panics_report_only_the_agents_actually_called() {
        let listing = delegator(
            Arc::new(FakeWorkflows::default().panicking()),
            DelegationPolicy::default(),
        );
        let outcome = listing
            .delegate(
                &Intent::bare(IntentKind::WorkflowList, 0.9),
                &conversation(),
                &RequestContext::default(),
            )
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.agents_invoked, vec![AgentKind::Workflow]);
        assert!(outcome.error_message.expect("message").contains("internal error"));

        let audit = delegator(
            Arc::new(FakeWorkflows::default().panicking_settings()),
            DelegationPolicy::default(),
        );
        let outcome = audit
            .delegate(
                &Intent::bare(IntentKind::SecurityAudit, 0.9),
                &conversation(),
                &RequestContext::default(),
            )
            .await;
        assert!(!outcome.success);
        assert!(outcome.agents_invoked.is_empty());
    }

    #[tokio::test]
    async fn security_audit_lists_missing_settings() {
        let delegator = delegator(Arc::new(FakeWorkflows::default()), DelegationPolicy::default());

        let outcome = delegator
            .delegate(
                &Intent::bare(IntentKind::SecurityAudit, 0.9),
                &conversation(),
                &RequestContext::default(),
            )
            .await;

        let details = outcome.details.expect("details");
        let agents = details["agents"].as_array().expect("agents");
        assert_eq!(agents.len(), 5);
        let database = agents.iter().find(|agent| agent["agent"] == json!("database")).expect("db");
        assert_eq!(database["configured"], json!(false));
        assert_eq!(database["missingSettings"], json!(["database.base_id"]));
    }
}
