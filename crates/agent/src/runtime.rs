use std::sync::Arc;

use serde::Serialize;
use switchboard_core::{ConversationId, ConversationTurn, DelegationOutcome, Intent, IntentKind};
use tracing::info;

use crate::classifier::{IntentClassifier, RequestContext};
use crate::delegator::{DelegationPolicy, Delegator};
use crate::formatter::format_response;
use crate::memory::ConversationMemory;
use crate::registry::AgentRegistry;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentResponse {
    pub text: String,
    pub intent: Intent,
    pub outcome: DelegationOutcome,
}

/// One request is one sequential classify, delegate, format, remember pass.
/// Concurrent requests share only the conversation memory.
pub struct AgentRuntime {
    classifier: IntentClassifier,
    delegator: Delegator,
    memory: Arc<ConversationMemory>,
}

impl AgentRuntime {
    pub fn new(
        agents: AgentRegistry,
        memory: Arc<ConversationMemory>,
        policy: DelegationPolicy,
    ) -> Self {
        let delegator = Delegator::new(agents, Arc::clone(&memory), policy);
        Self { classifier: IntentClassifier::new(), delegator, memory }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn delegator(&self) -> &Delegator {
        &self.delegator
    }

    pub async fn handle_message(
        &self,
        conversation: &ConversationId,
        utterance: &str,
        context: &RequestContext,
    ) -> AgentResponse {
        let intent = self.classifier.classify(utterance, context);

        let outcome = self.delegator.delegate(&intent, conversation, context).await;

        let text = format_response(&outcome, &intent);

        info!(
            event_name = "agent.delegation.completed",
            intent = %intent.kind,
            success = outcome.success,
            agents_invoked = ?outcome.agents_invoked,
            conversation_id = %conversation,
            "request handled"
        );

        if intent.kind != IntentKind::ConversationReset {
            self.memory.append(conversation, ConversationTurn::user(utterance, Some(intent.kind)));
            let reply = ConversationTurn::assistant(text.as_str(), Some(intent.kind));
            self.memory.append(conversation, reply);
        }

        AgentResponse { text, intent, outcome }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use switchboard_clients::InMemoryFileStore;
    use switchboard_core::{AgentKind, ConversationId, IntentKind, Role};

    use super::AgentRuntime;
    use crate::classifier::RequestContext;
    use crate::delegator::DelegationPolicy;
    use crate::fakes::{registry, registry_with_files, EchoCompletion, FakeWorkflows};
    use crate::memory::ConversationMemory;
    use crate::registry::AgentRegistry;

    fn runtime(agents: AgentRegistry) -> AgentRuntime {
        let memory = Arc::new(ConversationMemory::default());
        AgentRuntime::new(agents, memory, DelegationPolicy::default())
    }

    #[tokio::test]
    async fn deleting_an_already_removed_workflow_reads_as_success() {
        let workflows = Arc::new(FakeWorkflows::default());
        let runtime = runtime(registry(Arc::clone(&workflows)));
        let conversation = ConversationId::from("c-1");

        let response = runtime
            .handle_message(
                &conversation,
                "Supprime le workflow ABCDEFGH12345678",
                &RequestContext::default(),
            )
            .await;

        assert_eq!(response.intent.kind, IntentKind::WorkflowDelete);
        assert_eq!(response.intent.parameters.workflow_id.as_deref(), Some("ABCDEFGH12345678"));
        assert!(response.intent.confidence >= 0.95);
        assert_eq!(workflows.calls(), vec!["delete:ABCDEFGH12345678".to_string()]);
        assert!(response.outcome.success);
        assert!(response.text.contains("already removed"));
    }

    #[tokio::test]
    async fn listing_files_without_uploads_says_so() {
        let runtime = runtime(registry(Arc::new(FakeWorkflows::default())));

        let response = runtime
            .handle_message(
                &ConversationId::from("c-1"),
                "Liste mes fichiers",
                &RequestContext::default(),
            )
            .await;

        assert_eq!(response.intent.kind, IntentKind::FileList);
        assert!(response.outcome.success);
        assert!(!response.text.is_empty());
        assert!(response.text.contains("no files"));
    }

    #[tokio::test]
    async fn quoted_name_beside_an_identifier_deletes_only_that_workflow() {
        let workflows =
            Arc::new(FakeWorkflows::with(&[("ABCDEFGH12345678", "legacy", false)]));
        let runtime = runtime(registry(workflows.clone()));

        let response = runtime
            .handle_message(
                &ConversationId::from("c-1"),
                "delete the 'legacy' workflow ABCDEFGH12345678",
                &RequestContext::default(),
            )
            .await;

        assert_eq!(response.intent.kind, IntentKind::WorkflowDelete);
        assert!(response.outcome.success);
        assert!(response.text.contains("no longer exists"), "{}", response.text);
        assert_eq!(
            workflows.calls(),
            vec!["delete:ABCDEFGH12345678".to_string(), "get:ABCDEFGH12345678".to_string()]
        );
    }

    #[tokio::test]
    async fn analyzing_without_uploads_explains_there_is_nothing_to_analyze() {
        let runtime = runtime(registry(Arc::new(FakeWorkflows::default())));

        let response = runtime
            .handle_message(
                &ConversationId::from("c-1"),
                "analyze my files",
                &RequestContext::for_user("alice"),
            )
            .await;

        assert_eq!(response.intent.kind, IntentKind::FileAnalyze);
        assert!(response.outcome.success);
        assert!(response.text.contains("haven't uploaded any files"), "{}", response.text);
    }

    #[tokio::test]
    async fn file_listing_is_scoped_to_the_requesting_user() {
        let files = Arc::new(InMemoryFileStore::new());
        files.add("alice", "report.csv", "region,total\nnorth,10\n");
        let runtime = runtime(registry_with_files(Arc::new(FakeWorkflows::default()), files));
        let conversation = ConversationId::from("c-1");

        let alice = runtime
            .handle_message(&conversation, "list my files", &RequestContext::for_user("alice"))
            .await;
        let bob = runtime
            .handle_message(&conversation, "list my files", &RequestContext::for_user("bob"))
            .await;

        assert!(alice.text.contains("report.csv"));
        assert!(bob.text.contains("no files"));
    }

    #[tokio::test]
    async fn a_panicking_agent_becomes_a_formatted_failure() {
        let workflows = Arc::new(FakeWorkflows::default().panicking());
        let runtime = runtime(registry(workflows));
        let conversation = ConversationId::from("c-1");

        let response = runtime
            .handle_message(&conversation, "list my workflows", &RequestContext::default())
            .await;

        assert!(!response.outcome.success);
        assert_eq!(response.outcome.agents_invoked, vec![AgentKind::Workflow]);
        assert!(response.text.contains("internal error"));
        assert!(response.text.contains("\"help\""));
        assert_eq!(runtime.memory().len(&conversation), 2);
    }

    #[tokio::test]
    async fn each_exchange_appends_user_then_assistant_turns() {
        let workflows =
            Arc::new(FakeWorkflows::with(&[("AAAAAAAAAAAAAAA1", "Invoice sync", true)]));
        let runtime = runtime(registry(workflows));
        let conversation = ConversationId::from("c-1");

        let response = runtime
            .handle_message(&conversation, "list my workflows", &RequestContext::default())
            .await;

        let turns = runtime.memory().recent(&conversation, 10);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "list my workflows");
        assert_eq!(turns[0].related_intent, Some(IntentKind::WorkflowList));
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, response.text);
    }

    #[tokio::test]
    async fn history_excludes_the_current_request_and_reset_is_not_recorded() {
        let runtime = runtime(registry(Arc::new(FakeWorkflows::default())));
        let conversation = ConversationId::from("c-1");
        let context = RequestContext::default();

        runtime.handle_message(&conversation, "list my workflows", &context).await;
        let history = runtime.handle_message(&conversation, "show history", &context).await;
        assert_eq!(history.intent.kind, IntentKind::ConversationHistory);
        assert!(history.text.starts_with("Last 2 turn(s):"));
        assert_eq!(runtime.memory().len(&conversation), 4);

        let reset = runtime.handle_message(&conversation, "reset the conversation", &context).await;
        assert_eq!(reset.intent.kind, IntentKind::ConversationReset);
        assert!(reset.text.contains("4 turn(s) removed"));
        assert!(runtime.memory().is_empty(&conversation));
    }

    #[tokio::test]
    async fn generic_conversation_sends_recent_context_to_completion() {
        let agents =
            registry(Arc::new(FakeWorkflows::default())).with_completion(Arc::new(EchoCompletion));
        let runtime = runtime(agents);
        let conversation = ConversationId::from("c-1");
        let context = RequestContext::default();

        let first = runtime.handle_message(&conversation, "hello there", &context).await;
        assert_eq!(first.intent.kind, IntentKind::GenericConversation);
        assert_eq!(first.text, "echo: hello there (0 context lines)");
        assert_eq!(first.outcome.agents_invoked, vec![AgentKind::Completion]);

        let second = runtime.handle_message(&conversation, "how are you", &context).await;
        assert_eq!(second.text, "echo: how are you (2 context lines)");
    }

    #[tokio::test]
    async fn generic_conversation_without_completion_points_to_help() {
        let runtime = runtime(registry(Arc::new(FakeWorkflows::default())));

        let response = runtime
            .handle_message(&ConversationId::from("c-1"), "hello there", &RequestContext::default())
            .await;

        assert!(response.outcome.success);
        assert!(response.outcome.agents_invoked.is_empty());
        assert!(response.text.contains("help"));
    }

    #[tokio::test]
    async fn empty_input_is_handled_as_generic_conversation() {
        let runtime = runtime(registry(Arc::new(FakeWorkflows::default())));

        let response = runtime
            .handle_message(&ConversationId::from("c-1"), "", &RequestContext::default())
            .await;

        assert_eq!(response.intent.kind, IntentKind::GenericConversation);
        assert!(response.intent.confidence <= 0.5);
        assert!(!response.text.is_empty());
    }
}
