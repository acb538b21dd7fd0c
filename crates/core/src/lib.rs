//! Shared vocabulary of the switchboard workspace: configuration, the agent
//! error taxonomy, intent tags and the contracts every agent client fulfils.

pub mod agents;
pub mod config;
pub mod domain;
pub mod errors;

pub use agents::{
    AgentClient, AgentKind, CompletionAgent, DatabaseAgent, DeploymentAgent, EmailAgent,
    FileAgent, WorkflowAgent,
};
pub use domain::conversation::{ConversationId, ConversationTurn, Role};
pub use domain::intent::{Intent, IntentKind, IntentParameters};
pub use domain::outcome::{BulkDeleteReport, DelegationOutcome, DeletedItem, FailedItem};
pub use errors::{AgentError, AgentResult};
