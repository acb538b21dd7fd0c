//! Conversational orchestration for switchboard.
//!
//! A request flows through [`AgentRuntime::handle_message`]:
//! 1. **Classification** (`classifier`) turns free text into an [`Intent`]
//!    using an ordered table of keyword rules.
//! 2. **Delegation** (`delegator`) calls the agent clients bound to the
//!    intent, each call under a timeout.
//! 3. **Formatting** (`formatter`) renders the outcome as a reply.
//! 4. **Memory** (`memory`) records the exchange per conversation.
//!
//! The classifier never calls a model. Only generic conversation may reach
//! the optional completion backend.
//!
//! [`Intent`]: switchboard_core::Intent

pub mod classifier;
pub mod delegator;
pub mod formatter;
pub mod help;
pub mod memory;
pub mod registry;
pub mod runtime;

#[cfg(test)]
mod fakes;

pub use classifier::{IntentClassifier, RequestContext};
pub use delegator::{DelegationPolicy, Delegator};
pub use formatter::format_response;
pub use memory::ConversationMemory;
pub use registry::{AgentReadiness, AgentRegistry};
pub use runtime::{AgentResponse, AgentRuntime};
