//! Concrete agent clients.
//!
//! HTTP clients talk to the workflow engine, hosting platform, database,
//! email transport and completion backend. Files live in an injected,
//! user-scoped in-memory store.

mod http;

pub mod completion;
pub mod database;
pub mod deployment;
pub mod email;
pub mod files;
pub mod workflow;

pub use completion::HttpCompletionClient;
pub use database::HttpDatabaseClient;
pub use deployment::HttpDeploymentClient;
pub use email::HttpEmailClient;
pub use files::InMemoryFileStore;
pub use workflow::HttpWorkflowClient;
