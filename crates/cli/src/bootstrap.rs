use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use switchboard_agent::{AgentRegistry, AgentRuntime, ConversationMemory, DelegationPolicy};
use switchboard_clients::{
    HttpCompletionClient, HttpDatabaseClient, HttpDeploymentClient, HttpEmailClient,
    HttpWorkflowClient, InMemoryFileStore,
};
use switchboard_core::config::{AppConfig, ConfigError, LoadOptions};
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub files: Arc<InMemoryFileStore>,
    pub runtime: AgentRuntime,
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, ConfigError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    let files = Arc::new(InMemoryFileStore::new());
    let agents = registry_from_config(&config, Arc::clone(&files));
    let memory = Arc::new(ConversationMemory::new(config.memory.max_turns));
    let runtime = AgentRuntime::new(agents, memory, DelegationPolicy::from(&config.delegation));

    info!(
        event_name = "system.bootstrap.ready",
        completion_enabled = runtime.delegator().agents().has_completion(),
        verify_after_delete = config.delegation.verify_after_delete,
        max_turns = config.memory.max_turns,
        "agent runtime initialized"
    );

    Application { config, files, runtime }
}

/// Builds every agent client from config. The completion client is only
/// registered when a completion endpoint is configured.
pub fn registry_from_config(config: &AppConfig, files: Arc<InMemoryFileStore>) -> AgentRegistry {
    let registry = AgentRegistry {
        workflow: Arc::new(HttpWorkflowClient::new(&config.workflow)),
        deployment: Arc::new(HttpDeploymentClient::new(&config.deployment)),
        database: Arc::new(HttpDatabaseClient::new(&config.database)),
        email: Arc::new(HttpEmailClient::new(&config.email)),
        files,
        completion: None,
    };

    match config.completion.base_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            registry.with_completion(Arc::new(HttpCompletionClient::new(&config.completion)))
        }
        _ => registry,
    }
}

/// Loads local files into the store for `owner`. Returns the stored names.
pub fn upload_files(
    store: &InMemoryFileStore,
    owner: &str,
    paths: &[impl AsRef<Path>],
) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read upload `{}`", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        store.add(owner, &name, content);
        names.push(name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use switchboard_clients::InMemoryFileStore;
    use switchboard_core::config::AppConfig;
    use switchboard_core::AgentKind;

    use super::{registry_from_config, upload_files};

    #[test]
    fn completion_is_only_registered_when_configured() {
        let mut config = AppConfig::default();
        let registry = registry_from_config(&config, Arc::new(InMemoryFileStore::new()));
        assert!(!registry.has_completion());
        assert_eq!(registry.readiness().len(), 5);

        config.completion.base_url = Some("https://llm.example.com/v1".to_string());
        let registry = registry_from_config(&config, Arc::new(InMemoryFileStore::new()));
        assert!(registry.has_completion());
        let completion = registry
            .readiness()
            .into_iter()
            .find(|readiness| readiness.agent == AgentKind::Completion)
            .expect("completion readiness");
        assert_eq!(completion.missing_settings, vec!["completion.api_key".to_string()]);
    }

    #[test]
    fn uploads_are_stored_under_their_file_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sales.csv");
        fs::write(&path, "region,total\nnorth,10\n").expect("write upload");
        let store = InMemoryFileStore::new();

        let names = upload_files(&store, "alice", &[&path]).expect("upload");
        assert_eq!(names, vec!["sales.csv".to_string()]);

        let missing = upload_files(&store, "alice", &[dir.path().join("absent.txt")]);
        assert!(missing.is_err());
    }
}
