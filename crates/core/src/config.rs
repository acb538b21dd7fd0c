use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "SWITCHBOARD";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub workflow: EndpointConfig,
    pub deployment: EndpointConfig,
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub completion: CompletionConfig,
    pub delegation: DelegationConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

/// Connection parameters for one remote agent. Missing values are legal here;
/// the agent reports them when an operation is first attempted.
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub base_id: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub from_address: Option<String>,
    pub simulate: bool,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationConfig {
    pub verify_after_delete: bool,
    pub call_timeout_secs: u64,
    pub bulk_concurrency: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryConfig {
    pub max_turns: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub workflow_base_url: Option<String>,
    pub workflow_api_key: Option<String>,
    pub verify_after_delete: Option<bool>,
    pub call_timeout_secs: Option<u64>,
    pub max_turns: Option<usize>,
    pub email_simulate: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workflow: EndpointConfig { base_url: None, api_key: None, timeout_secs: 20 },
            deployment: EndpointConfig {
                base_url: Some("https://api.render.com/v1".to_string()),
                api_key: None,
                timeout_secs: 30,
            },
            database: DatabaseConfig {
                base_url: Some("https://api.airtable.com/v0".to_string()),
                api_key: None,
                base_id: None,
                timeout_secs: 15,
            },
            email: EmailConfig {
                base_url: Some("https://api.sendgrid.com/v3".to_string()),
                api_key: None,
                from_address: None,
                simulate: false,
                timeout_secs: 15,
            },
            completion: CompletionConfig {
                base_url: None,
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
            },
            delegation: DelegationConfig {
                verify_after_delete: true,
                call_timeout_secs: 30,
                bulk_concurrency: 4,
            },
            memory: MemoryConfig { max_turns: 100 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("switchboard.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(workflow) = patch.workflow {
            workflow.apply_to(&mut self.workflow);
        }
        if let Some(deployment) = patch.deployment {
            deployment.apply_to(&mut self.deployment);
        }

        if let Some(database) = patch.database {
            if let Some(base_url) = database.base_url {
                self.database.base_url = Some(base_url);
            }
            if let Some(database_api_key_value) = database.api_key {
                self.database.api_key = Some(secret_value(database_api_key_value));
            }
            if let Some(base_id) = database.base_id {
                self.database.base_id = Some(base_id);
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(email) = patch.email {
            if let Some(base_url) = email.base_url {
                self.email.base_url = Some(base_url);
            }
            if let Some(email_api_key_value) = email.api_key {
                self.email.api_key = Some(secret_value(email_api_key_value));
            }
            if let Some(from_address) = email.from_address {
                self.email.from_address = Some(from_address);
            }
            if let Some(simulate) = email.simulate {
                self.email.simulate = simulate;
            }
            if let Some(timeout_secs) = email.timeout_secs {
                self.email.timeout_secs = timeout_secs;
            }
        }

        if let Some(completion) = patch.completion {
            if let Some(base_url) = completion.base_url {
                self.completion.base_url = Some(base_url);
            }
            if let Some(completion_api_key_value) = completion.api_key {
                self.completion.api_key = Some(secret_value(completion_api_key_value));
            }
            if let Some(model) = completion.model {
                self.completion.model = model;
            }
            if let Some(timeout_secs) = completion.timeout_secs {
                self.completion.timeout_secs = timeout_secs;
            }
        }

        if let Some(delegation) = patch.delegation {
            if let Some(verify_after_delete) = delegation.verify_after_delete {
                self.delegation.verify_after_delete = verify_after_delete;
            }
            if let Some(call_timeout_secs) = delegation.call_timeout_secs {
                self.delegation.call_timeout_secs = call_timeout_secs;
            }
            if let Some(bulk_concurrency) = delegation.bulk_concurrency {
                self.delegation.bulk_concurrency = bulk_concurrency;
            }
        }

        if let Some(memory) = patch.memory {
            if let Some(max_turns) = memory.max_turns {
                self.memory.max_turns = max_turns;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        apply_endpoint_env(&mut self.workflow, "WORKFLOW")?;
        apply_endpoint_env(&mut self.deployment, "DEPLOYMENT")?;

        if let Some(value) = read_env("SWITCHBOARD_DATABASE_BASE_URL") {
            self.database.base_url = Some(value);
        }
        if let Some(value) = read_env("SWITCHBOARD_DATABASE_API_KEY") {
            self.database.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SWITCHBOARD_DATABASE_BASE_ID") {
            self.database.base_id = Some(value);
        }
        if let Some(value) = read_env("SWITCHBOARD_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SWITCHBOARD_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_EMAIL_BASE_URL") {
            self.email.base_url = Some(value);
        }
        if let Some(value) = read_env("SWITCHBOARD_EMAIL_API_KEY") {
            self.email.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SWITCHBOARD_EMAIL_FROM_ADDRESS") {
            self.email.from_address = Some(value);
        }
        if let Some(value) = read_env("SWITCHBOARD_EMAIL_SIMULATE") {
            self.email.simulate = parse_bool("SWITCHBOARD_EMAIL_SIMULATE", &value)?;
        }
        if let Some(value) = read_env("SWITCHBOARD_EMAIL_TIMEOUT_SECS") {
            self.email.timeout_secs = parse_u64("SWITCHBOARD_EMAIL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_COMPLETION_BASE_URL") {
            self.completion.base_url = Some(value);
        }
        if let Some(value) = read_env("SWITCHBOARD_COMPLETION_API_KEY") {
            self.completion.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SWITCHBOARD_COMPLETION_MODEL") {
            self.completion.model = value;
        }
        if let Some(value) = read_env("SWITCHBOARD_COMPLETION_TIMEOUT_SECS") {
            self.completion.timeout_secs =
                parse_u64("SWITCHBOARD_COMPLETION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_DELEGATION_VERIFY_AFTER_DELETE") {
            self.delegation.verify_after_delete =
                parse_bool("SWITCHBOARD_DELEGATION_VERIFY_AFTER_DELETE", &value)?;
        }
        if let Some(value) = read_env("SWITCHBOARD_DELEGATION_CALL_TIMEOUT_SECS") {
            self.delegation.call_timeout_secs =
                parse_u64("SWITCHBOARD_DELEGATION_CALL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SWITCHBOARD_DELEGATION_BULK_CONCURRENCY") {
            self.delegation.bulk_concurrency =
                parse_usize("SWITCHBOARD_DELEGATION_BULK_CONCURRENCY", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_MEMORY_MAX_TURNS") {
            self.memory.max_turns = parse_usize("SWITCHBOARD_MEMORY_MAX_TURNS", &value)?;
        }

        let log_level =
            read_env("SWITCHBOARD_LOGGING_LEVEL").or_else(|| read_env("SWITCHBOARD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SWITCHBOARD_LOGGING_FORMAT").or_else(|| read_env("SWITCHBOARD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.workflow_base_url {
            self.workflow.base_url = Some(base_url);
        }
        if let Some(workflow_api_key) = overrides.workflow_api_key {
            self.workflow.api_key = Some(secret_value(workflow_api_key));
        }
        if let Some(verify_after_delete) = overrides.verify_after_delete {
            self.delegation.verify_after_delete = verify_after_delete;
        }
        if let Some(call_timeout_secs) = overrides.call_timeout_secs {
            self.delegation.call_timeout_secs = call_timeout_secs;
        }
        if let Some(max_turns) = overrides.max_turns {
            self.memory.max_turns = max_turns;
        }
        if let Some(simulate) = overrides.email_simulate {
            self.email.simulate = simulate;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("workflow", &self.workflow)?;
        validate_endpoint("deployment", &self.deployment)?;
        validate_url("database.base_url", self.database.base_url.as_deref())?;
        validate_timeout("database.timeout_secs", self.database.timeout_secs)?;
        validate_email(&self.email)?;
        validate_url("completion.base_url", self.completion.base_url.as_deref())?;
        validate_timeout("completion.timeout_secs", self.completion.timeout_secs)?;
        validate_delegation(&self.delegation)?;
        validate_memory(&self.memory)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl EndpointConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret()).filter(|key| !key.trim().is_empty())
    }
}

impl DatabaseConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret()).filter(|key| !key.trim().is_empty())
    }
}

impl EmailConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret()).filter(|key| !key.trim().is_empty())
    }
}

impl CompletionConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret()).filter(|key| !key.trim().is_empty())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("switchboard.toml"), PathBuf::from("config/switchboard.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn apply_endpoint_env(endpoint: &mut EndpointConfig, section: &str) -> Result<(), ConfigError> {
    if let Some(value) = read_env(&format!("{ENV_PREFIX}_{section}_BASE_URL")) {
        endpoint.base_url = Some(value);
    }
    if let Some(value) = read_env(&format!("{ENV_PREFIX}_{section}_API_KEY")) {
        endpoint.api_key = Some(secret_value(value));
    }
    let timeout_key = format!("{ENV_PREFIX}_{section}_TIMEOUT_SECS");
    if let Some(value) = read_env(&timeout_key) {
        endpoint.timeout_secs = parse_u64(&timeout_key, &value)?;
    }
    Ok(())
}

fn validate_endpoint(section: &str, endpoint: &EndpointConfig) -> Result<(), ConfigError> {
    validate_url(&format!("{section}.base_url"), endpoint.base_url.as_deref())?;
    validate_timeout(&format!("{section}.timeout_secs"), endpoint.timeout_secs)
}

fn validate_url(key: &str, url: Option<&str>) -> Result<(), ConfigError> {
    let Some(url) = url else {
        return Ok(());
    };
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    validate_url("email.base_url", email.base_url.as_deref())?;
    validate_timeout("email.timeout_secs", email.timeout_secs)?;

    if let Some(from_address) = &email.from_address {
        if !from_address.contains('@') {
            return Err(ConfigError::Validation(
                "email.from_address must be an email address".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_delegation(delegation: &DelegationConfig) -> Result<(), ConfigError> {
    validate_timeout("delegation.call_timeout_secs", delegation.call_timeout_secs)?;
    if delegation.bulk_concurrency == 0 {
        return Err(ConfigError::Validation(
            "delegation.bulk_concurrency must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
    if memory.max_turns == 0 {
        return Err(ConfigError::Validation(
            "memory.max_turns must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    workflow: Option<EndpointPatch>,
    deployment: Option<EndpointPatch>,
    database: Option<DatabasePatch>,
    email: Option<EmailPatch>,
    completion: Option<CompletionPatch>,
    delegation: Option<DelegationPatch>,
    memory: Option<MemoryPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl EndpointPatch {
    fn apply_to(self, endpoint: &mut EndpointConfig) {
        if let Some(base_url) = self.base_url {
            endpoint.base_url = Some(base_url);
        }
        if let Some(endpoint_api_key_value) = self.api_key {
            endpoint.api_key = Some(secret_value(endpoint_api_key_value));
        }
        if let Some(timeout_secs) = self.timeout_secs {
            endpoint.timeout_secs = timeout_secs;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    base_url: Option<String>,
    api_key: Option<String>,
    base_id: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    from_address: Option<String>,
    simulate: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DelegationPatch {
    verify_after_delete: Option<bool>,
    call_timeout_secs: Option<u64>,
    bulk_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct MemoryPatch {
    max_turns: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
