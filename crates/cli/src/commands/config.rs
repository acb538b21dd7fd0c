use std::env;
use std::fs;
use std::path::Path;

use switchboard_core::config::{resolve_config_path, AppConfig, LoadOptions, ENV_PREFIX};
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &str, aliases: &[&str]| {
        field_source(key, aliases, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    for (section, endpoint) in [("workflow", &config.workflow), ("deployment", &config.deployment)]
    {
        let base_url = format!("{section}.base_url");
        let api_key = format!("{section}.api_key");
        let timeout = format!("{section}.timeout_secs");
        let base_url_value = or_unset(endpoint.base_url.as_deref());
        lines.push(render_line(&base_url, base_url_value, source(&base_url, &[])));
        let api_key_value = redact_token(endpoint.api_key());
        lines.push(render_line(&api_key, &api_key_value, source(&api_key, &[])));
        let timeout_value = endpoint.timeout_secs.to_string();
        lines.push(render_line(&timeout, &timeout_value, source(&timeout, &[])));
    }

    lines.push(render_line(
        "database.base_url",
        or_unset(config.database.base_url.as_deref()),
        source("database.base_url", &[]),
    ));
    lines.push(render_line(
        "database.api_key",
        &redact_token(config.database.api_key()),
        source("database.api_key", &[]),
    ));
    lines.push(render_line(
        "database.base_id",
        or_unset(config.database.base_id.as_deref()),
        source("database.base_id", &[]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", &[]),
    ));

    lines.push(render_line(
        "email.base_url",
        or_unset(config.email.base_url.as_deref()),
        source("email.base_url", &[]),
    ));
    lines.push(render_line(
        "email.api_key",
        &redact_token(config.email.api_key()),
        source("email.api_key", &[]),
    ));
    lines.push(render_line(
        "email.from_address",
        or_unset(config.email.from_address.as_deref()),
        source("email.from_address", &[]),
    ));
    lines.push(render_line(
        "email.simulate",
        &config.email.simulate.to_string(),
        source("email.simulate", &[]),
    ));

    lines.push(render_line(
        "completion.base_url",
        or_unset(config.completion.base_url.as_deref()),
        source("completion.base_url", &[]),
    ));
    lines.push(render_line(
        "completion.api_key",
        &redact_token(config.completion.api_key()),
        source("completion.api_key", &[]),
    ));
    lines.push(render_line(
        "completion.model",
        &config.completion.model,
        source("completion.model", &[]),
    ));

    lines.push(render_line(
        "delegation.verify_after_delete",
        &config.delegation.verify_after_delete.to_string(),
        source("delegation.verify_after_delete", &[]),
    ));
    lines.push(render_line(
        "delegation.call_timeout_secs",
        &config.delegation.call_timeout_secs.to_string(),
        source("delegation.call_timeout_secs", &[]),
    ));
    lines.push(render_line(
        "delegation.bulk_concurrency",
        &config.delegation.bulk_concurrency.to_string(),
        source("delegation.bulk_concurrency", &[]),
    ));
    lines.push(render_line(
        "memory.max_turns",
        &config.memory.max_turns.to_string(),
        source("memory.max_turns", &[]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["SWITCHBOARD_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["SWITCHBOARD_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn env_key(key_path: &str) -> String {
    format!("{ENV_PREFIX}_{}", key_path.replace('.', "_").to_ascii_uppercase())
}

fn field_source(
    key_path: &str,
    env_aliases: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let primary = env_key(key_path);
    let env_keys = std::iter::once(primary.as_str()).chain(env_aliases.iter().copied());
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("<unset>")
}

/// Keeps a short vendor prefix such as `SG.` or `rnd_` and hides the rest.
fn redact_token(token: Option<&str>) -> String {
    let Some(token) = token.map(str::trim) else {
        return "<unset>".to_string();
    };

    let prefix_end = token.find(['.', '_', '-']).filter(|index| (1..=4).contains(index));
    match prefix_end {
        Some(index) => format!("{}***", &token[..=index]),
        None => "<redacted>".to_string(),
    }
}
