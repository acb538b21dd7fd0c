use std::sync::Arc;

use serde::Serialize;
use switchboard_agent::AgentReadiness;
use switchboard_clients::InMemoryFileStore;
use switchboard_core::config::{AppConfig, LoadOptions};

use crate::bootstrap::registry_from_config;
use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                concat!(
                    "{{\"overall_status\":\"fail\",",
                    "\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}"
                ),
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation".to_string(),
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let registry = registry_from_config(&config, Arc::new(InMemoryFileStore::new()));
            checks.extend(registry.readiness().into_iter().map(readiness_check));
            checks.push(check_delete_verification(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation".to_string(),
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "agent_readiness".to_string(),
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().filter(|check| check.status == CheckStatus::Warn).count();
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = match (failed, warned) {
        (true, _) => "doctor: one or more readiness checks failed".to_string(),
        (false, 0) => "doctor: all readiness checks passed".to_string(),
        (false, warned) => {
            format!("doctor: configuration is valid, {warned} check(s) need attention")
        }
    };

    DoctorReport { overall_status, summary, checks }
}

/// An unconfigured agent is a warning: other agents keep working and the
/// missing setting is reported again when the agent is first used.
fn readiness_check(readiness: AgentReadiness) -> DoctorCheck {
    let name = format!("{}_readiness", readiness.agent);
    if readiness.configured {
        DoctorCheck { name, status: CheckStatus::Pass, details: "all settings present".to_string() }
    } else {
        DoctorCheck {
            name,
            status: CheckStatus::Warn,
            details: format!("missing {}", readiness.missing_settings.join(", ")),
        }
    }
}

fn check_delete_verification(config: &AppConfig) -> DoctorCheck {
    if config.delegation.verify_after_delete {
        DoctorCheck {
            name: "delete_verification".to_string(),
            status: CheckStatus::Pass,
            details: "deletions are read back before they are reported".to_string(),
        }
    } else {
        DoctorCheck {
            name: "delete_verification".to_string(),
            status: CheckStatus::Warn,
            details: "disabled, deletions are reported on the remote acknowledgement alone"
                .to_string(),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
