//! Turns delegation outcomes into conversational text.
//!
//! Formatting is pure: it reads the outcome and intent, never mutates them
//! and never calls an agent. A payload whose shape does not match its
//! intent's template is rendered as pretty JSON.

use std::fmt::Write as _;

use serde::de::DeserializeOwned;
use serde_json::Value;
use switchboard_core::agents::{
    DeploymentStatus, ExecutionReceipt, FileAnalysis, FileMetadata, SearchMatch, ServiceSummary,
    WorkflowDetails, WorkflowSummary,
};
use switchboard_core::{BulkDeleteReport, ConversationTurn, DelegationOutcome, Intent, IntentKind};

use crate::help;
use crate::registry::AgentReadiness;

const HELP_POINTER: &str = "Type \"help\" to see what I can do.";
const MAX_LISTED_RECORDS: usize = 10;

pub fn format_response(outcome: &DelegationOutcome, intent: &Intent) -> String {
    if !outcome.success {
        return format_failure(outcome, intent);
    }

    let Some(details) = outcome.details.as_ref() else {
        return format!("Done ({}).", intent.kind);
    };

    render(intent.kind, details).unwrap_or_else(|| dump(details))
}

fn format_failure(outcome: &DelegationOutcome, intent: &Intent) -> String {
    let message = outcome.error_message.as_deref().unwrap_or("an unknown error occurred");
    let mut text = format!("Sorry, I couldn't complete that request ({}): {message}", intent.kind);
    if let Some(hint) = outcome.error_hint.as_deref() {
        let _ = write!(text, "\n{hint}");
    }
    let _ = write!(text, "\n{HELP_POINTER}");
    text
}

fn render(kind: IntentKind, details: &Value) -> Option<String> {
    match kind {
        IntentKind::WorkflowDelete => render_single_delete(details),
        IntentKind::WorkflowDeleteMultiple => render_bulk_delete(details, "Nothing was deleted."),
        IntentKind::WorkflowDeleteAllInactive => {
            render_bulk_delete(details, "There are no inactive workflows to delete.")
        }
        IntentKind::WorkflowList => render_workflow_list(details),
        IntentKind::WorkflowExecute => render_execution(details),
        IntentKind::WorkflowDetails => render_workflow_details(details),
        IntentKind::WorkflowStatus => render_workflow_status(details),
        IntentKind::FileList => render_file_list(details),
        IntentKind::FileAnalyze => render_file_analysis(details),
        IntentKind::FileSearch => render_file_search(details),
        IntentKind::DeploymentDeploy => render_deploy(details),
        IntentKind::DeploymentStatus => render_deploy_status(details),
        IntentKind::DeploymentList => render_service_list(details),
        IntentKind::DatabaseListRecords => render_records(details),
        IntentKind::EmailSend => render_email(details),
        IntentKind::SecurityAudit => render_security_audit(details),
        IntentKind::Help => Some(render_help()),
        IntentKind::ConversationHistory => render_history(details),
        IntentKind::ConversationReset => {
            let cleared = details.get("cleared")?.as_u64()?;
            Some(format!("Conversation cleared ({cleared} turn(s) removed)."))
        }
        IntentKind::GenericConversation => render_generic(details),
    }
}

fn field<T: DeserializeOwned>(details: &Value, key: &str) -> Option<T> {
    serde_json::from_value(details.get(key)?.clone()).ok()
}

fn whole<T: DeserializeOwned>(details: &Value) -> Option<T> {
    serde_json::from_value(details.clone()).ok()
}

fn dump(details: &Value) -> String {
    serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string())
}

fn render_single_delete(details: &Value) -> Option<String> {
    let id: String = field(details, "workflowId")?;
    let already_removed: bool = field(details, "alreadyRemoved").unwrap_or(false);
    let verified: bool = field(details, "verified").unwrap_or(false);

    Some(if already_removed {
        format!("Workflow {id} was already removed, there is nothing left to delete.")
    } else if verified {
        format!("Workflow {id} has been deleted and no longer exists.")
    } else {
        format!("Workflow {id} has been deleted.")
    })
}

fn render_bulk_delete(details: &Value, nothing_to_do: &str) -> Option<String> {
    let report: BulkDeleteReport = whole(details)?;
    if report.deleted.is_empty() && report.failed.is_empty() {
        let mut text = nothing_to_do.to_string();
        if let Some(kept) = report.kept_count {
            let _ = write!(text, " {kept} active workflow(s) were kept.");
        }
        return Some(text);
    }

    let mut text = format!("Deleted {} workflow(s).", report.deleted_count);
    for item in &report.deleted {
        match &item.name {
            Some(name) => {
                let _ = write!(text, "\n- {name} ({})", item.id);
            }
            None => {
                let _ = write!(text, "\n- {}", item.id);
            }
        }
    }
    if !report.failed.is_empty() {
        let _ = write!(text, "\n{} deletion(s) failed:", report.failed.len());
        for item in &report.failed {
            let _ = write!(text, "\n- {}: {}", item.id, item.error);
        }
    }
    if let Some(kept) = report.kept_count {
        let _ = write!(text, "\n{kept} active workflow(s) were kept.");
    }
    Some(text)
}

fn render_workflow_list(details: &Value) -> Option<String> {
    let workflows: Vec<WorkflowSummary> = field(details, "workflows")?;
    if workflows.is_empty() {
        return Some("You don't have any workflows yet.".to_string());
    }

    let mut text = format!("You have {} workflow(s):", workflows.len());
    for workflow in &workflows {
        let state = if workflow.active { "active" } else { "inactive" };
        let _ = write!(text, "\n- {} (ID: `{}`) [{state}]", workflow.name, workflow.id);
    }
    Some(text)
}

fn render_execution(details: &Value) -> Option<String> {
    let receipt: ExecutionReceipt = whole(details)?;
    let mut text = format!(
        "Workflow {} was triggered, status: {}.",
        receipt.workflow_id, receipt.status
    );
    if let Some(execution_id) = receipt.execution_id {
        let _ = write!(text, " Execution id: {execution_id}.");
    }
    Some(text)
}

fn render_workflow_details(details: &Value) -> Option<String> {
    let workflow: WorkflowDetails = whole(details)?;
    let state = if workflow.active { "active" } else { "inactive" };
    let mut text = format!(
        "Workflow {} (ID: `{}`) is {state} and has {} node(s).",
        workflow.name, workflow.id, workflow.node_count
    );
    if !workflow.tags.is_empty() {
        let _ = write!(text, "\nTags: {}.", workflow.tags.join(", "));
    }
    if let Some(updated_at) = workflow.updated_at {
        let _ = write!(text, "\nLast updated: {updated_at}.");
    }
    Some(text)
}

fn render_workflow_status(details: &Value) -> Option<String> {
    let total: u64 = field(details, "total")?;
    let active: u64 = field(details, "active")?;
    let inactive: u64 = field(details, "inactive")?;
    if total == 0 {
        return Some("You don't have any workflows yet.".to_string());
    }
    Some(format!("You have {total} workflow(s): {active} active and {inactive} inactive."))
}

fn render_file_list(details: &Value) -> Option<String> {
    let files: Vec<FileMetadata> = field(details, "files")?;
    if files.is_empty() {
        return Some(
            "You haven't uploaded any files yet, so there are no files to show.".to_string(),
        );
    }

    let mut text = format!("You have {} file(s):", files.len());
    for file in &files {
        let _ = write!(
            text,
            "\n- {} ({}, {} bytes, uploaded {})",
            file.name,
            file.kind.as_str(),
            file.size_bytes,
            file.uploaded_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Some(text)
}

fn render_file_analysis(details: &Value) -> Option<String> {
    let analysis: FileAnalysis = whole(details)?;
    if analysis.files.is_empty() && analysis.missing.is_empty() {
        return Some(
            "You haven't uploaded any files yet, so there are no files to analyze.".to_string(),
        );
    }
    if analysis.files.is_empty() {
        return Some(format!(
            "None of the requested files were found: {}.",
            analysis.missing.join(", ")
        ));
    }

    let mut text = format!("Analyzed {} file(s):", analysis.files.len());
    for file in &analysis.files {
        let _ = write!(
            text,
            "\n- {} ({}): {} lines, {} words, {} bytes",
            file.name,
            file.kind.as_str(),
            file.lines,
            file.words,
            file.size_bytes
        );
    }
    if !analysis.insights.is_empty() {
        text.push_str("\nInsights:");
        for insight in &analysis.insights {
            let _ = write!(text, "\n- {insight}");
        }
    }
    if !analysis.missing.is_empty() {
        let _ = write!(text, "\nNot found: {}.", analysis.missing.join(", "));
    }
    Some(text)
}

fn render_file_search(details: &Value) -> Option<String> {
    let query: String = field(details, "query")?;
    let matches: Vec<SearchMatch> = field(details, "matches")?;
    if matches.is_empty() {
        return Some(format!("No matches for \"{query}\" in your files."));
    }

    let mut text = format!("Found {} match(es) for \"{query}\":", matches.len());
    for found in &matches {
        let _ = write!(text, "\n- {} line {}: {}", found.file, found.line_number, found.line);
    }
    Some(text)
}

fn render_deploy(details: &Value) -> Option<String> {
    let status: DeploymentStatus = whole(details)?;
    let mut text = format!(
        "Deployment of service {} started, status: {}.",
        status.service_id, status.status
    );
    if let Some(deploy_id) = status.deploy_id {
        let _ = write!(text, " Deploy id: {deploy_id}.");
    }
    Some(text)
}

fn render_deploy_status(details: &Value) -> Option<String> {
    let status: DeploymentStatus = whole(details)?;
    Some(match status.deploy_id {
        Some(deploy_id) if status.status != "never_deployed" => format!(
            "Service {}: latest deploy {deploy_id} is {}.",
            status.service_id, status.status
        ),
        _ => format!("Service {} has never been deployed.", status.service_id),
    })
}

fn render_service_list(details: &Value) -> Option<String> {
    let services: Vec<ServiceSummary> = field(details, "services")?;
    if services.is_empty() {
        return Some("No services were found on the deployment platform.".to_string());
    }

    let mut text = format!("You have {} service(s):", services.len());
    for service in &services {
        let _ = write!(text, "\n- {} ({})", service.name, service.id);
        if let Some(kind) = &service.kind {
            let _ = write!(text, " [{kind}]");
        }
        if let Some(url) = &service.url {
            let _ = write!(text, " {url}");
        }
        if service.suspended {
            text.push_str(" (suspended)");
        }
    }
    Some(text)
}

fn render_records(details: &Value) -> Option<String> {
    let table: String = field(details, "tableId")?;
    let records: Vec<Value> = field(details, "records")?;
    if records.is_empty() {
        return Some(format!("Table {table} has no records."));
    }

    let mut text = format!("Found {} record(s) in table {table}:", records.len());
    for record in records.iter().take(MAX_LISTED_RECORDS) {
        let id = record.get("id").and_then(Value::as_str).unwrap_or("?");
        let fields = record.get("fields").unwrap_or(record);
        let _ = write!(text, "\n- {id}: {fields}");
    }
    if records.len() > MAX_LISTED_RECORDS {
        let _ = write!(text, "\n({} more not shown)", records.len() - MAX_LISTED_RECORDS);
    }
    Some(text)
}

fn render_email(details: &Value) -> Option<String> {
    let to: String = field(details, "to")?;
    let subject: String = field(details, "subject")?;
    let receipt = details.get("receipt")?;
    let simulated = receipt.get("simulated").and_then(Value::as_bool).unwrap_or(false);
    let message_id = receipt.get("messageId").and_then(Value::as_str);

    let mut text = if simulated {
        format!("Email \"{subject}\" to {to} was simulated, nothing was actually sent.")
    } else {
        format!("Email \"{subject}\" was sent to {to}.")
    };
    if let Some(message_id) = message_id {
        let _ = write!(text, " Message id: {message_id}.");
    }
    Some(text)
}

fn render_security_audit(details: &Value) -> Option<String> {
    let agents: Vec<AgentReadiness> = field(details, "agents")?;
    let configured = agents.iter().filter(|agent| agent.configured).count();

    let mut text =
        format!("Security audit: {configured} of {} agent(s) are configured.", agents.len());
    for agent in &agents {
        if agent.configured {
            let _ = write!(text, "\n- {}: ok", agent.agent);
        } else {
            let missing = agent.missing_settings.join(", ");
            let _ = write!(text, "\n- {}: missing {missing}", agent.agent);
        }
    }
    if let Some(verify) = details.get("verifyAfterDelete").and_then(Value::as_bool) {
        let state = if verify { "on" } else { "off" };
        let _ = write!(text, "\nDelete verification is {state}.");
    }
    if details.get("completionEnabled").and_then(Value::as_bool) == Some(false) {
        text.push_str("\nNo completion backend is configured, free-form chat uses local replies.");
    }
    Some(text)
}

fn render_help() -> String {
    let mut text = "Here is what I can do:".to_string();
    for (domain, phrases) in help::EXAMPLES {
        let _ = write!(text, "\n\n{domain}:");
        for phrase in *phrases {
            let _ = write!(text, "\n- {phrase}");
        }
    }
    text
}

fn render_history(details: &Value) -> Option<String> {
    let turns: Vec<ConversationTurn> = field(details, "turns")?;
    if turns.is_empty() {
        return Some("This conversation has no history yet.".to_string());
    }

    let mut text = format!("Last {} turn(s):", turns.len());
    for turn in &turns {
        let _ = write!(
            text,
            "\n[{}] {}: {}",
            turn.timestamp.format("%H:%M:%S"),
            turn.role.as_str(),
            turn.content
        );
    }
    Some(text)
}

fn render_generic(details: &Value) -> Option<String> {
    match details.get("reply")? {
        Value::String(reply) => Some(reply.clone()),
        Value::Null => Some(format!("I'm not sure how to help with that. {HELP_POINTER}")),
        _ => None,
    }
}
