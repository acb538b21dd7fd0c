use std::path::PathBuf;

use switchboard_agent::delegator::ANONYMOUS_OWNER;
use switchboard_agent::RequestContext;
use switchboard_core::config::LoadOptions;
use switchboard_core::ConversationId;

use crate::bootstrap::{bootstrap, upload_files};
use crate::commands::{command_runtime, CommandResult};

pub const DEFAULT_CONVERSATION: &str = "cli";

#[derive(Clone, Debug, Default)]
pub struct AskRequest {
    pub text: String,
    pub conversation: Option<String>,
    pub user: Option<String>,
    pub files: Vec<PathBuf>,
    pub json: bool,
}

/// Runs one utterance through the full pipeline. Exit code 1 means the
/// request was understood but delegation failed.
pub fn run(options: LoadOptions, request: AskRequest) -> CommandResult {
    let app = match bootstrap(options) {
        Ok(app) => app,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), 2)
        }
    };

    let owner = request.user.as_deref().unwrap_or(ANONYMOUS_OWNER);
    let recent_files = match upload_files(&app.files, owner, &request.files) {
        Ok(names) => names,
        Err(error) => return CommandResult::failure("ask", "file_upload", format!("{error:#}"), 3),
    };

    let runtime = match command_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            )
        }
    };

    let conversation =
        ConversationId(request.conversation.unwrap_or_else(|| DEFAULT_CONVERSATION.to_string()));
    let context = RequestContext { user: request.user, recent_files };
    let response =
        runtime.block_on(app.runtime.handle_message(&conversation, &request.text, &context));

    let exit_code = if response.outcome.success { 0 } else { 1 };
    let output = if request.json {
        serde_json::to_string_pretty(&response).unwrap_or_else(|error| {
            CommandResult::failure("ask", "serialization", error.to_string(), 5).output
        })
    } else {
        response.text
    };

    CommandResult { exit_code, output }
}
