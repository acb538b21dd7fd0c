use std::io::{self, BufRead, Write};

use anyhow::Result;
use switchboard_agent::{AgentRuntime, RequestContext};
use switchboard_core::config::LoadOptions;
use switchboard_core::ConversationId;
use tokio::runtime::Runtime;

use crate::bootstrap::bootstrap;
use crate::commands::{command_runtime, CommandResult};

const PROMPT: &str = "> ";
const EXIT_WORDS: [&str; 3] = ["exit", "quit", ":q"];

pub fn run(
    options: LoadOptions,
    conversation: Option<String>,
    user: Option<String>,
) -> CommandResult {
    let app = match bootstrap(options) {
        Ok(app) => app,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2)
        }
    };
    let runtime = match command_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            )
        }
    };

    let conversation =
        ConversationId(conversation.unwrap_or_else(|| format!("chat-{}", std::process::id())));
    let context = RequestContext { user, recent_files: Vec::new() };
    let stdin = io::stdin();
    let stdout = io::stdout();

    match chat_loop(&runtime, &app.runtime, &conversation, &context, stdin.lock(), stdout.lock()) {
        Ok(handled) => CommandResult::success(
            "chat",
            format!("conversation `{conversation}` ended after {handled} message(s)"),
        ),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 3),
    }
}

/// Reads one utterance per line until EOF or an exit word. Blank lines are
/// skipped. Returns how many utterances were handled.
pub fn chat_loop(
    executor: &Runtime,
    agent: &AgentRuntime,
    conversation: &ConversationId,
    context: &RequestContext,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<usize> {
    let mut handled = 0;
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let utterance = line.trim();
        if EXIT_WORDS.iter().any(|word| utterance.eq_ignore_ascii_case(word)) {
            break;
        }
        if !utterance.is_empty() {
            let response =
                executor.block_on(agent.handle_message(conversation, utterance, context));
            writeln!(output, "{}", response.text)?;
            handled += 1;
        }
        write!(output, "{PROMPT}")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(handled)
}
