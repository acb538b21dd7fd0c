pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use switchboard_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use crate::commands::ask::AskRequest;

#[derive(Debug, Parser)]
#[command(
    name = "switchboard",
    about = "Switchboard conversational agent CLI",
    long_about = "Route natural-language requests to workflow, deployment, database, email and file agents.",
    after_help = "Examples:\n  switchboard ask \"list my workflows\"\n  switchboard ask --file sales.csv \"analyze sales.csv\"\n  switchboard chat\n  switchboard doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a switchboard.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Handle one request and print the reply")]
    Ask {
        #[arg(required = true, help = "The request, in English or French")]
        text: Vec<String>,
        #[arg(long, help = "Conversation id used for memory")]
        conversation: Option<String>,
        #[arg(long, help = "User id that owns uploaded files")]
        user: Option<String>,
        #[arg(long = "file", help = "Upload a local file before handling the request")]
        files: Vec<PathBuf>,
        #[arg(long, help = "Emit the intent, outcome and reply as JSON")]
        json: bool,
    },
    #[command(about = "Start an interactive session that reads one request per line")]
    Chat {
        #[arg(long, help = "Conversation id used for memory")]
        conversation: Option<String>,
        #[arg(long, help = "User id that owns uploaded files")]
        user: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and report which agents are ready to use")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides {
            log_level: cli.log_level.clone(),
            ..ConfigOverrides::default()
        },
    };

    if let Ok(config) = AppConfig::load(options.clone()) {
        logging::init_logging(&config);
    }

    let result = match cli.command {
        Command::Ask { text, conversation, user, files, json } => {
            let request = AskRequest { text: text.join(" "), conversation, user, files, json };
            commands::ask::run(options, request)
        }
        Command::Chat { conversation, user } => commands::chat::run(options, conversation, user),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
