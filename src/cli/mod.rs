//! CLI argument handling and exit codes.
//!
//! The command line takes exactly one workflow as its first positional
//! argument (`follow <channel>` or `check`), matched case-insensitively.
//! Anything else is an argument error and exits with code 2 before any
//! network call is made.

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;
use regex::Regex;

use crate::account::AccountError;
use crate::api::TransportError;
use crate::config::ConfigError;

/// Twitch login names: letters, digits and underscores, at most 25 chars.
static CHANNEL_LOGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{1,25}$").expect("CHANNEL_LOGIN regex is valid")
});

const USAGE: &str = "Usage: followctl follow <channel>\n       followctl check";

/// Manage Twitch follows across several accounts.
///
/// Tokens are read from `.followctl/tokens.txt`, one per line.
///
/// Examples:
///   followctl check              # Validate every token and show follow counts
///   followctl follow somechannel # Follow a channel from every valid account
#[derive(Parser, Debug)]
#[command(name = "followctl")]
#[command(author, version = crate::VERSION, about, long_about = None)]
pub struct Cli {
    /// Workflow and its argument: `follow <channel>` or `check`.
    #[arg(value_name = "WORKFLOW")]
    pub args: Vec<String>,

    /// Path to the config file.
    #[arg(long, value_name = "PATH", env = "FOLLOWCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the tokens file (overrides `tokens_file` in the config).
    #[arg(long, value_name = "PATH")]
    pub tokens: Option<PathBuf>,

    /// Show debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse the positional arguments into a [`Workflow`].
    pub fn workflow(&self) -> Result<Workflow, CliError> {
        Workflow::from_args(&self.args)
    }
}

/// What the user asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    /// Follow a channel from every valid account.
    Follow {
        /// Channel login name.
        channel: String,
    },
    /// Validate every token and report follow counts.
    Check,
}

impl Workflow {
    /// Interpret positional arguments.
    pub fn from_args(args: &[String]) -> Result<Self, CliError> {
        let (name, rest) = match args {
            [] => return Err(CliError::Usage("no workflow given".into())),
            [name, rest @ ..] if rest.len() <= 1 => (name, rest.first()),
            _ => {
                return Err(CliError::Usage(format!(
                    "expected at most 2 arguments, got {}",
                    args.len()
                )))
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "follow" => {
                let channel = rest.map(|c| c.trim()).unwrap_or_default();
                if channel.is_empty() {
                    return Err(CliError::Usage("follow needs a channel name".into()));
                }
                if !CHANNEL_LOGIN.is_match(channel) {
                    return Err(CliError::Usage(format!(
                        "'{channel}' is not a valid channel name"
                    )));
                }
                Ok(Workflow::Follow {
                    channel: channel.to_ascii_lowercase(),
                })
            }
            "check" => match rest {
                None => Ok(Workflow::Check),
                Some(extra) => Err(CliError::Usage(format!(
                    "check takes no arguments, got '{extra}'"
                ))),
            },
            other => Err(CliError::Usage(format!("unknown workflow '{other}'"))),
        }
    }
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(u8);

impl ExitCode {
    /// Everything worked.
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// A workflow ran but something failed.
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Bad command line.
    pub const USAGE: ExitCode = ExitCode(2);

    /// The numeric status.
    pub fn code(self) -> u8 {
        self.0
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.0)
    }
}

/// Result type for workflow execution.
pub type CliResult = Result<ExitCode, CliError>;

/// Error type for workflow execution.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The command line could not be understood.
    #[error("{0}")]
    Usage(String),
    /// The config file could not be loaded.
    #[error("Failed to load config: {0}")]
    Config(#[from] ConfigError),
    /// The HTTP client could not be set up.
    #[error("{0}")]
    Transport(#[from] TransportError),
    /// An account operation failed outright.
    #[error("{0}")]
    Account(#[from] AccountError),
    /// No token in the tokens file resolved to a valid account.
    #[error("No valid account available")]
    NoValidAccount,
}

impl CliError {
    /// Exit status for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Usage(_) => ExitCode::USAGE,
            _ => ExitCode::FAILURE,
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workflow::Follow { channel } => write!(f, "follow {channel}"),
            Workflow::Check => write!(f, "check"),
        }
    }
}

/// Print any error and convert the outcome to a process exit code.
pub fn handle_result(result: CliResult) -> std::process::ExitCode {
    match result {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {e}");
            if matches!(e, CliError::Usage(_)) {
                eprintln!();
                eprintln!("{USAGE}");
            }
            e.exit_code().into()
        }
    }
}
