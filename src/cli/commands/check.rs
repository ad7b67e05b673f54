//! Check workflow.
//!
//! Validates every token and prints each account's login and follow count.

use super::Session;
use crate::cli::{CliResult, ExitCode};

/// Tally of a check run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Tokens that resolved to an account.
    pub valid: usize,
    /// Tokens the validation endpoint rejected.
    pub invalid: usize,
    /// Tokens that could not be checked at all.
    pub errors: usize,
}

/// Run the check workflow and print a report.
pub fn check(session: &Session) -> CliResult {
    if session.token_count() == 0 {
        println!("\x1b[33mNo tokens configured.\x1b[0m Add one OAuth token per line to the tokens file.");
        return Ok(ExitCode::SUCCESS);
    }

    let summary = run(session);

    println!();
    println!(
        "{} valid, {} invalid, {} error(s)",
        summary.valid, summary.invalid, summary.errors
    );
    if summary.errors > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Check every token, printing one line per account.
pub fn run(session: &Session) -> CheckSummary {
    let mut summary = CheckSummary::default();

    for (position, account) in session.accounts() {
        match account {
            Ok(account) => match account.login() {
                Some(login) => {
                    summary.valid += 1;
                    let count = account.followed_count();
                    println!(
                        "\x1b[32m✓\x1b[0m #{position} {login}: valid, following {count}/{}",
                        account.follow_limit()
                    );
                }
                None => {
                    summary.invalid += 1;
                    println!(
                        "\x1b[33m✗\x1b[0m #{position}: invalid token, following {}",
                        account.followed_count()
                    );
                }
            },
            Err(e) => {
                summary.errors += 1;
                println!("\x1b[31m✗\x1b[0m #{position}: {e}");
            }
        }
    }

    summary
}
