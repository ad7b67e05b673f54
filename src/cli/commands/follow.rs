//! Follow workflow.
//!
//! Resolves the channel login once, then follows it from every valid account
//! that is below its follow limit and not already following.

use log::info;

use super::Session;
use crate::account::{Account, AccountError};
use crate::cli::{CliError, CliResult, ExitCode};

/// What happened for one account.
#[derive(Debug)]
pub enum FollowOutcome {
    /// The follow was created.
    Followed,
    /// The account already follows the channel.
    AlreadyFollowing,
    /// The account is at its follow limit.
    AtLimit,
    /// The follow-status check or the follow itself failed.
    Failed(AccountError),
}

/// Tally of a follow run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowSummary {
    /// Follows created.
    pub followed: usize,
    /// Accounts skipped (at limit or already following).
    pub skipped: usize,
    /// Accounts where something failed.
    pub failed: usize,
    /// Tokens that were invalid or could not be resolved.
    pub unusable: usize,
}

/// Run the follow workflow for `channel`.
pub fn follow(session: &Session, channel: &str) -> CliResult {
    if session.token_count() == 0 {
        println!("\x1b[33mNo tokens configured.\x1b[0m Add one OAuth token per line to the tokens file.");
        return Ok(ExitCode::SUCCESS);
    }

    let summary = run(session, channel)?;

    println!();
    println!(
        "Followed {channel} from {} account(s): {} skipped, {} failed, {} unusable token(s)",
        summary.followed, summary.skipped, summary.failed, summary.unusable
    );
    if summary.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Follow `channel` from every usable account, printing one line per account.
///
/// Fails only when no account is valid or the channel cannot be resolved.
pub fn run(session: &Session, channel: &str) -> Result<FollowSummary, CliError> {
    let mut summary = FollowSummary::default();
    let mut accounts = Vec::new();

    for (position, account) in session.accounts() {
        match account {
            Ok(account) if account.is_valid() => accounts.push(account),
            Ok(_) => {
                summary.unusable += 1;
                println!("\x1b[33m✗\x1b[0m #{position}: invalid token, skipped");
            }
            Err(e) => {
                summary.unusable += 1;
                println!("\x1b[31m✗\x1b[0m #{position}: {e}");
            }
        }
    }

    let first = accounts.first().ok_or(CliError::NoValidAccount)?;
    let channel_id = first.lookup_user_id(channel)?;
    info!("Resolved channel {channel} to {channel_id}");

    for account in &accounts {
        let login = account.login().unwrap_or_default();
        match follow_one(account, &channel_id) {
            FollowOutcome::Followed => {
                summary.followed += 1;
                println!("\x1b[32m✓\x1b[0m {login}: now following {channel}");
            }
            FollowOutcome::AlreadyFollowing => {
                summary.skipped += 1;
                println!("\x1b[2m-\x1b[0m {login}: already following {channel}");
            }
            FollowOutcome::AtLimit => {
                summary.skipped += 1;
                println!(
                    "\x1b[33m-\x1b[0m {login}: at the follow limit ({})",
                    account.follow_limit()
                );
            }
            FollowOutcome::Failed(e) => {
                summary.failed += 1;
                println!("\x1b[31m✗\x1b[0m {login}: {e}");
            }
        }
    }

    Ok(summary)
}

/// Follow `channel_id` from one valid account.
pub fn follow_one(account: &Account, channel_id: &str) -> FollowOutcome {
    if !account.can_follow() {
        return FollowOutcome::AtLimit;
    }
    match account.is_following(channel_id) {
        Ok(true) => return FollowOutcome::AlreadyFollowing,
        Ok(false) => {}
        Err(e) => return FollowOutcome::Failed(e),
    }
    match account.follow(channel_id) {
        Ok(()) => FollowOutcome::Followed,
        Err(e) => FollowOutcome::Failed(e),
    }
}
