//! Bulk unfollow ("drain") loop.
//!
//! The drainer walks the follows listing and unfollows one record at a time.
//! It never seeks: unfollowed channels drop out of the listing, so a freshly
//! fetched page always starts with records that have not been processed yet.
//! The cursor therefore only ever resets to zero.
//!
//! The refresh fires when the cursor reaches the *last* index of the held
//! page, one record before the page is actually used up. The last record of
//! each page is never unfollowed from that page; it is picked up again as
//! the head of the next fetch. This changes the call order (and adds one
//! extra page fetch per page) but not which channels end up unfollowed.
//!
//! The loop stops for good on the first failure. There is no retry and no
//! skipping.

use std::io::{self, Write};
use std::sync::TryLockError;

use log::{debug, info, warn};

use super::{Account, AccountError, RelationshipPage};

/// How many follows to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainTarget {
    /// Everything the first page's `total` reports.
    All,
    /// At most this many (capped at the reported `total`).
    Count(u64),
}

impl DrainTarget {
    fn resolve(self, total: u64) -> u64 {
        match self {
            DrainTarget::All => total,
            DrainTarget::Count(n) => n.min(total),
        }
    }
}

/// Lifecycle of a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// Not started.
    Idle,
    /// Fetching a page.
    Paging,
    /// Unfollowing a record.
    Mutating,
    /// Stopped on a failure. Terminal.
    Failed,
    /// Target reached or listing exhausted. Terminal.
    Done,
}

impl DrainState {
    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DrainState::Failed | DrainState::Done)
    }
}

/// Position of the drain within the held page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainCursor {
    /// Index into the held page's records.
    pub index: usize,
    /// Follows removed so far.
    pub processed: u64,
}

impl DrainCursor {
    /// Whether the held page must be replaced before reading at `index`.
    ///
    /// True at the last index of the page (the early refresh) and whenever
    /// the index has run past it.
    pub fn needs_refresh(&self, page_len: usize) -> bool {
        self.index + 1 >= page_len
    }

    fn reset(&mut self) {
        self.index = 0;
    }

    fn advance(&mut self) {
        self.index += 1;
        self.processed += 1;
    }
}

/// Why a drain stopped early.
#[derive(Debug, Clone)]
pub struct DrainFailure {
    /// Channel being unfollowed, or `None` if a page re-fetch failed.
    pub target: Option<String>,
    /// The error that stopped the drain.
    pub error: AccountError,
}

/// Summary of a finished drain.
#[derive(Debug, Clone)]
pub struct DrainReport {
    /// Final state: [`DrainState::Done`] or [`DrainState::Failed`].
    pub state: DrainState,
    /// Follows the drain set out to remove.
    pub target: u64,
    /// Follows actually removed.
    pub processed: u64,
    /// Channel IDs unfollowed, in order.
    pub removed: Vec<String>,
    /// Pages fetched, including the first.
    pub page_fetches: u32,
    /// The listing ran dry before `target` was reached.
    pub exhausted: bool,
    /// What stopped the drain, if it failed.
    pub failure: Option<DrainFailure>,
}

impl DrainReport {
    fn new() -> Self {
        Self {
            state: DrainState::Idle,
            target: 0,
            processed: 0,
            removed: Vec::new(),
            page_fetches: 0,
            exhausted: false,
            failure: None,
        }
    }

    /// Whether every targeted follow was removed.
    pub fn is_complete(&self) -> bool {
        self.state == DrainState::Done && self.processed == self.target
    }
}

/// Receives drain progress.
pub trait DrainObserver {
    /// Called after each successful unfollow.
    fn on_progress(&mut self, processed: u64, target: u64);

    /// Called exactly once when the drain stops on a failure.
    fn on_failure(&mut self, failure: &DrainFailure);

    /// Called on every state transition.
    fn on_state(&mut self, _state: DrainState) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl DrainObserver for SilentObserver {
    fn on_progress(&mut self, _processed: u64, _target: u64) {}

    fn on_failure(&mut self, _failure: &DrainFailure) {}
}

/// Observer that writes a `processed/target` line per unfollow and a notice
/// on failure.
///
/// This is how a caller of [`Account::drain_all`] or [`Account::drain`] gets
/// console progress; [`ConsoleObserver::stdout`] prints to the terminal.
#[derive(Debug)]
pub struct ConsoleObserver<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleObserver {
    /// Write to stdout.
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: Write> ConsoleObserver<W> {
    /// Write to `out`.
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    /// Consume the observer and return its writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DrainObserver for ConsoleObserver<W> {
    fn on_progress(&mut self, processed: u64, target: u64) {
        if let Err(e) = writeln!(self.out, "{processed}/{target}") {
            debug!("Could not write drain progress: {e}");
        }
    }

    fn on_failure(&mut self, failure: &DrainFailure) {
        let written = match &failure.target {
            Some(target) => writeln!(
                self.out,
                "\x1b[31m✗\x1b[0m Stopped at {target}: {}",
                failure.error
            ),
            None => writeln!(
                self.out,
                "\x1b[31m✗\x1b[0m Failed to refresh follows: {}",
                failure.error
            ),
        };
        if let Err(e) = written {
            debug!("Could not write drain failure: {e}");
        }
    }
}

/// Mutable state threaded through one drain.
struct DrainRun<'a> {
    report: DrainReport,
    observer: &'a mut dyn DrainObserver,
}

impl DrainRun<'_> {
    fn transition(&mut self, state: DrainState) {
        if self.report.state != state {
            self.report.state = state;
            self.observer.on_state(state);
        }
    }

    fn fail(mut self, target: Option<String>, error: AccountError) -> DrainReport {
        warn!("Drain stopped after {} unfollow(s): {error}", self.report.processed);
        let failure = DrainFailure { target, error };
        self.observer.on_failure(&failure);
        self.report.failure = Some(failure);
        self.transition(DrainState::Failed);
        self.report
    }

    fn finish(mut self) -> DrainReport {
        self.transition(DrainState::Done);
        self.report
    }
}

impl Account {
    /// Unfollow everything.
    pub fn drain_all(
        &self,
        observer: &mut dyn DrainObserver,
    ) -> Result<DrainReport, AccountError> {
        self.drain_with(DrainTarget::All, observer)
    }

    /// Unfollow up to `count` channels.
    pub fn drain(
        &self,
        count: u64,
        observer: &mut dyn DrainObserver,
    ) -> Result<DrainReport, AccountError> {
        self.drain_with(DrainTarget::Count(count), observer)
    }

    /// Run a drain.
    ///
    /// Returns `Err` only if the drain could not start: invalid account,
    /// another drain in progress, or a failed first page fetch. Failures
    /// once the loop is running end the drain and are reported in
    /// [`DrainReport::failure`].
    pub fn drain_with(
        &self,
        target: DrainTarget,
        observer: &mut dyn DrainObserver,
    ) -> Result<DrainReport, AccountError> {
        self.require_identity()?;
        let _guard = match self.drain_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(AccountError::DrainInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let mut run = DrainRun {
            report: DrainReport::new(),
            observer,
        };

        run.transition(DrainState::Paging);
        let mut page = self.fetch_page()?;
        run.report.page_fetches += 1;

        let total = page.total;
        run.report.target = target.resolve(total);
        info!(
            "Draining {} of {total} follow(s) for {}",
            run.report.target,
            self.login().unwrap_or_default()
        );
        if run.report.target == 0 {
            return Ok(run.finish());
        }

        let mut cursor = DrainCursor::default();
        while cursor.processed < run.report.target {
            if cursor.needs_refresh(page.len()) {
                run.transition(DrainState::Paging);
                page = match self.refresh(&mut run) {
                    Ok(page) => page,
                    Err(error) => return Ok(run.fail(None, error)),
                };
                cursor.reset();
            }

            let Some(target_id) = page.target_at(cursor.index).map(str::to_string) else {
                debug!("Follows listing is empty after {} unfollow(s)", cursor.processed);
                run.report.exhausted = true;
                break;
            };

            run.transition(DrainState::Mutating);
            if let Err(error) = self.unfollow(&target_id) {
                return Ok(run.fail(Some(target_id), error));
            }

            cursor.advance();
            run.report.processed = cursor.processed;
            run.report.removed.push(target_id);
            run.observer.on_progress(cursor.processed, run.report.target);
        }

        Ok(run.finish())
    }

    fn refresh(&self, run: &mut DrainRun<'_>) -> Result<RelationshipPage, AccountError> {
        let page = self.fetch_page()?;
        run.report.page_fetches += 1;
        debug!("Refreshed follows page: {} record(s)", page.len());
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::fixtures::*;
    use crate::api::{ApiResponse, Method, MockTransport, TransportError};
    use std::sync::Arc;

    /// Records every callback for assertions.
    #[derive(Default)]
    struct Recorder {
        progress: Vec<(u64, u64)>,
        failures: Vec<DrainFailure>,
        states: Vec<DrainState>,
    }

    impl DrainObserver for Recorder {
        fn on_progress(&mut self, processed: u64, target: u64) {
            self.progress.push((processed, target));
        }

        fn on_failure(&mut self, failure: &DrainFailure) {
            self.failures.push(failure.clone());
        }

        fn on_state(&mut self, state: DrainState) {
            self.states.push(state);
        }
    }

    /// Channel IDs submitted to the unfollow endpoint, in order.
    fn unfollowed_ids(mock: &MockTransport) -> Vec<String> {
        mock.requests_with(Method::Delete)
            .iter()
            .map(|r| r.url.rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    fn follows_fetches(mock: &MockTransport) -> usize {
        mock.requests()
            .iter()
            .filter(|r| r.url.contains(FOLLOWS))
            .count()
    }

    #[test]
    fn test_cursor_needs_refresh_at_last_index() {
        let cursor = DrainCursor {
            index: 2,
            processed: 0,
        };
        assert!(cursor.needs_refresh(3));
        assert!(!cursor.needs_refresh(4));
        assert!(DrainCursor::default().needs_refresh(1));
        assert!(DrainCursor::default().needs_refresh(0));
        assert!(!DrainCursor::default().needs_refresh(2));
    }

    #[test]
    fn test_drain_all_refetches_before_last_record() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(5, &["a", "b", "c"]))
            .respond(Method::Get, FOLLOWS, page(3, &["c", "d", "e"]))
            .respond(Method::Get, FOLLOWS, page(1, &["e"]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);
        let mut recorder = Recorder::default();

        let report = account.drain_all(&mut recorder).unwrap();

        assert_eq!(unfollowed_ids(&mock), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(follows_fetches(&mock), 3);
        assert_eq!(report.page_fetches, 3);
        assert_eq!(report.state, DrainState::Done);
        assert_eq!(report.target, 5);
        assert_eq!(report.processed, 5);
        assert_eq!(report.removed, vec!["a", "b", "c", "d", "e"]);
        assert!(report.is_complete());
        assert!(!report.exhausted);
        assert!(report.failure.is_none());
        assert_eq!(
            recorder.progress,
            vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]
        );
        assert!(recorder.failures.is_empty());
    }

    #[test]
    fn test_refetch_happens_between_second_and_third_removal() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(5, &["a", "b", "c"]))
            .respond(Method::Get, FOLLOWS, page(3, &["c", "d", "e"]))
            .respond(Method::Get, FOLLOWS, page(1, &["e"]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);

        account.drain_all(&mut SilentObserver).unwrap();

        let sequence: Vec<String> = mock
            .requests()
            .iter()
            .skip(1)
            .map(|r| match r.method {
                Method::Delete => format!("-{}", r.url.rsplit('/').next().unwrap()),
                _ => "page".to_string(),
            })
            .collect();
        assert_eq!(
            sequence,
            vec!["page", "-a", "-b", "page", "-c", "-d", "page", "-e"]
        );
    }

    #[test]
    fn test_drain_zero_follows_makes_no_mutations() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(0, &[]));
        let account = valid_account(&mock);

        let report = account.drain_all(&mut SilentObserver).unwrap();

        assert_eq!(report.state, DrainState::Done);
        assert_eq!(report.target, 0);
        assert_eq!(report.processed, 0);
        assert!(mock.requests_with(Method::Delete).is_empty());
    }

    #[test]
    fn test_drain_n_zero_follows_makes_no_mutations() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(0, &[]));
        let account = valid_account(&mock);

        let report = account.drain(10, &mut SilentObserver).unwrap();

        assert_eq!(report.processed, 0);
        assert!(mock.requests_with(Method::Delete).is_empty());
    }

    #[test]
    fn test_drain_n_removes_exactly_n() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(10, &["1", "2", "3", "4", "5", "6"]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);
        let mut recorder = Recorder::default();

        let report = account.drain(3, &mut recorder).unwrap();

        assert_eq!(unfollowed_ids(&mock), vec!["1", "2", "3"]);
        assert_eq!(report.target, 3);
        assert!(report.is_complete());
        assert_eq!(report.page_fetches, 1);
        assert_eq!(recorder.progress.last(), Some(&(3, 3)));
    }

    #[test]
    fn test_drain_n_is_capped_at_total() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(2, &["1", "2"]))
            .respond(Method::Get, FOLLOWS, page(1, &["2"]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);

        let report = account.drain(50, &mut SilentObserver).unwrap();

        assert_eq!(report.target, 2);
        assert_eq!(unfollowed_ids(&mock), vec!["1", "2"]);
        assert!(report.is_complete());
    }

    #[test]
    fn test_drain_stops_on_third_removal_failure() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(8, &["a", "b", "c", "d", "e"]))
            .respond(Method::Delete, KRAKEN, unfollowed())
            .respond(Method::Delete, KRAKEN, unfollowed())
            .respond(
                Method::Delete,
                KRAKEN,
                ApiResponse::new(
                    422,
                    r#"{"error":"Unprocessable Entity","status":422,"message":"cannot unfollow"}"#,
                ),
            )
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);
        let mut recorder = Recorder::default();

        let report = account.drain_all(&mut recorder).unwrap();

        assert_eq!(mock.requests_with(Method::Delete).len(), 3);
        assert_eq!(report.state, DrainState::Failed);
        assert_eq!(report.processed, 2);
        assert_eq!(report.removed, vec!["a", "b"]);
        assert!(!report.is_complete());
        assert_eq!(recorder.failures.len(), 1);
        assert_eq!(recorder.failures[0].target.as_deref(), Some("c"));
        assert!(matches!(
            recorder.failures[0].error,
            AccountError::MutationRejected { .. }
        ));
        assert_eq!(recorder.progress, vec![(1, 8), (2, 8)]);
    }

    #[test]
    fn test_drain_n_failure_stops_regardless_of_target() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(100, &["a", "b", "c", "d"]))
            .respond(Method::Delete, KRAKEN, unfollowed())
            .respond(Method::Delete, KRAKEN, ApiResponse::new(500, "error"));
        let account = valid_account(&mock);

        let report = account.drain(50, &mut SilentObserver).unwrap();

        assert_eq!(mock.requests_with(Method::Delete).len(), 2);
        assert_eq!(report.processed, 1);
        assert_eq!(report.state, DrainState::Failed);
    }

    #[test]
    fn test_drain_transport_failure_on_unfollow_stops() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(3, &["a", "b", "c"]))
            .fail(
                Method::Delete,
                KRAKEN,
                TransportError::Client("connection reset".into()),
            );
        let account = valid_account(&mock);
        let mut recorder = Recorder::default();

        let report = account.drain_all(&mut recorder).unwrap();

        assert_eq!(report.processed, 0);
        assert_eq!(recorder.failures.len(), 1);
        assert!(matches!(
            recorder.failures[0].error,
            AccountError::Transport(_)
        ));
    }

    #[test]
    fn test_drain_refresh_failure_stops() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(4, &["a", "b"]))
            .respond(Method::Get, FOLLOWS, ApiResponse::new(200, "not json"))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);
        let mut recorder = Recorder::default();

        let report = account.drain_all(&mut recorder).unwrap();

        assert_eq!(unfollowed_ids(&mock), vec!["a"]);
        assert_eq!(report.state, DrainState::Failed);
        let failure = report.failure.unwrap();
        assert!(failure.target.is_none());
        assert!(matches!(failure.error, AccountError::Parse { .. }));
        assert_eq!(recorder.failures.len(), 1);
    }

    #[test]
    fn test_drain_ends_when_listing_runs_dry() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(6, &["a", "b"]))
            .respond(Method::Get, FOLLOWS, page(0, &[]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);

        let report = account.drain_all(&mut SilentObserver).unwrap();

        assert_eq!(unfollowed_ids(&mock), vec!["a"]);
        assert_eq!(report.state, DrainState::Done);
        assert!(report.exhausted);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_drain_single_record_pages() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(3, &["a"]))
            .respond(Method::Get, FOLLOWS, page(3, &["a"]))
            .respond(Method::Get, FOLLOWS, page(2, &["b"]))
            .respond(Method::Get, FOLLOWS, page(1, &["c"]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);

        let report = account.drain_all(&mut SilentObserver).unwrap();

        assert_eq!(unfollowed_ids(&mock), vec!["a", "b", "c"]);
        assert_eq!(report.page_fetches, 4);
        assert!(report.is_complete());
    }

    #[test]
    fn test_drain_state_transitions() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(2, &["a", "b", "c"]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let account = valid_account(&mock);
        let mut recorder = Recorder::default();

        account.drain_all(&mut recorder).unwrap();

        assert_eq!(
            recorder.states,
            vec![DrainState::Paging, DrainState::Mutating, DrainState::Done]
        );
    }

    #[test]
    fn test_drain_failed_state_is_terminal() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(2, &["a", "b", "c"]))
            .respond(Method::Delete, KRAKEN, ApiResponse::new(500, "nope"));
        let account = valid_account(&mock);
        let mut recorder = Recorder::default();

        let report = account.drain_all(&mut recorder).unwrap();

        assert_eq!(recorder.states.last(), Some(&DrainState::Failed));
        assert!(report.state.is_terminal());
        assert!(!DrainState::Paging.is_terminal());
    }

    #[test]
    fn test_drain_invalid_account_makes_no_calls() {
        let mock = Arc::new(MockTransport::new());
        let account = invalid_account(&mock);
        let before = mock.request_count();

        assert!(matches!(
            account.drain_all(&mut SilentObserver),
            Err(AccountError::InvalidIdentity)
        ));
        assert!(matches!(
            account.drain(5, &mut SilentObserver),
            Err(AccountError::InvalidIdentity)
        ));
        assert_eq!(mock.request_count(), before);
    }

    #[test]
    fn test_drain_first_page_failure_is_error() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, ApiResponse::new(200, r#"{"data":[]}"#));
        let account = valid_account(&mock);

        assert!(matches!(
            account.drain_all(&mut SilentObserver),
            Err(AccountError::Parse { .. })
        ));
        assert!(mock.requests_with(Method::Delete).is_empty());
    }

    #[test]
    fn test_concurrent_drain_is_refused() {
        let mock = mock_with_valid_token();
        let account = valid_account(&mock);

        let _held = account.drain_lock.lock().unwrap();
        assert!(matches!(
            account.drain_all(&mut SilentObserver),
            Err(AccountError::DrainInProgress)
        ));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_drain_lock_released_after_drain() {
        let mock = mock_with_valid_token();
        mock.respond_always(Method::Get, FOLLOWS, page(0, &[]));
        let account = valid_account(&mock);

        account.drain_all(&mut SilentObserver).unwrap();
        account.drain_all(&mut SilentObserver).unwrap();
    }

    #[test]
    fn test_console_observer_prints_progress_lines() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(2, &["a", "b", "c"]))
            .respond_always(Method::Delete, KRAKEN, unfollowed());
        let mut observer = ConsoleObserver::with_writer(Vec::new());

        let report = valid_account(&mock).drain_all(&mut observer).unwrap();

        assert!(report.is_complete());
        let output = String::from_utf8(observer.into_inner()).unwrap();
        assert_eq!(output, "1/2\n2/2\n");
    }

    #[test]
    fn test_console_observer_prints_failure_notice() {
        let mock = mock_with_valid_token();
        mock.respond(Method::Get, FOLLOWS, page(3, &["a", "b", "c"]))
            .respond(Method::Delete, KRAKEN, unfollowed())
            .respond(Method::Delete, KRAKEN, ApiResponse::new(500, "nope"));
        let mut observer = ConsoleObserver::with_writer(Vec::new());

        valid_account(&mock).drain_all(&mut observer).unwrap();

        let output = String::from_utf8(observer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "1/3");
        assert!(lines[1].contains("Stopped at b: Failed to unfollow b: nope"));
    }

    #[test]
    fn test_drain_target_resolve() {
        assert_eq!(DrainTarget::All.resolve(7), 7);
        assert_eq!(DrainTarget::Count(3).resolve(7), 3);
        assert_eq!(DrainTarget::Count(30).resolve(7), 7);
    }
}
