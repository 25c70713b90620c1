//! The batch orchestrator: fetch, prompt, suggest, review, commit.
//!
//! Strictly sequential. Transaction n+1 is never touched until transaction
//! n's review has resolved and its commit (if any) has been attempted.
//! Cancellation is cooperative: the shared token is inspected at the top of
//! the loop, inside the backend call (both sides of the request), and before
//! each commit. A single failing item never aborts the batch; only
//! cancellation or exhaustion ends it.

use std::sync::mpsc::Sender;

use anyhow::Result;
use chrono::NaiveDate;

use tally_core::{
    ApprovalRequest, CancelToken, Category, Decision, Error, RunEvent, RunState, Suggestion,
    Transaction, build_system_prompt, build_transaction_prompt, match_category,
    validate_suggestions,
};

#[allow(async_fn_in_trait)]
pub trait LedgerApi {
    async fn active_categories(&self) -> Result<Vec<Category>, Error>;
    async fn uncategorized_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, Error>;
    async fn set_category(&self, transaction_id: i64, category_id: i64) -> Result<(), Error>;
}

#[allow(async_fn_in_trait)]
pub trait SuggestionSource {
    async fn suggest(&self, system: &str, prompt: &str) -> Result<Vec<Suggestion>, Error>;
}

#[allow(async_fn_in_trait)]
pub trait ReviewGate {
    /// Present one transaction and resolve exactly one decision. An error
    /// here is a broken terminal, not a pipeline condition, so it is fatal.
    async fn review(&mut self, request: ApprovalRequest) -> Result<Decision>;
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Client-side cap applied after the fetch, on top of the server's
    /// page-size bound.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub state: RunState,
    pub committed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

/// Drive one full run. The category snapshot is taken once up front and
/// never refetched; transactions are processed in ledger order.
pub async fn run_session<L, S, G>(
    ledger: &L,
    source: &S,
    gate: &mut G,
    cancel: &CancelToken,
    events: &Sender<RunEvent>,
    opts: &SessionOptions,
) -> Result<RunSummary>
where
    L: LedgerApi,
    S: SuggestionSource,
    G: ReviewGate,
{
    let mut state = RunState::Running;

    let categories = ledger.active_categories().await?;
    let _ = events.send(RunEvent::info(format!(
        "{} active categories",
        categories.len()
    )));

    let mut transactions = ledger
        .uncategorized_transactions(opts.start, opts.end)
        .await?;
    if let Some(limit) = opts.limit {
        transactions.truncate(limit);
    }
    let total = transactions.len();
    let _ = events.send(RunEvent::info(format!(
        "{} uncategorized transactions between {} and {}",
        total, opts.start, opts.end
    )));

    if total == 0 {
        let _ = events.send(RunEvent::ok("nothing to review"));
        return Ok(RunSummary {
            state: RunState::Completed,
            committed: 0,
            skipped: 0,
            failed: 0,
            total,
        });
    }

    // deterministic for the whole run: same snapshot, same text
    let system_prompt = build_system_prompt(&categories);

    let mut committed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    let mut completed = 0usize;

    for txn in &transactions {
        if cancel.is_cancelled() {
            state = RunState::Cancelled;
            break;
        }

        let prompt = build_transaction_prompt(txn);
        let (suggestions, provider_error) = match source.suggest(&system_prompt, &prompt).await {
            Ok(s) => (s, None),
            Err(Error::Cancelled) => {
                state = RunState::Cancelled;
                break;
            }
            Err(err) => {
                // fall back to manual review; the batch keeps going
                let _ = events.send(RunEvent::warn(format!(
                    "suggestions unavailable for {}: {}",
                    txn.label(),
                    err
                )));
                (Vec::new(), Some(err.to_string()))
            }
        };

        let validated = validate_suggestions(suggestions, &categories);
        for rejected in &validated.rejected {
            // the matcher may still land somewhere; a substring hit can pick
            // an unrelated category, so it is only ever reported, never used
            let note = match match_category(&rejected.name, &categories) {
                Some(m) if m.tier.is_fuzzy() => {
                    format!(" (loose match: {})", category_name(&categories, m.id))
                }
                Some(m) => format!(" (case mismatch with {})", category_name(&categories, m.id)),
                None => String::new(),
            };
            let _ = events.send(RunEvent::warn(format!(
                "dropped suggestion {:?}: not an exact category name{}",
                rejected.name, note
            )));
        }

        let request = ApprovalRequest::new(
            txn.clone(),
            &validated.accepted,
            categories.clone(),
            provider_error,
        );
        let decision = gate.review(request).await?;

        match decision {
            Decision::Cancel => {
                state = RunState::Cancelled;
                break;
            }
            Decision::Skip => {
                skipped += 1;
                completed += 1;
                let _ = events.send(RunEvent::info(format!("skipped {}", txn.label())));
                let _ = events.send(RunEvent::progress(completed, total));
            }
            Decision::Commit(category_id) => {
                if cancel.is_cancelled() {
                    state = RunState::Cancelled;
                    break;
                }
                match ledger.set_category(txn.id, category_id).await {
                    Ok(()) => {
                        committed += 1;
                        let _ = events.send(RunEvent::ok(format!(
                            "{} -> {}",
                            txn.label(),
                            category_name(&categories, category_id)
                        )));
                    }
                    Err(err) => {
                        failed += 1;
                        let _ = events.send(RunEvent::error(format!(
                            "commit failed for {}: {}",
                            txn.label(),
                            err
                        )));
                    }
                }
                completed += 1;
                let _ = events.send(RunEvent::progress(completed, total));
            }
        }
    }

    if state == RunState::Cancelled {
        let _ = events.send(RunEvent::info("run cancelled"));
        let _ = events.send(RunEvent::progress(completed, total));
    } else {
        state = RunState::Completed;
    }

    Ok(RunSummary {
        state,
        committed,
        skipped,
        failed,
        total,
    })
}

fn category_name(categories: &[Category], id: i64) -> String {
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| format!("category {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::mpsc::{Receiver, channel};
    use tally_core::Level;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn txn(id: i64, payee: &str) -> Transaction {
        Transaction {
            id,
            date: date(10),
            payee: Some(payee.to_string()),
            amount: 20.0,
            currency: None,
            notes: None,
            category_id: None,
            is_parent: false,
            metadata: None,
        }
    }

    fn categories() -> Vec<Category> {
        vec![
            Category::new(1, "Groceries"),
            Category::new(2, "Gas, Transportation"),
        ]
    }

    fn opts() -> SessionOptions {
        SessionOptions {
            start: date(1),
            end: date(30),
            limit: None,
        }
    }

    struct MockLedger {
        categories: Vec<Category>,
        transactions: Vec<Transaction>,
        commits: Mutex<Vec<(i64, i64)>>,
        fail_commits: bool,
    }

    impl MockLedger {
        fn new(transactions: Vec<Transaction>) -> Self {
            Self {
                categories: categories(),
                transactions,
                commits: Mutex::new(Vec::new()),
                fail_commits: false,
            }
        }
    }

    impl LedgerApi for MockLedger {
        async fn active_categories(&self) -> Result<Vec<Category>, Error> {
            Ok(self.categories.clone())
        }

        async fn uncategorized_transactions(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Transaction>, Error> {
            Ok(self.transactions.clone())
        }

        async fn set_category(&self, transaction_id: i64, category_id: i64) -> Result<(), Error> {
            if self.fail_commits {
                return Err(Error::transport(Some(500), "ledger write failed"));
            }
            self.commits.lock().unwrap().push((transaction_id, category_id));
            Ok(())
        }
    }

    struct MockSource {
        responses: Mutex<VecDeque<Result<Vec<Suggestion>, Error>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockSource {
        /// Scripted responses, consumed in order; once the script is
        /// exhausted every call yields one valid "Groceries" suggestion.
        fn scripted(responses: Vec<Result<Vec<Suggestion>, Error>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn unscripted() -> Self {
            Self::scripted(Vec::new())
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl SuggestionSource for MockSource {
        async fn suggest(&self, _system: &str, prompt: &str) -> Result<Vec<Suggestion>, Error> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.responses.lock().unwrap().pop_front() {
                Some(r) => r,
                None => Ok(vec![Suggestion::new("Groceries").with_confidence(0.9)]),
            }
        }
    }

    struct MockGate {
        script: VecDeque<Decision>,
        seen: Vec<ApprovalRequest>,
        cancel: CancelToken,
        cancel_before_commit: bool,
    }

    impl MockGate {
        fn new(script: Vec<Decision>, cancel: CancelToken) -> Self {
            Self {
                script: script.into(),
                seen: Vec::new(),
                cancel,
                cancel_before_commit: false,
            }
        }
    }

    impl ReviewGate for MockGate {
        async fn review(&mut self, request: ApprovalRequest) -> Result<Decision> {
            self.seen.push(request);
            let decision = self.script.pop_front().unwrap_or(Decision::Skip);
            // mirror the real gate: cancelling sets the shared token
            if decision == Decision::Cancel || self.cancel_before_commit {
                self.cancel.cancel();
            }
            Ok(decision)
        }
    }

    fn drain(rx: &Receiver<RunEvent>) -> Vec<RunEvent> {
        rx.try_iter().collect()
    }

    fn log_messages(events: &[RunEvent], level: Level) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Log(log) if log.level == level => Some(log.message.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_commits_in_order_and_counts() {
        let ledger = MockLedger::new(vec![txn(10, "HEB"), txn(11, "Shell"), txn(12, "Target")]);
        let source = MockSource::unscripted();
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(
            vec![Decision::Commit(1), Decision::Skip, Decision::Commit(2)],
            cancel.clone(),
        );
        let (tx, rx) = channel();

        let summary = run_session(&ledger, &source, &mut gate, &cancel, &tx, &opts())
            .await
            .unwrap();

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.committed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.total, 3);

        // order preserved, one commit per approved transaction
        assert_eq!(*ledger.commits.lock().unwrap(), vec![(10, 1), (12, 2)]);

        let events = drain(&rx);
        let progress: Vec<(usize, usize)> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress(p) => Some((p.completed, p.total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);

        // the terminal log line for an item lands before its progress update
        let first_ok = events
            .iter()
            .position(|e| matches!(e, RunEvent::Log(l) if l.level == Level::Ok))
            .unwrap();
        let first_progress = events
            .iter()
            .position(|e| matches!(e, RunEvent::Progress(_)))
            .unwrap();
        assert!(first_ok < first_progress);
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_batch() {
        let ledger = MockLedger::new(vec![txn(10, "HEB"), txn(11, "Shell"), txn(12, "Target")]);
        let source = MockSource::unscripted();
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(vec![Decision::Commit(1), Decision::Cancel], cancel.clone());
        let (tx, rx) = channel();

        let summary = run_session(&ledger, &source, &mut gate, &cancel, &tx, &opts())
            .await
            .unwrap();

        assert_eq!(summary.state, RunState::Cancelled);
        // transaction 3 was never prompted nor presented
        assert_eq!(source.call_count(), 2);
        assert_eq!(gate.seen.len(), 2);
        // transaction 1's commit stays intact
        assert_eq!(*ledger.commits.lock().unwrap(), vec![(10, 1)]);
        assert!(cancel.is_cancelled());

        let events = drain(&rx);
        let infos = log_messages(&events, Level::Info);
        assert!(infos.iter().any(|m| m == "run cancelled"));
    }

    #[tokio::test]
    async fn test_cancel_flag_blocks_commit_checkpoint() {
        let ledger = MockLedger::new(vec![txn(10, "HEB")]);
        let source = MockSource::unscripted();
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(vec![Decision::Commit(1)], cancel.clone());
        gate.cancel_before_commit = true;
        let (tx, _rx) = channel();

        let summary = run_session(&ledger, &source, &mut gate, &cancel, &tx, &opts())
            .await
            .unwrap();

        assert_eq!(summary.state, RunState::Cancelled);
        assert!(ledger.commits.lock().unwrap().is_empty());
        assert_eq!(summary.committed, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_to_manual_review() {
        let ledger = MockLedger::new(vec![txn(10, "HEB"), txn(11, "Shell")]);
        let source = MockSource::scripted(vec![
            Err(Error::transport(Some(502), "bad gateway")),
            Ok(vec![Suggestion::new("Groceries").with_confidence(0.8)]),
        ]);
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(vec![Decision::Skip, Decision::Skip], cancel.clone());
        let (tx, rx) = channel();

        let summary = run_session(&ledger, &source, &mut gate, &cancel, &tx, &opts())
            .await
            .unwrap();

        // the failed fetch did not abort the batch or mark the item failed
        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 2);

        assert_eq!(gate.seen.len(), 2);
        assert!(gate.seen[0].suggestions.is_empty());
        assert!(gate.seen[0].provider_error.is_some());
        assert_eq!(gate.seen[1].suggestions.len(), 1);
        assert!(gate.seen[1].provider_error.is_none());

        let warns = log_messages(&drain(&rx), Level::Warn);
        assert!(warns.iter().any(|m| m.contains("suggestions unavailable")));
    }

    #[tokio::test]
    async fn test_commit_failure_does_not_abort() {
        let mut ledger = MockLedger::new(vec![txn(10, "HEB"), txn(11, "Shell")]);
        ledger.fail_commits = true;
        let source = MockSource::unscripted();
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(
            vec![Decision::Commit(1), Decision::Commit(2)],
            cancel.clone(),
        );
        let (tx, rx) = channel();

        let summary = run_session(&ledger, &source, &mut gate, &cancel, &tx, &opts())
            .await
            .unwrap();

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.committed, 0);
        assert_eq!(summary.failed, 2);

        let errors = log_messages(&drain(&rx), Level::Error);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("commit failed"));
    }

    #[tokio::test]
    async fn test_inexact_suggestions_are_dropped_with_warning() {
        let ledger = MockLedger::new(vec![txn(10, "Shell")]);
        let source = MockSource::scripted(vec![Ok(vec![
            Suggestion::new("Gas").with_confidence(0.9),
            Suggestion::new("Gas, Transportation").with_confidence(0.7),
        ])]);
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(vec![Decision::Skip], cancel.clone());
        let (tx, rx) = channel();

        run_session(&ledger, &source, &mut gate, &cancel, &tx, &opts())
            .await
            .unwrap();

        let presented = &gate.seen[0].suggestions;
        assert_eq!(presented.len(), 1);
        assert_eq!(presented[0].name, "Gas, Transportation");
        assert_eq!(presented[0].category_id, Some(2));

        let warns = log_messages(&drain(&rx), Level::Warn);
        assert!(
            warns
                .iter()
                .any(|m| m.contains("\"Gas\"") && m.contains("loose match: Gas, Transportation"))
        );
    }

    #[tokio::test]
    async fn test_empty_batch_completes_without_review() {
        let ledger = MockLedger::new(vec![]);
        let source = MockSource::unscripted();
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(vec![], cancel.clone());
        let (tx, rx) = channel();

        let summary = run_session(&ledger, &source, &mut gate, &cancel, &tx, &opts())
            .await
            .unwrap();

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.total, 0);
        assert!(gate.seen.is_empty());
        assert_eq!(source.call_count(), 0);

        let oks = log_messages(&drain(&rx), Level::Ok);
        assert!(oks.iter().any(|m| m == "nothing to review"));
    }

    #[tokio::test]
    async fn test_limit_truncates_the_batch() {
        let ledger = MockLedger::new(vec![txn(10, "A"), txn(11, "B"), txn(12, "C")]);
        let source = MockSource::unscripted();
        let cancel = CancelToken::new();
        let mut gate = MockGate::new(vec![Decision::Skip, Decision::Skip], cancel.clone());
        let (tx, _rx) = channel();

        let mut options = opts();
        options.limit = Some(2);
        let summary = run_session(&ledger, &source, &mut gate, &cancel, &tx, &options)
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(gate.seen.len(), 2);
    }
}
