//! The prospecting engine.
//!
//! [`Prospector`] drives a [`CandidateSpace`] through an
//! [`AvailabilityOracle`] under three admission gates: a worker slot (at
//! most `concurrency` lookups in flight), ready work (a fresh candidate or
//! a retry whose backoff has elapsed), and a rate token from the shared
//! [`RateLimiter`]. Only when all three are held is the next candidate taken
//! off the queue, so the generator never runs ahead of the oracle.
//!
//! A single coordinator owns the work queue, the retry heap and the
//! watermark. Lookups run as spawned tasks and hand their candidate back to
//! the coordinator when done; no candidate is ever shared between tasks.
//!
//! Every issued candidate ends with exactly one [`OutcomeRecord`] passed to
//! the [`Reporter`], except candidates still waiting for a retry when the
//! search is cancelled. Those are counted as abandoned and always sit at or
//! above the final watermark, so resuming from the watermark covers them.

use crate::concurrent::{deadline_after, RateLimiter};
use crate::error::ProspectError;
use crate::generate::{CandidateSpace, Candidates};
use crate::oracle::{lookup_within, AvailabilityOracle};
use crate::report::Reporter;
use crate::state::{SearchSnapshot, SearchState, Watermark};
use crate::types::{
    serialize_millis, Candidate, IndeterminateReason, LookupOutcome, OutcomeRecord,
    ProspectConfig,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::iter::{Peekable, TakeWhile};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Final report of a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSummary {
    /// Counters at the end of the run
    #[serde(flatten)]
    pub counts: SearchSnapshot,

    /// First generation index this run covered
    pub start_index: u64,

    /// One past the last generation index this run would cover
    pub end_index: u64,

    /// Whether the run stopped because of cancellation
    pub cancelled: bool,

    /// Candidates left waiting for a retry when the run was cancelled
    pub abandoned: u64,

    /// Wall-clock duration of the run
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl SearchSummary {
    /// Every candidate in the run's range has a terminal outcome.
    pub fn is_complete(&self) -> bool {
        self.counts.watermark >= self.end_index
    }
}

/// Retry delay before attempt `attempt + 1`: `base * 2^(attempt - 1)`,
/// capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 1u32
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

/// A candidate between attempts.
#[derive(Debug, Clone)]
struct Pending {
    candidate: Candidate,
    attempts: u32,
    first_dispatch: Instant,
}

/// A requeued candidate. Orders as a min-heap entry on
/// `(ready_at, index)`, so the earliest ready time wins and the lower
/// generation index breaks ties.
#[derive(Debug)]
struct Retry {
    ready_at: Instant,
    pending: Pending,
}

impl Retry {
    fn key(&self) -> (Instant, u64) {
        (self.ready_at, self.pending.candidate.index)
    }
}

impl PartialEq for Retry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Retry {}

impl PartialOrd for Retry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Retry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// What a lookup task hands back to the coordinator.
struct Finished {
    pending: Pending,
    outcome: LookupOutcome,
}

/// Searches a candidate space for unregistered names.
///
/// # Example
///
/// ```rust,no_run
/// use domain_prospect_lib::{CollectingReporter, ProspectConfig, Prospector, WhoisOracle};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ProspectConfig::default().with_max_length(3);
///     let prospector = Prospector::new(config, WhoisOracle::new())?;
///
///     let mut reporter = CollectingReporter::new();
///     let summary = prospector.run(&mut reporter).await;
///
///     for candidate in reporter.available() {
///         println!("{}", candidate.domain);
///     }
///     println!("{} indeterminate", summary.counts.failed);
///     Ok(())
/// }
/// ```
pub struct Prospector {
    config: ProspectConfig,
    space: CandidateSpace,
    oracle: Arc<dyn AvailabilityOracle>,
    state: Arc<SearchState>,
    cancel: CancellationToken,
}

impl Prospector {
    /// Create an engine for `config`, answering lookups with `oracle`.
    ///
    /// Fails if the configuration is invalid.
    pub fn new<O>(config: ProspectConfig, oracle: O) -> Result<Self, ProspectError>
    where
        O: AvailabilityOracle + 'static,
    {
        Self::with_shared_oracle(config, Arc::new(oracle))
    }

    /// Create an engine around an oracle that is already shared.
    pub fn with_shared_oracle(
        config: ProspectConfig,
        oracle: Arc<dyn AvailabilityOracle>,
    ) -> Result<Self, ProspectError> {
        config.validate()?;
        let space = CandidateSpace::new(config.max_length, &config.alphabet, &config.tld)?;
        let state = Arc::new(SearchState::new(config.start_index));

        Ok(Self {
            config,
            space,
            oracle,
            state,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the search when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live counters, readable while the search runs.
    pub fn state(&self) -> Arc<SearchState> {
        Arc::clone(&self.state)
    }

    pub fn space(&self) -> &CandidateSpace {
        &self.space
    }

    pub fn config(&self) -> &ProspectConfig {
        &self.config
    }

    /// One past the last generation index this search covers.
    pub fn end_index(&self) -> u64 {
        let total = self.space.len();
        match self.config.limit {
            Some(limit) => self.config.start_index.saturating_add(limit).min(total),
            None => total,
        }
    }

    /// Run the search to completion or cancellation.
    ///
    /// Outcomes reach `reporter` in completion order. Per-candidate
    /// failures never abort the search. Each call starts over from
    /// `start_index` with fresh counters.
    pub async fn run<R>(&self, reporter: &mut R) -> SearchSummary
    where
        R: Reporter + ?Sized,
    {
        let started = Instant::now();
        let start_index = self.config.start_index;
        let end_index = self.end_index();

        tracing::info!(
            oracle = self.oracle.name(),
            space = self.space.len(),
            start_index,
            end_index,
            concurrency = self.config.concurrency,
            rate_limit = ?self.config.rate_limit,
            "starting search"
        );

        self.state.reset(start_index);
        let mut coordinator = build_coordinator(self, reporter, end_index);

        coordinator.drive().await;

        let abandoned = coordinator.retries.len() as u64;
        let cancelled = coordinator.stopping;
        if abandoned > 0 {
            tracing::info!(abandoned, "candidates left awaiting retry at cancellation");
        }

        let summary = SearchSummary {
            counts: self.state.snapshot(),
            start_index,
            end_index,
            cancelled,
            abandoned,
            elapsed: started.elapsed(),
        };
        coordinator.reporter.finish(&summary);

        tracing::info!(
            completed = summary.counts.completed,
            available = summary.counts.available,
            registered = summary.counts.registered,
            indeterminate = summary.counts.failed,
            watermark = summary.counts.watermark,
            cancelled,
            "search finished"
        );

        summary
    }
}

fn end_at(end_index: u64) -> impl FnMut(&Candidate) -> bool {
    move |candidate| candidate.index < end_index
}

fn build_coordinator<'a, R>(
    engine: &'a Prospector,
    reporter: &'a mut R,
    end_index: u64,
) -> Coordinator<'a, R, impl FnMut(&Candidate) -> bool>
where
    R: Reporter + ?Sized,
{
    let config = &engine.config;
    let limiter = RateLimiter::new(config.rate_limit, config.burst)
        .with_penalty(config.base_backoff, config.max_backoff);

    Coordinator {
        engine,
        reporter,
        limiter,
        slots: Arc::new(Semaphore::new(config.concurrency)),
        fresh: engine
            .space
            .iter_from(config.start_index)
            .take_while(end_at(end_index))
            .peekable(),
        retries: BinaryHeap::new(),
        tasks: JoinSet::new(),
        in_flight: BTreeMap::new(),
        watermark: Watermark::new(config.start_index),
        stopping: false,
    }
}

type FreshQueue<'a, P> = Peekable<TakeWhile<Candidates<'a>, P>>;

/// Which queue the next dispatch comes from.
enum Source {
    Retry,
    Fresh,
}

struct Coordinator<'a, R: ?Sized, P>
where
    P: FnMut(&Candidate) -> bool,
{
    engine: &'a Prospector,
    reporter: &'a mut R,
    limiter: RateLimiter,
    slots: Arc<Semaphore>,
    fresh: FreshQueue<'a, P>,
    retries: BinaryHeap<Retry>,
    tasks: JoinSet<Finished>,
    /// Copies of dispatched candidates, for recovery if a task is lost
    in_flight: BTreeMap<u64, Pending>,
    watermark: Watermark,
    stopping: bool,
}

impl<'a, R, P> Coordinator<'a, R, P>
where
    R: Reporter + ?Sized,
    P: FnMut(&Candidate) -> bool,
{
    fn has_work(&mut self) -> bool {
        !self.stopping && (self.fresh.peek().is_some() || !self.retries.is_empty())
    }

    /// Next source with work ready right now. Ready retries always come
    /// before fresh candidates since their indices are lower.
    fn ready_source(&mut self, now: Instant) -> Option<Source> {
        if self.retries.peek().is_some_and(|r| r.ready_at <= now) {
            Some(Source::Retry)
        } else if self.fresh.peek().is_some() {
            Some(Source::Fresh)
        } else {
            None
        }
    }

    async fn drive(&mut self) {
        let cancel = self.engine.cancel.clone();

        'admit: loop {
            if !self.has_work() {
                if self.tasks.is_empty() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled(), if !self.stopping => self.stop(),
                    Some(joined) = self.tasks.join_next() => self.complete(joined),
                }
                continue;
            }

            // Gate 1: a worker slot
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.stop();
                    continue;
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.complete(joined);
                    continue;
                }
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            // Gate 2: ready work
            loop {
                if self.ready_source(Instant::now()).is_some() {
                    break;
                }
                let Some(next_ready) = self.retries.peek().map(|r| r.ready_at) else {
                    // Nothing left to dispatch
                    continue 'admit;
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        self.stop();
                        continue 'admit;
                    }
                    Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                        self.complete(joined);
                    }
                    _ = tokio::time::sleep_until(next_ready) => {}
                }
            }

            // Gate 3: a rate token
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        self.stop();
                        continue 'admit;
                    }
                    Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                        self.complete(joined);
                    }
                    _ = self.limiter.acquire() => break,
                }
            }

            let pending = match self.ready_source(Instant::now()) {
                Some(Source::Retry) => match self.retries.pop() {
                    Some(retry) => {
                        self.engine.state.record_retry();
                        retry.pending
                    }
                    None => continue,
                },
                Some(Source::Fresh) => match self.fresh.next() {
                    Some(candidate) => {
                        self.engine.state.record_issued();
                        Pending {
                            candidate,
                            attempts: 0,
                            first_dispatch: Instant::now(),
                        }
                    }
                    None => continue,
                },
                None => continue,
            };

            self.dispatch(pending, permit);
        }
    }

    fn stop(&mut self) {
        if !self.stopping {
            tracing::info!(
                in_flight = self.tasks.len(),
                "cancellation requested, waiting for in-flight lookups"
            );
            self.stopping = true;
        }
    }

    fn dispatch(&mut self, mut pending: Pending, permit: OwnedSemaphorePermit) {
        pending.attempts += 1;
        let oracle = Arc::clone(&self.engine.oracle);
        let timeout = self.engine.config.timeout;
        let domain = pending.candidate.domain.clone();
        self.in_flight
            .insert(pending.candidate.index, pending.clone());

        tracing::debug!(
            domain = %domain,
            index = pending.candidate.index,
            attempt = pending.attempts,
            "dispatching lookup"
        );

        self.tasks.spawn(async move {
            let _permit = permit;
            let lookup =
                tokio::spawn(async move { lookup_within(&oracle, &domain, timeout).await });
            let outcome = match lookup.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(
                        domain = %pending.candidate.domain,
                        error = %err,
                        "lookup task failed"
                    );
                    LookupOutcome::Indeterminate(IndeterminateReason::TransportError)
                }
            };
            Finished { pending, outcome }
        });
    }

    fn complete(&mut self, joined: Result<Finished, JoinError>) {
        match joined {
            Ok(finished) => {
                self.in_flight.remove(&finished.pending.candidate.index);
                self.settle(finished);
            }
            Err(err) => tracing::error!(error = %err, "lookup wrapper task failed"),
        }

        // Once nothing is running, anything still tracked lost its task
        if self.tasks.is_empty() && !self.in_flight.is_empty() {
            for (_, pending) in std::mem::take(&mut self.in_flight) {
                tracing::warn!(
                    domain = %pending.candidate.domain,
                    "no result from lookup task, recording transport error"
                );
                self.emit(
                    pending,
                    LookupOutcome::Indeterminate(IndeterminateReason::TransportError),
                );
            }
        }
    }

    fn settle(&mut self, finished: Finished) {
        let Finished { pending, outcome } = finished;

        match outcome.indeterminate_reason() {
            Some(IndeterminateReason::RateLimited) => {
                self.limiter.penalize();
            }
            _ => self.limiter.relax(),
        }

        let Some(reason) = outcome.indeterminate_reason() else {
            self.emit(pending, outcome);
            return;
        };

        if pending.attempts >= self.engine.config.max_attempts {
            tracing::warn!(
                domain = %pending.candidate.domain,
                %reason,
                attempts = pending.attempts,
                "giving up on candidate"
            );
            self.emit(pending, outcome);
            return;
        }

        let delay = backoff_delay(
            pending.attempts,
            self.engine.config.base_backoff,
            self.engine.config.max_backoff,
        );
        tracing::debug!(
            domain = %pending.candidate.domain,
            %reason,
            attempt = pending.attempts,
            ?delay,
            "requeueing candidate"
        );
        self.retries.push(Retry {
            ready_at: deadline_after(Instant::now(), delay),
            pending,
        });
    }

    fn emit(&mut self, pending: Pending, outcome: LookupOutcome) {
        let state = &self.engine.state;
        match outcome {
            LookupOutcome::Available => state.record_available(),
            LookupOutcome::Registered => state.record_registered(),
            LookupOutcome::Indeterminate(_) => state.record_failed(),
        }
        state.set_watermark(self.watermark.complete(pending.candidate.index));

        let record = OutcomeRecord {
            elapsed: pending.first_dispatch.elapsed(),
            candidate: pending.candidate,
            outcome,
            attempts: pending.attempts,
        };
        self.reporter.record(&record);
    }
}
