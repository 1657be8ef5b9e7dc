//! Integration tests for domain-prospect-lib exports and end-to-end searches

use async_trait::async_trait;
use domain_prospect_lib::{
    get_all_known_tlds, AvailabilityOracle, CandidateSpace, CollectingReporter,
    IndeterminateReason, LookupOutcome, OutcomeRecord, ProspectConfig, Prospector, Reporter,
    SearchSummary, VERSION,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Names ending in 'z' are free; everything else is taken.
struct SuffixOracle {
    calls: AtomicUsize,
    delay: Duration,
}

impl SuffixOracle {
    fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl AvailabilityOracle for SuffixOracle {
    fn name(&self) -> &str {
        "suffix"
    }

    async fn lookup(&self, domain: &str, _timeout: Duration) -> LookupOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let label = domain.split('.').next().unwrap_or_default();
        if label.ends_with('z') {
            LookupOutcome::Available
        } else {
            LookupOutcome::Registered
        }
    }
}

/// Fails the first attempt for every domain with a transport error.
struct FlakyOracle {
    attempts: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl AvailabilityOracle for FlakyOracle {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn lookup(&self, domain: &str, _timeout: Duration) -> LookupOutcome {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(domain.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        if attempt == 1 {
            LookupOutcome::Indeterminate(IndeterminateReason::TransportError)
        } else {
            LookupOutcome::Available
        }
    }
}

fn xyz_config() -> ProspectConfig {
    ProspectConfig::default()
        .with_max_length(3)
        .with_alphabet(['x', 'y', 'z'])
        .with_tld("com")
        .with_concurrency(4)
        .with_rate_limit(None)
        .with_backoff(Duration::from_millis(100), Duration::from_secs(1))
}

fn indices(records: &[OutcomeRecord]) -> BTreeSet<u64> {
    records.iter().map(|r| r.candidate.index).collect()
}

#[test]
fn test_library_exports_work() {
    assert!(!VERSION.is_empty());

    let tlds = get_all_known_tlds();
    assert!(tlds.contains(&"com"));
    assert!(tlds.contains(&"org"));

    let space = CandidateSpace::new(4, &['a', 'b'], "net").unwrap();
    assert_eq!(space.len(), 8 + 16);
    assert_eq!(space.candidate_at(8).unwrap().domain, "aaaa.net");
}

#[test]
fn test_invalid_config_is_rejected_before_search() {
    let err = Prospector::new(
        xyz_config().with_max_length(2),
        SuffixOracle::new(Duration::ZERO),
    )
    .err()
    .unwrap();
    assert!(err.is_config_error());

    let err = Prospector::new(
        xyz_config().with_alphabet(Vec::<char>::new()),
        SuffixOracle::new(Duration::ZERO),
    )
    .err()
    .unwrap();
    assert!(err.is_config_error());
}

#[tokio::test(start_paused = true)]
async fn test_full_search_reports_every_candidate_once() {
    let prospector = Prospector::new(xyz_config(), SuffixOracle::new(Duration::from_millis(50)))
        .unwrap();

    let mut reporter = CollectingReporter::new();
    let summary = prospector.run(&mut reporter).await;

    assert_eq!(reporter.records.len(), 27);
    assert_eq!(indices(&reporter.records), (0..27).collect());
    assert_eq!(reporter.available().count(), 9);
    assert_eq!(reporter.registered().count(), 18);
    assert!(reporter.available().all(|c| c.domain.ends_with("z.com")));

    assert!(summary.is_complete());
    assert_eq!(summary.counts.issued, 27);
    assert_eq!(summary.counts.completed, 27);
    assert_eq!(summary.counts.watermark, 27);
    assert_eq!(summary.counts.retries, 0);
    assert_eq!(reporter.summary, Some(summary));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let oracle = FlakyOracle {
        attempts: Mutex::new(HashMap::new()),
    };
    let prospector = Prospector::new(xyz_config(), oracle).unwrap();

    let mut reporter = CollectingReporter::new();
    let summary = prospector.run(&mut reporter).await;

    assert_eq!(reporter.records.len(), 27);
    assert!(reporter.records.iter().all(|r| r.attempts == 2));
    assert!(reporter.records.iter().all(|r| r.outcome.is_available()));
    assert_eq!(summary.counts.retries, 27);
    assert_eq!(summary.counts.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_bounds_throughput() {
    let config = xyz_config()
        .with_max_length(3)
        .with_alphabet(['a', 'b'])
        .with_rate_limit(Some(2.0))
        .with_burst(1);
    let prospector = Prospector::new(config, SuffixOracle::new(Duration::ZERO)).unwrap();

    let started = Instant::now();
    let mut reporter = CollectingReporter::new();
    prospector.run(&mut reporter).await;

    // 8 lookups at 2/s with a burst of one: the last starts after 3.5s
    assert_eq!(reporter.records.len(), 8);
    assert!(started.elapsed() >= Duration::from_millis(3490));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_search_resumes_from_watermark() {
    let token = CancellationToken::new();
    let first = Prospector::new(xyz_config(), SuffixOracle::new(Duration::from_millis(50)))
        .unwrap()
        .with_cancellation(token.clone());

    let mut before = Vec::new();
    let summary = {
        let mut sink = |record: &OutcomeRecord| {
            before.push(record.clone());
            if before.len() == 10 {
                token.cancel();
            }
        };
        first.run(&mut sink).await
    };

    assert!(summary.cancelled);
    assert!(!summary.is_complete());
    let watermark = summary.counts.watermark;
    assert!(watermark >= 10 && watermark < 27, "watermark {}", watermark);

    // Everything below the watermark has a terminal outcome
    let seen = indices(&before);
    assert!((0..watermark).all(|i| seen.contains(&i)));

    let second = Prospector::new(
        xyz_config().with_start_index(watermark),
        SuffixOracle::new(Duration::from_millis(50)),
    )
    .unwrap();
    let mut after = CollectingReporter::new();
    let resumed = second.run(&mut after).await;

    assert!(resumed.is_complete());
    let covered: BTreeSet<u64> = seen.union(&indices(&after.records)).copied().collect();
    assert_eq!(covered, (0..27).collect());
}

#[tokio::test(start_paused = true)]
async fn test_summary_serializes_for_checkpoints() {
    struct Last(Option<SearchSummary>);

    impl Reporter for Last {
        fn record(&mut self, _record: &OutcomeRecord) {}

        fn finish(&mut self, summary: &SearchSummary) {
            self.0 = Some(summary.clone());
        }
    }

    let prospector = Prospector::new(
        xyz_config().with_limit(Some(5)),
        SuffixOracle::new(Duration::from_millis(10)),
    )
    .unwrap();
    let mut reporter = Last(None);
    let summary = prospector.run(&mut reporter).await;

    assert_eq!(summary.end_index, 5);
    assert_eq!(summary.counts.watermark, 5);

    let json = serde_json::to_value(reporter.0.unwrap()).unwrap();
    assert_eq!(json["watermark"], 5);
    assert_eq!(json["issued"], 5);
    assert_eq!(json["cancelled"], false);
    assert!(json.get("elapsed_ms").is_some());
}
