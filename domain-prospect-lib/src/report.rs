//! Sinks for the engine's outcome stream.
//!
//! A [`Reporter`] receives one [`OutcomeRecord`] per candidate, in
//! completion order, and a final [`SearchSummary`]. It is append-only for
//! the duration of a run. Closures work as reporters:
//!
//! ```
//! use domain_prospect_lib::{OutcomeRecord, Reporter};
//!
//! let mut found = Vec::new();
//! let mut sink = |record: &OutcomeRecord| {
//!     if record.outcome.is_available() {
//!         found.push(record.candidate.domain.clone());
//!     }
//! };
//! # fn takes_reporter<R: Reporter>(_r: &mut R) {}
//! # takes_reporter(&mut sink);
//! ```

use crate::engine::SearchSummary;
use crate::types::{Candidate, IndeterminateReason, OutcomeRecord};
use std::collections::BTreeMap;

/// Consumer of terminal outcomes.
pub trait Reporter {
    /// Called once per candidate with its terminal outcome.
    fn record(&mut self, record: &OutcomeRecord);

    /// Called once after the last record.
    fn finish(&mut self, _summary: &SearchSummary) {}
}

impl<F> Reporter for F
where
    F: FnMut(&OutcomeRecord),
{
    fn record(&mut self, record: &OutcomeRecord) {
        self(record)
    }
}

/// Keeps every record in memory. Useful for tests and library callers
/// that want the full result set at the end.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub records: Vec<OutcomeRecord>,
    pub summary: Option<SearchSummary>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available(&self) -> impl Iterator<Item = &Candidate> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_available())
            .map(|r| &r.candidate)
    }

    pub fn registered(&self) -> impl Iterator<Item = &Candidate> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_registered())
            .map(|r| &r.candidate)
    }

    pub fn indeterminate(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.records.iter().filter(|r| r.outcome.is_indeterminate())
    }

    /// Terminal indeterminate outcomes grouped by cause.
    pub fn indeterminate_by_reason(&self) -> BTreeMap<IndeterminateReason, u64> {
        let mut counts = BTreeMap::new();
        for reason in self
            .records
            .iter()
            .filter_map(|r| r.outcome.indeterminate_reason())
        {
            *counts.entry(reason).or_insert(0) += 1;
        }
        counts
    }

    /// Records sorted by generation index.
    pub fn sorted(&self) -> Vec<&OutcomeRecord> {
        let mut sorted: Vec<_> = self.records.iter().collect();
        sorted.sort_by_key(|r| r.candidate.index);
        sorted
    }
}

impl Reporter for CollectingReporter {
    fn record(&mut self, record: &OutcomeRecord) {
        self.records.push(record.clone());
    }

    fn finish(&mut self, summary: &SearchSummary) {
        self.summary = Some(summary.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LookupOutcome;
    use std::time::Duration;

    fn record(index: u64, outcome: LookupOutcome) -> OutcomeRecord {
        OutcomeRecord {
            candidate: Candidate {
                index,
                domain: format!("c{}.com", index),
            },
            outcome,
            attempts: 1,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_collecting_reporter_partitions() {
        let mut reporter = CollectingReporter::new();
        reporter.record(&record(2, LookupOutcome::Available));
        reporter.record(&record(0, LookupOutcome::Registered));
        reporter.record(&record(
            1,
            LookupOutcome::Indeterminate(IndeterminateReason::Timeout),
        ));
        reporter.record(&record(
            3,
            LookupOutcome::Indeterminate(IndeterminateReason::Timeout),
        ));

        assert_eq!(reporter.available().count(), 1);
        assert_eq!(reporter.registered().count(), 1);
        assert_eq!(reporter.indeterminate().count(), 2);
        assert_eq!(
            reporter.indeterminate_by_reason().get(&IndeterminateReason::Timeout),
            Some(&2)
        );

        let order: Vec<u64> = reporter.sorted().iter().map(|r| r.candidate.index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_closure_reporter() {
        let mut seen = Vec::new();
        {
            let mut sink = |r: &OutcomeRecord| seen.push(r.candidate.index);
            sink.record(&record(4, LookupOutcome::Available));
            sink.record(&record(5, LookupOutcome::Registered));
        }
        assert_eq!(seen, vec![4, 5]);
    }
}
