//! The availability oracle abstraction.
//!
//! An oracle answers "is this name registered?" for one domain at a time.
//! Implementations never fail with an error: anything that prevents a
//! definite answer is folded into [`LookupOutcome::Indeterminate`] with a
//! classified reason, so the engine can decide whether to retry.

use crate::types::{IndeterminateReason, LookupOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Source of truth about domain registration.
///
/// Implementations must be safe to call from many tasks at once. They
/// must not retry internally; retries are the engine's job.
#[async_trait]
pub trait AvailabilityOracle: Send + Sync {
    /// Short name used in logs ("whois", "rdap", ...).
    fn name(&self) -> &str;

    /// Look up one fully qualified domain name.
    ///
    /// `timeout` is the deadline for this call. Implementations should
    /// honor it where they can; the engine enforces it regardless.
    async fn lookup(&self, domain: &str, timeout: Duration) -> LookupOutcome;
}

#[async_trait]
impl<T: AvailabilityOracle + ?Sized> AvailabilityOracle for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn lookup(&self, domain: &str, timeout: Duration) -> LookupOutcome {
        (**self).lookup(domain, timeout).await
    }
}

#[async_trait]
impl<T: AvailabilityOracle + ?Sized> AvailabilityOracle for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn lookup(&self, domain: &str, timeout: Duration) -> LookupOutcome {
        (**self).lookup(domain, timeout).await
    }
}

/// Call `oracle` with a hard deadline.
///
/// A call that overruns `timeout` is dropped and reported as
/// `Indeterminate(Timeout)`.
pub async fn lookup_within<O>(oracle: &O, domain: &str, timeout: Duration) -> LookupOutcome
where
    O: AvailabilityOracle + ?Sized,
{
    match tokio::time::timeout(timeout, oracle.lookup(domain, timeout)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::debug!(domain, oracle = oracle.name(), ?timeout, "lookup timed out");
            LookupOutcome::Indeterminate(IndeterminateReason::Timeout)
        }
    }
}
