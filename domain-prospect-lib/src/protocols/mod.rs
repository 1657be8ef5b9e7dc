//! Availability oracle providers.
//!
//! RDAP is queried over HTTP, WHOIS through the system `whois` command.
//! [`FallbackOracle`] chains two providers under one deadline and
//! [`build_oracle`] picks providers from a [`ProspectConfig`].

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// WHOIS protocol implementation
pub mod whois;

/// Built-in RDAP endpoint registry
pub mod registry;

pub use rdap::RdapOracle;
pub use registry::{get_all_known_tlds, get_rdap_registry_map, resolve_rdap_endpoint};
pub use whois::{discover_whois_server, parse_whois_response, WhoisOracle};

use crate::error::ProspectError;
use crate::oracle::{lookup_within, AvailabilityOracle};
use crate::types::{IndeterminateReason, LookupOutcome, OracleKind, ProspectConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Ask `primary` first and `secondary` only when the primary could not
/// decide for a reason other than rate limiting.
///
/// Both lookups share the caller's deadline: the secondary gets whatever
/// time the primary left unused.
pub struct FallbackOracle {
    primary: Arc<dyn AvailabilityOracle>,
    secondary: Arc<dyn AvailabilityOracle>,
}

impl FallbackOracle {
    pub fn new(
        primary: Arc<dyn AvailabilityOracle>,
        secondary: Arc<dyn AvailabilityOracle>,
    ) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl AvailabilityOracle for FallbackOracle {
    fn name(&self) -> &str {
        "auto"
    }

    async fn lookup(&self, domain: &str, timeout: Duration) -> LookupOutcome {
        let started = Instant::now();
        let outcome = lookup_within(self.primary.as_ref(), domain, timeout).await;

        match outcome {
            LookupOutcome::Indeterminate(reason) if reason != IndeterminateReason::RateLimited => {
                let remaining = timeout.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return outcome;
                }

                tracing::debug!(
                    domain,
                    %reason,
                    from = self.primary.name(),
                    to = self.secondary.name(),
                    "falling back"
                );
                lookup_within(self.secondary.as_ref(), domain, remaining).await
            }
            _ => outcome,
        }
    }
}

/// Build the oracle selected by `config.oracle`.
///
/// `Rdap` requires a known endpoint for the TLD (or an explicit one).
/// `Auto` uses RDAP with WHOIS fallback when an endpoint is known and
/// plain WHOIS otherwise.
pub fn build_oracle(config: &ProspectConfig) -> Result<Arc<dyn AvailabilityOracle>, ProspectError> {
    let whois = || {
        let oracle = WhoisOracle::new();
        match &config.whois_server {
            Some(server) => oracle.with_server(server.clone()),
            None => oracle,
        }
    };

    match config.oracle {
        OracleKind::Whois => Ok(Arc::new(whois())),
        OracleKind::Rdap => Ok(Arc::new(RdapOracle::for_tld(
            &config.tld,
            config.rdap_endpoint.as_deref(),
        )?)),
        OracleKind::Auto => {
            match RdapOracle::for_tld(&config.tld, config.rdap_endpoint.as_deref()) {
                Ok(rdap) => Ok(Arc::new(FallbackOracle::new(
                    Arc::new(rdap),
                    Arc::new(whois()),
                ))),
                Err(e) if e.is_config_error() && config.rdap_endpoint.is_none() => {
                    tracing::info!(tld = %config.tld, "no RDAP endpoint known, using WHOIS only");
                    Ok(Arc::new(whois()))
                }
                Err(e) => Err(e),
            }
        }
    }
}
