//! # Domain Prospect Library
//!
//! Search a generated space of domain names for ones that are not yet
//! registered, using a rate-limited and failure-prone registry oracle.
//!
//! The search enumerates every label up to a maximum length over an
//! alphabet, asks an [`AvailabilityOracle`] about each candidate with
//! bounded concurrency and a shared rate limit, retries indeterminate
//! answers with exponential backoff, and reports exactly one terminal
//! outcome per candidate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_prospect_lib::{build_oracle, CollectingReporter, ProspectConfig, Prospector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProspectConfig::default()
//!         .with_max_length(3)
//!         .with_alphabet('a'..='c')
//!         .with_tld("com");
//!     let oracle = build_oracle(&config)?;
//!     let prospector = Prospector::with_shared_oracle(config, oracle)?;
//!
//!     let mut reporter = CollectingReporter::new();
//!     let summary = prospector.run(&mut reporter).await;
//!     for candidate in reporter.available() {
//!         println!("{}", candidate.domain);
//!     }
//!     println!("resume from index {}", summary.counts.watermark);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Deterministic enumeration**: every candidate has a stable index, so
//!   an interrupted search resumes from its watermark
//! - **Admission control**: worker slots and a token bucket gate every lookup
//! - **Retry with backoff**: indeterminate lookups are retried, rate-limit
//!   responses pause all workers
//! - **Pluggable oracles**: WHOIS, RDAP, or RDAP with WHOIS fallback

pub use concurrent::{RateLimiter, MAX_DELAY, MIN_RATE};
pub use config::{load_env_config, rate_from_user, ConfigManager, EnvConfig, FileConfig};
pub use engine::{backoff_delay, Prospector, SearchSummary};
pub use error::ProspectError;
pub use generate::{
    parse_alphabet, space_size, CandidateSpace, Candidates, MAX_LABEL_LENGTH, MIN_LABEL_LENGTH,
};
pub use oracle::{lookup_within, AvailabilityOracle};
pub use protocols::{
    build_oracle, get_all_known_tlds, parse_whois_response, FallbackOracle, RdapOracle,
    WhoisOracle,
};
pub use report::{CollectingReporter, Reporter};
pub use state::{SearchSnapshot, SearchState, Watermark};
pub use types::{
    Candidate, IndeterminateReason, LookupOutcome, OracleKind, OutcomeRecord, ProspectConfig,
};
pub use utils::{format_duration, parse_duration, validate_tld};

pub mod generate;
pub mod protocols;

mod concurrent;
mod config;
mod engine;
mod error;
mod oracle;
mod report;
mod state;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ProspectError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
