//! Core data types for domain prospecting.
//!
//! This module defines the candidate and outcome types that flow from the
//! generator through the oracle to the reporter, plus the configuration
//! struct that drives a search.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// One generated domain name awaiting an availability determination.
///
/// `index` is the candidate's position in the deterministic enumeration
/// order of its [`CandidateSpace`](crate::CandidateSpace) and is unique
/// within that space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// Generation index (position in enumeration order)
    pub index: u64,

    /// Fully qualified domain name, e.g. "abc.com"
    pub domain: String,
}

/// Classified cause of an indeterminate lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminateReason {
    /// The lookup did not finish within its deadline
    Timeout,

    /// The registry refused the query for exceeding its quota
    RateLimited,

    /// The registry could not be reached or the client failed
    TransportError,

    /// The registry answered but the answer could not be interpreted
    ParseError,
}

impl IndeterminateReason {
    /// Every reason, in a stable order (useful for summaries).
    pub const ALL: [IndeterminateReason; 4] = [
        IndeterminateReason::Timeout,
        IndeterminateReason::RateLimited,
        IndeterminateReason::TransportError,
        IndeterminateReason::ParseError,
    ];

    /// Short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndeterminateReason::Timeout => "timeout",
            IndeterminateReason::RateLimited => "rate_limited",
            IndeterminateReason::TransportError => "transport_error",
            IndeterminateReason::ParseError => "parse_error",
        }
    }
}

impl fmt::Display for IndeterminateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one availability lookup.
///
/// `Indeterminate` is an ordinary value: it means "could not determine" and
/// must never be read as "available".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// No registration record exists
    Available,

    /// A registration record exists
    Registered,

    /// The lookup failed for a classified reason
    Indeterminate(IndeterminateReason),
}

impl LookupOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, LookupOutcome::Available)
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, LookupOutcome::Registered)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, LookupOutcome::Indeterminate(_))
    }

    /// The failure cause, if this outcome is indeterminate.
    pub fn indeterminate_reason(&self) -> Option<IndeterminateReason> {
        match self {
            LookupOutcome::Indeterminate(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupOutcome::Available => write!(f, "available"),
            LookupOutcome::Registered => write!(f, "registered"),
            LookupOutcome::Indeterminate(reason) => write!(f, "indeterminate ({})", reason),
        }
    }
}

/// Terminal outcome for one candidate, as handed to a reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    /// The candidate this outcome belongs to
    #[serde(flatten)]
    pub candidate: Candidate,

    /// The final classified outcome
    #[serde(flatten)]
    pub outcome: LookupOutcome,

    /// Number of oracle calls made for this candidate
    pub attempts: u32,

    /// Wall-clock time from first dispatch to the terminal outcome
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

pub(crate) fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Which lookup mechanism answers availability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    /// System `whois` command
    #[default]
    Whois,

    /// RDAP over HTTPS
    Rdap,

    /// RDAP first, WHOIS when RDAP cannot answer
    Auto,
}

impl OracleKind {
    /// Parse a user-supplied oracle name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "whois" => Some(OracleKind::Whois),
            "rdap" => Some(OracleKind::Rdap),
            "auto" => Some(OracleKind::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for OracleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleKind::Whois => write!(f, "WHOIS"),
            OracleKind::Rdap => write!(f, "RDAP"),
            OracleKind::Auto => write!(f, "Auto"),
        }
    }
}

/// Configuration for a prospecting run.
///
/// Covers the candidate space (length, alphabet, TLD), the engine's
/// admission control (concurrency, rate ceiling, retries) and the oracle
/// selection. Use [`ProspectConfig::validate`] before starting a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectConfig {
    /// Longest label length to generate (labels start at 3 characters)
    /// Default: 7
    pub max_length: usize,

    /// Ordered set of characters labels are built from
    /// Default: a-z
    pub alphabet: Vec<char>,

    /// Top-level domain appended to every label, without the dot
    /// Default: "com"
    pub tld: String,

    /// Maximum number of lookups in flight
    /// Default: 10, Range: 1-100
    pub concurrency: usize,

    /// Sustained lookups per second across all workers (None = unlimited)
    /// Default: 5.0
    pub rate_limit: Option<f64>,

    /// Token bucket capacity (how many lookups may start back to back)
    /// Default: 5
    pub burst: u32,

    /// Oracle calls per candidate before an indeterminate outcome is final
    /// Default: 5
    pub max_attempts: u32,

    /// Delay before the first retry; doubles per attempt
    /// Default: 500ms
    #[serde(skip)]
    pub base_backoff: Duration,

    /// Ceiling for per-candidate and global rate-limit backoff
    /// Default: 30 seconds
    #[serde(skip)]
    pub max_backoff: Duration,

    /// Deadline for a single oracle call
    /// Default: 5 seconds
    #[serde(skip)]
    pub timeout: Duration,

    /// Generation index to start from (resume watermark)
    /// Default: 0
    pub start_index: u64,

    /// Stop issuing new candidates after this many (None = whole space)
    pub limit: Option<u64>,

    /// Lookup mechanism
    /// Default: WHOIS
    pub oracle: OracleKind,

    /// Query this WHOIS server directly instead of the system default
    pub whois_server: Option<String>,

    /// RDAP base URL (ending in "/domain/") overriding the built-in registry
    pub rdap_endpoint: Option<String>,
}

impl Default for ProspectConfig {
    /// These defaults stay well under the tolerance of public registries.
    fn default() -> Self {
        Self {
            max_length: 7,
            alphabet: ('a'..='z').collect(),
            tld: "com".to_string(),
            concurrency: 10,
            rate_limit: Some(5.0),
            burst: 5,
            max_attempts: 5,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            start_index: 0,
            limit: None,
            oracle: OracleKind::Whois,
            whois_server: None,
            rdap_endpoint: None,
        }
    }
}

impl ProspectConfig {
    /// Set the longest label length to generate.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the label alphabet.
    pub fn with_alphabet<I: IntoIterator<Item = char>>(mut self, alphabet: I) -> Self {
        self.alphabet = alphabet.into_iter().collect();
        self
    }

    /// Set the top-level domain (a leading dot is stripped).
    pub fn with_tld<T: Into<String>>(mut self, tld: T) -> Self {
        self.tld = tld.into().trim().trim_start_matches('.').to_lowercase();
        self
    }

    /// Set the concurrency budget.
    ///
    /// Automatically capped at 100 to prevent resource exhaustion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set the global rate ceiling in lookups per second.
    pub fn with_rate_limit(mut self, rate_limit: Option<f64>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the token bucket capacity.
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    /// Set the attempt budget per candidate.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the retry backoff range.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max;
        self
    }

    /// Set the per-lookup deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start the search at a generation index.
    pub fn with_start_index(mut self, start_index: u64) -> Self {
        self.start_index = start_index;
        self
    }

    /// Issue at most `limit` candidates.
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Select the lookup mechanism.
    pub fn with_oracle(mut self, oracle: OracleKind) -> Self {
        self.oracle = oracle;
        self
    }

    /// The alphabet rendered as a string, as it would be typed on the CLI.
    pub fn alphabet_string(&self) -> String {
        self.alphabet.iter().collect()
    }
}
