//! WHOIS oracle backed by the system `whois` command.
//!
//! WHOIS replies are free text whose layout varies per registry, so the
//! classifier works from pattern sets. Output that matches neither the
//! "no record" nor the "record present" patterns is reported as a parse
//! error and never taken as evidence of availability.

use crate::error::ProspectError;
use crate::oracle::AvailabilityOracle;
use crate::types::LookupOutcome;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Banners registries print when a client exceeds its query quota.
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "throttled",
    "rate-limited",
    "query rate",
    "connection refused; access denied",
];

/// The client could not find a server to ask.
const NO_SERVER_PATTERNS: &[&str] = &[
    "no whois server is known",
    "no whois server",
    "invalid tld",
    "unknown tld",
    "no such tld",
];

const AVAILABLE_PATTERNS: &[&str] = &[
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "domain not found",
    "status: available",
    "status: free",
    "not registered",
    "no matching record",
    "the queried object does not exist",
    "object does not exist",
    "no matching entry",
    "this domain name has not been registered",
];

const REGISTERED_PATTERNS: &[&str] = &[
    "domain status:",
    "registrar:",
    "creation date:",
    "created:",
    "registry domain id:",
    "registrant:",
    "name server:",
    "nameservers:",
    "expiry date:",
    "registry expiry date:",
    "updated date:",
];

/// Minimum registered-pattern hits before a record counts as present.
const MIN_REGISTERED_HITS: usize = 2;

/// WHOIS oracle that shells out to `whois [-h server] <domain>`.
#[derive(Debug, Clone)]
pub struct WhoisOracle {
    program: String,
    server: Option<String>,
}

impl WhoisOracle {
    pub fn new() -> Self {
        Self {
            program: "whois".to_string(),
            server: None,
        }
    }

    /// Query a specific WHOIS server instead of letting the client pick one.
    pub fn with_server<S: Into<String>>(mut self, server: S) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Use a different executable in place of `whois`.
    pub fn with_program<P: Into<String>>(mut self, program: P) -> Self {
        self.program = program.into();
        self
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn command(&self, domain: &str) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(server) = &self.server {
            command.arg("-h").arg(server);
        }
        command
            .arg(domain)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Run one WHOIS query and classify its output.
    ///
    /// The child process is killed if `timeout` elapses first. Only stdout
    /// is classified; a client that exits with failure is a transport error
    /// unless it reports throttling.
    pub async fn query(
        &self,
        domain: &str,
        timeout: Duration,
    ) -> Result<LookupOutcome, ProspectError> {
        let output = match tokio::time::timeout(timeout, self.command(domain).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ProspectError::whois(
                    domain,
                    format!(
                        "Failed to execute {}: {}. Make sure 'whois' is installed.",
                        self.program, e
                    ),
                ))
            }
            Err(_) => return Err(ProspectError::timeout("WHOIS query", timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Client diagnostics on stderr only ever count as a throttling signal
        if is_rate_limit_banner(&stderr) {
            return Err(ProspectError::rate_limited(
                "WHOIS",
                format!("query for '{}' was throttled", domain),
            ));
        }

        if !output.status.success() {
            if is_rate_limit_banner(&stdout) {
                return Err(ProspectError::rate_limited(
                    "WHOIS",
                    format!("query for '{}' was throttled", domain),
                ));
            }
            let detail = stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("no diagnostics");
            return Err(ProspectError::whois(
                domain,
                format!("{} failed ({}): {}", self.program, output.status, detail),
            ));
        }

        if stdout.trim().is_empty() {
            return Err(ProspectError::parse(format!(
                "Empty WHOIS response for '{}'",
                domain
            )));
        }

        parse_whois_response(domain, &stdout)
    }
}

impl Default for WhoisOracle {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify raw WHOIS output.
///
/// Rate-limit banners win over everything else, then missing-server notices,
/// then "no record" phrases, then registration fields.
pub fn parse_whois_response(domain: &str, output: &str) -> Result<LookupOutcome, ProspectError> {
    let output = output.to_lowercase();
    let contains_any = |patterns: &[&str]| patterns.iter().any(|p| output.contains(p));

    if is_rate_limit_banner(&output) {
        return Err(ProspectError::rate_limited(
            "WHOIS",
            format!("query for '{}' was throttled", domain),
        ));
    }

    if contains_any(NO_SERVER_PATTERNS) {
        return Err(ProspectError::whois(
            domain,
            "No WHOIS server available for this TLD",
        ));
    }

    if contains_any(AVAILABLE_PATTERNS) {
        return Ok(LookupOutcome::Available);
    }

    let registered_hits = REGISTERED_PATTERNS
        .iter()
        .filter(|p| output.contains(*p))
        .count();
    if registered_hits >= MIN_REGISTERED_HITS {
        return Ok(LookupOutcome::Registered);
    }

    Err(ProspectError::ParseError {
        message: format!("Unable to determine status of '{}' from WHOIS response", domain),
        content: Some(output.chars().take(200).collect()),
    })
}

fn is_rate_limit_banner(text: &str) -> bool {
    let text = text.to_lowercase();
    RATE_LIMIT_PATTERNS.iter().any(|p| text.contains(p))
}

/// Parse an IANA WHOIS response for the authoritative server of a TLD.
///
/// `refer:` is preferred over `whois:` when both are present.
pub fn parse_iana_refer_response(response: &str) -> Option<String> {
    let mut fallback = None;

    for line in response.lines().map(str::trim) {
        if let Some(server) = line.strip_prefix("refer:").map(str::trim) {
            if !server.is_empty() {
                return Some(server.to_string());
            }
        } else if let Some(server) = line.strip_prefix("whois:").map(str::trim) {
            if !server.is_empty() {
                fallback = Some(server.to_string());
            }
        }
    }

    fallback
}

/// Ask `whois.iana.org` which server is authoritative for `tld`.
pub async fn discover_whois_server(tld: &str, timeout: Duration) -> Option<String> {
    let oracle = WhoisOracle::new().with_server("whois.iana.org");
    let output = tokio::time::timeout(timeout, oracle.command(tld).output())
        .await
        .ok()?
        .ok()?;

    parse_iana_refer_response(&String::from_utf8_lossy(&output.stdout))
}

#[async_trait]
impl AvailabilityOracle for WhoisOracle {
    fn name(&self) -> &str {
        "whois"
    }

    async fn lookup(&self, domain: &str, timeout: Duration) -> LookupOutcome {
        match self.query(domain, timeout).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = err.indeterminate_reason();
                tracing::debug!(domain, %reason, error = %err, "WHOIS lookup indeterminate");
                LookupOutcome::Indeterminate(reason)
            }
        }
    }
}
