//! Configuration file parsing, environment overrides and validation.
//!
//! Settings are layered with this precedence (highest first):
//!
//! 1. command-line flags (applied by the CLI)
//! 2. `DP_*` environment variables ([`load_env_config`])
//! 3. `./domain-prospect.toml` or `./.domain-prospect.toml`
//! 4. `~/.domain-prospect.toml`
//! 5. `$XDG_CONFIG_HOME/domain-prospect/config.toml`
//! 6. built-in defaults ([`ProspectConfig::default`])
//!
//! A configuration file looks like this:
//!
//! ```toml
//! [search]
//! max_length = 5
//! alphabet = "letters"
//! tld = "io"
//!
//! [engine]
//! concurrency = 8
//! rate = 4.0          # lookups per second, 0 = unlimited
//! burst = 4
//! max_attempts = 5
//! timeout = "5s"
//! base_backoff = "500ms"
//! max_backoff = "30s"
//!
//! [oracle]
//! kind = "rdap"
//!
//! [output]
//! format = "json"
//! show_unknown = true
//! ```

use crate::concurrent::{MAX_DELAY, MIN_RATE};
use crate::error::ProspectError;
use crate::generate::{
    parse_alphabet, space_size, validate_alphabet, MAX_LABEL_LENGTH, MIN_LABEL_LENGTH,
};
use crate::types::{OracleKind, ProspectConfig};
use crate::utils::{parse_duration, validate_tld};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Which names to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSection>,

    /// Admission control and retry policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSection>,

    /// Lookup mechanism
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleSection>,

    /// Output formatting preferences (read by the CLI)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Preset name or literal character list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alphabet: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tld: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Lookups per second; 0 disables the ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    /// Duration string, e.g. "5s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_backoff: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OracleSection {
    /// "whois", "rdap" or "auto"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputSection {
    /// "text", "json" or "csv"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_taken: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_unknown: Option<bool>,
}

/// Convert a user-facing rate into the engine's representation
/// (`0` means unlimited).
pub fn rate_from_user(rate: f64) -> Option<f64> {
    if rate == 0.0 {
        None
    } else {
        Some(rate)
    }
}

fn duration_field(value: &str, field: &str) -> Result<std::time::Duration, ProspectError> {
    parse_duration(value).ok_or_else(|| {
        ProspectError::config(format!(
            "Invalid {} '{}'. Use a format like '500ms', '5s' or '2m'",
            field, value
        ))
    })
}

fn oracle_field(value: &str) -> Result<OracleKind, ProspectError> {
    OracleKind::parse(value).ok_or_else(|| {
        ProspectError::config(format!(
            "Unknown oracle '{}'. Use 'whois', 'rdap' or 'auto'",
            value
        ))
    })
}

impl FileConfig {
    /// Overlay the values present in this file onto `config`.
    pub fn apply_to(&self, mut config: ProspectConfig) -> Result<ProspectConfig, ProspectError> {
        if let Some(search) = &self.search {
            if let Some(max_length) = search.max_length {
                config.max_length = max_length;
            }
            if let Some(alphabet) = &search.alphabet {
                config.alphabet = parse_alphabet(alphabet)?;
            }
            if let Some(tld) = &search.tld {
                config = config.with_tld(tld.as_str());
            }
        }

        if let Some(engine) = &self.engine {
            if let Some(concurrency) = engine.concurrency {
                config.concurrency = concurrency;
            }
            if let Some(rate) = engine.rate {
                config.rate_limit = rate_from_user(rate);
            }
            if let Some(burst) = engine.burst {
                config.burst = burst;
            }
            if let Some(max_attempts) = engine.max_attempts {
                config.max_attempts = max_attempts;
            }
            if let Some(timeout) = &engine.timeout {
                config.timeout = duration_field(timeout, "timeout")?;
            }
            if let Some(base) = &engine.base_backoff {
                config.base_backoff = duration_field(base, "base_backoff")?;
            }
            if let Some(max) = &engine.max_backoff {
                config.max_backoff = duration_field(max, "max_backoff")?;
            }
        }

        if let Some(oracle) = &self.oracle {
            if let Some(kind) = &oracle.kind {
                config.oracle = oracle_field(kind)?;
            }
            if oracle.whois_server.is_some() {
                config.whois_server = oracle.whois_server.clone();
            }
            if oracle.rdap_endpoint.is_some() {
                config.rdap_endpoint = oracle.rdap_endpoint.clone();
            }
        }

        Ok(config)
    }
}

/// Keep `lower` unless `higher` sets a value.
fn pick<T>(lower: Option<T>, higher: Option<T>) -> Option<T> {
    higher.or(lower)
}

/// Field-wise merge of two optional sections.
fn merge_section<T>(lower: Option<T>, higher: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (lower, higher) {
        (Some(lower), Some(higher)) => Some(merge(lower, higher)),
        (lower, higher) => higher.or(lower),
    }
}

/// Configuration discovery and loading.
pub struct ConfigManager {
    /// Log which files were loaded
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load and validate one configuration file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ProspectError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ProspectError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ProspectError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ProspectError::config(format!(
                "Failed to parse TOML configuration '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");

        Ok(config)
    }

    /// Discover configuration files in the standard locations and merge
    /// them, local files overriding global ones.
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn discover_and_load(&self) -> Result<FileConfig, ProspectError> {
        let mut merged = FileConfig::default();
        let mut loaded = Vec::new();

        let locations = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in locations.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged = self.merge_configs(merged, config);
            loaded.push(path);
        }

        if self.verbose {
            for path in &loaded {
                tracing::info!(path = %path.display(), "using configuration file");
            }
        }

        Ok(merged)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-prospect.toml", "./.domain-prospect.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-prospect.toml", "domain-prospect.toml"]
            .iter()
            .map(|name| Path::new(&home).join(name))
            .find(|path| path.exists())
    }

    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-prospect").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            search: merge_section(lower.search, higher.search, |l, h| SearchSection {
                max_length: pick(l.max_length, h.max_length),
                alphabet: pick(l.alphabet, h.alphabet),
                tld: pick(l.tld, h.tld),
            }),
            engine: merge_section(lower.engine, higher.engine, |l, h| EngineSection {
                concurrency: pick(l.concurrency, h.concurrency),
                rate: pick(l.rate, h.rate),
                burst: pick(l.burst, h.burst),
                max_attempts: pick(l.max_attempts, h.max_attempts),
                timeout: pick(l.timeout, h.timeout),
                base_backoff: pick(l.base_backoff, h.base_backoff),
                max_backoff: pick(l.max_backoff, h.max_backoff),
            }),
            oracle: merge_section(lower.oracle, higher.oracle, |l, h| OracleSection {
                kind: pick(l.kind, h.kind),
                whois_server: pick(l.whois_server, h.whois_server),
                rdap_endpoint: pick(l.rdap_endpoint, h.rdap_endpoint),
            }),
            output: merge_section(lower.output, higher.output, |l, h| OutputSection {
                format: pick(l.format, h.format),
                pretty: pick(l.pretty, h.pretty),
                show_taken: pick(l.show_taken, h.show_taken),
                show_unknown: pick(l.show_unknown, h.show_unknown),
            }),
        }
    }

    /// Check a file's values in isolation.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ProspectError> {
        if let Some(search) = &config.search {
            if let Some(alphabet) = &search.alphabet {
                parse_alphabet(alphabet)?;
            }
            if let Some(tld) = &search.tld {
                validate_tld(tld.trim().trim_start_matches('.'))?;
            }
        }

        if let Some(engine) = &config.engine {
            if let Some(concurrency) = engine.concurrency {
                if concurrency == 0 || concurrency > 100 {
                    return Err(ProspectError::config(
                        "Concurrency must be between 1 and 100",
                    ));
                }
            }
            if let Some(rate) = engine.rate {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(ProspectError::config(
                        "Rate must be a positive number of lookups per second (0 = unlimited)",
                    ));
                }
            }
            for (field, value) in [
                ("timeout", &engine.timeout),
                ("base_backoff", &engine.base_backoff),
                ("max_backoff", &engine.max_backoff),
            ] {
                if let Some(value) = value {
                    duration_field(value, field)?;
                }
            }
        }

        if let Some(kind) = config.oracle.as_ref().and_then(|o| o.kind.as_ref()) {
            oracle_field(kind)?;
        }

        if let Some(format) = config.output.as_ref().and_then(|o| o.format.as_ref()) {
            if !matches!(format.as_str(), "text" | "json" | "csv") {
                return Err(ProspectError::config(format!(
                    "Unknown output format '{}'. Use 'text', 'json' or 'csv'",
                    format
                )));
            }
        }

        Ok(())
    }
}

/// Settings taken from `DP_*` environment variables.
///
/// Values are parsed on load; invalid ones are logged and ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub max_length: Option<usize>,
    pub alphabet: Option<Vec<char>>,
    pub tld: Option<String>,
    pub concurrency: Option<usize>,
    /// `Some(None)` means "unlimited"
    pub rate: Option<Option<f64>>,
    pub max_attempts: Option<u32>,
    pub timeout: Option<std::time::Duration>,
    pub oracle: Option<OracleKind>,
    pub config: Option<String>,
}

/// Load configuration from `DP_*` environment variables.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|key| env::var(key).ok())
}

impl EnvConfig {
    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = EnvConfig::default();

        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let ignored = |key: &str, value: &str, hint: &str| {
            tracing::warn!(variable = key, value, "ignoring invalid value, {}", hint);
        };

        if let Some(val) = read("DP_MAX_LENGTH") {
            match val.trim().parse::<usize>() {
                Ok(n) if (MIN_LABEL_LENGTH..=MAX_LABEL_LENGTH).contains(&n) => {
                    env_config.max_length = Some(n)
                }
                _ => ignored("DP_MAX_LENGTH", &val, "must be 3-63"),
            }
        }

        if let Some(val) = read("DP_ALPHABET") {
            match parse_alphabet(&val) {
                Ok(chars) => env_config.alphabet = Some(chars),
                Err(_) => ignored("DP_ALPHABET", &val, "use a preset or a-z, 0-9, '-'"),
            }
        }

        if let Some(val) = read("DP_TLD") {
            let tld = val.trim().trim_start_matches('.').to_lowercase();
            match validate_tld(&tld) {
                Ok(()) => env_config.tld = Some(tld),
                Err(_) => ignored("DP_TLD", &val, "not a valid TLD"),
            }
        }

        if let Some(val) = read("DP_CONCURRENCY") {
            match val.trim().parse::<usize>() {
                Ok(n) if (1..=100).contains(&n) => env_config.concurrency = Some(n),
                _ => ignored("DP_CONCURRENCY", &val, "must be 1-100"),
            }
        }

        if let Some(val) = read("DP_RATE") {
            match val.trim().parse::<f64>() {
                Ok(rate) if rate.is_finite() && rate >= 0.0 => {
                    env_config.rate = Some(rate_from_user(rate))
                }
                _ => ignored("DP_RATE", &val, "must be a non-negative number"),
            }
        }

        if let Some(val) = read("DP_MAX_ATTEMPTS") {
            match val.trim().parse::<u32>() {
                Ok(n) if n > 0 => env_config.max_attempts = Some(n),
                _ => ignored("DP_MAX_ATTEMPTS", &val, "must be at least 1"),
            }
        }

        if let Some(val) = read("DP_TIMEOUT") {
            match parse_duration(&val) {
                Some(timeout) if !timeout.is_zero() => env_config.timeout = Some(timeout),
                _ => ignored("DP_TIMEOUT", &val, "use a format like '5s'"),
            }
        }

        if let Some(val) = read("DP_ORACLE") {
            match OracleKind::parse(&val) {
                Some(kind) => env_config.oracle = Some(kind),
                None => ignored("DP_ORACLE", &val, "use whois, rdap or auto"),
            }
        }

        if let Some(val) = read("DP_CONFIG") {
            env_config.config = Some(val);
        }

        env_config
    }

    /// Overlay the variables that were set onto `config`.
    pub fn apply_to(&self, mut config: ProspectConfig) -> ProspectConfig {
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        if let Some(alphabet) = &self.alphabet {
            config.alphabet = alphabet.clone();
        }
        if let Some(tld) = &self.tld {
            config.tld = tld.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(rate) = self.rate {
            config.rate_limit = rate;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(oracle) = self.oracle {
            config.oracle = oracle;
        }
        config
    }
}

impl ProspectConfig {
    /// Reject configurations that cannot produce a meaningful search.
    ///
    /// These are the only fatal errors; everything after this point is
    /// reported per candidate.
    pub fn validate(&self) -> Result<(), ProspectError> {
        if self.max_length < MIN_LABEL_LENGTH {
            return Err(ProspectError::config(format!(
                "Maximum length must be at least {} (got {})",
                MIN_LABEL_LENGTH, self.max_length
            )));
        }
        if self.max_length > MAX_LABEL_LENGTH {
            return Err(ProspectError::config(format!(
                "Maximum length cannot exceed {} (got {})",
                MAX_LABEL_LENGTH, self.max_length
            )));
        }

        validate_alphabet(&self.alphabet)?;
        validate_tld(&self.tld)?;

        if self.concurrency == 0 || self.concurrency > 100 {
            return Err(ProspectError::config(
                "Concurrency must be between 1 and 100",
            ));
        }

        if let Some(rate) = self.rate_limit {
            if !rate.is_finite() || rate < MIN_RATE {
                return Err(ProspectError::config(format!(
                    "Rate limit must be at least one lookup per day (got {} per second)",
                    rate
                )));
            }
        }
        if self.burst == 0 {
            return Err(ProspectError::config("Burst must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(ProspectError::config("Max attempts must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(ProspectError::config("Timeout must be greater than zero"));
        }
        for (name, value) in [
            ("Timeout", self.timeout),
            ("Base backoff", self.base_backoff),
            ("Max backoff", self.max_backoff),
        ] {
            if value > MAX_DELAY {
                return Err(ProspectError::config(format!(
                    "{} cannot exceed 24 hours (got {:?})",
                    name, value
                )));
            }
        }
        if self.base_backoff > self.max_backoff {
            return Err(ProspectError::config(format!(
                "Base backoff ({:?}) cannot exceed max backoff ({:?})",
                self.base_backoff, self.max_backoff
            )));
        }

        if space_size(self.max_length, self.alphabet.len()).is_none() {
            return Err(ProspectError::config(format!(
                "Candidate space for length {} over {} characters is too large to index",
                self.max_length,
                self.alphabet.len()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"
[search]
max_length = 5
alphabet = "digits"
tld = ".IO"

[engine]
concurrency = 25
rate = 2.5
timeout = "3s"
base_backoff = "250ms"

[oracle]
kind = "rdap"

[output]
format = "csv"
"#,
        );

        let manager = ConfigManager::new(false);
        let loaded = manager.load_file(file.path()).unwrap();
        assert_eq!(loaded.engine.as_ref().unwrap().concurrency, Some(25));
        assert_eq!(
            loaded.output.as_ref().unwrap().format.as_deref(),
            Some("csv")
        );

        let config = loaded.apply_to(ProspectConfig::default()).unwrap();
        assert_eq!(config.max_length, 5);
        assert_eq!(config.alphabet_string(), "0123456789");
        assert_eq!(config.tld, "io");
        assert_eq!(config.concurrency, 25);
        assert_eq!(config.rate_limit, Some(2.5));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.base_backoff, Duration::from_millis(250));
        assert_eq!(config.oracle, OracleKind::Rdap);
        // Untouched values keep their defaults
        assert_eq!(config.max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_rate_means_unlimited() {
        let file = write_config("[engine]\nrate = 0.0\n");
        let loaded = ConfigManager::new(false).load_file(file.path()).unwrap();
        let config = loaded.apply_to(ProspectConfig::default()).unwrap();
        assert_eq!(config.rate_limit, None);
    }

    #[test]
    fn test_invalid_files_are_rejected() {
        let manager = ConfigManager::new(false);
        for content in [
            "[engine]\nconcurrency = 0\n",
            "[engine]\ntimeout = \"soon\"\n",
            "[engine]\nrate = -1.0\n",
            "[search]\nalphabet = \"ABC\"\n",
            "[search]\ntld = \"c m\"\n",
            "[oracle]\nkind = \"dns\"\n",
            "[output]\nformat = \"xml\"\n",
            "this is not toml",
        ] {
            let file = write_config(content);
            assert!(
                manager.load_file(file.path()).is_err(),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigManager::new(false)
            .load_file("/nonexistent/domain-prospect.toml")
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            search: Some(SearchSection {
                max_length: Some(4),
                tld: Some("net".to_string()),
                ..Default::default()
            }),
            engine: Some(EngineSection {
                concurrency: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };

        let higher = FileConfig {
            search: Some(SearchSection {
                max_length: Some(6),
                ..Default::default()
            }),
            output: Some(OutputSection {
                pretty: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        let search = merged.search.unwrap();
        assert_eq!(search.max_length, Some(6)); // Higher wins
        assert_eq!(search.tld.as_deref(), Some("net")); // Lower preserved
        assert_eq!(merged.engine.unwrap().concurrency, Some(10));
        assert_eq!(merged.output.unwrap().pretty, Some(true));
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("DP_MAX_LENGTH", "4"),
            ("DP_ALPHABET", "abc"),
            ("DP_TLD", ".Net"),
            ("DP_CONCURRENCY", "20"),
            ("DP_RATE", "0"),
            ("DP_MAX_ATTEMPTS", "3"),
            ("DP_TIMEOUT", "2s"),
            ("DP_ORACLE", "auto"),
        ]
        .into_iter()
        .collect();

        let env_config = EnvConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config.max_length, Some(4));
        assert_eq!(env_config.alphabet, Some(vec!['a', 'b', 'c']));
        assert_eq!(env_config.tld.as_deref(), Some("net"));
        assert_eq!(env_config.rate, Some(None));

        let config = env_config.apply_to(ProspectConfig::default());
        assert_eq!(config.max_length, 4);
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.rate_limit, None);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.oracle, OracleKind::Auto);
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let vars: HashMap<&str, &str> = [
            ("DP_MAX_LENGTH", "2"),
            ("DP_CONCURRENCY", "500"),
            ("DP_RATE", "fast"),
            ("DP_TIMEOUT", "0s"),
            ("DP_ORACLE", "dns"),
            ("DP_ALPHABET", ""),
        ]
        .into_iter()
        .collect();

        let env_config = EnvConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config, EnvConfig::default());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(ProspectConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_fatal_configs() {
        let base = ProspectConfig::default;

        assert!(base().with_max_length(2).validate().is_err());
        assert!(base().with_max_length(64).validate().is_err());
        assert!(base().with_alphabet(Vec::new()).validate().is_err());
        assert!(base().with_alphabet("aB".chars()).validate().is_err());
        assert!(base().with_tld("").validate().is_err());
        assert!(base().with_max_attempts(0).validate().is_err());
        assert!(base().with_burst(0).validate().is_err());
        assert!(base().with_rate_limit(Some(0.0)).validate().is_err());
        assert!(base().with_rate_limit(Some(f64::NAN)).validate().is_err());
        assert!(base().with_timeout(Duration::ZERO).validate().is_err());
        assert!(base()
            .with_backoff(Duration::from_secs(10), Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(base()
            .with_alphabet(parse_alphabet("alnum").unwrap())
            .with_max_length(40)
            .validate()
            .is_err());

        let mut config = base();
        config.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_unlimited_rate() {
        assert!(ProspectConfig::default()
            .with_rate_limit(None)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_bounds_rates_and_delays() {
        let base = ProspectConfig::default;
        let huge = Duration::from_secs(u64::MAX);

        assert!(base().with_rate_limit(Some(1e-30)).validate().is_err());
        assert!(base().with_rate_limit(Some(MIN_RATE)).validate().is_ok());

        assert!(base().with_timeout(huge).validate().is_err());
        assert!(base()
            .with_backoff(Duration::from_millis(500), huge)
            .validate()
            .is_err());
        assert!(base()
            .with_backoff(MAX_DELAY, MAX_DELAY)
            .with_timeout(MAX_DELAY)
            .validate()
            .is_ok());
    }
}
