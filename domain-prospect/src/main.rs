//! Domain Prospect CLI Application
//!
//! Searches every domain label up to a given length for names that are not
//! registered, using domain-prospect-lib. This crate owns argument parsing,
//! configuration precedence, output formatting, Ctrl-C handling and
//! checkpoint files.

mod checkpoint;
mod ui;

use checkpoint::Checkpoint;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_prospect_lib::{
    build_oracle, load_env_config, parse_alphabet, parse_duration, rate_from_user, ConfigManager,
    EnvConfig, FileConfig, OracleKind, ProspectConfig, Prospector,
};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use ui::{OutputFormat, OutputOptions};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Candidates listed by `--dry-run`.
const DRY_RUN_SAMPLE: usize = 10;

/// Exit status of a search stopped by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI arguments for domain-prospect
#[derive(Parser, Debug)]
#[command(name = "domain-prospect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find unregistered domain names by searching every short label")]
#[command(
    long_about = "Find unregistered domain names by searching every label up to a maximum length.\n\nLookups go through WHOIS, RDAP, or RDAP with WHOIS fallback, under a concurrency\nbudget and a shared rate limit. Names whose status could not be determined are\nretried with backoff and reported separately from available names."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Longest label to generate (3-63, default: 7)
    #[arg(
        short = 'l',
        long = "max-length",
        value_name = "N",
        help_heading = "Search Space"
    )]
    pub max_length: Option<usize>,

    /// Characters to use: letters, digits, alnum, or a literal list like "abc123"
    #[arg(
        short = 'a',
        long = "alphabet",
        value_name = "ALPHABET",
        help_heading = "Search Space"
    )]
    pub alphabet: Option<String>,

    /// TLD to search under (default: com)
    #[arg(short = 't', long = "tld", value_name = "TLD", help_heading = "Search Space")]
    pub tld: Option<String>,

    /// First generation index to search (takes precedence over --checkpoint)
    #[arg(long = "start-index", value_name = "INDEX", help_heading = "Search Space")]
    pub start_index: Option<u64>,

    /// Stop after this many candidates
    #[arg(long = "limit", value_name = "N", help_heading = "Search Space")]
    pub limit: Option<u64>,

    /// Show the search space without looking anything up
    #[arg(long = "dry-run", help_heading = "Search Space")]
    pub dry_run: bool,

    /// Max concurrent lookups (default: 10, max: 100)
    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub concurrency: Option<usize>,

    /// Lookups per second across all workers, 0 for unlimited (default: 5)
    #[arg(long = "rate", value_name = "PER_SEC", help_heading = "Performance")]
    pub rate: Option<f64>,

    /// Lookups allowed back to back before the rate applies (default: 5)
    #[arg(long = "burst", value_name = "N", help_heading = "Performance")]
    pub burst: Option<u32>,

    /// Attempts per candidate before giving up (default: 5)
    #[arg(long = "max-attempts", value_name = "N", help_heading = "Performance")]
    pub max_attempts: Option<u32>,

    /// Per-lookup timeout, e.g. "5s" or "800ms" (default: 5s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// First retry delay (default: 500ms)
    #[arg(long = "base-backoff", value_name = "DURATION", help_heading = "Performance")]
    pub base_backoff: Option<String>,

    /// Longest retry delay and rate-limit pause (default: 30s)
    #[arg(long = "max-backoff", value_name = "DURATION", help_heading = "Performance")]
    pub max_backoff: Option<String>,

    /// Lookup mechanism: whois, rdap or auto (default: whois)
    #[arg(long = "oracle", value_name = "KIND", help_heading = "Oracle")]
    pub oracle: Option<String>,

    /// WHOIS server to query instead of the client's default
    #[arg(long = "whois-server", value_name = "HOST", help_heading = "Oracle")]
    pub whois_server: Option<String>,

    /// RDAP base URL, e.g. "https://rdap.example/domain/"
    #[arg(long = "rdap-endpoint", value_name = "URL", help_heading = "Oracle")]
    pub rdap_endpoint: Option<String>,

    /// Output one JSON object per result
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output results in CSV format
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Header, progress counters and colors
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Also list registered names
    #[arg(long = "show-taken", help_heading = "Output Format")]
    pub show_taken: bool,

    /// Also list names whose status could not be determined
    #[arg(long = "show-unknown", help_heading = "Output Format")]
    pub show_unknown: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Resume from and save progress to this file
    #[arg(long = "checkpoint", value_name = "FILE", help_heading = "Configuration")]
    pub checkpoint: Option<PathBuf>,

    /// Debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    match run(args).await {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Log filter used when `RUST_LOG` is not set.
fn default_log_filter(args: &Args) -> String {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        return "warn".to_string();
    };
    format!("warn,domain_prospect={0},domain_prospect_lib={0}", level)
}

/// Send logs to stderr so stdout stays machine-readable.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(args)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Validate command line arguments that do not depend on other sources.
fn validate_args(args: &Args) -> Result<(), String> {
    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if args.pretty && (args.json || args.csv) {
        return Err("--pretty only applies to text output".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 100 {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if let Some(rate) = args.rate {
        if !rate.is_finite() || rate < 0.0 {
            return Err("--rate must be a non-negative number (0 = unlimited)".to_string());
        }
    }

    if args.burst == Some(0) {
        return Err("--burst must be at least 1".to_string());
    }

    if args.max_attempts == Some(0) {
        return Err("--max-attempts must be at least 1".to_string());
    }

    for (flag, value) in [
        ("--timeout", &args.timeout),
        ("--base-backoff", &args.base_backoff),
        ("--max-backoff", &args.max_backoff),
    ] {
        if let Some(value) = value {
            cli_duration(flag, value)?;
        }
    }

    if let Some(oracle) = &args.oracle {
        cli_oracle(oracle)?;
    }

    Ok(())
}

fn cli_duration(flag: &str, value: &str) -> Result<Duration, String> {
    parse_duration(value).ok_or_else(|| {
        format!(
            "Invalid {} '{}'. Use a format like '500ms', '5s' or '2m'",
            flag, value
        )
    })
}

fn cli_oracle(value: &str) -> Result<OracleKind, String> {
    OracleKind::parse(value).ok_or_else(|| {
        format!(
            "Unknown oracle '{}'. Use 'whois', 'rdap' or 'auto'",
            value
        )
    })
}

/// Build the search and output configuration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (DP_*)
/// 3. Local config file (./domain-prospect.toml)
/// 4. Global config file (~/.domain-prospect.toml)
/// 5. XDG config file (~/.config/domain-prospect/config.toml)
/// 6. Built-in defaults
fn build_config(
    args: &Args,
) -> Result<(ProspectConfig, OutputOptions), Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config();

    let file_config = if let Some(path) = &args.config {
        tracing::info!(path, "using explicit config file (--config)");
        config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
    } else if let Some(path) = &env_config.config {
        tracing::info!(path, "using explicit config file (DP_CONFIG)");
        config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
    } else {
        config_manager.discover_and_load()?
    };

    let config = layer_config(&file_config, &env_config, args)?;
    let output = resolve_output(&file_config, args)?;
    Ok((config, output))
}

/// Apply the file, environment and CLI layers over the defaults.
fn layer_config(
    file_config: &FileConfig,
    env_config: &EnvConfig,
    args: &Args,
) -> Result<ProspectConfig, Box<dyn std::error::Error>> {
    let config = file_config.apply_to(ProspectConfig::default())?;
    let config = env_config.apply_to(config);
    apply_cli_args_to_config(config, args)
}

/// Apply CLI arguments to config (highest precedence).
///
/// Only flags the user actually passed override lower layers.
fn apply_cli_args_to_config(
    mut config: ProspectConfig,
    args: &Args,
) -> Result<ProspectConfig, Box<dyn std::error::Error>> {
    if let Some(max_length) = args.max_length {
        config.max_length = max_length;
    }
    if let Some(alphabet) = &args.alphabet {
        config.alphabet = parse_alphabet(alphabet)?;
    }
    if let Some(tld) = &args.tld {
        config = config.with_tld(tld.as_str());
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(rate) = args.rate {
        config.rate_limit = rate_from_user(rate);
    }
    if let Some(burst) = args.burst {
        config.burst = burst;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(timeout) = &args.timeout {
        config.timeout = cli_duration("--timeout", timeout)?;
    }
    if let Some(base) = &args.base_backoff {
        config.base_backoff = cli_duration("--base-backoff", base)?;
    }
    if let Some(max) = &args.max_backoff {
        config.max_backoff = cli_duration("--max-backoff", max)?;
    }
    if let Some(start_index) = args.start_index {
        config.start_index = start_index;
    }
    if args.limit.is_some() {
        config.limit = args.limit;
    }
    if let Some(oracle) = &args.oracle {
        config.oracle = cli_oracle(oracle)?;
    }
    if args.whois_server.is_some() {
        config.whois_server = args.whois_server.clone();
    }
    if args.rdap_endpoint.is_some() {
        config.rdap_endpoint = args.rdap_endpoint.clone();
    }

    Ok(config)
}

/// Output settings from the `[output]` section, overridden by flags.
fn resolve_output(file_config: &FileConfig, args: &Args) -> Result<OutputOptions, String> {
    let mut options = OutputOptions::default();

    if let Some(output) = &file_config.output {
        if let Some(format) = &output.format {
            options.format = OutputFormat::parse(format)
                .ok_or_else(|| format!("Unknown output format '{}' in config", format))?;
        }
        options.pretty = output.pretty.unwrap_or(false);
        options.show_taken = output.show_taken.unwrap_or(false);
        options.show_unknown = output.show_unknown.unwrap_or(false);
    }

    if args.json {
        options.format = OutputFormat::Json;
    } else if args.csv {
        options.format = OutputFormat::Csv;
    }
    if options.format != OutputFormat::Text {
        options.pretty = false;
    }

    if args.pretty {
        options.pretty = true;
    }
    if args.show_taken {
        options.show_taken = true;
    }
    if args.show_unknown {
        options.show_unknown = true;
    }

    Ok(options)
}

/// Main search logic. Returns the process exit code.
async fn run(args: Args) -> Result<i32, Box<dyn std::error::Error>> {
    let (mut config, output) = build_config(&args)?;

    if let Some(path) = &args.checkpoint {
        if args.start_index.is_none() {
            if let Some(saved) = Checkpoint::load(path)? {
                let resume = saved.resume_index(&config)?;
                tracing::info!(path = %path.display(), resume, "resuming from checkpoint");
                config.start_index = resume;
            }
        }
    }

    let oracle = build_oracle(&config)?;
    let oracle_name = oracle.name().to_string();
    let cancel = CancellationToken::new();
    let prospector =
        Prospector::with_shared_oracle(config.clone(), oracle)?.with_cancellation(cancel.clone());

    if args.dry_run {
        print_dry_run(&prospector, &oracle_name, output.format)?;
        return Ok(0);
    }

    tokio::spawn(watch_for_interrupt(cancel));

    let start = config.start_index.min(prospector.end_index());
    let total = prospector.end_index() - start;

    if output.pretty {
        ui::print_header(&mut std::io::stdout(), &config, &oracle_name, total);
    }

    let mut reporter = ui::build_reporter(output, total, std::io::stdout());
    let progress = ui::Progress::start(prospector.state(), total);
    let summary = prospector.run(reporter.as_mut()).await;
    if let Some(progress) = progress {
        progress.stop().await;
    }

    if let Some(path) = &args.checkpoint {
        Checkpoint::from_summary(&config, &summary).save(path)?;
        tracing::info!(path = %path.display(), watermark = summary.counts.watermark, "checkpoint saved");
    }

    if summary.cancelled {
        if output.format != OutputFormat::Text {
            eprintln!(
                "Interrupted. Resume with --start-index {}",
                summary.counts.watermark
            );
        }
        return Ok(EXIT_INTERRUPTED);
    }

    Ok(0)
}

/// First Ctrl-C stops admitting new lookups; a second one exits at once.
async fn watch_for_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::warn!("interrupt received, waiting for in-flight lookups (Ctrl-C again to abort)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        process::exit(EXIT_INTERRUPTED);
    }
}

/// Describe the search space without any lookups.
fn print_dry_run(
    prospector: &Prospector,
    oracle: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = prospector.config();
    let space = prospector.space();
    let end = prospector.end_index();
    let start = config.start_index.min(end);

    let sample: Vec<String> = space
        .iter_from(start)
        .take_while(|c| c.index < end)
        .take(DRY_RUN_SAMPLE)
        .map(|c| c.domain)
        .collect();

    if format == OutputFormat::Json {
        let report = serde_json::json!({
            "space_size": space.len(),
            "start_index": start,
            "end_index": end,
            "candidates": end - start,
            "tld": config.tld,
            "max_length": config.max_length,
            "alphabet": config.alphabet_string(),
            "oracle": oracle,
            "sample": sample,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Search space: {} candidates (.{}, length 3-{}, alphabet \"{}\")",
        space.len(),
        config.tld,
        config.max_length,
        config.alphabet_string()
    );
    println!(
        "Would check indices {}..{} ({} candidates) with the {} oracle",
        start,
        end,
        end - start,
        oracle
    );
    for domain in &sample {
        println!("  {}", domain);
    }
    let remaining = (end - start).saturating_sub(sample.len() as u64);
    if remaining > 0 {
        println!("  ... and {} more", remaining);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["domain-prospect"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn file_config(toml_src: &str) -> FileConfig {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml_src).unwrap();
        ConfigManager::new(false).load_file(&path).unwrap()
    }

    #[test]
    fn test_validate_args_conflicting_formats() {
        assert!(validate_args(&args(&["--json", "--csv"])).is_err());
        assert!(validate_args(&args(&["--json", "--pretty"])).is_err());
        assert!(validate_args(&args(&["--json"])).is_ok());
    }

    #[test]
    fn test_validate_args_ranges() {
        assert!(validate_args(&args(&["-c", "0"])).is_err());
        assert!(validate_args(&args(&["-c", "101"])).is_err());
        assert!(validate_args(&args(&["-c", "100"])).is_ok());
        assert!(validate_args(&args(&["--rate", "0"])).is_ok());
        assert!(validate_args(&args(&["--max-attempts", "0"])).is_err());
        assert!(validate_args(&args(&["--burst", "0"])).is_err());
        assert!(validate_args(&args(&["--timeout", "soon"])).is_err());
        assert!(validate_args(&args(&["--oracle", "dns"])).is_err());
        assert!(validate_args(&args(&["--oracle", "AUTO"])).is_ok());
    }

    #[test]
    fn test_default_log_filter() {
        assert_eq!(default_log_filter(&args(&[])), "warn");
        assert!(default_log_filter(&args(&["-v"])).contains("domain_prospect_lib=info"));
        assert!(default_log_filter(&args(&["-v", "-d"])).contains("domain_prospect_lib=debug"));
    }

    #[test]
    fn test_cli_overrides_env_and_file() {
        let file = file_config(
            r#"
[search]
max_length = 5
alphabet = "digits"
tld = "io"

[engine]
concurrency = 8
rate = 2.0
"#,
        );
        let env = EnvConfig {
            tld: Some("net".to_string()),
            concurrency: Some(12),
            ..EnvConfig::default()
        };

        let config = layer_config(&file, &env, &args(&["-c", "3", "--rate", "0"])).unwrap();
        assert_eq!(config.max_length, 5);
        assert_eq!(config.alphabet_string(), "0123456789");
        assert_eq!(config.tld, "net");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.rate_limit, None);
    }

    #[test]
    fn test_unset_flags_keep_lower_layers() {
        let env = EnvConfig {
            max_attempts: Some(9),
            oracle: Some(OracleKind::Rdap),
            ..EnvConfig::default()
        };
        let config = layer_config(&FileConfig::default(), &env, &args(&[])).unwrap();
        assert_eq!(config.max_attempts, 9);
        assert_eq!(config.oracle, OracleKind::Rdap);
        assert_eq!(config.rate_limit, Some(5.0));
    }

    #[test]
    fn test_cli_search_flags() {
        let config = apply_cli_args_to_config(
            ProspectConfig::default(),
            &args(&[
                "-l",
                "4",
                "-a",
                "xyz",
                "-t",
                ".ORG",
                "--start-index",
                "40",
                "--limit",
                "10",
                "--timeout",
                "800ms",
                "--max-backoff",
                "1m",
            ]),
        )
        .unwrap();
        assert_eq!(config.max_length, 4);
        assert_eq!(config.alphabet, vec!['x', 'y', 'z']);
        assert_eq!(config.tld, "org");
        assert_eq!(config.start_index, 40);
        assert_eq!(config.limit, Some(10));
        assert_eq!(config.timeout, Duration::from_millis(800));
        assert_eq!(config.max_backoff, Duration::from_secs(60));

        assert!(apply_cli_args_to_config(ProspectConfig::default(), &args(&["-a", "ABC"])).is_err());
    }

    #[test]
    fn test_resolve_output() {
        let file = file_config(
            r#"
[output]
format = "csv"
show_unknown = true
"#,
        );

        let options = resolve_output(&file, &args(&[])).unwrap();
        assert_eq!(options.format, OutputFormat::Csv);
        assert!(options.show_unknown);
        assert!(!options.show_taken);

        let options = resolve_output(&file, &args(&["--json", "--show-taken"])).unwrap();
        assert_eq!(options.format, OutputFormat::Json);
        assert!(options.show_taken);

        let options = resolve_output(&FileConfig::default(), &args(&["--pretty"])).unwrap();
        assert_eq!(options.format, OutputFormat::Text);
        assert!(options.pretty);
    }
}
