//! Output for the domain-prospect CLI.
//!
//! Every output mode is a [`Reporter`] writing to a generic sink: text
//! (plain or `--pretty`), JSON Lines and CSV. Text mode keeps names that
//! were confirmed available visibly apart from names whose status could
//! not be determined. Uses only the `console` crate for styling.

use console::{pad_str, style, Alignment, Term};
use domain_prospect_lib::{
    format_duration, IndeterminateReason, LookupOutcome, OutcomeRecord, ProspectConfig, Reporter,
    SearchState, SearchSummary,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DOMAIN_WIDTH: usize = 30;

/// Structured or human output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" | "jsonl" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Resolved output settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub show_taken: bool,
    pub show_unknown: bool,
}

/// Build the reporter for `options`, writing to `out`.
///
/// `total` is the number of candidates the run covers; pretty mode uses
/// it for the `[n/total]` counter.
pub fn build_reporter<W>(options: OutputOptions, total: u64, out: W) -> Box<dyn Reporter>
where
    W: Write + 'static,
{
    match options.format {
        OutputFormat::Text => Box::new(TextReporter::new(out, options, total)),
        OutputFormat::Json => Box::new(JsonLinesReporter { out }),
        OutputFormat::Csv => Box::new(CsvReporter::new(out)),
    }
}

// ── Progress ─────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Live progress line on stderr, driven by the engine's counters.
///
/// Only shown when stderr is a terminal and stdout is not, so result lines
/// and the progress line never share a screen.
pub struct Progress {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Progress {
    pub fn start(state: Arc<SearchState>, total: u64) -> Option<Self> {
        if !Term::stderr().is_term() || Term::stdout().is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let snapshot = state.snapshot();
                let _ = term.clear_line();
                let _ = term.write_str(&format!(
                    "{} {}/{} checked  {} available  {} retries",
                    style(frame).cyan(),
                    snapshot.completed,
                    total,
                    style(snapshot.available).green(),
                    snapshot.retries,
                ));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header<W: Write>(out: &mut W, config: &ProspectConfig, oracle: &str, total: u64) {
    let _ = writeln!(
        out,
        "{} {} {}",
        style("domain-prospect").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· Searching {} candidate{}",
            total,
            if total == 1 { "" } else { "s" }
        ))
        .dim(),
    );

    let rate = match config.rate_limit {
        Some(rate) => format!("{}/s", rate),
        None => "unlimited".to_string(),
    };
    let meta = [
        format!(".{}", config.tld),
        format!("Length 3-{}", config.max_length),
        format!("Alphabet: {}", config.alphabet_string()),
        format!("Oracle: {}", oracle),
        format!("Concurrency: {}", config.concurrency),
        format!("Rate: {}", rate),
    ];
    let _ = writeln!(out, "{}", style(meta.join(" | ")).dim());
    let _ = writeln!(out);
}

// ── Text ─────────────────────────────────────────────────────────────────────

/// Human-readable output with a grouped summary at the end.
pub struct TextReporter<W: Write> {
    out: W,
    options: OutputOptions,
    total: u64,
    completed: u64,
    available: u64,
    registered: u64,
    reasons: BTreeMap<IndeterminateReason, u64>,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W, options: OutputOptions, total: u64) -> Self {
        Self {
            out,
            options,
            total,
            completed: 0,
            available: 0,
            registered: 0,
            reasons: BTreeMap::new(),
        }
    }

    fn should_print(&self, outcome: &LookupOutcome) -> bool {
        match outcome {
            LookupOutcome::Available => true,
            LookupOutcome::Registered => self.options.show_taken,
            LookupOutcome::Indeterminate(_) => self.options.show_unknown,
        }
    }

    fn print_line(&mut self, record: &OutcomeRecord) {
        let padded = pad_str(
            &record.candidate.domain,
            DOMAIN_WIDTH,
            Alignment::Left,
            Some(".."),
        );

        let prefix = if self.options.pretty {
            format!(
                "{} ",
                style(format!("[{}/{}]", self.completed, self.total)).dim()
            )
        } else {
            String::new()
        };

        let status = match record.outcome {
            LookupOutcome::Available => style("AVAILABLE").green().bold().to_string(),
            LookupOutcome::Registered => style("TAKEN").red().bold().to_string(),
            LookupOutcome::Indeterminate(reason) => format!(
                "{}  {}",
                style("UNKNOWN").yellow(),
                style(format!(
                    "({}, {} attempt{})",
                    reason,
                    record.attempts,
                    if record.attempts == 1 { "" } else { "s" }
                ))
                .dim()
            ),
        };

        let _ = writeln!(self.out, "  {}{}  {}", prefix, padded, status);
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn record(&mut self, record: &OutcomeRecord) {
        self.completed += 1;
        match record.outcome {
            LookupOutcome::Available => self.available += 1,
            LookupOutcome::Registered => self.registered += 1,
            LookupOutcome::Indeterminate(reason) => *self.reasons.entry(reason).or_insert(0) += 1,
        }

        if self.should_print(&record.outcome) {
            self.print_line(record);
        }
    }

    fn finish(&mut self, summary: &SearchSummary) {
        let _ = write_summary(
            &mut self.out,
            summary,
            self.available,
            self.registered,
            &self.reasons,
        );
        let _ = self.out.flush();
    }
}

/// Final summary: totals, then indeterminate counts per reason, then a
/// resume hint when the run did not cover its whole range.
fn write_summary<W: Write>(
    out: &mut W,
    summary: &SearchSummary,
    available: u64,
    registered: u64,
    reasons: &BTreeMap<IndeterminateReason, u64>,
) -> std::io::Result<()> {
    let unknown: u64 = reasons.values().sum();
    let checked = available + registered + unknown;

    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    )?;
    writeln!(
        out,
        "  {} candidate{} in {}  {}  {}  {}  {}  {}  {}",
        style(checked).bold(),
        if checked == 1 { "" } else { "s" },
        format_duration(summary.elapsed),
        style("|").dim(),
        style(format!("{} available", available)).green(),
        style("|").dim(),
        style(format!("{} taken", registered)).red(),
        style("|").dim(),
        style(format!("{} unknown", unknown)).yellow(),
    )?;

    if unknown > 0 {
        writeln!(
            out,
            "  {}",
            style(format!(
                "Could not determine {} candidate{} (not counted as available):",
                unknown,
                if unknown == 1 { "" } else { "s" }
            ))
            .yellow()
        )?;
        for (reason, count) in reasons {
            writeln!(out, "  {} {} {}", style("•").dim(), count, reason)?;
        }
    }

    if summary.counts.retries > 0 {
        writeln!(
            out,
            "  {}",
            style(format!("{} retries", summary.counts.retries)).dim()
        )?;
    }

    if !summary.is_complete() {
        writeln!(
            out,
            "  {} {}",
            style(if summary.cancelled {
                "Interrupted."
            } else {
                "Stopped early."
            })
            .yellow(),
            style(format!(
                "Resume with --start-index {}",
                summary.counts.watermark
            ))
            .bold(),
        )?;
    }

    Ok(())
}

// ── JSON Lines ───────────────────────────────────────────────────────────────

/// One JSON object per outcome.
pub struct JsonLinesReporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter for JsonLinesReporter<W> {
    fn record(&mut self, record: &OutcomeRecord) {
        match serde_json::to_string(record) {
            Ok(line) => {
                let _ = writeln!(self.out, "{}", line);
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize record"),
        }
    }

    fn finish(&mut self, _summary: &SearchSummary) {
        let _ = self.out.flush();
    }
}

// ── CSV ──────────────────────────────────────────────────────────────────────

pub struct CsvReporter<W: Write> {
    out: W,
    wrote_header: bool,
}

impl<W: Write> CsvReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            wrote_header: false,
        }
    }
}

impl<W: Write> Reporter for CsvReporter<W> {
    fn record(&mut self, record: &OutcomeRecord) {
        if !self.wrote_header {
            let _ = writeln!(self.out, "index,domain,status,reason,attempts,elapsed_ms");
            self.wrote_header = true;
        }

        let (status, reason) = match record.outcome {
            LookupOutcome::Available => ("available", "-"),
            LookupOutcome::Registered => ("registered", "-"),
            LookupOutcome::Indeterminate(reason) => ("indeterminate", reason.as_str()),
        };

        // Generated names are [a-z0-9-] only, so no quoting is needed
        let _ = writeln!(
            self.out,
            "{},{},{},{},{},{}",
            record.candidate.index,
            record.candidate.domain,
            status,
            reason,
            record.attempts,
            record.elapsed.as_millis(),
        );
    }

    fn finish(&mut self, _summary: &SearchSummary) {
        let _ = self.out.flush();
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
