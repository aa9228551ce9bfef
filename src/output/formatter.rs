//! Output formatters for run results
//!
//! Provides JSON, table, CSV, and summary output formats.

use crate::models::{BatchSummary, Outcome, RunStatus};
use crate::protocol::{StatusMessage, Transcript};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format one status message as it arrives
    pub fn format_message(&self, message: &StatusMessage) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                format!("{}\n", message.to_json().unwrap_or_default())
            }
            _ => match message {
                StatusMessage::Write { message } => message.clone(),
                StatusMessage::WriteLine { message } => format!("{message}\n"),
                StatusMessage::Ready => self.paint("── ready ──\n", "36"),
                StatusMessage::Finished { .. } => String::new(),
            },
        }
    }

    /// Format a single outcome
    pub fn format_outcome(&self, outcome: &Outcome) -> String {
        match self.format {
            OutputFormat::Table => self.format_outcome_table(outcome),
            OutputFormat::Json => serde_json::to_string(outcome).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(outcome).unwrap_or_default(),
            OutputFormat::Csv => write_csv(std::slice::from_ref(outcome))
                .unwrap_or_default()
                .trim_end()
                .to_string(),
            OutputFormat::Summary => outcome.to_string(),
        }
    }

    fn format_outcome_table(&self, outcome: &Outcome) -> String {
        let status = match outcome.status {
            RunStatus::Pass => self.paint("✓ PASS", "32"),
            RunStatus::Fail => self.paint("✗ FAIL", "31"),
            RunStatus::Error => self.paint("! ERROR", "31"),
        };

        let mut line = format!(
            "{:20} {} [{:>6}ms] ready={}",
            outcome.test_id, status, outcome.duration_ms, outcome.ready
        );
        if let Some(exception) = &outcome.exception {
            line.push_str(&format!("\n    {exception}"));
        }
        line
    }

    /// Format a complete transcript
    pub fn format_transcript(&self, transcript: &Transcript) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(transcript).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(transcript).unwrap_or_default(),
            _ => transcript
                .messages
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" → "),
        }
    }

    /// Format batch summary
    pub fn format_summary(&self, summary: &BatchSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => write_csv(&summary.outcomes).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &BatchSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!("║  Batch of {:3} runs{:44}║\n", summary.total, ""));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        for outcome in &summary.outcomes {
            output.push_str(&format!("  {}\n", self.format_outcome_table(outcome)));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        let pass_str = self.paint(&summary.passed.to_string(), "32");
        let fail_str = if summary.failed > 0 {
            self.paint(&summary.failed.to_string(), "31")
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            "║  Total: {:2} | Pass: {} | Fail: {} | Error: {:2}\n",
            summary.total, pass_str, fail_str, summary.errors
        ));
        output.push_str(&format!(
            "║  Pass Rate: {:5.1}% | Duration: {:6}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_summary_brief(&self, summary: &BatchSummary) -> String {
        format!(
            "{}/{} passed ({:.1}%), {} failed, {} errors in {}ms",
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.failed,
            summary.errors,
            summary.total_duration_ms
        )
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.colorize {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

const CSV_HEADER: [&str; 5] = ["test_id", "status", "ready", "duration_ms", "exception"];

/// One header row, then one row per outcome
fn write_csv(outcomes: &[Outcome]) -> csv::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for outcome in outcomes {
        let status = outcome.status.to_string();
        let ready = outcome.ready.to_string();
        let duration_ms = outcome.duration_ms.to_string();
        writer.write_record([
            outcome.test_id.as_str(),
            status.as_str(),
            ready.as_str(),
            duration_ms.as_str(),
            outcome.exception.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
