use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use purgekit_engine::{BackendState, BackendStatus, Dispatch, PurgeReport, StatusSnapshot};
use std::io::Write;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_snapshot(&self, snapshot: &StatusSnapshot, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.snapshot_pretty(snapshot)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(snapshot)? + "\n"),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.snapshot_table(snapshot)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => {
                // Fallback to pretty format when table feature is disabled
                Ok(self.snapshot_pretty(snapshot))
            }
        }
    }

    pub fn format_report(&self, report: &PurgeReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.report_pretty(report)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)? + "\n"),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.report_table(report)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.report_pretty(report)),
        }
    }

    pub fn format_dispatch(&self, dispatch: &Dispatch, format: OutputFormat) -> Result<String> {
        match (dispatch, format) {
            (Dispatch::Completed(report), _) => self.format_report(report, format),
            (Dispatch::Detached { .. }, OutputFormat::Json) => {
                Ok(serde_json::to_string_pretty(dispatch)? + "\n")
            }
            (Dispatch::Detached { id, accepted_at }, _) => Ok(format!(
                "{} {} (accepted {})\n",
                self.colorize("Purge accepted:", &Color::Green, true),
                self.colorize(&id.to_string(), &Color::Cyan, false),
                accepted_at.format("%Y-%m-%d %H:%M:%S UTC"),
            )),
        }
    }

    fn snapshot_pretty(&self, snapshot: &StatusSnapshot) -> String {
        let mut output = String::new();

        output.push_str(&self.colorize("Cache Backends:", &Color::Green, true));
        output.push('\n');
        for status in snapshot.statuses.values() {
            output.push_str(&self.status_line(status));
        }

        output.push('\n');
        output.push_str(&self.colorize("Last Purge:", &Color::Green, true));
        output.push('\n');
        match &snapshot.last_purge {
            Some(report) => {
                output.push_str(&format!(
                    "  {} ({}, {})\n",
                    report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    format_age(report.age()),
                    report.trigger,
                ));
                for line in report.summary_message.lines() {
                    output.push_str(&format!("  {}\n", self.summary_line(line)));
                }
            }
            None => output.push_str("  No purge has been recorded yet\n"),
        }

        output
    }

    fn status_line(&self, status: &BackendStatus) -> String {
        let state = self.colorize(status.state.as_str(), &state_color(status.state), true);
        let mechanism = status
            .mechanism
            .as_deref()
            .map(|m| format!(" [{m}]"))
            .unwrap_or_default();

        format!(
            "  {}: {}{} - {}\n",
            self.colorize(status.kind.label(), &Color::Yellow, false),
            state,
            mechanism,
            status.detail
        )
    }

    fn report_pretty(&self, report: &PurgeReport) -> String {
        let mut output = String::new();
        let headline = if report.overall_success {
            self.colorize("Purge finished", &Color::Green, true)
        } else {
            self.colorize("Purge failed", &Color::Red, true)
        };
        output.push_str(&format!(
            "{headline} {}\n",
            self.colorize(&report.id.to_string(), &Color::Cyan, false)
        ));
        for line in report.summary_message.lines() {
            output.push_str(&format!("  {}\n", self.summary_line(line)));
        }
        output
    }

    fn summary_line(&self, line: &str) -> String {
        if line.starts_with('✓') {
            self.colorize(line, &Color::Green, false)
        } else if line.starts_with('✗') {
            self.colorize(line, &Color::Red, false)
        } else {
            line.to_string()
        }
    }

    #[cfg(feature = "table-output")]
    fn snapshot_table(&self, snapshot: &StatusSnapshot) -> String {
        #[derive(Tabled)]
        struct StatusRow {
            #[tabled(rename = "Backend")]
            backend: &'static str,
            #[tabled(rename = "State")]
            state: &'static str,
            #[tabled(rename = "Mechanism")]
            mechanism: String,
            #[tabled(rename = "Detail")]
            detail: String,
        }

        let rows = snapshot.statuses.values().map(|status| StatusRow {
            backend: status.kind.label(),
            state: status.state.as_str(),
            mechanism: status.mechanism.clone().unwrap_or_else(|| "-".to_string()),
            detail: status.detail.clone(),
        });

        let mut output = Table::new(rows).with(Style::modern()).to_string();
        output.push('\n');
        if let Some(report) = &snapshot.last_purge {
            output.push_str(&format!(
                "\nLast purge {} ({}):\n",
                format_age(report.age()),
                report.trigger
            ));
            output.push_str(&self.report_table(report));
        }
        output
    }

    #[cfg(feature = "table-output")]
    fn report_table(&self, report: &PurgeReport) -> String {
        #[derive(Tabled)]
        struct OutcomeRow {
            #[tabled(rename = "Backend")]
            backend: &'static str,
            #[tabled(rename = "Result")]
            result: &'static str,
            #[tabled(rename = "Failure")]
            failure: String,
            #[tabled(rename = "Time (ms)")]
            elapsed_ms: u64,
            #[tabled(rename = "Message")]
            message: String,
        }

        let rows = report.outcomes.iter().map(|outcome| OutcomeRow {
            backend: outcome.kind.label(),
            result: if outcome.succeeded { "purged" } else { "failed" },
            failure: outcome
                .failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "-".to_string()),
            elapsed_ms: outcome.elapsed_ms,
            message: outcome.message.clone(),
        });

        let mut output = Table::new(rows).with(Style::modern()).to_string();
        output.push('\n');
        output
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Red => text.red(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Red,
    Cyan,
}

fn state_color(state: BackendState) -> Color {
    match state {
        BackendState::Active => Color::Green,
        BackendState::Inactive | BackendState::Disabled | BackendState::NotConfigured => {
            Color::Yellow
        }
        BackendState::NotConnected | BackendState::Error => Color::Red,
    }
}

/// Coarse "how long ago": `just now`, `42s ago`, `5m ago`, `3h ago`, `2d ago`
pub fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        0..=1 => "just now".to_string(),
        2..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

pub fn write_output(content: &str) -> Result<()> {
    print!("{content}");
    std::io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use purgekit_engine::{BackendKind, FailureKind, PurgeOutcome, TriggerSource};
    use std::collections::BTreeMap;

    fn report() -> PurgeReport {
        PurgeReport::new(
            uuid::Uuid::nil(),
            TriggerSource::CommandLine,
            vec![BackendKind::EdgeCache, BackendKind::CdnCache],
            vec![
                PurgeOutcome::success(BackendKind::EdgeCache, "Removed 4 entries from /cache"),
                PurgeOutcome::failure(
                    BackendKind::CdnCache,
                    FailureKind::Logical,
                    "CDN rejected purge: invalid zone (code 1049)",
                ),
            ],
        )
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::zero()), "just now");
        assert_eq!(format_age(chrono::Duration::seconds(42)), "42s ago");
        assert_eq!(format_age(chrono::Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(chrono::Duration::hours(3)), "3h ago");
        assert_eq!(format_age(chrono::Duration::days(2)), "2d ago");
    }

    #[test]
    fn test_pretty_report_without_color() {
        let output = OutputManager::new(false)
            .format_report(&report(), OutputFormat::Pretty)
            .unwrap();

        assert!(output.starts_with("Purge finished"));
        assert!(output.contains("  Successfully purged: Edge cache\n"));
        assert!(output.contains("  ✗ CDN cache: CDN rejected purge: invalid zone (code 1049)\n"));
    }

    #[test]
    fn test_pretty_snapshot_without_color() {
        let mut statuses = BTreeMap::new();
        statuses.insert(
            BackendKind::CdnCache,
            BackendStatus::not_configured(BackendKind::CdnCache, "Missing CDN credentials: api_key"),
        );
        statuses.insert(
            BackendKind::EdgeCache,
            BackendStatus::active(BackendKind::EdgeCache, "Page cache directory /cache is present")
                .with_mechanism("disk"),
        );
        let snapshot = StatusSnapshot {
            statuses,
            last_purge: None,
        };

        let output = OutputManager::new(false)
            .format_snapshot(&snapshot, OutputFormat::Pretty)
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[1],
            "  Edge cache: active [disk] - Page cache directory /cache is present"
        );
        assert_eq!(
            lines[2],
            "  CDN cache: not configured - Missing CDN credentials: api_key"
        );
        assert!(output.contains("No purge has been recorded yet"));
    }

    #[test]
    fn test_json_report() {
        let output = OutputManager::new(true)
            .format_report(&report(), OutputFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["overall_success"], true);
        assert_eq!(value["outcomes"][1]["failure"], "logical");
    }
}
