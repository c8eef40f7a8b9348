use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::{OutputManager, write_output},
};
use indicatif::{ProgressBar, ProgressStyle};
use purgekit_engine::{
    BackendKind, CacheControl, Dispatch, ExecutionMode, PurgeReport, Selection, TriggerSource,
};
use std::{path::Path, time::Duration};
use tracing::{debug, info};

pub struct CommandExecutor {
    config: AppConfig,
    control: CacheControl,
    output: OutputManager,
    quiet: bool,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, config_path: Option<&Path>, quiet: bool) -> Result<Self> {
        let engine_config = config.engine_config(config_path);
        debug!(result_store = ?engine_config.result_store.path, "Building cache control");

        let control = CacheControl::from_config(&engine_config)?;
        let output = OutputManager::new(config.colored_output);
        Ok(Self {
            config,
            control,
            output,
            quiet,
        })
    }

    fn format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.unwrap_or(self.config.default_output_format)
    }

    pub async fn status(&self, output: Option<OutputFormat>) -> Result<()> {
        let format = self.format(output);
        let snapshot = self.control.snapshot().await;
        write_output(&self.output.format_snapshot(&snapshot, format)?)
    }

    pub async fn purge(
        &self,
        backends: Vec<BackendKind>,
        detach: bool,
        output: Option<OutputFormat>,
    ) -> Result<()> {
        let format = self.format(output);
        let selection = if backends.is_empty() {
            Selection::all()
        } else {
            Selection::new(backends)?
        };
        info!(selection = %selection, detach, "Purging caches");

        let mode = if detach {
            ExecutionMode::Detached
        } else {
            ExecutionMode::Synchronous
        };

        let spinner = self.create_progress_bar(format, &format!("Purging {selection}..."));
        let dispatch = self
            .control
            .dispatch(mode, selection, TriggerSource::CommandLine)
            .await;
        if let Some(pb) = &spinner {
            pb.finish_and_clear();
        }
        let dispatch = dispatch?;

        let report = match &dispatch {
            Dispatch::Completed(report) => report.clone(),
            Dispatch::Detached { id, .. } => {
                write_output(&self.output.format_dispatch(&dispatch, format)?)?;
                self.wait_for_detached(format).await;
                // Taken from the run itself; the result store may hold another process's report
                self.control
                    .take_detached_report(*id)
                    .ok_or_else(|| anyhow::anyhow!("Detached purge {id} finished without a report"))?
            }
        };

        write_output(&self.output.format_report(&report, format)?)?;
        Self::check_outcome(&report)
    }

    pub async fn last(&self, output: Option<OutputFormat>) -> Result<()> {
        let format = self.format(output);
        match self.control.last_report().await {
            Some(report) => write_output(&self.output.format_report(&report, format)?),
            None if format == OutputFormat::Json => write_output("null\n"),
            None => write_output("No purge has been recorded yet\n"),
        }
    }

    async fn wait_for_detached(&self, format: OutputFormat) {
        let spinner = self.create_progress_bar(format, "Waiting for background purge to finish...");
        self.control.shutdown().await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
    }

    fn check_outcome(report: &PurgeReport) -> Result<()> {
        if report.overall_success {
            Ok(())
        } else {
            Err(CliError::nothing_purged(
                report.failed_outcomes().count(),
                report.requested_kinds.len(),
            ))
        }
    }

    // No spinner when output is meant for another program
    fn create_progress_bar(&self, format: OutputFormat, message: &str) -> Option<ProgressBar> {
        if self.quiet || format == OutputFormat::Json {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map(|style| style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "))
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        Some(pb)
    }
}
