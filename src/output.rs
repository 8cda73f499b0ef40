//! Terminal rendering of upload state and the interactive prompts.

use anyhow::{bail, Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::time::Duration;
use tokio::sync::watch;

use crate::common::ValidationResult;
use crate::upload::{UploadState, UploadStatus};

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn finish_spinner_success(spinner: &ProgressBar, msg: &str) {
    spinner.finish_with_message(format!("{} {}", style("✓").green().bold(), msg));
}

pub fn finish_spinner_error(spinner: &ProgressBar, msg: &str) {
    spinner.finish_with_message(format!("{} {}", style("✗").red().bold(), msg));
}

/// Percentage bar for the transfer phase.
pub fn transfer_bar(file_count: usize) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(format!("{file_count} file(s) remaining"));
    pb
}

fn phase_message(status: UploadStatus) -> Option<(&'static str, &'static str)> {
    match status {
        UploadStatus::Initiating => Some(("Starting upload session", "Upload session started")),
        UploadStatus::Validating => Some(("Checking files", "Files checked")),
        UploadStatus::Finalizing => Some(("Finalizing upload session", "Upload session finalized")),
        UploadStatus::Submitting => Some(("Submitting upload", "Upload submitted")),
        _ => None,
    }
}

/// Render every published state until the orchestrator goes away.
pub async fn render_updates(mut updates: watch::Receiver<UploadState>) {
    let mut last = UploadStatus::Idle;
    let mut phase: Option<ProgressBar> = None;
    let mut bar: Option<ProgressBar> = None;

    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();

        if state.status != last {
            let failed = state.status == UploadStatus::Error;

            if let (Some(pb), Some((running, done))) = (phase.take(), phase_message(last)) {
                if failed {
                    finish_spinner_error(&pb, running);
                } else {
                    finish_spinner_success(&pb, done);
                }
            }
            if let Some(pb) = bar.take() {
                if failed {
                    pb.abandon_with_message("transfer aborted");
                } else {
                    pb.finish_with_message("all files transferred");
                }
            }

            if let Some((running, _)) = phase_message(state.status) {
                phase = Some(spinner(running));
            }
            if state.status == UploadStatus::Uploading {
                bar = Some(transfer_bar(state.files_selection.len()));
            }
            last = state.status;
        }

        if let Some(pb) = &bar {
            pb.set_position(u64::from(state.progress.percentage));
            pb.set_message(format!(
                "{} file(s) remaining",
                state.progress.num_remaining_files
            ));
        }
    }
}

/// List existing and empty files that need a decision.
pub fn print_conflicts(validation: &ValidationResult, output: &mut dyn Write) -> Result<()> {
    if !validation.existing_files.is_empty() {
        writeln!(output, "{}", style("Already present at destination:").yellow())?;
        for name in &validation.existing_files {
            writeln!(output, "  {name}")?;
        }
    }
    if !validation.empty_files.is_empty() {
        writeln!(output, "{}", style("Empty files:").yellow())?;
        for name in &validation.empty_files {
            writeln!(output, "  {name}")?;
        }
    }
    Ok(())
}

/// Ask a yes/no question. Anything but `y`/`yes` declines.
pub fn confirm(question: &str, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<bool> {
    write!(output, "{question} [y/N]: ")?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Read a password line. Empty input is refused.
pub fn prompt_password(
    username: &str,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<String> {
    write!(output, "Password for {username}: ")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}
