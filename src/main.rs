//! bpmtag CLI entry point

use bpmtag::config::{Cli, Command, ImportArgs, ImportSettings, TagArgs, TagSettings};
use bpmtag::export::{write_report, RunReport};
use bpmtag::import::{ImportJob, ImportSummary};
use bpmtag::pipeline::{
    plan_dry_run, spawn_import_job, spawn_tag_job, BatchJob, BatchSummary, CancellationToken,
    DryRunPlan, FailedFile, JobHandle, ProgressEvent,
};
use bpmtag::{BpmTagError, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    let result = match &cli.command {
        Command::Tag(args) => run_tag(args, cli.quiet),
        Command::Import(args) => run_import(args, cli.quiet),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_tag(args: &TagArgs, quiet: bool) -> Result<ExitCode> {
    validate_input(&args.input)?;
    let settings = TagSettings::from_args(args, quiet)?;

    if settings.dry_run {
        print_dry_run(&plan_dry_run(&settings)?);
        return Ok(ExitCode::SUCCESS);
    }

    // Dependency checks happen here, before any file is touched
    let job = BatchJob::from_settings(&settings, CancellationToken::new())?;
    let handle = spawn_tag_job(job, settings.input.clone())?;
    install_interrupt_handler(&handle);

    drive_progress(&handle, settings.show_progress, "files");
    let summary = handle.join()?;

    if let Some(report) = &settings.report {
        write_report(&RunReport::from_batch(&summary), report)?;
    }
    print_batch_summary(&summary);

    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn run_import(args: &ImportArgs, quiet: bool) -> Result<ExitCode> {
    let settings = ImportSettings::from_args(args, quiet)?;

    let job = ImportJob::from_settings(&settings, CancellationToken::new())?;
    let handle = spawn_import_job(job)?;
    install_interrupt_handler(&handle);

    drive_progress(&handle, settings.show_progress, "records");
    let summary = handle.join()?;

    if let Some(report) = &settings.report {
        write_report(&RunReport::from_import(&summary), report)?;
    }
    print_import_summary(&summary);

    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Ctrl-C requests a stop before the next file or page
fn install_interrupt_handler<T>(handle: &JobHandle<T>) {
    let cancel = handle.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || {
        if !cancel.is_cancelled() {
            eprintln!("\nStopping after the current item (already written tags are kept)...");
        }
        cancel.cancel();
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }
}

/// Apply worker events to the progress bar until the worker exits
fn drive_progress<T>(handle: &JobHandle<T>, show_progress: bool, unit: &str) {
    let progress_bar = show_progress.then(|| {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    });

    for event in handle.events().iter() {
        let Some(pb) = &progress_bar else {
            continue;
        };
        match event {
            ProgressEvent::Started { total } => {
                pb.set_length(total as u64);
                pb.set_message(format!("0 of {} {}", total, unit));
            }
            ProgressEvent::FileDone {
                index,
                path,
                outcome,
                ..
            } => {
                pb.set_position(index as u64);
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                match outcome.bpm() {
                    Some(bpm) => pb.set_message(format!("{} ({} BPM)", name, bpm)),
                    None => pb.set_message(format!("{} (failed)", name)),
                }
            }
            ProgressEvent::PageDone { processed, total } => {
                pb.set_position(processed as u64);
                pb.set_message(format!("Processing... {} of {} {}", processed, total, unit));
            }
            ProgressEvent::Finished { cancelled } => {
                pb.finish_with_message(if cancelled { "Cancelled" } else { "Done" });
            }
        }
    }
}

fn validate_input(input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(BpmTagError::InvalidInput(format!(
            "Input path does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Examples:\n    bpmtag tag ~/Music/DJ\n    bpmtag tag ./track.mp3",
            input.display()
        )));
    }
    Ok(())
}

fn print_failures(failed: &[FailedFile]) {
    if failed.is_empty() {
        return;
    }
    println!();
    println!("Failed ({}):", failed.len());
    for file in failed {
        println!("  ✗ {} [{}]: {}", file.path.display(), file.kind, file.reason);
    }
}

fn print_batch_summary(summary: &BatchSummary) {
    println!();
    println!(
        "Summary: {} tagged, {} failed, {} not processed (of {} total)",
        summary.succeeded,
        summary.failed.len(),
        summary.remaining(),
        summary.total
    );
    print_failures(&summary.failed);
    if summary.cancelled {
        println!();
        println!("Cancelled: tags already written were kept.");
    }
}

fn print_import_summary(summary: &ImportSummary) {
    println!();
    println!(
        "Summary: {} files tagged, {} records skipped, {} failed (of {} records)",
        summary.tagged.len(),
        summary.skipped,
        summary.failed.len(),
        summary.total
    );
    print_failures(&summary.failed);
    if summary.cancelled {
        println!();
        println!(
            "Cancelled after {} of {} records: tags already written were kept.",
            summary.processed, summary.total
        );
    }
}

/// Dry run mode - show files that would be tagged without processing
fn print_dry_run(plan: &DryRunPlan) {
    println!();
    println!("=== DRY RUN MODE ===");
    println!();

    for (dir, files) in &plan.by_directory {
        println!("{}/ ({} files)", dir.display(), files.len());
        for name in files {
            println!("  {}", name);
        }
        println!();
    }

    println!("─────────────────────────────────────────");
    println!();
    println!("Would analyze and tag {} files:", plan.total);
    for (format, count) in &plan.by_format {
        println!("  {} {} files", count, format);
    }
    println!();
}
