//! CLI command handler: merge config, run the sort, print the summary and pick the exit code.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::engine::progress::{create_counter, outcome_progress, refresh_bar};
use crate::report::RunReport;
use crate::utils::bucketer_toml::{apply_file_to_args, load_bucketer_toml};
use crate::utils::{Colors, LogSink, setup_logging};

/// Exit status for a finished run: 2 for an unusable root, 1 when anything failed or the
/// run was interrupted, 0 otherwise.
pub fn exit_code_for(report: &RunReport) -> u8 {
    if report.is_root_invalid() {
        2
    } else if report.has_failures() || report.status == crate::RunStatus::Cancelled {
        1
    } else {
        0
    }
}

/// Apply `.bucketer.toml` (explicit `--config` or the working-directory default) under the
/// command line.
pub fn merge_config(cli: &Cli) -> Result<Cli> {
    let mut args = cli.clone();
    if let Some(file) = load_bucketer_toml(cli.config.as_deref())? {
        apply_file_to_args(&file, &mut args);
    }
    Ok(args)
}

/// Raise `cancel` on Ctrl+C. A second handler in the same process is refused by ctrlc;
/// the run then simply cannot be interrupted cleanly.
fn install_interrupt(cancel: &Arc<AtomicBool>) {
    let flag = Arc::clone(cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }
}

fn print_summary(report: &RunReport) {
    let copied = Colors::colorize(Colors::COPIED, &format!("{} copied", report.copied));
    let failed = if report.failed > 0 {
        Colors::colorize(Colors::FAILED, &format!("{} failed", report.failed))
    } else {
        format!("{} failed", report.failed)
    };
    let skipped = if report.traversal_errors.is_empty() {
        format!("{} skipped", 0)
    } else {
        Colors::colorize(
            Colors::WARNED,
            &format!("{} skipped", report.traversal_errors.len()),
        )
    };
    println!(
        "{} files found: {}, {}, {} ({} bytes)",
        report.files_found, copied, failed, skipped, report.bytes_copied
    );
    if !report.collisions.is_empty() {
        println!(
            "{}",
            Colors::colorize(
                Colors::WARNED,
                &format!("{} destination collisions", report.collisions.len())
            )
        );
    }
    for failure in &report.failures {
        println!("  {}", failure);
    }
}

/// Run one sort for the parsed command line.
pub fn handle_run(cli: &Cli) -> Result<ExitCode> {
    let args = merge_config(cli)?;
    setup_logging(args.is_verbose());

    let (Some(source), Some(output)) = (args.source.clone(), args.output.clone()) else {
        bail!("both --source and --output are required (on the command line or in the config file)");
    };

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt(&cancel);
    let mut opts = args.sort_opts();
    opts.cancel = Some(Arc::clone(&cancel));
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let report = if args.progress.unwrap_or(false) {
        let bar = create_counter("Copying");
        refresh_bar(&bar);
        let (on_outcome, flush) = outcome_progress(&bar);
        let report = crate::sort_dir_with(&source, &output, &opts, &LogSink, Some(on_outcome))
            .context("sort run")?;
        flush();
        report
    } else {
        crate::sort_dir(&source, &output, &opts, &LogSink).context("sort run")?
    };

    if args.json.unwrap_or(false) {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
    } else {
        print_summary(&report);
    }
    Ok(ExitCode::from(exit_code_for(&report)))
}
