//! Bucketer CLI: copy a directory tree into per-extension folders.

use anyhow::Result;
use bucketer::engine::arg_parser::Cli;
use bucketer::engine::handle_run;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let code = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(code)
}
