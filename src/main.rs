use birdnest::cli::{Cli, EXIT_ABORTED, prompt_for_root, run_cli};
use birdnest::output::OutputFormatter;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() -> ExitCode {
    let cli = Cli::parse();
    birdnest::init_logging(cli.verbose);

    let root = match cli.root.clone() {
        Some(root) => root,
        None => match prompt_for_root() {
            Ok(root) => root,
            Err(e) => {
                OutputFormatter::error(&e.to_string());
                return ExitCode::from(EXIT_ABORTED);
            }
        },
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        OutputFormatter::warning("Cancellation requested, stopping after the current file...");
        flag.store(true, Ordering::Relaxed);
    }) {
        log::warn!("could not install Ctrl-C handler: {}", e);
    }

    match run_cli(&cli, &root, Some(cancel)) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            OutputFormatter::error("Aborted. No files were moved.");
            ExitCode::from(EXIT_ABORTED)
        }
    }
}
