mod cli;

use std::process::ExitCode;

use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::Cli;

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .init();

    let progress = progress_bar(cli.quiet);
    match ext2_bitfix::repair_image(&cli.image, cli.options(), &progress) {
        Ok(report) => {
            if !cli.quiet {
                print!("{}", report.render());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            progress.abandon();
            eprintln!(
                "{} {}: {}",
                "error:".red().bold(),
                cli.image.display(),
                e
            );
            ExitCode::FAILURE
        }
    }
}
