//! Stemperator CLI - AI Stem Separation
//!
//! Writes `PROGRESS:<pct>:<stage>` lines and a final JSON stem mapping to
//! stdout. Logs and errors go to stderr.

use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use env_logger::Env;
use log::{debug, info};

use stemperator::cli::{commands, Cli};
use stemperator::config::SeparatorConfig;
use stemperator::StemError;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            if let Some(err) = e.downcast_ref::<StemError>() {
                print_suggestions(err.recovery_suggestions());
            }
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = SeparatorConfig::from_env();

    if cli.check {
        commands::check(&config).context("Installation check failed")?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.list_models {
        commands::list_models();
        return Ok(ExitCode::SUCCESS);
    }

    if cli.list_devices {
        commands::list_devices(&config).context("Device listing failed")?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some((input, output_dir)) = cli.positionals() else {
        eprintln!("{}", Cli::command().render_help());
        return Ok(ExitCode::from(1));
    };

    info!("Stemperator v{}", env!("CARGO_PKG_VERSION"));
    let device = cli.effective_device();
    let result = commands::separate(input, output_dir, cli.model, &device, config);

    match &result.error {
        None => {
            debug!("Wrote {} stems", result.stems.len());
        }
        Some(error) => {
            eprintln!("ERROR: {}", error.message);
            print_suggestions(error.suggestions.iter().map(String::as_str));
        }
    }

    Ok(ExitCode::from(result.exit_code()))
}

fn print_suggestions<'a>(suggestions: impl IntoIterator<Item = &'a str>) {
    for suggestion in suggestions {
        eprintln!("  - {}", suggestion);
    }
}
