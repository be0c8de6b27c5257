// src/main.rs
use clap::Parser;
use crossterm::style::Stylize;
use markport::cli::args::{Cli, Commands};
use markport::cli::error::{CliError, CliResult};
use markport::cli::{execute_command_with_services, execute_standalone_command};
use markport::config::{load_settings, Settings};
use markport::exitcode;
use markport::infrastructure::di::ServiceContainer;
use tracing::{debug, info, instrument};
use tracing_subscriber::{
    filter::{filter_fn, LevelFilter},
    fmt::{self, format::FmtSpan},
    prelude::*,
};

#[instrument]
fn main() {
    // use stderr as human output in order to make stdout output passable to downstream processes
    let cli = Cli::parse();
    setup_logging(cli.debug, cli.no_color);

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", format!("Error: failed to load settings: {}", e).red());
            std::process::exit(exitcode::USAGE);
        }
    };

    if let Err(e) = run(cli, settings) {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli, settings: Settings) -> CliResult<()> {
    if let Some(result) = execute_standalone_command(&cli, &settings) {
        return result;
    }

    let dry_run = matches!(cli.command, Some(Commands::Import { dry_run: true, .. }));
    let services = if dry_run {
        debug!("Dry run: in-memory remote, throwaway job database");
        ServiceContainer::for_dry_run(&settings)
    } else {
        ServiceContainer::new(&settings)
    }
    .map_err(|e| CliError::from(e).context("Failed to create service container"))?;

    execute_command_with_services(cli, services, &settings)
}

fn setup_logging(verbosity: u8, no_color: bool) {
    debug!("INIT: Attempting logger init from main.rs");

    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    let noisy_modules = ["reqwest", "rustls", "mio", "want", "hyper", "hyper_util"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(!no_color)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => info!("Debug mode: info"),
        LevelFilter::DEBUG => debug!("Debug mode: debug"),
        LevelFilter::TRACE => debug!("Debug mode: trace"),
        _ => {}
    }
}
