// src/cli/mod.rs
use crate::application::error::ApplicationError;
use crate::cli::args::{Cli, Commands};
use crate::cli::error::CliResult;
use crate::config::Settings;
use crate::domain::owner::Owner;
use crate::infrastructure::di::ServiceContainer;

pub mod args;
pub mod completion;
pub mod error;
pub mod import_commands;
pub mod tag_commands;

/// Owner from `--owner`, falling back to the configured one.
pub fn resolve_owner(cli: &Cli, settings: &Settings) -> CliResult<Owner> {
    let value = cli
        .owner
        .as_deref()
        .or(settings.owner.as_deref())
        .ok_or_else(|| {
            ApplicationError::Unauthorized(
                "no owner given; pass --owner or set MARKPORT_OWNER".to_string(),
            )
        })?;
    Ok(Owner::new(value)?)
}

/// Run commands that need the job database and the remote repository.
pub fn execute_command_with_services(
    cli: Cli,
    services: ServiceContainer,
    settings: &Settings,
) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Import { .. }) => {
            let owner = resolve_owner(&cli, settings)?;
            import_commands::import(&cli, &owner, &services)
        }
        Some(Commands::Process { job_id }) => {
            import_commands::process(job_id, &resolve_owner(&cli, settings)?, &services)
        }
        Some(Commands::Status { job_id }) => {
            import_commands::status(job_id, &resolve_owner(&cli, settings)?, &services)
        }
        Some(Commands::Jobs) => import_commands::jobs(&resolve_owner(&cli, settings)?, &services),
        Some(Commands::MergeTags) => {
            tag_commands::merge_tags(&resolve_owner(&cli, settings)?, &services)
        }
        Some(Commands::Sweep) => import_commands::sweep(&services),
        Some(Commands::CreateDb { .. })
        | Some(Commands::Config)
        | Some(Commands::Completion { .. })
        | None => Ok(()),
    }
}

/// Run commands that work without a job database.
///
/// Returns `None` when the command needs the service container.
pub fn execute_standalone_command(cli: &Cli, settings: &Settings) -> Option<CliResult<()>> {
    match &cli.command {
        Some(Commands::Config) => {
            println!("{}", crate::config::generate_default_config());
            Some(Ok(()))
        }
        Some(Commands::Completion { shell }) => Some(handle_completion(shell)),
        Some(Commands::CreateDb { path }) => Some(import_commands::create_db(path.clone(), settings)),
        None => Some(Ok(())),
        _ => None,
    }
}

fn handle_completion(shell: &str) -> CliResult<()> {
    // Write a brief comment to stderr about what's being output
    match shell.to_lowercase().as_str() {
        "bash" => {
            eprintln!("# Outputting bash completion script for markport");
            eprintln!("# To use, run one of:");
            eprintln!("# - eval \"$(markport completion bash)\"             # one-time use");
            eprintln!("# - markport completion bash >> ~/.bashrc            # add to bashrc");
            eprintln!("#");
        }
        "zsh" => {
            eprintln!("# Outputting zsh completion script for markport");
            eprintln!("# To use, run one of:");
            eprintln!("# - eval \"$(markport completion zsh)\"              # one-time use");
            eprintln!("# - markport completion zsh > ~/.zfunc/_markport     # save to fpath directory");
            eprintln!("#");
        }
        "fish" => {
            eprintln!("# Outputting fish completion script for markport");
            eprintln!("# To use, run one of:");
            eprintln!("# - markport completion fish | source                # one-time use");
            eprintln!("# - markport completion fish > ~/.config/fish/completions/markport.fish");
            eprintln!("#");
        }
        _ => {}
    }

    // Generate completion script to stdout
    match completion::generate_completion(shell) {
        Ok(_) => Ok(()),
        Err(e) => Err(error::CliError::CommandFailed(format!(
            "Failed to generate completion script: {}",
            e
        ))),
    }
}
