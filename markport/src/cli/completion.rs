// src/cli/completion.rs
use crate::cli::args::Cli;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io::{self, Write};
use tracing::{debug, instrument};

fn parse_shell(shell: &str) -> io::Result<Shell> {
    match shell.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Unsupported shell: {}. Supported shells: bash, zsh, fish",
                shell
            ),
        )),
    }
}

/// Write the completion script for `shell` into `out`.
pub fn write_completion<W: Write>(shell: &str, out: &mut W) -> io::Result<()> {
    let shell = parse_shell(shell)?;
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    debug!("Generating {} completion for {}", shell, bin_name);
    generate(shell, &mut cmd, bin_name, out);
    Ok(())
}

/// Generates shell completion scripts for the specified shell and prints to stdout.
///
/// ```bash
/// markport completion bash > ~/.bash_completion.d/markport
/// eval "$(markport completion zsh)"
/// ```
#[instrument(level = "debug")]
pub fn generate_completion(shell: &str) -> io::Result<()> {
    write_completion(shell, &mut io::stdout())
}
