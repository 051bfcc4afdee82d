use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use custodian_core::AppConfig;
use std::path::Path;

mod commands;
mod output;

use commands::admin::{run_completions, run_config};
use commands::link::{run_send, run_snapshot};
use commands::session::run_session;

#[derive(Parser)]
#[command(name = "custodian")]
#[command(about = "Custodian station console", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    /// Game server base URL, overriding the configured one.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Enable verbose logging to stderr.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Skip alert flashes.
    #[arg(long = "reduced-motion", global = true)]
    reduced_motion: bool,

    /// Go straight to command mode without the boot transcript.
    #[arg(long = "no-boot")]
    no_boot: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive console (default).
    Console,
    /// Submit one directive and print the reply.
    Send(SendArgs),
    /// Fetch the current world snapshot.
    Snapshot,
    /// Print the effective configuration.
    Config,
    /// Generate shell completion scripts.
    Completions(CompletionsArgs),
}

#[derive(Args)]
struct SendArgs {
    /// Directive text, e.g. `status` or `move storage`.
    #[arg(required = true, num_args = 1..)]
    directive: Vec<String>,
}

#[derive(Args)]
struct CompletionsArgs {
    /// Shell to generate completions for (bash, zsh, fish, powershell, elvish).
    #[arg(long)]
    shell: Shell,
}

/// Loaded configuration with command-line overrides applied.
fn effective_config(cwd: &Path, cli: &Cli) -> Result<AppConfig> {
    let mut cfg = AppConfig::load(cwd)?;
    if let Some(server) = cli.server.as_deref() {
        cfg.link.base_url = server.to_string();
    }
    if cli.reduced_motion {
        cfg.terminal.reduced_motion = true;
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    let command = cli.command.take().unwrap_or(Commands::Console);
    match command {
        Commands::Console => {
            let cfg = effective_config(&cwd, &cli)?;
            run_session(&cwd, &cfg, cli.verbose, !cli.no_boot)
        }
        Commands::Send(args) => {
            let cfg = effective_config(&cwd, &cli)?;
            run_send(&cfg, &args.directive.join(" "), cli.json)
        }
        Commands::Snapshot => run_snapshot(&effective_config(&cwd, &cli)?, cli.json),
        Commands::Config => run_config(&effective_config(&cwd, &cli)?, cli.json),
        Commands::Completions(args) => run_completions(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_joins_words_into_one_directive() {
        let cli = Cli::parse_from(["custodian", "send", "move", "storage"]);
        match cli.command {
            Some(Commands::Send(args)) => assert_eq!(args.directive.join(" "), "move storage"),
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::parse_from([
            "custodian",
            "config",
            "--json",
            "--server",
            "http://10.0.0.2:7331",
            "--reduced-motion",
        ]);
        assert!(cli.json);
        assert!(cli.reduced_motion);
        assert_eq!(cli.server.as_deref(), Some("http://10.0.0.2:7331"));
    }
}
