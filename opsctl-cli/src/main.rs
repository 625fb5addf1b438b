//! opsctl - operations toolkit for database provisioning and DNS records
//!
//! - `push-button`: create/delete a database, role and user for an ephemeral environment
//! - `service`: per-service database with read-only/read-write roles and an app user
//! - `route53`: list and manage A/CNAME record sets in AWS Route 53
//! - `dyn`: add/remove machine A records in a Dyn-managed zone

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config;
mod tracing_setup;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "opsctl",
    author,
    version,
    about = "Provision PostgreSQL databases and manage DNS records",
    long_about = "Push-button PostgreSQL environments, per-service database setup, \
                  and A/CNAME record management for AWS Route 53 and Dyn."
)]
struct Cli {
    /// Show debug output (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress progress spinners (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or delete a push-button environment database
    PushButton(commands::push_button::PushButtonArgs),
    /// Set up, inspect or remove a service database
    Service(commands::service::ServiceArgs),
    /// Manage AWS Route 53 hosted zones and record sets
    Route53(commands::route53::Route53Args),
    /// Add or remove machine A records in Dyn
    Dyn(commands::dynect::DynArgs),
    /// Manage opsctl configuration (path, show, init)
    Config(config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Secrets such as DYN_API_KEY may live in ~/.opsctl/.env
fn load_secrets_env() {
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".opsctl/.env"));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_secrets_env();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        verbose: cli.verbose,
    })
    .ok();

    // Initialize UI quiet mode from flag, env var, and TTY detection
    ui::init_quiet_mode(cli.quiet);

    match cli.command {
        Commands::PushButton(args) => commands::run_push_button(args).await?,
        Commands::Service(args) => commands::run_service(args).await?,
        Commands::Route53(args) => commands::run_route53(args).await?,
        Commands::Dyn(args) => commands::run_dyn(args).await?,
        Commands::Config(args) => config::run_config(args)?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
