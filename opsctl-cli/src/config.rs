use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opsctl_core::OpsConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file populated with the built-in defaults
    Init(InitArgs),
    /// Print the effective configuration as TOML
    Show,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let config_path = OpsConfig::config_path();

    if config_path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            config_path
        ));
    }

    OpsConfig::default()
        .save_to(&config_path)
        .context(format!("Failed to write config file: {:?}", config_path))?;

    println!("✅ Created config at: {:?}", config_path);
    println!("\nNext steps:");
    println!("  1. Edit the config: $EDITOR {:?}", config_path);
    println!("  2. Set dyn.customer, dyn.username and dyn.zone if you use Dyn");
    println!("  3. Run: opsctl config show");

    Ok(())
}

fn run_show() -> Result<()> {
    let config = OpsConfig::load().context("Failed to load config")?;
    println!("{}", config.to_toml()?);
    Ok(())
}

fn run_path() -> Result<()> {
    println!("{}", OpsConfig::config_path().display());
    Ok(())
}
