//! Service database commands
//!
//! Commands: create, delete, list, test

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use opsctl_core::ServiceEnv;
use opsctl_pg::service::{self, admin_target};
use opsctl_pg::{ConnectTarget, PgConnector, ServiceNames, UserOutcome};

#[derive(Parser, Debug)]
pub struct ServiceArgs {
    /// .env file holding DB_HOST, DB_NAME, DB_USER and DB_PASS
    #[arg(long, global = true, default_value = ".env", value_name = "PATH")]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: ServiceCommands,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// Create the database, roles and application user for a service
    Create(CreateArgs),
    /// Drop the service database, user and roles
    Delete(NameArgs),
    /// Show which of the service's objects exist
    List(NameArgs),
    /// Check the connection configured in the .env file
    Test,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    /// The name of the service
    #[arg(short = 's', long = "service-name")]
    pub service_name: String,

    /// Set a custom database name
    #[arg(short = 'd', long = "database-name")]
    pub database_name: Option<String>,

    /// Set a custom readonly role name
    #[arg(short = 'r', long = "readonly-role-name")]
    pub readonly_role_name: Option<String>,

    /// Set a custom readwrite role name
    #[arg(short = 'w', long = "readwrite-role-name")]
    pub readwrite_role_name: Option<String>,

    /// Set a custom user name
    #[arg(short = 'u', long = "user-name")]
    pub user_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub names: NameArgs,

    /// Where the generated user password is written
    #[arg(long, default_value = ".pass", value_name = "PATH")]
    pub password_file: PathBuf,
}

impl NameArgs {
    fn resolve(&self) -> ServiceNames {
        ServiceNames::derive(&self.service_name).with_overrides(
            self.database_name.as_deref(),
            self.readonly_role_name.as_deref(),
            self.readwrite_role_name.as_deref(),
            self.user_name.as_deref(),
        )
    }
}

fn load_target(env_file: &Path) -> Result<ConnectTarget> {
    let env = ServiceEnv::load(env_file)?;
    Ok(admin_target(&env))
}

pub async fn run_service(args: ServiceArgs) -> Result<()> {
    let target = load_target(&args.env_file)?;

    match args.command {
        ServiceCommands::Create(create) => run_create(&target, create).await,
        ServiceCommands::Delete(names) => run_delete(&target, names).await,
        ServiceCommands::List(names) => run_list(&target, names).await,
        ServiceCommands::Test => run_test(&target).await,
    }
}

async fn run_create(target: &ConnectTarget, args: CreateArgs) -> Result<()> {
    let names = args.names.resolve();

    let outcome = service::create(&PgConnector, target, &names, args.password_file)
        .await
        .with_context(|| format!("Service setup failed for {}", names.service))?;

    match outcome {
        UserOutcome::Created { password_file } => {
            println!(
                "✅ Service {} ready; password for {} written to {}",
                names.service,
                names.user,
                password_file.display()
            );
        }
        UserOutcome::AlreadyExisted => {
            println!(
                "✅ Service {} ready; user {} already existed, password unchanged",
                names.service, names.user
            );
        }
    }
    Ok(())
}

async fn run_delete(target: &ConnectTarget, args: NameArgs) -> Result<()> {
    let names = args.resolve();

    service::delete(&PgConnector, target, &names)
        .await
        .with_context(|| format!("Service removal failed for {}", names.service))?;

    println!("✅ Service {} removed", names.service);
    Ok(())
}

async fn run_list(target: &ConnectTarget, args: NameArgs) -> Result<()> {
    let names = args.resolve();
    let listing = service::list(&PgConnector, target, &names).await?;
    println!("{}", listing.render());
    Ok(())
}

async fn run_test(target: &ConnectTarget) -> Result<()> {
    let version = service::test_connection(&PgConnector, target)
        .await
        .context("DB connection test failed")?;
    println!("{}", version);
    Ok(())
}
