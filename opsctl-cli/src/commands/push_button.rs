//! Push-button environment commands
//!
//! Commands: create, delete

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use opsctl_pg::connection::DEFAULT_PORT;
use opsctl_pg::push_button::{self, parse_extensions};
use opsctl_pg::{ConnectTarget, PgConnector, PushButtonOptions};

#[derive(Parser, Debug)]
pub struct PushButtonArgs {
    #[command(subcommand)]
    pub command: PushButtonCommands,
}

#[derive(Subcommand, Debug)]
pub enum PushButtonCommands {
    /// Create the role, database and user (existing objects are skipped)
    Create(CreateArgs),
    /// Strip privileges, then drop the user and the database
    Delete(DeleteArgs),
}

/// Admin connection plus the environment being provisioned.
///
/// Every value is mandatory; they are optional here so that all missing
/// flags are reported together.
#[derive(Args, Debug)]
pub struct EnvironmentArgs {
    /// DB Host
    #[arg(short = 's', long = "dbhost")]
    pub db_host: Option<String>,

    /// DB Port
    #[arg(long = "dbport", default_value_t = DEFAULT_PORT)]
    pub db_port: u16,

    /// DB Name (admin database)
    #[arg(short = 'd', long = "dbname")]
    pub db_name: Option<String>,

    /// DB User (admin user)
    #[arg(short = 'u', long = "dbuser")]
    pub db_user: Option<String>,

    /// DB Password
    #[arg(short = 'p', long = "dbpass", env = "OPSCTL_DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    /// New DB Name
    #[arg(short = 'w', long = "newdbname")]
    pub new_db_name: Option<String>,

    /// New DB Role
    #[arg(short = 'x', long = "newdbrole")]
    pub new_db_role: Option<String>,

    /// New DB User
    #[arg(short = 'y', long = "newdbuser")]
    pub new_db_user: Option<String>,

    /// New DB Pass
    #[arg(
        short = 'z',
        long = "newdbpass",
        env = "OPSCTL_NEW_DB_PASS",
        hide_env_values = true
    )]
    pub new_db_pass: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub environment: EnvironmentArgs,

    /// DB Extensions (comma-separated, e.g. "pgcrypto,postgis")
    #[arg(short = 'e', long = "extensions")]
    pub extensions: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub environment: EnvironmentArgs,

    /// Also drop the role (it may be shared with other environments)
    #[arg(long)]
    pub drop_role: bool,
}

impl EnvironmentArgs {
    fn into_options(self, extensions: Vec<String>, drop_role: bool) -> PushButtonOptions {
        let admin = ConnectTarget::new(
            self.db_host.unwrap_or_default(),
            self.db_name.unwrap_or_default(),
            self.db_user.unwrap_or_default(),
            self.db_pass.unwrap_or_default(),
        )
        .with_port(self.db_port);

        PushButtonOptions {
            admin,
            new_db_name: self.new_db_name.unwrap_or_default(),
            new_db_role: self.new_db_role.unwrap_or_default(),
            new_db_user: self.new_db_user.unwrap_or_default(),
            new_db_pass: self.new_db_pass.unwrap_or_default(),
            extensions,
            drop_role,
        }
    }
}

pub async fn run_push_button(args: PushButtonArgs) -> Result<()> {
    match args.command {
        PushButtonCommands::Create(args) => run_create(args).await,
        PushButtonCommands::Delete(args) => run_delete(args).await,
    }
}

async fn run_create(args: CreateArgs) -> Result<()> {
    let extensions = parse_extensions(args.extensions.as_deref());
    let opts = args.environment.into_options(extensions, false);

    push_button::create(&PgConnector, &opts)
        .await
        .with_context(|| format!("Push-button create failed for database {}", opts.new_db_name))?;

    println!(
        "✅ Environment ready: database={} role={} user={}",
        opts.new_db_name, opts.new_db_role, opts.new_db_user
    );
    Ok(())
}

async fn run_delete(args: DeleteArgs) -> Result<()> {
    let opts = args.environment.into_options(Vec::new(), args.drop_role);

    push_button::delete(&PgConnector, &opts)
        .await
        .with_context(|| format!("Push-button delete failed for database {}", opts.new_db_name))?;

    println!(
        "✅ Environment removed: database={} user={}",
        opts.new_db_name, opts.new_db_user
    );
    Ok(())
}
