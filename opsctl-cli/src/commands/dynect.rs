//! Dyn machine record commands
//!
//! Commands: add, rm

use std::net::IpAddr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use opsctl_core::config::expand_lookup_host;
use opsctl_core::{require_present, OpsConfig};
use opsctl_dns::dynect::{self, AddressSource, DynClient, DynCredentials, MachineRecord};
use tracing::error;

#[derive(Parser, Debug)]
pub struct DynArgs {
    #[command(subcommand)]
    pub command: DynCommands,
}

#[derive(Subcommand, Debug)]
pub enum DynCommands {
    /// Add an A record <machine>.<subdomain> and publish the zone
    Add(AddArgs),
    /// Delete the node <machine>.<subdomain> with all its records
    Rm(NodeArgs),
}

#[derive(Args, Debug)]
pub struct NodeArgs {
    /// Machine name (first label of the node)
    pub machine: String,

    /// Subdomain the machine node lives under
    #[arg(long)]
    pub subdomain: String,

    /// Dyn zone (default: dyn.zone from config)
    #[arg(long)]
    pub zone: Option<String>,

    /// Dyn customer name (default: dyn.customer from config)
    #[arg(long)]
    pub customer: Option<String>,

    /// Dyn user name (default: dyn.username from config)
    #[arg(long)]
    pub username: Option<String>,

    /// Dyn API password
    #[arg(long, env = "DYN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// Take the address from `docker-machine ip <machine>` instead of DNS
    #[arg(long, conflicts_with = "address")]
    pub private: bool,

    /// Use this address instead of resolving one
    #[arg(long)]
    pub address: Option<IpAddr>,

    /// Record TTL in seconds (default: dyn.ttl from config)
    #[arg(long)]
    pub ttl: Option<u32>,
}

/// Flags first, then config; every value must end up non-empty
fn session_inputs(
    args: &NodeArgs,
    config: &OpsConfig,
) -> Result<(DynCredentials, MachineRecord)> {
    let pick = |flag: &Option<String>, fallback: &Option<String>| {
        flag.clone().or_else(|| fallback.clone()).unwrap_or_default()
    };
    let customer = pick(&args.customer, &config.dynect.customer);
    let username = pick(&args.username, &config.dynect.username);
    let zone = pick(&args.zone, &config.dynect.zone);
    let password = args.api_key.clone().unwrap_or_default();

    require_present([
        ("--customer", Some(customer.as_str())),
        ("--username", Some(username.as_str())),
        ("--zone", Some(zone.as_str())),
        ("--api-key", Some(password.as_str())),
    ])?;

    Ok((
        DynCredentials {
            customer,
            username,
            password,
        },
        MachineRecord {
            zone,
            machine: args.machine.clone(),
            subdomain: args.subdomain.clone(),
        },
    ))
}

pub async fn run_dyn(args: DynArgs) -> Result<()> {
    let config = OpsConfig::load()?;
    match args.command {
        DynCommands::Add(add) => run_add(add, &config).await,
        DynCommands::Rm(node) => run_rm(node, &config).await,
    }
}

async fn run_add(args: AddArgs, config: &OpsConfig) -> Result<()> {
    let (credentials, record) = session_inputs(&args.node, config)?;

    let source = match (args.address, args.private) {
        (Some(address), _) => AddressSource::Fixed(address),
        (None, true) => AddressSource::Private,
        (None, false) => AddressSource::Public {
            lookup_host: expand_lookup_host(&config.dynect.lookup_host_template, &record.machine),
        },
    };
    let address = dynect::resolve_address(&record.machine, &source)
        .await
        .context("Unable to determine the machine address")?;

    let ttl = args.ttl.unwrap_or(config.dynect.ttl);
    let mut client = DynClient::new();
    match dynect::add_machine_record(&mut client, &credentials, &record, address, ttl).await {
        Ok(report) => {
            for uri in &report.records {
                println!("{}", uri);
            }
            println!("{}", report.banner());
        }
        Err(e) => error!("Dyn add failed for {}: {}", record.fqdn(), e),
    }
    Ok(())
}

async fn run_rm(args: NodeArgs, config: &OpsConfig) -> Result<()> {
    let (credentials, record) = session_inputs(&args, config)?;
    println!("{}", record.node());

    let mut client = DynClient::new();
    match dynect::remove_machine_record(&mut client, &credentials, &record).await {
        Ok(()) => println!("Deleted {} and its records", record.fqdn()),
        Err(e) => error!("Dyn rm failed for {}: {}", record.fqdn(), e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(api_key: Option<&str>) -> NodeArgs {
        NodeArgs {
            machine: "web1".into(),
            subdomain: "feeds".into(),
            zone: None,
            customer: Some("acme".into()),
            username: None,
            api_key: api_key.map(String::from),
        }
    }

    #[test]
    fn test_session_inputs_fall_back_to_config() {
        let mut config = OpsConfig::default();
        config.dynect.username = Some("jenkins".into());
        config.dynect.zone = Some("example.com".into());

        let (credentials, record) = session_inputs(&node(Some("key")), &config).unwrap();
        assert_eq!(credentials.customer, "acme");
        assert_eq!(credentials.username, "jenkins");
        assert_eq!(record.fqdn(), "web1.feeds.example.com");
    }

    #[test]
    fn test_session_inputs_report_every_missing_value() {
        let err = session_inputs(&node(None), &OpsConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mandatory arguments are missing: --username, --zone, --api-key"
        );
    }
}
