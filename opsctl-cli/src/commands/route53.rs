//! AWS Route 53 commands
//!
//! Commands: zones, records, check, create, update, delete
//!
//! API failures are reported and the command still exits successfully, so a
//! CI job calling these keeps going.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use opsctl_core::OpsConfig;
use opsctl_dns::route53::{self, Outcome, RecordRequest, Route53Client, WaitOptions};
use opsctl_dns::DnsError;
use tracing::error;

use crate::ui;

#[derive(Parser, Debug)]
pub struct Route53Args {
    /// AWS region (default: aws.region from config, then us-east-1)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Named profile from ~/.aws/credentials
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Route53Commands,
}

#[derive(Subcommand, Debug)]
pub enum Route53Commands {
    /// List the hosted zones of the account
    Zones,
    /// List the record sets of a hosted zone
    Records(ZoneArgs),
    /// Check whether a record set exists in a hosted zone
    Check(CheckArgs),
    /// Create an A/CNAME record set and wait until it is INSYNC
    Create(RecordArgs),
    /// Upsert an existing A/CNAME record set
    Update(RecordArgs),
    /// Delete an existing A/CNAME record set
    Delete(RecordArgs),
}

#[derive(Args, Debug)]
pub struct ZoneArgs {
    /// Hosted zone ID (e.g. /hostedzone/Z2WI7FSN6LUJNR)
    #[arg(long)]
    pub zone_id: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Record set name (e.g. www.example.com.)
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub zone: ZoneArgs,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Record set name (e.g. www.example.com.)
    #[arg(long)]
    pub name: String,

    /// Record value (IP address for A, host name for CNAME)
    #[arg(long)]
    pub value: String,

    /// Comment attached to the change batch
    #[arg(long, default_value = "")]
    pub comment: String,

    /// Record type; only A and CNAME are supported
    #[arg(long = "type", default_value = "A")]
    pub record_type: String,

    #[command(flatten)]
    pub zone: ZoneArgs,

    /// TTL in seconds (default: route53.ttl from config)
    #[arg(long)]
    pub ttl: Option<i64>,
}

impl RecordArgs {
    fn into_request(self, config: &OpsConfig) -> RecordRequest {
        RecordRequest {
            zone_id: self.zone.zone_id,
            name: self.name,
            value: self.value,
            comment: self.comment,
            record_type: self.record_type,
            ttl: self.ttl.unwrap_or(config.route53.ttl),
        }
    }
}

/// Log an API failure and carry on
fn report<T>(result: std::result::Result<T, DnsError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!("exception: {}", error_chain(&e));
            None
        }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

fn print_outcome(outcome: &Outcome, name: &str, verb: &str) {
    match outcome {
        Outcome::Applied(change) => println!(
            "record set: {} SUCCESSFULLY {} (change {} {})",
            name, verb, change.id, change.status
        ),
        Outcome::Skipped(skip) => println!("{}", skip),
    }
}

pub async fn run_route53(args: Route53Args) -> Result<()> {
    let config = OpsConfig::load()?;
    let region = args
        .region
        .clone()
        .unwrap_or_else(|| config.aws.region.clone());
    let client = Route53Client::connect(&region, args.profile.as_deref()).await;

    match args.command {
        Route53Commands::Zones => {
            if let Some(zones) = report(route53::list_hosted_zones(&client).await) {
                for zone in zones {
                    println!("{}\n", zone.render());
                }
            }
        }
        Route53Commands::Records(zone) => {
            if let Some(sets) = report(route53::list_record_sets(&client, &zone.zone_id).await) {
                for set in sets {
                    println!("{}\n", set.render(&zone.zone_id));
                }
            }
        }
        Route53Commands::Check(check) => {
            let exists =
                route53::record_set_exists(&client, &check.name, &check.zone.zone_id).await;
            if let Some(exists) = report(exists) {
                let verdict = if exists { "EXISTS!" } else { "does NOT exist!" };
                println!("resource_record_sets_name: {} {}", check.name, verdict);
            }
        }
        Route53Commands::Create(record) => {
            let request = record.into_request(&config);
            let wait = WaitOptions::from(&config.route53);
            let outcome = ui::with_spinner_async(
                format!("Creating {} and waiting for INSYNC", request.name),
                format!("{} processed", request.name),
                route53::create_record_set(&client, &request, &wait),
            )
            .await;
            if let Some(outcome) = report(outcome) {
                print_outcome(&outcome, &request.name, "CREATED");
            }
        }
        Route53Commands::Update(record) => {
            let request = record.into_request(&config);
            if let Some(outcome) = report(route53::update_record_set(&client, &request).await) {
                print_outcome(&outcome, &request.name, "UPDATED");
            }
        }
        Route53Commands::Delete(record) => {
            let request = record.into_request(&config);
            if let Some(outcome) = report(route53::delete_record_set(&client, &request).await) {
                print_outcome(&outcome, &request.name, "DELETED");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_args_use_config_ttl() {
        let args = RecordArgs {
            name: "www.example.com.".into(),
            value: "192.0.2.44".into(),
            comment: "test".into(),
            record_type: "A".into(),
            zone: ZoneArgs {
                zone_id: "/hostedzone/Z1".into(),
            },
            ttl: None,
        };
        let request = args.into_request(&OpsConfig::default());
        assert_eq!(request.ttl, 60);
        assert_eq!(request.zone_id, "/hostedzone/Z1");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = DnsError::route53("GetChange", "throttled");
        assert_eq!(error_chain(&err), "Route53 GetChange failed: throttled");
    }
}
