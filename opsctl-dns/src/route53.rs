//! AWS Route 53 record management.
//!
//! The workflows only ever touch A and CNAME records and submit one change per
//! batch. Existence is always checked against a fresh listing before a
//! mutating call is made.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_route53::types as sdk;
use aws_sdk_route53::Client;
use opsctl_core::config::Route53Config;
use tracing::{debug, info, warn};

use crate::error::{DnsError, Result};
use crate::record::{
    same_name, ChangeAction, ChangeInfo, ChangeStatus, HostedZone, RecordChange, RecordSet,
    RecordType,
};

/// The four Route 53 calls the workflows are built from
#[async_trait]
pub trait RecordSetApi: Send + Sync {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>>;

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>>;

    async fn change_record_set(&self, zone_id: &str, change: &RecordChange) -> Result<ChangeInfo>;

    async fn get_change(&self, change_id: &str) -> Result<ChangeInfo>;
}

/// Route 53 client backed by the AWS SDK default credential chain
pub struct Route53Client {
    client: Client,
    region: String,
}

impl fmt::Debug for Route53Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route53Client")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl Route53Client {
    /// Build a client for `region`, optionally pinned to a named profile
    /// from `~/.aws/credentials`
    pub async fn connect(region: &str, profile: Option<&str>) -> Self {
        info!("Connecting to Route53 in region={}", region);

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(profile) = profile {
            debug!("Using AWS profile={}", profile);
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        Self::from_conf(aws_sdk_route53::Config::from(&sdk_config))
    }

    /// Build a client from an explicit service config (custom endpoint,
    /// static credentials)
    pub fn from_conf(config: aws_sdk_route53::Config) -> Self {
        let region = config.region().map(|r| r.to_string()).unwrap_or_default();
        Self {
            client: Client::from_conf(config),
            region,
        }
    }
}

fn convert_change_info(operation: &'static str, info: Option<&sdk::ChangeInfo>) -> Result<ChangeInfo> {
    let info = info.ok_or(DnsError::MissingField {
        operation,
        field: "ChangeInfo",
    })?;
    let status = match info.status() {
        sdk::ChangeStatus::Insync => ChangeStatus::InSync,
        _ => ChangeStatus::Pending,
    };
    Ok(ChangeInfo {
        id: info.id().to_string(),
        status,
    })
}

#[async_trait]
impl RecordSetApi for Route53Client {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        const OP: &str = "ListHostedZones";
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| DnsError::route53(OP, e))?;

            zones.extend(output.hosted_zones().iter().map(|zone| HostedZone {
                id: zone.id().to_string(),
                name: zone.name().to_string(),
                caller_reference: zone.caller_reference().to_string(),
                private_zone: zone.config().is_some_and(|c| c.private_zone()),
                record_count: zone.resource_record_set_count(),
                linked_service: zone
                    .linked_service()
                    .and_then(|s| s.service_principal())
                    .map(String::from),
            }));

            match output.next_marker() {
                Some(next) if output.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(zones)
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        const OP: &str = "ListResourceRecordSets";
        let mut sets = Vec::new();
        let mut start: Option<(String, sdk::RrType, Option<String>)> = None;

        loop {
            let mut request = self.client.list_resource_record_sets().hosted_zone_id(zone_id);
            if let Some((name, record_type, identifier)) = start.take() {
                request = request
                    .start_record_name(name)
                    .start_record_type(record_type)
                    .set_start_record_identifier(identifier);
            }
            let output = request.send().await.map_err(|e| DnsError::route53(OP, e))?;

            sets.extend(output.resource_record_sets().iter().map(|set| RecordSet {
                name: set.name().to_string(),
                record_type: set.r#type().as_str().to_string(),
                region: set.region().map(|r| r.as_str().to_string()),
                ttl: set.ttl(),
                values: set
                    .resource_records()
                    .iter()
                    .map(|r| r.value().to_string())
                    .collect(),
            }));

            match (output.next_record_name(), output.next_record_type()) {
                (Some(name), Some(record_type)) if output.is_truncated() => {
                    start = Some((
                        name.to_string(),
                        record_type.clone(),
                        output.next_record_identifier().map(String::from),
                    ));
                }
                _ => break,
            }
        }

        Ok(sets)
    }

    async fn change_record_set(&self, zone_id: &str, change: &RecordChange) -> Result<ChangeInfo> {
        const OP: &str = "ChangeResourceRecordSets";
        let build = |e: aws_sdk_route53::error::BuildError| DnsError::route53(OP, e);

        let record = sdk::ResourceRecord::builder()
            .value(&change.value)
            .build()
            .map_err(build)?;
        let record_set = sdk::ResourceRecordSet::builder()
            .name(&change.name)
            .r#type(sdk::RrType::from(change.record_type.as_str()))
            .ttl(change.ttl)
            .resource_records(record)
            .build()
            .map_err(build)?;
        let sdk_change = sdk::Change::builder()
            .action(sdk::ChangeAction::from(change.action.as_str()))
            .resource_record_set(record_set)
            .build()
            .map_err(build)?;
        let batch = sdk::ChangeBatch::builder()
            .comment(&change.comment)
            .changes(sdk_change)
            .build()
            .map_err(build)?;

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| DnsError::route53(OP, e))?;

        convert_change_info(OP, Option::from(output.change_info()))
    }

    async fn get_change(&self, change_id: &str) -> Result<ChangeInfo> {
        const OP: &str = "GetChange";
        let output = self
            .client
            .get_change()
            .id(change_id)
            .send()
            .await
            .map_err(|e| DnsError::route53(OP, e))?;

        convert_change_info(OP, Option::from(output.change_info()))
    }
}

/// Polling parameters for [`wait_for_sync`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from(&Route53Config::default())
    }
}

impl From<&Route53Config> for WaitOptions {
    fn from(config: &Route53Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            timeout: Duration::from_secs(config.wait_timeout_secs),
        }
    }
}

/// A single-record change as requested on the command line.
///
/// The record type is kept raw so unsupported types are reported as a skip
/// instead of a parse failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRequest {
    pub zone_id: String,
    pub name: String,
    pub value: String,
    pub comment: String,
    pub record_type: String,
    pub ttl: i64,
}

impl RecordRequest {
    pub fn supported_type(&self) -> Option<RecordType> {
        self.record_type.parse().ok()
    }

    fn change(&self, action: ChangeAction, record_type: RecordType) -> RecordChange {
        RecordChange {
            action,
            name: self.name.clone(),
            record_type,
            value: self.value.clone(),
            ttl: self.ttl,
            comment: self.comment.clone(),
        }
    }
}

/// Why a mutating operation made no call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    UnsupportedType,
    AlreadyExists,
    /// Unsupported type or the record does not exist
    NotApplicable,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsupportedType => "NOT SUPPORTED RECORD TYPE",
            Self::AlreadyExists => "SUPPORTED RECORD TYPE and RECORD ALREADY EXISTS",
            Self::NotApplicable => "NOT SUPPORTED RECORD TYPE OR RECORD NAME DOES NOT EXIST",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(ChangeInfo),
    Skipped(Skip),
}

pub async fn list_hosted_zones(api: &dyn RecordSetApi) -> Result<Vec<HostedZone>> {
    let zones = api.list_hosted_zones().await?;
    debug!("Listed {} hosted zones", zones.len());
    Ok(zones)
}

pub async fn list_record_sets(api: &dyn RecordSetApi, zone_id: &str) -> Result<Vec<RecordSet>> {
    let sets = api.list_record_sets(zone_id).await?;
    debug!("Listed {} record sets in zone={}", sets.len(), zone_id);
    Ok(sets)
}

/// Whether a record set named `name` exists in the zone
pub async fn record_set_exists(api: &dyn RecordSetApi, name: &str, zone_id: &str) -> Result<bool> {
    let exists = api
        .list_record_sets(zone_id)
        .await?
        .iter()
        .any(|set| same_name(&set.name, name));

    if exists {
        info!("resource_record_sets_name: {} EXISTS!", name);
    } else {
        info!("resource_record_sets_name: {} does NOT exist!", name);
    }
    Ok(exists)
}

/// Supported type and existing record only
async fn applicable(api: &dyn RecordSetApi, request: &RecordRequest) -> Result<Option<RecordType>> {
    let Some(record_type) = request.supported_type() else {
        return Ok(None);
    };
    if record_set_exists(api, &request.name, &request.zone_id).await? {
        Ok(Some(record_type))
    } else {
        Ok(None)
    }
}

/// UPSERT an existing A/CNAME record
pub async fn update_record_set(api: &dyn RecordSetApi, request: &RecordRequest) -> Result<Outcome> {
    let Some(record_type) = applicable(api, request).await? else {
        warn!("{}", Skip::NotApplicable);
        return Ok(Outcome::Skipped(Skip::NotApplicable));
    };

    info!("SUPPORTED RECORD TYPE and EXISTS");
    let change = api
        .change_record_set(&request.zone_id, &request.change(ChangeAction::Upsert, record_type))
        .await?;
    info!("record set: {} SUCCESSFULLY UPDATED", request.name);
    Ok(Outcome::Applied(change))
}

/// CREATE a new A/CNAME record and wait until Route 53 reports it INSYNC
pub async fn create_record_set(
    api: &dyn RecordSetApi,
    request: &RecordRequest,
    wait: &WaitOptions,
) -> Result<Outcome> {
    let Some(record_type) = request.supported_type() else {
        warn!("{}", Skip::UnsupportedType);
        return Ok(Outcome::Skipped(Skip::UnsupportedType));
    };

    if record_set_exists(api, &request.name, &request.zone_id).await? {
        warn!("{}", Skip::AlreadyExists);
        return Ok(Outcome::Skipped(Skip::AlreadyExists));
    }

    info!("SUPPORTED RECORD TYPE and RECORD WILL BE CREATED");
    let change = api
        .change_record_set(&request.zone_id, &request.change(ChangeAction::Create, record_type))
        .await?;
    let change = wait_for_sync(api, change, wait).await?;
    info!("record set: {} SUCCESSFULLY CREATED", request.name);
    Ok(Outcome::Applied(change))
}

/// DELETE an existing A/CNAME record; value and TTL must match the live record
pub async fn delete_record_set(api: &dyn RecordSetApi, request: &RecordRequest) -> Result<Outcome> {
    let Some(record_type) = applicable(api, request).await? else {
        warn!("{}, not possible to delete", Skip::NotApplicable);
        return Ok(Outcome::Skipped(Skip::NotApplicable));
    };

    info!("SUPPORTED RECORD TYPE and EXISTS, it's going to be DELETED");
    let change = api
        .change_record_set(&request.zone_id, &request.change(ChangeAction::Delete, record_type))
        .await?;
    info!("record set: {} SUCCESSFULLY DELETED", request.name);
    Ok(Outcome::Applied(change))
}

/// Poll `GetChange` until the change is INSYNC or `wait.timeout` elapses
pub async fn wait_for_sync(
    api: &dyn RecordSetApi,
    change: ChangeInfo,
    wait: &WaitOptions,
) -> Result<ChangeInfo> {
    let started = tokio::time::Instant::now();
    let mut current = change;

    while current.status != ChangeStatus::InSync {
        if started.elapsed() >= wait.timeout {
            return Err(DnsError::WaitTimeout {
                change_id: current.id,
                status: current.status.to_string(),
                waited_secs: wait.timeout.as_secs(),
            });
        }
        debug!("Change {} is {}, polling again", current.id, current.status);
        tokio::time::sleep(wait.poll_interval).await;
        current = api.get_change(&current.id).await?;
    }

    Ok(current)
}
