//! DNS record management for opsctl
//!
//! - [`route53`]: list, check, create, update and delete A/CNAME records in AWS Route 53
//! - [`dynect`]: add and remove machine A records through the Dyn REST API

pub mod dynect;
pub mod error;
pub mod record;
pub mod route53;

pub use dynect::{AddressSource, DynClient, DynCredentials, MachineRecord};
pub use error::{DnsError, Result};
pub use record::{ChangeInfo, ChangeStatus, HostedZone, RecordSet, RecordType};
pub use route53::{Outcome, RecordRequest, RecordSetApi, Route53Client, Skip, WaitOptions};
