//! Provider-neutral record types.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::DnsError;

/// Record types the mutating operations accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordType {
    A,
    Cname,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "CNAME" => Ok(Self::Cname),
            other => Err(DnsError::InvalidRecordType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Upsert,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Upsert => "UPSERT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hosted zone as listed by Route 53
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostedZone {
    pub id: String,
    pub name: String,
    pub caller_reference: String,
    pub private_zone: bool,
    pub record_count: Option<i64>,
    pub linked_service: Option<String>,
}

impl HostedZone {
    pub fn render(&self) -> String {
        format!(
            "Route53 Hosted Zones:\n\
             hostedzone_id: {}\n\
             hostedzone_name: {}\n\
             hostedzone_caller_ref: {}\n\
             hostedzone_conf_privzone: {}\n\
             hostedzone_record_count: {}\n\
             hostedzone_linkedserv_serv: {}",
            self.id,
            self.name,
            self.caller_reference,
            self.private_zone,
            self.record_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "None".into()),
            self.linked_service.as_deref().unwrap_or(""),
        )
    }
}

/// A resource record set as listed by Route 53.
///
/// `record_type` stays a string since listings contain every type (SOA, NS,
/// MX, ...), not just the ones opsctl mutates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSet {
    pub name: String,
    pub record_type: String,
    pub region: Option<String>,
    pub ttl: Option<i64>,
    pub values: Vec<String>,
}

impl RecordSet {
    pub fn render(&self, zone_id: &str) -> String {
        format!(
            "Route53 Resource record sets for zone: {}\n\
             resource_record_sets_name: {}\n\
             resource_record_sets_type: {}\n\
             resource_record_sets_region: {}\n\
             resource_record_sets_ttl: {}\n\
             resource_record_sets_record_value: {}",
            zone_id,
            self.name,
            self.record_type,
            self.region.as_deref().unwrap_or("None"),
            self.ttl
                .map(|n| n.to_string())
                .unwrap_or_else(|| "None".into()),
            // Only the last value is shown
            self.values.last().map(String::as_str).unwrap_or(""),
        )
    }
}

/// The single change submitted in a change batch
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    pub action: ChangeAction,
    pub name: String,
    pub record_type: RecordType,
    pub value: String,
    pub ttl: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Pending,
    InSync,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::InSync => "INSYNC",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeInfo {
    pub id: String,
    pub status: ChangeStatus,
}

/// Compare DNS names ignoring the optional trailing dot and ASCII case
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parse() {
        assert_eq!("A".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("CNAME".parse::<RecordType>().unwrap(), RecordType::Cname);
        assert!(matches!(
            "MX".parse::<RecordType>(),
            Err(DnsError::InvalidRecordType(t)) if t == "MX"
        ));
    }

    #[test]
    fn test_same_name_ignores_trailing_dot() {
        assert!(same_name("www.example.com.", "www.example.com"));
        assert!(same_name("WWW.example.com", "www.example.com."));
        assert!(!same_name("www.example.com", "api.example.com"));
    }

    #[test]
    fn test_record_set_render_shows_last_value() {
        let set = RecordSet {
            name: "example.com.".into(),
            record_type: "NS".into(),
            region: None,
            ttl: Some(172800),
            values: vec!["ns-1.awsdns.com.".into(), "ns-2.awsdns.net.".into()],
        };
        let out = set.render("/hostedzone/Z1");
        assert!(out.contains("resource_record_sets_ttl: 172800"));
        assert!(out.contains("resource_record_sets_region: None"));
        assert!(out.ends_with("resource_record_sets_record_value: ns-2.awsdns.net."));
    }
}
