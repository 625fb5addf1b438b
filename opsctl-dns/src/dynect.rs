//! Dyn Traffic Management REST client and the machine A-record tasks.

use std::fmt;
use std::net::IpAddr;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{DnsError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.dynect.net/REST";

const AUTH_HEADER: &str = "Auth-Token";

/// Login credentials for a Dyn session
#[derive(Clone)]
pub struct DynCredentials {
    pub customer: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DynCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynCredentials")
            .field("customer", &self.customer)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Every Dyn response wraps its payload the same way
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    msgs: Vec<DynMessage>,
}

#[derive(Debug, Deserialize)]
struct DynMessage {
    #[serde(rename = "INFO", default)]
    info: Option<String>,
    #[serde(rename = "LVL", default)]
    level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    token: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    customer_name: &'a str,
    user_name: &'a str,
    password: &'a str,
}

/// An A record as returned after creation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ARecord {
    pub zone: String,
    pub fqdn: String,
    pub ttl: u32,
    pub rdata: ARecordData,
    #[serde(default)]
    pub record_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ARecordData {
    pub address: String,
}

pub struct DynClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl Default for DynClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DynClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn has_session(&self) -> bool {
        self.token.is_some()
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Dyn {} {}", method, endpoint);

        let mut request = self.http.request(method, &url);
        if let Some(token) = &self.token {
            request = request.header(AUTH_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DnsError::http(endpoint, e))?;
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| DnsError::http(endpoint, e))?;

        if envelope.status != "success" {
            let messages = envelope
                .msgs
                .iter()
                .filter(|m| m.level.as_deref() != Some("INFO"))
                .filter_map(|m| m.info.as_deref())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DnsError::DynApi {
                endpoint: endpoint.to_string(),
                status: envelope.status,
                messages,
            });
        }

        serde_json::from_value(envelope.data).map_err(|source| DnsError::DynDecode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn require_session(&self) -> Result<()> {
        if self.has_session() {
            Ok(())
        } else {
            Err(DnsError::NoSession)
        }
    }

    /// Open a session; the token is attached to every later request
    pub async fn login(&mut self, credentials: &DynCredentials) -> Result<()> {
        let body = serde_json::to_value(LoginRequest {
            customer_name: &credentials.customer,
            user_name: &credentials.username,
            password: &credentials.password,
        })
        .map_err(|source| DnsError::DynDecode {
            endpoint: "Session/".into(),
            source,
        })?;

        let session: SessionData = self.call(Method::POST, "Session/", Some(body)).await?;
        self.token = Some(session.token);
        info!(
            "Dyn session opened for customer={} user={}",
            credentials.customer, credentials.username
        );
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.require_session()?;
        let _: Value = self.call(Method::DELETE, "Session/", None).await?;
        self.token = None;
        debug!("Dyn session closed");
        Ok(())
    }

    pub async fn add_a_record(
        &self,
        zone: &str,
        fqdn: &str,
        address: IpAddr,
        ttl: u32,
    ) -> Result<ARecord> {
        self.require_session()?;
        let body = json!({
            "rdata": { "address": address.to_string() },
            "ttl": ttl,
        });
        self.call(
            Method::POST,
            &format!("ARecord/{}/{}/", zone, fqdn),
            Some(body),
        )
        .await
    }

    /// URIs of every record on the node
    pub async fn node_records(&self, zone: &str, fqdn: &str) -> Result<Vec<String>> {
        self.require_session()?;
        self.call(Method::GET, &format!("ANYRecord/{}/{}/", zone, fqdn), None)
            .await
    }

    /// Remove the node and all of its records
    pub async fn delete_node(&self, zone: &str, fqdn: &str) -> Result<()> {
        self.require_session()?;
        let _: Value = self
            .call(Method::DELETE, &format!("Node/{}/{}/", zone, fqdn), None)
            .await?;
        Ok(())
    }

    /// Publish pending changes to the zone
    pub async fn publish(&self, zone: &str) -> Result<()> {
        self.require_session()?;
        let _: Value = self
            .call(
                Method::PUT,
                &format!("Zone/{}/", zone),
                Some(json!({ "publish": true })),
            )
            .await?;
        info!("Published zone={}", zone);
        Ok(())
    }
}

/// Where the machine address comes from
#[derive(Debug, Clone, PartialEq)]
pub enum AddressSource {
    /// DNS lookup of the machine's public load balancer name
    Public { lookup_host: String },
    /// `docker-machine ip <machine>`
    Private,
    Fixed(IpAddr),
}

pub async fn resolve_address(machine: &str, source: &AddressSource) -> Result<IpAddr> {
    let address = match source {
        AddressSource::Fixed(address) => *address,
        AddressSource::Public { lookup_host } => {
            debug!("Resolving {}", lookup_host);
            let addrs: Vec<IpAddr> = tokio::net::lookup_host((lookup_host.as_str(), 0))
                .await
                .map_err(|e| DnsError::resolve(machine, format!("{}: {}", lookup_host, e)))?
                .map(|socket| socket.ip())
                .collect();
            addrs
                .iter()
                .find(|ip| ip.is_ipv4())
                .or_else(|| addrs.first())
                .copied()
                .ok_or_else(|| {
                    DnsError::resolve(machine, format!("{} has no addresses", lookup_host))
                })?
        }
        AddressSource::Private => {
            let output = tokio::process::Command::new("docker-machine")
                .arg("ip")
                .arg(machine)
                .output()
                .await
                .map_err(|e| DnsError::resolve(machine, format!("docker-machine: {}", e)))?;
            if !output.status.success() {
                return Err(DnsError::resolve(
                    machine,
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            stdout.trim().parse().map_err(|_| {
                DnsError::resolve(machine, format!("not an IP address: {:?}", stdout.trim()))
            })?
        }
    };

    info!("IP Address: {}", address);
    Ok(address)
}

/// The A record `<machine>.<subdomain>` inside `zone`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRecord {
    pub zone: String,
    pub machine: String,
    pub subdomain: String,
}

impl MachineRecord {
    /// Node name relative to the zone
    pub fn node(&self) -> String {
        format!("{}.{}", self.machine, self.subdomain)
    }

    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.node(), self.zone)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddReport {
    pub node: String,
    pub address: IpAddr,
    pub records: Vec<String>,
}

impl AddReport {
    pub fn banner(&self) -> String {
        let rule = "=".repeat(43);
        format!(
            "{rule}\n{} A-Record IP: {}\n{rule}",
            self.node, self.address
        )
    }
}

/// Logout failures are only logged so they never mask the outcome
async fn close_session(client: &mut DynClient) {
    if let Err(e) = client.logout().await {
        warn!("Dyn logout failed: {}", e);
    }
}

async fn add_and_publish(
    client: &DynClient,
    zone: &str,
    fqdn: &str,
    address: IpAddr,
    ttl: u32,
) -> Result<Vec<String>> {
    let created = client.add_a_record(zone, fqdn, address, ttl).await?;
    info!(
        "Added A record fqdn={} address={} ttl={}",
        created.fqdn, created.rdata.address, created.ttl
    );
    let records = client.node_records(zone, fqdn).await?;
    client.publish(zone).await?;
    Ok(records)
}

/// Add an A record for the machine, show the node's records and publish
pub async fn add_machine_record(
    client: &mut DynClient,
    credentials: &DynCredentials,
    record: &MachineRecord,
    address: IpAddr,
    ttl: u32,
) -> Result<AddReport> {
    client.login(credentials).await?;
    let result = add_and_publish(client, &record.zone, &record.fqdn(), address, ttl).await;
    close_session(client).await;

    Ok(AddReport {
        node: record.node(),
        address,
        records: result?,
    })
}

/// Delete the machine's node with all its records and publish
pub async fn remove_machine_record(
    client: &mut DynClient,
    credentials: &DynCredentials,
    record: &MachineRecord,
) -> Result<()> {
    info!("DELETING: {} and its records", record.node());

    client.login(credentials).await?;
    let result = async {
        client.delete_node(&record.zone, &record.fqdn()).await?;
        client.publish(&record.zone).await
    }
    .await;
    close_session(client).await;
    result
}
