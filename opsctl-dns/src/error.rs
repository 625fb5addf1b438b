use thiserror::Error;

/// Boxed underlying cause (AWS SDK, reqwest or a test fake)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DnsError {
    /// A Route 53 API call failed
    #[error("Route53 {operation} failed")]
    Route53 {
        operation: &'static str,
        source: BoxError,
    },

    /// Route 53 answered without a field the workflow depends on
    #[error("Route53 {operation} returned no {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    /// The change never reached INSYNC
    #[error("Change {change_id} still {status} after {waited_secs}s")]
    WaitTimeout {
        change_id: String,
        status: String,
        waited_secs: u64,
    },

    #[error("Dyn request to {endpoint} failed")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Dyn answered with `status != "success"`
    #[error("Dyn {endpoint} returned status={status}: {messages}")]
    DynApi {
        endpoint: String,
        status: String,
        messages: String,
    },

    /// Dyn answered with a `data` payload of an unexpected shape
    #[error("Unexpected Dyn response from {endpoint}")]
    DynDecode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dyn session is not open")]
    NoSession,

    /// The machine address could not be determined
    #[error("Unable to resolve address for machine={machine}: {reason}")]
    Resolve { machine: String, reason: String },

    #[error("Invalid record type: {0:?}")]
    InvalidRecordType(String),
}

/// Result type alias for opsctl-dns operations
pub type Result<T> = std::result::Result<T, DnsError>;

impl DnsError {
    pub fn route53(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Route53 {
            operation,
            source: source.into(),
        }
    }

    pub fn http(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn resolve(machine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolve {
            machine: machine.into(),
            reason: reason.into(),
        }
    }
}
