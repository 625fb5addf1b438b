use opsctl_core::OpsError;
use thiserror::Error;

/// Boxed underlying cause (sqlx or a test catalog)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the provisioning workflows.
///
/// None of these are retried; they propagate to the entry point which exits
/// non-zero.
#[derive(Error, Debug)]
pub enum PgAdminError {
    /// Opening a connection failed
    #[error("Unable to connect to database={database} on host={host}")]
    Connect {
        host: String,
        database: String,
        source: BoxError,
    },

    /// A DDL statement did not complete with the expected command tag
    #[error("Unable to {action} (expected status {expected})")]
    Statement {
        action: String,
        expected: &'static str,
        source: BoxError,
    },

    /// A catalog lookup failed
    #[error("Catalog query failed: {what}")]
    Query { what: String, source: BoxError },

    /// Closing the connection failed
    #[error("Unable to close connection to database={database}")]
    Close { database: String, source: BoxError },

    #[error(transparent)]
    Core(#[from] OpsError),
}

/// Result type alias for opsctl-pg operations
pub type Result<T> = std::result::Result<T, PgAdminError>;

impl PgAdminError {
    pub fn connect(
        host: impl Into<String>,
        database: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Connect {
            host: host.into(),
            database: database.into(),
            source: source.into(),
        }
    }

    pub fn statement(
        action: impl Into<String>,
        expected: &'static str,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Statement {
            action: action.into(),
            expected,
            source: source.into(),
        }
    }

    pub fn query(what: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Query {
            what: what.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_statement_error_keeps_source() {
        let err = PgAdminError::statement("create role", "CREATE ROLE", "permission denied");
        assert_eq!(
            err.to_string(),
            "Unable to create role (expected status CREATE ROLE)"
        );
        assert_eq!(err.source().unwrap().to_string(), "permission denied");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: PgAdminError = OpsError::missing_arguments(["--dbhost"]).into();
        assert_eq!(err.to_string(), "Mandatory arguments are missing: --dbhost");
    }
}
