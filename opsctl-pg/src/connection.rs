//! Connection helper and the catalog seam used by the workflows.
//!
//! Workflows talk to a [`Connector`] and the [`Catalog`] sessions it opens,
//! never to sqlx directly. [`PgConnector`] is the real implementation: one
//! `PgConnection` per session, statements run in autocommit mode.

use std::fmt;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, error, info};

use crate::error::{PgAdminError, Result};
use crate::sql::Ddl;

pub const DEFAULT_PORT: u16 = 5432;

/// Where and as whom to connect
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl ConnectTarget {
    pub fn new(
        host: impl Into<String>,
        dbname: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            dbname: dbname.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Same server and credentials, different database
    pub fn with_dbname(&self, dbname: impl Into<String>) -> Self {
        Self {
            dbname: dbname.into(),
            ..self.clone()
        }
    }

    /// Same server and database, different credentials
    pub fn with_credentials(&self, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// One open session against a database
#[async_trait]
pub trait Catalog: Send {
    /// Database this session is connected to
    fn database(&self) -> &str;

    async fn role_exists(&mut self, role: &str) -> Result<bool>;
    async fn database_exists(&mut self, database: &str) -> Result<bool>;
    async fn extension_exists(&mut self, extension: &str) -> Result<bool>;

    /// Role names matching a SQL `LIKE` pattern, sorted
    async fn roles_like(&mut self, pattern: &str) -> Result<Vec<String>>;

    /// Server version string (`SELECT version()`)
    async fn version(&mut self) -> Result<String>;

    /// Run one DDL statement outside any transaction
    async fn execute(&mut self, statement: &Ddl) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens catalog sessions
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Catalog>>;
}

/// Open a session, logging the attempt
pub async fn connect(
    connector: &dyn Connector,
    target: &ConnectTarget,
) -> Result<Box<dyn Catalog>> {
    info!("Connect to database={}", target.dbname);
    debug!(host = %target.host, user = %target.user, "opening connection");
    connector.connect(target).await.map_err(|err| {
        error!("Unable to connect to database");
        err
    })
}

/// Close a session, logging the attempt
pub async fn close(catalog: Box<dyn Catalog>) -> Result<()> {
    info!("Close database connection to database={}", catalog.database());
    catalog.close().await
}

/// sqlx-backed connector
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Catalog>> {
        let options = PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .database(&target.dbname)
            .username(&target.user)
            .password(&target.password)
            .application_name("opsctl");

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|source| PgAdminError::connect(&target.host, &target.dbname, source))?;

        Ok(Box::new(PgCatalog {
            conn,
            database: target.dbname.clone(),
        }))
    }
}

/// A live PostgreSQL session
pub struct PgCatalog {
    conn: PgConnection,
    database: String,
}

impl fmt::Debug for PgCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgCatalog")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl PgCatalog {
    async fn exists(&mut self, sql: &'static str, name: &str) -> Result<bool> {
        let row: Option<i32> = sqlx::query_scalar(sql)
            .bind(name)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|source| PgAdminError::query(format!("{} [{}]", sql, name), source))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn role_exists(&mut self, role: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM pg_roles WHERE rolname = $1", role)
            .await
    }

    async fn database_exists(&mut self, database: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM pg_database WHERE datname = $1", database)
            .await
    }

    async fn extension_exists(&mut self, extension: &str) -> Result<bool> {
        self.exists("SELECT 1 FROM pg_extension WHERE extname = $1", extension)
            .await
    }

    async fn roles_like(&mut self, pattern: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT rolname::text FROM pg_roles WHERE rolname LIKE $1 ORDER BY rolname",
        )
        .bind(pattern)
        .fetch_all(&mut self.conn)
        .await
        .map_err(|source| PgAdminError::query(format!("roles like {}", pattern), source))
    }

    async fn version(&mut self) -> Result<String> {
        sqlx::query_scalar("SELECT version()")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|source| PgAdminError::query("SELECT version()", source))
    }

    async fn execute(&mut self, statement: &Ddl) -> Result<()> {
        let sql = statement.to_sql();
        // Simple-query protocol: CREATE/DROP DATABASE refuse to run in a transaction block.
        sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(&sql))
            .await
            .map_err(|source| {
                PgAdminError::statement(statement.action(), statement.expected_tag(), source)
            })?;
        debug!(
            "Statement [{:?}] completed (expected {})",
            statement,
            statement.expected_tag()
        );
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let database = self.database;
        self.conn
            .close()
            .await
            .map_err(|source| PgAdminError::Close {
                database,
                source: source.into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_derivation() {
        let admin = ConnectTarget::new("db.internal", "postgres", "admin", "secret");
        let target = admin.with_dbname("billing");
        assert_eq!(target.dbname, "billing");
        assert_eq!(target.user, "admin");

        let as_user = target.with_credentials("user_billing", "pw");
        assert_eq!(as_user.dbname, "billing");
        assert_eq!(as_user.user, "user_billing");
        assert_eq!(as_user.port, 5432);
    }

    #[test]
    fn test_target_debug_hides_password() {
        let target = ConnectTarget::new("h", "d", "u", "hunter2").with_port(6543);
        let rendered = format!("{:?}", target);
        assert!(rendered.contains("6543"));
        assert!(!rendered.contains("hunter2"));
    }
}
