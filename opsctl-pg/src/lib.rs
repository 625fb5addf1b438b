//! PostgreSQL provisioning for opsctl
//!
//! - [`push_button`]: create/delete a database, role and user for push-button environments
//! - [`service`]: per-service database, read-only/read-write roles and app user
//! - [`admin`]: the individual catalog operations both workflows are built from

pub mod admin;
pub mod connection;
pub mod error;
#[cfg(test)]
mod memory;
pub mod push_button;
pub mod service;
pub mod sql;

pub use connection::{Catalog, ConnectTarget, Connector, PgConnector};
pub use error::{PgAdminError, Result};
pub use push_button::PushButtonOptions;
pub use service::{ServiceListing, ServiceNames, UserOutcome};
