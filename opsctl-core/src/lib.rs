pub mod config;
pub mod error;
pub mod password;

pub use config::{require_present, OpsConfig, ServiceEnv};
pub use error::{OpsError, Result};
pub use password::{random_password, write_secret, SERVICE_PASSWORD_LENGTH};
