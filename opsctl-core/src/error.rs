/// Structured error types for opsctl-core.
///
/// Uses `thiserror` so library consumers get composable errors.
/// The binary crate (opsctl-cli) wraps these with `anyhow` for context.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for opsctl-core operations
#[derive(Error, Debug)]
pub enum OpsError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// The service `.env` file does not exist
    #[error("Missing .env file! (looked at {path:?})")]
    MissingEnvFile { path: PathBuf },

    /// The `.env` file exists but could not be parsed
    #[error("Failed to parse env file {path:?}: {reason}")]
    EnvFile { path: PathBuf, reason: String },

    /// Required key missing from the environment file
    #[error("Missing required key '{key}' in {context}")]
    MissingKey { key: String, context: String },

    /// A mandatory command-line argument was absent or empty
    #[error("Mandatory arguments are missing: {}", names.join(", "))]
    MissingArguments { names: Vec<String> },

    /// Requested password length cannot satisfy the character-class rules
    #[error("Password length {length} is too short (minimum {minimum})")]
    PasswordTooShort { length: usize, minimum: usize },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for opsctl-core operations
pub type Result<T> = std::result::Result<T, OpsError>;

impl OpsError {
    /// Create a missing env file error
    pub fn missing_env_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingEnvFile { path: path.into() }
    }

    /// Create an env file parse error
    pub fn env_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::EnvFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing key error
    pub fn missing_key(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingKey {
            key: key.into(),
            context: context.into(),
        }
    }

    /// Create a missing arguments error
    pub fn missing_arguments<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingArguments {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OpsError::missing_key("DB_HOST", ".env");
        assert_eq!(err.to_string(), "Missing required key 'DB_HOST' in .env");

        let err = OpsError::missing_arguments(["--dbhost", "--newdbpass"]);
        assert_eq!(
            err.to_string(),
            "Mandatory arguments are missing: --dbhost, --newdbpass"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let ops_err: OpsError = io_err.into();

        assert!(matches!(ops_err, OpsError::Io { .. }));
    }
}
