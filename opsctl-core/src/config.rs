use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{OpsError, Result};

/// Default AWS region used when neither flags nor config name one
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// TTL applied to every Route 53 change batch
pub const DEFAULT_ROUTE53_TTL: i64 = 60;

/// TTL applied to Dyn A records
pub const DEFAULT_DYN_TTL: u32 = 30;

/// Public load balancer name Dyn `add` resolves in public mode
pub const DEFAULT_LOOKUP_HOST_TEMPLATE: &str = "{machine}-lb.eastus.cloudapp.azure.com";

/// Database connection settings read from a service `.env` file.
///
/// Keys: `DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASS`.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceEnv {
    pub host: String,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ServiceEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEnv")
            .field("host", &self.host)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl ServiceEnv {
    /// Load settings from the given `.env` file.
    ///
    /// Fails with [`OpsError::MissingEnvFile`] when the file does not exist.
    /// Only the file is consulted; process environment variables are ignored
    /// so a stray `DB_PASS` in the shell never leaks into a provisioning run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OpsError::missing_env_file(path));
        }

        debug!("Looking for DB credentials in {}", path.display());

        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| OpsError::env_file(path, e.to_string()))?;

        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| OpsError::env_file(path, e.to_string()))?;
            values.insert(key, value);
        }

        Self::from_map(&values, &path.display().to_string())
    }

    fn from_map(values: &HashMap<String, String>, context: &str) -> Result<Self> {
        let get = |key: &str| -> Result<String> {
            values
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| OpsError::missing_key(key, context))
        };

        Ok(Self {
            host: get("DB_HOST")?,
            dbname: get("DB_NAME")?,
            user: get("DB_USER")?,
            password: get("DB_PASS")?,
        })
    }
}

/// Check that every named argument carries a non-empty value.
///
/// Returns [`OpsError::MissingArguments`] listing all absent flags at once.
pub fn require_present<'a, I>(args: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let missing: Vec<&str> = args
        .into_iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(OpsError::missing_arguments(missing))
    }
}

/// User-level defaults from `~/.opsctl/config.toml`.
///
/// Every section is optional; a missing file yields the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OpsConfig {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub route53: Route53Config,
    #[serde(default, rename = "dyn")]
    pub dynect: DynConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_AWS_REGION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Route53Config {
    pub ttl: i64,
    pub poll_interval_secs: u64,
    pub wait_timeout_secs: u64,
}

impl Default for Route53Config {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_ROUTE53_TTL,
            poll_interval_secs: 2,
            wait_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DynConfig {
    pub customer: Option<String>,
    pub username: Option<String>,
    pub zone: Option<String>,
    pub ttl: u32,
    pub lookup_host_template: String,
}

impl Default for DynConfig {
    fn default() -> Self {
        Self {
            customer: None,
            username: None,
            zone: None,
            ttl: DEFAULT_DYN_TTL,
            lookup_host_template: DEFAULT_LOOKUP_HOST_TEMPLATE.to_string(),
        }
    }
}

impl OpsConfig {
    /// Load config from `~/.opsctl/config.toml`, falling back to defaults
    /// when the file is absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| OpsError::config(format!("invalid TOML in {}: {}", path.display(), e)))
    }

    /// Get config file path: ~/.opsctl/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".opsctl/config.toml")
    }

    /// Save config to the given path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| OpsError::config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| OpsError::config(format!("failed to serialize config: {}", e)))
    }
}

/// Expand `{machine}` in a lookup host template
pub fn expand_lookup_host(template: &str, machine: &str) -> String {
    template.replace("{machine}", machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_service_env_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "DB_HOST=db.internal").unwrap();
        writeln!(file, "DB_NAME=postgres").unwrap();
        writeln!(file, "DB_USER=admin").unwrap();
        writeln!(file, "DB_PASS='s3cr#t'").unwrap();

        let env = ServiceEnv::load(file.path()).unwrap();
        assert_eq!(env.host, "db.internal");
        assert_eq!(env.dbname, "postgres");
        assert_eq!(env.user, "admin");
        assert_eq!(env.password, "s3cr#t");
    }

    #[test]
    fn test_service_env_missing_file() {
        let dir = tempdir().unwrap();
        let err = ServiceEnv::load(dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, OpsError::MissingEnvFile { .. }));
        assert!(err.to_string().starts_with("Missing .env file!"));
    }

    #[test]
    fn test_service_env_missing_key() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "DB_HOST=db.internal").unwrap();
        writeln!(file, "DB_NAME=postgres").unwrap();
        writeln!(file, "DB_USER=admin").unwrap();

        let err = ServiceEnv::load(file.path()).unwrap_err();
        assert!(matches!(err, OpsError::MissingKey { ref key, .. } if key == "DB_PASS"));
    }

    #[test]
    fn test_service_env_debug_hides_password() {
        let env = ServiceEnv {
            host: "h".into(),
            dbname: "d".into(),
            user: "u".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", env).contains("hunter2"));
    }

    #[test]
    fn test_require_present() {
        assert!(require_present([("--dbhost", Some("localhost"))]).is_ok());

        let err = require_present([
            ("--dbhost", Some("localhost")),
            ("--dbname", None),
            ("--dbuser", Some("  ")),
        ])
        .unwrap_err();
        match err {
            OpsError::MissingArguments { names } => {
                assert_eq!(names, vec!["--dbname", "--dbuser"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ops_config_defaults_when_absent() {
        let dir = tempdir().unwrap();
        let cfg = OpsConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, OpsConfig::default());
        assert_eq!(cfg.aws.region, "us-east-1");
        assert_eq!(cfg.route53.ttl, 60);
        assert_eq!(cfg.dynect.ttl, 30);
    }

    #[test]
    fn test_ops_config_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[aws]\nregion = \"eu-west-1\"\n\n[dyn]\ncustomer = \"acme\"\nttl = 30\nlookup_host_template = \"{machine}.example.net\"\n",
        )
        .unwrap();

        let cfg = OpsConfig::load_from(&path).unwrap();
        assert_eq!(cfg.aws.region, "eu-west-1");
        assert_eq!(cfg.dynect.customer.as_deref(), Some("acme"));
        assert_eq!(cfg.route53, Route53Config::default());
    }

    #[test]
    fn test_ops_config_section_with_some_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[dyn]\ncustomer = \"acme\"\n\n[route53]\nttl = 120\n\n[aws]\n").unwrap();

        let cfg = OpsConfig::load_from(&path).unwrap();
        assert_eq!(cfg.dynect.customer.as_deref(), Some("acme"));
        assert_eq!(cfg.dynect.ttl, DEFAULT_DYN_TTL);
        assert_eq!(cfg.dynect.lookup_host_template, DEFAULT_LOOKUP_HOST_TEMPLATE);
        assert_eq!(cfg.route53.ttl, 120);
        assert_eq!(cfg.route53.poll_interval_secs, 2);
        assert_eq!(cfg.route53.wait_timeout_secs, 300);
        assert_eq!(cfg.aws, AwsConfig::default());
    }

    #[test]
    fn test_ops_config_save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut cfg = OpsConfig::default();
        cfg.dynect.zone = Some("example.com".into());

        cfg.save_to(&path).unwrap();
        assert_eq!(OpsConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn test_expand_lookup_host() {
        assert_eq!(
            expand_lookup_host(DEFAULT_LOOKUP_HOST_TEMPLATE, "node7"),
            "node7-lb.eastus.cloudapp.azure.com"
        );
    }
}
