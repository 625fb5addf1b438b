//! Push-button environment provisioning.
//!
//! `create` sets up a database, a permanent role with power privileges on it,
//! and a login user holding that role. `delete` is its counterpart: it strips
//! the privileges, hands ownership back to the admin user, then drops the user
//! and the database. The role is shared across environments and is only
//! dropped when asked for. Neither step is rolled back on a mid-sequence
//! failure.

use opsctl_core::require_present;
use tracing::info;

use crate::admin;
use crate::connection::{self, ConnectTarget, Connector};
use crate::error::Result;

/// Options shared by `create` and `delete`
#[derive(Clone)]
pub struct PushButtonOptions {
    /// Admin connection (a user allowed to create roles and databases)
    pub admin: ConnectTarget,
    pub new_db_name: String,
    pub new_db_role: String,
    pub new_db_user: String,
    pub new_db_pass: String,
    /// Extensions to install in the new database (create only)
    pub extensions: Vec<String>,
    /// Also drop the role once the database is gone (delete only)
    pub drop_role: bool,
}

impl std::fmt::Debug for PushButtonOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushButtonOptions")
            .field("admin", &self.admin)
            .field("new_db_name", &self.new_db_name)
            .field("new_db_role", &self.new_db_role)
            .field("new_db_user", &self.new_db_user)
            .field("extensions", &self.extensions)
            .field("drop_role", &self.drop_role)
            .finish_non_exhaustive()
    }
}

impl PushButtonOptions {
    /// Reject empty mandatory values, naming every offending flag
    pub fn validate(&self) -> Result<()> {
        require_present([
            ("--dbhost", Some(self.admin.host.as_str())),
            ("--dbname", Some(self.admin.dbname.as_str())),
            ("--dbuser", Some(self.admin.user.as_str())),
            ("--dbpass", Some(self.admin.password.as_str())),
            ("--newdbname", Some(self.new_db_name.as_str())),
            ("--newdbrole", Some(self.new_db_role.as_str())),
            ("--newdbuser", Some(self.new_db_user.as_str())),
            ("--newdbpass", Some(self.new_db_pass.as_str())),
        ])?;
        Ok(())
    }
}

/// Split a comma-separated extension list, dropping blanks
pub fn parse_extensions(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

pub async fn create(connector: &dyn Connector, opts: &PushButtonOptions) -> Result<()> {
    opts.validate()?;

    // Admin database: role and database
    let mut catalog = connection::connect(connector, &opts.admin).await?;

    let role = opts.new_db_role.as_str();
    if catalog.role_exists(role).await? {
        info!("Role ALREADY exists. Skip.");
    } else {
        admin::create_role(catalog.as_mut(), role).await?;
    }

    let new_db = opts.new_db_name.as_str();
    if catalog.database_exists(new_db).await? {
        info!("Database ALREADY exists. Skip.");
    } else {
        admin::create_database(catalog.as_mut(), new_db).await?;
    }

    connection::close(catalog).await?;

    // New database: privileges, user, extensions
    let mut catalog = connection::connect(connector, &opts.admin.with_dbname(new_db)).await?;

    admin::grant_role_power_privileges(catalog.as_mut(), role).await?;

    let user = opts.new_db_user.as_str();
    if catalog.role_exists(user).await? {
        info!("User ALREADY exists. Skip.");
    } else {
        admin::create_user(catalog.as_mut(), user, &opts.new_db_pass, role).await?;
    }

    for extension in &opts.extensions {
        if catalog.extension_exists(extension).await? {
            info!("Extension ALREADY exists with name={}. Skip.", extension);
        } else {
            admin::create_extension(catalog.as_mut(), extension).await?;
        }
    }

    connection::close(catalog).await
}

pub async fn delete(connector: &dyn Connector, opts: &PushButtonOptions) -> Result<()> {
    opts.validate()?;

    let target_db = opts.new_db_name.as_str();
    let user = opts.new_db_user.as_str();
    let role = opts.new_db_role.as_str();

    // Connect to the target database as the user being removed
    let as_user = opts
        .admin
        .with_dbname(target_db)
        .with_credentials(user, &opts.new_db_pass);
    let mut catalog = connection::connect(connector, &as_user).await?;

    admin::revoke_role_power_privileges(catalog.as_mut(), role).await?;
    admin::drop_owned(catalog.as_mut(), user).await?;

    connection::close(catalog).await?;

    // Back on the admin database with the admin user
    let mut catalog = connection::connect(connector, &opts.admin).await?;

    info!("Grant roles and reassign owned before removing user/database.");
    admin::grant_role(catalog.as_mut(), role, &opts.admin.user).await?;
    admin::grant_role(catalog.as_mut(), user, &opts.admin.user).await?;
    admin::reassign_owned(catalog.as_mut(), user, &opts.admin.user).await?;

    if catalog.role_exists(user).await? {
        admin::delete_user(catalog.as_mut(), user).await?;
    } else {
        info!("User DOES NOT exist. Skip.");
    }

    if catalog.database_exists(target_db).await? {
        admin::delete_database(catalog.as_mut(), target_db).await?;
    } else {
        info!("Database DOES NOT exist. Skip.");
    }

    if opts.drop_role {
        if catalog.role_exists(role).await? {
            admin::delete_role(catalog.as_mut(), role).await?;
        } else {
            info!("Role DOES NOT exist. Skip.");
        }
    }

    connection::close(catalog).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PgAdminError;
    use crate::memory::MemoryCluster;

    fn cluster() -> MemoryCluster {
        MemoryCluster::with_admin("admin", "admin-pw", "postgres")
    }

    fn options() -> PushButtonOptions {
        PushButtonOptions {
            admin: ConnectTarget::new("db.internal", "postgres", "admin", "admin-pw"),
            new_db_name: "pb_1234".into(),
            new_db_role: "pb_power".into(),
            new_db_user: "pb_user".into(),
            new_db_pass: "pb-pw".into(),
            extensions: vec!["pgcrypto".into(), "uuid-ossp".into()],
            drop_role: false,
        }
    }

    #[tokio::test]
    async fn test_create_provisions_everything() {
        let cluster = cluster();
        create(&cluster, &options()).await.unwrap();

        assert!(cluster.has_role("pb_power"));
        assert!(cluster.has_role("pb_user"));
        assert!(cluster.is_member("pb_user", "pb_power"));
        assert!(cluster.has_database("pb_1234"));
        assert!(cluster.has_extension("pb_1234", "pgcrypto"));
        assert!(cluster.has_extension("pb_1234", "uuid-ossp"));
        assert_eq!(cluster.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_create_twice_creates_nothing_new() {
        let cluster = cluster();
        create(&cluster, &options()).await.unwrap();
        cluster.clear_log();

        create(&cluster, &options()).await.unwrap();

        // Only the privilege grants are re-applied on a second run.
        let log = cluster.log();
        assert!(log.iter().all(|line| !line.contains("CREATE")), "{log:#?}");
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_after_create_leaves_no_user_or_database() {
        let cluster = cluster();
        create(&cluster, &options()).await.unwrap();
        delete(&cluster, &options()).await.unwrap();

        assert!(!cluster.has_role("pb_user"));
        assert!(!cluster.has_database("pb_1234"));
        // The role is permanent and survives delete.
        assert!(cluster.has_role("pb_power"));
        assert_eq!(cluster.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_delete_with_drop_role_leaves_nothing_behind() {
        let cluster = cluster();
        create(&cluster, &options()).await.unwrap();

        let opts = PushButtonOptions {
            drop_role: true,
            ..options()
        };
        delete(&cluster, &opts).await.unwrap();

        assert!(!cluster.has_role("pb_user"));
        assert!(!cluster.has_role("pb_power"));
        assert!(!cluster.has_database("pb_1234"));
        assert_eq!(cluster.log().last().unwrap(), "postgres: DROP ROLE \"pb_power\"");
    }

    #[tokio::test]
    async fn test_delete_statement_order() {
        let cluster = cluster();
        create(&cluster, &options()).await.unwrap();
        cluster.clear_log();

        delete(&cluster, &options()).await.unwrap();

        let log = cluster.log();
        assert_eq!(
            log,
            vec![
                "pb_1234: REVOKE USAGE ON SCHEMA public FROM \"pb_power\"",
                "pb_1234: REVOKE ALL PRIVILEGES ON ALL TABLES IN SCHEMA public FROM \"pb_power\"",
                "pb_1234: REVOKE ALL PRIVILEGES ON ALL SEQUENCES IN SCHEMA public FROM \"pb_power\"",
                "pb_1234: DROP OWNED BY \"pb_user\"",
                "postgres: GRANT \"pb_power\" TO \"admin\"",
                "postgres: GRANT \"pb_user\" TO \"admin\"",
                "postgres: REASSIGN OWNED BY \"pb_user\" TO \"admin\"",
                "postgres: DROP USER \"pb_user\"",
                "postgres: DROP DATABASE \"pb_1234\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_without_create_fails_to_connect() {
        let cluster = cluster();
        let err = delete(&cluster, &options()).await.unwrap_err();
        assert!(matches!(err, PgAdminError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_create_stops_at_first_failure() {
        let cluster = cluster();
        cluster.fail_on("create database");

        let err = create(&cluster, &options()).await.unwrap_err();
        assert!(matches!(
            err,
            PgAdminError::Statement {
                expected: "CREATE DATABASE",
                ..
            }
        ));
        // The role created before the failure stays; nothing is rolled back.
        assert!(cluster.has_role("pb_power"));
        assert!(!cluster.has_role("pb_user"));
    }

    #[tokio::test]
    async fn test_missing_arguments_rejected_before_connecting() {
        let cluster = cluster();
        let mut opts = options();
        opts.new_db_pass.clear();
        opts.admin.host.clear();

        let err = create(&cluster, &opts).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mandatory arguments are missing: --dbhost, --newdbpass"
        );
        assert!(cluster.log().is_empty());
    }

    #[test]
    fn test_parse_extensions() {
        assert!(parse_extensions(None).is_empty());
        assert_eq!(
            parse_extensions(Some("pgcrypto, postgis,,")),
            vec!["pgcrypto", "postgis"]
        );
    }
}
