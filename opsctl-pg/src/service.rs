//! Per-service database setup.
//!
//! A service `S` gets a database, a read-only role, a read/write role and an
//! application user holding the read/write role. Names default to `S`,
//! `role_S_readonly`, `role_S_readwrite` and `user_S_app`.

use std::path::PathBuf;

use opsctl_core::{random_password, write_secret, ServiceEnv, SERVICE_PASSWORD_LENGTH};
use tracing::{debug, info};

use crate::admin;
use crate::connection::{self, Catalog, ConnectTarget, Connector};
use crate::error::Result;

/// Resolved object names for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNames {
    pub service: String,
    pub database: String,
    pub readonly_role: String,
    pub readwrite_role: String,
    pub user: String,
}

impl ServiceNames {
    /// Derive every name from the service name
    pub fn derive(service: &str) -> Self {
        Self {
            service: service.to_string(),
            database: service.to_string(),
            readonly_role: format!("role_{}_readonly", service),
            readwrite_role: format!("role_{}_readwrite", service),
            user: format!("user_{}_app", service),
        }
    }

    /// Apply custom names; `None` or empty keeps the derived default
    pub fn with_overrides(
        mut self,
        database: Option<&str>,
        readonly_role: Option<&str>,
        readwrite_role: Option<&str>,
        user: Option<&str>,
    ) -> Self {
        fn apply(slot: &mut String, value: Option<&str>) {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                *slot = value.to_string();
            }
        }
        apply(&mut self.database, database);
        apply(&mut self.readonly_role, readonly_role);
        apply(&mut self.readwrite_role, readwrite_role);
        apply(&mut self.user, user);
        self
    }

    fn roles(&self) -> [&str; 2] {
        [&self.readonly_role, &self.readwrite_role]
    }

    /// `LIKE` pattern for every role carrying this service's role prefix
    fn role_pattern(&self) -> String {
        let mut pattern = String::from("role\\_");
        for c in self.service.chars() {
            if matches!(c, '\\' | '_' | '%') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push_str("\\_%");
        pattern
    }
}

/// Admin connection built from the service `.env` file
pub fn admin_target(env: &ServiceEnv) -> ConnectTarget {
    ConnectTarget::new(&env.host, &env.dbname, &env.user, &env.password)
}

/// What `create` did with the application user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOutcome {
    /// New user; password written to the contained path
    Created { password_file: PathBuf },
    AlreadyExisted,
}

/// Existence report produced by [`list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceListing {
    pub database: Option<String>,
    pub roles: Vec<String>,
    /// Roles named `role_<service>_*` besides the configured pair
    pub other_roles: Vec<String>,
    pub user: Option<String>,
}

impl ServiceListing {
    /// Render the Database / Roles / User sections
    pub fn render(&self) -> String {
        fn section(out: &mut String, title: &str, items: &[&str]) {
            out.push_str(">>\n");
            out.push_str(&format!(">> {}\n", title));
            out.push_str(&format!(">> {}\n", "-".repeat(title.len())));
            for item in items {
                out.push_str(item);
                out.push('\n');
            }
            out.push('\n');
        }

        let mut out = String::new();
        section(&mut out, "Database", &self.database.as_deref().into_iter().collect::<Vec<_>>());
        section(
            &mut out,
            "Roles",
            &self.roles.iter().map(String::as_str).collect::<Vec<_>>(),
        );
        if !self.other_roles.is_empty() {
            section(
                &mut out,
                "Other roles",
                &self.other_roles.iter().map(String::as_str).collect::<Vec<_>>(),
            );
        }
        section(&mut out, "User", &self.user.as_deref().into_iter().collect::<Vec<_>>());
        out
    }
}

async fn ensure_role(catalog: &mut dyn Catalog, role: &str) -> Result<()> {
    if catalog.role_exists(role).await? {
        debug!("Role {} already exists. (SKIP)", role);
        Ok(())
    } else {
        admin::create_role(catalog, role).await
    }
}

/// Create the database, roles and user for a service.
///
/// The generated password is written to `password_file` only when the user
/// is created; an existing user keeps its password and is re-granted the
/// read/write role.
pub async fn create(
    connector: &dyn Connector,
    admin_target: &ConnectTarget,
    names: &ServiceNames,
    password_file: impl Into<PathBuf>,
) -> Result<UserOutcome> {
    // 1. Default database: create the service database
    let mut catalog = connection::connect(connector, admin_target).await?;
    info!(
        "Create a database with name={} for service={}",
        names.database, names.service
    );
    if catalog.database_exists(&names.database).await? {
        debug!("Database already exists. (SKIP)");
    } else {
        admin::create_database(catalog.as_mut(), &names.database).await?;
    }
    connection::close(catalog).await?;

    // 2. Service database: roles and user
    let mut catalog =
        connection::connect(connector, &admin_target.with_dbname(&names.database)).await?;

    info!("Revoke default, public permissions from public schema");
    admin::revoke_public_permissions(catalog.as_mut(), &names.database).await?;

    info!("Create a read-only role with name={}", names.readonly_role);
    ensure_role(catalog.as_mut(), &names.readonly_role).await?;
    admin::grant_readonly_permissions(catalog.as_mut(), &names.database, &names.readonly_role)
        .await?;

    info!("Create a read/write role with name={}", names.readwrite_role);
    ensure_role(catalog.as_mut(), &names.readwrite_role).await?;
    admin::grant_readwrite_permissions(catalog.as_mut(), &names.database, &names.readwrite_role)
        .await?;

    info!("Create a user with name={}", names.user);
    let outcome = if catalog.role_exists(&names.user).await? {
        debug!("User {} already exists. (SKIP)", names.user);
        admin::grant_role(catalog.as_mut(), &names.readwrite_role, &names.user).await?;
        UserOutcome::AlreadyExisted
    } else {
        let password = random_password(SERVICE_PASSWORD_LENGTH)?;
        admin::create_user(catalog.as_mut(), &names.user, &password, &names.readwrite_role)
            .await?;
        let password_file = password_file.into();
        write_secret(&password_file, &password)?;
        info!("Wrote password for {} to {}", names.user, password_file.display());
        UserOutcome::Created { password_file }
    };

    connection::close(catalog).await?;
    Ok(outcome)
}

/// Drop everything [`create`] set up. Missing objects are skipped.
pub async fn delete(
    connector: &dyn Connector,
    admin_target: &ConnectTarget,
    names: &ServiceNames,
) -> Result<()> {
    let mut catalog = connection::connect(connector, admin_target).await?;
    let database_exists = catalog.database_exists(&names.database).await?;

    if database_exists {
        // Privileges live inside the service database; clear them there first.
        let mut service_catalog =
            connection::connect(connector, &admin_target.with_dbname(&names.database)).await?;
        for role in [names.user.as_str()].into_iter().chain(names.roles()) {
            if service_catalog.role_exists(role).await? {
                admin::drop_owned(service_catalog.as_mut(), role).await?;
            }
        }
        connection::close(service_catalog).await?;

        admin::delete_database(catalog.as_mut(), &names.database).await?;
    } else {
        info!("Database DOES NOT exist. Skip.");
    }

    if catalog.role_exists(&names.user).await? {
        admin::delete_user(catalog.as_mut(), &names.user).await?;
    } else {
        info!("User DOES NOT exist. Skip.");
    }

    for role in names.roles() {
        if catalog.role_exists(role).await? {
            admin::delete_role(catalog.as_mut(), role).await?;
        } else {
            info!("Role {} DOES NOT exist. Skip.", role);
        }
    }

    connection::close(catalog).await
}

/// Report which of the service's objects exist
pub async fn list(
    connector: &dyn Connector,
    admin_target: &ConnectTarget,
    names: &ServiceNames,
) -> Result<ServiceListing> {
    let mut catalog = connection::connect(connector, admin_target).await?;

    let database = catalog
        .database_exists(&names.database)
        .await?
        .then(|| names.database.clone());

    let mut roles = Vec::new();
    for role in names.roles() {
        if catalog.role_exists(role).await? {
            roles.push(role.to_string());
        }
    }

    let other_roles = catalog
        .roles_like(&names.role_pattern())
        .await?
        .into_iter()
        .filter(|role| !names.roles().contains(&role.as_str()))
        .collect();

    let user = catalog
        .role_exists(&names.user)
        .await?
        .then(|| names.user.clone());

    connection::close(catalog).await?;
    Ok(ServiceListing {
        database,
        roles,
        other_roles,
        user,
    })
}

/// Check connectivity and return the server version
pub async fn test_connection(connector: &dyn Connector, admin_target: &ConnectTarget) -> Result<String> {
    debug!("Testing DB connection...");
    let mut catalog = connection::connect(connector, admin_target).await?;
    let version = catalog.version().await?;
    info!("{}", version);
    connection::close(catalog).await?;
    Ok(version)
}
