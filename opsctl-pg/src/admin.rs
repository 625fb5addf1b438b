//! Catalog operations shared by the push-button and service workflows.
//!
//! Each mutating call logs at info on entry and fails with
//! [`PgAdminError::Statement`](crate::PgAdminError::Statement) naming the
//! command tag the statement should have produced.

use tracing::{debug, info};

use crate::connection::Catalog;
use crate::error::Result;
use crate::sql::{self, Ddl};

async fn run_all(catalog: &mut dyn Catalog, statements: &[Ddl]) -> Result<()> {
    for statement in statements {
        catalog.execute(statement).await?;
    }
    Ok(())
}

pub async fn create_role(catalog: &mut dyn Catalog, role: &str) -> Result<()> {
    info!("Create role with role_name={}", role);
    catalog
        .execute(&Ddl::CreateRole {
            role: role.to_string(),
        })
        .await
}

pub async fn create_database(catalog: &mut dyn Catalog, database: &str) -> Result<()> {
    info!("Create database with db_name={}", database);
    catalog
        .execute(&Ddl::CreateDatabase {
            database: database.to_string(),
        })
        .await
}

/// Create a login user and grant it `role`
pub async fn create_user(
    catalog: &mut dyn Catalog,
    user: &str,
    password: &str,
    role: &str,
) -> Result<()> {
    info!("Create user with db_user={}, role_name={}", user, role);
    catalog
        .execute(&Ddl::CreateUser {
            user: user.to_string(),
            password: password.to_string(),
        })
        .await?;
    grant_role(catalog, role, user).await
}

/// `GRANT role TO member`
pub async fn grant_role(catalog: &mut dyn Catalog, role: &str, member: &str) -> Result<()> {
    info!("Grant role with from_role={}, to_role={}", role, member);
    catalog
        .execute(&Ddl::GrantRole {
            role: role.to_string(),
            member: member.to_string(),
        })
        .await
}

pub async fn create_extension(catalog: &mut dyn Catalog, extension: &str) -> Result<()> {
    info!("Create extension with name={}", extension);
    catalog
        .execute(&Ddl::CreateExtension {
            extension: extension.to_string(),
        })
        .await
}

pub async fn grant_role_power_privileges(catalog: &mut dyn Catalog, role: &str) -> Result<()> {
    info!("Grant privileges using role_name={}", role);
    run_all(catalog, &sql::power_privileges(role)).await
}

pub async fn revoke_role_power_privileges(catalog: &mut dyn Catalog, role: &str) -> Result<()> {
    info!("Revoke privileges using role_name={}", role);
    run_all(catalog, &sql::revoke_power_privileges(role)).await
}

pub async fn reassign_owned(catalog: &mut dyn Catalog, from: &str, to: &str) -> Result<()> {
    info!("Reassign owned by from_role={}, to_role={}", from, to);
    catalog
        .execute(&Ddl::ReassignOwned {
            from: from.to_string(),
            to: to.to_string(),
        })
        .await
}

pub async fn drop_owned(catalog: &mut dyn Catalog, role: &str) -> Result<()> {
    info!("Drop owned by role={}", role);
    catalog
        .execute(&Ddl::DropOwned {
            role: role.to_string(),
        })
        .await
}

pub async fn delete_user(catalog: &mut dyn Catalog, user: &str) -> Result<()> {
    info!("Delete user with db_user={}", user);
    catalog
        .execute(&Ddl::DropUser {
            user: user.to_string(),
        })
        .await
}

pub async fn delete_role(catalog: &mut dyn Catalog, role: &str) -> Result<()> {
    info!("Delete role with role_name={}", role);
    catalog
        .execute(&Ddl::DropRole {
            role: role.to_string(),
        })
        .await
}

pub async fn delete_database(catalog: &mut dyn Catalog, database: &str) -> Result<()> {
    info!("Delete database with db_name={}", database);
    catalog
        .execute(&Ddl::DropDatabase {
            database: database.to_string(),
        })
        .await
}

pub async fn revoke_public_permissions(catalog: &mut dyn Catalog, database: &str) -> Result<()> {
    debug!("Revoking public permissions from db_name={} (...)", database);
    run_all(catalog, &sql::public_revocations(database)).await?;
    debug!("Revoked public permissions. (OK)");
    Ok(())
}

pub async fn grant_readonly_permissions(
    catalog: &mut dyn Catalog,
    database: &str,
    role: &str,
) -> Result<()> {
    debug!("Setting up read-only permissions to role_name={} (...)", role);
    run_all(catalog, &sql::readonly_grants(database, role)).await?;
    debug!("Set up read-only permissions. (OK)");
    Ok(())
}

pub async fn grant_readwrite_permissions(
    catalog: &mut dyn Catalog,
    database: &str,
    role: &str,
) -> Result<()> {
    debug!("Setting up read/write permissions to role_name={} (...)", role);
    run_all(catalog, &sql::readwrite_grants(database, role)).await?;
    debug!("Set up read/write permissions. (OK)");
    Ok(())
}
