//! Typed DDL statements and SQL rendering.
//!
//! Identifiers are always double-quoted and password literals escaped, so a
//! role named `app-user` or `"x"; DROP ...` renders as a single identifier.
//! Every statement knows the command tag PostgreSQL reports on success.

use std::fmt;

/// Quote an identifier: wrap in double quotes, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal: wrap in single quotes, doubling embedded quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Object class targeted by schema-wide grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaObjects {
    Tables,
    Sequences,
    Functions,
}

impl fmt::Display for SchemaObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaObjects::Tables => "TABLES",
            SchemaObjects::Sequences => "SEQUENCES",
            SchemaObjects::Functions => "FUNCTIONS",
        })
    }
}

/// A single DDL statement issued by the provisioning workflows
#[derive(Clone, PartialEq, Eq)]
pub enum Ddl {
    CreateRole {
        role: String,
    },
    CreateDatabase {
        database: String,
    },
    CreateUser {
        user: String,
        password: String,
    },
    CreateExtension {
        extension: String,
    },
    /// `GRANT role TO member`
    GrantRole {
        role: String,
        member: String,
    },
    DropUser {
        user: String,
    },
    DropRole {
        role: String,
    },
    DropDatabase {
        database: String,
    },
    ReassignOwned {
        from: String,
        to: String,
    },
    DropOwned {
        role: String,
    },
    /// `GRANT USAGE[, CREATE] ON SCHEMA public TO role`
    GrantSchemaUsage {
        role: String,
        with_create: bool,
    },
    RevokeSchemaUsage {
        role: String,
    },
    GrantConnect {
        database: String,
        role: String,
    },
    /// `GRANT <privileges> ON ALL <objects> IN SCHEMA public TO role`
    GrantOnAll {
        privileges: &'static str,
        objects: SchemaObjects,
        role: String,
    },
    /// `REVOKE ALL PRIVILEGES ON ALL <objects> IN SCHEMA public FROM role`
    RevokeAllOnAll {
        objects: SchemaObjects,
        role: String,
    },
    /// `ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT <privileges> ON <objects> TO role`
    AlterDefaultPrivileges {
        privileges: &'static str,
        objects: SchemaObjects,
        role: String,
    },
    RevokeDatabaseFromPublic {
        database: String,
    },
    RevokeSchemaCreateFromPublic,
}

impl Ddl {
    /// Render the statement as SQL
    pub fn to_sql(&self) -> String {
        match self {
            Ddl::CreateRole { role } => format!("CREATE ROLE {}", quote_ident(role)),
            Ddl::CreateDatabase { database } => {
                format!("CREATE DATABASE {}", quote_ident(database))
            }
            Ddl::CreateUser { user, password } => format!(
                "CREATE USER {} WITH PASSWORD {}",
                quote_ident(user),
                quote_literal(password)
            ),
            Ddl::CreateExtension { extension } => {
                format!("CREATE EXTENSION {}", quote_ident(extension))
            }
            Ddl::GrantRole { role, member } => {
                format!("GRANT {} TO {}", quote_ident(role), quote_ident(member))
            }
            Ddl::DropUser { user } => format!("DROP USER {}", quote_ident(user)),
            Ddl::DropRole { role } => format!("DROP ROLE {}", quote_ident(role)),
            Ddl::DropDatabase { database } => format!("DROP DATABASE {}", quote_ident(database)),
            Ddl::ReassignOwned { from, to } => format!(
                "REASSIGN OWNED BY {} TO {}",
                quote_ident(from),
                quote_ident(to)
            ),
            Ddl::DropOwned { role } => format!("DROP OWNED BY {}", quote_ident(role)),
            Ddl::GrantSchemaUsage { role, with_create } => format!(
                "GRANT {} ON SCHEMA public TO {}",
                if *with_create { "USAGE, CREATE" } else { "USAGE" },
                quote_ident(role)
            ),
            Ddl::RevokeSchemaUsage { role } => {
                format!("REVOKE USAGE ON SCHEMA public FROM {}", quote_ident(role))
            }
            Ddl::GrantConnect { database, role } => format!(
                "GRANT CONNECT ON DATABASE {} TO {}",
                quote_ident(database),
                quote_ident(role)
            ),
            Ddl::GrantOnAll {
                privileges,
                objects,
                role,
            } => format!(
                "GRANT {} ON ALL {} IN SCHEMA public TO {}",
                privileges,
                objects,
                quote_ident(role)
            ),
            Ddl::RevokeAllOnAll { objects, role } => format!(
                "REVOKE ALL PRIVILEGES ON ALL {} IN SCHEMA public FROM {}",
                objects,
                quote_ident(role)
            ),
            Ddl::AlterDefaultPrivileges {
                privileges,
                objects,
                role,
            } => format!(
                "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT {} ON {} TO {}",
                privileges,
                objects,
                quote_ident(role)
            ),
            Ddl::RevokeDatabaseFromPublic { database } => {
                format!("REVOKE ALL ON DATABASE {} FROM PUBLIC", quote_ident(database))
            }
            Ddl::RevokeSchemaCreateFromPublic => {
                "REVOKE CREATE ON SCHEMA public FROM PUBLIC".to_string()
            }
        }
    }

    /// Command tag PostgreSQL reports when the statement succeeds
    pub fn expected_tag(&self) -> &'static str {
        match self {
            Ddl::CreateRole { .. } | Ddl::CreateUser { .. } => "CREATE ROLE",
            Ddl::CreateDatabase { .. } => "CREATE DATABASE",
            Ddl::CreateExtension { .. } => "CREATE EXTENSION",
            Ddl::GrantRole { .. } => "GRANT ROLE",
            Ddl::DropUser { .. } | Ddl::DropRole { .. } => "DROP ROLE",
            Ddl::DropDatabase { .. } => "DROP DATABASE",
            Ddl::ReassignOwned { .. } => "REASSIGN OWNED",
            Ddl::DropOwned { .. } => "DROP OWNED",
            Ddl::GrantSchemaUsage { .. } | Ddl::GrantConnect { .. } | Ddl::GrantOnAll { .. } => {
                "GRANT"
            }
            Ddl::RevokeSchemaUsage { .. }
            | Ddl::RevokeAllOnAll { .. }
            | Ddl::RevokeDatabaseFromPublic { .. }
            | Ddl::RevokeSchemaCreateFromPublic => "REVOKE",
            Ddl::AlterDefaultPrivileges { .. } => "ALTER DEFAULT PRIVILEGES",
        }
    }

    /// Short human description used in logs and error messages
    pub fn action(&self) -> String {
        match self {
            Ddl::CreateRole { role } => format!("create role {}", role),
            Ddl::CreateDatabase { database } => format!("create database {}", database),
            Ddl::CreateUser { user, .. } => format!("create user {}", user),
            Ddl::CreateExtension { extension } => format!("create extension {}", extension),
            Ddl::GrantRole { role, member } => format!("grant role {} to {}", role, member),
            Ddl::DropUser { user } => format!("delete user {}", user),
            Ddl::DropRole { role } => format!("delete role {}", role),
            Ddl::DropDatabase { database } => format!("delete database {}", database),
            Ddl::ReassignOwned { from, to } => format!("reassign owned by {} to {}", from, to),
            Ddl::DropOwned { role } => format!("drop owned by {}", role),
            Ddl::RevokeDatabaseFromPublic { .. } | Ddl::RevokeSchemaCreateFromPublic => {
                "revoke public permissions".to_string()
            }
            _ => format!("set up privileges ({})", self.expected_tag()),
        }
    }
}

// Debug must never print a password.
impl fmt::Debug for Ddl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ddl::CreateUser { user, .. } => write!(
                f,
                "CREATE USER {} WITH PASSWORD '***'",
                quote_ident(user)
            ),
            other => f.write_str(&other.to_sql()),
        }
    }
}

/// Power privileges granted to a push-button role on the new database
pub fn power_privileges(role: &str) -> Vec<Ddl> {
    vec![
        Ddl::GrantSchemaUsage {
            role: role.to_string(),
            with_create: false,
        },
        Ddl::AlterDefaultPrivileges {
            privileges: "SELECT, INSERT, UPDATE, DELETE",
            objects: SchemaObjects::Tables,
            role: role.to_string(),
        },
        Ddl::AlterDefaultPrivileges {
            privileges: "ALL",
            objects: SchemaObjects::Sequences,
            role: role.to_string(),
        },
    ]
}

/// Inverse of [`power_privileges`] for existing objects
pub fn revoke_power_privileges(role: &str) -> Vec<Ddl> {
    vec![
        Ddl::RevokeSchemaUsage {
            role: role.to_string(),
        },
        Ddl::RevokeAllOnAll {
            objects: SchemaObjects::Tables,
            role: role.to_string(),
        },
        Ddl::RevokeAllOnAll {
            objects: SchemaObjects::Sequences,
            role: role.to_string(),
        },
    ]
}

/// Remove default access granted to PUBLIC on a service database
pub fn public_revocations(database: &str) -> Vec<Ddl> {
    vec![
        Ddl::RevokeDatabaseFromPublic {
            database: database.to_string(),
        },
        Ddl::RevokeSchemaCreateFromPublic,
    ]
}

/// Read-only access to all existing and future tables
pub fn readonly_grants(database: &str, role: &str) -> Vec<Ddl> {
    vec![
        Ddl::GrantConnect {
            database: database.to_string(),
            role: role.to_string(),
        },
        Ddl::GrantSchemaUsage {
            role: role.to_string(),
            with_create: false,
        },
        Ddl::GrantOnAll {
            privileges: "SELECT",
            objects: SchemaObjects::Tables,
            role: role.to_string(),
        },
        Ddl::AlterDefaultPrivileges {
            privileges: "SELECT",
            objects: SchemaObjects::Tables,
            role: role.to_string(),
        },
    ]
}

/// Read/write access to tables, sequences and functions, existing and future
pub fn readwrite_grants(database: &str, role: &str) -> Vec<Ddl> {
    let role = role.to_string();
    vec![
        Ddl::GrantConnect {
            database: database.to_string(),
            role: role.clone(),
        },
        Ddl::GrantSchemaUsage {
            role: role.clone(),
            with_create: true,
        },
        Ddl::GrantOnAll {
            privileges: "SELECT, INSERT, UPDATE, DELETE",
            objects: SchemaObjects::Tables,
            role: role.clone(),
        },
        Ddl::AlterDefaultPrivileges {
            privileges: "SELECT, INSERT, UPDATE, DELETE",
            objects: SchemaObjects::Tables,
            role: role.clone(),
        },
        Ddl::GrantOnAll {
            privileges: "USAGE",
            objects: SchemaObjects::Sequences,
            role: role.clone(),
        },
        Ddl::AlterDefaultPrivileges {
            privileges: "USAGE",
            objects: SchemaObjects::Sequences,
            role: role.clone(),
        },
        Ddl::GrantOnAll {
            privileges: "EXECUTE",
            objects: SchemaObjects::Functions,
            role: role.clone(),
        },
        Ddl::AlterDefaultPrivileges {
            privileges: "EXECUTE",
            objects: SchemaObjects::Functions,
            role,
        },
    ]
}
