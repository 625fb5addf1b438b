//! In-memory cluster used by the workflow tests.
//!
//! Models just enough of PostgreSQL to catch ordering mistakes: creating an
//! existing object fails, a role with outstanding grants cannot be dropped,
//! and a database with open sessions cannot be dropped. Grants are tracked
//! per database, so `DROP OWNED` and `DROP DATABASE` only clear their own.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::connection::{Catalog, ConnectTarget, Connector};
use crate::error::{PgAdminError, Result};
use crate::sql::Ddl;

#[derive(Debug, Default)]
struct RoleState {
    password: Option<String>,
    member_of: BTreeSet<String>,
    /// Privileges held, per database they were granted in
    grants: BTreeMap<String, u32>,
}

impl RoleState {
    fn has_grants(&self) -> bool {
        self.grants.values().any(|n| *n > 0)
    }
}

#[derive(Debug, Default)]
struct DatabaseState {
    owner: String,
    extensions: BTreeSet<String>,
    sessions: u32,
}

#[derive(Debug, Default)]
struct ClusterState {
    roles: BTreeMap<String, RoleState>,
    databases: BTreeMap<String, DatabaseState>,
    log: Vec<String>,
    fail_on: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

fn reject(statement: &Ddl, reason: impl Into<String>) -> PgAdminError {
    PgAdminError::statement(statement.action(), statement.expected_tag(), reason.into())
}

impl MemoryCluster {
    /// A cluster with a login superuser and a default database
    pub fn with_admin(user: &str, password: &str, database: &str) -> Self {
        let cluster = Self::default();
        {
            let mut state = cluster.lock();
            state.roles.insert(
                user.to_string(),
                RoleState {
                    password: Some(password.to_string()),
                    ..Default::default()
                },
            );
            state.databases.insert(
                database.to_string(),
                DatabaseState {
                    owner: user.to_string(),
                    ..Default::default()
                },
            );
        }
        cluster
    }

    fn lock(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.lock().roles.contains_key(role)
    }

    pub fn has_database(&self, database: &str) -> bool {
        self.lock().databases.contains_key(database)
    }

    pub fn has_extension(&self, database: &str, extension: &str) -> bool {
        self.lock()
            .databases
            .get(database)
            .is_some_and(|db| db.extensions.contains(extension))
    }

    pub fn is_member(&self, member: &str, role: &str) -> bool {
        self.lock()
            .roles
            .get(member)
            .is_some_and(|r| r.member_of.contains(role))
    }

    pub fn open_sessions(&self) -> u32 {
        self.lock().databases.values().map(|db| db.sessions).sum()
    }

    /// Every statement that succeeded, rendered as `<db>: <sql>`
    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// Fail the next statement whose action contains `needle`
    pub fn fail_on(&self, needle: &str) {
        self.lock().fail_on = Some(needle.to_string());
    }

    fn apply(&self, database: &str, session_user: &str, statement: &Ddl) -> Result<()> {
        let mut guard = self.lock();
        let state: &mut ClusterState = &mut guard;

        if let Some(needle) = state.fail_on.clone() {
            if statement.action().contains(&needle) {
                state.fail_on = None;
                return Err(reject(statement, "injected failure"));
            }
        }

        let role_must_exist = |state: &ClusterState, role: &str| -> Result<()> {
            if state.roles.contains_key(role) {
                Ok(())
            } else {
                Err(reject(statement, format!("role \"{}\" does not exist", role)))
            }
        };

        match statement {
            Ddl::CreateRole { role } => {
                if state.roles.contains_key(role) {
                    return Err(reject(statement, "role already exists"));
                }
                state.roles.insert(role.clone(), RoleState::default());
            }
            Ddl::CreateUser { user, password } => {
                if state.roles.contains_key(user) {
                    return Err(reject(statement, "role already exists"));
                }
                state.roles.insert(
                    user.clone(),
                    RoleState {
                        password: Some(password.clone()),
                        ..Default::default()
                    },
                );
            }
            Ddl::CreateDatabase { database: name } => {
                if state.databases.contains_key(name) {
                    return Err(reject(statement, "database already exists"));
                }
                state.databases.insert(
                    name.clone(),
                    DatabaseState {
                        owner: session_user.to_string(),
                        ..Default::default()
                    },
                );
            }
            Ddl::CreateExtension { extension } => {
                let db = state
                    .databases
                    .get_mut(database)
                    .ok_or_else(|| reject(statement, "no database"))?;
                if !db.extensions.insert(extension.clone()) {
                    return Err(reject(statement, "extension already exists"));
                }
            }
            Ddl::GrantRole { role, member } => {
                role_must_exist(state, role)?;
                role_must_exist(state, member)?;
                if let Some(r) = state.roles.get_mut(member) {
                    r.member_of.insert(role.clone());
                }
            }
            Ddl::DropUser { user: role } | Ddl::DropRole { role } => {
                let Some(target) = state.roles.get(role) else {
                    return Err(reject(statement, format!("role \"{}\" does not exist", role)));
                };
                if target.has_grants() {
                    return Err(reject(statement, "role has privileges that depend on it"));
                }
                if state.databases.values().any(|db| db.owner == *role) {
                    return Err(reject(statement, "role owns a database"));
                }
                state.roles.remove(role);
                for other in state.roles.values_mut() {
                    other.member_of.remove(role);
                }
            }
            Ddl::DropDatabase { database: name } => {
                if name == database {
                    return Err(reject(statement, "cannot drop the currently open database"));
                }
                let Some(target) = state.databases.get(name) else {
                    return Err(reject(statement, "database does not exist"));
                };
                if target.sessions > 0 {
                    return Err(reject(statement, "database is being accessed by other users"));
                }
                state.databases.remove(name);
                for role in state.roles.values_mut() {
                    role.grants.remove(name);
                }
            }
            Ddl::ReassignOwned { from, to } => {
                role_must_exist(state, from)?;
                role_must_exist(state, to)?;
                for db in state.databases.values_mut() {
                    if db.owner == *from {
                        db.owner = to.clone();
                    }
                }
            }
            Ddl::DropOwned { role } => {
                role_must_exist(state, role)?;
                if let Some(r) = state.roles.get_mut(role) {
                    r.grants.remove(database);
                }
            }
            Ddl::GrantSchemaUsage { role, .. }
            | Ddl::GrantConnect { role, .. }
            | Ddl::GrantOnAll { role, .. }
            | Ddl::AlterDefaultPrivileges { role, .. } => {
                role_must_exist(state, role)?;
                if let Some(r) = state.roles.get_mut(role) {
                    *r.grants.entry(database.to_string()).or_default() += 1;
                }
            }
            Ddl::RevokeSchemaUsage { role } | Ddl::RevokeAllOnAll { role, .. } => {
                role_must_exist(state, role)?;
            }
            Ddl::RevokeDatabaseFromPublic { database: name } => {
                if !state.databases.contains_key(name) {
                    return Err(reject(statement, "database does not exist"));
                }
            }
            Ddl::RevokeSchemaCreateFromPublic => {}
        }

        state.log.push(format!("{}: {:?}", database, statement));
        Ok(())
    }
}

#[async_trait]
impl Connector for MemoryCluster {
    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Catalog>> {
        let mut state = self.lock();
        let authorised = state
            .roles
            .get(&target.user)
            .is_some_and(|r| r.password.as_deref() == Some(target.password.as_str()));
        if !authorised {
            return Err(PgAdminError::connect(
                &target.host,
                &target.dbname,
                "password authentication failed",
            ));
        }
        let Some(db) = state.databases.get_mut(&target.dbname) else {
            return Err(PgAdminError::connect(
                &target.host,
                &target.dbname,
                "database does not exist",
            ));
        };
        db.sessions += 1;

        Ok(Box::new(MemoryCatalog {
            cluster: self.clone(),
            database: target.dbname.clone(),
            user: target.user.clone(),
        }))
    }
}

struct MemoryCatalog {
    cluster: MemoryCluster,
    database: String,
    user: String,
}

#[async_trait]
impl Catalog for MemoryCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn role_exists(&mut self, role: &str) -> Result<bool> {
        Ok(self.cluster.has_role(role))
    }

    async fn database_exists(&mut self, database: &str) -> Result<bool> {
        Ok(self.cluster.has_database(database))
    }

    async fn extension_exists(&mut self, extension: &str) -> Result<bool> {
        Ok(self.cluster.has_extension(&self.database, extension))
    }

    async fn roles_like(&mut self, pattern: &str) -> Result<Vec<String>> {
        // Only the escaped `prefix%` shape is needed here.
        let prefix = pattern
            .strip_suffix('%')
            .unwrap_or(pattern)
            .replace("\\_", "_")
            .replace("\\%", "%")
            .replace("\\\\", "\\");
        Ok(self
            .cluster
            .lock()
            .roles
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn version(&mut self) -> Result<String> {
        Ok("PostgreSQL 16.0 (in-memory)".to_string())
    }

    async fn execute(&mut self, statement: &Ddl) -> Result<()> {
        self.cluster.apply(&self.database, &self.user, statement)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.cluster.lock();
        if let Some(db) = state.databases.get_mut(&self.database) {
            db.sessions = db.sessions.saturating_sub(1);
        }
        Ok(())
    }
}
