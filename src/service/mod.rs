/// Database service: CRUD by logical database name.
///
/// Every call opens its own connection, does its work through a
/// `TableGateway` and releases the connection before returning. Batch
/// calls share one connection and one transaction.

use crate::config::Config;
use crate::core::db::{ConnectionManager, ConnectionOptions, Entity, TableGateway};
use crate::core::{OrmError, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resolves logical database names to file locations.
pub trait PathResolver {
    /// File location for `name`.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::NotFound` when `name` is not registered.
    fn resolve(&self, name: &str) -> Result<PathBuf>;

    /// Every registered name with its location.
    fn databases(&self) -> Vec<(String, PathBuf)>;
}

/// In-memory name → path table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseRegistry {
    entries: BTreeMap<String, PathBuf>,
}

impl DatabaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a logical database.
    pub fn register(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.entries.insert(name.into(), path.into());
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_database(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.register(name, path);
        self
    }
}

impl PathResolver for DatabaseRegistry {
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::NotFound(name.to_string()))
    }

    fn databases(&self) -> Vec<(String, PathBuf)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect()
    }
}

/// CRUD entry points keyed by logical database name.
pub struct DatabaseService<R: PathResolver = DatabaseRegistry> {
    resolver: R,
    options: ConnectionOptions,
}

impl DatabaseService<DatabaseRegistry> {
    /// Builds a service from a loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.registry(), config.connection_options())
    }
}

impl<R: PathResolver> DatabaseService<R> {
    /// Creates the service and provisions every registered database.
    ///
    /// Missing parent directories and database files are created; existing
    /// ones are left untouched.
    pub fn new(resolver: R, options: ConnectionOptions) -> Result<Self> {
        for (name, path) in resolver.databases() {
            provision(&name, &path)?;
        }
        Ok(DatabaseService { resolver, options })
    }

    /// The path resolver
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Opens a connection to `db_name`, runs `work` against a gateway for
    /// `T`, then releases the connection.
    ///
    /// The connection is released on every path, including when `work`
    /// fails; a failure from `work` takes precedence over a close failure.
    pub fn with_gateway<T, F, V>(&self, db_name: &str, work: F) -> Result<V>
    where
        T: Entity,
        F: FnOnce(&TableGateway<'_, T>) -> Result<V>,
    {
        let path = self.resolver.resolve(db_name)?;
        let mut manager = ConnectionManager::open(&path, &self.options)?;
        let outcome = TableGateway::<T>::new(&manager).and_then(|gateway| work(&gateway));
        let closed = manager.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    /// Reads every row of `T`'s table.
    ///
    /// A missing table is created and the read retried once, so a fresh or
    /// dropped table reads as empty.
    pub fn read<T: Entity>(&self, db_name: &str) -> Result<Vec<T>> {
        self.with_gateway::<T, _, _>(db_name, |gateway| match gateway.all() {
            Err(e) if e.is_missing_table() => {
                info!(
                    "Table {} missing in {}; creating it",
                    gateway.table_name(),
                    db_name
                );
                gateway.create_table()?;
                gateway.all()
            }
            other => other,
        })
    }

    /// Creates `T`'s table if it does not exist.
    pub fn create_table<T: Entity>(&self, db_name: &str) -> Result<()> {
        self.with_gateway::<T, _, _>(db_name, |gateway| gateway.create_table())
    }

    /// Inserts one entity, returning its rowid.
    pub fn insert<T: Entity>(&self, item: &T, db_name: &str) -> Result<i64> {
        self.with_gateway::<T, _, _>(db_name, |gateway| gateway.insert(item))
    }

    /// Inserts all entities atomically.
    pub fn insert_many<T: Entity>(&self, items: &[T], db_name: &str) -> Result<usize> {
        self.with_gateway::<T, _, _>(db_name, |gateway| gateway.insert_many(items))
    }

    /// Updates the row matching the entity's primary key.
    pub fn update<T: Entity>(&self, item: &T, db_name: &str) -> Result<usize> {
        self.with_gateway::<T, _, _>(db_name, |gateway| gateway.update(item))
    }

    /// Updates all entities atomically.
    pub fn update_many<T: Entity>(&self, items: &[T], db_name: &str) -> Result<usize> {
        self.with_gateway::<T, _, _>(db_name, |gateway| gateway.update_many(items))
    }

    /// Deletes the row matching the entity's primary key.
    pub fn delete<T: Entity>(&self, item: &T, db_name: &str) -> Result<usize> {
        self.with_gateway::<T, _, _>(db_name, |gateway| gateway.delete(item))
    }

    /// Drops `T`'s table if it exists.
    pub fn drop_table<T: Entity>(&self, db_name: &str) -> Result<()> {
        self.with_gateway::<T, _, _>(db_name, |gateway| gateway.drop_table())
    }
}

/// Ensures the database file and its directory exist.
fn provision(name: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        OpenOptions::new().create(true).append(true).open(path)?;
        info!("Created database {} at {}", name, path.display());
    } else {
        debug!("Database {} present at {}", name, path.display());
    }
    Ok(())
}
