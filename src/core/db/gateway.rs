/// Table Gateway Module
///
/// The per-entity CRUD entry point. A gateway borrows an open connection
/// manager and the entity's cached mapping; it holds no other state.

use crate::core::db::connection::ConnectionManager;
use crate::core::db::entity::{Entity, EntityMapping};
use crate::core::db::query::{QueryBuilder, QuerySpec};
use crate::core::db::statement::{self, Statement};
use crate::core::db::value::Value;
use crate::core::Result;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info, warn};

/// CRUD operations for entity type `T` over one connection.
pub struct TableGateway<'c, T: Entity> {
    manager: &'c ConnectionManager,
    mapping: &'static EntityMapping<T>,
}

impl<'c, T: Entity> Clone for TableGateway<'c, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'c, T: Entity> Copy for TableGateway<'c, T> {}

impl<'c, T: Entity> TableGateway<'c, T> {
    /// Binds a gateway for `T` to an open connection manager.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Mapping` if `T`'s registration is invalid.
    pub fn new(manager: &'c ConnectionManager) -> Result<Self> {
        Ok(TableGateway {
            manager,
            mapping: EntityMapping::<T>::get()?,
        })
    }

    /// Table identifier for `T`
    pub fn table_name(&self) -> &'static str {
        self.mapping.table()
    }

    /// The entity's validated mapping
    pub fn mapping(&self) -> &'static EntityMapping<T> {
        self.mapping
    }

    /// Creates the table if it does not exist.
    pub fn create_table(&self) -> Result<()> {
        let create = statement::create_table(self.mapping)?;
        execute(self.manager.connection()?, &create)?;
        info!("Ensured table {}", self.table_name());
        Ok(())
    }

    /// Drops the table if it exists.
    pub fn drop_table(&self) -> Result<()> {
        execute(self.manager.connection()?, &statement::drop_table(self.table_name()))?;
        info!("Dropped table {}", self.table_name());
        Ok(())
    }

    /// Inserts one entity and returns its rowid.
    pub fn insert(&self, entity: &T) -> Result<i64> {
        let conn = self.manager.connection()?;
        execute(conn, &statement::insert(self.mapping, entity)?)?;
        Ok(conn.last_insert_rowid())
    }

    /// Inserts all entities in one transaction; nothing is kept on failure.
    pub fn insert_many(&self, entities: &[T]) -> Result<usize> {
        self.in_transaction("insert", entities, |mapping, entity| {
            statement::insert(mapping, entity)
        })
    }

    /// Updates the row matching the entity's primary key.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Schema` if `T` has no primary key.
    pub fn update(&self, entity: &T) -> Result<usize> {
        execute(
            self.manager.connection()?,
            &statement::update(self.mapping, entity)?,
        )
    }

    /// Updates all entities in one transaction; nothing is kept on failure.
    pub fn update_many(&self, entities: &[T]) -> Result<usize> {
        self.in_transaction("update", entities, |mapping, entity| {
            statement::update(mapping, entity)
        })
    }

    /// Deletes the row matching the entity's primary key.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Schema` if `T` has no primary key.
    pub fn delete(&self, entity: &T) -> Result<usize> {
        execute(
            self.manager.connection()?,
            &statement::delete(self.mapping, entity)?,
        )
    }

    /// Reads every row of the table.
    pub fn all(&self) -> Result<Vec<T>> {
        self.select(&QuerySpec::default())
    }

    /// Starts a fluent query over this table.
    pub fn query(&self) -> QueryBuilder<'c, T> {
        QueryBuilder::new(*self)
    }

    /// Runs a SELECT for `spec` and materializes each row into a new `T`.
    ///
    /// Stored NULLs leave the field at its default value.
    pub fn select(&self, spec: &QuerySpec) -> Result<Vec<T>> {
        let conn = self.manager.connection()?;
        let query = statement::select(self.table_name(), spec);
        debug!("Executing: {}", query.sql);

        let mut prepared = conn.prepare(&query.sql)?;
        let mut rows = prepared.query([])?;
        let mut entities = Vec::new();

        while let Some(row) = rows.next()? {
            let mut entity = T::default();
            for field in self.mapping.stored_fields() {
                let value: Value = row.get(field.name())?;
                if value == Value::Null {
                    continue;
                }
                field.assign(&mut entity, value)?;
            }
            entities.push(entity);
        }

        Ok(entities)
    }

    fn in_transaction<F>(&self, operation: &str, entities: &[T], build: F) -> Result<usize>
    where
        F: Fn(&EntityMapping<T>, &T) -> Result<Statement>,
    {
        let tx = self.manager.transaction()?;

        let outcome = entities.iter().try_fold(0usize, |affected, entity| -> Result<usize> {
            let statement = build(self.mapping, entity)?;
            Ok(affected + execute(&tx, &statement)?)
        });

        match outcome {
            Ok(affected) => {
                tx.commit()?;
                debug!(
                    "Committed batch {} of {} rows into {}",
                    operation,
                    entities.len(),
                    self.table_name()
                );
                Ok(affected)
            }
            Err(e) => {
                warn!(
                    "Rolling back batch {} on {}: {}",
                    operation,
                    self.table_name(),
                    e
                );
                if let Err(rollback) = tx.rollback() {
                    warn!("Rollback failed on {}: {}", self.table_name(), rollback);
                }
                Err(e)
            }
        }
    }
}

/// Prepares, binds and runs a statement, returning the affected row count.
fn execute(conn: &Connection, statement: &Statement) -> Result<usize> {
    debug!("Executing: {}", statement.sql);
    let mut prepared = conn.prepare_cached(&statement.sql)?;
    Ok(prepared.execute(params_from_iter(statement.params.iter()))?)
}
