/// Statement Building Module
///
/// Pure functions that turn an entity mapping and an entity into SQL text
/// with positional parameters. Table and column identifiers come from
/// entity registrations and are trusted. WHERE and ORDER BY fragments from
/// the query builder are inserted verbatim: they are caller-supplied SQL,
/// not escaped or validated here.

use crate::core::db::entity::EntityMapping;
use crate::core::db::query::QuerySpec;
use crate::core::db::schema;
use crate::core::db::value::Value;
use crate::core::{OrmError, Result};

/// SQL text with its ordered parameter bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text using `?1`, `?2`, ... placeholders
    pub sql: String,
    /// Values bound to the placeholders, in order
    pub params: Vec<Value>,
}

impl Statement {
    /// A statement without parameters
    pub fn new(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// CREATE TABLE IF NOT EXISTS for the mapping.
pub fn create_table<T>(mapping: &EntityMapping<T>) -> Result<Statement> {
    if mapping.stored_fields().next().is_none() {
        return Err(OrmError::Mapping(format!(
            "{} has no mapped columns",
            mapping.table()
        )));
    }
    Ok(Statement::new(schema::create_table_statement(
        mapping.table(),
        mapping.columns(),
    )))
}

/// INSERT covering every stored column SQLite does not assign itself.
pub fn insert<T>(mapping: &EntityMapping<T>, entity: &T) -> Result<Statement> {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Vec::new();

    for field in mapping
        .stored_fields()
        .filter(|field| !field.descriptor().is_auto_increment)
    {
        params.push(field.value_of(entity));
        columns.push(field.name());
        placeholders.push(format!("?{}", params.len()));
    }

    if columns.is_empty() {
        return Err(OrmError::Mapping(format!(
            "{} has no columns to insert",
            mapping.table()
        )));
    }

    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            mapping.table(),
            columns.join(", "),
            placeholders.join(", ")
        ),
        params,
    })
}

/// UPDATE of every stored non-key column, matched on the primary key.
pub fn update<T>(mapping: &EntityMapping<T>, entity: &T) -> Result<Statement> {
    let key = mapping.primary_key().ok_or_else(|| primary_key_required(mapping, "update"))?;

    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for field in mapping
        .stored_fields()
        .filter(|field| !field.descriptor().is_primary_key)
    {
        params.push(field.value_of(entity));
        assignments.push(format!("{} = ?{}", field.name(), params.len()));
    }

    if assignments.is_empty() {
        return Err(OrmError::Mapping(format!(
            "{} has no columns to update",
            mapping.table()
        )));
    }

    params.push(key.value_of(entity));
    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            mapping.table(),
            assignments.join(", "),
            key.name(),
            params.len()
        ),
        params,
    })
}

/// DELETE of the row matching the entity's primary key.
pub fn delete<T>(mapping: &EntityMapping<T>, entity: &T) -> Result<Statement> {
    let key = mapping.primary_key().ok_or_else(|| primary_key_required(mapping, "delete"))?;

    Ok(Statement {
        sql: format!("DELETE FROM {} WHERE {} = ?1", mapping.table(), key.name()),
        params: vec![key.value_of(entity)],
    })
}

/// SELECT with the query's filter, order and limit appended verbatim.
pub fn select(table: &str, spec: &QuerySpec) -> Statement {
    let mut sql = format!("SELECT * FROM {}", table);
    if let Some(filter) = &spec.filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    if let Some((column, direction)) = &spec.order {
        sql.push_str(&format!(" ORDER BY {} {}", column, direction.keyword()));
    }
    if let Some(limit) = spec.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    Statement::new(sql)
}

/// DROP TABLE IF EXISTS
pub fn drop_table(table: &str) -> Statement {
    Statement::new(format!("DROP TABLE IF EXISTS {}", table))
}

fn primary_key_required<T>(mapping: &EntityMapping<T>, operation: &str) -> OrmError {
    OrmError::Schema(format!(
        "primary key required to {} {}",
        operation,
        mapping.table()
    ))
}
