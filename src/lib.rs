//! A small object-relational mapper for embedded SQLite databases.
//!
//! Entities register their columns once through [`Entity`]; tables, CRUD
//! statements and value conversions are derived from that registration.
//! [`DatabaseService`] addresses databases by logical name, while
//! [`TableGateway`] and [`QueryBuilder`] work on an open connection.

// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod service;

#[cfg(test)]
mod test_utils;

pub use crate::core::db::{
    ColumnDescriptor, ColumnValue, ConnectionManager, ConnectionOptions, Entity, EntityMap,
    EntityMapping, QueryBuilder, QuerySpec, SemanticType, SortDirection, StorageEnum,
    TableGateway, Value,
};
pub use crate::core::{OrmError, Result};
pub use crate::service::{DatabaseRegistry, DatabaseService, PathResolver};
