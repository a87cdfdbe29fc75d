/// Database Module
///
/// The mapping engine, organized into focused submodules.
///
/// ## Architecture
///
/// - **Entity Mapping** (`entity.rs`): Column registration and the cached layout per type
/// - **Schema Mapping** (`schema.rs`): Column descriptors, semantic types and CREATE TABLE
/// - **Value Codec** (`value.rs`): Conversion between field values and SQLite storage values
/// - **Statement Building** (`statement.rs`): Parameterized INSERT/UPDATE/DELETE/SELECT/DROP text
/// - **Connection Management** (`connection.rs`): Connection lifecycle, pragmas and transactions
/// - **Table Gateway** (`gateway.rs`): Per-entity CRUD over one connection
/// - **Query Building** (`query.rs`): Fluent filtered, ordered and limited reads
///
/// ## Error Handling
///
/// All database operations use the `OrmError` type for consistent error propagation.
pub mod connection;
pub mod entity;
pub mod gateway;
pub mod query;
pub mod schema;
pub mod statement;
pub mod value;

pub use connection::*;
pub use entity::*;
pub use gateway::*;
pub use query::*;
pub use schema::*;
pub use statement::Statement;
pub use value::{materialize, normalize_for_write, ColumnValue, StorageEnum, Value};
