/// Schema Mapping Module
///
/// This module describes mapped columns and turns them into table
/// definitions. It is the metadata layer shared by the entity registry,
/// the statement builder and the table gateway.

use std::fmt;

/// Storage-facing category a field's value is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    /// Any fixed-width integer
    Integer64,
    /// Floating point
    Real,
    /// Stored as 0/1
    Boolean,
    /// UTF-8 text
    Text,
    /// Date/time, stored as ISO-8601 text
    Timestamp,
    /// Opaque bytes
    Binary,
    /// Enum stored as its integer backing value
    EnumBackedInteger,
}

impl SemanticType {
    /// Returns the SQLite column type used in generated DDL.
    pub fn storage_type(self) -> &'static str {
        match self {
            SemanticType::Integer64 | SemanticType::Boolean | SemanticType::EnumBackedInteger => {
                "INTEGER"
            }
            SemanticType::Real => "REAL",
            SemanticType::Text | SemanticType::Timestamp => "TEXT",
            SemanticType::Binary => "BLOB",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Static metadata describing one mapped field.
///
/// Role flags are set with the chained marker methods during entity
/// registration and never change afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name, used verbatim as the SQL identifier
    pub name: String,
    /// Storage category inferred from the field's Rust type
    pub semantic_type: SemanticType,
    /// Whether this column is the table's primary key
    pub is_primary_key: bool,
    /// Whether SQLite assigns this column's value on insert
    pub is_auto_increment: bool,
    /// Whether the column is excluded from every storage operation
    pub is_ignored: bool,
    /// Recorded only; NOT NULL is never emitted in generated DDL
    pub is_not_null_declared: bool,
}

impl ColumnDescriptor {
    /// Creates a descriptor with no role flags set.
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        ColumnDescriptor {
            name: name.into(),
            semantic_type,
            is_primary_key: false,
            is_auto_increment: false,
            is_ignored: false,
            is_not_null_declared: false,
        }
    }

    /// Marks the column as the primary key.
    pub fn primary_key(&mut self) -> &mut Self {
        self.is_primary_key = true;
        self
    }

    /// Marks the column as assigned by SQLite on insert.
    pub fn auto_increment(&mut self) -> &mut Self {
        self.is_auto_increment = true;
        self
    }

    /// Excludes the column from all storage operations.
    pub fn ignored(&mut self) -> &mut Self {
        self.is_ignored = true;
        self
    }

    /// Records a not-null declaration.
    pub fn not_null(&mut self) -> &mut Self {
        self.is_not_null_declared = true;
        self
    }

    /// Whether the column takes part in storage operations.
    pub fn is_stored(&self) -> bool {
        !self.is_ignored
    }

    /// Renders the column's definition inside CREATE TABLE.
    pub fn definition(&self) -> String {
        let mut definition = format!("{} {}", self.name, self.semantic_type.storage_type());
        if self.is_primary_key {
            definition.push_str(" PRIMARY KEY");
        }
        if self.is_auto_increment {
            definition.push_str(" AUTOINCREMENT");
        }
        definition
    }
}

/// Builds the CREATE TABLE statement for a table's columns.
///
/// Ignored columns are skipped. The statement uses `IF NOT EXISTS` so it
/// can be executed on every access.
pub fn create_table_statement(table: &str, columns: &[ColumnDescriptor]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .filter(|column| column.is_stored())
        .map(ColumnDescriptor::definition)
        .collect();

    format!("CREATE TABLE IF NOT EXISTS {} ({})", table, definitions.join(", "))
}
