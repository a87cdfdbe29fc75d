/// Query Building Module
///
/// A fluent, reusable query over one table gateway. Each call replaces the
/// corresponding clause; execution snapshots the current state, runs the
/// SELECT against current data and materializes fresh entities.

use crate::core::db::entity::Entity;
use crate::core::db::gateway::TableGateway;
use crate::core::db::statement;
use crate::core::Result;

/// Sort order for ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl From<bool> for SortDirection {
    fn from(ascending: bool) -> Self {
        if ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }
}

/// Accumulated query state.
///
/// `filter` and the order column are raw SQL fragments supplied by the
/// caller. They are trusted input and reach SQLite unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// Predicate placed after WHERE
    pub filter: Option<String>,
    /// Column and direction placed after ORDER BY
    pub order: Option<(String, SortDirection)>,
    /// Row cap placed after LIMIT
    pub limit: Option<u64>,
}

/// Fluent query over a table gateway.
///
/// ```no_run
/// # use liteorm::{ConnectionManager, Entity, EntityMap, TableGateway};
/// # #[derive(Default)]
/// # struct Order { value: i64 }
/// # impl Entity for Order {
/// #     fn map(columns: &mut EntityMap<Self>) {
/// #         columns.column("Value", |o| &o.value, |o| &mut o.value);
/// #     }
/// # }
/// # fn main() -> liteorm::Result<()> {
/// let manager = ConnectionManager::open_in_memory()?;
/// let orders = TableGateway::<Order>::new(&manager)?;
/// let large = orders
///     .query()
///     .filter("Value > 15")
///     .order_by("Value", false)
///     .limit(10)
///     .to_list()?;
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<'c, T: Entity> {
    gateway: TableGateway<'c, T>,
    spec: QuerySpec,
}

impl<'c, T: Entity> QueryBuilder<'c, T> {
    /// Creates an unfiltered, unordered, unlimited query.
    pub fn new(gateway: TableGateway<'c, T>) -> Self {
        QueryBuilder {
            gateway,
            spec: QuerySpec::default(),
        }
    }

    /// Replaces the WHERE predicate.
    pub fn filter(&mut self, clause: impl Into<String>) -> &mut Self {
        self.spec.filter = Some(clause.into());
        self
    }

    /// Replaces the ORDER BY clause.
    pub fn order_by(&mut self, column: impl Into<String>, ascending: bool) -> &mut Self {
        self.spec.order = Some((column.into(), SortDirection::from(ascending)));
        self
    }

    /// Caps the number of returned rows.
    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.spec.limit = Some(n);
        self
    }

    /// Current query state
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// SQL the query would run right now
    pub fn to_sql(&self) -> String {
        statement::select(self.gateway.table_name(), &self.spec).sql
    }

    /// Runs the query and materializes every matching row.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Database` for SQL errors (including malformed
    /// filter fragments) and `OrmError::Conversion` when a stored value
    /// does not fit its field.
    pub fn to_list(&self) -> Result<Vec<T>> {
        let snapshot = self.spec.clone();
        self.gateway.select(&snapshot)
    }

    /// Limits the query to one row and returns it, if any.
    pub fn first_or_default(&mut self) -> Result<Option<T>> {
        self.limit(1);
        Ok(self.to_list()?.into_iter().next())
    }
}
