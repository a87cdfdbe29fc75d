/// Entity Mapping Module
///
/// Entities describe their columns once through `Entity::map`. The result
/// is validated, cached for the life of the process and shared by every
/// gateway that works with the type.

use crate::core::db::schema::ColumnDescriptor;
use crate::core::db::value::{ColumnValue, Value};
use crate::core::{OrmError, Result};
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A Rust type mapped to one table.
///
/// Table and column names are used verbatim as SQL identifiers. They come
/// from code, never from user input, and are not escaped.
///
/// ```
/// use liteorm::{Entity, EntityMap};
///
/// #[derive(Debug, Default)]
/// struct Order {
///     id: i64,
///     name: String,
///     draft: String,
/// }
///
/// impl Entity for Order {
///     fn table_name() -> Option<&'static str> {
///         Some("Orders")
///     }
///
///     fn map(columns: &mut EntityMap<Self>) {
///         columns.column("Id", |o| &o.id, |o| &mut o.id).primary_key().auto_increment();
///         columns.column("Name", |o| &o.name, |o| &mut o.name);
///         columns.column("Draft", |o| &o.draft, |o| &mut o.draft).ignored();
///     }
/// }
/// ```
pub trait Entity: Default + 'static {
    /// Table name override. Defaults to the type's name.
    fn table_name() -> Option<&'static str> {
        None
    }

    /// Registers the mapped columns in declaration order.
    fn map(columns: &mut EntityMap<Self>);
}

type Reader<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Writer<T> = Box<dyn Fn(&mut T, Value) -> Result<()> + Send + Sync>;

/// One registered column bound to its field.
pub struct FieldMapping<T> {
    descriptor: ColumnDescriptor,
    read: Reader<T>,
    write: Writer<T>,
}

impl<T> FieldMapping<T> {
    /// The column's descriptor
    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// The column's name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Reads the field and converts it for binding.
    pub fn value_of(&self, entity: &T) -> Value {
        (self.read)(entity)
    }

    /// Converts a stored value and assigns it to the field.
    pub fn assign(&self, entity: &mut T, value: Value) -> Result<()> {
        (self.write)(entity, value)
    }
}

/// Column registrations collected from [`Entity::map`].
pub struct EntityMap<T> {
    fields: Vec<FieldMapping<T>>,
}

impl<T: 'static> EntityMap<T> {
    fn new() -> Self {
        EntityMap { fields: Vec::new() }
    }

    /// Registers a column backed by a field.
    ///
    /// The semantic type comes from the field's Rust type. The returned
    /// descriptor takes the role markers (`primary_key`, `auto_increment`,
    /// `ignored`, `not_null`).
    pub fn column<V: ColumnValue + 'static>(
        &mut self,
        name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut ColumnDescriptor {
        let field = FieldMapping {
            descriptor: ColumnDescriptor::new(name, V::SEMANTIC),
            read: Box::new(move |entity: &T| get(entity).to_storage()),
            write: Box::new(move |entity: &mut T, value: Value| {
                *get_mut(entity) = V::from_storage(value)?;
                Ok(())
            }),
        };
        self.fields.push(field);

        let index = self.fields.len() - 1;
        &mut self.fields[index].descriptor
    }
}

/// Validated column layout for an entity type.
pub struct EntityMapping<T> {
    table: String,
    fields: Vec<FieldMapping<T>>,
    columns: Vec<ColumnDescriptor>,
    primary_key: Option<usize>,
}

/// Process-wide cache of validated mappings, keyed by entity type.
static MAPPINGS: OnceCell<Mutex<Registry>> = OnceCell::new();

type Registry = HashMap<TypeId, &'static (dyn Any + Send + Sync)>;

/// Entries are inserted whole, so a poisoned lock still guards a valid map.
fn lock_registry() -> MutexGuard<'static, Registry> {
    MAPPINGS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

impl<T: Entity> EntityMapping<T> {
    /// Returns the cached mapping for `T`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Mapping` if the registration is invalid.
    pub fn get() -> Result<&'static Self> {
        if let Some(existing) = lock_registry().get(&TypeId::of::<T>()).copied() {
            return Self::downcast(existing);
        }

        // Registration code runs outside the lock; a panicking `map` must not
        // block every other entity type.
        let built = Self::build()?;

        let mut registry = lock_registry();
        if let Some(existing) = registry.get(&TypeId::of::<T>()).copied() {
            return Self::downcast(existing);
        }
        let mapping: &'static Self = Box::leak(Box::new(built));
        registry.insert(TypeId::of::<T>(), mapping);
        debug!(
            "Registered entity {} as table {} with {} columns",
            std::any::type_name::<T>(),
            mapping.table,
            mapping.columns.len()
        );
        Ok(mapping)
    }

    fn downcast(entry: &'static (dyn Any + Send + Sync)) -> Result<&'static Self> {
        entry.downcast_ref::<Self>().ok_or_else(|| {
            OrmError::Mapping(format!(
                "registry entry for {} has the wrong type",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Builds and validates the mapping without caching it.
    pub fn build() -> Result<Self> {
        let table = T::table_name()
            .map(str::to_string)
            .unwrap_or_else(default_table_name::<T>);

        let mut map = EntityMap::new();
        T::map(&mut map);
        let fields = map.fields;

        let mut seen = HashSet::new();
        for field in &fields {
            let column = field.descriptor();
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(OrmError::Mapping(format!(
                    "column {} is registered twice on {}",
                    column.name, table
                )));
            }
            if column.is_auto_increment && !column.is_primary_key {
                return Err(OrmError::Mapping(format!(
                    "auto-increment column {} on {} must be the primary key",
                    column.name, table
                )));
            }
            if column.is_auto_increment && column.semantic_type.storage_type() != "INTEGER" {
                return Err(OrmError::Mapping(format!(
                    "auto-increment column {} on {} must be integer-backed, not {}",
                    column.name, table, column.semantic_type
                )));
            }
            if column.is_primary_key && column.is_ignored {
                return Err(OrmError::Mapping(format!(
                    "primary key {} on {} cannot be ignored",
                    column.name, table
                )));
            }
        }

        let keys: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.descriptor().is_primary_key)
            .map(|(index, _)| index)
            .collect();
        if keys.len() > 1 {
            let names: Vec<&str> = keys.iter().map(|&index| fields[index].name()).collect();
            return Err(OrmError::Mapping(format!(
                "multiple primary keys declared on {}: {}",
                table,
                names.join(", ")
            )));
        }

        let columns = fields.iter().map(|field| field.descriptor().clone()).collect();
        Ok(EntityMapping {
            table,
            fields,
            columns,
            primary_key: keys.first().copied(),
        })
    }
}

impl<T> EntityMapping<T> {
    /// Table identifier
    pub fn table(&self) -> &str {
        &self.table
    }

    /// All registered columns, ignored ones included, in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Columns that take part in storage operations.
    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldMapping<T>> {
        self.fields.iter().filter(|field| field.descriptor().is_stored())
    }

    /// The primary-key column, if one was declared.
    pub fn primary_key(&self) -> Option<&FieldMapping<T>> {
        self.primary_key.map(|index| &self.fields[index])
    }
}

/// Last path segment of the type name, without generic arguments.
fn default_table_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::schema::SemanticType;
    use crate::test_utils::{Order, Product};

    #[derive(Debug, Default)]
    struct TwoKeys {
        a: i64,
        b: i64,
    }

    impl Entity for TwoKeys {
        fn map(columns: &mut EntityMap<Self>) {
            columns.column("A", |e| &e.a, |e| &mut e.a).primary_key();
            columns.column("B", |e| &e.b, |e| &mut e.b).primary_key();
        }
    }

    #[derive(Debug, Default)]
    struct LooseCounter {
        id: i64,
        hits: i64,
    }

    impl Entity for LooseCounter {
        fn map(columns: &mut EntityMap<Self>) {
            columns.column("Id", |e| &e.id, |e| &mut e.id).primary_key();
            columns.column("Hits", |e| &e.hits, |e| &mut e.hits).auto_increment();
        }
    }

    #[derive(Debug, Default)]
    struct Duplicate {
        name: String,
        label: String,
    }

    impl Entity for Duplicate {
        fn map(columns: &mut EntityMap<Self>) {
            columns.column("Name", |e| &e.name, |e| &mut e.name);
            columns.column("name", |e| &e.label, |e| &mut e.label);
        }
    }

    #[derive(Debug, Default)]
    struct TextKey {
        id: String,
    }

    impl Entity for TextKey {
        fn map(columns: &mut EntityMap<Self>) {
            columns.column("Id", |e| &e.id, |e| &mut e.id).primary_key().auto_increment();
        }
    }

    #[derive(Debug, Default)]
    struct Exploding;

    impl Entity for Exploding {
        fn map(_columns: &mut EntityMap<Self>) {
            panic!("registration failed");
        }
    }

    #[derive(Debug, Default)]
    struct Survivor {
        id: i64,
    }

    impl Entity for Survivor {
        fn map(columns: &mut EntityMap<Self>) {
            columns.column("Id", |e| &e.id, |e| &mut e.id).primary_key();
        }
    }

    #[test]
    fn test_columns_follow_declaration_order() {
        let mapping = EntityMapping::<Order>::get().unwrap();
        let names: Vec<&str> = mapping.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Id", "Name", "Value", "Shipped", "Status", "PlacedAt", "Note", "Scratch"]
        );
        assert_eq!(mapping.table(), "Orders");
    }

    #[test]
    fn test_semantic_types_are_inferred() {
        let mapping = EntityMapping::<Order>::get().unwrap();
        let types: Vec<SemanticType> = mapping.columns().iter().map(|c| c.semantic_type).collect();
        assert_eq!(
            types,
            vec![
                SemanticType::Integer64,
                SemanticType::Text,
                SemanticType::Integer64,
                SemanticType::Boolean,
                SemanticType::EnumBackedInteger,
                SemanticType::Timestamp,
                SemanticType::Text,
                SemanticType::Text,
            ]
        );
    }

    #[test]
    fn test_role_flags() {
        let mapping = EntityMapping::<Order>::get().unwrap();
        let key = mapping.primary_key().unwrap();
        assert_eq!(key.name(), "Id");
        assert!(key.descriptor().is_auto_increment);

        let stored: Vec<&str> = mapping.stored_fields().map(|f| f.name()).collect();
        assert!(!stored.contains(&"Scratch"));
        assert!(mapping.columns().iter().any(|c| c.is_ignored && c.name == "Scratch"));
    }

    #[test]
    fn test_default_table_name() {
        let mapping = EntityMapping::<Product>::get().unwrap();
        assert_eq!(mapping.table(), "Product");
        assert_eq!(default_table_name::<Vec<Product>>(), "Vec");
    }

    #[test]
    fn test_mapping_is_cached() {
        let first = EntityMapping::<Order>::get().unwrap();
        let second = EntityMapping::<Order>::get().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_multiple_primary_keys_rejected() {
        match EntityMapping::<TwoKeys>::get() {
            Err(OrmError::Mapping(message)) => {
                assert!(message.contains("multiple primary keys"), "{}", message);
                assert!(message.contains("A, B"), "{}", message);
            }
            _ => panic!("Expected mapping error"),
        }
    }

    #[test]
    fn test_auto_increment_requires_primary_key() {
        assert!(matches!(
            EntityMapping::<LooseCounter>::build(),
            Err(OrmError::Mapping(_))
        ));
    }

    #[test]
    fn test_auto_increment_requires_integer_key() {
        match EntityMapping::<TextKey>::get() {
            Err(OrmError::Mapping(message)) => {
                assert!(message.contains("integer-backed"), "{}", message);
            }
            _ => panic!("Expected mapping error"),
        }
    }

    #[test]
    fn test_panicking_registration_leaves_registry_usable() {
        let outcome = std::panic::catch_unwind(|| EntityMapping::<Exploding>::get().map(|_| ()));
        assert!(outcome.is_err());

        let mapping = EntityMapping::<Survivor>::get().unwrap();
        assert_eq!(mapping.table(), "Survivor");
        assert!(EntityMapping::<Order>::get().is_ok());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        assert!(matches!(
            EntityMapping::<Duplicate>::build(),
            Err(OrmError::Mapping(_))
        ));
    }

    #[test]
    fn test_field_access_round_trip() {
        let mapping = EntityMapping::<Product>::get().unwrap();
        let mut product = Product::default();
        let name = mapping.stored_fields().find(|f| f.name() == "Name").unwrap();

        name.assign(&mut product, Value::Text("Widget".to_string())).unwrap();
        assert_eq!(product.name, "Widget");
        assert_eq!(name.value_of(&product), Value::Text("Widget".to_string()));
    }
}
