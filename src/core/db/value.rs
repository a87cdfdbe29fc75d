/// Value Codec Module
///
/// Converts field values to SQLite storage values on write and back into
/// typed field values on read. SQLite only stores NULL, INTEGER, REAL, TEXT
/// and BLOB, so integer widths, booleans, enums and timestamps are collapsed
/// onto those classes without loss.

use crate::core::db::schema::SemanticType;
use crate::core::{OrmError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

pub use rusqlite::types::Value;

/// Text layout for `NaiveDateTime`; no offset is written or assumed.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Text layout for `NaiveDate`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A Rust type that can be stored in a mapped column.
///
/// `SEMANTIC` is how the entity registry infers a column's semantic type
/// from the field type at compile time.
pub trait ColumnValue: Sized {
    /// Storage category for columns of this type
    const SEMANTIC: SemanticType;

    /// Converts the value into its storage representation.
    fn to_storage(&self) -> Value;

    /// Rebuilds a value from its storage representation.
    fn from_storage(value: Value) -> Result<Self>;
}

/// An enum persisted as an integer backing value.
///
/// Implemented through the [`storage_enum!`](crate::storage_enum) macro,
/// which also provides the matching [`ColumnValue`] impl.
pub trait StorageEnum: Sized + 'static {
    /// Integer stored for this member.
    fn backing_value(&self) -> i64;

    /// Member for a stored integer, if any.
    fn from_backing_value(value: i64) -> Option<Self>;
}

/// Converts a field value for parameter binding. Never fails.
pub fn normalize_for_write<V: ColumnValue>(value: &V) -> Value {
    value.to_storage()
}

/// Converts a retrieved storage value into a field value.
///
/// # Errors
///
/// Returns `OrmError::Conversion` when the value cannot be coerced into `V`.
pub fn materialize<V: ColumnValue>(value: Value) -> Result<V> {
    V::from_storage(value)
}

/// Name of a storage value's SQLite storage class.
pub fn storage_class(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Integer(_) => "INTEGER",
        Value::Real(_) => "REAL",
        Value::Text(_) => "TEXT",
        Value::Blob(_) => "BLOB",
    }
}

/// Builds the conversion error for `value` and the target type `target`.
pub fn conversion_error(value: &Value, target: &'static str) -> OrmError {
    let rendered = match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    };
    OrmError::Conversion {
        value: rendered,
        source_type: storage_class(value),
        target_type: target,
    }
}

fn coerce_integer(value: Value, target: &'static str) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(i),
        Value::Real(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        Value::Text(ref s) => s.trim().parse::<i64>().map_err(|_| conversion_error(&value, target)),
        other => Err(conversion_error(&other, target)),
    }
}

fn coerce_real(value: Value, target: &'static str) -> Result<f64> {
    match value {
        Value::Real(f) => Ok(f),
        Value::Integer(i) => Ok(i as f64),
        Value::Text(ref s) => s.trim().parse::<f64>().map_err(|_| conversion_error(&value, target)),
        other => Err(conversion_error(&other, target)),
    }
}

fn coerce_text(value: Value, target: &'static str) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Real(f) => Ok(f.to_string()),
        Value::Blob(bytes) => String::from_utf8(bytes)
            .map_err(|e| conversion_error(&Value::Blob(e.into_bytes()), target)),
        Value::Null => Err(conversion_error(&Value::Null, target)),
    }
}

macro_rules! integer_column {
    ($($ty:ty),+) => {
        $(
            impl ColumnValue for $ty {
                const SEMANTIC: SemanticType = SemanticType::Integer64;

                fn to_storage(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_storage(value: Value) -> Result<Self> {
                    let target = stringify!($ty);
                    let wide = coerce_integer(value, target)?;
                    <$ty>::try_from(wide)
                        .map_err(|_| conversion_error(&Value::Integer(wide), target))
                }
            }
        )+
    };
}

// u64, usize and isize have no lossless `From` into i64 on every target.
integer_column!(i8, i16, i32, i64, u8, u16, u32);

impl ColumnValue for f64 {
    const SEMANTIC: SemanticType = SemanticType::Real;

    fn to_storage(&self) -> Value {
        Value::Real(*self)
    }

    fn from_storage(value: Value) -> Result<Self> {
        coerce_real(value, "f64")
    }
}

impl ColumnValue for f32 {
    const SEMANTIC: SemanticType = SemanticType::Real;

    fn to_storage(&self) -> Value {
        Value::Real(f64::from(*self))
    }

    fn from_storage(value: Value) -> Result<Self> {
        let wide = coerce_real(value, "f32")?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(conversion_error(&Value::Real(wide), "f32"));
        }
        Ok(narrow)
    }
}

impl ColumnValue for bool {
    const SEMANTIC: SemanticType = SemanticType::Boolean;

    fn to_storage(&self) -> Value {
        Value::Integer(if *self { 1 } else { 0 })
    }

    fn from_storage(value: Value) -> Result<Self> {
        match value {
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(conversion_error(&value, "bool")),
            },
            other => Err(conversion_error(&other, "bool")),
        }
    }
}

impl ColumnValue for String {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn to_storage(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_storage(value: Value) -> Result<Self> {
        coerce_text(value, "String")
    }
}

impl ColumnValue for Vec<u8> {
    const SEMANTIC: SemanticType = SemanticType::Binary;

    fn to_storage(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_storage(value: Value) -> Result<Self> {
        match value {
            Value::Blob(bytes) => Ok(bytes),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(conversion_error(&other, "Vec<u8>")),
        }
    }
}

impl ColumnValue for Uuid {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn to_storage(&self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }

    fn from_storage(value: Value) -> Result<Self> {
        match value {
            Value::Text(ref s) => Uuid::parse_str(s).map_err(|_| conversion_error(&value, "Uuid")),
            Value::Blob(ref bytes) => {
                Uuid::from_slice(bytes).map_err(|_| conversion_error(&value, "Uuid"))
            }
            other => Err(conversion_error(&other, "Uuid")),
        }
    }
}

impl ColumnValue for NaiveDateTime {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn to_storage(&self) -> Value {
        Value::Text(self.format(TIMESTAMP_FORMAT).to_string())
    }

    fn from_storage(value: Value) -> Result<Self> {
        match value {
            Value::Text(ref s) => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                .map_err(|_| conversion_error(&value, "NaiveDateTime")),
            other => Err(conversion_error(&other, "NaiveDateTime")),
        }
    }
}

impl ColumnValue for NaiveDate {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn to_storage(&self) -> Value {
        Value::Text(self.format(DATE_FORMAT).to_string())
    }

    fn from_storage(value: Value) -> Result<Self> {
        match value {
            Value::Text(ref s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_err(|_| conversion_error(&value, "NaiveDate")),
            other => Err(conversion_error(&other, "NaiveDate")),
        }
    }
}

impl ColumnValue for DateTime<Utc> {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn to_storage(&self) -> Value {
        Value::Text(self.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    fn from_storage(value: Value) -> Result<Self> {
        match value {
            Value::Text(ref s) => DateTime::parse_from_rfc3339(s)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| conversion_error(&value, "DateTime<Utc>")),
            other => Err(conversion_error(&other, "DateTime<Utc>")),
        }
    }
}

impl<V: ColumnValue> ColumnValue for Option<V> {
    const SEMANTIC: SemanticType = V::SEMANTIC;

    fn to_storage(&self) -> Value {
        match self {
            Some(value) => value.to_storage(),
            None => Value::Null,
        }
    }

    fn from_storage(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => V::from_storage(other).map(Some),
        }
    }
}

/// Storage form of an enum member. Used by [`storage_enum!`](crate::storage_enum).
pub fn enum_to_storage<E: StorageEnum>(member: &E) -> Value {
    Value::Integer(member.backing_value())
}

/// Enum member for a stored value. Used by [`storage_enum!`](crate::storage_enum).
pub fn enum_from_storage<E: StorageEnum>(value: Value) -> Result<E> {
    let target = std::any::type_name::<E>();
    let backing = coerce_integer(value, target)?;
    E::from_backing_value(backing).ok_or_else(|| conversion_error(&Value::Integer(backing), target))
}

/// Registers a fieldless enum as a column type backed by integers.
///
/// ```
/// #[derive(Debug, Default, Clone, Copy, PartialEq)]
/// enum Status {
///     #[default]
///     Pending,
///     Shipped,
/// }
///
/// liteorm::storage_enum!(Status { Pending = 0, Shipped = 2 });
/// ```
#[macro_export]
macro_rules! storage_enum {
    ($name:ty { $($variant:ident = $backing:expr),+ $(,)? }) => {
        impl $crate::core::db::value::StorageEnum for $name {
            fn backing_value(&self) -> i64 {
                match self {
                    $(Self::$variant => $backing,)+
                }
            }

            fn from_backing_value(value: i64) -> ::std::option::Option<Self> {
                $(
                    if value == $backing {
                        return ::std::option::Option::Some(Self::$variant);
                    }
                )+
                ::std::option::Option::None
            }
        }

        impl $crate::core::db::value::ColumnValue for $name {
            const SEMANTIC: $crate::core::db::schema::SemanticType =
                $crate::core::db::schema::SemanticType::EnumBackedInteger;

            fn to_storage(&self) -> $crate::core::db::value::Value {
                $crate::core::db::value::enum_to_storage(self)
            }

            fn from_storage(
                value: $crate::core::db::value::Value,
            ) -> $crate::core::Result<Self> {
                $crate::core::db::value::enum_from_storage(value)
            }
        }
    };
}
