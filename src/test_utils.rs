/// # Test Utilities Module
///
/// Shared fixtures for the crate's unit and integration tests:
/// - Sample entities covering every semantic type
/// - Isolated on-disk service fixtures
/// - Test logging setup

use crate::core::db::{ConnectionOptions, Entity, EntityMap};
use crate::core::Result;
use crate::service::{DatabaseRegistry, DatabaseService};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Once;
use tempfile::TempDir;
use uuid::Uuid;

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Cancelled,
}

crate::storage_enum!(OrderStatus {
    Pending = 0,
    Shipped = 1,
    Cancelled = 2,
});

/// Auto-increment key, enum, timestamp, nullable and ignored columns.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub name: String,
    pub value: i64,
    pub shipped: bool,
    pub status: OrderStatus,
    pub placed_at: NaiveDateTime,
    pub note: Option<String>,
    pub scratch: String,
}

impl Entity for Order {
    fn table_name() -> Option<&'static str> {
        Some("Orders")
    }

    fn map(columns: &mut EntityMap<Self>) {
        columns
            .column("Id", |o| &o.id, |o| &mut o.id)
            .primary_key()
            .auto_increment();
        columns.column("Name", |o| &o.name, |o| &mut o.name).not_null();
        columns.column("Value", |o| &o.value, |o| &mut o.value);
        columns.column("Shipped", |o| &o.shipped, |o| &mut o.shipped);
        columns.column("Status", |o| &o.status, |o| &mut o.status);
        columns.column("PlacedAt", |o| &o.placed_at, |o| &mut o.placed_at);
        columns.column("Note", |o| &o.note, |o| &mut o.note);
        columns
            .column("Scratch", |o| &o.scratch, |o| &mut o.scratch)
            .ignored();
    }
}

/// Caller-assigned key and a default table name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub sku: Uuid,
}

impl Entity for Product {
    fn map(columns: &mut EntityMap<Self>) {
        columns.column("Id", |p| &p.id, |p| &mut p.id).primary_key();
        columns.column("Name", |p| &p.name, |p| &mut p.name);
        columns.column("Price", |p| &p.price, |p| &mut p.price);
        columns.column("Sku", |p| &p.sku, |p| &mut p.sku);
    }
}

/// No primary key: insert and read only.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Keyless {
    pub label: String,
    pub count: i32,
}

impl Entity for Keyless {
    fn map(columns: &mut EntityMap<Self>) {
        columns.column("Label", |k| &k.label, |k| &mut k.label);
        columns.column("Count", |k| &k.count, |k| &mut k.count);
    }
}

/// A pending order placed at a fixed time.
pub fn sample_order(name: &str, value: i64) -> Order {
    Order {
        id: 0,
        name: name.to_string(),
        value,
        shipped: false,
        status: OrderStatus::Pending,
        placed_at: NaiveDate::from_ymd_opt(2024, 3, 15)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .unwrap_or_default(),
        note: None,
        scratch: String::new(),
    }
}

/// Service over a private temporary directory with one database, `main`.
pub struct ServiceFixture {
    pub dir: TempDir,
    pub service: DatabaseService,
}

impl ServiceFixture {
    pub const DB: &'static str = "main";

    pub fn new() -> Result<Self> {
        init_test_logging();
        let dir = tempfile::tempdir()?;
        let registry = DatabaseRegistry::new().with_database(Self::DB, dir.path().join("main.db"));
        let service = DatabaseService::new(registry, ConnectionOptions::default())?;
        Ok(ServiceFixture { dir, service })
    }
}
