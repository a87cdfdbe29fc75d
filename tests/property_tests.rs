//! Property-based tests for value conversion and statement generation
//!
//! These tests verify that:
//! - Every supported column type survives a write/read conversion unchanged
//! - Entities survive an insert/read round trip through SQLite
//! - Generated statements bind exactly one parameter per placeholder

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use liteorm::core::db::statement;
    use liteorm::core::db::value::{materialize, normalize_for_write};
    use liteorm::{ColumnValue, ConnectionManager, Entity, EntityMap, EntityMapping, TableGateway};
    use proptest::prelude::*;
    use uuid::Uuid;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    enum Level {
        #[default]
        Low,
        Mid,
        High,
    }

    liteorm::storage_enum!(Level {
        Low = -1,
        Mid = 0,
        High = 7,
    });

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Reading {
        id: i64,
        sensor: String,
        value: f64,
        valid: bool,
        level: Level,
        taken_at: NaiveDateTime,
        raw: Vec<u8>,
        calibration: Option<i32>,
    }

    impl Entity for Reading {
        fn map(columns: &mut EntityMap<Self>) {
            columns.column("Id", |r| &r.id, |r| &mut r.id).primary_key();
            columns.column("Sensor", |r| &r.sensor, |r| &mut r.sensor);
            columns.column("Value", |r| &r.value, |r| &mut r.value);
            columns.column("Valid", |r| &r.valid, |r| &mut r.valid);
            columns.column("Level", |r| &r.level, |r| &mut r.level);
            columns.column("TakenAt", |r| &r.taken_at, |r| &mut r.taken_at);
            columns.column("Raw", |r| &r.raw, |r| &mut r.raw);
            columns.column("Calibration", |r| &r.calibration, |r| &mut r.calibration);
        }
    }

    fn round_trip<V: ColumnValue>(value: &V) -> V {
        materialize::<V>(normalize_for_write(value)).expect("round trip should succeed")
    }

    fn arb_level() -> impl Strategy<Value = Level> {
        prop_oneof![Just(Level::Low), Just(Level::Mid), Just(Level::High)]
    }

    fn arb_timestamp() -> impl Strategy<Value = NaiveDateTime> {
        // 1970-01-01 .. 2100-01-01, millisecond precision
        (0i64..4_102_444_800_000i64).prop_map(|millis| {
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|at| at.naive_utc())
                .unwrap_or_default()
        })
    }

    fn arb_reading() -> impl Strategy<Value = Reading> {
        (
            any::<i64>(),
            "[a-zA-Z0-9 _-]{0,24}",
            -1.0e9f64..1.0e9f64,
            any::<bool>(),
            arb_level(),
            arb_timestamp(),
            prop::collection::vec(any::<u8>(), 0..32),
            proptest::option::of(any::<i32>()),
        )
            .prop_map(
                |(id, sensor, value, valid, level, taken_at, raw, calibration)| Reading {
                    id,
                    sensor,
                    value,
                    valid,
                    level,
                    taken_at,
                    raw,
                    calibration,
                },
            )
    }

    proptest! {
        /// Integers of every width come back unchanged
        #[test]
        fn prop_integer_round_trip(
            a in any::<i8>(),
            b in any::<i16>(),
            c in any::<i32>(),
            d in any::<i64>(),
            e in any::<u8>(),
            f in any::<u16>(),
            g in any::<u32>(),
        ) {
            prop_assert_eq!(round_trip(&a), a);
            prop_assert_eq!(round_trip(&b), b);
            prop_assert_eq!(round_trip(&c), c);
            prop_assert_eq!(round_trip(&d), d);
            prop_assert_eq!(round_trip(&e), e);
            prop_assert_eq!(round_trip(&f), f);
            prop_assert_eq!(round_trip(&g), g);
        }

        /// Non-integral column types come back unchanged
        #[test]
        fn prop_scalar_round_trip(
            real in any::<f64>().prop_filter("finite", |f| f.is_finite()),
            narrow in any::<f32>().prop_filter("finite", |f| f.is_finite()),
            flag in any::<bool>(),
            text in ".*",
            bytes in prop::collection::vec(any::<u8>(), 0..64),
            level in arb_level(),
            taken_at in arb_timestamp(),
            maybe in proptest::option::of(any::<i64>()),
        ) {
            prop_assert_eq!(round_trip(&real), real);
            prop_assert_eq!(round_trip(&narrow), narrow);
            prop_assert_eq!(round_trip(&flag), flag);
            prop_assert_eq!(round_trip(&text), text);
            prop_assert_eq!(round_trip(&bytes), bytes);
            prop_assert_eq!(round_trip(&level), level);
            prop_assert_eq!(round_trip(&taken_at), taken_at);
            prop_assert_eq!(round_trip(&maybe), maybe);
            prop_assert_eq!(round_trip(&taken_at.date()), taken_at.date());
            prop_assert_eq!(round_trip(&taken_at.and_utc()), taken_at.and_utc());
        }

        /// Uuids come back unchanged
        #[test]
        fn prop_uuid_round_trip(bytes in any::<[u8; 16]>()) {
            let id = Uuid::from_bytes(bytes);
            prop_assert_eq!(round_trip(&id), id);
        }

        /// Entities read back equal to what was inserted
        #[test]
        fn prop_entity_round_trip(reading in arb_reading()) {
            let manager = ConnectionManager::open_in_memory().unwrap();
            let gateway = TableGateway::<Reading>::new(&manager).unwrap();
            gateway.create_table().unwrap();
            gateway.insert(&reading).unwrap();

            let rows = gateway.all().unwrap();
            prop_assert_eq!(rows.len(), 1);
            prop_assert_eq!(&rows[0], &reading);
        }

        /// Each placeholder has exactly one bound parameter
        #[test]
        fn prop_placeholders_match_params(reading in arb_reading()) {
            let mapping = EntityMapping::<Reading>::get().unwrap();
            for built in [
                statement::insert(mapping, &reading).unwrap(),
                statement::update(mapping, &reading).unwrap(),
                statement::delete(mapping, &reading).unwrap(),
            ] {
                let placeholders = built.sql.matches('?').count();
                prop_assert_eq!(placeholders, built.params.len());
                let last_placeholder = format!("?{}", built.params.len());
                prop_assert!(built.sql.contains(&last_placeholder));
            }
        }
    }

    #[test]
    fn test_date_boundaries() {
        let leap = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
        assert_eq!(round_trip(&leap), leap);

        let end_of_day = leap.and_hms_nano_opt(23, 59, 59, 999_999_999).unwrap();
        assert_eq!(round_trip(&end_of_day), end_of_day);
    }

    #[test]
    fn test_extreme_reals() {
        for value in [f64::MIN, f64::MAX, f64::MIN_POSITIVE, -0.0, 0.1 + 0.2] {
            assert_eq!(round_trip(&value), value);
        }
    }
}
