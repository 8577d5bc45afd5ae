//! Property-based tests for numeric narrowing and record round trips.

use std::sync::Arc;

use apache_avro::types::Value;
use apache_avro::{Schema, from_avro_datum, to_avro_datum};
use avrobind_engine::{deserialize, serialize};
use avrobind_types::{FieldType, HostType, HostValue, RecordType, RecordValue};
use proptest::prelude::*;

const SAMPLE_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Sample",
    "fields": [
        {"name": "small", "type": "int"},
        {"name": "large", "type": "long"},
        {"name": "ratio", "type": "float"},
        {"name": "label", "type": "string"},
        {"name": "blob", "type": "bytes"},
        {"name": "flag", "type": "boolean"}
    ]
}"#;

fn sample_type() -> Arc<RecordType> {
    Arc::new(RecordType::new(
        "Sample",
        vec![
            FieldType::new("small", HostType::INT),
            FieldType::new("large", HostType::INT),
            FieldType::new("ratio", HostType::FLOAT),
            FieldType::new("label", HostType::STRING),
            FieldType::new("blob", HostType::bytes()),
            FieldType::new("flag", HostType::BOOLEAN),
        ],
    ))
}

// ============================================================================
// Generators
// ============================================================================

/// Records whose values survive the schema: `small` fits in 32 bits and
/// `ratio` holds the shortest decimal form of a finite `f32`, which is what
/// widening a decoded `float` produces.
fn arb_sample() -> impl Strategy<Value = HostValue> {
    (
        any::<i32>(),
        any::<i64>(),
        any::<f32>().prop_filter("finite", |f| f.is_finite()),
        ".{0,16}",
        prop::collection::vec(any::<u8>(), 0..32),
        any::<bool>(),
    )
        .prop_map(|(small, large, ratio, label, blob, flag)| {
            let record = RecordValue::new(sample_type())
                .with_field("small", i64::from(small))
                .and_then(|r| r.with_field("large", large))
                .and_then(|r| r.with_field("ratio", ratio.to_string().parse::<f64>().unwrap()))
                .and_then(|r| r.with_field("label", label))
                .and_then(|r| r.with_field("blob", HostValue::Bytes(blob)))
                .and_then(|r| r.with_field("flag", flag))
                .unwrap();
            HostValue::Record(record)
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn test_int_narrowing_is_twos_complement(n in any::<i64>()) {
        let schema = Schema::parse_str("\"int\"").unwrap();
        let generic = serialize(&schema, &HostValue::Int(n)).unwrap();
        prop_assert_eq!(&generic, &Value::Int(n as i32));

        let back = deserialize(&schema, &HostType::INT, &generic).unwrap();
        if i32::try_from(n).is_ok() {
            prop_assert_eq!(back, HostValue::Int(n));
        } else {
            prop_assert_eq!(back, HostValue::Int(i64::from(n as i32)));
        }
    }

    #[test]
    fn test_long_is_lossless(n in any::<i64>()) {
        let schema = Schema::parse_str("\"long\"").unwrap();
        let generic = serialize(&schema, &HostValue::Int(n)).unwrap();
        prop_assert_eq!(deserialize(&schema, &HostType::INT, &generic).unwrap(), HostValue::Int(n));
    }

    #[test]
    fn test_record_round_trip_through_encoder(value in arb_sample()) {
        let schema = Schema::parse_str(SAMPLE_SCHEMA).unwrap();
        let bytes = to_avro_datum(&schema, serialize(&schema, &value).unwrap()).unwrap();
        let decoded = from_avro_datum(&schema, &mut bytes.as_slice(), None).unwrap();
        let back = deserialize(&schema, &value.type_of(), &decoded).unwrap();
        prop_assert_eq!(back, value);
    }
}
