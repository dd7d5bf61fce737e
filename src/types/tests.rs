use std::io::Cursor;
use std::sync::Arc;

use chrono_tz::{Tz, UTC};
use uuid::Uuid;

use super::Type;
use crate::values::{Date, Date32, DateTime, DateTime64, Value};
use crate::{Error, Result};

async fn encode(type_: &Type, value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    type_.write_value(&mut buf, value).await.unwrap();
    buf
}

/// Encodes, decodes and asserts the stream was fully consumed.
async fn roundtrip(type_: &Type, value: &Value) -> Value {
    let buf = encode(type_, value).await;
    let len = buf.len();
    let mut cursor = Cursor::new(buf);
    let out = type_.read_value(&mut cursor).await.unwrap();
    assert_eq!(cursor.position(), len as u64, "trailing bytes after {type_}");
    out
}

async fn decode_header(bytes: &[u8]) -> Result<Type> {
    let mut cursor = Cursor::new(bytes.to_vec());
    Type::read_binary(&mut cursor).await
}

fn sample_pairs() -> Vec<(Type, Value)> {
    vec![
        (Type::Nothing, Value::Null),
        (Type::Bool, Value::Bool(true)),
        (Type::UInt8, Value::UInt8(255)),
        (Type::UInt16, Value::UInt16(0xBEEF)),
        (Type::UInt32, Value::UInt32(3_123_213_123)),
        (Type::UInt64, Value::UInt64(u64::MAX)),
        (Type::Int8, Value::Int8(-1)),
        (Type::Int16, Value::Int16(i16::MIN)),
        (Type::Int32, Value::Int32(-42)),
        (Type::Int64, Value::Int64(i64::MIN)),
        (Type::Float32, Value::Float32(1.5)),
        (Type::Float64, Value::Float64(-2.25)),
        (Type::String, Value::string("hello")),
        (Type::FixedString(4), Value::string("abcd")),
        (Type::Uuid, Value::Uuid(Uuid::from_u128(0x0011_2233_4455_6677_8899_AABB_CCDD_EEFF))),
        (Type::Ipv4, Value::Ipv4("1.2.3.4".parse().unwrap())),
        (Type::Ipv6, Value::Ipv6("2001:db8::1".parse().unwrap())),
        (Type::Date, Value::Date(Date(19_105))),
        (Type::Date32, Value::Date32(Date32(-3650))),
        (Type::DateTime, Value::DateTime(DateTime(UTC, 1_650_585_600))),
        (
            Type::DateTimeTz(Tz::Asia__Tokyo),
            Value::DateTime(DateTime(Tz::Asia__Tokyo, 1_650_585_600)),
        ),
        (Type::DateTime64(3), Value::DateTime64(DateTime64(UTC, 1_650_585_600_123, 3))),
        (
            Type::DateTime64Tz(6, Tz::Europe__Berlin),
            Value::DateTime64(DateTime64(Tz::Europe__Berlin, 1_650_585_600_123_456, 6)),
        ),
        (Type::decimal(9, 4), Value::Decimal32(4, 42_000)),
        (Type::decimal(18, 6), Value::Decimal64(6, -1_234_567_890_123)),
        (Type::enum8([("a", 1i8), ("b", 2)]), Value::Enum("b".into())),
        (Type::enum16([("x", 300i16), ("y", -5)]), Value::Enum("x".into())),
        (
            Type::array(Type::nullable(Type::UInt32)),
            Value::Array(vec![Value::UInt32(7), Value::Null, Value::UInt32(0)]),
        ),
        (
            Type::tuple([Type::UInt8, Type::String]),
            Value::Tuple(vec![Value::UInt8(1), Value::string("x")]),
        ),
        (
            Type::named_tuple([("id", Type::UInt64), ("name", Type::String)]),
            Value::Tuple(vec![Value::UInt64(9), Value::string("n")]),
        ),
        (
            Type::map(Type::String, Type::UInt32),
            Value::Map(vec![
                (Value::string("b"), Value::UInt32(2)),
                (Value::string("a"), Value::UInt32(1)),
            ]),
        ),
        (Type::low_cardinality(Type::String), Value::string("dict")),
        (
            Type::variant([Type::String, Type::UInt32]),
            Value::typed(Type::UInt32, Value::UInt32(42)),
        ),
        (Type::dynamic(), Value::typed(Type::String, Value::string("dyn"))),
        (Type::custom("Point", Type::tuple([Type::Float64, Type::Float64])),
            Value::Tuple(vec![Value::Float64(1.0), Value::Float64(2.0)])),
    ]
}

#[tokio::test]
async fn roundtrip_sample_values() {
    for (type_, value) in sample_pairs() {
        let out = roundtrip(&type_, &value).await;
        assert_eq!(out, value, "{type_}");
    }
}

#[tokio::test]
async fn roundtrip_nan_bitwise() {
    let out = roundtrip(&Type::Float64, &Value::Float64(f64::NAN)).await;
    assert_eq!(out, Value::Float64(f64::NAN));
}

#[tokio::test]
async fn array_wire_bytes() {
    let type_ = Type::array(Type::UInt32);
    let value =
        Value::Array(vec![Value::UInt32(3_123_213_123), Value::UInt32(42), Value::UInt32(0)]);
    let buf = encode(&type_, &value).await;
    assert_eq!(buf, vec![
        0x03, // count
        0x43, 0x73, 0x28, 0xBA, // 3123213123 LE
        0x2A, 0x00, 0x00, 0x00, // 42
        0x00, 0x00, 0x00, 0x00, // 0
    ]);
}

#[tokio::test]
async fn decimal_wire_bytes() {
    // 4.2 at scale 4 is the coefficient 42000
    let buf = encode(&Type::decimal(9, 4), &Value::Decimal32(4, 42_000)).await;
    assert_eq!(buf, vec![0x10, 0xA4, 0x00, 0x00]);
}

#[tokio::test]
async fn decimal_scale_mismatch_rejected() {
    let mut sink = Vec::new();
    let err =
        Type::decimal(9, 4).write_value(&mut sink, &Value::Decimal32(2, 42)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
}

#[tokio::test]
async fn wide_decimal_unsupported() {
    let type_ = Type::decimal(38, 10);
    let mut cursor = Cursor::new(vec![0u8; 16]);
    let err = type_.read_value(&mut cursor).await.unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)), "{err}");
}

#[tokio::test]
async fn nullable_wire_bytes() {
    let type_ = Type::nullable(Type::String);
    assert_eq!(encode(&type_, &Value::Null).await, vec![0x01]);
    assert_eq!(encode(&type_, &Value::string("hi")).await, vec![0x00, 0x02, b'h', b'i']);
}

#[tokio::test]
async fn nullable_bad_discriminant_rejected() {
    let type_ = Type::nullable(Type::UInt8);
    let mut cursor = Cursor::new(vec![0x02u8, 0x00]);
    let err = type_.read_value(&mut cursor).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "{err}");
}

#[tokio::test]
async fn uuid_wire_swaps_halves() {
    let uuid = Uuid::from_u128(0x0011_2233_4455_6677_8899_AABB_CCDD_EEFF);
    let buf = encode(&Type::Uuid, &Value::Uuid(uuid)).await;
    assert_eq!(buf, vec![
        0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, // upper half LE
        0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA, 0x99, 0x88, // lower half LE
    ]);
}

#[tokio::test]
async fn ipv6_wire_is_raw_octets() {
    let addr: std::net::Ipv6Addr = "2001:db8::1".parse().unwrap();
    let buf = encode(&Type::Ipv6, &Value::Ipv6(addr)).await;
    assert_eq!(buf, addr.octets());
}

#[tokio::test]
async fn fixed_string_requires_exact_width() {
    let mut sink = Vec::new();
    let err =
        Type::FixedString(4).write_value(&mut sink, &Value::string("abc")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
}

#[tokio::test]
async fn low_cardinality_is_transparent() {
    let plain = encode(&Type::String, &Value::string("dict")).await;
    let wrapped = encode(&Type::low_cardinality(Type::String), &Value::string("dict")).await;
    assert_eq!(plain, wrapped);
}

#[tokio::test]
async fn enum_wire_is_code() {
    let type_ = Type::enum8([("a", -10i8), ("b", 1)]);
    assert_eq!(encode(&type_, &Value::Enum("a".into())).await, vec![0xF6]);
    let mut sink = Vec::new();
    let err = type_.write_value(&mut sink, &Value::Enum("zzz".into())).await.unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
    let mut cursor = Cursor::new(vec![0x03u8]);
    let err = type_.read_value(&mut cursor).await.unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
}

#[tokio::test]
async fn variant_wire_prefixes_arm_index() {
    let type_ = Type::variant([Type::String, Type::UInt32]);
    let buf = encode(&type_, &Value::typed(Type::UInt32, Value::UInt32(42))).await;
    assert_eq!(buf, vec![0x01, 0x2A, 0x00, 0x00, 0x00]);

    let mut cursor = Cursor::new(vec![0x05u8, 0x00]);
    let err = type_.read_value(&mut cursor).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "{err}");

    let mut sink = Vec::new();
    let err = type_
        .write_value(&mut sink, &Value::typed(Type::Float64, Value::Float64(0.0)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
}

#[tokio::test]
async fn dynamic_embeds_type_header() {
    let buf = encode(&Type::dynamic(), &Value::typed(Type::String, Value::string("x"))).await;
    assert_eq!(buf, vec![0x15, 0x01, b'x']);
}

#[tokio::test]
async fn dynamic_reuses_known_descriptors() {
    let known = Arc::new(Type::array(Type::UInt8));
    let column = Type::dynamic_with(32, vec![Arc::clone(&known)]);
    let value = Value::typed(Arc::clone(&known), Value::Array(vec![Value::UInt8(1)]));
    let buf = encode(&column, &value).await;
    let mut cursor = Cursor::new(buf);
    let out = column.read_value(&mut cursor).await.unwrap();
    let (type_, _) = out.as_typed().unwrap();
    assert!(Arc::ptr_eq(type_, &known));
}

#[tokio::test]
async fn type_header_roundtrip() {
    let types = [
        Type::Nothing,
        Type::Bool,
        Type::UInt64,
        Type::Int8,
        Type::Float32,
        Type::String,
        Type::FixedString(300),
        Type::Uuid,
        Type::Ipv4,
        Type::Ipv6,
        Type::Date,
        Type::Date32,
        Type::DateTime,
        Type::DateTimeTz(Tz::Asia__Tokyo),
        Type::DateTime64(3),
        Type::DateTime64Tz(9, Tz::America__New_York),
        Type::decimal(9, 4),
        Type::decimal(18, 0),
        Type::decimal(38, 10),
        Type::decimal(76, 0),
        Type::enum8([("a", 1i8), ("b", 2)]),
        Type::enum16([("lo", -300i16), ("hi", 300)]),
        Type::array(Type::nullable(Type::UInt32)),
        Type::tuple([Type::UInt8, Type::String]),
        Type::named_tuple([("id", Type::UInt64), ("name", Type::String)]),
        Type::map(Type::String, Type::array(Type::UInt8)),
        Type::low_cardinality(Type::String),
        Type::variant([Type::String, Type::UInt32]),
        Type::dynamic_with(8, Vec::new()),
        Type::custom("Point", Type::Nothing),
    ];
    for type_ in types {
        let bytes = type_.binary();
        let decoded = decode_header(&bytes).await.unwrap();
        assert_eq!(decoded, type_, "header roundtrip for {type_}");
        // Decode must re-encode to the same canonical bytes.
        assert_eq!(decoded.binary(), bytes, "lockstep for {type_}");
    }
}

#[tokio::test]
async fn header_tag_values_are_stable() {
    assert_eq!(&Type::String.binary()[..], &[0x15]);
    assert_eq!(&Type::Bool.binary()[..], &[0x2D]);
    assert_eq!(&Type::array(Type::UInt8).binary()[..], &[0x1E, 0x01]);
    assert_eq!(&Type::nullable(Type::Int64).binary()[..], &[0x23, 0x0A]);
    assert_eq!(&Type::map(Type::String, Type::UInt8).binary()[..], &[0x27, 0x15, 0x01]);
    assert_eq!(&Type::decimal(9, 4).binary()[..], &[0x19, 0x09, 0x04]);
    assert_eq!(&Type::decimal(12, 2).binary()[..], &[0x1A, 0x0C, 0x02]);
    assert_eq!(&Type::DateTimeTz(Tz::UTC).binary()[..], &[0x12, 0x03, b'U', b'T', b'C']);
    assert_eq!(&Type::dynamic().binary()[..], &[0x2B, 0x20]);
    assert_eq!(
        &Type::enum8([("b", 2i8), ("a", 1)]).binary()[..],
        &[0x17, 0x02, 0x01, b'a', 0x01, 0x01, b'b', 0x02]
    );
}

#[tokio::test]
async fn unsupported_header_tags() {
    for (byte, name) in
        [(0x05u8, "UInt128"), (0x21, "Set"), (0x22, "Interval"), (0x25, "AggregateFunction"), (0x30, "JSON")]
    {
        let err = decode_header(&[byte]).await.unwrap_err();
        match err {
            Error::Unsupported(msg) => assert!(msg.contains(name), "{msg} vs {name}"),
            other => panic!("expected Unsupported, got {other}"),
        }
    }
    let err = decode_header(&[0x7F]).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "{err}");
}

#[tokio::test]
async fn oversized_fixed_string_header_rejected() {
    // Width 2^63 as a varint: nine continuation groups, then 0x01.
    let mut bytes = vec![0x16];
    bytes.extend([0x80u8; 9]);
    bytes.push(0x01);
    let err = decode_header(&bytes).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "{err}");
}

#[tokio::test]
async fn oversized_fixed_string_descriptor_rejected_on_read() {
    // A hand-built descriptor must error instead of allocating its width.
    let mut cursor = Cursor::new(vec![0u8; 8]);
    let err = Type::FixedString(1 << 40).read_value(&mut cursor).await.unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
}

#[tokio::test]
async fn decoded_headers_are_validated() {
    for bytes in [
        &[0x16, 0x00][..],       // FixedString(0)
        &[0x23, 0x23, 0x01][..], // Nullable(Nullable(UInt8))
        &[0x17, 0x00][..],       // Enum8 with an empty table
    ] {
        let err = decode_header(bytes).await.unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)), "{bytes:02x?}: {err}");
    }
}

#[tokio::test]
async fn dynamic_embedded_header_is_validated() {
    // Nullable(Nullable(UInt8)) header followed by a value.
    let mut cursor = Cursor::new(vec![0x23, 0x23, 0x01, 0x00, 0x00]);
    let err = Type::dynamic().read_value(&mut cursor).await.unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)), "{err}");
}

#[tokio::test]
async fn truncated_values_error_cleanly() {
    for (type_, value) in sample_pairs() {
        let buf = encode(&type_, &value).await;
        for cut in 0..buf.len() {
            let mut cursor = Cursor::new(buf[..cut].to_vec());
            assert!(
                type_.read_value(&mut cursor).await.is_err(),
                "{type_} decoded from {cut}/{} bytes",
                buf.len()
            );
        }
    }
}

#[tokio::test]
async fn truncated_headers_error_cleanly() {
    let type_ = Type::named_tuple([("id", Type::UInt64), ("name", Type::low_cardinality(Type::String))]);
    let bytes = type_.binary();
    for cut in 0..bytes.len() {
        assert!(decode_header(&bytes[..cut]).await.is_err(), "header decoded from {cut} bytes");
    }
}

#[test]
fn structural_equality_ignores_hints() {
    let plain = Type::dynamic();
    let hinted = Type::dynamic_with(32, vec![Arc::new(Type::String)]);
    assert_eq!(plain, hinted);

    let a = Type::custom("Point", Type::Nothing);
    let b = Type::custom("Point", Type::tuple([Type::Float64, Type::Float64]));
    assert_eq!(a, b);
    assert_ne!(a, Type::custom("Ring", Type::Nothing));
}

#[test]
fn enum_canonical_encoding_is_order_independent() {
    let a = Type::enum8([("b", 2i8), ("a", 1), ("neg", -10)]);
    let b = Type::enum8([("neg", -10i8), ("a", 1), ("b", 2)]);
    assert_eq!(a.binary(), b.binary());
}
