//! The self-describing binary type header.
//!
//! Every descriptor has exactly one canonical encoding: a one-byte tag
//! followed by tag-specific parameters. Structural equality and registry
//! interning are both defined over these bytes, so encode and decode must
//! stay in lockstep.

use bytes::{BufMut, Bytes, BytesMut};
use chrono_tz::Tz;
use futures_util::future::BoxFuture;
use tokio::io::AsyncReadExt;

use super::Type;
use crate::constants::{MAX_PREALLOC_LEN, MAX_STRING_SIZE};
use crate::io::{RowBinaryBytesWrite, RowBinaryRead};
use crate::{Error, Result};

pub(crate) mod tag {
    pub(crate) const NOTHING: u8 = 0x00;
    pub(crate) const UINT8: u8 = 0x01;
    pub(crate) const UINT16: u8 = 0x02;
    pub(crate) const UINT32: u8 = 0x03;
    pub(crate) const UINT64: u8 = 0x04;
    pub(crate) const UINT128: u8 = 0x05;
    pub(crate) const UINT256: u8 = 0x06;
    pub(crate) const INT8: u8 = 0x07;
    pub(crate) const INT16: u8 = 0x08;
    pub(crate) const INT32: u8 = 0x09;
    pub(crate) const INT64: u8 = 0x0A;
    pub(crate) const INT128: u8 = 0x0B;
    pub(crate) const INT256: u8 = 0x0C;
    pub(crate) const FLOAT32: u8 = 0x0D;
    pub(crate) const FLOAT64: u8 = 0x0E;
    pub(crate) const DATE: u8 = 0x0F;
    pub(crate) const DATE32: u8 = 0x10;
    pub(crate) const DATETIME: u8 = 0x11;
    pub(crate) const DATETIME_TZ: u8 = 0x12;
    pub(crate) const DATETIME64: u8 = 0x13;
    pub(crate) const DATETIME64_TZ: u8 = 0x14;
    pub(crate) const STRING: u8 = 0x15;
    pub(crate) const FIXED_STRING: u8 = 0x16;
    pub(crate) const ENUM8: u8 = 0x17;
    pub(crate) const ENUM16: u8 = 0x18;
    pub(crate) const DECIMAL32: u8 = 0x19;
    pub(crate) const DECIMAL64: u8 = 0x1A;
    pub(crate) const DECIMAL128: u8 = 0x1B;
    pub(crate) const DECIMAL256: u8 = 0x1C;
    pub(crate) const UUID: u8 = 0x1D;
    pub(crate) const ARRAY: u8 = 0x1E;
    pub(crate) const TUPLE: u8 = 0x1F;
    pub(crate) const NAMED_TUPLE: u8 = 0x20;
    pub(crate) const SET: u8 = 0x21;
    pub(crate) const INTERVAL: u8 = 0x22;
    pub(crate) const NULLABLE: u8 = 0x23;
    pub(crate) const FUNCTION: u8 = 0x24;
    pub(crate) const AGGREGATE_FUNCTION: u8 = 0x25;
    pub(crate) const LOW_CARDINALITY: u8 = 0x26;
    pub(crate) const MAP: u8 = 0x27;
    pub(crate) const IPV4: u8 = 0x28;
    pub(crate) const IPV6: u8 = 0x29;
    pub(crate) const VARIANT: u8 = 0x2A;
    pub(crate) const DYNAMIC: u8 = 0x2B;
    pub(crate) const CUSTOM: u8 = 0x2C;
    pub(crate) const BOOL: u8 = 0x2D;
    pub(crate) const SIMPLE_AGGREGATE_FUNCTION: u8 = 0x2E;
    pub(crate) const NESTED: u8 = 0x2F;
    pub(crate) const JSON: u8 = 0x30;
    pub(crate) const BFLOAT16: u8 = 0x31;
    pub(crate) const TIME: u8 = 0x32;
    pub(crate) const TIME64: u8 = 0x34;
}

impl Type {
    /// Returns the canonical binary encoding of this descriptor.
    pub fn binary(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_binary(&mut buf);
        buf.freeze()
    }

    /// Appends the canonical binary encoding to `buf`.
    #[expect(clippy::too_many_lines)]
    pub fn encode_binary(&self, buf: &mut impl BufMut) {
        match self {
            Self::Nothing => buf.put_u8(tag::NOTHING),
            Self::Bool => buf.put_u8(tag::BOOL),
            Self::UInt8 => buf.put_u8(tag::UINT8),
            Self::UInt16 => buf.put_u8(tag::UINT16),
            Self::UInt32 => buf.put_u8(tag::UINT32),
            Self::UInt64 => buf.put_u8(tag::UINT64),
            Self::Int8 => buf.put_u8(tag::INT8),
            Self::Int16 => buf.put_u8(tag::INT16),
            Self::Int32 => buf.put_u8(tag::INT32),
            Self::Int64 => buf.put_u8(tag::INT64),
            Self::Float32 => buf.put_u8(tag::FLOAT32),
            Self::Float64 => buf.put_u8(tag::FLOAT64),
            Self::String => buf.put_u8(tag::STRING),
            Self::FixedString(n) => {
                buf.put_u8(tag::FIXED_STRING);
                buf.put_var_uint(*n as u64);
            }
            Self::Uuid => buf.put_u8(tag::UUID),
            Self::Ipv4 => buf.put_u8(tag::IPV4),
            Self::Ipv6 => buf.put_u8(tag::IPV6),
            Self::Date => buf.put_u8(tag::DATE),
            Self::Date32 => buf.put_u8(tag::DATE32),
            Self::DateTime => buf.put_u8(tag::DATETIME),
            Self::DateTimeTz(tz) => {
                buf.put_u8(tag::DATETIME_TZ);
                buf.put_string(tz.name());
            }
            Self::DateTime64(precision) => {
                buf.put_u8(tag::DATETIME64);
                buf.put_u8(*precision);
            }
            Self::DateTime64Tz(precision, tz) => {
                buf.put_u8(tag::DATETIME64_TZ);
                buf.put_u8(*precision);
                buf.put_string(tz.name());
            }
            Self::Decimal { precision, scale } => {
                buf.put_u8(decimal_tag(*precision));
                buf.put_u8(*precision);
                buf.put_u8(*scale);
            }
            Self::Enum8(entries) => {
                buf.put_u8(tag::ENUM8);
                buf.put_var_uint(entries.len() as u64);
                for (name, code) in entries {
                    buf.put_string(name);
                    buf.put_i8(*code);
                }
            }
            Self::Enum16(entries) => {
                buf.put_u8(tag::ENUM16);
                buf.put_var_uint(entries.len() as u64);
                for (name, code) in entries {
                    buf.put_string(name);
                    buf.put_i16_le(*code);
                }
            }
            Self::Array(inner) => {
                buf.put_u8(tag::ARRAY);
                inner.encode_binary(buf);
            }
            Self::Tuple(items) => {
                buf.put_u8(tag::TUPLE);
                buf.put_var_uint(items.len() as u64);
                for item in items {
                    item.encode_binary(buf);
                }
            }
            Self::NamedTuple(items) => {
                buf.put_u8(tag::NAMED_TUPLE);
                buf.put_var_uint(items.len() as u64);
                for (name, item) in items {
                    buf.put_string(name);
                    item.encode_binary(buf);
                }
            }
            Self::Map(key, value) => {
                buf.put_u8(tag::MAP);
                key.encode_binary(buf);
                value.encode_binary(buf);
            }
            Self::Nullable(inner) => {
                buf.put_u8(tag::NULLABLE);
                inner.encode_binary(buf);
            }
            Self::LowCardinality(inner) => {
                buf.put_u8(tag::LOW_CARDINALITY);
                inner.encode_binary(buf);
            }
            Self::Variant(items) => {
                buf.put_u8(tag::VARIANT);
                buf.put_var_uint(items.len() as u64);
                for item in items {
                    item.encode_binary(buf);
                }
            }
            Self::Dynamic { max_types, .. } => {
                buf.put_u8(tag::DYNAMIC);
                buf.put_u8(*max_types);
            }
            Self::Custom(name, _) => {
                buf.put_u8(tag::CUSTOM);
                buf.put_string(name);
            }
        }
    }

    /// Decodes one binary type header from `reader` and validates the
    /// result, so wire headers cannot smuggle in descriptors that
    /// [`Type::validate`] would reject.
    ///
    /// Recognised tags outside the descriptor model (interval, aggregate
    /// function states, JSON, 128/256-bit integers, ...) produce
    /// [`Error::Unsupported`]; unknown tags are a protocol error.
    pub fn read_binary<R: RowBinaryRead>(
        reader: &mut R,
    ) -> impl Future<Output = Result<Type>> + Send + '_ {
        async move {
            let type_ = decode_binary(reader).await?;
            type_.validate()?;
            Ok(type_)
        }
    }
}

const fn decimal_tag(precision: u8) -> u8 {
    match precision {
        0..=9 => tag::DECIMAL32,
        10..=18 => tag::DECIMAL64,
        19..=38 => tag::DECIMAL128,
        _ => tag::DECIMAL256,
    }
}

const fn decimal_precision_range(tag_byte: u8) -> (u8, u8) {
    match tag_byte {
        tag::DECIMAL32 => (1, 9),
        tag::DECIMAL64 => (10, 18),
        tag::DECIMAL128 => (19, 38),
        _ => (39, 76),
    }
}

fn parse_tz(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| Error::UnknownTimezone(name.to_string()))
}

#[expect(clippy::too_many_lines)]
pub(crate) fn decode_binary<R: RowBinaryRead>(reader: &mut R) -> BoxFuture<'_, Result<Type>> {
    Box::pin(async move {
        let tag_byte = reader.read_u8().await?;
        match tag_byte {
            tag::NOTHING => Ok(Type::Nothing),
            tag::BOOL => Ok(Type::Bool),
            tag::UINT8 => Ok(Type::UInt8),
            tag::UINT16 => Ok(Type::UInt16),
            tag::UINT32 => Ok(Type::UInt32),
            tag::UINT64 => Ok(Type::UInt64),
            tag::INT8 => Ok(Type::Int8),
            tag::INT16 => Ok(Type::Int16),
            tag::INT32 => Ok(Type::Int32),
            tag::INT64 => Ok(Type::Int64),
            tag::FLOAT32 => Ok(Type::Float32),
            tag::FLOAT64 => Ok(Type::Float64),
            tag::STRING => Ok(Type::String),
            tag::FIXED_STRING => {
                #[expect(clippy::cast_possible_truncation)]
                let n = reader.read_var_uint().await? as usize;
                if n > MAX_STRING_SIZE {
                    return Err(Error::Protocol(format!(
                        "FixedString width too large: {n} > {MAX_STRING_SIZE}"
                    )));
                }
                Ok(Type::FixedString(n))
            }
            tag::UUID => Ok(Type::Uuid),
            tag::IPV4 => Ok(Type::Ipv4),
            tag::IPV6 => Ok(Type::Ipv6),
            tag::DATE => Ok(Type::Date),
            tag::DATE32 => Ok(Type::Date32),
            tag::DATETIME => Ok(Type::DateTime),
            tag::DATETIME_TZ => {
                let name = reader.read_utf8_string().await?;
                Ok(Type::DateTimeTz(parse_tz(&name)?))
            }
            tag::DATETIME64 => {
                let precision = reader.read_u8().await?;
                if precision > 9 {
                    return Err(Error::Protocol(format!(
                        "DateTime64 precision out of range: {precision}"
                    )));
                }
                Ok(Type::DateTime64(precision))
            }
            tag::DATETIME64_TZ => {
                let precision = reader.read_u8().await?;
                if precision > 9 {
                    return Err(Error::Protocol(format!(
                        "DateTime64 precision out of range: {precision}"
                    )));
                }
                let name = reader.read_utf8_string().await?;
                Ok(Type::DateTime64Tz(precision, parse_tz(&name)?))
            }
            tag::DECIMAL32 | tag::DECIMAL64 | tag::DECIMAL128 | tag::DECIMAL256 => {
                let precision = reader.read_u8().await?;
                let scale = reader.read_u8().await?;
                let (min, max) = decimal_precision_range(tag_byte);
                if precision < min || precision > max {
                    return Err(Error::Protocol(format!(
                        "decimal precision {precision} does not match tag 0x{tag_byte:02x}"
                    )));
                }
                if scale > precision {
                    return Err(Error::Protocol(format!(
                        "decimal scale {scale} exceeds precision {precision}"
                    )));
                }
                Ok(Type::Decimal { precision, scale })
            }
            tag::ENUM8 => {
                #[expect(clippy::cast_possible_truncation)]
                let count = reader.read_var_uint().await? as usize;
                let mut entries = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
                for _ in 0..count {
                    let name = reader.read_utf8_string().await?;
                    let code = reader.read_i8().await?;
                    entries.push((name, code));
                }
                Ok(Type::enum8(entries))
            }
            tag::ENUM16 => {
                #[expect(clippy::cast_possible_truncation)]
                let count = reader.read_var_uint().await? as usize;
                let mut entries = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
                for _ in 0..count {
                    let name = reader.read_utf8_string().await?;
                    let code = reader.read_i16_le().await?;
                    entries.push((name, code));
                }
                Ok(Type::enum16(entries))
            }
            tag::ARRAY => Ok(Type::array(decode_binary(reader).await?)),
            tag::TUPLE => {
                #[expect(clippy::cast_possible_truncation)]
                let count = reader.read_var_uint().await? as usize;
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
                for _ in 0..count {
                    items.push(std::sync::Arc::new(decode_binary(reader).await?));
                }
                Ok(Type::Tuple(items))
            }
            tag::NAMED_TUPLE => {
                #[expect(clippy::cast_possible_truncation)]
                let count = reader.read_var_uint().await? as usize;
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
                for _ in 0..count {
                    let name = reader.read_utf8_string().await?;
                    items.push((name, std::sync::Arc::new(decode_binary(reader).await?)));
                }
                Ok(Type::NamedTuple(items))
            }
            tag::MAP => {
                let key = decode_binary(reader).await?;
                let value = decode_binary(reader).await?;
                Ok(Type::map(key, value))
            }
            tag::NULLABLE => Ok(Type::nullable(decode_binary(reader).await?)),
            tag::LOW_CARDINALITY => Ok(Type::low_cardinality(decode_binary(reader).await?)),
            tag::VARIANT => {
                #[expect(clippy::cast_possible_truncation)]
                let count = reader.read_var_uint().await? as usize;
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
                for _ in 0..count {
                    items.push(std::sync::Arc::new(decode_binary(reader).await?));
                }
                Ok(Type::Variant(items))
            }
            tag::DYNAMIC => {
                let max_types = reader.read_u8().await?;
                Ok(Type::dynamic_with(max_types, Vec::new()))
            }
            tag::CUSTOM => {
                let name = reader.read_utf8_string().await?;
                Ok(Type::custom(name, Type::Nothing))
            }
            other => match unsupported_tag_name(other) {
                Some(name) => Err(Error::Unsupported(format!("binary type tag {name}"))),
                None => Err(Error::Protocol(format!("unknown binary type tag 0x{other:02x}"))),
            },
        }
    })
}

fn unsupported_tag_name(tag_byte: u8) -> Option<&'static str> {
    Some(match tag_byte {
        tag::UINT128 => "UInt128",
        tag::UINT256 => "UInt256",
        tag::INT128 => "Int128",
        tag::INT256 => "Int256",
        tag::SET => "Set",
        tag::INTERVAL => "Interval",
        tag::FUNCTION => "Function",
        tag::AGGREGATE_FUNCTION => "AggregateFunction",
        tag::SIMPLE_AGGREGATE_FUNCTION => "SimpleAggregateFunction",
        tag::NESTED => "Nested",
        tag::JSON => "JSON",
        tag::BFLOAT16 => "BFloat16",
        tag::TIME => "Time",
        tag::TIME64 => "Time64",
        _ => return None,
    })
}
