//! Value decoding: `Type::read_value`.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono_tz::UTC;
use futures_util::future::BoxFuture;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use super::Type;
use super::binary::decode_binary;
use crate::constants::{MAX_PREALLOC_LEN, MAX_STRING_SIZE};
use crate::io::RowBinaryRead;
use crate::values::{Date, Date32, DateTime, DateTime64, Value};
use crate::{Error, Result};

impl Type {
    /// Decodes one value of this type from `reader`.
    ///
    /// Lengths and discriminants coming off the wire are untrusted:
    /// collection counts cap preallocation, nullable discriminants and
    /// variant indexes are bounds-checked.
    #[expect(clippy::too_many_lines)]
    pub fn read_value<'a, R: RowBinaryRead>(
        &'a self,
        reader: &'a mut R,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            match self {
                Self::Nothing => Ok(Value::Null),
                Self::Bool => Ok(Value::Bool(reader.read_u8().await? != 0)),
                Self::UInt8 => Ok(Value::UInt8(reader.read_u8().await?)),
                Self::UInt16 => Ok(Value::UInt16(reader.read_u16_le().await?)),
                Self::UInt32 => Ok(Value::UInt32(reader.read_u32_le().await?)),
                Self::UInt64 => Ok(Value::UInt64(reader.read_u64_le().await?)),
                Self::Int8 => Ok(Value::Int8(reader.read_i8().await?)),
                Self::Int16 => Ok(Value::Int16(reader.read_i16_le().await?)),
                Self::Int32 => Ok(Value::Int32(reader.read_i32_le().await?)),
                Self::Int64 => Ok(Value::Int64(reader.read_i64_le().await?)),
                Self::Float32 => Ok(Value::Float32(reader.read_f32_le().await?)),
                Self::Float64 => Ok(Value::Float64(reader.read_f64_le().await?)),
                Self::String => Ok(Value::String(reader.read_string().await?.into())),
                Self::FixedString(n) => {
                    if *n > MAX_STRING_SIZE {
                        return Err(Error::InvalidValue(format!(
                            "FixedString width too large: {n} > {MAX_STRING_SIZE}"
                        )));
                    }
                    let mut buf = vec![0u8; *n];
                    let _ = reader.read_exact(&mut buf).await?;
                    Ok(Value::String(buf.into()))
                }
                Self::Uuid => {
                    let upper = reader.read_u64_le().await?;
                    let lower = reader.read_u64_le().await?;
                    Ok(Value::Uuid(Uuid::from_u64_pair(upper, lower)))
                }
                Self::Ipv4 => Ok(Value::Ipv4(Ipv4Addr::from(reader.read_u32_le().await?))),
                Self::Ipv6 => {
                    let mut octets = [0u8; 16];
                    let _ = reader.read_exact(&mut octets).await?;
                    Ok(Value::Ipv6(Ipv6Addr::from(octets)))
                }
                Self::Date => Ok(Value::Date(Date(reader.read_u16_le().await?))),
                Self::Date32 => Ok(Value::Date32(Date32(reader.read_i32_le().await?))),
                Self::DateTime => {
                    Ok(Value::DateTime(DateTime(UTC, reader.read_u32_le().await?)))
                }
                Self::DateTimeTz(tz) => {
                    Ok(Value::DateTime(DateTime(*tz, reader.read_u32_le().await?)))
                }
                Self::DateTime64(precision) => Ok(Value::DateTime64(DateTime64(
                    UTC,
                    reader.read_i64_le().await?,
                    *precision,
                ))),
                Self::DateTime64Tz(precision, tz) => Ok(Value::DateTime64(DateTime64(
                    *tz,
                    reader.read_i64_le().await?,
                    *precision,
                ))),
                Self::Decimal { precision, scale } if *precision <= 9 => {
                    Ok(Value::Decimal32(*scale, reader.read_i32_le().await?))
                }
                Self::Decimal { precision, scale } if *precision <= 18 => {
                    Ok(Value::Decimal64(*scale, reader.read_i64_le().await?))
                }
                Self::Decimal { precision, .. } => Err(Error::Unsupported(format!(
                    "Decimal({precision}, _) values are not supported"
                ))),
                Self::Enum8(entries) => {
                    let code = reader.read_i8().await?;
                    let name = entries
                        .iter()
                        .find(|(_, c)| *c == code)
                        .map(|(name, _)| name.clone())
                        .ok_or_else(|| {
                            Error::InvalidValue(format!("invalid enum code: {code}"))
                        })?;
                    Ok(Value::Enum(name))
                }
                Self::Enum16(entries) => {
                    let code = reader.read_i16_le().await?;
                    let name = entries
                        .iter()
                        .find(|(_, c)| *c == code)
                        .map(|(name, _)| name.clone())
                        .ok_or_else(|| {
                            Error::InvalidValue(format!("invalid enum code: {code}"))
                        })?;
                    Ok(Value::Enum(name))
                }
                Self::Array(inner) => {
                    #[expect(clippy::cast_possible_truncation)]
                    let count = reader.read_var_uint().await? as usize;
                    let mut items = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
                    for _ in 0..count {
                        items.push(inner.read_value(reader).await?);
                    }
                    Ok(Value::Array(items))
                }
                Self::Tuple(types) => {
                    let mut items = Vec::with_capacity(types.len());
                    for type_ in types {
                        items.push(type_.read_value(reader).await?);
                    }
                    Ok(Value::Tuple(items))
                }
                Self::NamedTuple(types) => {
                    let mut items = Vec::with_capacity(types.len());
                    for (_, type_) in types {
                        items.push(type_.read_value(reader).await?);
                    }
                    Ok(Value::Tuple(items))
                }
                Self::Map(key, value) => {
                    #[expect(clippy::cast_possible_truncation)]
                    let count = reader.read_var_uint().await? as usize;
                    let mut pairs = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
                    for _ in 0..count {
                        let k = key.read_value(reader).await?;
                        let v = value.read_value(reader).await?;
                        pairs.push((k, v));
                    }
                    Ok(Value::Map(pairs))
                }
                Self::Nullable(inner) => match reader.read_u8().await? {
                    0 => inner.read_value(reader).await,
                    1 => Ok(Value::Null),
                    other => Err(Error::Protocol(format!(
                        "invalid nullable discriminant: 0x{other:02x}"
                    ))),
                },
                Self::LowCardinality(inner) => inner.read_value(reader).await,
                Self::Variant(types) => {
                    #[expect(clippy::cast_possible_truncation)]
                    let index = reader.read_var_uint().await? as usize;
                    let Some(type_) = types.get(index) else {
                        return Err(Error::Protocol(format!(
                            "variant index {index} out of range for {self}"
                        )));
                    };
                    let inner = type_.read_value(reader).await?;
                    Ok(Value::Typed(Arc::clone(type_), Box::new(inner)))
                }
                Self::Dynamic { known, .. } => {
                    let embedded = decode_binary(reader).await?;
                    embedded.validate()?;
                    // Prefer a caller-provided descriptor so downstream
                    // matching can rely on pointer identity.
                    let type_ = known
                        .iter()
                        .find(|candidate| ***candidate == embedded)
                        .map_or_else(|| Arc::new(embedded), Arc::clone);
                    let inner = type_.read_value(reader).await?;
                    Ok(Value::Typed(type_, Box::new(inner)))
                }
                Self::Custom(_, base) => base.read_value(reader).await,
            }
        })
    }
}
