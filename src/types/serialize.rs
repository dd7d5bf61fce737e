//! Value encoding: `Type::write_value`.

use futures_util::future::BoxFuture;
use tokio::io::AsyncWriteExt;

use super::Type;
use crate::io::RowBinaryWrite;
use crate::values::Value;
use crate::{Error, Result};

fn mismatch(type_: &Type, value: &Value) -> Error {
    Error::InvalidValue(format!("cannot encode {value:?} as {type_}"))
}

impl Type {
    /// Encodes one value of this type onto `writer`.
    ///
    /// The future is boxed because composite types recurse through their
    /// children.
    #[expect(clippy::too_many_lines)]
    pub fn write_value<'a, W: RowBinaryWrite>(
        &'a self,
        writer: &'a mut W,
        value: &'a Value,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match (self, value) {
                (Self::Nothing, Value::Null) => Ok(()),
                (Self::Bool, Value::Bool(b)) => Ok(writer.write_u8(u8::from(*b)).await?),
                (Self::UInt8, Value::UInt8(v)) => Ok(writer.write_u8(*v).await?),
                (Self::UInt16, Value::UInt16(v)) => Ok(writer.write_u16_le(*v).await?),
                (Self::UInt32, Value::UInt32(v)) => Ok(writer.write_u32_le(*v).await?),
                (Self::UInt64, Value::UInt64(v)) => Ok(writer.write_u64_le(*v).await?),
                (Self::Int8, Value::Int8(v)) => Ok(writer.write_i8(*v).await?),
                (Self::Int16, Value::Int16(v)) => Ok(writer.write_i16_le(*v).await?),
                (Self::Int32, Value::Int32(v)) => Ok(writer.write_i32_le(*v).await?),
                (Self::Int64, Value::Int64(v)) => Ok(writer.write_i64_le(*v).await?),
                (Self::Float32, Value::Float32(v)) => Ok(writer.write_f32_le(*v).await?),
                (Self::Float64, Value::Float64(v)) => Ok(writer.write_f64_le(*v).await?),
                (Self::String, Value::String(bytes)) => writer.write_string(&bytes[..]).await,
                (Self::FixedString(n), Value::String(bytes)) => {
                    if bytes.len() != *n {
                        return Err(Error::InvalidValue(format!(
                            "FixedString({n}) requires exactly {n} bytes, got {}",
                            bytes.len()
                        )));
                    }
                    Ok(writer.write_all(bytes).await?)
                }
                (Self::Uuid, Value::Uuid(uuid)) => {
                    // Two little-endian 64-bit halves, most significant first.
                    let (upper, lower) = uuid.as_u64_pair();
                    writer.write_u64_le(upper).await?;
                    Ok(writer.write_u64_le(lower).await?)
                }
                (Self::Ipv4, Value::Ipv4(addr)) => {
                    Ok(writer.write_u32_le(u32::from(*addr)).await?)
                }
                (Self::Ipv6, Value::Ipv6(addr)) => Ok(writer.write_all(&addr.octets()).await?),
                (Self::Date, Value::Date(date)) => Ok(writer.write_u16_le(date.0).await?),
                (Self::Date32, Value::Date32(date)) => Ok(writer.write_i32_le(date.0).await?),
                (Self::DateTime | Self::DateTimeTz(_), Value::DateTime(dt)) => {
                    Ok(writer.write_u32_le(dt.1).await?)
                }
                (Self::DateTime64(precision) | Self::DateTime64Tz(precision, _), Value::DateTime64(dt)) => {
                    if dt.2 != *precision {
                        return Err(Error::InvalidValue(format!(
                            "DateTime64 value has precision {}, column has {precision}",
                            dt.2
                        )));
                    }
                    Ok(writer.write_i64_le(dt.1).await?)
                }
                (Self::Decimal { precision, scale }, value) if *precision <= 9 => {
                    let (value_scale, coefficient) = value.as_decimal32()?;
                    if value_scale != *scale {
                        return Err(Error::InvalidValue(format!(
                            "decimal value has scale {value_scale}, column has {scale}"
                        )));
                    }
                    Ok(writer.write_i32_le(coefficient).await?)
                }
                (Self::Decimal { precision, scale }, value) if *precision <= 18 => {
                    let (value_scale, coefficient) = value.as_decimal64()?;
                    if value_scale != *scale {
                        return Err(Error::InvalidValue(format!(
                            "decimal value has scale {value_scale}, column has {scale}"
                        )));
                    }
                    Ok(writer.write_i64_le(coefficient).await?)
                }
                (Self::Decimal { precision, .. }, _) => Err(Error::Unsupported(format!(
                    "Decimal({precision}, _) values are not supported"
                ))),
                (Self::Enum8(entries), Value::Enum(name)) => {
                    let code = entries
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, code)| *code)
                        .ok_or_else(|| {
                            Error::InvalidValue(format!("invalid enum value: {name:?}"))
                        })?;
                    Ok(writer.write_i8(code).await?)
                }
                (Self::Enum16(entries), Value::Enum(name)) => {
                    let code = entries
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, code)| *code)
                        .ok_or_else(|| {
                            Error::InvalidValue(format!("invalid enum value: {name:?}"))
                        })?;
                    Ok(writer.write_i16_le(code).await?)
                }
                (Self::Array(inner), Value::Array(items)) => {
                    writer.write_var_uint(items.len() as u64).await?;
                    for item in items {
                        inner.write_value(writer, item).await?;
                    }
                    Ok(())
                }
                (Self::Tuple(types), Value::Tuple(items)) => {
                    if types.len() != items.len() {
                        return Err(Error::InvalidValue(format!(
                            "tuple arity mismatch: {} types, {} values",
                            types.len(),
                            items.len()
                        )));
                    }
                    for (type_, item) in types.iter().zip(items) {
                        type_.write_value(writer, item).await?;
                    }
                    Ok(())
                }
                (Self::NamedTuple(types), Value::Tuple(items)) => {
                    if types.len() != items.len() {
                        return Err(Error::InvalidValue(format!(
                            "tuple arity mismatch: {} types, {} values",
                            types.len(),
                            items.len()
                        )));
                    }
                    for ((_, type_), item) in types.iter().zip(items) {
                        type_.write_value(writer, item).await?;
                    }
                    Ok(())
                }
                (Self::Map(key, value_type), Value::Map(pairs)) => {
                    writer.write_var_uint(pairs.len() as u64).await?;
                    for (k, v) in pairs {
                        key.write_value(writer, k).await?;
                        value_type.write_value(writer, v).await?;
                    }
                    Ok(())
                }
                (Self::Nullable(_), Value::Null) => Ok(writer.write_u8(1).await?),
                (Self::Nullable(inner), value) => {
                    writer.write_u8(0).await?;
                    inner.write_value(writer, value).await
                }
                (Self::LowCardinality(inner), value) => inner.write_value(writer, value).await,
                (Self::Variant(types), Value::Typed(type_, inner)) => {
                    let index = types.iter().position(|t| **t == **type_).ok_or_else(|| {
                        Error::InvalidValue(format!("no variant arm for type {type_} in {self}"))
                    })?;
                    writer.write_var_uint(index as u64).await?;
                    types[index].write_value(writer, inner).await
                }
                (Self::Dynamic { .. }, Value::Typed(type_, inner)) => {
                    writer.write_all(&type_.binary()).await?;
                    type_.write_value(writer, inner).await
                }
                (Self::Custom(_, base), value) => base.write_value(writer, value).await,
                (type_, value) => Err(mismatch(type_, value)),
            }
        })
    }
}
