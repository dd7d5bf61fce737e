//! Runtime values carried by the row stream.

pub(crate) mod date;

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

pub use self::date::{Date, Date32, DateTime, DateTime64};
use crate::types::Type;
use crate::{Error, Result};

/// A single runtime value, tagged with its payload shape.
///
/// Equality is structural, with one wrinkle: floats compare bitwise, so a
/// `NaN` read back from the wire equals the `NaN` that was written.
#[derive(Debug, Clone)]
pub enum Value {
    /// Carrier for `Nothing` and the null arm of `Nullable`.
    Null,
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// `String` and `FixedString` payloads; arbitrary bytes, not
    /// necessarily UTF-8.
    String(Bytes),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Date(Date),
    Date32(Date32),
    DateTime(DateTime),
    DateTime64(DateTime64),
    /// Scaled coefficient for `Decimal` with precision <= 9; first field
    /// is the scale.
    Decimal32(u8, i32),
    /// Scaled coefficient for `Decimal` with precision 10..=18.
    Decimal64(u8, i64),
    /// Enum member by name; the code comes from the column type's table.
    Enum(String),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    /// Ordered key/value pairs; encoding order is pair order.
    Map(Vec<(Value, Value)>),
    /// A value paired with its concrete type, produced and consumed by
    /// `Variant` and `Dynamic` columns.
    Typed(Arc<Type>, Box<Value>),
}

impl Value {
    /// Convenience constructor for [`Value::String`].
    pub fn string(value: impl AsRef<[u8]>) -> Self {
        Self::String(Bytes::copy_from_slice(value.as_ref()))
    }

    /// Convenience constructor for [`Value::Typed`].
    pub fn typed(type_: impl Into<Arc<Type>>, value: Value) -> Self {
        Self::Typed(type_.into(), Box::new(value))
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        Error::UnexpectedValue { expected, actual: format!("{self:?}") }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::String(bytes) => {
                std::str::from_utf8(bytes).map_err(|e| Error::Protocol(format!("invalid utf-8: {e}")))
            }
            other => Err(other.unexpected("String")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Self::String(bytes) => Ok(bytes),
            other => Err(other.unexpected("String")),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Self::Array(items) => Ok(items),
            other => Err(other.unexpected("Array")),
        }
    }

    pub fn as_tuple(&self) -> Result<&[Value]> {
        match self {
            Self::Tuple(items) => Ok(items),
            other => Err(other.unexpected("Tuple")),
        }
    }

    pub fn as_map(&self) -> Result<&[(Value, Value)]> {
        match self {
            Self::Map(pairs) => Ok(pairs),
            other => Err(other.unexpected("Map")),
        }
    }

    pub fn as_enum(&self) -> Result<&str> {
        match self {
            Self::Enum(name) => Ok(name),
            other => Err(other.unexpected("Enum")),
        }
    }

    /// Unwraps a [`Value::Typed`] into its concrete type and inner value.
    pub fn as_typed(&self) -> Result<(&Arc<Type>, &Value)> {
        match self {
            Self::Typed(type_, value) => Ok((type_, value)),
            other => Err(other.unexpected("Typed")),
        }
    }

    pub fn as_decimal32(&self) -> Result<(u8, i32)> {
        match self {
            Self::Decimal32(scale, coefficient) => Ok((*scale, *coefficient)),
            other => Err(other.unexpected("Decimal32")),
        }
    }

    pub fn as_decimal64(&self) -> Result<(u8, i64)> {
        match self {
            Self::Decimal64(scale, coefficient) => Ok((*scale, *coefficient)),
            other => Err(other.unexpected("Decimal64")),
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Self::Null) }
}

/// Generates the scalar narrowing accessors (`as_u8`, `as_f64`, ...).
macro_rules! value_accessors {
    ($($name:ident: $variant:ident => $ty:ty),* $(,)?) => {
        impl Value {
            paste::paste! {
                $(
                    pub fn [<as_ $name>](&self) -> Result<$ty> {
                        match self {
                            Self::$variant(v) => Ok(*v),
                            other => Err(other.unexpected(stringify!($variant))),
                        }
                    }
                )*
            }
        }
    };
}

value_accessors! {
    bool: Bool => bool,
    u8: UInt8 => u8,
    u16: UInt16 => u16,
    u32: UInt32 => u32,
    u64: UInt64 => u64,
    i8: Int8 => i8,
    i16: Int16 => i16,
    i32: Int32 => i32,
    i64: Int64 => i64,
    f32: Float32 => f32,
    f64: Float64 => f64,
    uuid: Uuid => Uuid,
    ipv4: Ipv4 => Ipv4Addr,
    ipv6: Ipv6 => Ipv6Addr,
    date: Date => Date,
    date32: Date32 => Date32,
    datetime: DateTime => DateTime,
    datetime64: DateTime64 => DateTime64,
}

/// Generates `From<T> for Value` for the scalar payloads.
macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self { Self::$variant(value) }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Uuid => Uuid,
    Ipv4Addr => Ipv4,
    Ipv6Addr => Ipv6,
    Date => Date,
    Date32 => Date32,
    DateTime => DateTime,
    DateTime64 => DateTime64,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self { Self::string(value) }
}

impl From<String> for Value {
    fn from(value: String) -> Self { Self::String(Bytes::from(value)) }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::UInt8(a), Self::UInt8(b)) => a == b,
            (Self::UInt16(a), Self::UInt16(b)) => a == b,
            (Self::UInt32(a), Self::UInt32(b)) => a == b,
            (Self::UInt64(a), Self::UInt64(b)) => a == b,
            (Self::Int8(a), Self::Int8(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => a.to_bits() == b.to_bits(),
            (Self::Float64(a), Self::Float64(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Ipv4(a), Self::Ipv4(b)) => a == b,
            (Self::Ipv6(a), Self::Ipv6(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Date32(a), Self::Date32(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::DateTime64(a), Self::DateTime64(b)) => a == b,
            (Self::Decimal32(s1, c1), Self::Decimal32(s2, c2)) => s1 == s2 && c1 == c2,
            (Self::Decimal64(s1, c1), Self::Decimal64(s2, c2)) => s1 == s2 && c1 == c2,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Typed(t1, v1), Self::Typed(t2, v2)) => t1 == t2 && v1 == v2,
            _ => false,
        }
    }
}

impl Eq for Value {}
