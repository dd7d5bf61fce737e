//! Runtime type descriptors for the `RowBinary` family of formats.

pub(crate) mod binary;
mod deserialize;
mod parse;
mod registry;
mod serialize;
#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;

pub use self::registry::TypeRegistry;
use crate::constants::{DEFAULT_DYNAMIC_MAX_TYPES, MAX_STRING_SIZE};
use crate::{Error, Result};

/// A runtime descriptor for a ClickHouse data type.
///
/// Descriptors are cheap to share: composite variants hold [`Arc`]'d
/// children, and the row stream hands the same `Arc<Type>` out for every
/// value of a column.
///
/// Two descriptors are equal when their canonical binary encodings
/// ([`Type::binary`]) are byte-identical. That makes equality structural:
/// `"Array(Nullable(UInt32))".parse()` equals the descriptor built by hand,
/// while a [`Type::Dynamic`]'s known-type hints and a [`Type::Custom`]'s
/// base type do not participate.
#[derive(Debug, Clone)]
pub enum Type {
    /// The zero-byte type; also the null carrier inside `Nullable(Nothing)`.
    Nothing,
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    FixedString(usize),
    Uuid,
    Ipv4,
    Ipv6,
    Date,
    Date32,
    DateTime,
    DateTimeTz(Tz),
    DateTime64(u8),
    DateTime64Tz(u8, Tz),
    Decimal { precision: u8, scale: u8 },
    /// Name/code table, sorted by code at construction so the canonical
    /// encoding is deterministic.
    Enum8(Vec<(String, i8)>),
    Enum16(Vec<(String, i16)>),
    Array(Arc<Type>),
    Tuple(Vec<Arc<Type>>),
    NamedTuple(Vec<(String, Arc<Type>)>),
    Map(Arc<Type>, Arc<Type>),
    Nullable(Arc<Type>),
    /// Dictionary encoding hint; values pass through the inner codec
    /// untouched in row formats.
    LowCardinality(Arc<Type>),
    Variant(Vec<Arc<Type>>),
    Dynamic {
        max_types: u8,
        /// Descriptors to substitute for structurally-equal embedded types
        /// on decode, preserving pointer identity. Not part of equality.
        known: Vec<Arc<Type>>,
    },
    /// A named type treated as its base type on the wire. The name alone
    /// is the identity; the base type is a local decoding decision.
    Custom(String, Arc<Type>),
}

impl Type {
    pub fn array(inner: impl Into<Arc<Type>>) -> Self { Self::Array(inner.into()) }

    pub fn nullable(inner: impl Into<Arc<Type>>) -> Self { Self::Nullable(inner.into()) }

    pub fn low_cardinality(inner: impl Into<Arc<Type>>) -> Self {
        Self::LowCardinality(inner.into())
    }

    pub fn map(key: impl Into<Arc<Type>>, value: impl Into<Arc<Type>>) -> Self {
        Self::Map(key.into(), value.into())
    }

    pub fn tuple(items: impl IntoIterator<Item = Type>) -> Self {
        Self::Tuple(items.into_iter().map(Arc::new).collect())
    }

    pub fn named_tuple<N: Into<String>>(
        items: impl IntoIterator<Item = (N, Type)>,
    ) -> Self {
        Self::NamedTuple(items.into_iter().map(|(n, t)| (n.into(), Arc::new(t))).collect())
    }

    pub fn variant(items: impl IntoIterator<Item = Type>) -> Self {
        Self::Variant(items.into_iter().map(Arc::new).collect())
    }

    /// A `Dynamic` with the default type bound and no known-type hints.
    pub fn dynamic() -> Self {
        Self::Dynamic { max_types: DEFAULT_DYNAMIC_MAX_TYPES, known: Vec::new() }
    }

    /// A `Dynamic` with an explicit bound (0 means the default) and
    /// descriptors to reuse for matching embedded types on decode.
    pub fn dynamic_with(max_types: u8, known: Vec<Arc<Type>>) -> Self {
        let max_types =
            if max_types == 0 { DEFAULT_DYNAMIC_MAX_TYPES } else { max_types };
        Self::Dynamic { max_types, known }
    }

    /// Builds an `Enum8`, sorting the table by code.
    pub fn enum8<N: Into<String>>(
        entries: impl IntoIterator<Item = (N, i8)>,
    ) -> Self {
        let mut entries: Vec<_> = entries.into_iter().map(|(n, c)| (n.into(), c)).collect();
        entries.sort_by_key(|(_, code)| *code);
        Self::Enum8(entries)
    }

    /// Builds an `Enum16`, sorting the table by code.
    pub fn enum16<N: Into<String>>(
        entries: impl IntoIterator<Item = (N, i16)>,
    ) -> Self {
        let mut entries: Vec<_> = entries.into_iter().map(|(n, c)| (n.into(), c)).collect();
        entries.sort_by_key(|(_, code)| *code);
        Self::Enum16(entries)
    }

    pub fn decimal(precision: u8, scale: u8) -> Self { Self::Decimal { precision, scale } }

    pub fn custom(name: impl Into<String>, base: impl Into<Arc<Type>>) -> Self {
        Self::Custom(name.into(), base.into())
    }

    /// Checks the descriptor's parameters, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for impossible parameters: Decimal
    /// precision outside 1..=76 or scale above precision, `DateTime64`
    /// precision above 9, zero-width or over-wide `FixedString`, empty or
    /// duplicate-coded enum tables, empty `Variant`, `Nullable(Nullable)`.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::FixedString(0) => {
                Err(Error::InvalidValue("FixedString requires a non-zero width".into()))
            }
            Self::FixedString(n) if *n > MAX_STRING_SIZE => {
                Err(Error::InvalidValue(format!(
                    "FixedString width too large: {n} > {MAX_STRING_SIZE}"
                )))
            }
            Self::DateTime64(precision) | Self::DateTime64Tz(precision, _) if *precision > 9 => {
                Err(Error::InvalidValue(format!("DateTime64 precision out of range: {precision}")))
            }
            Self::Decimal { precision, scale } => {
                if *precision == 0 || *precision > 76 {
                    return Err(Error::InvalidValue(format!(
                        "Decimal precision out of range: {precision}"
                    )));
                }
                if scale > precision {
                    return Err(Error::InvalidValue(format!(
                        "Decimal scale {scale} exceeds precision {precision}"
                    )));
                }
                Ok(())
            }
            Self::Enum8(entries) => {
                validate_enum_codes(entries.iter().map(|(_, c)| i16::from(*c)))
            }
            Self::Enum16(entries) => validate_enum_codes(entries.iter().map(|(_, c)| *c)),
            Self::Nullable(inner) => {
                if matches!(**inner, Self::Nullable(_)) {
                    return Err(Error::InvalidValue("Nullable cannot nest Nullable".into()));
                }
                inner.validate()
            }
            Self::Array(inner) | Self::LowCardinality(inner) => inner.validate(),
            Self::Map(key, value) => {
                key.validate()?;
                value.validate()
            }
            Self::Tuple(items) => items.iter().try_for_each(|t| t.validate()),
            Self::NamedTuple(items) => items.iter().try_for_each(|(_, t)| t.validate()),
            Self::Variant(items) => {
                if items.is_empty() {
                    return Err(Error::InvalidValue("Variant requires at least one type".into()));
                }
                items.iter().try_for_each(|t| t.validate())
            }
            Self::Dynamic { known, .. } => known.iter().try_for_each(|t| t.validate()),
            Self::Custom(_, base) => base.validate(),
            _ => Ok(()),
        }
    }
}

fn validate_enum_codes(codes: impl Iterator<Item = i16>) -> Result<()> {
    let mut seen: Vec<i16> = codes.collect();
    if seen.is_empty() {
        return Err(Error::InvalidValue("enum requires at least one member".into()));
    }
    let len = seen.len();
    seen.sort_unstable();
    seen.dedup();
    if seen.len() != len {
        return Err(Error::InvalidValue("enum has duplicate codes".into()));
    }
    Ok(())
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool { self.binary() == other.binary() }
}

impl Eq for Type {}

impl std::hash::Hash for Type {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { state.write(&self.binary()); }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "Nothing"),
            Self::Bool => write!(f, "Bool"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::String => write!(f, "String"),
            Self::FixedString(n) => write!(f, "FixedString({n})"),
            Self::Uuid => write!(f, "UUID"),
            Self::Ipv4 => write!(f, "IPv4"),
            Self::Ipv6 => write!(f, "IPv6"),
            Self::Date => write!(f, "Date"),
            Self::Date32 => write!(f, "Date32"),
            Self::DateTime => write!(f, "DateTime"),
            Self::DateTimeTz(tz) => write!(f, "DateTime({})", parse::quote(tz.name())),
            Self::DateTime64(precision) => write!(f, "DateTime64({precision})"),
            Self::DateTime64Tz(precision, tz) => {
                write!(f, "DateTime64({precision}, {})", parse::quote(tz.name()))
            }
            Self::Decimal { precision, scale } => write!(f, "Decimal({precision}, {scale})"),
            Self::Enum8(entries) => {
                write!(f, "Enum8(")?;
                for (i, (name, code)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {code}", parse::quote(name))?;
                }
                write!(f, ")")
            }
            Self::Enum16(entries) => {
                write!(f, "Enum16(")?;
                for (i, (name, code)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {code}", parse::quote(name))?;
                }
                write!(f, ")")
            }
            Self::Array(inner) => write!(f, "Array({inner})"),
            Self::Tuple(items) => {
                write!(f, "Tuple(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::NamedTuple(items) => {
                write!(f, "Tuple(")?;
                for (i, (name, item)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} {item}")?;
                }
                write!(f, ")")
            }
            Self::Map(key, value) => write!(f, "Map({key}, {value})"),
            Self::Nullable(inner) => write!(f, "Nullable({inner})"),
            Self::LowCardinality(inner) => write!(f, "LowCardinality({inner})"),
            Self::Variant(items) => {
                write!(f, "Variant(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Dynamic { max_types, .. } => {
                if *max_types == DEFAULT_DYNAMIC_MAX_TYPES {
                    write!(f, "Dynamic")
                } else {
                    write!(f, "Dynamic(max_types={max_types})")
                }
            }
            Self::Custom(name, _) => write!(f, "{name}"),
        }
    }
}
