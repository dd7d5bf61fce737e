//! Row-stream formats and session configuration.

pub(crate) mod reader;
pub(crate) mod writer;

use std::sync::Arc;

pub use self::reader::FormatReader;
pub use self::writer::FormatWriter;
use crate::types::{Type, TypeRegistry};

/// The header layout a row stream carries before its first row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display)]
pub enum RowFormat {
    /// No header; both sides must agree on columns out of band.
    #[default]
    RowBinary,
    /// Column count and names.
    RowBinaryWithNames,
    /// Column count, names and types.
    RowBinaryWithNamesAndTypes,
}

/// How types are spelled inside a `RowBinaryWithNamesAndTypes` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display)]
pub enum TypeHeaderMode {
    /// Textual grammar, varint-length-prefixed (`Array(UInt32)`).
    #[default]
    Text,
    /// Self-describing binary type headers.
    Binary,
}

/// One column of a row stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub type_: Arc<Type>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_: impl Into<Arc<Type>>) -> Self {
        Self { name: name.into(), type_: type_.into() }
    }
}

/// Builder-style session configuration shared by readers and writers.
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub(crate) format: RowFormat,
    pub(crate) columns: Vec<Column>,
    pub(crate) type_headers: TypeHeaderMode,
    pub(crate) registry: Option<Arc<TypeRegistry>>,
}

impl FormatOptions {
    pub fn new(format: RowFormat) -> Self { Self { format, ..Self::default() } }

    /// Declares a local column. Order matters: it is the wire order for
    /// writers and for `RowBinary` readers.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, type_: impl Into<Arc<Type>>) -> Self {
        self.columns.push(Column::new(name, type_));
        self
    }

    #[must_use]
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    #[must_use]
    pub fn with_type_headers(mut self, mode: TypeHeaderMode) -> Self {
        self.type_headers = mode;
        self
    }

    /// Shares an interning table so column type checks compare `u64` ids
    /// instead of re-encoding descriptors.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub(crate) fn types_match(&self, a: &Type, b: &Type) -> bool {
        match &self.registry {
            Some(registry) => registry.id_of(a) == registry.id_of(b),
            None => a == b,
        }
    }
}
