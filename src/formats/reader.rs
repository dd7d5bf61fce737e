//! Streaming row ingest.

use std::sync::Arc;

use tracing::{debug, error};

use super::{Column, FormatOptions, RowFormat, TypeHeaderMode};
use crate::FxIndexMap;
use crate::constants::MAX_PREALLOC_LEN;
use crate::io::RowBinaryRead;
use crate::types::Type;
use crate::values::Value;
use crate::{Error, Result};

/// Reads a stream of rows in one of the `RowBinary` formats.
///
/// The header (if the format carries one) is negotiated lazily on the first
/// call. Values are read column by column through a cyclic cursor, so a
/// caller issuing one [`read_value`](Self::read_value) per column per row
/// never has to track position itself.
///
/// Sessions are terminal: once any call fails, the first error is stored
/// and every subsequent call returns a clone of it, so a loop can defer
/// error handling to a single check at the end.
pub struct FormatReader<R> {
    reader: R,
    options: FormatOptions,
    columns: Vec<Column>,
    index: usize,
    first_err: Option<Error>,
    initialized: bool,
}

impl<R: RowBinaryRead> FormatReader<R> {
    pub fn new(reader: R, options: FormatOptions) -> Self {
        Self { reader, options, columns: Vec::new(), index: 0, first_err: None, initialized: false }
    }

    /// The first error this session hit, if any.
    pub fn err(&self) -> Option<&Error> { self.first_err.as_ref() }

    pub fn into_inner(self) -> R { self.reader }

    fn fail(&mut self, err: Error) -> Error {
        if self.first_err.is_none() {
            error!(error = %err, "row stream entered terminal error state");
            self.first_err = Some(err.clone());
        }
        self.first_err.clone().unwrap_or(err)
    }

    async fn ensure_init(&mut self) -> Result<()> {
        if let Some(err) = &self.first_err {
            return Err(err.clone());
        }
        if self.initialized {
            return Ok(());
        }
        match negotiate_header(&mut self.reader, &self.options).await {
            Ok(columns) => {
                debug!(
                    columns = columns.len(),
                    format = %self.options.format,
                    "negotiated row stream header"
                );
                self.columns = columns;
                self.initialized = true;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// The negotiated columns, reading the header first if necessary.
    pub async fn columns(&mut self) -> Result<&[Column]> {
        self.ensure_init().await?;
        Ok(&self.columns)
    }

    /// Returns `true` when at least one more byte of row data is pending.
    ///
    /// An empty column set yields `false` rather than spinning forever.
    pub async fn next_row(&mut self) -> Result<bool> {
        self.ensure_init().await?;
        if self.columns.is_empty() {
            return Ok(false);
        }
        match self.reader.peek_u8().await {
            Ok(pending) => Ok(pending.is_some()),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Reads the current column's value and advances the cursor.
    ///
    /// The caller's `expected` type is checked against the negotiated
    /// column type *before* any value bytes are consumed; a mismatch names
    /// both types and poisons the session.
    pub async fn read_value(&mut self, expected: &Type) -> Result<Value> {
        self.ensure_init().await?;
        let Some(column) = self.columns.get(self.index) else {
            let err = Error::Protocol("row stream has no columns".into());
            return Err(self.fail(err));
        };
        if !self.options.types_match(&column.type_, expected) {
            let err = Error::TypeMismatch {
                expected: column.type_.to_string(),
                actual: expected.to_string(),
            };
            return Err(self.fail(err));
        }
        let type_ = Arc::clone(&column.type_);
        match type_.read_value(&mut self.reader).await {
            Ok(value) => {
                self.advance();
                Ok(value)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Reads one value per column, leaving the cursor back at column zero.
    pub async fn read_row(&mut self) -> Result<Vec<Value>> {
        self.ensure_init().await?;
        if self.columns.is_empty() {
            let err = Error::Protocol("row stream has no columns".into());
            return Err(self.fail(err));
        }
        let mut row = Vec::with_capacity(self.columns.len());
        for _ in 0..self.columns.len() {
            let type_ = Arc::clone(&self.columns[self.index].type_);
            match type_.read_value(&mut self.reader).await {
                Ok(value) => {
                    self.advance();
                    row.push(value);
                }
                Err(err) => return Err(self.fail(err)),
            }
        }
        Ok(row)
    }

    fn advance(&mut self) { self.index = (self.index + 1) % self.columns.len(); }
}

async fn negotiate_header<R: RowBinaryRead>(
    reader: &mut R,
    options: &FormatOptions,
) -> Result<Vec<Column>> {
    match options.format {
        RowFormat::RowBinary => {
            if options.columns.is_empty() {
                return Err(Error::Protocol(
                    "RowBinary carries no header; columns must be declared locally".into(),
                ));
            }
            Ok(options.columns.clone())
        }
        RowFormat::RowBinaryWithNames => read_names_header(reader, options).await,
        RowFormat::RowBinaryWithNamesAndTypes => read_names_and_types_header(reader, options).await,
    }
}

/// Names come from the stream; types must all be declared locally.
async fn read_names_header<R: RowBinaryRead>(
    reader: &mut R,
    options: &FormatOptions,
) -> Result<Vec<Column>> {
    let local: FxIndexMap<&str, &Arc<Type>> =
        options.columns.iter().map(|c| (c.name.as_str(), &c.type_)).collect();
    #[expect(clippy::cast_possible_truncation)]
    let count = reader.read_var_uint().await? as usize;
    let mut columns = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
    for _ in 0..count {
        let name = reader.read_utf8_string().await?;
        let Some(type_) = local.get(name.as_str()) else {
            return Err(Error::Protocol(format!("no declared type for column {name:?}")));
        };
        columns.push(Column { type_: Arc::clone(type_), name });
    }
    Ok(columns)
}

/// Names and types both come from the stream. Declared columns are checked
/// against the remote types and reused (preserving descriptor identity);
/// undeclared columns are accepted as-is.
async fn read_names_and_types_header<R: RowBinaryRead>(
    reader: &mut R,
    options: &FormatOptions,
) -> Result<Vec<Column>> {
    let local: FxIndexMap<&str, &Arc<Type>> =
        options.columns.iter().map(|c| (c.name.as_str(), &c.type_)).collect();
    #[expect(clippy::cast_possible_truncation)]
    let count = reader.read_var_uint().await? as usize;
    let mut names = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
    for _ in 0..count {
        names.push(reader.read_utf8_string().await?);
    }
    let mut columns = Vec::with_capacity(count.min(MAX_PREALLOC_LEN));
    for name in names {
        let remote = match options.type_headers {
            TypeHeaderMode::Text => reader.read_utf8_string().await?.parse::<Type>()?,
            TypeHeaderMode::Binary => Type::read_binary(reader).await?,
        };
        let type_ = match local.get(name.as_str()) {
            Some(declared) => {
                if !options.types_match(declared, &remote) {
                    return Err(Error::TypeMismatch {
                        expected: declared.to_string(),
                        actual: remote.to_string(),
                    });
                }
                Arc::clone(declared)
            }
            None => Arc::new(remote),
        };
        columns.push(Column { name, type_ });
    }
    Ok(columns)
}
