//! Streaming row egest.

use std::sync::Arc;

use tracing::{debug, error};

use super::{FormatOptions, RowFormat, TypeHeaderMode};
use crate::io::RowBinaryWrite;
use crate::types::Type;
use crate::values::Value;
use crate::{Error, Result};

/// Writes a stream of rows in one of the `RowBinary` formats.
///
/// The header is written lazily before the first value, or eagerly via
/// [`write_header`](Self::write_header). Like [`FormatReader`](super::FormatReader),
/// a failed session is terminal and replays its first error.
pub struct FormatWriter<W> {
    writer: W,
    options: FormatOptions,
    index: usize,
    first_err: Option<Error>,
    initialized: bool,
}

impl<W: RowBinaryWrite> FormatWriter<W> {
    pub fn new(writer: W, options: FormatOptions) -> Self {
        Self { writer, options, index: 0, first_err: None, initialized: false }
    }

    /// The first error this session hit, if any.
    pub fn err(&self) -> Option<&Error> { self.first_err.as_ref() }

    pub fn into_inner(self) -> W { self.writer }

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
        if self.options.columns.is_empty() {
            let err = Error::Protocol("cannot write a row stream with no columns".into());
            return Err(self.fail(err));
        }
        match write_header(&mut self.writer, &self.options).await {
            Ok(()) => {
                debug!(
                    columns = self.options.columns.len(),
                    format = %self.options.format,
                    "wrote row stream header"
                );
                self.initialized = true;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Writes the header immediately instead of waiting for the first
    /// value. Idempotent.
    pub async fn write_header(&mut self) -> Result<()> { self.ensure_init().await }

    /// Writes the current column's value and advances the cursor.
    ///
    /// `type_` must match the declared column type; a mismatch names both
    /// types, writes nothing, and poisons the session.
    pub async fn write_value(&mut self, type_: &Type, value: &Value) -> Result<()> {
        self.ensure_init().await?;
        let column = &self.options.columns[self.index];
        if !self.options.types_match(&column.type_, type_) {
            let err = Error::TypeMismatch {
                expected: column.type_.to_string(),
                actual: type_.to_string(),
            };
            return Err(self.fail(err));
        }
        let column_type = Arc::clone(&column.type_);
        match column_type.write_value(&mut self.writer, value).await {
            Ok(()) => {
                self.advance();
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Writes one value per column, in declared order, without per-value
    /// type assertions.
    pub async fn write_row(&mut self, values: &[Value]) -> Result<()> {
        self.ensure_init().await?;
        if values.len() != self.options.columns.len() {
            let err = Error::InvalidValue(format!(
                "row has {} values, stream has {} columns",
                values.len(),
                self.options.columns.len()
            ));
            return Err(self.fail(err));
        }
        for value in values {
            let column_type = Arc::clone(&self.options.columns[self.index].type_);
            match column_type.write_value(&mut self.writer, value).await {
                Ok(()) => self.advance(),
                Err(err) => return Err(self.fail(err)),
            }
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        if let Some(err) = &self.first_err {
            return Err(err.clone());
        }
        match tokio::io::AsyncWriteExt::flush(&mut self.writer).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn advance(&mut self) { self.index = (self.index + 1) % self.options.columns.len(); }
}

async fn write_header<W: RowBinaryWrite>(writer: &mut W, options: &FormatOptions) -> Result<()> {
    match options.format {
        RowFormat::RowBinary => Ok(()),
        RowFormat::RowBinaryWithNames => {
            writer.write_var_uint(options.columns.len() as u64).await?;
            for column in &options.columns {
                writer.write_string(column.name.as_str()).await?;
            }
            Ok(())
        }
        RowFormat::RowBinaryWithNamesAndTypes => {
            writer.write_var_uint(options.columns.len() as u64).await?;
            for column in &options.columns {
                writer.write_string(column.name.as_str()).await?;
            }
            for column in &options.columns {
                match options.type_headers {
                    TypeHeaderMode::Text => {
                        writer.write_string(column.type_.to_string()).await?;
                    }
                    TypeHeaderMode::Binary => {
                        tokio::io::AsyncWriteExt::write_all(writer, &column.type_.binary())
                            .await?;
                    }
                }
            }
            Ok(())
        }
    }
}
