#![doc = include_str!("../README.md")]

pub(crate) mod constants;
mod errors;
mod formats;
mod io;
pub mod types;
pub mod values;

pub use errors::{Error, Result};
pub use formats::{Column, FormatOptions, FormatReader, FormatWriter, RowFormat, TypeHeaderMode};
pub use io::{RowBinaryRead, RowBinaryWrite};
pub use types::{Type, TypeRegistry};
pub use values::{Date, Date32, DateTime, DateTime64, Value};

/// Hasher used for in-crate maps.
pub(crate) type HashBuilder = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
/// Insertion-ordered map with fx hashing.
pub(crate) type FxIndexMap<K, V> = indexmap::IndexMap<K, V, HashBuilder>;

// Re-exported so callers don't need to pin matching versions themselves.
pub use bytes::Bytes;
pub use chrono_tz::Tz;
pub use uuid::Uuid;
