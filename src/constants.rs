//! Wire limits shared across the codec.

/// Upper bound on a varint-prefixed string or fixed string length.
pub(crate) const MAX_STRING_SIZE: usize = 1 << 30;

/// Cap on speculative `Vec::with_capacity` for count-prefixed collections.
///
/// Counts come off the wire untrusted, so allocation grows with actual data
/// past this point instead of trusting the prefix.
pub(crate) const MAX_PREALLOC_LEN: usize = 4096;

/// Maximum encoded width of a LEB128 u64.
pub(crate) const MAX_VARINT_LEN: u64 = 10;

/// A `Dynamic` column with no explicit bound defaults to this many types.
pub(crate) const DEFAULT_DYNAMIC_MAX_TYPES: u8 = 32;
