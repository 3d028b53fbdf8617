//! NDR error types

use thiserror::Error;

/// Largest element count accepted from a decoded conformance or variance.
pub const MAX_NDR_ARRAY_ELEMENTS: usize = 1 << 20;

/// Largest number of bytes a single decoded array or string may claim.
pub const MAX_NDR_ALLOCATION_SIZE: usize = 16 * 1024 * 1024;

/// NDR encoding/decoding errors
#[derive(Debug, Error)]
pub enum NdrError {
    /// Not enough data left in the stub
    #[error("buffer underflow: needed {needed} bytes, have {have}")]
    BufferUnderflow { needed: usize, have: usize },

    /// Invalid string - missing terminator, bad offset or bad counts
    #[error("invalid string: {0}")]
    InvalidString(String),

    /// Referent ID that is not valid where it appears
    #[error("invalid pointer: referent ID {0:#010x}")]
    InvalidPointer(u32),

    /// Element count disagrees with the conformance on the wire
    #[error("array size mismatch: expected {expected}, got {got}")]
    ArraySizeMismatch { expected: usize, got: usize },

    /// Union switch value with no arm
    #[error("invalid union discriminant: {0}")]
    InvalidDiscriminant(u32),

    /// Enumeration value with no variant
    #[error("invalid enum value: {0}")]
    InvalidEnumValue(u32),

    /// Variance that does not fit the conformance
    #[error("conformance mismatch: max_count={max_count}, offset={offset}, actual_count={actual_count}")]
    ConformanceMismatch {
        max_count: u32,
        offset: u32,
        actual_count: u32,
    },

    /// Decoded size above the configured limits
    #[error("allocation limit exceeded: {requested} requested, limit {limit}")]
    AllocationLimitExceeded { requested: usize, limit: usize },

    /// Length that cannot be represented in a 32-bit count
    #[error("integer overflow: {0}")]
    IntegerOverflow(usize),

    /// UTF-8 decoding error
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// UTF-16 decoding error
    #[error("UTF-16 error: {0}")]
    Utf16Error(#[from] std::char::DecodeUtf16Error),
}

/// Result type for NDR operations
pub type Result<T> = std::result::Result<T, NdrError>;

/// Reject a decoded element count before anything is allocated for it.
pub(crate) fn check_array_limit(count: usize, element_size: usize) -> Result<()> {
    if count > MAX_NDR_ARRAY_ELEMENTS {
        return Err(NdrError::AllocationLimitExceeded {
            requested: count,
            limit: MAX_NDR_ARRAY_ELEMENTS,
        });
    }
    let bytes = count.saturating_mul(element_size.max(1));
    if bytes > MAX_NDR_ALLOCATION_SIZE {
        return Err(NdrError::AllocationLimitExceeded {
            requested: bytes,
            limit: MAX_NDR_ALLOCATION_SIZE,
        });
    }
    Ok(())
}
