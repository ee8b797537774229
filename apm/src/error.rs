//! Format error types.

/// Errors raised while decoding an on-disk record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Input is shorter than the fixed record size
    #[error("record truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Signature field does not carry the record's magic
    #[error("invalid {record} magic number: expected {expected:#06x}, found {found:#06x}")]
    BadSignature {
        record: &'static str,
        expected: u16,
        found: u16,
    },

    /// Driver map claims more descriptors than the table can hold
    #[error("driver map lists {0} descriptors, at most 61 fit in block 0")]
    TooManyDescriptors(u16),
}

/// Result alias for record decoding.
pub type Result<T> = core::result::Result<T, FormatError>;
