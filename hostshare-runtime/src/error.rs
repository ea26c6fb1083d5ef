use hostshare_common::map::FieldName;
use hostshare_layout::error::SchemaError;
use thiserror::Error;

/// Error type for encoding and decoding values.
///
/// All variants are programmer errors: a malformed schema, or a value that does not
/// match its schema.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("schema error")]
    Schema(#[from] SchemaError),
    /// Booleans and pointers have no host-shareable representation.
    #[error("`{0}` is not host-shareable")]
    NotHostShareable(String),
    /// The codec has no encoding for this leaf.
    #[error("`{0}` has no binary encoding")]
    UnsupportedPrimitive(String),
    /// A value had a different shape than its schema.
    #[error("expected a value for `{expected}`, found {found}")]
    ValueMismatch { expected: String, found: String },
    #[error("missing value for field `{field}` of `{schema}`")]
    MissingField { schema: String, field: FieldName },
    /// A vector, matrix or array value had the wrong number of elements.
    #[error("`{schema}` expects {expected} elements, found {found}")]
    LengthMismatch {
        schema: String,
        expected: usize,
        found: usize,
    },
    /// A read ran past the end of the buffer.
    #[error("reading {len} bytes at offset {offset} overruns a buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
    /// A bulk copy was requested for a layout that contains padding, or whose size differs
    /// from the host type.
    #[error("`{0}` cannot be copied as one contiguous block")]
    NotContiguous(String),
}

/// Internal error raised when a compiled writer cannot be built for a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompileError {
    #[cfg(not(feature = "compiled-writer"))]
    #[error("compiled writers are not available in this build")]
    CodeGenerationUnavailable,
    #[cfg(feature = "compiled-writer")]
    #[error("no compiled writer for `{0}`")]
    Unsupported(String),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
