use hostshare_common::map::FieldName;
use hostshare_common::ScalarKind;
use thiserror::Error;

/// Error type for malformed schemas and invalid layout queries.
///
/// Every variant describes a defect in how a schema was authored or addressed,
/// never a transient condition.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// An unbounded field appeared before the last field of a struct.
    #[error("only the last property of a struct can be unbounded (found `{field}`)")]
    MisplacedUnbounded { field: FieldName },
    /// A struct ending in an unbounded array was used as a struct field.
    #[error("struct field `{field}` cannot hold a struct with an unbounded array")]
    NestedUnboundedStruct { field: FieldName },
    /// An array element was itself unbounded.
    #[error("array elements cannot be unbounded")]
    NestedUnboundedArray,
    /// Two fields of the same struct share a name.
    #[error("duplicate struct field `{0}`")]
    DuplicateField(FieldName),
    /// An `align` attribute was not a power of two or was below the natural alignment.
    #[error("invalid alignment {align} for `{schema}` (natural alignment is {natural})")]
    InvalidAlignment {
        schema: String,
        align: usize,
        natural: usize,
    },
    /// A `size` attribute was below the natural size, or applied to an unbounded type.
    #[error("invalid size {size} for `{schema}`")]
    InvalidSize { schema: String, size: usize },
    /// A strict node was nested inside a loose node, or the other way around.
    #[error("`{child}` cannot be nested inside `{parent}`, strict and loose layouts cannot be mixed")]
    MixedLayoutFamily { parent: String, child: String },
    /// Atomics can only wrap `i32` or `u32`.
    #[error("atomics must wrap i32 or u32, not {0}")]
    InvalidAtomic(ScalarKind),
    /// An operation required a fixed size, but the schema is unbounded.
    #[error("`{0}` has no fixed size")]
    UnboundedValue(String),
    /// A path named a field that does not exist.
    #[error("`{schema}` has no field `{field}`")]
    UnknownField { schema: String, field: FieldName },
    /// A path step does not apply to the schema it was applied to.
    #[error("cannot access {access} of `{schema}`")]
    InvalidAccess { schema: String, access: String },
    /// A path indexed past the end of a sized array, vector or matrix.
    #[error("index {index} is out of range for `{schema}` with {count} elements")]
    IndexOutOfRange {
        schema: String,
        index: usize,
        count: usize,
    },
    /// The schema has no host-shareable memory layout.
    #[error("`{0}` is not host-shareable")]
    NotHostShareable(String),
}

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
