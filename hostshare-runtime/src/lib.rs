//! Binary encoding of values into host-shareable memory layouts.
//!
//! Values are written through a [`ByteSink`](cursor::ByteSink) and read back through a
//! [`BufferReader`](cursor::BufferReader). Both follow the layout computed by
//! `hostshare-layout` byte for byte, including padding and array strides.
//!
//! Sparse updates to a value already in a buffer are expressed as a
//! [`PartialValue`](value::PartialValue) and turned into a minimal list of
//! [`WriteInstruction`](instructions::WriteInstruction)s.

/// The schema-directed codec.
pub mod codec;

/// Byte cursors.
pub mod cursor;

/// Error types.
pub mod error;

/// Partial write instructions.
pub mod instructions;

/// Codec options.
pub mod options;

/// Logical values.
pub mod value;

mod compiled;
mod packed;

pub use codec::{
    decode, encode, encode_with, read_pod, read_value, write_pod, write_value, write_value_with,
};
pub use cursor::{BufferReader, BufferWriter, ByteSink, Measure};
pub use error::CodecError;
pub use instructions::{build_write_instructions, WriteInstruction};
pub use options::CodecOptions;
pub use value::{IndexedValue, PartialValue, Scalar, Value};
