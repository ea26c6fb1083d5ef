#![forbid(missing_docs)]
//! Host-shareable memory layouts and binary encoding for GPU data.
//!
//! hostshare computes the exact byte layout that WGSL assigns to structured data, and
//! encodes host values into buffers that follow it, so bytes written on the host are read
//! correctly by shader code.
//!
//! ## Usage
//! The core object is the [`Schema`](crate::layout::Schema), an immutable tree describing a
//! data shape. Layout facts are derived from it on demand and memoized per schema node:
//!
//! * sizes, alignments and per-field offsets in [`layout`],
//! * contiguity and the longest gap-free prefix, used to merge byte ranges,
//! * offsets of nested members addressed by a [`Path`](crate::layout::Path).
//!
//! The [`runtime`] module writes and reads [`Value`](crate::runtime::Value)s against a
//! schema, and turns sparse [`PartialValue`](crate::runtime::PartialValue)s into merged
//! write instructions for a buffer that already holds a value.
//!
//! ## Layout families
//! | **Family** | **Nodes**                         | **Alignment**            |
//! |------------|-----------------------------------|--------------------------|
//! | Strict     | scalars, vectors, matrices, structs, arrays, atomics | WGSL rules |
//! | Loose      | loose structs, disarrays, vertex formats | `align` attribute, or 1 |
//!
//! The two families cannot be nested inside each other.
//!
//! ## Features
//! | **Feature**       | **Default** | **Enables**                                 |
//! |-------------------|-------------|---------------------------------------------|
//! | `layout`          | ✔          | schemas and layout resolution               |
//! | `runtime`         | ✔          | the binary codec and partial writes         |
//! | `compiled-writer` | ✔          | cached per-schema writers for full values   |

#[cfg(feature = "layout")]
/// Schemas and their memory layouts.
///
/// Every function here is pure. Results are cached per schema identity, and the cache
/// never keeps a schema alive.
pub mod layout {
    pub use hostshare_layout::*;
}

#[cfg(feature = "runtime")]
/// Encoding and decoding of values.
pub mod runtime {
    pub use hostshare_runtime::*;
}

pub use hostshare_common::attributes::{
    AddressSpace, Builtin, InterpolationSampling, InterpolationType,
};
pub use hostshare_common::vertex::VertexFormat;
pub use hostshare_common::{MatrixKind, ScalarKind, VectorLen, VectorType};
