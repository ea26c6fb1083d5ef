//! Schema trees and host-shareable memory layouts.
//!
//! A [`Schema`](schema::Schema) describes the shape of data shared with shader code. Every
//! layout fact derived from it is computed lazily and memoized per schema node:
//!
//! * [`alignment_of`](resolve::alignment_of) and [`size_of`](resolve::size_of) follow the WGSL
//!   memory layout rules, or custom alignment for loose vertex layouts.
//! * [`analyze`](analyze::analyze) reports whether a layout has padding, and how long its
//!   leading gap-free run is.
//! * [`offsets_for_props`](offsets::offsets_for_props) places every field of a struct.
//! * [`memory_layout_of`](address::memory_layout_of) resolves a [`Path`](address::Path)
//!   into an offset and a contiguous run.

/// Address algebra over schema paths.
pub mod address;
/// Contiguity analysis.
pub mod analyze;
/// Identity-keyed memoization.
pub mod cache;
/// Error types.
pub mod error;
/// Struct field offsets.
pub mod offsets;
/// Alignment and size resolution.
pub mod resolve;
/// The schema tree.
pub mod schema;

pub use address::{memory_layout_of, Axis, MemoryLayout, Path};
pub use analyze::{analyze, LayoutInfo};
pub use error::SchemaError;
pub use offsets::{offsets_for_props, FieldOffset, StructOffsets};
pub use resolve::{
    alignment_of, custom_alignment_of, custom_size_of, size_for_runtime_length, size_of,
    stride_of, LayoutSize,
};
pub use schema::{Attribute, AttributeSet, Family, Schema, SchemaNode};
