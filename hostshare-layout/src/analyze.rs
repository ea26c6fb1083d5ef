//! Contiguity analysis.
//!
//! Knowing which byte ranges of a layout are free of padding lets writers merge many small
//! writes into a single copy.

use crate::cache::IdentityCache;
use crate::error::{Result, SchemaError};
use crate::resolve::{size_of, stride_of, struct_layout, LayoutSize};
use crate::schema::{Family, Schema, SchemaNode, StructSchema};
use once_cell::sync::Lazy;

static ANALYSES: Lazy<IdentityCache<LayoutInfo>> = Lazy::new(IdentityCache::new);

/// Contiguity facts about a layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LayoutInfo {
    /// Whether the whole layout is free of internal and trailing padding.
    pub is_contiguous: bool,
    pub size: LayoutSize,
    /// The length of the gap-free run of bytes starting at offset 0.
    pub longest_contiguous_prefix: LayoutSize,
}

impl LayoutInfo {
    const fn contiguous(size: usize) -> LayoutInfo {
        LayoutInfo {
            is_contiguous: true,
            size: LayoutSize::Sized(size),
            longest_contiguous_prefix: LayoutSize::Sized(size),
        }
    }
}

pub fn analyze(schema: &Schema) -> Result<LayoutInfo> {
    ANALYSES.get_or_try_insert_with(schema, || compute_info(schema))
}

fn compute_info(schema: &Schema) -> Result<LayoutInfo> {
    Ok(match schema.node() {
        SchemaNode::Scalar(kind) | SchemaNode::Atomic(kind) => {
            LayoutInfo::contiguous(kind.byte_size())
        }
        SchemaNode::Vector(vector) => LayoutInfo::contiguous(vector.byte_size()),
        SchemaNode::Vertex(format) => LayoutInfo::contiguous(format.byte_size()),
        SchemaNode::Matrix(matrix) => {
            let column = matrix.column_type().byte_size();
            if matrix.column_stride() == column {
                LayoutInfo::contiguous(matrix.byte_size())
            } else {
                LayoutInfo {
                    is_contiguous: false,
                    size: LayoutSize::Sized(matrix.byte_size()),
                    longest_contiguous_prefix: LayoutSize::Sized(column),
                }
            }
        }
        SchemaNode::Decorated(decorated) => {
            let inner = analyze(decorated.inner())?;
            let size = size_of(schema)?;
            LayoutInfo {
                is_contiguous: inner.is_contiguous && inner.size == size,
                size,
                longest_contiguous_prefix: inner.longest_contiguous_prefix,
            }
        }
        SchemaNode::Array(array) | SchemaNode::Disarray(array) => {
            let family = schema.family();
            let element = analyze(array.element())?;
            let stride = stride_of(array, family)?;
            let size = size_of(schema)?;
            let is_contiguous = element.is_contiguous && element.size == LayoutSize::Sized(stride);
            LayoutInfo {
                is_contiguous,
                size,
                longest_contiguous_prefix: if is_contiguous {
                    size
                } else {
                    element.longest_contiguous_prefix
                },
            }
        }
        SchemaNode::Struct(s) => struct_info(s, Family::Strict)?,
        SchemaNode::LooseStruct(s) => struct_info(s, Family::Loose)?,
        SchemaNode::Pointer(_) => {
            return Err(SchemaError::NotHostShareable(schema.to_string()))
        }
    })
}

fn struct_info(s: &StructSchema, family: Family) -> Result<LayoutInfo> {
    let layout = struct_layout(s, family)?;
    let mut cursor = LayoutSize::Sized(0);
    let mut prefix = LayoutSize::Sized(0);
    let mut prefix_open = true;
    let mut is_contiguous = true;

    for (field, member) in s.fields().iter().zip(&layout.members) {
        if cursor != LayoutSize::Sized(member.offset) {
            is_contiguous = false;
            prefix_open = false;
        }

        let info = analyze(&field.schema)?;
        if prefix_open {
            prefix = prefix + info.longest_contiguous_prefix;
            prefix_open = info.is_contiguous;
        }
        is_contiguous &= info.is_contiguous;
        cursor = member.size + member.offset;
    }

    if cursor != layout.size {
        is_contiguous = false;
    }

    Ok(LayoutInfo {
        is_contiguous,
        size: layout.size,
        longest_contiguous_prefix: prefix,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use hostshare_common::vertex::VertexFormat;

    #[test]
    pub fn padded_array_is_not_contiguous() {
        let schema = Schema::array(Schema::vec3f(), 4).unwrap();
        assert_eq!(
            analyze(&schema),
            Ok(LayoutInfo {
                is_contiguous: false,
                size: LayoutSize::Sized(64),
                longest_contiguous_prefix: LayoutSize::Sized(12),
            })
        );
    }

    #[test]
    pub fn tight_array_is_contiguous() {
        let schema = Schema::array(Schema::vec4f(), 4).unwrap();
        assert_eq!(
            analyze(&schema),
            Ok(LayoutInfo::contiguous(64))
        );
    }

    #[test]
    pub fn mat3x3_has_column_padding() {
        let info = analyze(&Schema::mat3x3f()).unwrap();
        assert!(!info.is_contiguous);
        assert_eq!(info.longest_contiguous_prefix, LayoutSize::Sized(12));
        assert!(analyze(&Schema::mat4x4f()).unwrap().is_contiguous);
        assert!(analyze(&Schema::mat2x2f()).unwrap().is_contiguous);
    }

    #[test]
    pub fn struct_prefix_stops_at_first_gap() {
        let schema = Schema::structure(
            "S",
            [
                ("a", Schema::u32()),
                ("b", Schema::u32()),
                ("c", Schema::vec4f()),
            ],
        )
        .unwrap();
        let info = analyze(&schema).unwrap();
        assert!(!info.is_contiguous);
        assert_eq!(info.size, LayoutSize::Sized(32));
        assert_eq!(info.longest_contiguous_prefix, LayoutSize::Sized(8));
    }

    #[test]
    pub fn prefix_stops_at_non_contiguous_child() {
        let schema = Schema::structure(
            "S",
            [("m", Schema::mat3x3f()), ("v", Schema::vec4f())],
        )
        .unwrap();
        let info = analyze(&schema).unwrap();
        assert!(!info.is_contiguous);
        assert_eq!(info.longest_contiguous_prefix, LayoutSize::Sized(12));
    }

    #[test]
    pub fn trailing_padding_breaks_contiguity() {
        let schema = Schema::structure("S", [("v", Schema::vec3f())]).unwrap();
        let info = analyze(&schema).unwrap();
        assert!(!info.is_contiguous);
        assert_eq!(info.size, LayoutSize::Sized(16));
        assert_eq!(info.longest_contiguous_prefix, LayoutSize::Sized(12));

        let sized = Schema::size(8, Schema::u32()).unwrap();
        let info = analyze(&sized).unwrap();
        assert!(!info.is_contiguous);
        assert_eq!(info.longest_contiguous_prefix, LayoutSize::Sized(4));
    }

    #[test]
    pub fn packed_struct_is_contiguous() {
        let schema = Schema::structure(
            "S",
            [
                ("a", Schema::vec3f()),
                ("b", Schema::f32()),
                ("c", Schema::vec2u()),
                ("d", Schema::vec2i()),
            ],
        )
        .unwrap();
        assert_eq!(analyze(&schema), Ok(LayoutInfo::contiguous(32)));
    }

    #[test]
    pub fn loose_layouts_are_contiguous_by_default() {
        let schema = Schema::loose_struct(
            "Vertex",
            [
                ("position", Schema::vec3f()),
                ("color", Schema::vertex(VertexFormat::Unorm8x4)),
            ],
        )
        .unwrap();
        assert_eq!(analyze(&schema), Ok(LayoutInfo::contiguous(16)));

        let array = Schema::disarray(schema, 3).unwrap();
        assert_eq!(analyze(&array), Ok(LayoutInfo::contiguous(48)));
    }

    #[test]
    pub fn unbounded_contiguous_prefix() {
        let schema = Schema::structure(
            "S",
            [
                ("len", Schema::vec4u()),
                ("data", Schema::runtime_array(Schema::u32()).unwrap()),
            ],
        )
        .unwrap();
        let info = analyze(&schema).unwrap();
        assert!(info.is_contiguous);
        assert_eq!(info.size, LayoutSize::Unbounded);
        assert_eq!(info.longest_contiguous_prefix, LayoutSize::Unbounded);
    }
}
