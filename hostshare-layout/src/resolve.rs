//! Alignment and size resolution.
//!
//! Both resolvers are pure functions of schema identity and are memoized per node.
//! <https://www.w3.org/TR/WGSL/#memory-layouts>

use crate::cache::IdentityCache;
use crate::error::{Result, SchemaError};
use crate::schema::{ArraySchema, Family, Schema, SchemaNode, StructSchema};
use hostshare_common::round_up;
use once_cell::sync::Lazy;
use std::fmt::{Display, Formatter};
use std::ops::Add;

static ALIGNMENTS: Lazy<IdentityCache<usize>> = Lazy::new(IdentityCache::new);
static SIZES: Lazy<IdentityCache<LayoutSize>> = Lazy::new(IdentityCache::new);

/// The byte size of a schema.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LayoutSize {
    Sized(usize),
    /// The size is only known once a runtime element count is chosen.
    Unbounded,
}

impl LayoutSize {
    pub const fn bytes(self) -> Option<usize> {
        match self {
            LayoutSize::Sized(bytes) => Some(bytes),
            LayoutSize::Unbounded => None,
        }
    }

    pub const fn is_unbounded(self) -> bool {
        matches!(self, LayoutSize::Unbounded)
    }

    /// The smaller of two sizes, where `Unbounded` is larger than any byte count.
    pub fn min(self, other: LayoutSize) -> LayoutSize {
        match (self, other) {
            (LayoutSize::Sized(a), LayoutSize::Sized(b)) => LayoutSize::Sized(a.min(b)),
            (LayoutSize::Sized(a), LayoutSize::Unbounded)
            | (LayoutSize::Unbounded, LayoutSize::Sized(a)) => LayoutSize::Sized(a),
            (LayoutSize::Unbounded, LayoutSize::Unbounded) => LayoutSize::Unbounded,
        }
    }

    /// The byte count, or an error naming `schema` if the size is unbounded.
    pub fn sized_or_err(self, schema: &Schema) -> Result<usize> {
        self.bytes()
            .ok_or_else(|| SchemaError::UnboundedValue(schema.to_string()))
    }
}

impl Add for LayoutSize {
    type Output = LayoutSize;

    fn add(self, rhs: LayoutSize) -> LayoutSize {
        match (self, rhs) {
            (LayoutSize::Sized(a), LayoutSize::Sized(b)) => LayoutSize::Sized(a + b),
            _ => LayoutSize::Unbounded,
        }
    }
}

impl Add<usize> for LayoutSize {
    type Output = LayoutSize;

    fn add(self, rhs: usize) -> LayoutSize {
        self + LayoutSize::Sized(rhs)
    }
}

impl Display for LayoutSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutSize::Sized(bytes) => write!(f, "{bytes}"),
            LayoutSize::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// The alignment of a schema under host-shareable rules.
///
/// Loose nodes report their custom alignment.
pub fn alignment_of(schema: &Schema) -> usize {
    ALIGNMENTS.get_or_insert_with(schema, || compute_alignment(schema))
}

fn compute_alignment(schema: &Schema) -> usize {
    match schema.node() {
        SchemaNode::Scalar(kind) | SchemaNode::Atomic(kind) => kind.align(),
        SchemaNode::Vector(vector) => vector.align(),
        SchemaNode::Matrix(matrix) => matrix.align(),
        SchemaNode::Struct(s) => s
            .fields()
            .iter()
            .map(|field| alignment_of(&field.schema))
            .max()
            .unwrap_or(1),
        SchemaNode::Array(array) => alignment_of(array.element()),
        SchemaNode::Decorated(decorated) => decorated
            .attributes()
            .align()
            .unwrap_or_else(|| alignment_of(decorated.inner())),
        SchemaNode::Pointer(_) => 1,
        SchemaNode::LooseStruct(_) | SchemaNode::Disarray(_) | SchemaNode::Vertex(_) => {
            custom_alignment_of(schema)
        }
    }
}

/// The alignment of a schema inside a loose layout: an explicit `align` attribute,
/// or 1.
pub fn custom_alignment_of(schema: &Schema) -> usize {
    schema
        .attributes()
        .and_then(|attributes| attributes.align())
        .unwrap_or(1)
}

/// The alignment a member occupies inside a parent of the given family.
pub fn member_alignment(family: Family, schema: &Schema) -> usize {
    match family {
        Family::Strict => alignment_of(schema),
        Family::Loose => custom_alignment_of(schema),
    }
}

/// The size of a schema in bytes, or [`LayoutSize::Unbounded`] for runtime-sized arrays
/// and structs ending in one.
pub fn size_of(schema: &Schema) -> Result<LayoutSize> {
    SIZES.get_or_try_insert_with(schema, || compute_size(schema))
}

/// The size of a schema inside a loose layout: an explicit `size` attribute, or the
/// natural size. Loose members keep their natural size and only drop their alignment.
pub fn custom_size_of(schema: &Schema) -> Result<LayoutSize> {
    match schema.attributes().and_then(|attributes| attributes.size()) {
        Some(size) => Ok(LayoutSize::Sized(size)),
        None => size_of(schema),
    }
}

fn compute_size(schema: &Schema) -> Result<LayoutSize> {
    Ok(match schema.node() {
        SchemaNode::Scalar(kind) | SchemaNode::Atomic(kind) => LayoutSize::Sized(kind.byte_size()),
        SchemaNode::Vector(vector) => LayoutSize::Sized(vector.byte_size()),
        SchemaNode::Matrix(matrix) => LayoutSize::Sized(matrix.byte_size()),
        SchemaNode::Vertex(format) => LayoutSize::Sized(format.byte_size()),
        SchemaNode::Struct(s) => struct_layout(s, Family::Strict)?.size,
        SchemaNode::LooseStruct(s) => struct_layout(s, Family::Loose)?.size,
        SchemaNode::Array(array) => array_size(array, Family::Strict)?,
        SchemaNode::Disarray(array) => array_size(array, Family::Loose)?,
        SchemaNode::Decorated(decorated) => match decorated.attributes().size() {
            Some(size) => LayoutSize::Sized(size),
            None => size_of(decorated.inner())?,
        },
        SchemaNode::Pointer(_) => return Err(SchemaError::NotHostShareable(schema.to_string())),
    })
}

/// The distance between two consecutive elements of an array.
pub fn stride_of(array: &ArraySchema, family: Family) -> Result<usize> {
    let element = array.element();
    let size = match family {
        Family::Strict => size_of(element)?,
        Family::Loose => custom_size_of(element)?,
    };
    let Some(size) = size.bytes() else {
        return Err(SchemaError::NestedUnboundedArray);
    };
    Ok(round_up(size, member_alignment(family, element)))
}

fn array_size(array: &ArraySchema, family: Family) -> Result<LayoutSize> {
    let stride = stride_of(array, family)?;
    if array.is_unbounded() {
        Ok(LayoutSize::Unbounded)
    } else {
        Ok(LayoutSize::Sized(stride * array.count()))
    }
}

/// The placement of one struct member.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct MemberLayout {
    pub offset: usize,
    pub size: LayoutSize,
    pub align: usize,
}

pub(crate) struct StructLayout {
    pub members: Vec<MemberLayout>,
    pub size: LayoutSize,
    pub align: usize,
}

/// Lay out the members of a struct in declaration order, validating the placement of
/// unbounded members.
pub(crate) fn struct_layout(s: &StructSchema, family: Family) -> Result<StructLayout> {
    let fields = s.fields();
    let mut members = Vec::with_capacity(fields.len());
    let mut cursor = 0;
    let mut tail = LayoutSize::Sized(0);
    let mut align = 1;

    for (index, field) in fields.iter().enumerate() {
        let is_last = index + 1 == fields.len();
        let size = match family {
            Family::Strict => size_of(&field.schema)?,
            Family::Loose => custom_size_of(&field.schema)?,
        };

        if size.is_unbounded() {
            if matches!(
                field.schema.undecorated().node(),
                SchemaNode::Struct(_) | SchemaNode::LooseStruct(_)
            ) {
                return Err(SchemaError::NestedUnboundedStruct {
                    field: field.name.clone(),
                });
            }
            if !is_last {
                return Err(SchemaError::MisplacedUnbounded {
                    field: field.name.clone(),
                });
            }
        }

        let member_align = member_alignment(family, &field.schema);
        let offset = round_up(cursor, member_align);
        align = align.max(member_align);
        members.push(MemberLayout {
            offset,
            size,
            align: member_align,
        });

        match size {
            LayoutSize::Sized(bytes) => cursor = offset + bytes,
            LayoutSize::Unbounded => tail = LayoutSize::Unbounded,
        }
    }

    let align = match family {
        Family::Strict => align,
        Family::Loose => 1,
    };

    let size = match tail {
        LayoutSize::Unbounded => LayoutSize::Unbounded,
        LayoutSize::Sized(_) => LayoutSize::Sized(round_up(cursor, align)),
    };

    Ok(StructLayout {
        members,
        size,
        align,
    })
}

/// The concrete size of a schema whose trailing unbounded array holds `count` elements.
///
/// Sized schemas return their size unchanged.
pub fn size_for_runtime_length(schema: &Schema, count: usize) -> Result<usize> {
    if let LayoutSize::Sized(size) = size_of(schema)? {
        return Ok(size);
    }

    match schema.node() {
        SchemaNode::Array(array) => Ok(stride_of(array, Family::Strict)? * count),
        SchemaNode::Disarray(array) => Ok(stride_of(array, Family::Loose)? * count),
        SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => {
            let family = schema.family();
            let layout = struct_layout(s, family)?;
            let (Some(last), Some(member)) = (s.fields().last(), layout.members.last()) else {
                return Err(SchemaError::UnboundedValue(schema.to_string()));
            };
            let tail = size_for_runtime_length(&last.schema, count)?;
            Ok(round_up(member.offset + tail, layout.align))
        }
        SchemaNode::Decorated(decorated) => size_for_runtime_length(decorated.inner(), count),
        _ => Err(SchemaError::UnboundedValue(schema.to_string())),
    }
}
