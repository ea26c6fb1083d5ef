//! Shared primitives for hostshare crates.
//!
//! Everything here is a plain value type: scalar and vector kinds, matrix kinds,
//! vertex formats and the attribute vocabulary that schema nodes can be decorated with.

/// Shader attribute vocabulary.
pub mod attributes;
/// Hash map and string aliases.
pub mod map;
/// Vertex formats for loose (vertex buffer) layouts.
pub mod vertex;

use std::fmt::{Display, Formatter};

/// Round `value` up to the next multiple of `align`.
///
/// `align` must be non-zero.
#[inline(always)]
pub const fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// The kind of a scalar leaf.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    F16,
    F32,
    I32,
    U32,
    U16,
    Bool,
}

impl ScalarKind {
    /// The natural size of the scalar in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            ScalarKind::F16 | ScalarKind::U16 => 2,
            ScalarKind::F32 | ScalarKind::I32 | ScalarKind::U32 | ScalarKind::Bool => 4,
        }
    }

    /// The natural alignment of the scalar in bytes.
    pub const fn align(self) -> usize {
        self.byte_size()
    }

    /// Whether the scalar has a defined memory layout that can be shared with the device.
    pub const fn is_host_shareable(self) -> bool {
        !matches!(self, ScalarKind::Bool)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::F16 => "f16",
            ScalarKind::F32 => "f32",
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::U16 => "u16",
            ScalarKind::Bool => "bool",
        }
    }

    const fn vector_suffix(self) -> Option<char> {
        match self {
            ScalarKind::F16 => Some('h'),
            ScalarKind::F32 => Some('f'),
            ScalarKind::I32 => Some('i'),
            ScalarKind::U32 => Some('u'),
            ScalarKind::Bool => Some('b'),
            ScalarKind::U16 => None,
        }
    }
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The number of components in a vector.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VectorLen {
    X2 = 2,
    X3 = 3,
    X4 = 4,
}

impl VectorLen {
    #[inline(always)]
    pub const fn count(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for VectorLen {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(VectorLen::X2),
            3 => Ok(VectorLen::X3),
            4 => Ok(VectorLen::X4),
            _ => Err(value),
        }
    }
}

/// A vector type: a component kind repeated 2, 3 or 4 times.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VectorType {
    pub component: ScalarKind,
    pub len: VectorLen,
}

impl VectorType {
    pub const fn new(component: ScalarKind, len: VectorLen) -> Self {
        VectorType { component, len }
    }

    pub const fn byte_size(&self) -> usize {
        self.len.count() * self.component.byte_size()
    }

    /// Three component vectors align like four component vectors.
    pub const fn align(&self) -> usize {
        let po2_len = match self.len {
            VectorLen::X2 => 2,
            VectorLen::X3 | VectorLen::X4 => 4,
        };
        po2_len * self.component.align()
    }
}

impl Display for VectorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.component.vector_suffix() {
            Some(suffix) => write!(f, "vec{}{suffix}", self.len.count()),
            None => write!(f, "vec{}<{}>", self.len.count(), self.component),
        }
    }
}

/// A square matrix of `f32` columns.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MatrixKind {
    Mat2x2f,
    Mat3x3f,
    Mat4x4f,
}

impl MatrixKind {
    pub const fn columns(self) -> usize {
        match self {
            MatrixKind::Mat2x2f => 2,
            MatrixKind::Mat3x3f => 3,
            MatrixKind::Mat4x4f => 4,
        }
    }

    /// The vector type of a single column.
    pub const fn column_type(self) -> VectorType {
        let len = match self {
            MatrixKind::Mat2x2f => VectorLen::X2,
            MatrixKind::Mat3x3f => VectorLen::X3,
            MatrixKind::Mat4x4f => VectorLen::X4,
        };
        VectorType::new(ScalarKind::F32, len)
    }

    /// The distance in bytes between the start of two consecutive columns.
    pub const fn column_stride(self) -> usize {
        let column = self.column_type();
        round_up(column.byte_size(), column.align())
    }

    pub const fn byte_size(self) -> usize {
        self.columns() * self.column_stride()
    }

    pub const fn align(self) -> usize {
        self.column_type().align()
    }

    pub const fn name(self) -> &'static str {
        match self {
            MatrixKind::Mat2x2f => "mat2x2f",
            MatrixKind::Mat3x3f => "mat3x3f",
            MatrixKind::Mat4x4f => "mat4x4f",
        }
    }
}

impl Display for MatrixKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
