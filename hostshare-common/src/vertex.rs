use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A packed vertex attribute format.
///
/// Vertex formats only appear in loose layouts, where values are packed
/// with custom (usually 1-byte) alignment.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    /* 8-bit */
    Uint8,
    Uint8x2,
    Uint8x4,
    Sint8,
    Sint8x2,
    Sint8x4,
    Unorm8,
    Unorm8x2,
    Unorm8x4,
    Snorm8,
    Snorm8x2,
    Snorm8x4,

    /* 16-bit */
    Uint16,
    Uint16x2,
    Uint16x4,
    Sint16,
    Sint16x2,
    Sint16x4,
    Unorm16,
    Unorm16x2,
    Unorm16x4,
    Snorm16,
    Snorm16x2,
    Snorm16x4,
    Float16,
    Float16x2,
    Float16x4,

    /* 32-bit */
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,

    /* packed */
    Unorm10_10_10_2,
    Unorm8x4Bgra,
}

/// The encoding of a single vertex format component.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VertexComponent {
    Uint8,
    Sint8,
    Unorm8,
    Snorm8,
    Uint16,
    Sint16,
    Unorm16,
    Snorm16,
    Float16,
    Float32,
    Uint32,
    Sint32,
}

impl VertexComponent {
    pub const fn byte_size(self) -> usize {
        match self {
            VertexComponent::Uint8
            | VertexComponent::Sint8
            | VertexComponent::Unorm8
            | VertexComponent::Snorm8 => 1,
            VertexComponent::Uint16
            | VertexComponent::Sint16
            | VertexComponent::Unorm16
            | VertexComponent::Snorm16
            | VertexComponent::Float16 => 2,
            VertexComponent::Float32 | VertexComponent::Uint32 | VertexComponent::Sint32 => 4,
        }
    }
}

/// How the bytes of a vertex format are laid out.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FormatLayout {
    /// `count` consecutive components of the same encoding.
    Components {
        component: VertexComponent,
        count: usize,
    },
    /// Four unsigned normalized channels of 10, 10, 10 and 2 bits in one `u32`.
    Unorm10_10_10_2,
    /// Four unsigned normalized bytes stored in blue, green, red, alpha order.
    Unorm8x4Bgra,
}

impl VertexFormat {
    pub const fn layout(self) -> FormatLayout {
        use VertexComponent as C;
        let (component, count) = match self {
            VertexFormat::Uint8 => (C::Uint8, 1),
            VertexFormat::Uint8x2 => (C::Uint8, 2),
            VertexFormat::Uint8x4 => (C::Uint8, 4),
            VertexFormat::Sint8 => (C::Sint8, 1),
            VertexFormat::Sint8x2 => (C::Sint8, 2),
            VertexFormat::Sint8x4 => (C::Sint8, 4),
            VertexFormat::Unorm8 => (C::Unorm8, 1),
            VertexFormat::Unorm8x2 => (C::Unorm8, 2),
            VertexFormat::Unorm8x4 => (C::Unorm8, 4),
            VertexFormat::Snorm8 => (C::Snorm8, 1),
            VertexFormat::Snorm8x2 => (C::Snorm8, 2),
            VertexFormat::Snorm8x4 => (C::Snorm8, 4),
            VertexFormat::Uint16 => (C::Uint16, 1),
            VertexFormat::Uint16x2 => (C::Uint16, 2),
            VertexFormat::Uint16x4 => (C::Uint16, 4),
            VertexFormat::Sint16 => (C::Sint16, 1),
            VertexFormat::Sint16x2 => (C::Sint16, 2),
            VertexFormat::Sint16x4 => (C::Sint16, 4),
            VertexFormat::Unorm16 => (C::Unorm16, 1),
            VertexFormat::Unorm16x2 => (C::Unorm16, 2),
            VertexFormat::Unorm16x4 => (C::Unorm16, 4),
            VertexFormat::Snorm16 => (C::Snorm16, 1),
            VertexFormat::Snorm16x2 => (C::Snorm16, 2),
            VertexFormat::Snorm16x4 => (C::Snorm16, 4),
            VertexFormat::Float16 => (C::Float16, 1),
            VertexFormat::Float16x2 => (C::Float16, 2),
            VertexFormat::Float16x4 => (C::Float16, 4),
            VertexFormat::Float32 => (C::Float32, 1),
            VertexFormat::Float32x2 => (C::Float32, 2),
            VertexFormat::Float32x3 => (C::Float32, 3),
            VertexFormat::Float32x4 => (C::Float32, 4),
            VertexFormat::Uint32 => (C::Uint32, 1),
            VertexFormat::Uint32x2 => (C::Uint32, 2),
            VertexFormat::Uint32x3 => (C::Uint32, 3),
            VertexFormat::Uint32x4 => (C::Uint32, 4),
            VertexFormat::Sint32 => (C::Sint32, 1),
            VertexFormat::Sint32x2 => (C::Sint32, 2),
            VertexFormat::Sint32x3 => (C::Sint32, 3),
            VertexFormat::Sint32x4 => (C::Sint32, 4),
            VertexFormat::Unorm10_10_10_2 => return FormatLayout::Unorm10_10_10_2,
            VertexFormat::Unorm8x4Bgra => return FormatLayout::Unorm8x4Bgra,
        };
        FormatLayout::Components { component, count }
    }

    /// The number of logical components a value of this format carries.
    pub const fn component_count(self) -> usize {
        match self.layout() {
            FormatLayout::Components { count, .. } => count,
            FormatLayout::Unorm10_10_10_2 | FormatLayout::Unorm8x4Bgra => 4,
        }
    }

    pub const fn byte_size(self) -> usize {
        match self.layout() {
            FormatLayout::Components { component, count } => component.byte_size() * count,
            FormatLayout::Unorm10_10_10_2 | FormatLayout::Unorm8x4Bgra => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            VertexFormat::Uint8 => "uint8",
            VertexFormat::Uint8x2 => "uint8x2",
            VertexFormat::Uint8x4 => "uint8x4",
            VertexFormat::Sint8 => "sint8",
            VertexFormat::Sint8x2 => "sint8x2",
            VertexFormat::Sint8x4 => "sint8x4",
            VertexFormat::Unorm8 => "unorm8",
            VertexFormat::Unorm8x2 => "unorm8x2",
            VertexFormat::Unorm8x4 => "unorm8x4",
            VertexFormat::Snorm8 => "snorm8",
            VertexFormat::Snorm8x2 => "snorm8x2",
            VertexFormat::Snorm8x4 => "snorm8x4",
            VertexFormat::Uint16 => "uint16",
            VertexFormat::Uint16x2 => "uint16x2",
            VertexFormat::Uint16x4 => "uint16x4",
            VertexFormat::Sint16 => "sint16",
            VertexFormat::Sint16x2 => "sint16x2",
            VertexFormat::Sint16x4 => "sint16x4",
            VertexFormat::Unorm16 => "unorm16",
            VertexFormat::Unorm16x2 => "unorm16x2",
            VertexFormat::Unorm16x4 => "unorm16x4",
            VertexFormat::Snorm16 => "snorm16",
            VertexFormat::Snorm16x2 => "snorm16x2",
            VertexFormat::Snorm16x4 => "snorm16x4",
            VertexFormat::Float16 => "float16",
            VertexFormat::Float16x2 => "float16x2",
            VertexFormat::Float16x4 => "float16x4",
            VertexFormat::Float32 => "float32",
            VertexFormat::Float32x2 => "float32x2",
            VertexFormat::Float32x3 => "float32x3",
            VertexFormat::Float32x4 => "float32x4",
            VertexFormat::Uint32 => "uint32",
            VertexFormat::Uint32x2 => "uint32x2",
            VertexFormat::Uint32x3 => "uint32x3",
            VertexFormat::Uint32x4 => "uint32x4",
            VertexFormat::Sint32 => "sint32",
            VertexFormat::Sint32x2 => "sint32x2",
            VertexFormat::Sint32x3 => "sint32x3",
            VertexFormat::Sint32x4 => "sint32x4",
            VertexFormat::Unorm10_10_10_2 => "unorm10-10-10-2",
            VertexFormat::Unorm8x4Bgra => "unorm8x4-bgra",
        }
    }
}

impl Display for VertexFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The vertex format name was not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVertexFormat(pub String);

impl Display for UnknownVertexFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown vertex format `{}`", self.0)
    }
}

impl std::error::Error for UnknownVertexFormat {}

impl FromStr for VertexFormat {
    type Err = UnknownVertexFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "uint8" => Self::Uint8,
            "uint8x2" => Self::Uint8x2,
            "uint8x4" => Self::Uint8x4,
            "sint8" => Self::Sint8,
            "sint8x2" => Self::Sint8x2,
            "sint8x4" => Self::Sint8x4,
            "unorm8" => Self::Unorm8,
            "unorm8x2" => Self::Unorm8x2,
            "unorm8x4" => Self::Unorm8x4,
            "snorm8" => Self::Snorm8,
            "snorm8x2" => Self::Snorm8x2,
            "snorm8x4" => Self::Snorm8x4,

            "uint16" => Self::Uint16,
            "uint16x2" => Self::Uint16x2,
            "uint16x4" => Self::Uint16x4,
            "sint16" => Self::Sint16,
            "sint16x2" => Self::Sint16x2,
            "sint16x4" => Self::Sint16x4,
            "unorm16" => Self::Unorm16,
            "unorm16x2" => Self::Unorm16x2,
            "unorm16x4" => Self::Unorm16x4,
            "snorm16" => Self::Snorm16,
            "snorm16x2" => Self::Snorm16x2,
            "snorm16x4" => Self::Snorm16x4,
            "float16" => Self::Float16,
            "float16x2" => Self::Float16x2,
            "float16x4" => Self::Float16x4,

            "float32" => Self::Float32,
            "float32x2" => Self::Float32x2,
            "float32x3" => Self::Float32x3,
            "float32x4" => Self::Float32x4,
            "uint32" => Self::Uint32,
            "uint32x2" => Self::Uint32x2,
            "uint32x3" => Self::Uint32x3,
            "uint32x4" => Self::Uint32x4,
            "sint32" => Self::Sint32,
            "sint32x2" => Self::Sint32x2,
            "sint32x3" => Self::Sint32x3,
            "sint32x4" => Self::Sint32x4,

            "unorm10-10-10-2" => Self::Unorm10_10_10_2,
            "unorm8x4-bgra" => Self::Unorm8x4Bgra,
            _ => return Err(UnknownVertexFormat(s.to_string())),
        })
    }
}
