//! Address algebra.
//!
//! A [`Path`] names a location inside a value the same way shader code would reach it:
//! `particles[3].position.y` becomes `Path::new().field("particles").at(3).field("position").component(Axis::Y)`.
//! [`memory_layout_of`] evaluates a path against a schema and returns the byte offset of the
//! addressed location, together with the number of bytes from that offset that can be
//! written as one unbroken range.

use crate::analyze::analyze;
use crate::error::{Result, SchemaError};
use crate::offsets::offsets_for_props;
use crate::resolve::{stride_of, LayoutSize};
use crate::schema::{Schema, SchemaNode};
use hostshare_common::map::FieldName;
use hostshare_common::{MatrixKind, VectorType};
use std::fmt::{Display, Formatter, Write};
use std::str::FromStr;

/// A vector component.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    W = 3,
}

impl Axis {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parse a swizzle letter, accepting both `xyzw` and `rgba`.
    pub const fn from_letter(letter: char) -> Option<Axis> {
        match letter {
            'x' | 'r' => Some(Axis::X),
            'y' | 'g' => Some(Axis::Y),
            'z' | 'b' => Some(Axis::Z),
            'w' | 'a' => Some(Axis::W),
            _ => None,
        }
    }

    const fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
            Axis::W => 'w',
        }
    }
}

/// One navigation step of a [`Path`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Step {
    /// A struct field. Applied to a vector, the name is read as a swizzle.
    Field(FieldName),
    /// An array element, matrix column or vector component.
    Index(usize),
    Component(Axis),
    /// A run of consecutive vector components, such as `yz`.
    Swizzle(Vec<Axis>),
}

/// A navigation path through a value, built from combinators.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    /// The empty path, addressing the whole value.
    pub fn new() -> Path {
        Path::default()
    }

    pub fn field(mut self, name: impl Into<FieldName>) -> Path {
        self.steps.push(Step::Field(name.into()));
        self
    }

    pub fn at(mut self, index: usize) -> Path {
        self.steps.push(Step::Index(index));
        self
    }

    pub fn component(mut self, axis: Axis) -> Path {
        self.steps.push(Step::Component(axis));
        self
    }

    /// Address a swizzle such as `yz` or `rgb`.
    ///
    /// Only runs of consecutive, ascending components have a memory location. Any other
    /// swizzle fails when the path is evaluated.
    pub fn swizzle(mut self, letters: &str) -> Path {
        match parse_swizzle(letters) {
            Some(axes) => self.steps.push(Step::Swizzle(axes)),
            None => self.steps.push(Step::Field(letters.into())),
        }
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn parse_swizzle(letters: &str) -> Option<Vec<Axis>> {
    if letters.is_empty() || letters.len() > 4 {
        return None;
    }
    letters.chars().map(Axis::from_letter).collect()
}

/// Error returned when a path expression cannot be parsed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsePathError(pub String);

impl Display for ParsePathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid path expression `{}`", self.0)
    }
}

impl std::error::Error for ParsePathError {}

impl FromStr for Path {
    type Err = ParsePathError;

    /// Parse an expression such as `lights[2].color.rgb`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParsePathError(s.to_string());
        let mut path = Path::new();
        if s.is_empty() {
            return Ok(path);
        }

        for segment in s.split('.') {
            let (name, mut rest) = match segment.find('[') {
                Some(bracket) => segment.split_at(bracket),
                None => (segment, ""),
            };
            // only a leading segment may start with an index
            if name.is_empty() && (rest.is_empty() || !path.is_empty()) {
                return Err(err());
            }
            if !name.is_empty() {
                path = path.field(name);
            }

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(err)?;
                let index = rest
                    .get(1..close)
                    .and_then(|index| index.parse().ok())
                    .ok_or_else(err)?;
                path = path.at(index);
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(err());
                }
            }
        }
        Ok(path)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::Field(name) => {
                    if index > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
                Step::Index(i) => write!(f, "[{i}]")?,
                Step::Component(axis) => {
                    if index > 0 {
                        f.write_char('.')?;
                    }
                    f.write_char(axis.letter())?;
                }
                Step::Swizzle(axes) => {
                    if index > 0 {
                        f.write_char('.')?;
                    }
                    for axis in axes {
                        f.write_char(axis.letter())?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// The location of an addressed value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MemoryLayout {
    /// Byte offset from the start of the root value.
    pub offset: usize,
    /// Number of bytes from `offset` that contain no padding.
    pub contiguous: LayoutSize,
}

/// Evaluate `path` against `schema`.
///
/// The empty path addresses the root, returning offset 0 and the root's longest
/// contiguous prefix.
pub fn memory_layout_of(schema: &Schema, path: &Path) -> Result<MemoryLayout> {
    let mut address = Address {
        node: Node::Schema(schema),
        offset: 0,
        tail: LayoutSize::Sized(0),
    };
    for step in &path.steps {
        address = address.step(step)?;
    }
    address.settle()
}

/// What an address points at. Matrix columns and vector components have no schema node
/// of their own.
#[derive(Copy, Clone)]
enum Node<'a> {
    Schema(&'a Schema),
    Vector(VectorType),
    /// A run of vector components, `n` bytes wide.
    Components(usize),
}

/// A location being navigated.
///
/// `tail` is the number of gap-free bytes that directly follow the addressed value, up to
/// the end of the root. It lets a child report a contiguous run that extends past itself
/// into its following siblings.
#[derive(Copy, Clone)]
struct Address<'a> {
    node: Node<'a>,
    offset: usize,
    tail: LayoutSize,
}

impl<'a> Address<'a> {
    fn settle(self) -> Result<MemoryLayout> {
        let contiguous = match self.node {
            Node::Schema(schema) => run(schema, self.tail)?,
            Node::Vector(vector) => self.tail + vector.byte_size(),
            Node::Components(bytes) => self.tail + bytes,
        };
        Ok(MemoryLayout {
            offset: self.offset,
            contiguous,
        })
    }

    fn step(self, step: &Step) -> Result<Address<'a>> {
        let schema = match self.node {
            Node::Schema(schema) => schema,
            Node::Vector(vector) => return self.vector_step(vector, step, vector.to_string()),
            Node::Components(_) => {
                return Err(SchemaError::InvalidAccess {
                    schema: "vector component".to_string(),
                    access: format!("{step:?}"),
                })
            }
        };

        match schema.node() {
            SchemaNode::Decorated(decorated) => {
                let inner = decorated.inner();
                let tail = if analyze(inner)?.size == analyze(schema)?.size {
                    self.tail
                } else {
                    LayoutSize::Sized(0)
                };
                Address {
                    node: Node::Schema(inner),
                    offset: self.offset,
                    tail,
                }
                .step(step)
            }
            SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => {
                let Step::Field(name) = step else {
                    return Err(invalid_access(schema, step));
                };
                let Some((index, field)) = s.field(name) else {
                    return Err(SchemaError::UnknownField {
                        schema: schema.to_string(),
                        field: name.clone(),
                    });
                };
                let offsets = offsets_for_props(schema)?;
                let Some(placement) = offsets.at(index) else {
                    return Err(invalid_access(schema, step));
                };
                Ok(Address {
                    node: Node::Schema(&field.schema),
                    offset: self.offset + placement.offset,
                    tail: field_tail(schema, index, self.tail)?,
                })
            }
            SchemaNode::Array(array) | SchemaNode::Disarray(array) => {
                let Step::Index(index) = *step else {
                    return Err(invalid_access(schema, step));
                };
                if !array.is_unbounded() && index >= array.count() {
                    return Err(SchemaError::IndexOutOfRange {
                        schema: schema.to_string(),
                        index,
                        count: array.count(),
                    });
                }
                let stride = stride_of(array, schema.family())?;
                let element = analyze(array.element())?;
                let remaining = match array.is_unbounded() {
                    true => LayoutSize::Unbounded,
                    false => LayoutSize::Sized(array.count() - index - 1),
                };
                let offset = index
                    .checked_mul(stride)
                    .and_then(|relative| relative.checked_add(self.offset))
                    .ok_or_else(|| SchemaError::IndexOutOfRange {
                        schema: schema.to_string(),
                        index,
                        count: array.count(),
                    })?;
                Ok(Address {
                    node: Node::Schema(array.element()),
                    offset,
                    tail: element_tail(
                        element.size,
                        element.is_contiguous,
                        element.longest_contiguous_prefix,
                        stride,
                        remaining,
                        self.tail,
                    ),
                })
            }
            SchemaNode::Vector(vector) => self.vector_step(*vector, step, schema.to_string()),
            SchemaNode::Matrix(matrix) => self.matrix_step(*matrix, schema, step),
            _ => Err(invalid_access(schema, step)),
        }
    }

    fn matrix_step(self, matrix: MatrixKind, schema: &Schema, step: &Step) -> Result<Address<'a>> {
        let Step::Index(index) = *step else {
            return Err(invalid_access(schema, step));
        };
        let columns = matrix.columns();
        if index >= columns {
            return Err(SchemaError::IndexOutOfRange {
                schema: schema.to_string(),
                index,
                count: columns,
            });
        }
        let column = matrix.column_type();
        let size = LayoutSize::Sized(column.byte_size());
        Ok(Address {
            node: Node::Vector(column),
            offset: self.offset + index * matrix.column_stride(),
            tail: element_tail(
                size,
                true,
                size,
                matrix.column_stride(),
                LayoutSize::Sized(columns - index - 1),
                self.tail,
            ),
        })
    }

    fn vector_step(self, vector: VectorType, step: &Step, name: String) -> Result<Address<'a>> {
        let axes = match step {
            Step::Index(index) => return self.component(vector, *index, 1, name),
            Step::Component(axis) => vec![*axis],
            Step::Swizzle(axes) => axes.clone(),
            Step::Field(letters) => parse_swizzle(letters).ok_or_else(|| {
                SchemaError::InvalidAccess {
                    schema: name.clone(),
                    access: format!("`.{letters}`"),
                }
            })?,
        };

        let Some(first) = axes.first() else {
            return Err(SchemaError::InvalidAccess {
                schema: name,
                access: "an empty swizzle".to_string(),
            });
        };
        let consecutive = axes
            .iter()
            .enumerate()
            .all(|(offset, axis)| axis.index() == first.index() + offset);
        if !consecutive {
            return Err(SchemaError::InvalidAccess {
                schema: name,
                access: format!("non-consecutive swizzle {step:?}"),
            });
        }
        self.component(vector, first.index(), axes.len(), name)
    }

    /// Address `width` components of a vector starting at `index`.
    fn component(
        self,
        vector: VectorType,
        index: usize,
        width: usize,
        name: String,
    ) -> Result<Address<'a>> {
        let count = vector.len.count();
        if index >= count || width > count - index {
            return Err(SchemaError::IndexOutOfRange {
                schema: name,
                index: index.saturating_add(width - 1),
                count,
            });
        }
        let component = vector.component.byte_size();
        Ok(Address {
            node: Node::Components(width * component),
            offset: self.offset + index * component,
            tail: self.tail + (count - index - width) * component,
        })
    }
}

fn invalid_access(schema: &Schema, step: &Step) -> SchemaError {
    let access = match step {
        Step::Field(name) => format!("field `{name}`"),
        Step::Index(index) => format!("index {index}"),
        Step::Component(axis) => format!("component `{}`", axis.letter()),
        Step::Swizzle(axes) => format!(
            "swizzle `{}`",
            axes.iter().map(|axis| axis.letter()).collect::<String>()
        ),
    };
    SchemaError::InvalidAccess {
        schema: schema.to_string(),
        access,
    }
}

/// The contiguous run starting at a value followed by `tail` gap-free bytes.
fn run(schema: &Schema, tail: LayoutSize) -> Result<LayoutSize> {
    let info = analyze(schema)?;
    Ok(if info.is_contiguous {
        info.size + tail
    } else {
        info.longest_contiguous_prefix
    })
}

/// The gap-free bytes following field `index` of a struct whose own tail is `tail`.
fn field_tail(schema: &Schema, index: usize, tail: LayoutSize) -> Result<LayoutSize> {
    let offsets = offsets_for_props(schema)?;
    let Some(placement) = offsets.at(index) else {
        return Ok(LayoutSize::Sized(0));
    };
    if placement.padding != 0 {
        return Ok(LayoutSize::Sized(0));
    }
    if index + 1 == offsets.len() {
        return Ok(tail);
    }

    let (SchemaNode::Struct(s) | SchemaNode::LooseStruct(s)) = schema.undecorated().node() else {
        return Ok(LayoutSize::Sized(0));
    };
    let next = &s.fields()[index + 1].schema;
    run(next, field_tail(schema, index + 1, tail)?)
}

/// The gap-free bytes following one array element.
///
/// `remaining` is the number of elements after it.
fn element_tail(
    size: LayoutSize,
    is_contiguous: bool,
    prefix: LayoutSize,
    stride: usize,
    remaining: LayoutSize,
    tail: LayoutSize,
) -> LayoutSize {
    if size != LayoutSize::Sized(stride) {
        return LayoutSize::Sized(0);
    }
    match remaining {
        LayoutSize::Sized(0) => tail,
        LayoutSize::Sized(count) if is_contiguous => LayoutSize::Sized(count * stride) + tail,
        LayoutSize::Unbounded if is_contiguous => LayoutSize::Unbounded,
        _ => prefix,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout(schema: &Schema, path: Path) -> (usize, LayoutSize) {
        let layout = memory_layout_of(schema, &path).unwrap();
        (layout.offset, layout.contiguous)
    }

    fn sized(offset: usize, contiguous: usize) -> (usize, LayoutSize) {
        (offset, LayoutSize::Sized(contiguous))
    }

    #[test]
    pub fn padded_struct_fields() {
        let schema = Schema::structure("S", [("a", Schema::u32()), ("b", Schema::vec3f())])
            .unwrap();
        assert_eq!(layout(&schema, Path::new()), sized(0, 4));
        assert_eq!(layout(&schema, Path::new().field("a")), sized(0, 4));
        assert_eq!(layout(&schema, Path::new().field("b")), sized(16, 12));
        assert_eq!(
            layout(&schema, Path::new().field("b").component(Axis::Y)),
            sized(20, 8)
        );
        assert_eq!(layout(&schema, "b.z".parse().unwrap()), sized(24, 4));
        assert_eq!(layout(&schema, Path::new().field("b").swizzle("gb")), sized(20, 8));
    }

    #[test]
    pub fn tight_runs_extend_into_siblings() {
        let schema = Schema::structure(
            "S",
            [
                ("a", Schema::u32()),
                ("b", Schema::u32()),
                ("c", Schema::vec2f()),
                ("d", Schema::array(Schema::f32(), 2).unwrap()),
            ],
        )
        .unwrap();
        assert_eq!(layout(&schema, Path::new()), sized(0, 24));
        assert_eq!(layout(&schema, Path::new().field("a")), sized(0, 24));
        assert_eq!(layout(&schema, Path::new().field("c").at(1)), sized(12, 12));
        assert_eq!(layout(&schema, "d[1]".parse().unwrap()), sized(20, 4));
    }

    #[test]
    pub fn array_elements() {
        let tight = Schema::array(Schema::vec4f(), 4).unwrap();
        assert_eq!(layout(&tight, Path::new().at(1)), sized(16, 48));
        assert_eq!(
            layout(&tight, Path::new().at(1).component(Axis::Z)),
            sized(24, 40)
        );

        let padded = Schema::array(Schema::vec3f(), 4).unwrap();
        assert_eq!(layout(&padded, Path::new()), sized(0, 12));
        assert_eq!(layout(&padded, Path::new().at(2)), sized(32, 12));
    }

    #[test]
    pub fn matrix_columns() {
        let schema = Schema::mat3x3f();
        assert_eq!(layout(&schema, Path::new()), sized(0, 12));
        assert_eq!(layout(&schema, Path::new().at(1)), sized(16, 12));
        assert_eq!(layout(&schema, Path::new().at(1).at(2)), sized(24, 4));

        let tight = Schema::mat4x4f();
        assert_eq!(layout(&tight, Path::new().at(2)), sized(32, 32));
    }

    #[test]
    pub fn decorations_are_transparent() {
        let schema = Schema::structure(
            "S",
            [
                ("a", Schema::u32()),
                ("b", Schema::size(8, Schema::u32()).unwrap()),
                ("c", Schema::u32()),
            ],
        )
        .unwrap();
        assert_eq!(layout(&schema, Path::new().field("a")), sized(0, 8));
        assert_eq!(layout(&schema, Path::new().field("b")), sized(4, 4));
        assert_eq!(layout(&schema, Path::new().field("c")), sized(12, 4));
    }

    #[test]
    pub fn unbounded_tail() {
        let schema = Schema::structure(
            "S",
            [
                ("len", Schema::u32()),
                ("data", Schema::runtime_array(Schema::u32()).unwrap()),
            ],
        )
        .unwrap();
        assert_eq!(
            layout(&schema, Path::new()),
            (0, LayoutSize::Unbounded)
        );
        assert_eq!(
            layout(&schema, Path::new().field("data").at(5)),
            (24, LayoutSize::Unbounded)
        );
    }

    #[test]
    pub fn invalid_paths() {
        let schema = Schema::structure(
            "S",
            [
                ("v", Schema::vec3f()),
                ("items", Schema::array(Schema::u32(), 4).unwrap()),
                ("x", Schema::f32()),
            ],
        )
        .unwrap();
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("missing")),
            Err(SchemaError::UnknownField { .. })
        ));
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("items").at(4)),
            Err(SchemaError::IndexOutOfRange { index: 4, count: 4, .. })
        ));
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("v").component(Axis::W)),
            Err(SchemaError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("v").swizzle("xz")),
            Err(SchemaError::InvalidAccess { .. })
        ));
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("x").field("y")),
            Err(SchemaError::InvalidAccess { .. })
        ));
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().at(0)),
            Err(SchemaError::InvalidAccess { .. })
        ));
    }

    #[test]
    pub fn huge_indices_are_out_of_range() {
        let schema = Schema::structure(
            "S",
            [
                ("v", Schema::vec3f()),
                ("d", Schema::runtime_array(Schema::vec4f()).unwrap()),
            ],
        )
        .unwrap();
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("v").at(usize::MAX)),
            Err(SchemaError::IndexOutOfRange { index: usize::MAX, count: 3, .. })
        ));
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("d").at(usize::MAX / 4)),
            Err(SchemaError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            memory_layout_of(&schema, &Path::new().field("d").at(usize::MAX)),
            Err(SchemaError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    pub fn parse_and_display_paths() {
        let path: Path = "lights[2].color.rgb".parse().unwrap();
        assert_eq!(
            path,
            Path::new().field("lights").at(2).field("color").field("rgb")
        );
        assert_eq!(path.to_string(), "lights[2].color.rgb");
        assert_eq!("[1][3]".parse::<Path>(), Ok(Path::new().at(1).at(3)));
        assert!("a[x]".parse::<Path>().is_err());
        assert!("a..b".parse::<Path>().is_err());
        assert!("a[1]b".parse::<Path>().is_err());
    }
}
