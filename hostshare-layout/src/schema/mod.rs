//! The immutable schema tree.
//!
//! A [`Schema`] is a cheap, reference counted handle to a [`SchemaNode`]. Nodes are never
//! mutated after construction, so every layout fact derived from a node is a pure function
//! of the node's identity and can be memoized for as long as the node is alive.

mod attributes;

pub use attributes::{Attribute, AttributeSet};

use crate::error::{Result, SchemaError};
use crate::resolve::{alignment_of, size_of, LayoutSize};
use hostshare_common::attributes::{AddressSpace, Builtin, InterpolationSampling, InterpolationType};
use hostshare_common::map::{FieldName, ShortString};
use hostshare_common::vertex::VertexFormat;
use hostshare_common::{MatrixKind, ScalarKind, VectorLen, VectorType};
use rustc_hash::FxHashSet;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// A handle to an immutable schema node.
///
/// Equality and hashing are by identity: two structurally equal schemas built separately
/// are distinct, and keep distinct memoized layout facts.
#[derive(Clone)]
pub struct Schema(Arc<SchemaNode>);

/// A non-owning handle to a schema node.
#[derive(Clone)]
pub struct WeakSchema(Weak<SchemaNode>);

/// The layout family of a schema tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Family {
    /// Host-shareable alignment rules.
    Strict,
    /// Custom alignment, 1 unless overridden, used for vertex buffers.
    Loose,
}

#[derive(Debug)]
pub enum SchemaNode {
    Scalar(ScalarKind),
    Vector(VectorType),
    Matrix(MatrixKind),
    Struct(StructSchema),
    /// An array of `count` elements. A count of zero is unbounded.
    Array(ArraySchema),
    Atomic(ScalarKind),
    Decorated(DecoratedSchema),
    Pointer(PointerSchema),
    LooseStruct(StructSchema),
    /// A loosely packed array of `count` elements. A count of zero is unbounded.
    Disarray(ArraySchema),
    Vertex(VertexFormat),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: FieldName,
    pub schema: Schema,
}

#[derive(Debug)]
pub struct StructSchema {
    name: ShortString,
    fields: Box<[Field]>,
}

impl StructSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fields of the struct in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field and its declaration index by name.
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name.as_str() == name)
    }
}

#[derive(Debug)]
pub struct ArraySchema {
    element: Schema,
    count: usize,
}

impl ArraySchema {
    pub fn element(&self) -> &Schema {
        &self.element
    }

    /// The number of elements, or zero if the array is unbounded.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_unbounded(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug)]
pub struct DecoratedSchema {
    inner: Schema,
    attributes: AttributeSet,
}

impl DecoratedSchema {
    pub fn inner(&self) -> &Schema {
        &self.inner
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

#[derive(Debug)]
pub struct PointerSchema {
    space: AddressSpace,
    inner: Schema,
}

impl PointerSchema {
    pub fn space(&self) -> AddressSpace {
        self.space
    }

    pub fn inner(&self) -> &Schema {
        &self.inner
    }
}

macro_rules! vector_constructors {
    ($($name:ident => ($kind:ident, $len:ident)),* $(,)?) => {
        $(
            #[doc = concat!("A new `", stringify!($name), "` schema.")]
            pub fn $name() -> Schema {
                Schema::vector(ScalarKind::$kind, VectorLen::$len)
            }
        )*
    };
}

impl Schema {
    fn new(node: SchemaNode) -> Schema {
        Schema(Arc::new(node))
    }

    pub fn node(&self) -> &SchemaNode {
        &self.0
    }

    /// A stable identifier for this node, valid for as long as the node is alive.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakSchema {
        WeakSchema(Arc::downgrade(&self.0))
    }

    /// Strip any decoration and return the underlying schema.
    pub fn undecorated(&self) -> &Schema {
        let mut schema = self;
        while let SchemaNode::Decorated(decorated) = schema.node() {
            schema = &decorated.inner;
        }
        schema
    }

    /// The attributes attached to this node, if it is decorated.
    pub fn attributes(&self) -> Option<&AttributeSet> {
        match self.node() {
            SchemaNode::Decorated(decorated) => Some(&decorated.attributes),
            _ => None,
        }
    }

    pub fn family(&self) -> Family {
        match self.undecorated().node() {
            SchemaNode::LooseStruct(_) | SchemaNode::Disarray(_) | SchemaNode::Vertex(_) => {
                Family::Loose
            }
            _ => Family::Strict,
        }
    }

    pub fn scalar(kind: ScalarKind) -> Schema {
        Schema::new(SchemaNode::Scalar(kind))
    }

    pub fn f16() -> Schema {
        Schema::scalar(ScalarKind::F16)
    }

    pub fn f32() -> Schema {
        Schema::scalar(ScalarKind::F32)
    }

    pub fn i32() -> Schema {
        Schema::scalar(ScalarKind::I32)
    }

    pub fn u32() -> Schema {
        Schema::scalar(ScalarKind::U32)
    }

    pub fn u16() -> Schema {
        Schema::scalar(ScalarKind::U16)
    }

    pub fn bool() -> Schema {
        Schema::scalar(ScalarKind::Bool)
    }

    pub fn vector(component: ScalarKind, len: VectorLen) -> Schema {
        Schema::new(SchemaNode::Vector(VectorType::new(component, len)))
    }

    vector_constructors! {
        vec2f => (F32, X2), vec3f => (F32, X3), vec4f => (F32, X4),
        vec2h => (F16, X2), vec3h => (F16, X3), vec4h => (F16, X4),
        vec2i => (I32, X2), vec3i => (I32, X3), vec4i => (I32, X4),
        vec2u => (U32, X2), vec3u => (U32, X3), vec4u => (U32, X4),
        vec2b => (Bool, X2), vec3b => (Bool, X3), vec4b => (Bool, X4),
    }

    pub fn matrix(kind: MatrixKind) -> Schema {
        Schema::new(SchemaNode::Matrix(kind))
    }

    pub fn mat2x2f() -> Schema {
        Schema::matrix(MatrixKind::Mat2x2f)
    }

    pub fn mat3x3f() -> Schema {
        Schema::matrix(MatrixKind::Mat3x3f)
    }

    pub fn mat4x4f() -> Schema {
        Schema::matrix(MatrixKind::Mat4x4f)
    }

    /// A struct with host-shareable layout. Field order is significant.
    pub fn structure<N: Into<FieldName>>(
        name: impl Into<ShortString>,
        fields: impl IntoIterator<Item = (N, Schema)>,
    ) -> Result<Schema> {
        let name = name.into();
        let fields = collect_fields(fields)?;
        if let Some(loose) = fields.iter().find(|f| f.schema.family() == Family::Loose) {
            return Err(SchemaError::MixedLayoutFamily {
                parent: name.to_string(),
                child: loose.schema.to_string(),
            });
        }
        Ok(Schema::new(SchemaNode::Struct(StructSchema { name, fields })))
    }

    /// An array of `count` elements. A `count` of zero makes the array unbounded.
    pub fn array(element: Schema, count: usize) -> Result<Schema> {
        if element.family() == Family::Loose {
            return Err(SchemaError::MixedLayoutFamily {
                parent: "array".to_string(),
                child: element.to_string(),
            });
        }
        Ok(Schema::new(SchemaNode::Array(ArraySchema { element, count })))
    }

    /// An unbounded array, sized when a concrete buffer is created.
    pub fn runtime_array(element: Schema) -> Result<Schema> {
        Schema::array(element, 0)
    }

    pub fn atomic(kind: ScalarKind) -> Result<Schema> {
        match kind {
            ScalarKind::I32 | ScalarKind::U32 => Ok(Schema::new(SchemaNode::Atomic(kind))),
            _ => Err(SchemaError::InvalidAtomic(kind)),
        }
    }

    /// Decorate a schema with attributes.
    ///
    /// Decorating an already decorated schema merges the attribute sets, with the new
    /// attributes replacing existing ones of the same kind.
    pub fn decorate(
        inner: Schema,
        attributes: impl IntoIterator<Item = Attribute>,
    ) -> Result<Schema> {
        let (inner, mut merged) = match inner.node() {
            SchemaNode::Decorated(decorated) => {
                (decorated.inner.clone(), decorated.attributes.clone())
            }
            _ => (inner, AttributeSet::default()),
        };
        merged.extend(attributes);

        if let Some(align) = merged.align() {
            let natural = alignment_of(&inner);
            let below_natural = inner.family() == Family::Strict && align < natural;
            if !align.is_power_of_two() || below_natural {
                return Err(SchemaError::InvalidAlignment {
                    schema: inner.to_string(),
                    align,
                    natural,
                });
            }
        }

        if let Some(size) = merged.size() {
            match size_of(&inner)? {
                LayoutSize::Sized(natural) if size >= natural => {}
                _ => {
                    return Err(SchemaError::InvalidSize {
                        schema: inner.to_string(),
                        size,
                    })
                }
            }
        }

        Ok(Schema::new(SchemaNode::Decorated(DecoratedSchema {
            inner,
            attributes: merged,
        })))
    }

    pub fn align(align: usize, inner: Schema) -> Result<Schema> {
        Schema::decorate(inner, [Attribute::Align(align)])
    }

    pub fn size(size: usize, inner: Schema) -> Result<Schema> {
        Schema::decorate(inner, [Attribute::Size(size)])
    }

    pub fn location(location: u32, inner: Schema) -> Result<Schema> {
        Schema::decorate(inner, [Attribute::Location(location)])
    }

    pub fn builtin(builtin: Builtin, inner: Schema) -> Result<Schema> {
        Schema::decorate(inner, [Attribute::Builtin(builtin)])
    }

    pub fn interpolate(
        ty: InterpolationType,
        sampling: Option<InterpolationSampling>,
        inner: Schema,
    ) -> Result<Schema> {
        Schema::decorate(inner, [Attribute::Interpolate(ty, sampling)])
    }

    pub fn ptr(space: AddressSpace, inner: Schema) -> Schema {
        Schema::new(SchemaNode::Pointer(PointerSchema { space, inner }))
    }

    /// A struct with loose layout, for vertex buffers.
    pub fn loose_struct<N: Into<FieldName>>(
        name: impl Into<ShortString>,
        fields: impl IntoIterator<Item = (N, Schema)>,
    ) -> Result<Schema> {
        let name = name.into();
        let fields = collect_fields(fields)?;
        if let Some(strict) = fields.iter().find(|f| is_strict_aggregate(&f.schema)) {
            return Err(SchemaError::MixedLayoutFamily {
                parent: name.to_string(),
                child: strict.schema.to_string(),
            });
        }
        Ok(Schema::new(SchemaNode::LooseStruct(StructSchema {
            name,
            fields,
        })))
    }

    /// A loosely packed array of `count` elements. A `count` of zero makes the array unbounded.
    pub fn disarray(element: Schema, count: usize) -> Result<Schema> {
        if is_strict_aggregate(&element) {
            return Err(SchemaError::MixedLayoutFamily {
                parent: "disarray".to_string(),
                child: element.to_string(),
            });
        }
        Ok(Schema::new(SchemaNode::Disarray(ArraySchema {
            element,
            count,
        })))
    }

    pub fn vertex(format: VertexFormat) -> Schema {
        Schema::new(SchemaNode::Vertex(format))
    }

    /// Give a trailing unbounded array a concrete element count.
    ///
    /// The unbounded array may be this schema itself, or the last field of a struct,
    /// recursively. Schemas without an unbounded tail are returned unchanged.
    pub fn with_runtime_length(&self, count: usize) -> Result<Schema> {
        match self.node() {
            SchemaNode::Array(array) if array.is_unbounded() => {
                Schema::array(array.element.clone(), count)
            }
            SchemaNode::Disarray(array) if array.is_unbounded() => {
                Schema::disarray(array.element.clone(), count)
            }
            SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => {
                let Some(last) = s.fields.last() else {
                    return Ok(self.clone());
                };
                let sized = last.schema.with_runtime_length(count)?;
                if sized.ptr_eq(&last.schema) {
                    return Ok(self.clone());
                }

                let mut fields: Vec<(FieldName, Schema)> = s
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.schema.clone()))
                    .collect();
                if let Some(last) = fields.last_mut() {
                    last.1 = sized;
                }

                if matches!(self.node(), SchemaNode::LooseStruct(_)) {
                    Schema::loose_struct(s.name.clone(), fields)
                } else {
                    Schema::structure(s.name.clone(), fields)
                }
            }
            SchemaNode::Decorated(decorated) => {
                let sized = decorated.inner.with_runtime_length(count)?;
                if sized.ptr_eq(&decorated.inner) {
                    return Ok(self.clone());
                }
                Schema::decorate(sized, decorated.attributes.iter())
            }
            _ => Ok(self.clone()),
        }
    }
}

fn collect_fields<N: Into<FieldName>>(
    fields: impl IntoIterator<Item = (N, Schema)>,
) -> Result<Box<[Field]>> {
    let mut seen = FxHashSet::default();
    fields
        .into_iter()
        .map(|(name, schema)| {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateField(name));
            }
            Ok(Field { name, schema })
        })
        .collect()
}

fn is_strict_aggregate(schema: &Schema) -> bool {
    matches!(
        schema.undecorated().node(),
        SchemaNode::Struct(_) | SchemaNode::Array(_) | SchemaNode::Atomic(_)
    )
}

impl WeakSchema {
    pub fn upgrade(&self) -> Option<Schema> {
        self.0.upgrade().map(Schema)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Deref for Schema {
    type Target = SchemaNode;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Schema {}

impl Hash for Schema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.node() {
            SchemaNode::Scalar(kind) => write!(f, "{kind}"),
            SchemaNode::Vector(vector) => write!(f, "{vector}"),
            SchemaNode::Matrix(matrix) => write!(f, "{matrix}"),
            SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => f.write_str(&s.name),
            SchemaNode::Array(a) if a.is_unbounded() => write!(f, "array<{}>", a.element),
            SchemaNode::Array(a) => write!(f, "array<{}, {}>", a.element, a.count),
            SchemaNode::Disarray(a) if a.is_unbounded() => write!(f, "disarray<{}>", a.element),
            SchemaNode::Disarray(a) => write!(f, "disarray<{}, {}>", a.element, a.count),
            SchemaNode::Atomic(kind) => write!(f, "atomic<{kind}>"),
            SchemaNode::Decorated(decorated) => {
                for attribute in decorated.attributes.iter() {
                    write!(f, "{attribute} ")?;
                }
                write!(f, "{}", decorated.inner)
            }
            SchemaNode::Pointer(ptr) => write!(f, "ptr<{}, {}>", ptr.space.name(), ptr.inner),
            SchemaNode::Vertex(format) => write!(f, "{format}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn duplicate_fields_are_rejected() {
        let err = Schema::structure("Dup", [("a", Schema::u32()), ("a", Schema::f32())])
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("a".into()));
    }

    #[test]
    pub fn families_cannot_mix() {
        let loose = Schema::loose_struct("Vertex", [("uv", Schema::vertex(VertexFormat::Unorm8x2))])
            .unwrap();
        assert!(matches!(
            Schema::structure("Outer", [("v", loose.clone())]),
            Err(SchemaError::MixedLayoutFamily { .. })
        ));
        assert!(matches!(
            Schema::array(loose, 4),
            Err(SchemaError::MixedLayoutFamily { .. })
        ));

        let strict = Schema::structure("Inner", [("a", Schema::u32())]).unwrap();
        assert!(matches!(
            Schema::loose_struct("Outer", [("s", strict)]),
            Err(SchemaError::MixedLayoutFamily { .. })
        ));
    }

    #[test]
    pub fn atomics_wrap_integers_only() {
        assert!(Schema::atomic(ScalarKind::U32).is_ok());
        assert_eq!(
            Schema::atomic(ScalarKind::F32).unwrap_err(),
            SchemaError::InvalidAtomic(ScalarKind::F32)
        );
    }

    #[test]
    pub fn overrides_below_natural_are_rejected() {
        assert!(matches!(
            Schema::align(4, Schema::vec3f()),
            Err(SchemaError::InvalidAlignment { align: 4, natural: 16, .. })
        ));
        assert!(matches!(
            Schema::align(24, Schema::vec3f()),
            Err(SchemaError::InvalidAlignment { .. })
        ));
        assert!(matches!(
            Schema::size(8, Schema::vec3f()),
            Err(SchemaError::InvalidSize { size: 8, .. })
        ));
        assert!(Schema::size(16, Schema::vec3f()).is_ok());
        // loose nodes may lower their alignment
        assert!(Schema::align(1, Schema::vertex(VertexFormat::Float32x2)).is_ok());
    }

    #[test]
    pub fn decorating_twice_merges_attributes() {
        let inner = Schema::u32();
        let once = Schema::align(8, inner.clone()).unwrap();
        let twice = Schema::decorate(once, [Attribute::Align(16), Attribute::Location(2)]).unwrap();
        let SchemaNode::Decorated(decorated) = twice.node() else {
            panic!("expected decorated schema")
        };
        assert!(decorated.inner().ptr_eq(&inner));
        assert_eq!(decorated.attributes().align(), Some(16));
        assert_eq!(decorated.attributes().location(), Some(2));
        assert_eq!(twice.to_string(), "@align(16) @location(2) u32");
    }

    #[test]
    pub fn identity_equality() {
        let a = Schema::vec3f();
        let b = Schema::vec3f();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    pub fn runtime_length_instantiates_trailing_array() {
        let tail = Schema::runtime_array(Schema::vec4f()).unwrap();
        let schema = Schema::structure("Particles", [("count", Schema::u32()), ("items", tail)])
            .unwrap();
        let sized = schema.with_runtime_length(3).unwrap();
        let SchemaNode::Struct(s) = sized.node() else {
            panic!("expected struct")
        };
        let SchemaNode::Array(items) = s.fields()[1].schema.node() else {
            panic!("expected array")
        };
        assert_eq!(items.count(), 3);
        assert_eq!(sized.to_string(), "Particles");

        let fixed = Schema::vec2f();
        assert!(fixed.with_runtime_length(3).unwrap().ptr_eq(&fixed));
    }
}
