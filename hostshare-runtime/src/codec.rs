//! The generic, schema-directed codec.
//!
//! Writing walks the schema and the value together, aligning the cursor before every
//! member and seeking over padding. Reading mirrors writing exactly.

use crate::compiled;
use crate::cursor::{BufferReader, BufferWriter, ByteSink, Measure};
use crate::error::{CodecError, Result};
use crate::options::CodecOptions;
use crate::packed::{self, Packed};
use crate::value::{Scalar, Value};
use half::f16;
use hostshare_common::map::{FastHashMap, FieldName};
use hostshare_common::vertex::VertexFormat;
use hostshare_common::{MatrixKind, ScalarKind, VectorType};
use hostshare_layout::analyze::analyze;
use hostshare_layout::error::SchemaError;
use hostshare_layout::offsets::offsets_for_props;
use hostshare_layout::resolve::{
    alignment_of, custom_size_of, member_alignment, size_of, stride_of, LayoutSize,
};
use hostshare_layout::schema::{Family, Schema, SchemaNode};

/// A schema node whose bytes are produced in one piece.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Leaf {
    Scalar(ScalarKind),
    Vector(VectorType),
    Matrix(MatrixKind),
    Vertex(VertexFormat),
}

impl Leaf {
    pub fn of(schema: &Schema) -> Option<Leaf> {
        match schema.node() {
            SchemaNode::Scalar(kind) | SchemaNode::Atomic(kind) => Some(Leaf::Scalar(*kind)),
            SchemaNode::Vector(vector) => Some(Leaf::Vector(*vector)),
            SchemaNode::Matrix(matrix) => Some(Leaf::Matrix(*matrix)),
            SchemaNode::Vertex(format) => Some(Leaf::Vertex(*format)),
            _ => None,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            Leaf::Scalar(kind) => kind.byte_size(),
            Leaf::Vector(vector) => vector.byte_size(),
            Leaf::Matrix(matrix) => matrix.byte_size(),
            Leaf::Vertex(format) => format.byte_size(),
        }
    }
}

fn mismatch(schema: &Schema, value: &Value) -> CodecError {
    CodecError::ValueMismatch {
        expected: schema.to_string(),
        found: value.kind_name(),
    }
}

fn length_mismatch(schema: &Schema, expected: usize, found: usize) -> CodecError {
    CodecError::LengthMismatch {
        schema: schema.to_string(),
        expected,
        found,
    }
}

pub(crate) fn encode_scalar(
    kind: ScalarKind,
    scalar: &Scalar,
    schema: &Schema,
) -> Result<Packed> {
    let err = || CodecError::ValueMismatch {
        expected: schema.to_string(),
        found: scalar.to_string(),
    };
    let mut out = Packed::default();
    match kind {
        ScalarKind::Bool => return Err(CodecError::NotHostShareable(schema.to_string())),
        ScalarKind::F16 => {
            let half = match scalar {
                Scalar::F16(half) => *half,
                _ => f16::from_f32(scalar.to_f32().ok_or_else(err)?),
            };
            out.push(&half.to_le_bytes())
        }
        ScalarKind::F32 => out.push(&scalar.to_f32().ok_or_else(err)?.to_le_bytes()),
        ScalarKind::I32 => out.push(&scalar.cast::<i32>().ok_or_else(err)?.to_le_bytes()),
        ScalarKind::U32 => out.push(&scalar.cast::<u32>().ok_or_else(err)?.to_le_bytes()),
        ScalarKind::U16 => out.push(&scalar.cast::<u16>().ok_or_else(err)?.to_le_bytes()),
    }
    Ok(out)
}

fn check_scalar(kind: ScalarKind, schema: &Schema) -> Result<()> {
    if kind.is_host_shareable() {
        Ok(())
    } else {
        Err(CodecError::NotHostShareable(schema.to_string()))
    }
}

fn check_vector_component(vector: VectorType, schema: &Schema) -> Result<()> {
    check_scalar(vector.component, schema)?;
    if vector.component == ScalarKind::U16 {
        return Err(CodecError::UnsupportedPrimitive(schema.to_string()));
    }
    Ok(())
}

/// Encode a leaf value, handing every run of bytes to `emit` with its offset from the start
/// of the leaf.
pub(crate) fn encode_leaf(
    leaf: Leaf,
    schema: &Schema,
    value: &Value,
    emit: &mut dyn FnMut(usize, &[u8]),
) -> Result<()> {
    match leaf {
        Leaf::Scalar(kind) => {
            check_scalar(kind, schema)?;
            let Value::Scalar(scalar) = value else {
                return Err(mismatch(schema, value));
            };
            emit(0, encode_scalar(kind, scalar, schema)?.as_bytes());
        }
        Leaf::Vector(vector) => {
            check_vector_component(vector, schema)?;
            let Value::Vector(components) = value else {
                return Err(mismatch(schema, value));
            };
            if components.len() != vector.len.count() {
                return Err(length_mismatch(schema, vector.len.count(), components.len()));
            }
            let mut out = Packed::default();
            for component in components {
                out.push(encode_scalar(vector.component, component, schema)?.as_bytes());
            }
            emit(0, out.as_bytes());
        }
        Leaf::Matrix(matrix) => {
            let Value::Matrix(columns) = value else {
                return Err(mismatch(schema, value));
            };
            if columns.len() != matrix.columns() {
                return Err(length_mismatch(schema, matrix.columns(), columns.len()));
            }
            let rows = matrix.column_type().len.count();
            for (index, column) in columns.iter().enumerate() {
                if column.len() != rows {
                    return Err(length_mismatch(schema, rows, column.len()));
                }
                let mut out = Packed::default();
                for component in column {
                    out.push(&component.to_le_bytes());
                }
                emit(index * matrix.column_stride(), out.as_bytes());
            }
        }
        Leaf::Vertex(format) => {
            emit(0, packed::encode_vertex(format, value)?.as_bytes());
        }
    }
    Ok(())
}

/// The family that the children of `schema` are laid out in.
fn child_family(schema: &Schema) -> Family {
    match schema.node() {
        SchemaNode::LooseStruct(_) | SchemaNode::Disarray(_) => Family::Loose,
        _ => Family::Strict,
    }
}

fn member_size(family: Family, schema: &Schema) -> Result<usize> {
    let size = match family {
        Family::Strict => size_of(schema)?,
        Family::Loose => custom_size_of(schema)?,
    };
    Ok(size.sized_or_err(schema)?)
}

/// Align the sink for `schema` as a member of a parent in `family`, then write `value`.
pub(crate) fn encode_member<S: ByteSink + ?Sized>(
    sink: &mut S,
    schema: &Schema,
    family: Family,
    value: &Value,
) -> Result<()> {
    sink.align_to(member_alignment(family, schema));
    encode_placed(sink, schema, family, value)
}

/// Write `value` at the sink's position, which is already the member's offset.
///
/// Children are placed relative to the start of their parent, not aligned against the
/// absolute position, so loose layouts with aligned members land where their offsets say.
pub(crate) fn encode_placed<S: ByteSink + ?Sized>(
    sink: &mut S,
    schema: &Schema,
    family: Family,
    value: &Value,
) -> Result<()> {
    if let SchemaNode::Pointer(_) = schema.node() {
        return Err(CodecError::NotHostShareable(schema.to_string()));
    }
    let start = sink.position();

    if let Some(leaf) = Leaf::of(schema) {
        encode_leaf(leaf, schema, value, &mut |offset, bytes| {
            sink.seek(start + offset);
            sink.write_bytes(bytes);
        })?;
        sink.seek(start + leaf.byte_size());
        return Ok(());
    }

    match schema.node() {
        SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => {
            let Value::Struct(fields) = value else {
                return Err(mismatch(schema, value));
            };
            check_unknown_fields(schema, fields)?;
            let size = member_size(family, schema)?;
            let offsets = offsets_for_props(schema)?;
            let family = child_family(schema);
            for (field, (_, placement)) in s.fields().iter().zip(offsets.iter()) {
                let value = fields
                    .get(field.name.as_str())
                    .ok_or_else(|| CodecError::MissingField {
                        schema: schema.to_string(),
                        field: field.name.clone(),
                    })?;
                sink.seek(start + placement.offset);
                encode_placed(sink, &field.schema, family, value)?;
            }
            sink.seek(start + size);
        }
        SchemaNode::Array(array) | SchemaNode::Disarray(array) => {
            let size = member_size(family, schema)?;
            let Value::Array(elements) = value else {
                return Err(mismatch(schema, value));
            };
            if elements.len() != array.count() {
                return Err(length_mismatch(schema, array.count(), elements.len()));
            }
            let family = child_family(schema);
            let stride = stride_of(array, family)?;
            for (index, element) in elements.iter().enumerate() {
                sink.seek(start + index * stride);
                encode_placed(sink, array.element(), family, element)?;
            }
            sink.seek(start + size);
        }
        SchemaNode::Decorated(decorated) => {
            let size = member_size(family, schema)?;
            encode_placed(sink, decorated.inner(), family, value)?;
            sink.seek(start + size);
        }
        _ => return Err(CodecError::UnsupportedPrimitive(schema.to_string())),
    }
    Ok(())
}

pub(crate) fn check_unknown_fields(
    schema: &Schema,
    fields: &FastHashMap<FieldName, Value>,
) -> Result<()> {
    let (SchemaNode::Struct(s) | SchemaNode::LooseStruct(s)) = schema.node() else {
        return Ok(());
    };
    match fields.keys().find(|name| s.field(name).is_none()) {
        Some(name) => Err(SchemaError::UnknownField {
            schema: schema.to_string(),
            field: name.clone(),
        }
        .into()),
        None => Ok(()),
    }
}

fn decode_scalar(kind: ScalarKind, bytes: &[u8], schema: &Schema) -> Result<Scalar> {
    let le16 = || [bytes[0], bytes[1]];
    let le32 = || [bytes[0], bytes[1], bytes[2], bytes[3]];
    Ok(match kind {
        ScalarKind::Bool => return Err(CodecError::NotHostShareable(schema.to_string())),
        ScalarKind::F16 => Scalar::F16(f16::from_le_bytes(le16())),
        ScalarKind::U16 => Scalar::U16(u16::from_le_bytes(le16())),
        ScalarKind::F32 => Scalar::F32(f32::from_le_bytes(le32())),
        ScalarKind::I32 => Scalar::I32(i32::from_le_bytes(le32())),
        ScalarKind::U32 => Scalar::U32(u32::from_le_bytes(le32())),
    })
}

fn decode_leaf(leaf: Leaf, schema: &Schema, reader: &mut BufferReader) -> Result<Value> {
    let start = reader.position();
    let value = match leaf {
        Leaf::Scalar(kind) => {
            check_scalar(kind, schema)?;
            let bytes = reader.read_bytes(kind.byte_size())?;
            Value::Scalar(decode_scalar(kind, bytes, schema)?)
        }
        Leaf::Vector(vector) => {
            check_vector_component(vector, schema)?;
            let bytes = reader.read_bytes(vector.byte_size())?;
            let components = bytes
                .chunks_exact(vector.component.byte_size())
                .map(|chunk| decode_scalar(vector.component, chunk, schema))
                .collect::<Result<_>>()?;
            Value::Vector(components)
        }
        Leaf::Matrix(matrix) => {
            let column = matrix.column_type();
            let mut columns = Vec::with_capacity(matrix.columns());
            for index in 0..matrix.columns() {
                reader.seek(start + index * matrix.column_stride());
                let bytes = reader.read_bytes(column.byte_size())?;
                columns.push(
                    bytes
                        .chunks_exact(4)
                        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                        .collect(),
                );
            }
            Value::Matrix(columns)
        }
        Leaf::Vertex(format) => {
            let bytes = reader.read_bytes(format.byte_size())?;
            packed::decode_vertex(format, bytes)
        }
    };
    reader.seek(start + leaf.byte_size());
    Ok(value)
}

/// Align the reader for `schema` as a member of a parent in `family`, then read a value.
pub(crate) fn decode_member(
    reader: &mut BufferReader,
    schema: &Schema,
    family: Family,
) -> Result<Value> {
    reader.align_to(member_alignment(family, schema));
    decode_placed(reader, schema, family)
}

fn decode_placed(reader: &mut BufferReader, schema: &Schema, family: Family) -> Result<Value> {
    if let SchemaNode::Pointer(_) = schema.node() {
        return Err(CodecError::NotHostShareable(schema.to_string()));
    }
    let start = reader.position();

    if let Some(leaf) = Leaf::of(schema) {
        return decode_leaf(leaf, schema, reader);
    }

    let value = match schema.node() {
        SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => {
            let size = member_size(family, schema)?;
            let offsets = offsets_for_props(schema)?;
            let family = child_family(schema);
            let mut fields = FastHashMap::default();
            for (field, (_, placement)) in s.fields().iter().zip(offsets.iter()) {
                reader.seek(start + placement.offset);
                fields.insert(field.name.clone(), decode_placed(reader, &field.schema, family)?);
            }
            reader.seek(start + size);
            Value::Struct(fields)
        }
        SchemaNode::Array(array) | SchemaNode::Disarray(array) => {
            let size = member_size(family, schema)?;
            let family = child_family(schema);
            let stride = stride_of(array, family)?;
            let mut elements = Vec::with_capacity(array.count());
            for index in 0..array.count() {
                reader.seek(start + index * stride);
                elements.push(decode_placed(reader, array.element(), family)?);
            }
            reader.seek(start + size);
            Value::Array(elements)
        }
        SchemaNode::Decorated(decorated) => {
            let size = member_size(family, schema)?;
            let value = decode_placed(reader, decorated.inner(), family)?;
            reader.seek(start + size);
            value
        }
        _ => return Err(CodecError::UnsupportedPrimitive(schema.to_string())),
    };
    Ok(value)
}

/// Write `value` at the writer's position using the generic writer.
///
/// The whole value is checked against the schema before any byte is written, so a failed
/// write leaves the destination and its position untouched.
pub fn write_value<S: ByteSink + ?Sized>(
    sink: &mut S,
    schema: &Schema,
    value: &Value,
) -> Result<()> {
    let family = schema.family();
    encode_member(&mut Measure::at(sink.position()), schema, family, value)?;
    encode_member(sink, schema, family, value)
}

/// Write `value` at the writer's position, using a compiled writer for the schema unless
/// `options` disables it.
pub fn write_value_with<S: ByteSink + ?Sized>(
    sink: &mut S,
    schema: &Schema,
    value: &Value,
    options: &CodecOptions,
) -> Result<()> {
    if !options.disable_compiled_writer {
        if let Some(program) = compiled::program_for(schema) {
            return program.write(sink, value);
        }
    }
    write_value(sink, schema, value)
}

/// Read a value at the reader's position.
///
/// On failure the reader is left where it was.
pub fn read_value(reader: &mut BufferReader, schema: &Schema) -> Result<Value> {
    let position = reader.position();
    let value = decode_member(reader, schema, schema.family());
    if value.is_err() {
        reader.seek(position);
    }
    value
}

/// Encode a value into a new buffer of exactly the schema's size.
pub fn encode(schema: &Schema, value: &Value) -> Result<Vec<u8>> {
    encode_with(schema, value, &CodecOptions::default())
}

pub fn encode_with(schema: &Schema, value: &Value, options: &CodecOptions) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_value_with(&mut BufferWriter::new(&mut buffer), schema, value, options)?;
    Ok(buffer)
}

/// Decode a value from the start of `bytes`.
pub fn decode(schema: &Schema, bytes: &[u8]) -> Result<Value> {
    read_value(&mut BufferReader::new(bytes), schema)
}

/// Fail unless every leaf of `schema` is host-shareable.
fn ensure_host_shareable(schema: &Schema) -> Result<()> {
    match schema.node() {
        SchemaNode::Scalar(kind) => check_scalar(*kind, schema),
        SchemaNode::Pointer(_) => Err(CodecError::NotHostShareable(schema.to_string())),
        SchemaNode::Vector(vector) => check_vector_component(*vector, schema),
        SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => s
            .fields()
            .iter()
            .try_for_each(|field| ensure_host_shareable(&field.schema)),
        SchemaNode::Array(array) | SchemaNode::Disarray(array) => {
            ensure_host_shareable(array.element())
        }
        SchemaNode::Decorated(decorated) => ensure_host_shareable(decorated.inner()),
        _ => Ok(()),
    }
}

fn ensure_pod_layout<T>(schema: &Schema) -> Result<usize> {
    ensure_host_shareable(schema)?;
    let info = analyze(schema)?;
    let size = std::mem::size_of::<T>();
    if !info.is_contiguous || info.size != LayoutSize::Sized(size) {
        return Err(CodecError::NotContiguous(schema.to_string()));
    }
    Ok(size)
}

/// Copy a plain-old-data host value as one block.
///
/// The schema must be contiguous and exactly as large as `T`. Bytes are copied in the
/// host's byte order, which matches the encoded layout on little-endian targets.
pub fn write_pod<T: bytemuck::Pod, S: ByteSink + ?Sized>(
    sink: &mut S,
    schema: &Schema,
    value: &T,
) -> Result<()> {
    ensure_pod_layout::<T>(schema)?;
    sink.align_to(alignment_of(schema));
    sink.write_bytes(bytemuck::bytes_of(value));
    Ok(())
}

/// Read a plain-old-data host value as one block.
pub fn read_pod<T: bytemuck::Pod>(reader: &mut BufferReader, schema: &Schema) -> Result<T> {
    let size = ensure_pod_layout::<T>(schema)?;
    let position = reader.position();
    reader.align_to(alignment_of(schema));
    match reader.read_bytes(size) {
        Ok(bytes) => Ok(bytemuck::pod_read_unaligned(bytes)),
        Err(err) => {
            reader.seek(position);
            Err(err)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hostshare_common::attributes::AddressSpace;

    fn generic(schema: &Schema, value: &Value) -> Vec<u8> {
        let mut buffer = Vec::new();
        write_value(&mut BufferWriter::new(&mut buffer), schema, value).unwrap();
        buffer
    }

    #[test]
    pub fn struct_with_padding() {
        let schema = Schema::structure("S", [("a", Schema::u32()), ("b", Schema::vec3f())])
            .unwrap();
        let value = Value::structure([
            ("a", Value::from(3u32)),
            ("b", Value::from([1.0f32, 2.0, 3.0])),
        ]);
        let bytes = generic(&schema, &value);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..16], &[0; 12]);
        assert_eq!(&bytes[16..20], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[24..28], &3.0f32.to_le_bytes());
        assert_eq!(decode(&schema, &bytes), Ok(value));
    }

    #[test]
    pub fn matrix_columns_are_strided() {
        let schema = Schema::mat3x3f();
        let value = Value::from([[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let bytes = generic(&schema, &value);
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[16..20], &4.0f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &[0; 4]);
        assert_eq!(decode(&schema, &bytes), Ok(value));
    }

    #[test]
    pub fn half_floats_round_to_nearest_even() {
        let schema = Schema::f16();
        // 1 + 2^-11 lies exactly between 1.0 and the next half, and rounds to even
        let bytes = generic(&schema, &Value::from(1.0f32 + 2f32.powi(-11)));
        assert_eq!(bytes, f16::ONE.to_le_bytes().to_vec());

        let bytes = generic(&schema, &Value::from(f32::INFINITY));
        assert_eq!(bytes, f16::INFINITY.to_le_bytes().to_vec());

        let bytes = generic(&schema, &Value::from(f32::NAN));
        let Ok(Value::Scalar(Scalar::F16(nan))) = decode(&schema, &bytes) else {
            panic!("expected an f16")
        };
        assert!(nan.is_nan());

        // smallest subnormal half
        let bytes = generic(&schema, &Value::from(2f32.powi(-24)));
        assert_eq!(bytes, vec![1, 0]);
    }

    #[test]
    pub fn not_host_shareable_leaves() {
        let ptr = Schema::ptr(AddressSpace::Function, Schema::u32());
        for schema in [Schema::bool(), Schema::vec2b(), ptr] {
            let mut buffer = Vec::new();
            assert!(matches!(
                write_value(&mut BufferWriter::new(&mut buffer), &schema, &Value::from(true)),
                Err(CodecError::NotHostShareable(_))
            ));
            assert!(buffer.is_empty());
            assert!(matches!(
                decode(&schema, &[0; 16]),
                Err(CodecError::NotHostShareable(_))
            ));
        }
        assert!(matches!(
            encode(&Schema::bool(), &Value::from([1u32, 2])),
            Err(CodecError::NotHostShareable(_))
        ));
    }

    #[test]
    pub fn u16_vectors_are_unsupported() {
        let schema = Schema::vector(ScalarKind::U16, hostshare_common::VectorLen::X2);
        assert!(matches!(
            encode(&schema, &Value::from([1u16, 2])),
            Err(CodecError::UnsupportedPrimitive(_))
        ));
        assert_eq!(encode(&Schema::u16(), &Value::from(7u16)), Ok(vec![7, 0]));
    }

    #[test]
    pub fn failed_writes_leave_the_buffer_untouched() {
        let schema = Schema::structure("S", [("a", Schema::u32()), ("b", Schema::vec3f())])
            .unwrap();
        let value = Value::structure([
            ("a", Value::from(3u32)),
            ("b", Value::from([1.0f32, 2.0])),
        ]);
        let mut buffer = vec![0xAA; 4];
        let mut writer = BufferWriter::at(&mut buffer, 4);
        assert!(matches!(
            write_value(&mut writer, &schema, &value),
            Err(CodecError::LengthMismatch { expected: 3, found: 2, .. })
        ));
        assert_eq!(writer.position(), 4);
        assert_eq!(buffer, vec![0xAA; 4]);
    }

    #[test]
    pub fn value_shape_errors() {
        let schema = Schema::structure("S", [("a", Schema::u32())]).unwrap();
        assert!(matches!(
            encode(&schema, &Value::structure::<&str, Value>([])),
            Err(CodecError::MissingField { .. })
        ));
        assert!(matches!(
            encode(
                &schema,
                &Value::structure([("a", 1u32), ("z", 2u32)])
            ),
            Err(CodecError::Schema(SchemaError::UnknownField { .. }))
        ));
        assert!(matches!(
            encode(&schema, &Value::from(1u32)),
            Err(CodecError::ValueMismatch { .. })
        ));
        assert!(matches!(
            encode(&Schema::u32(), &Value::from(-1i32)),
            Err(CodecError::ValueMismatch { .. })
        ));
    }

    #[test]
    pub fn unbounded_arrays_cannot_be_written() {
        let schema = Schema::runtime_array(Schema::u32()).unwrap();
        assert!(matches!(
            encode(&schema, &Value::array([1u32, 2])),
            Err(CodecError::Schema(SchemaError::UnboundedValue(_)))
        ));
        let sized = schema.with_runtime_length(2).unwrap();
        assert_eq!(
            encode(&sized, &Value::array([1u32, 2])),
            Ok(vec![1, 0, 0, 0, 2, 0, 0, 0])
        );
    }

    #[test]
    pub fn decorated_members() {
        let schema = Schema::structure(
            "S",
            [
                ("a", Schema::u32()),
                ("b", Schema::align(16, Schema::u32()).unwrap()),
                ("c", Schema::size(8, Schema::f32()).unwrap()),
            ],
        )
        .unwrap();
        let value = Value::structure([
            ("a", Value::from(1u32)),
            ("b", Value::from(2u32)),
            ("c", Value::from(3.0f32)),
        ]);
        let bytes = generic(&schema, &value);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[16..20], &2u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &3.0f32.to_le_bytes());
        assert_eq!(decode(&schema, &bytes), Ok(value));
    }

    #[test]
    pub fn loose_layouts_pack_vertex_formats() {
        let schema = Schema::loose_struct(
            "Vertex",
            [
                ("position", Schema::vec3f()),
                ("color", Schema::vertex(VertexFormat::Unorm8x4Bgra)),
                ("uv", Schema::vertex(VertexFormat::Unorm16x2)),
            ],
        )
        .unwrap();
        let vertices = Schema::disarray(schema.clone(), 2).unwrap();
        let vertex = Value::structure([
            ("position", Value::from([1.0f32, 2.0, 3.0])),
            ("color", Value::from([1.0f32, 0.0, 0.0, 1.0])),
            ("uv", Value::from([0.0f32, 1.0])),
        ]);
        let bytes = generic(&vertices, &Value::array([vertex.clone(), vertex.clone()]));
        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[12..16], &[0, 0, 255, 255]);
        assert_eq!(&bytes[16..20], &[0, 0, 0xff, 0xff]);
        assert_eq!(&bytes[20..24], &1.0f32.to_le_bytes());

        let decoded = decode(&vertices, &bytes).unwrap();
        assert_eq!(decoded.as_slice().map(<[Value]>::len), Some(2));
        assert_eq!(decoded.as_slice().unwrap()[1], vertex);
    }

    #[test]
    pub fn pod_copies_require_contiguous_layouts() {
        #[repr(C)]
        #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
        struct Light {
            position: [f32; 3],
            intensity: f32,
        }

        let schema = Schema::structure(
            "Light",
            [("position", Schema::vec3f()), ("intensity", Schema::f32())],
        )
        .unwrap();
        let light = Light {
            position: [1.0, 2.0, 3.0],
            intensity: 0.5,
        };

        let mut buffer = Vec::new();
        write_pod(&mut BufferWriter::new(&mut buffer), &schema, &light).unwrap();
        assert_eq!(
            decode(&schema, &buffer),
            Ok(Value::structure([
                ("position", Value::from([1.0f32, 2.0, 3.0])),
                ("intensity", Value::from(0.5f32)),
            ]))
        );
        assert_eq!(read_pod::<Light>(&mut BufferReader::new(&buffer), &schema), Ok(light));

        let padded = Schema::structure("P", [("position", Schema::vec3f())]).unwrap();
        assert!(matches!(
            write_pod(&mut BufferWriter::new(&mut Vec::new()), &padded, &[0f32; 4]),
            Err(CodecError::NotContiguous(_))
        ));
    }
}
