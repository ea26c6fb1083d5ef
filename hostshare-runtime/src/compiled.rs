//! Compiled writers.
//!
//! A compiled writer is a flat program built once per schema. Every field offset, array
//! stride and leaf encoding is resolved at compile time, so writing a value only walks the
//! value, never the schema's layout rules. Programs are cached per schema identity.
//!
//! Compiled writers produce exactly the bytes of the generic writer. When they are not
//! available, writes fall back to the generic writer after a single warning.

#![cfg_attr(not(feature = "compiled-writer"), allow(dead_code))]

use crate::codec::{check_unknown_fields, encode_leaf, Leaf};
use crate::cursor::ByteSink;
use crate::error::{CodecError, CompileError, Result};
use crate::value::Value;
use hostshare_common::map::FieldName;
use hostshare_layout::cache::IdentityCache;
use hostshare_layout::schema::Schema;
use once_cell::sync::Lazy;
use std::sync::{Arc, Once};

static PROGRAMS: Lazy<IdentityCache<Option<Arc<Program>>>> = Lazy::new(IdentityCache::new);
static FALLBACK_WARNING: Once = Once::new();

/// One instruction of a compiled writer.
///
/// Offsets are relative to the start of the innermost enclosing array element, or the
/// start of the program.
#[derive(Debug)]
enum Op {
    /// Encode the current value as a leaf at `offset`.
    Leaf {
        offset: usize,
        leaf: Leaf,
        schema: Schema,
    },
    /// Run one op per field, against that field's value.
    Struct {
        schema: Schema,
        fields: Box<[(FieldName, Op)]>,
    },
    /// Run `element` once per array element, `stride` bytes apart.
    Each {
        offset: usize,
        count: usize,
        stride: usize,
        schema: Schema,
        element: Box<Op>,
    },
}

/// A compiled writer for one schema.
#[derive(Debug)]
pub struct Program {
    align: usize,
    size: usize,
    root: Op,
}

/// A run of encoded bytes waiting to be written.
struct Patch {
    offset: usize,
    bytes: [u8; 16],
    len: usize,
}

impl Program {
    /// Write `value` at the sink's position.
    ///
    /// Every leaf is encoded before the first byte is written, so a failure leaves the sink
    /// untouched.
    pub fn write<S: ByteSink + ?Sized>(&self, sink: &mut S, value: &Value) -> Result<()> {
        let mut patches = Vec::new();
        run(&self.root, 0, value, &mut patches)?;

        sink.align_to(self.align);
        let start = sink.position();
        for patch in &patches {
            sink.seek(start + patch.offset);
            sink.write_bytes(&patch.bytes[..patch.len]);
        }
        sink.seek(start + self.size);
        Ok(())
    }
}

fn run(op: &Op, base: usize, value: &Value, patches: &mut Vec<Patch>) -> Result<()> {
    match op {
        Op::Leaf {
            offset,
            leaf,
            schema,
        } => encode_leaf(*leaf, schema, value, &mut |relative, bytes| {
            let mut patch = Patch {
                offset: base + offset + relative,
                bytes: [0; 16],
                len: bytes.len(),
            };
            patch.bytes[..bytes.len()].copy_from_slice(bytes);
            patches.push(patch);
        }),
        Op::Struct { schema, fields } => {
            let Value::Struct(values) = value else {
                return Err(CodecError::ValueMismatch {
                    expected: schema.to_string(),
                    found: value.kind_name(),
                });
            };
            check_unknown_fields(schema, values)?;
            for (name, op) in fields.iter() {
                let value = values
                    .get(name.as_str())
                    .ok_or_else(|| CodecError::MissingField {
                        schema: schema.to_string(),
                        field: name.clone(),
                    })?;
                run(op, base, value, patches)?;
            }
            Ok(())
        }
        Op::Each {
            offset,
            count,
            stride,
            schema,
            element,
        } => {
            let Value::Array(elements) = value else {
                return Err(CodecError::ValueMismatch {
                    expected: schema.to_string(),
                    found: value.kind_name(),
                });
            };
            if elements.len() != *count {
                return Err(CodecError::LengthMismatch {
                    schema: schema.to_string(),
                    expected: *count,
                    found: elements.len(),
                });
            }
            for (index, value) in elements.iter().enumerate() {
                run(element, base + offset + index * stride, value, patches)?;
            }
            Ok(())
        }
    }
}

#[cfg(feature = "compiled-writer")]
mod compile {
    use super::{Op, Program};
    use crate::codec::Leaf;
    use crate::error::CompileError;
    use hostshare_common::ScalarKind;
    use hostshare_layout::offsets::offsets_for_props;
    use hostshare_layout::resolve::{member_alignment, size_of, stride_of};
    use hostshare_layout::schema::{Family, Schema, SchemaNode};

    type Result<T> = std::result::Result<T, CompileError>;

    fn unsupported(schema: &Schema) -> CompileError {
        CompileError::Unsupported(schema.to_string())
    }

    pub fn compile(schema: &Schema) -> Result<Program> {
        let family = schema.family();
        let size = size_of(schema)
            .ok()
            .and_then(|size| size.bytes())
            .ok_or_else(|| unsupported(schema))?;
        Ok(Program {
            align: member_alignment(family, schema),
            size,
            root: compile_member(schema, family, 0)?,
        })
    }

    /// Compile `schema` placed at `offset`, which the caller has already aligned.
    fn compile_member(schema: &Schema, family: Family, offset: usize) -> Result<Op> {
        if let Some(leaf) = Leaf::of(schema) {
            return match leaf {
                Leaf::Scalar(ScalarKind::Bool) => Err(unsupported(schema)),
                Leaf::Vector(vector)
                    if matches!(vector.component, ScalarKind::Bool | ScalarKind::U16) =>
                {
                    Err(unsupported(schema))
                }
                _ => Ok(Op::Leaf {
                    offset,
                    leaf,
                    schema: schema.clone(),
                }),
            };
        }

        match schema.node() {
            SchemaNode::Struct(s) | SchemaNode::LooseStruct(s) => {
                let child = match schema.node() {
                    SchemaNode::LooseStruct(_) => Family::Loose,
                    _ => Family::Strict,
                };
                let offsets = offsets_for_props(schema).map_err(|_| unsupported(schema))?;
                let fields = s
                    .fields()
                    .iter()
                    .zip(offsets.iter())
                    .map(|(field, (_, placement))| {
                        compile_member(&field.schema, child, offset + placement.offset)
                            .map(|op| (field.name.clone(), op))
                    })
                    .collect::<Result<_>>()?;
                Ok(Op::Struct {
                    schema: schema.clone(),
                    fields,
                })
            }
            SchemaNode::Array(array) | SchemaNode::Disarray(array) => {
                if array.is_unbounded() {
                    return Err(unsupported(schema));
                }
                let child = match schema.node() {
                    SchemaNode::Disarray(_) => Family::Loose,
                    _ => Family::Strict,
                };
                let stride = stride_of(array, child).map_err(|_| unsupported(schema))?;
                Ok(Op::Each {
                    offset,
                    count: array.count(),
                    stride,
                    schema: schema.clone(),
                    element: Box::new(compile_member(array.element(), child, 0)?),
                })
            }
            // the decorated alignment is already part of `offset`
            SchemaNode::Decorated(decorated) => compile_member(decorated.inner(), family, offset),
            _ => Err(unsupported(schema)),
        }
    }
}

#[cfg(feature = "compiled-writer")]
fn compile(schema: &Schema) -> std::result::Result<Program, CompileError> {
    compile::compile(schema)
}

#[cfg(not(feature = "compiled-writer"))]
fn compile(_: &Schema) -> std::result::Result<Program, CompileError> {
    Err(CompileError::CodeGenerationUnavailable)
}

/// The compiled writer for `schema`, compiling it on first use.
///
/// Returns `None` when the schema must be written by the generic writer.
pub(crate) fn program_for(schema: &Schema) -> Option<Arc<Program>> {
    PROGRAMS.get_or_insert_with(schema, || match compile(schema) {
        Ok(program) => {
            log::debug!("compiled a {} byte writer for `{schema}`", program.size);
            Some(Arc::new(program))
        }
        #[cfg(not(feature = "compiled-writer"))]
        Err(CompileError::CodeGenerationUnavailable) => {
            FALLBACK_WARNING.call_once(|| {
                log::warn!("compiled writers are unavailable, falling back to the generic writer")
            });
            None
        }
        #[cfg(feature = "compiled-writer")]
        Err(err) => {
            log::debug!("{err}, using the generic writer");
            None
        }
    })
}
