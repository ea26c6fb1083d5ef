//! Write instructions for sparse updates.
//!
//! A [`PartialValue`] only names some fields and elements of a value. Building write
//! instructions encodes every supplied part at its offset, then merges parts that are only
//! separated by padding into a single byte range.

use crate::codec::encode_placed;
use crate::cursor::BufferWriter;
use crate::error::{CodecError, Result};
use crate::value::{IndexedValue, PartialValue, Value};
use hostshare_common::map::{FastHashMap, FieldName};
use hostshare_layout::error::SchemaError;
use hostshare_layout::offsets::offsets_for_props;
use hostshare_layout::resolve::{custom_size_of, size_of, stride_of, LayoutSize};
use hostshare_layout::schema::{Family, Schema, SchemaNode, StructSchema};
use std::ops::Range;

/// A contiguous run of bytes to copy into a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteInstruction {
    /// The byte offset from the start of the value.
    pub offset: usize,
    pub data: Vec<u8>,
}

impl WriteInstruction {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The byte range the instruction covers.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.data.len()
    }

    /// Copy the instruction's bytes into `buffer`.
    pub fn apply(&self, buffer: &mut [u8]) -> Result<()> {
        let size = buffer.len();
        let target = buffer
            .get_mut(self.range())
            .ok_or(CodecError::OutOfBounds {
                offset: self.offset,
                len: self.data.len(),
                size,
            })?;
        target.copy_from_slice(&self.data);
        Ok(())
    }
}

/// The bytes of one supplied part, and the padding that follows it before the next
/// sibling.
#[derive(Debug, Clone)]
struct Segment {
    start: usize,
    data: Vec<u8>,
    padding: usize,
}

impl Segment {
    fn end(&self) -> usize {
        self.start + self.data.len()
    }

    /// Whether `next` starts right after this segment's trailing padding.
    fn touches(&self, next: &Segment) -> bool {
        self.end().checked_add(self.padding) == Some(next.start)
    }

    fn extend(&mut self, next: Segment) {
        self.data.resize(self.data.len() + self.padding, 0);
        self.data.extend_from_slice(&next.data);
        self.padding = next.padding;
    }
}

#[derive(Default)]
struct Builder {
    segments: Vec<Segment>,
}

fn layout_size(family: Family, schema: &Schema) -> Result<LayoutSize> {
    Ok(match family {
        Family::Strict => size_of(schema)?,
        Family::Loose => custom_size_of(schema)?,
    })
}

fn partial_kind(partial: &PartialValue) -> String {
    match partial {
        PartialValue::Value(value) => value.kind_name(),
        PartialValue::Struct(_) => "a partial struct".to_string(),
        PartialValue::Array(_) => "a sparse array".to_string(),
    }
}

fn out_of_range(schema: &Schema, index: usize, count: usize) -> CodecError {
    SchemaError::IndexOutOfRange {
        schema: schema.to_string(),
        index,
        count,
    }
    .into()
}

fn mismatch(schema: &Schema, partial: &PartialValue) -> CodecError {
    CodecError::ValueMismatch {
        expected: schema.to_string(),
        found: partial_kind(partial),
    }
}

impl Builder {
    fn value(
        &mut self,
        schema: &Schema,
        family: Family,
        value: &Value,
        offset: usize,
        padding: usize,
    ) -> Result<()> {
        let size = layout_size(family, schema)?.sized_or_err(schema)?;
        let mut data = Vec::with_capacity(size);
        encode_placed(&mut BufferWriter::new(&mut data), schema, family, value)?;
        data.resize(size, 0);
        self.segments.push(Segment {
            start: offset,
            data,
            padding,
        });
        Ok(())
    }

    fn visit(
        &mut self,
        schema: &Schema,
        family: Family,
        partial: &PartialValue,
        offset: usize,
        padding: usize,
    ) -> Result<()> {
        if let PartialValue::Value(value) = partial {
            return self.value(schema, family, value, offset, padding);
        }

        match (schema.node(), partial) {
            (SchemaNode::Struct(s) | SchemaNode::LooseStruct(s), PartialValue::Struct(fields)) => {
                self.fields(schema, s, fields, offset, padding)
            }
            (SchemaNode::Array(array) | SchemaNode::Disarray(array), PartialValue::Array(entries)) => {
                let child = match schema.node() {
                    SchemaNode::Disarray(_) => Family::Loose,
                    _ => Family::Strict,
                };
                let stride = stride_of(array, child)?;
                let element = array.element();
                let element_size = layout_size(child, element)?.sized_or_err(element)?;
                let last = (!array.is_unbounded()).then(|| array.count().saturating_sub(1));

                for entry in latest_by_index(entries) {
                    if !array.is_unbounded() && entry.index >= array.count() {
                        return Err(out_of_range(schema, entry.index, array.count()));
                    }
                    let element_offset = entry
                        .index
                        .checked_mul(stride)
                        .and_then(|relative| relative.checked_add(offset))
                        .filter(|start| start.checked_add(stride).is_some())
                        .ok_or_else(|| out_of_range(schema, entry.index, array.count()))?;
                    let mut element_padding = stride - element_size;
                    if last == Some(entry.index) {
                        element_padding += padding;
                    }
                    self.visit(
                        element,
                        child,
                        &entry.value,
                        element_offset,
                        element_padding,
                    )?;
                }
                Ok(())
            }
            (SchemaNode::Decorated(decorated), _) => {
                let inner = decorated.inner();
                let extra = match (layout_size(family, schema)?, layout_size(family, inner)?) {
                    (LayoutSize::Sized(outer), LayoutSize::Sized(inner)) => outer - inner,
                    _ => 0,
                };
                self.visit(inner, family, partial, offset, padding + extra)
            }
            (SchemaNode::Pointer(_), _) => Err(CodecError::NotHostShareable(schema.to_string())),
            _ => Err(mismatch(schema, partial)),
        }
    }

    fn fields(
        &mut self,
        schema: &Schema,
        s: &StructSchema,
        fields: &FastHashMap<FieldName, PartialValue>,
        offset: usize,
        padding: usize,
    ) -> Result<()> {
        if let Some(name) = fields.keys().find(|name| s.field(name).is_none()) {
            return Err(SchemaError::UnknownField {
                schema: schema.to_string(),
                field: name.clone(),
            }
            .into());
        }

        let child = match schema.node() {
            SchemaNode::LooseStruct(_) => Family::Loose,
            _ => Family::Strict,
        };
        let offsets = offsets_for_props(schema)?;
        for (index, (field, (_, placement))) in s.fields().iter().zip(offsets.iter()).enumerate() {
            let Some(partial) = fields.get(field.name.as_str()) else {
                continue;
            };
            let mut field_padding = placement.padding;
            if index + 1 == s.fields().len() {
                field_padding += padding;
            }
            self.visit(
                &field.schema,
                child,
                partial,
                offset + placement.offset,
                field_padding,
            )?;
        }
        Ok(())
    }

    fn finish(self) -> Vec<WriteInstruction> {
        let mut runs: Vec<Segment> = Vec::new();
        for segment in self.segments {
            match runs.last_mut() {
                Some(run) if run.touches(&segment) => run.extend(segment),
                _ => runs.push(segment),
            }
        }

        runs.into_iter()
            .map(|run| WriteInstruction {
                offset: run.start,
                data: run.data,
            })
            .collect()
    }
}

/// Array entries in ascending index order. When an index appears more than once, the
/// entry listed last wins.
fn latest_by_index(entries: &[IndexedValue]) -> Vec<&IndexedValue> {
    let mut sorted: Vec<&IndexedValue> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.index);

    let mut latest: Vec<&IndexedValue> = Vec::with_capacity(sorted.len());
    for entry in sorted {
        match latest.last_mut() {
            Some(previous) if previous.index == entry.index => *previous = entry,
            _ => latest.push(entry),
        }
    }
    latest
}

/// Build the byte ranges that apply `partial` to a buffer holding a value of `schema`.
///
/// Supplied parts separated only by padding are merged into one instruction. Omitted
/// fields and elements are never covered, so the padding bytes an instruction spans are
/// always zero.
pub fn build_write_instructions(
    schema: &Schema,
    partial: &PartialValue,
) -> Result<Vec<WriteInstruction>> {
    let mut builder = Builder::default();
    builder.visit(schema, schema.family(), partial, 0, 0)?;
    Ok(builder.finish())
}
