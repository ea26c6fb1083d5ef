//! Per-field byte offsets of struct-like schemas.

use crate::cache::IdentityCache;
use crate::error::{Result, SchemaError};
use crate::resolve::{struct_layout, LayoutSize};
use crate::schema::{Family, Schema, SchemaNode};
use hostshare_common::map::{FastHashMap, FieldName};
use once_cell::sync::Lazy;
use std::sync::Arc;

static OFFSETS: Lazy<IdentityCache<Arc<StructOffsets>>> = Lazy::new(IdentityCache::new);

/// The placement of a single struct field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FieldOffset {
    /// The byte offset of the field from the start of the struct.
    pub offset: usize,
    pub size: LayoutSize,
    /// The number of padding bytes between the end of this field and the start of the next,
    /// or the end of the struct for the last field.
    pub padding: usize,
}

/// Field offsets of a struct, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructOffsets {
    fields: Vec<(FieldName, FieldOffset)>,
    index: FastHashMap<FieldName, usize>,
}

impl StructOffsets {
    pub fn get(&self, name: &str) -> Option<&FieldOffset> {
        self.index.get(name).map(|&index| &self.fields[index].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOffset)> {
        self.fields
            .iter()
            .map(|(name, offset)| (name.as_str(), offset))
    }

    /// The offset of the field at `index` in declaration order.
    pub fn at(&self, index: usize) -> Option<&FieldOffset> {
        self.fields.get(index).map(|(_, offset)| offset)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Compute the offset, size and trailing padding of every field of a struct or loose struct.
///
/// Decorations on the struct itself are looked through.
pub fn offsets_for_props(schema: &Schema) -> Result<Arc<StructOffsets>> {
    OFFSETS.get_or_try_insert_with(schema, || compute_offsets(schema).map(Arc::new))
}

fn compute_offsets(schema: &Schema) -> Result<StructOffsets> {
    let (s, family) = match schema.undecorated().node() {
        SchemaNode::Struct(s) => (s, Family::Strict),
        SchemaNode::LooseStruct(s) => (s, Family::Loose),
        _ => {
            return Err(SchemaError::InvalidAccess {
                schema: schema.to_string(),
                access: "fields".to_string(),
            })
        }
    };

    let layout = struct_layout(s, family)?;
    let mut fields: Vec<(FieldName, FieldOffset)> = Vec::with_capacity(s.fields().len());

    for (field, member) in s.fields().iter().zip(&layout.members) {
        // the gap introduced by aligning this field belongs to the previous one
        if let Some((_, previous)) = fields.last_mut() {
            if let LayoutSize::Sized(size) = previous.size {
                previous.padding = member.offset - (previous.offset + size);
            }
        }
        fields.push((
            field.name.clone(),
            FieldOffset {
                offset: member.offset,
                size: member.size,
                padding: 0,
            },
        ));
    }

    if let (Some((_, last)), LayoutSize::Sized(total)) = (fields.last_mut(), layout.size) {
        if let LayoutSize::Sized(size) = last.size {
            last.padding = total - (last.offset + size);
        }
    }

    let index = fields
        .iter()
        .enumerate()
        .map(|(index, (name, _))| (name.clone(), index))
        .collect();

    Ok(StructOffsets { fields, index })
}
