//! Packed vertex format encodings.

use crate::error::{CodecError, Result};
use crate::value::{Scalar, Value};
use half::f16;
use hostshare_common::vertex::{FormatLayout, VertexComponent, VertexFormat};

/// The encoded bytes of one leaf, at most 16 bytes wide.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Packed {
    bytes: [u8; 16],
    len: usize,
}

impl Packed {
    pub fn push(&mut self, bytes: &[u8]) {
        self.bytes[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Round a normalized float to an `n`-bit unsigned integer.
fn unorm(value: f32, max: f32) -> f32 {
    (value.clamp(0.0, 1.0) * max).round()
}

fn snorm(value: f32, max: f32) -> f32 {
    (value.clamp(-1.0, 1.0) * max).round()
}

fn mismatch(format: VertexFormat, scalar: &Scalar) -> CodecError {
    CodecError::ValueMismatch {
        expected: format.to_string(),
        found: scalar.to_string(),
    }
}

/// The components of a vertex value: a scalar for one component formats, otherwise a
/// vector of exactly the format's component count.
fn components(format: VertexFormat, value: &Value) -> Result<Vec<Scalar>> {
    let count = format.component_count();
    match value {
        Value::Scalar(scalar) if count == 1 => Ok(vec![*scalar]),
        Value::Vector(components) if components.len() == count => Ok(components.clone()),
        Value::Vector(components) if count > 1 => Err(CodecError::LengthMismatch {
            schema: format.to_string(),
            expected: count,
            found: components.len(),
        }),
        _ => Err(CodecError::ValueMismatch {
            expected: format.to_string(),
            found: value.kind_name(),
        }),
    }
}

fn encode_component(
    format: VertexFormat,
    component: VertexComponent,
    scalar: &Scalar,
    out: &mut Packed,
) -> Result<()> {
    let err = || mismatch(format, scalar);
    match component {
        VertexComponent::Uint8 => out.push(&[scalar.cast::<u8>().ok_or_else(err)?]),
        VertexComponent::Sint8 => out.push(&scalar.cast::<i8>().ok_or_else(err)?.to_le_bytes()),
        VertexComponent::Unorm8 => {
            let value = scalar.to_f32().ok_or_else(err)?;
            out.push(&[unorm(value, 255.0) as u8])
        }
        VertexComponent::Snorm8 => {
            let value = scalar.to_f32().ok_or_else(err)?;
            out.push(&(snorm(value, 127.0) as i8).to_le_bytes())
        }
        VertexComponent::Uint16 => out.push(&scalar.cast::<u16>().ok_or_else(err)?.to_le_bytes()),
        VertexComponent::Sint16 => out.push(&scalar.cast::<i16>().ok_or_else(err)?.to_le_bytes()),
        VertexComponent::Unorm16 => {
            let value = scalar.to_f32().ok_or_else(err)?;
            out.push(&(unorm(value, 65535.0) as u16).to_le_bytes())
        }
        VertexComponent::Snorm16 => {
            let value = scalar.to_f32().ok_or_else(err)?;
            out.push(&(snorm(value, 32767.0) as i16).to_le_bytes())
        }
        VertexComponent::Float16 => {
            let value = match scalar {
                Scalar::F16(half) => *half,
                _ => f16::from_f32(scalar.to_f32().ok_or_else(err)?),
            };
            out.push(&value.to_le_bytes())
        }
        VertexComponent::Float32 => out.push(&scalar.to_f32().ok_or_else(err)?.to_le_bytes()),
        VertexComponent::Uint32 => out.push(&scalar.cast::<u32>().ok_or_else(err)?.to_le_bytes()),
        VertexComponent::Sint32 => out.push(&scalar.cast::<i32>().ok_or_else(err)?.to_le_bytes()),
    }
    Ok(())
}

/// Encode a vertex value.
pub(crate) fn encode_vertex(format: VertexFormat, value: &Value) -> Result<Packed> {
    let components = components(format, value)?;
    let mut out = Packed::default();

    match format.layout() {
        FormatLayout::Components { component, .. } => {
            for scalar in &components {
                encode_component(format, component, scalar, &mut out)?;
            }
        }
        FormatLayout::Unorm10_10_10_2 => {
            let mut packed = 0u32;
            for (index, scalar) in components.iter().enumerate() {
                let value = scalar.to_f32().ok_or_else(|| mismatch(format, scalar))?;
                let (max, shift) = match index {
                    3 => (3.0, 30),
                    _ => (1023.0, index * 10),
                };
                packed |= (unorm(value, max) as u32) << shift;
            }
            out.push(&packed.to_le_bytes());
        }
        FormatLayout::Unorm8x4Bgra => {
            let mut channels = [0u8; 4];
            for (channel, scalar) in channels.iter_mut().zip(&components) {
                let value = scalar.to_f32().ok_or_else(|| mismatch(format, scalar))?;
                *channel = unorm(value, 255.0) as u8;
            }
            let [r, g, b, a] = channels;
            out.push(&[b, g, r, a]);
        }
    }
    Ok(out)
}

fn decode_component(component: VertexComponent, bytes: &[u8]) -> Scalar {
    let le16 = || [bytes[0], bytes[1]];
    let le32 = || [bytes[0], bytes[1], bytes[2], bytes[3]];
    match component {
        VertexComponent::Uint8 => Scalar::U32(bytes[0] as u32),
        VertexComponent::Sint8 => Scalar::I32(bytes[0] as i8 as i32),
        VertexComponent::Unorm8 => Scalar::F32(bytes[0] as f32 / 255.0),
        VertexComponent::Snorm8 => Scalar::F32((bytes[0] as i8 as f32 / 127.0).max(-1.0)),
        VertexComponent::Uint16 => Scalar::U32(u16::from_le_bytes(le16()) as u32),
        VertexComponent::Sint16 => Scalar::I32(i16::from_le_bytes(le16()) as i32),
        VertexComponent::Unorm16 => Scalar::F32(u16::from_le_bytes(le16()) as f32 / 65535.0),
        VertexComponent::Snorm16 => {
            Scalar::F32((i16::from_le_bytes(le16()) as f32 / 32767.0).max(-1.0))
        }
        VertexComponent::Float16 => Scalar::F16(f16::from_le_bytes(le16())),
        VertexComponent::Float32 => Scalar::F32(f32::from_le_bytes(le32())),
        VertexComponent::Uint32 => Scalar::U32(u32::from_le_bytes(le32())),
        VertexComponent::Sint32 => Scalar::I32(i32::from_le_bytes(le32())),
    }
}

/// Decode a vertex value from exactly `format.byte_size()` bytes.
pub(crate) fn decode_vertex(format: VertexFormat, bytes: &[u8]) -> Value {
    let components: Vec<Scalar> = match format.layout() {
        FormatLayout::Components { component, .. } => bytes
            .chunks_exact(component.byte_size())
            .map(|chunk| decode_component(component, chunk))
            .collect(),
        FormatLayout::Unorm10_10_10_2 => {
            let packed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            vec![
                Scalar::F32((packed & 0x3ff) as f32 / 1023.0),
                Scalar::F32(((packed >> 10) & 0x3ff) as f32 / 1023.0),
                Scalar::F32(((packed >> 20) & 0x3ff) as f32 / 1023.0),
                Scalar::F32((packed >> 30) as f32 / 3.0),
            ]
        }
        FormatLayout::Unorm8x4Bgra => [bytes[2], bytes[1], bytes[0], bytes[3]]
            .into_iter()
            .map(|channel| Scalar::F32(channel as f32 / 255.0))
            .collect(),
    };

    match components.as_slice() {
        [single] => Value::Scalar(*single),
        _ => Value::Vector(components),
    }
}
