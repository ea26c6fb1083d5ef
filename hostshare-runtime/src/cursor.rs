//! Byte cursors over a buffer.

use crate::error::{CodecError, Result};
use hostshare_common::round_up;

/// A destination for encoded bytes.
///
/// Positions only move forward within one top-level write. Skipping ahead never
/// rewrites bytes that already exist in the destination.
pub trait ByteSink {
    fn position(&self) -> usize;

    /// Move forward to `position`. Bytes between the old and new position are left as they
    /// are, or zero-filled if the destination has to grow.
    fn seek(&mut self, position: usize);

    fn write_bytes(&mut self, bytes: &[u8]);

    /// Advance to the next multiple of `align`.
    fn align_to(&mut self, align: usize) {
        let position = round_up(self.position(), align);
        self.seek(position);
    }
}

/// A cursor writing into a growable byte buffer.
pub struct BufferWriter<'a> {
    buffer: &'a mut Vec<u8>,
    position: usize,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        Self::at(buffer, 0)
    }

    /// A writer starting at `position`. The buffer is zero-extended if it is shorter.
    pub fn at(buffer: &'a mut Vec<u8>, position: usize) -> Self {
        let mut writer = BufferWriter {
            buffer,
            position: 0,
        };
        writer.seek(position);
        writer
    }

    pub fn into_inner(self) -> &'a mut Vec<u8> {
        self.buffer
    }

    fn reserve_to(&mut self, end: usize) {
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
    }
}

impl ByteSink for BufferWriter<'_> {
    fn position(&self) -> usize {
        self.position
    }

    fn seek(&mut self, position: usize) {
        self.reserve_to(position);
        self.position = position;
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        self.reserve_to(end);
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }
}

/// A sink that discards bytes and only tracks the position.
///
/// Running an encoder against a `Measure` first checks a value without touching the real
/// destination.
#[derive(Debug, Default, Clone, Copy)]
pub struct Measure {
    position: usize,
}

impl Measure {
    pub fn at(position: usize) -> Self {
        Measure { position }
    }
}

impl ByteSink for Measure {
    fn position(&self) -> usize {
        self.position
    }

    fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.position += bytes.len();
    }
}

/// A cursor reading from a byte slice.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::at(buffer, 0)
    }

    pub fn at(buffer: &'a [u8], position: usize) -> Self {
        BufferReader { buffer, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Move forward to `position`. Reading past the end fails on the next read, not here.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn align_to(&mut self, align: usize) {
        self.position = round_up(self.position, align);
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self
            .position
            .checked_add(len)
            .and_then(|end| self.buffer.get(self.position..end))
            .ok_or(CodecError::OutOfBounds {
                offset: self.position,
                len,
                size: self.buffer.len(),
            })?;
        self.position += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn writer_zero_fills_when_growing() {
        let mut buffer = Vec::new();
        let mut writer = BufferWriter::new(&mut buffer);
        writer.write_bytes(&[1]);
        writer.align_to(4);
        writer.write_bytes(&[2, 3]);
        assert_eq!(writer.position(), 6);
        writer.seek(8);
        assert_eq!(buffer, vec![1, 0, 0, 0, 2, 3, 0, 0]);
    }

    #[test]
    pub fn writer_keeps_existing_padding() {
        let mut buffer = vec![0xAA; 8];
        let mut writer = BufferWriter::at(&mut buffer, 2);
        writer.align_to(4);
        writer.write_bytes(&[1, 2]);
        assert_eq!(buffer, vec![0xAA, 0xAA, 0xAA, 0xAA, 1, 2, 0xAA, 0xAA]);
    }

    #[test]
    pub fn reader_reports_overruns() {
        let bytes = [1u8, 2, 3, 4, 5];
        let mut reader = BufferReader::new(&bytes);
        assert_eq!(reader.read_array::<4>(), Ok([1, 2, 3, 4]));
        reader.align_to(4);
        assert_eq!(
            reader.read_bytes(4),
            Err(CodecError::OutOfBounds {
                offset: 4,
                len: 4,
                size: 5
            })
        );
        assert_eq!(reader.position(), 4);
    }

    #[test]
    pub fn measure_tracks_position_only() {
        let mut measure = Measure::at(3);
        measure.align_to(4);
        measure.write_bytes(&[0; 12]);
        assert_eq!(measure.position(), 16);
    }
}
