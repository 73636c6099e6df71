//! # Wire Buffers
//!
//! Big-endian serialization primitives shared by every packet.
//!
//! ## Design
//!
//! - `PacketSerializer` owns a growable buffer that is reused between packets
//! - `PacketDeserializer` borrows the payload and never copies unless a field owns data
//! - Every read is bounds-checked and reports how many bytes were missing

use uuid::Uuid;

use crate::error::{FrameError, FrameResult};

/// Default string limit when a field does not declare one.
pub const DEFAULT_MAX_STRING: usize = 32_767;

/// Maximum bytes of a VarInt.
pub const MAX_VARINT_LEN: usize = 5;

/// Maximum bytes of a VarLong.
pub const MAX_VARLONG_LEN: usize = 10;

/// Returns how many bytes `value` occupies as a VarInt.
#[inline]
#[must_use]
pub const fn varint_len(value: i32) -> usize {
    let value = value as u32;
    if value & (u32::MAX << 7) == 0 {
        1
    } else if value & (u32::MAX << 14) == 0 {
        2
    } else if value & (u32::MAX << 21) == 0 {
        3
    } else if value & (u32::MAX << 28) == 0 {
        4
    } else {
        5
    }
}

/// Packet serializer - writes fields into a reusable buffer.
#[derive(Debug, Default, Clone)]
pub struct PacketSerializer {
    buffer: Vec<u8>,
}

impl PacketSerializer {
    /// Creates an empty serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a serializer with preallocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: Vec::with_capacity(capacity) }
    }

    /// Resets the serializer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the serializer, returning the written bytes.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    /// Writes a boolean as `0x00` / `0x01`.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    /// Writes a big-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian i16.
    #[inline]
    pub fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian i64.
    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian f32.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian f64.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes raw bytes without a length prefix.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a LEB128-style VarInt.
    pub fn write_varint(&mut self, value: i32) {
        let mut value = value as u32;
        loop {
            if value & !0x7F == 0 {
                self.buffer.push(value as u8);
                return;
            }
            self.buffer.push(((value & 0x7F) | 0x80) as u8);
            value >>= 7;
        }
    }

    /// Writes a LEB128-style VarLong.
    pub fn write_varlong(&mut self, value: i64) {
        let mut value = value as u64;
        loop {
            if value & !0x7F == 0 {
                self.buffer.push(value as u8);
                return;
            }
            self.buffer.push(((value & 0x7F) | 0x80) as u8);
            value >>= 7;
        }
    }

    /// Writes a VarInt-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_varint(value.len() as i32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Writes a VarInt-prefixed byte array.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as i32);
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a VarInt-prefixed list of strings.
    pub fn write_string_array(&mut self, values: &[&str]) {
        self.write_varint(values.len() as i32);
        for value in values {
            self.write_string(value);
        }
    }

    /// Writes a UUID as two big-endian i64 halves.
    pub fn write_uuid(&mut self, uuid: Uuid) {
        self.buffer.extend_from_slice(uuid.as_bytes());
    }

    /// Writes the legacy Forge extended short (1.7 plugin message lengths).
    pub fn write_extended_forge_short(&mut self, value: i32) {
        let mut low = value & 0x7FFF;
        let high = (value & 0x7F_8000) >> 15;
        if high != 0 {
            low |= 0x8000;
        }
        self.write_u16(low as u16);
        if high != 0 {
            self.write_u8(high as u8);
        }
    }
}

/// Packet deserializer - reads fields from a borrowed payload.
#[derive(Debug, Clone)]
pub struct PacketDeserializer<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketDeserializer<'a> {
    /// Creates a new deserializer from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the number of bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the unread part of the buffer.
    #[inline]
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.buffer[self.position.min(self.buffer.len())..]
    }

    #[inline]
    fn take(&mut self, count: usize) -> FrameResult<&'a [u8]> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(FrameError::Truncated { needed: count - remaining });
        }
        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> FrameResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> FrameResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> FrameResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a boolean; any non-zero byte is `true`.
    #[inline]
    pub fn read_bool(&mut self) -> FrameResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a big-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> FrameResult<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    /// Reads a big-endian i16.
    #[inline]
    pub fn read_i16(&mut self) -> FrameResult<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    /// Reads a big-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> FrameResult<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    /// Reads a big-endian i64.
    #[inline]
    pub fn read_i64(&mut self) -> FrameResult<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    /// Reads a big-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> FrameResult<f32> {
        Ok(f32::from_be_bytes(self.take_array()?))
    }

    /// Reads a big-endian f64.
    #[inline]
    pub fn read_f64(&mut self) -> FrameResult<f64> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    /// Reads `count` raw bytes.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> FrameResult<&'a [u8]> {
        self.take(count)
    }

    /// Reads a VarInt.
    pub fn read_varint(&mut self) -> FrameResult<i32> {
        let mut result: u32 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            result |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
        }
        Err(FrameError::VarIntTooBig)
    }

    /// Reads a VarLong.
    pub fn read_varlong(&mut self) -> FrameResult<i64> {
        let mut result: u64 = 0;
        for i in 0..MAX_VARLONG_LEN {
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result as i64);
            }
        }
        Err(FrameError::VarIntTooBig)
    }

    /// Reads a VarInt-prefixed string of at most `max` characters.
    pub fn read_string(&mut self, max: usize) -> FrameResult<String> {
        let length = self.read_varint()?;
        let length = usize::try_from(length).map_err(|_| FrameError::InvalidArrayLength(length))?;
        // A character is at most 3 bytes in the modified UTF-8 the client emits.
        if length > max.saturating_mul(3) {
            return Err(FrameError::StringTooLong { length, max });
        }
        let bytes = self.take(length)?;
        let value = std::str::from_utf8(bytes).map_err(|_| FrameError::InvalidUtf8)?;
        let chars = value.chars().count();
        if chars > max {
            return Err(FrameError::StringTooLong { length: chars, max });
        }
        Ok(value.to_owned())
    }

    /// Reads a VarInt-prefixed byte array of at most `max` bytes.
    pub fn read_byte_array(&mut self, max: usize) -> FrameResult<&'a [u8]> {
        let length = self.read_varint()?;
        let length = usize::try_from(length).map_err(|_| FrameError::InvalidArrayLength(length))?;
        if length > max {
            return Err(FrameError::TooLarge { length, max });
        }
        self.take(length)
    }

    /// Reads a UUID written as two i64 halves.
    pub fn read_uuid(&mut self) -> FrameResult<Uuid> {
        Ok(Uuid::from_bytes(self.take_array()?))
    }

    /// Reads the legacy Forge extended short.
    pub fn read_extended_forge_short(&mut self) -> FrameResult<i32> {
        let mut low = i32::from(self.read_u16()?);
        let mut high = 0;
        if low & 0x8000 != 0 {
            low &= 0x7FFF;
            high = i32::from(self.read_u8()?);
        }
        Ok(((high & 0xFF) << 15) | low)
    }
}
