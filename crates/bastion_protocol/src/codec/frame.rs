//! # Length-Prefixed Frames
//!
//! Splits the inbound byte stream into frames and prefixes outbound ones.
//!
//! ## Design
//!
//! - The length prefix is a VarInt of at most 3 bytes (21 bits)
//! - Partial frames stay buffered until the rest arrives
//! - Zero-length frames are skipped, they carry nothing to decode

use super::buffer::{varint_len, PacketSerializer};
use crate::error::{FrameError, FrameResult};

/// Maximum width of a frame length prefix.
pub const MAX_PREFIX_LEN: usize = 3;

/// Largest frame a 21-bit prefix can describe.
pub const MAX_FRAME_LEN: usize = (1 << 21) - 1;

/// Outcome of parsing a length prefix from the front of the buffer.
enum Prefix {
    /// Not enough bytes to finish the prefix.
    Incomplete,
    /// Prefix value and the number of bytes it used.
    Complete(i32, usize),
}

fn read_prefix(bytes: &[u8]) -> FrameResult<Prefix> {
    let mut value: i32 = 0;
    for i in 0..MAX_PREFIX_LEN {
        let Some(&byte) = bytes.get(i) else {
            return Ok(Prefix::Incomplete);
        };
        value |= i32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Prefix::Complete(value, i + 1));
        }
    }
    Err(FrameError::LengthPrefixTooBig)
}

/// Incremental frame splitter for one connection.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Appends bytes received from the transport.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes waiting for the rest of their frame.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Removes and returns everything not yet split into frames.
    pub fn take_buffered(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Pops the next complete frame body, if any.
    pub fn next_frame(&mut self) -> FrameResult<Option<Vec<u8>>> {
        loop {
            let (length, prefix_len) = match read_prefix(&self.buffer)? {
                Prefix::Incomplete => return Ok(None),
                Prefix::Complete(length, prefix_len) => (length, prefix_len),
            };
            if length < 0 {
                return Err(FrameError::NegativeLength(length));
            }
            if length == 0 {
                self.buffer.drain(..prefix_len);
                continue;
            }
            let length = length as usize;
            if self.buffer.len() < prefix_len + length {
                return Ok(None);
            }
            let frame = self.buffer[prefix_len..prefix_len + length].to_vec();
            self.buffer.drain(..prefix_len + length);
            return Ok(Some(frame));
        }
    }
}

/// Prefixes a frame body with its length.
#[must_use]
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let length = body.len() as i32;
    let mut out = PacketSerializer::with_capacity(varint_len(length) + body.len());
    out.write_varint(length);
    out.write_bytes(body);
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_pushes() {
        let frame = encode_frame(&[0x00, 1, 2, 3]);
        let mut decoder = FrameDecoder::new();
        decoder.push(&frame[..2]);
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.push(&frame[2..]);
        assert_eq!(decoder.next_frame().unwrap(), Some(vec![0x00, 1, 2, 3]));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let mut bytes = encode_frame(&[7]);
        bytes.extend(encode_frame(&[8, 9]));
        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes);
        assert_eq!(decoder.next_frame().unwrap(), Some(vec![7]));
        assert_eq!(decoder.next_frame().unwrap(), Some(vec![8, 9]));
        assert_eq!(decoder.next_frame().unwrap(), None);
    }

    #[test]
    fn test_take_buffered_hands_over_the_tail() {
        let mut bytes = encode_frame(&[7]);
        bytes.extend(encode_frame(&[8, 9]));
        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes);
        assert_eq!(decoder.next_frame().unwrap(), Some(vec![7]));
        assert_eq!(decoder.take_buffered(), encode_frame(&[8, 9]));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_zero_length_frames_are_skipped() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x00, 0x00, 0x01, 0x2A]);
        assert_eq!(decoder.next_frame().unwrap(), Some(vec![0x2A]));
    }

    #[test]
    fn test_prefix_wider_than_21_bits() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x80, 0x80, 0x80, 0x01]);
        assert_eq!(decoder.next_frame(), Err(FrameError::LengthPrefixTooBig));
    }
}
