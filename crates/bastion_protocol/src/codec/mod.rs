//! # Wire Codec
//!
//! Primitive encodings shared by every packet: fixed-width and variable
//! integers, strings, UUIDs, binary tags, text components and frames.

pub mod buffer;
pub mod component;
pub mod frame;
pub mod nbt;

pub use buffer::{varint_len, PacketDeserializer, PacketSerializer, DEFAULT_MAX_STRING};
pub use component::TextComponent;
pub use frame::{encode_frame, FrameDecoder, MAX_FRAME_LEN};
pub use nbt::{Compound, Tag};
