//! # Binary Tags
//!
//! The write half of the NBT format, enough to describe dimension codecs,
//! heightmaps, item data and text components.
//!
//! Before 1.20.2 the root compound carries an (empty) name; from 1.20.2 on
//! it is written nameless.

use super::buffer::PacketSerializer;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// A single binary tag.
#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    /// Signed byte (also used for booleans).
    Byte(i8),
    /// Signed 16-bit integer.
    Short(i16),
    /// Signed 32-bit integer.
    Int(i32),
    /// Signed 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Homogeneous list.
    List(Vec<Tag>),
    /// Ordered named children.
    Compound(Compound),
    /// Array of i32.
    IntArray(Vec<i32>),
    /// Array of i64.
    LongArray(Vec<i64>),
}

impl Tag {
    const fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => TAG_BYTE,
            Self::Short(_) => TAG_SHORT,
            Self::Int(_) => TAG_INT,
            Self::Long(_) => TAG_LONG,
            Self::Float(_) => TAG_FLOAT,
            Self::Double(_) => TAG_DOUBLE,
            Self::String(_) => TAG_STRING,
            Self::List(_) => TAG_LIST,
            Self::Compound(_) => TAG_COMPOUND,
            Self::IntArray(_) => TAG_INT_ARRAY,
            Self::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    fn write_payload(&self, out: &mut PacketSerializer) {
        match self {
            Self::Byte(v) => out.write_i8(*v),
            Self::Short(v) => out.write_i16(*v),
            Self::Int(v) => out.write_i32(*v),
            Self::Long(v) => out.write_i64(*v),
            Self::Float(v) => out.write_f32(*v),
            Self::Double(v) => out.write_f64(*v),
            Self::String(v) => write_tag_string(out, v),
            Self::List(items) => {
                out.write_u8(items.first().map_or(TAG_END, Tag::type_id));
                out.write_i32(items.len() as i32);
                for item in items {
                    item.write_payload(out);
                }
            }
            Self::Compound(compound) => compound.write_payload(out),
            Self::IntArray(values) => {
                out.write_i32(values.len() as i32);
                for v in values {
                    out.write_i32(*v);
                }
            }
            Self::LongArray(values) => {
                out.write_i32(values.len() as i32);
                for v in values {
                    out.write_i64(*v);
                }
            }
        }
    }
}

fn write_tag_string(out: &mut PacketSerializer, value: &str) {
    out.write_u16(value.len() as u16);
    out.write_bytes(value.as_bytes());
}

/// A compound tag that keeps insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Compound {
    entries: Vec<(String, Tag)>,
}

impl Compound {
    /// Creates an empty compound.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds a child, builder style.
    #[must_use]
    pub fn with(mut self, name: &str, tag: Tag) -> Self {
        self.put(name, tag);
        self
    }

    /// Adds or replaces a child.
    pub fn put(&mut self, name: &str, tag: Tag) {
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| key == name) {
            entry.1 = tag;
        } else {
            self.entries.push((name.to_owned(), tag));
        }
    }

    /// Looks up a child by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, tag)| tag)
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the compound has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_payload(&self, out: &mut PacketSerializer) {
        for (name, tag) in &self.entries {
            out.write_u8(tag.type_id());
            write_tag_string(out, name);
            tag.write_payload(out);
        }
        out.write_u8(TAG_END);
    }

    /// Writes the compound as a root tag with an empty name (pre 1.20.2).
    pub fn write_named(&self, out: &mut PacketSerializer) {
        out.write_u8(TAG_COMPOUND);
        write_tag_string(out, "");
        self.write_payload(out);
    }

    /// Writes the compound as a nameless root tag (1.20.2+).
    pub fn write_nameless(&self, out: &mut PacketSerializer) {
        out.write_u8(TAG_COMPOUND);
        self.write_payload(out);
    }
}
