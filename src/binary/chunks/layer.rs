use std::borrow::Cow;

use bitflags::bitflags;
use nom::bytes::complete::take;
use nom::combinator::cond;

use crate::binary::blend_mode::BlendMode;
use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{byte, dword, parse_string, word, Byte, Dword, Word};
use crate::binary::writer::AseWriter;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LayerFlags: Word {
        const VISIBLE = 0x1;
        const EDITABLE = 0x2;
        const LOCK_MOVEMENT = 0x4;
        const BACKGROUND = 0x8;
        const PREFER_LINKED_CELS = 0x10;
        /// The layer group should be displayed collapsed.
        const COLLAPSED = 0x20;
        /// The layer is a reference layer.
        const REFERENCE = 0x40;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Normal,
    Group,
    Tilemap,
    /// Reserved for future layer kinds; carried through untouched.
    Unknown(Word),
}

impl From<Word> for LayerType {
    fn from(value: Word) -> Self {
        match value {
            0 => LayerType::Normal,
            1 => LayerType::Group,
            2 => LayerType::Tilemap,
            other => LayerType::Unknown(other),
        }
    }
}

impl LayerType {
    pub fn to_word(self) -> Word {
        match self {
            LayerType::Normal => 0,
            LayerType::Group => 1,
            LayerType::Tilemap => 2,
            LayerType::Unknown(raw) => raw,
        }
    }
}

/// Layer chunks appear in the first frame in depth-first pre-order;
/// `child_level` encodes the depth in the group hierarchy. The flat list is
/// the canonical representation, a tree is only materialized on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerChunk<'a> {
    pub flags: LayerFlags,
    pub layer_type: LayerType,
    pub child_level: Word,
    /// Ignored by the editor; round-tripped anyway.
    pub default_width: Word,
    pub default_height: Word,
    pub blend_mode: BlendMode,
    pub opacity: Byte,
    pub name: Cow<'a, str>,
    /// Index into the file's tilesets. Present exactly when
    /// `layer_type == LayerType::Tilemap`.
    pub tileset_index: Option<Dword>,
}

pub fn parse_layer_chunk(input: &[u8]) -> ParseResult<'_, LayerChunk<'_>> {
    let (input, flags) = word(input)?;
    let (input, layer_type) = word(input)?;
    let layer_type = LayerType::from(layer_type);
    let (input, child_level) = word(input)?;
    let (input, default_width) = word(input)?;
    let (input, default_height) = word(input)?;
    let (input, blend_mode) = word(input)?;
    let (input, opacity) = byte(input)?;
    let (input, _) = take(3usize)(input)?;
    let (input, name) = parse_string(input)?;
    let (input, tileset_index) = cond(layer_type == LayerType::Tilemap, dword)(input)?;

    Ok((
        input,
        LayerChunk {
            flags: LayerFlags::from_bits_retain(flags),
            layer_type,
            child_level,
            default_width,
            default_height,
            blend_mode: BlendMode::from(blend_mode),
            opacity,
            name,
            tileset_index,
        },
    ))
}

pub fn encode_layer_chunk(chunk: &LayerChunk<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_word(chunk.flags.bits());
    w.put_word(chunk.layer_type.to_word());
    w.put_word(chunk.child_level);
    w.put_word(chunk.default_width);
    w.put_word(chunk.default_height);
    w.put_word(chunk.blend_mode.to_word());
    w.put_byte(chunk.opacity);
    w.skip(3);
    w.put_string(&chunk.name)?;
    if let Some(index) = chunk.tileset_index {
        w.put_dword(index);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_round_trip() {
        let chunk = LayerChunk {
            flags: LayerFlags::VISIBLE | LayerFlags::EDITABLE,
            layer_type: LayerType::Tilemap,
            child_level: 1,
            default_width: 0,
            default_height: 0,
            blend_mode: BlendMode::Multiply,
            opacity: 200,
            name: Cow::Borrowed("terrain"),
            tileset_index: Some(3),
        };
        let mut w = AseWriter::new();
        encode_layer_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_layer_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }
}
