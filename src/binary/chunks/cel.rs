use std::borrow::Cow;

use nom::bytes::complete::take;
use nom::combinator::rest;
use strum_macros::FromRepr;

use crate::binary::errors::{EncodeError, ParseError, ParseResult};
use crate::binary::scalars::{byte, dword, short, word, Byte, Short, Word};
use crate::binary::writer::AseWriter;
use crate::tilemap::TileMasks;

/// The variant tag in the cel's common prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u16)]
pub enum CelType {
    RawImage = 0,
    Linked = 1,
    CompressedImage = 2,
    CompressedTilemap = 3,
}

/// The pixel contribution of one layer on one frame.
///
/// Payloads are bounded by the chunk end, not by any computed size: whatever
/// bytes remain after the variant's fixed fields belong to the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CelChunk<'a> {
    /// Index into the file's flat layer list.
    pub layer_index: Word,
    pub x: Short,
    pub y: Short,
    pub opacity: Byte,
    pub z_index: Short,
    pub content: CelContent<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CelContent<'a> {
    /// Uncompressed pixels, row by row top to bottom. Only found in very old
    /// files.
    RawImage {
        width: Word,
        height: Word,
        data: Cow<'a, [u8]>,
    },
    /// The pixels live in the cel on the same layer of an earlier frame.
    Linked { frame_position: Word },
    /// Zlib-compressed pixels. An empty `data` means the payload was dropped
    /// after decoding and the encoder has to re-deflate from the pixel cache.
    CompressedImage {
        width: Word,
        height: Word,
        data: Cow<'a, [u8]>,
    },
    /// Zlib-compressed tile indices, `bits_per_tile`-sized little-endian
    /// values unpacked through the four bit masks.
    CompressedTilemap {
        width: Word,
        height: Word,
        bits_per_tile: Word,
        masks: TileMasks,
        data: Cow<'a, [u8]>,
    },
}

impl CelContent<'_> {
    pub fn cel_type(&self) -> CelType {
        match self {
            CelContent::RawImage { .. } => CelType::RawImage,
            CelContent::Linked { .. } => CelType::Linked,
            CelContent::CompressedImage { .. } => CelType::CompressedImage,
            CelContent::CompressedTilemap { .. } => CelType::CompressedTilemap,
        }
    }
}

impl CelChunk<'_> {
    pub fn is_linked(&self) -> bool {
        matches!(self.content, CelContent::Linked { .. })
    }
}

pub fn parse_cel_chunk(input: &[u8]) -> ParseResult<'_, CelChunk<'_>> {
    let (input, layer_index) = word(input)?;
    let (input, x) = short(input)?;
    let (input, y) = short(input)?;
    let (input, opacity) = byte(input)?;
    let (input, cel_type) = word(input)?;
    let (input, z_index) = short(input)?;
    let (input, _) = take(5usize)(input)?;

    let cel_type = CelType::from_repr(cel_type)
        .ok_or(nom::Err::Failure(ParseError::InvalidCelType(cel_type)))?;

    let (input, content) = match cel_type {
        CelType::RawImage => {
            let (input, width) = word(input)?;
            let (input, height) = word(input)?;
            let (input, data) = rest(input)?;
            (
                input,
                CelContent::RawImage {
                    width,
                    height,
                    data: Cow::Borrowed(data),
                },
            )
        }
        CelType::Linked => {
            let (input, frame_position) = word(input)?;
            (input, CelContent::Linked { frame_position })
        }
        CelType::CompressedImage => {
            let (input, width) = word(input)?;
            let (input, height) = word(input)?;
            let (input, data) = rest(input)?;
            (
                input,
                CelContent::CompressedImage {
                    width,
                    height,
                    data: Cow::Borrowed(data),
                },
            )
        }
        CelType::CompressedTilemap => {
            let (input, width) = word(input)?;
            let (input, height) = word(input)?;
            let (input, bits_per_tile) = word(input)?;
            let (input, tile_id) = dword(input)?;
            let (input, x_flip) = dword(input)?;
            let (input, y_flip) = dword(input)?;
            let (input, rotation) = dword(input)?;
            let (input, _) = take(10usize)(input)?;
            let (input, data) = rest(input)?;
            (
                input,
                CelContent::CompressedTilemap {
                    width,
                    height,
                    bits_per_tile,
                    masks: TileMasks {
                        tile_id,
                        x_flip,
                        y_flip,
                        rotation,
                    },
                    data: Cow::Borrowed(data),
                },
            )
        }
    };

    Ok((
        input,
        CelChunk {
            layer_index,
            x,
            y,
            opacity,
            z_index,
            content,
        },
    ))
}

pub fn encode_cel_chunk(chunk: &CelChunk<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_word(chunk.layer_index);
    w.put_short(chunk.x);
    w.put_short(chunk.y);
    w.put_byte(chunk.opacity);
    w.put_word(chunk.content.cel_type() as Word);
    w.put_short(chunk.z_index);
    w.skip(5);

    match &chunk.content {
        CelContent::RawImage {
            width,
            height,
            data,
        }
        | CelContent::CompressedImage {
            width,
            height,
            data,
        } => {
            w.put_word(*width);
            w.put_word(*height);
            w.put_bytes(data);
        }
        CelContent::Linked { frame_position } => {
            w.put_word(*frame_position);
        }
        CelContent::CompressedTilemap {
            width,
            height,
            bits_per_tile,
            masks,
            data,
        } => {
            w.put_word(*width);
            w.put_word(*height);
            w.put_word(*bits_per_tile);
            w.put_dword(masks.tile_id);
            w.put_dword(masks.x_flip);
            w.put_dword(masks.y_flip);
            w.put_dword(masks.rotation);
            w.skip(10);
            w.put_bytes(data);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_image_payload_is_bounded_by_chunk_end() {
        let chunk = CelChunk {
            layer_index: 0,
            x: -3,
            y: 7,
            opacity: 255,
            z_index: -1,
            content: CelContent::RawImage {
                width: 2,
                height: 2,
                data: Cow::Borrowed(&[1, 2, 3, 4, 5, 6, 7, 8]),
            },
        };
        let mut w = AseWriter::new();
        encode_cel_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_cel_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }

    #[test]
    fn tilemap_round_trip() {
        let chunk = CelChunk {
            layer_index: 2,
            x: 0,
            y: 0,
            opacity: 255,
            z_index: 0,
            content: CelContent::CompressedTilemap {
                width: 4,
                height: 4,
                bits_per_tile: 32,
                masks: TileMasks::default(),
                data: Cow::Borrowed(&[0x78, 0x9c]),
            },
        };
        let mut w = AseWriter::new();
        encode_cel_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (_, parsed) = parse_cel_chunk(&bytes).unwrap();
        assert_eq!(parsed, chunk);
    }

    #[test]
    fn unknown_cel_type_fails() {
        let mut w = AseWriter::new();
        w.put_word(0);
        w.put_short(0);
        w.put_short(0);
        w.put_byte(255);
        w.put_word(9);
        w.put_short(0);
        w.skip(5);
        let bytes = w.into_bytes();
        assert!(matches!(
            parse_cel_chunk(&bytes),
            Err(nom::Err::Failure(ParseError::InvalidCelType(9)))
        ));
    }
}
