use std::borrow::Cow;

use nom::bytes::complete::take;
use tracing::debug;

use super::chunk_type::ChunkType;
use super::chunks::cel::{encode_cel_chunk, parse_cel_chunk, CelChunk};
use super::chunks::cel_extra::{encode_cel_extra_chunk, parse_cel_extra_chunk, CelExtraChunk};
use super::chunks::color_profile::{
    encode_color_profile_chunk, parse_color_profile_chunk, ColorProfileChunk,
};
use super::chunks::external_files::{
    encode_external_files_chunk, parse_external_files_chunk, ExternalFilesChunk,
};
use super::chunks::layer::{encode_layer_chunk, parse_layer_chunk, LayerChunk};
use super::chunks::old_palette::{
    encode_old_palette_chunk, parse_old_palette_chunk, OldPaletteChunk,
};
use super::chunks::palette::{encode_palette_chunk, parse_palette_chunk, PaletteChunk};
use super::chunks::slice::{encode_slice_chunk, parse_slice_chunk, SliceChunk};
use super::chunks::tags::{encode_tags_chunk, parse_tags_chunk, TagsChunk};
use super::chunks::tileset::{encode_tileset_chunk, parse_tileset_chunk, TilesetChunk};
use super::chunks::user_data::{encode_user_data_chunk, parse_user_data_chunk, UserDataChunk};
use super::errors::{EncodeError, ParseError, ParseResult};
use super::scalars::{dword, word, Word};
use super::writer::AseWriter;

/// Size of the u32 size + u16 type prefix every chunk carries. Declared
/// chunk sizes include it.
pub const CHUNK_HEADER_SIZE: u32 = 6;

/// A chunk whose type code this codec does not know. The payload is kept
/// verbatim so it survives a round trip byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownChunk<'a> {
    pub chunk_type: Word,
    pub data: Cow<'a, [u8]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chunk<'a> {
    OldPalette04(OldPaletteChunk),
    OldPalette11(OldPaletteChunk),
    Layer(LayerChunk<'a>),
    Cel(CelChunk<'a>),
    CelExtra(CelExtraChunk),
    ColorProfile(ColorProfileChunk<'a>),
    ExternalFiles(ExternalFilesChunk<'a>),
    Tags(TagsChunk<'a>),
    Palette(PaletteChunk<'a>),
    UserData(UserDataChunk<'a>),
    Slice(SliceChunk<'a>),
    Tileset(TilesetChunk<'a>),
    Unknown(UnknownChunk<'a>),
}

impl Chunk<'_> {
    pub fn is_user_data(&self) -> bool {
        matches!(self, Chunk::UserData(_))
    }

    pub fn chunk_type(&self) -> Word {
        match self {
            Chunk::OldPalette04(_) => ChunkType::OldPalette04.to_word(),
            Chunk::OldPalette11(_) => ChunkType::OldPalette11.to_word(),
            Chunk::Layer(_) => ChunkType::Layer.to_word(),
            Chunk::Cel(_) => ChunkType::Cel.to_word(),
            Chunk::CelExtra(_) => ChunkType::CelExtra.to_word(),
            Chunk::ColorProfile(_) => ChunkType::ColorProfile.to_word(),
            Chunk::ExternalFiles(_) => ChunkType::ExternalFiles.to_word(),
            Chunk::Tags(_) => ChunkType::Tags.to_word(),
            Chunk::Palette(_) => ChunkType::Palette.to_word(),
            Chunk::UserData(_) => ChunkType::UserData.to_word(),
            Chunk::Slice(_) => ChunkType::Slice.to_word(),
            Chunk::Tileset(_) => ChunkType::Tileset.to_word(),
            Chunk::Unknown(unknown) => unknown.chunk_type,
        }
    }
}

/// Decodes one chunk payload. `payload` is exactly the bytes between the
/// chunk header and the chunk end; parsers that read less simply leave the
/// remainder behind, which mirrors the defensive seek the format requires.
pub fn parse_chunk<'a>(
    payload: &'a [u8],
    chunk_type: Word,
) -> Result<Chunk<'a>, nom::Err<ParseError<'a>>> {
    let chunk = match ChunkType::from_word(chunk_type) {
        Some(ChunkType::OldPalette04) => Chunk::OldPalette04(parse_old_palette_chunk(payload)?.1),
        Some(ChunkType::OldPalette11) => Chunk::OldPalette11(parse_old_palette_chunk(payload)?.1),
        Some(ChunkType::Layer) => Chunk::Layer(parse_layer_chunk(payload)?.1),
        Some(ChunkType::Cel) => Chunk::Cel(parse_cel_chunk(payload)?.1),
        Some(ChunkType::CelExtra) => Chunk::CelExtra(parse_cel_extra_chunk(payload)?.1),
        Some(ChunkType::ColorProfile) => Chunk::ColorProfile(parse_color_profile_chunk(payload)?.1),
        Some(ChunkType::ExternalFiles) => {
            Chunk::ExternalFiles(parse_external_files_chunk(payload)?.1)
        }
        Some(ChunkType::Tags) => Chunk::Tags(parse_tags_chunk(payload)?.1),
        Some(ChunkType::Palette) => Chunk::Palette(parse_palette_chunk(payload)?.1),
        Some(ChunkType::UserData) => Chunk::UserData(parse_user_data_chunk(payload)?.1),
        Some(ChunkType::Slice) => Chunk::Slice(parse_slice_chunk(payload)?.1),
        Some(ChunkType::Tileset) => Chunk::Tileset(parse_tileset_chunk(payload)?.1),
        None => {
            debug!(chunk_type, "keeping unknown chunk verbatim");
            Chunk::Unknown(UnknownChunk {
                chunk_type,
                data: Cow::Borrowed(payload),
            })
        }
    };
    Ok(chunk)
}

/// Reads `count` framed chunks: u32 size (header included), u16 type, then
/// the payload bounded by the declared size.
pub fn parse_chunks(input: &[u8], count: usize) -> ParseResult<'_, Vec<Chunk<'_>>> {
    let mut chunks = Vec::with_capacity(count.min(1024));
    let mut rest = input;
    for _ in 0..count {
        let (r, chunk_size) = dword(rest)?;
        let (r, chunk_type) = word(r)?;
        if chunk_size < CHUNK_HEADER_SIZE {
            return Err(nom::Err::Failure(ParseError::BadChunkSize));
        }
        let (r, payload) = take(chunk_size - CHUNK_HEADER_SIZE)(r)?;
        chunks.push(parse_chunk(payload, chunk_type)?);
        rest = r;
    }
    Ok((rest, chunks))
}

/// Frames one chunk: writes the 6-byte header with a placeholder size, the
/// payload, then patches the real size in.
pub fn encode_chunk(chunk: &Chunk<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    let size_mark = w.mark();
    w.put_dword(0);
    w.put_word(chunk.chunk_type());
    match chunk {
        Chunk::OldPalette04(c) | Chunk::OldPalette11(c) => encode_old_palette_chunk(c, w)?,
        Chunk::Layer(c) => encode_layer_chunk(c, w)?,
        Chunk::Cel(c) => encode_cel_chunk(c, w)?,
        Chunk::CelExtra(c) => encode_cel_extra_chunk(c, w)?,
        Chunk::ColorProfile(c) => encode_color_profile_chunk(c, w)?,
        Chunk::ExternalFiles(c) => encode_external_files_chunk(c, w)?,
        Chunk::Tags(c) => encode_tags_chunk(c, w)?,
        Chunk::Palette(c) => encode_palette_chunk(c, w)?,
        Chunk::UserData(c) => encode_user_data_chunk(c, w)?,
        Chunk::Slice(c) => encode_slice_chunk(c, w)?,
        Chunk::Tileset(c) => encode_tileset_chunk(c, w)?,
        Chunk::Unknown(c) => w.put_bytes(&c.data),
    }
    let size = w.len() - size_mark;
    if u32::try_from(size).is_err() {
        return Err(EncodeError::BadChunkSize {
            chunk_type: chunk.chunk_type(),
        });
    }
    w.patch_dword(size_mark, size as u32);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_chunks_round_trip_verbatim() {
        let chunk = Chunk::Unknown(UnknownChunk {
            chunk_type: 0x2016,
            data: Cow::Borrowed(&[1, 2, 3, 4, 5]),
        });
        let mut w = AseWriter::new();
        encode_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 11);

        let (rest, chunks) = parse_chunks(&bytes, 1).unwrap();
        assert!(rest.is_empty());
        assert_eq!(chunks[0], chunk);
    }

    #[test]
    fn short_declared_size_is_rejected() {
        let mut w = AseWriter::new();
        w.put_dword(4);
        w.put_word(0x2004);
        let bytes = w.into_bytes();
        assert!(matches!(
            parse_chunks(&bytes, 1),
            Err(nom::Err::Failure(ParseError::BadChunkSize))
        ));
    }
}
