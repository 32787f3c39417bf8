use std::borrow::Cow;

use bitflags::bitflags;
use nom::bytes::complete::take;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{dword, parse_string, short, word, Dword, Short, Word};
use crate::binary::writer::AseWriter;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TilesetFlags: Dword {
        /// Include link to an external file.
        const EXTERNAL_FILE = 0x1;
        /// Include tiles inside this file.
        const TILES = 0x2;
        /// Tilemaps using this tileset use tile ID 0 as the empty tile. In
        /// rare files this bit is off and the empty tile is 0xffffffff.
        const TILE_0_EMPTY = 0x4;
        /// Match modified tiles with their X-flipped version in Auto mode.
        const MATCH_X_FLIP = 0x8;
        const MATCH_Y_FLIP = 0x10;
        const MATCH_D_FLIP = 0x20;
    }
}

/// Link into the external files chunk for tilesets stored out of file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilesetExternalRef {
    /// Id of an entry in the external files chunk.
    pub external_file_id: Dword,
    /// Tileset id inside that file.
    pub tileset_id: Dword,
}

/// An indexed collection of equally-sized tiles. The embedded strip, when
/// present, inflates to `tile_width * (tile_height * tile_count)` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetChunk<'a> {
    pub id: Dword,
    pub flags: TilesetFlags,
    pub tile_count: Dword,
    pub tile_width: Word,
    pub tile_height: Word,
    /// Number shown in the UI for the tile with index 1; purely cosmetic.
    pub base_index: Short,
    pub name: Cow<'a, str>,
    pub external: Option<TilesetExternalRef>,
    /// Zlib-compressed tile strip. Empty after a decode that dropped the
    /// payload; the encoder re-deflates from the decoded cache then.
    pub tiles: Option<Cow<'a, [u8]>>,
}

pub fn parse_tileset_chunk(input: &[u8]) -> ParseResult<'_, TilesetChunk<'_>> {
    let (input, id) = dword(input)?;
    let (input, flags) = dword(input)?;
    let flags = TilesetFlags::from_bits_retain(flags);
    let (input, tile_count) = dword(input)?;
    let (input, tile_width) = word(input)?;
    let (input, tile_height) = word(input)?;
    let (input, base_index) = short(input)?;
    let (input, _) = take(14usize)(input)?;
    let (input, name) = parse_string(input)?;

    let (input, external) = if flags.contains(TilesetFlags::EXTERNAL_FILE) {
        let (input, external_file_id) = dword(input)?;
        let (input, tileset_id) = dword(input)?;
        (
            input,
            Some(TilesetExternalRef {
                external_file_id,
                tileset_id,
            }),
        )
    } else {
        (input, None)
    };

    let (input, tiles) = if flags.contains(TilesetFlags::TILES) {
        let (input, len) = dword(input)?;
        let (input, data) = take(len as usize)(input)?;
        (input, Some(Cow::Borrowed(data)))
    } else {
        (input, None)
    };

    Ok((
        input,
        TilesetChunk {
            id,
            flags,
            tile_count,
            tile_width,
            tile_height,
            base_index,
            name,
            external,
            tiles,
        },
    ))
}

pub fn encode_tileset_chunk(chunk: &TilesetChunk<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    let mut flags = chunk.flags;
    flags.set(TilesetFlags::EXTERNAL_FILE, chunk.external.is_some());
    flags.set(TilesetFlags::TILES, chunk.tiles.is_some());

    w.put_dword(chunk.id);
    w.put_dword(flags.bits());
    w.put_dword(chunk.tile_count);
    w.put_word(chunk.tile_width);
    w.put_word(chunk.tile_height);
    w.put_short(chunk.base_index);
    w.skip(14);
    w.put_string(&chunk.name)?;
    if let Some(external) = chunk.external {
        w.put_dword(external.external_file_id);
        w.put_dword(external.tileset_id);
    }
    if let Some(tiles) = &chunk.tiles {
        w.put_dword(tiles.len() as u32);
        w.put_bytes(tiles);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_tiles_round_trip() {
        let chunk = TilesetChunk {
            id: 1,
            flags: TilesetFlags::TILES | TilesetFlags::TILE_0_EMPTY,
            tile_count: 4,
            tile_width: 8,
            tile_height: 8,
            base_index: 1,
            name: Cow::Borrowed("ground"),
            external: None,
            tiles: Some(Cow::Borrowed(&[0x78, 0x9c, 0x03, 0x00])),
        };
        let mut w = AseWriter::new();
        encode_tileset_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_tileset_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }

    #[test]
    fn external_link_round_trip() {
        let chunk = TilesetChunk {
            id: 2,
            flags: TilesetFlags::EXTERNAL_FILE,
            tile_count: 16,
            tile_width: 16,
            tile_height: 16,
            base_index: 1,
            name: Cow::Borrowed("shared"),
            external: Some(TilesetExternalRef {
                external_file_id: 7,
                tileset_id: 0,
            }),
            tiles: None,
        };
        let mut w = AseWriter::new();
        encode_tileset_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (_, parsed) = parse_tileset_chunk(&bytes).unwrap();
        assert_eq!(parsed, chunk);
    }
}
