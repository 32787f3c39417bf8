//! Packing and unpacking of tilemap cell values. Each cell of a tilemap cel
//! is a `bits_per_tile`-sized little-endian integer; four disjoint masks
//! split it into a tile id and three orientation bits.

use thiserror::Error;

use crate::binary::errors::DecodeError;
use crate::binary::scalars::{Dword, Word};

/// A tilemap cel declared a cell size other than 8, 16 or 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bits per tile must be 8, 16 or 32, got {0}")]
pub struct InvalidBitsPerTile(pub Word);

/// The four bitmasks a tilemap cel declares. The defaults are the ones
/// current files write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMasks {
    pub tile_id: Dword,
    pub x_flip: Dword,
    pub y_flip: Dword,
    pub rotation: Dword,
}

impl Default for TileMasks {
    fn default() -> Self {
        TileMasks {
            tile_id: 0x1FFF_FFFF,
            x_flip: 0x2000_0000,
            y_flip: 0x4000_0000,
            rotation: 0x8000_0000,
        }
    }
}

/// One decoded tilemap cell: a tile id plus its orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub id: Dword,
    pub x_flip: bool,
    pub y_flip: bool,
    /// Rotated 90 degrees clockwise.
    pub rotate_90cw: bool,
}

impl TileMasks {
    pub fn decode(&self, raw: Dword) -> Tile {
        Tile {
            id: raw & self.tile_id,
            x_flip: raw & self.x_flip != 0,
            y_flip: raw & self.y_flip != 0,
            rotate_90cw: raw & self.rotation != 0,
        }
    }

    pub fn encode(&self, tile: Tile) -> Dword {
        let mut raw = tile.id & self.tile_id;
        if tile.x_flip {
            raw |= self.x_flip;
        }
        if tile.y_flip {
            raw |= self.y_flip;
        }
        if tile.rotate_90cw {
            raw |= self.rotation;
        }
        raw
    }
}

/// Splits an inflated tilemap payload into tiles. `bits_per_tile` must be
/// 8, 16 or 32, and the payload a whole number of tiles.
pub fn unpack_tiles(
    data: &[u8],
    bits_per_tile: Word,
    masks: TileMasks,
) -> Result<Vec<Tile>, DecodeError> {
    let bytes_per_tile = bytes_per_tile(bits_per_tile)?;
    if data.len() % bytes_per_tile != 0 {
        return Err(DecodeError::BadChunkSize {
            offset: None,
            frame: None,
        });
    }
    Ok(data
        .chunks_exact(bytes_per_tile)
        .map(|raw| {
            let value = match bytes_per_tile {
                1 => Dword::from(raw[0]),
                2 => Dword::from(u16::from_le_bytes([raw[0], raw[1]])),
                _ => Dword::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            };
            masks.decode(value)
        })
        .collect())
}

/// Serializes tiles back to `bits_per_tile`-sized little-endian values, the
/// form that gets deflated into the cel payload.
pub fn pack_tiles(
    tiles: &[Tile],
    bits_per_tile: Word,
    masks: TileMasks,
) -> Result<Vec<u8>, InvalidBitsPerTile> {
    let bytes_per_tile = bytes_per_tile(bits_per_tile)?;
    let mut out = Vec::with_capacity(tiles.len() * bytes_per_tile);
    for &tile in tiles {
        let raw = masks.encode(tile);
        out.extend_from_slice(&raw.to_le_bytes()[..bytes_per_tile]);
    }
    Ok(out)
}

fn bytes_per_tile(bits_per_tile: Word) -> Result<usize, InvalidBitsPerTile> {
    match bits_per_tile {
        8 => Ok(1),
        16 => Ok(2),
        32 => Ok(4),
        other => Err(InvalidBitsPerTile(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_round_trip() {
        let masks = TileMasks::default();
        let tile = Tile {
            id: 123,
            x_flip: true,
            y_flip: false,
            rotate_90cw: true,
        };
        assert_eq!(masks.decode(masks.encode(tile)), tile);
    }

    #[test]
    fn decode_from_raw_value() {
        let masks = TileMasks::default();
        let tile = masks.decode(100 | 0x2000_0000);
        assert_eq!(
            tile,
            Tile {
                id: 100,
                x_flip: true,
                y_flip: false,
                rotate_90cw: false,
            }
        );
    }

    #[test]
    fn encode_decode_preserves_in_mask_bits() {
        let masks = TileMasks::default();
        for raw in [0u32, 1, 0x1FFF_FFFF, 0x2000_0001, 0xFFFF_FFFF] {
            assert_eq!(masks.encode(masks.decode(raw)), raw);
        }
    }

    #[test]
    fn pack_unpack_16_bit() {
        let masks = TileMasks {
            tile_id: 0x00FF,
            x_flip: 0x0100,
            y_flip: 0x0200,
            rotation: 0x0400,
        };
        let tiles = vec![
            Tile {
                id: 7,
                x_flip: false,
                y_flip: true,
                rotate_90cw: false,
            },
            Tile::default(),
        ];
        let packed = pack_tiles(&tiles, 16, masks).unwrap();
        assert_eq!(packed.len(), 4);
        assert_eq!(unpack_tiles(&packed, 16, masks).unwrap(), tiles);
    }

    #[test]
    fn odd_payload_is_rejected() {
        assert!(unpack_tiles(&[0, 1, 2], 16, TileMasks::default()).is_err());
        assert!(matches!(
            unpack_tiles(&[0], 12, TileMasks::default()),
            Err(DecodeError::InvalidBitsPerTile(InvalidBitsPerTile(12)))
        ));
        assert_eq!(
            pack_tiles(&[Tile::default()], 24, TileMasks::default()),
            Err(InvalidBitsPerTile(24))
        );
    }
}
