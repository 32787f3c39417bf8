//! The typed model the decoder produces: chunk data paired with whatever the
//! stream interpreter attached to it, plus the lazy caches for compressed
//! payloads. Cross-references between entities are indices, never pointers.

use std::borrow::Cow;

use crate::binary::chunk::Chunk;
use crate::binary::chunks::cel::{CelChunk, CelContent};
use crate::binary::chunks::cel_extra::CelExtraChunk;
use crate::binary::chunks::layer::{LayerChunk, LayerFlags, LayerType};
use crate::binary::chunks::slice::{SliceChunk, SliceKey};
use crate::binary::chunks::tags::{Playback, TagChunk};
use crate::binary::chunks::tileset::TilesetChunk;
use crate::binary::chunks::user_data::UserDataChunk;
use crate::binary::color_depth::ColorDepth;
use crate::binary::errors::DecodeError;
use crate::binary::scalars::{Dword, Word};
use crate::compression::Compression;
use crate::tilemap::{unpack_tiles, Tile, TileMasks};

/// A layer and its user data. Layers live in a flat vector in file order;
/// `chunk.child_level` encodes the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<'a> {
    pub chunk: LayerChunk<'a>,
    pub user_data: UserDataChunk<'a>,
}

impl Layer<'_> {
    pub fn name(&self) -> &str {
        &self.chunk.name
    }

    pub fn visible(&self) -> bool {
        self.chunk.flags.contains(LayerFlags::VISIBLE)
    }

    pub fn is_group(&self) -> bool {
        self.chunk.layer_type == LayerType::Group
    }
}

/// A cel in a frame, there is usually at most one per layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Cel<'a> {
    pub chunk: CelChunk<'a>,
    pub user_data: UserDataChunk<'a>,
    pub extra: Option<CelExtraChunk>,
    /// Decoded pixel bytes, filled on first decode of a compressed image.
    pub pixels: Option<Vec<u8>>,
    /// Decoded tilemap cells, filled on first decode of a tilemap payload.
    pub tiles: Option<Vec<Tile>>,
}

/// The image geometry and pixel bytes of a decoded cel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CelPixels<'a> {
    pub width: Word,
    pub height: Word,
    pub color_depth: ColorDepth,
    pub pixels: &'a [u8],
}

/// A decoded tilemap cel: geometry plus the unpacked tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilemapData<'a> {
    pub width: Word,
    pub height: Word,
    pub bits_per_tile: Word,
    pub masks: TileMasks,
    pub tiles: &'a [Tile],
}

impl<'a> Cel<'a> {
    pub fn new(chunk: CelChunk<'a>) -> Self {
        Cel {
            chunk,
            user_data: UserDataChunk::default(),
            extra: None,
            pixels: None,
            tiles: None,
        }
    }

    pub fn layer_index(&self) -> usize {
        self.chunk.layer_index as usize
    }

    pub fn x(&self) -> i16 {
        self.chunk.x
    }

    pub fn y(&self) -> i16 {
        self.chunk.y
    }

    pub fn z_index(&self) -> i16 {
        self.chunk.z_index
    }

    /// Pixels of a raw or compressed image cel. The inflated buffer is
    /// cached on this cel; repeated calls return the cached bytes. Linked
    /// cels have to be resolved through the file first, and tilemap cels go
    /// through [`Cel::decode_tilemap`].
    pub fn decode_pixels(
        &mut self,
        color_depth: ColorDepth,
        compression: &dyn Compression,
    ) -> Result<CelPixels<'_>, DecodeError> {
        let bytes_per_pixel = color_depth
            .bytes_per_pixel()
            .ok_or(DecodeError::UnsupportedColorDepth(color_depth.to_word()))?;
        match &self.chunk.content {
            CelContent::RawImage {
                width,
                height,
                data,
            } => {
                let expected = *width as usize * *height as usize * bytes_per_pixel;
                if data.len() != expected {
                    return Err(DecodeError::BadChunkSize {
                        offset: None,
                        frame: None,
                    });
                }
                Ok(CelPixels {
                    width: *width,
                    height: *height,
                    color_depth,
                    pixels: data,
                })
            }
            CelContent::CompressedImage {
                width,
                height,
                data,
            } => {
                let (width, height) = (*width, *height);
                let expected = width as usize * height as usize * bytes_per_pixel;
                let pixels = match &mut self.pixels {
                    Some(pixels) => pixels,
                    cache @ None => {
                        let inflated = compression.inflate(data)?;
                        if inflated.len() != expected {
                            return Err(DecodeError::BadChunkSize {
                                offset: None,
                                frame: None,
                            });
                        }
                        cache.insert(inflated)
                    }
                };
                Ok(CelPixels {
                    width,
                    height,
                    color_depth,
                    pixels,
                })
            }
            CelContent::Linked { frame_position } => Err(DecodeError::InvalidLinkedCel {
                frame: *frame_position as usize,
                layer: self.chunk.layer_index as usize,
            }),
            CelContent::CompressedTilemap { .. } => Err(DecodeError::InvalidCelType {
                cel_type: self.chunk.content.cel_type() as Word,
                frame: None,
            }),
        }
    }

    /// Unpacked tiles of a tilemap cel, cached like the pixel buffer.
    pub fn decode_tilemap(
        &mut self,
        compression: &dyn Compression,
    ) -> Result<TilemapData<'_>, DecodeError> {
        match &self.chunk.content {
            CelContent::CompressedTilemap {
                width,
                height,
                bits_per_tile,
                masks,
                data,
            } => {
                let (width, height, bits_per_tile, masks) =
                    (*width, *height, *bits_per_tile, *masks);
                let tiles = match &mut self.tiles {
                    Some(tiles) => tiles,
                    cache @ None => {
                        let inflated = compression.inflate(data)?;
                        let tiles = unpack_tiles(&inflated, bits_per_tile, masks)?;
                        if tiles.len() != width as usize * height as usize {
                            return Err(DecodeError::BadChunkSize {
                                offset: None,
                                frame: None,
                            });
                        }
                        cache.insert(tiles)
                    }
                };
                Ok(TilemapData {
                    width,
                    height,
                    bits_per_tile,
                    masks,
                    tiles,
                })
            }
            _ => Err(DecodeError::InvalidCelType {
                cel_type: self.chunk.content.cel_type() as Word,
                frame: None,
            }),
        }
    }

    /// Replaces the pixels of a compressed image cel. The stored zlib
    /// payload is dropped, so the encoder will re-deflate from this buffer.
    pub fn set_pixels(&mut self, pixels: Vec<u8>) {
        if let CelContent::CompressedImage { data, .. } = &mut self.chunk.content {
            *data = Cow::Borrowed(&[]);
        }
        self.pixels = Some(pixels);
    }

    /// Replaces the tiles of a tilemap cel, dropping the stored payload.
    pub fn set_tiles(&mut self, tiles: Vec<Tile>) {
        if let CelContent::CompressedTilemap { data, .. } = &mut self.chunk.content {
            *data = Cow::Borrowed(&[]);
        }
        self.tiles = Some(tiles);
    }
}

/// A frame: duration, cels, and (when decoding preserved them) the original
/// chunk list for byte-faithful re-emission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame<'a> {
    /// In milliseconds. Zero durations were already replaced with the
    /// header's global speed during decode.
    pub duration: u32,
    pub cels: Vec<Cel<'a>>,
    pub chunks: Option<Vec<Chunk<'a>>>,
}

impl<'a> Frame<'a> {
    pub fn iter_cels(&self) -> impl Iterator<Item = &Cel<'a>> {
        self.cels.iter()
    }

    pub fn cel_at_layer_index(&self, layer_index: usize) -> Option<&Cel<'a>> {
        self.cels.iter().find(|cel| cel.layer_index() == layer_index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag<'a> {
    pub chunk: TagChunk<'a>,
    pub user_data: UserDataChunk<'a>,
}

impl Tag<'_> {
    pub fn name(&self) -> &str {
        &self.chunk.name
    }

    pub fn frame_range(&self) -> std::ops::RangeInclusive<usize> {
        self.chunk.from_frame as usize..=self.chunk.to_frame as usize
    }

    pub fn playback(&self) -> Playback {
        self.chunk.playback()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slice<'a> {
    pub chunk: SliceChunk<'a>,
    pub user_data: UserDataChunk<'a>,
}

impl Slice<'_> {
    pub fn name(&self) -> &str {
        &self.chunk.name
    }

    pub fn key_at(&self, frame: Dword) -> Option<&SliceKey> {
        self.chunk.key_at(frame)
    }
}

/// A tileset, its user data, and the per-tile user data that followed it in
/// the stream. Tile user data is a dense prefix: the wire format attaches
/// the chunks to tiles 0, 1, 2, … in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset<'a> {
    pub chunk: TilesetChunk<'a>,
    pub user_data: UserDataChunk<'a>,
    pub tile_user_data: Vec<UserDataChunk<'a>>,
    /// Decoded tile strip, `tile_width * tile_height * tile_count` pixels.
    pub pixels: Option<Vec<u8>>,
}

impl<'a> Tileset<'a> {
    pub fn new(chunk: TilesetChunk<'a>) -> Self {
        Tileset {
            chunk,
            user_data: UserDataChunk::default(),
            tile_user_data: Vec::new(),
            pixels: None,
        }
    }

    /// Inflates and caches the embedded tile strip. Fails with
    /// `MissingTileset` when the tiles live in an external file.
    pub fn decode_pixels(
        &mut self,
        color_depth: ColorDepth,
        compression: &dyn Compression,
    ) -> Result<&[u8], DecodeError> {
        let bytes_per_pixel = color_depth
            .bytes_per_pixel()
            .ok_or(DecodeError::UnsupportedColorDepth(color_depth.to_word()))?;
        let data = self
            .chunk
            .tiles
            .as_ref()
            .ok_or(DecodeError::MissingTileset {
                tileset_index: self.chunk.id,
            })?;
        let expected = self.chunk.tile_width as usize
            * self.chunk.tile_height as usize
            * self.chunk.tile_count as usize
            * bytes_per_pixel;
        let pixels = match &mut self.pixels {
            Some(pixels) => pixels,
            cache @ None => {
                let inflated = compression.inflate(data)?;
                if inflated.len() != expected {
                    return Err(DecodeError::BadChunkSize {
                        offset: None,
                        frame: None,
                    });
                }
                cache.insert(inflated)
            }
        };
        Ok(pixels)
    }

    /// The pixel rows of one tile out of the decoded strip. The strip must
    /// have been decoded first.
    pub fn tile_pixels(
        &self,
        tile_index: Dword,
        color_depth: ColorDepth,
    ) -> Result<&[u8], DecodeError> {
        let bytes_per_pixel = color_depth
            .bytes_per_pixel()
            .ok_or(DecodeError::UnsupportedColorDepth(color_depth.to_word()))?;
        if tile_index >= self.chunk.tile_count {
            return Err(DecodeError::TileIndexOutOfBounds {
                tile_index,
                tile_count: self.chunk.tile_count,
            });
        }
        let pixels = self.pixels.as_ref().ok_or(DecodeError::MissingTileset {
            tileset_index: self.chunk.id,
        })?;
        let tile_bytes =
            self.chunk.tile_width as usize * self.chunk.tile_height as usize * bytes_per_pixel;
        let start = tile_index as usize * tile_bytes;
        Ok(&pixels[start..start + tile_bytes])
    }
}

/// The layer hierarchy, materialized on demand from the flat list with the
/// child-level stack walk. Indices refer back into the layer vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayerTree {
    pub roots: Vec<usize>,
    pub children: Vec<Vec<usize>>,
    pub parent: Vec<Option<usize>>,
}

pub fn build_layer_tree(layers: &[Layer<'_>]) -> LayerTree {
    let mut tree = LayerTree {
        roots: Vec::new(),
        children: vec![Vec::new(); layers.len()],
        parent: vec![None; layers.len()],
    };
    let mut stack: Vec<usize> = Vec::new();
    for (index, layer) in layers.iter().enumerate() {
        let level = layer.chunk.child_level;
        while stack
            .last()
            .is_some_and(|&top| layers[top].chunk.child_level >= level)
        {
            stack.pop();
        }
        match stack.last() {
            None => tree.roots.push(index),
            Some(&parent) => {
                tree.children[parent].push(index);
                tree.parent[index] = Some(parent);
            }
        }
        if layer.is_group() {
            stack.push(index);
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::blend_mode::BlendMode;

    fn layer(name: &str, layer_type: LayerType, child_level: Word) -> Layer<'static> {
        Layer {
            chunk: LayerChunk {
                flags: LayerFlags::VISIBLE,
                layer_type,
                child_level,
                default_width: 0,
                default_height: 0,
                blend_mode: BlendMode::Normal,
                opacity: 255,
                name: Cow::Owned(name.to_owned()),
                tileset_index: None,
            },
            user_data: UserDataChunk::default(),
        }
    }

    #[test]
    fn layer_tree_from_child_levels() {
        // g0          (level 0, group)
        //   a         (level 1)
        //   g1        (level 1, group)
        //     b       (level 2)
        // c            (level 0)
        let layers = vec![
            layer("g0", LayerType::Group, 0),
            layer("a", LayerType::Normal, 1),
            layer("g1", LayerType::Group, 1),
            layer("b", LayerType::Normal, 2),
            layer("c", LayerType::Normal, 0),
        ];
        let tree = build_layer_tree(&layers);
        assert_eq!(tree.roots, vec![0, 4]);
        assert_eq!(tree.children[0], vec![1, 2]);
        assert_eq!(tree.children[2], vec![3]);
        assert_eq!(tree.parent[3], Some(2));
        assert_eq!(tree.parent[4], None);
    }

    #[test]
    fn tileset_tile_lookup_bounds() {
        use crate::binary::chunks::tileset::TilesetFlags;
        let tileset = Tileset {
            chunk: TilesetChunk {
                id: 0,
                flags: TilesetFlags::TILES,
                tile_count: 2,
                tile_width: 1,
                tile_height: 1,
                base_index: 1,
                name: Cow::Borrowed(""),
                external: None,
                tiles: Some(Cow::Borrowed(&[])),
            },
            user_data: UserDataChunk::default(),
            tile_user_data: Vec::new(),
            pixels: Some(vec![1, 2, 3, 4, 5, 6, 7, 8]),
        };
        assert_eq!(
            tileset.tile_pixels(1, ColorDepth::Rgba).unwrap(),
            &[5, 6, 7, 8]
        );
        assert!(matches!(
            tileset.tile_pixels(2, ColorDepth::Rgba),
            Err(DecodeError::TileIndexOutOfBounds {
                tile_index: 2,
                tile_count: 2
            })
        ));
    }
}
