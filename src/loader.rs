use tracing::debug;

use crate::binary::chunk::UnknownChunk;
use crate::binary::chunks::cel::CelContent;
use crate::binary::chunks::color_profile::ColorProfileChunk;
use crate::binary::chunks::external_files::ExternalFile;
use crate::binary::chunks::user_data::UserDataChunk;
use crate::binary::errors::DecodeError;
use crate::binary::header::Header;
use crate::binary::palette::{palette_from_old_chunks, Palette};
use crate::binary::raw_file::parse_raw_file;
use crate::compression::{Compression, Zlib};
use crate::interpreter::ChunkInterpreter;
use crate::wrappers::{
    build_layer_tree, Cel, CelPixels, Frame, Layer, LayerTree, Slice, Tag, Tileset,
};

/// How much image work `decode` does up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeImages {
    /// Keep payloads as-is; pixels decode lazily on request.
    #[default]
    None,
    /// Validate the declared geometry of uncompressed payloads.
    Metadata,
    /// Eagerly inflate every compressed cel, tilemap and tileset strip.
    Pixels,
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Keep each frame's original chunk list for preserved-mode encoding.
    pub preserve_chunks: bool,
    /// Keep zlib payloads even after eager pixel decoding. Turning this off
    /// only takes effect together with [`DecodeImages::Pixels`]; the only
    /// copy of a payload is never dropped.
    pub preserve_compressed: bool,
    pub decode_images: DecodeImages,
    /// Gate on the file magic and color depth. Recovery tooling turns this
    /// off; mismatches are then recorded in the header and parsing goes on.
    pub strict: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            preserve_chunks: true,
            preserve_compressed: true,
            decode_images: DecodeImages::None,
            strict: true,
        }
    }
}

/// A decoded sprite. Every entity is owned by this aggregate; cels refer to
/// layers by index, linked cels refer to frames by index, tilemap layers
/// refer to tilesets by index.
#[derive(Debug)]
pub struct AsepriteFile<'a> {
    pub header: Header,
    /// The effective palette: the modern palette chunks when any were seen,
    /// otherwise the replayed old palette chunks, otherwise nothing.
    pub palette: Option<Palette<'a>>,
    pub color_profile: Option<ColorProfileChunk<'a>>,
    pub external_files: Vec<ExternalFile<'a>>,
    /// All layers in the file in order.
    pub layers: Vec<Layer<'a>>,
    /// All frames in the file in order.
    pub frames: Vec<Frame<'a>>,
    pub tags: Vec<Tag<'a>>,
    pub slices: Vec<Slice<'a>>,
    pub tilesets: Vec<Tileset<'a>>,
    pub sprite_user_data: Option<UserDataChunk<'a>>,
    /// File-level record of unknown chunks, in stream order. They also stay
    /// in their frame's preserved chunk list when one is kept.
    pub unknown_chunks: Vec<UnknownChunk<'a>>,
}

impl<'a> AsepriteFile<'a> {
    /// Decodes with the default options.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, DecodeError> {
        Self::decode(data, &DecodeOptions::default())
    }

    pub fn decode(data: &'a [u8], options: &DecodeOptions) -> Result<Self, DecodeError> {
        let raw = parse_raw_file(data, options.strict)?;
        let header = raw.header;

        let mut interpreter = ChunkInterpreter::new();
        for raw_frame in raw.frames {
            let duration = if raw_frame.duration == 0 {
                header.speed
            } else {
                raw_frame.duration
            };
            interpreter.begin_frame(u32::from(duration));
            let preserved = options.preserve_chunks.then(|| raw_frame.chunks.clone());
            for chunk in raw_frame.chunks {
                interpreter.interpret(chunk);
            }
            if let Some(frame) = interpreter.frames.last_mut() {
                frame.chunks = preserved;
            }
        }

        let palette = if interpreter.saw_palette_chunk {
            Some(interpreter.palette)
        } else if !interpreter.old_palettes.is_empty() {
            debug!(
                chunks = interpreter.old_palettes.len(),
                "no modern palette chunk, replaying old palette chunks"
            );
            Some(palette_from_old_chunks(&interpreter.old_palettes))
        } else {
            None
        };

        let mut file = AsepriteFile {
            header,
            palette,
            color_profile: interpreter.color_profile,
            external_files: interpreter.external_files,
            layers: interpreter.layers,
            frames: interpreter.frames,
            tags: interpreter.tags,
            slices: interpreter.slices,
            tilesets: interpreter.tilesets,
            sprite_user_data: interpreter.sprite_user_data,
            unknown_chunks: interpreter.unknown_chunks,
        };

        match options.decode_images {
            DecodeImages::None => {}
            DecodeImages::Metadata => file.check_image_geometry()?,
            DecodeImages::Pixels => {
                file.decode_all_images(&Zlib, options.preserve_compressed)?;
            }
        }
        Ok(file)
    }

    pub fn canvas_width(&self) -> u16 {
        self.header.width
    }

    pub fn canvas_height(&self) -> u16 {
        self.header.height
    }

    pub fn pixel_count(&self) -> usize {
        self.header.width as usize * self.header.height as usize
    }

    /// The layer hierarchy, rebuilt from the flat list's child levels.
    pub fn layer_tree(&self) -> LayerTree {
        build_layer_tree(&self.layers)
    }

    pub fn slice(&self, name: &str) -> Option<&Slice<'a>> {
        self.slices.iter().find(|slice| slice.name() == name)
    }

    pub fn tag(&self, name: &str) -> Option<&Tag<'a>> {
        self.tags.iter().find(|tag| tag.name() == name)
    }

    /// The tileset a tilemap layer draws from.
    pub fn tileset_for_layer(&self, layer_index: usize) -> Result<&Tileset<'a>, DecodeError> {
        let tileset_index = self.layers[layer_index]
            .chunk
            .tileset_index
            .ok_or(DecodeError::MissingTileset { tileset_index: 0 })?;
        self.tilesets
            .get(tileset_index as usize)
            .ok_or(DecodeError::MissingTileset { tileset_index })
    }

    /// Follows linked cels to the cel that owns the pixels. Returns the cel
    /// itself when it is not linked. Chains are tolerated but must resolve.
    ///
    /// Panics if `frame_index`/`cel_index` do not name a cel of this file.
    pub fn resolve_linked_cel(
        &self,
        frame_index: usize,
        cel_index: usize,
    ) -> Result<&Cel<'a>, DecodeError> {
        let (frame, cel) = self.resolve_linked_cel_indices(frame_index, cel_index)?;
        Ok(&self.frames[frame].cels[cel])
    }

    fn resolve_linked_cel_indices(
        &self,
        frame_index: usize,
        cel_index: usize,
    ) -> Result<(usize, usize), DecodeError> {
        let mut frame = frame_index;
        let mut cel = cel_index;
        // A link chain can visit each frame at most once; anything longer
        // has looped.
        for _ in 0..=self.frames.len() {
            let current = &self.frames[frame].cels[cel];
            let CelContent::Linked { frame_position } = current.chunk.content else {
                return Ok((frame, cel));
            };
            let layer = current.layer_index();
            let target_frame = frame_position as usize;
            let target = self
                .frames
                .get(target_frame)
                .and_then(|f| {
                    f.cels
                        .iter()
                        .position(|candidate| candidate.layer_index() == layer)
                })
                .ok_or(DecodeError::InvalidLinkedCel {
                    frame: target_frame,
                    layer,
                })?;
            frame = target_frame;
            cel = target;
        }
        Err(DecodeError::InvalidLinkedCel {
            frame: frame_index,
            layer: self.frames[frame_index].cels[cel_index].layer_index(),
        })
    }

    /// Pixels of the cel at `(frame_index, cel_index)`, following links and
    /// caching the inflated buffer on the cel that owns the payload.
    ///
    /// Panics if the indices do not name a cel of this file.
    pub fn decode_cel_pixels(
        &mut self,
        frame_index: usize,
        cel_index: usize,
        compression: &dyn Compression,
    ) -> Result<CelPixels<'_>, DecodeError> {
        let (frame, cel) = self.resolve_linked_cel_indices(frame_index, cel_index)?;
        let color_depth = self.header.color_depth;
        self.frames[frame].cels[cel].decode_pixels(color_depth, compression)
    }

    fn check_image_geometry(&self) -> Result<(), DecodeError> {
        let Some(bytes_per_pixel) = self.header.color_depth.bytes_per_pixel() else {
            return Ok(());
        };
        for (frame_index, frame) in self.frames.iter().enumerate() {
            for cel in &frame.cels {
                if let CelContent::RawImage {
                    width,
                    height,
                    data,
                } = &cel.chunk.content
                {
                    let expected = *width as usize * *height as usize * bytes_per_pixel;
                    if data.len() != expected {
                        return Err(DecodeError::BadChunkSize {
                            offset: None,
                            frame: Some(frame_index),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn decode_all_images(
        &mut self,
        compression: &dyn Compression,
        preserve_compressed: bool,
    ) -> Result<(), DecodeError> {
        let color_depth = self.header.color_depth;
        for frame in &mut self.frames {
            for cel in &mut frame.cels {
                match cel.chunk.content {
                    CelContent::CompressedImage { .. } => {
                        cel.decode_pixels(color_depth, compression)?;
                        if !preserve_compressed {
                            if let CelContent::CompressedImage { data, .. } = &mut cel.chunk.content
                            {
                                *data = std::borrow::Cow::Borrowed(&[]);
                            }
                        }
                    }
                    CelContent::CompressedTilemap { .. } => {
                        cel.decode_tilemap(compression)?;
                        if !preserve_compressed {
                            if let CelContent::CompressedTilemap { data, .. } =
                                &mut cel.chunk.content
                            {
                                *data = std::borrow::Cow::Borrowed(&[]);
                            }
                        }
                    }
                    CelContent::RawImage { .. } | CelContent::Linked { .. } => {}
                }
            }
        }
        for tileset in &mut self.tilesets {
            if tileset.chunk.tiles.is_some() {
                tileset.decode_pixels(color_depth, compression)?;
                if !preserve_compressed {
                    tileset.chunk.tiles = Some(std::borrow::Cow::Borrowed(&[]));
                }
            }
        }
        Ok(())
    }
}
