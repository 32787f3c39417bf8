//! Re-emission of a decoded (or built) sprite. Preserved mode replays each
//! frame's original chunk list for fidelity; canonical mode emits a fixed
//! chunk order derived from the model. Sizes are written as placeholders and
//! back-patched once the content length is known.

use std::borrow::Cow;

use crate::binary::chunk::{encode_chunk, Chunk};
use crate::binary::chunks::cel::{CelChunk, CelContent};
use crate::binary::errors::EncodeError;
use crate::binary::header::encode_header;
use crate::binary::raw_frame::FRAME_MAGIC;
use crate::binary::scalars::Word;
use crate::binary::writer::AseWriter;
use crate::compression::{Compression, Zlib};
use crate::loader::AsepriteFile;
use crate::tilemap::pack_tiles;
use crate::wrappers::{Cel, Frame, Tileset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeMode {
    /// Replay each frame's preserved chunk list. Every frame must carry one.
    Preserved,
    /// Ignore preserved chunks and emit the fixed canonical order.
    Canonical,
    /// Preserved when the first frame has a chunk list, canonical otherwise.
    #[default]
    Auto,
}

pub struct EncodeOptions<'c> {
    pub mode: EncodeMode,
    /// Also emit a legacy 0x0004 palette chunk ahead of the modern one, for
    /// consumers that predate it. Canonical mode only.
    pub write_legacy_palette_chunks: bool,
    /// Override of the zlib capability used to re-deflate modified payloads.
    pub compression: Option<&'c dyn Compression>,
}

impl std::fmt::Debug for EncodeOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("mode", &self.mode)
            .field("write_legacy_palette_chunks", &self.write_legacy_palette_chunks)
            .field("compression", &self.compression.map(|_| "<capability>"))
            .finish()
    }
}

impl Default for EncodeOptions<'_> {
    fn default() -> Self {
        EncodeOptions {
            mode: EncodeMode::Auto,
            write_legacy_palette_chunks: false,
            compression: None,
        }
    }
}

pub fn encode(file: &AsepriteFile<'_>, options: &EncodeOptions<'_>) -> Result<Vec<u8>, EncodeError> {
    let compression: &dyn Compression = options.compression.unwrap_or(&Zlib);
    let preserved = match options.mode {
        EncodeMode::Preserved => true,
        EncodeMode::Canonical => false,
        EncodeMode::Auto => file
            .frames
            .first()
            .is_some_and(|frame| frame.chunks.is_some()),
    };

    let mut w = AseWriter::new();
    let size_mark = encode_header(&file.header, file.frames.len() as Word, &mut w);

    if preserved {
        for (frame_index, frame) in file.frames.iter().enumerate() {
            let chunks = frame
                .chunks
                .as_ref()
                .ok_or(EncodeError::MissingChunkList { frame: frame_index })?;
            encode_frame(frame, chunks.iter().map(ChunkRef::Borrowed), &mut w)?;
        }
    } else {
        for (frame_index, frame) in file.frames.iter().enumerate() {
            let mut chunks: Vec<ChunkRef<'_, '_>> = Vec::new();
            if frame_index == 0 {
                collect_first_frame_chunks(file, options, compression, &mut chunks)?;
            }
            collect_cel_chunks(frame, compression, &mut chunks)?;
            encode_frame(frame, chunks.into_iter(), &mut w)?;
        }
    }

    let file_size = w.len() as u32;
    w.patch_dword(size_mark, file_size);
    Ok(w.into_bytes())
}

/// Either a reference into the model or a chunk rebuilt for this emission
/// (re-deflated payloads, the synthesized palette chunks).
enum ChunkRef<'a, 'f> {
    Borrowed(&'f Chunk<'a>),
    Owned(Chunk<'a>),
}

impl<'a> ChunkRef<'a, '_> {
    fn as_chunk(&self) -> &Chunk<'a> {
        match self {
            ChunkRef::Borrowed(chunk) => chunk,
            ChunkRef::Owned(chunk) => chunk,
        }
    }
}

fn encode_frame<'a: 'f, 'f>(
    frame: &Frame<'a>,
    chunks: impl Iterator<Item = ChunkRef<'a, 'f>>,
    w: &mut AseWriter,
) -> Result<(), EncodeError> {
    let frame_start = w.mark();
    w.put_dword(0);
    w.put_word(FRAME_MAGIC);
    let old_count_mark = w.mark();
    w.put_word(0);
    w.put_word(frame.duration.min(u32::from(Word::MAX)) as Word);
    w.skip(2);
    let new_count_mark = w.mark();
    w.put_dword(0);

    let mut count: u32 = 0;
    for chunk in chunks {
        encode_chunk(chunk.as_chunk(), w)?;
        count += 1;
    }

    let frame_size = (w.len() - frame_start) as u32;
    w.patch_dword(frame_start, frame_size);
    if count <= 0xFFFE {
        w.patch_word(old_count_mark, count as Word);
        w.patch_dword(new_count_mark, 0);
    } else {
        w.patch_word(old_count_mark, 0xFFFF);
        w.patch_dword(new_count_mark, count);
    }
    Ok(())
}

/// The fixed first-frame order: layers (each with its user data), color
/// profile, external files, palette, tags and their user data, slices,
/// tilesets with tileset and tile user data, sprite user data, and finally
/// the unknown chunks in their original order.
fn collect_first_frame_chunks<'a, 'f>(
    file: &'f AsepriteFile<'a>,
    options: &EncodeOptions<'_>,
    compression: &dyn Compression,
    chunks: &mut Vec<ChunkRef<'a, 'f>>,
) -> Result<(), EncodeError> {
    for layer in &file.layers {
        chunks.push(ChunkRef::Owned(Chunk::Layer(layer.chunk.clone())));
        if !layer.user_data.is_empty() {
            chunks.push(ChunkRef::Owned(Chunk::UserData(layer.user_data.clone())));
        }
    }
    if let Some(profile) = &file.color_profile {
        chunks.push(ChunkRef::Owned(Chunk::ColorProfile(profile.clone())));
    }
    if !file.external_files.is_empty() {
        chunks.push(ChunkRef::Owned(Chunk::ExternalFiles(
            crate::binary::chunks::external_files::ExternalFilesChunk {
                entries: file.external_files.clone(),
            },
        )));
    }
    if let Some(palette) = &file.palette {
        if options.write_legacy_palette_chunks {
            if let Some(old) = palette.to_old_chunk() {
                chunks.push(ChunkRef::Owned(Chunk::OldPalette04(old)));
            }
        }
        if let Some(modern) = palette.to_chunk() {
            chunks.push(ChunkRef::Owned(Chunk::Palette(modern)));
        }
    }
    if !file.tags.is_empty() {
        chunks.push(ChunkRef::Owned(Chunk::Tags(
            crate::binary::chunks::tags::TagsChunk {
                tags: file.tags.iter().map(|tag| tag.chunk.clone()).collect(),
            },
        )));
        for tag in &file.tags {
            if !tag.user_data.is_empty() {
                chunks.push(ChunkRef::Owned(Chunk::UserData(tag.user_data.clone())));
            }
        }
    }
    for slice in &file.slices {
        chunks.push(ChunkRef::Owned(Chunk::Slice(slice.chunk.clone())));
        if !slice.user_data.is_empty() {
            chunks.push(ChunkRef::Owned(Chunk::UserData(slice.user_data.clone())));
        }
    }
    for tileset in &file.tilesets {
        chunks.push(ChunkRef::Owned(tileset_chunk(tileset, compression)?));
        // The first user data after a tileset is the tileset's own; it has
        // to be present, even empty, for the per-tile ones to land right.
        if !tileset.user_data.is_empty() || !tileset.tile_user_data.is_empty() {
            chunks.push(ChunkRef::Owned(Chunk::UserData(tileset.user_data.clone())));
            for tile_user_data in &tileset.tile_user_data {
                chunks.push(ChunkRef::Owned(Chunk::UserData(tile_user_data.clone())));
            }
        }
    }
    if let Some(sprite_user_data) = &file.sprite_user_data {
        chunks.push(ChunkRef::Owned(Chunk::UserData(sprite_user_data.clone())));
    }
    for unknown in &file.unknown_chunks {
        chunks.push(ChunkRef::Owned(Chunk::Unknown(unknown.clone())));
    }
    Ok(())
}

fn collect_cel_chunks<'a, 'f>(
    frame: &'f Frame<'a>,
    compression: &dyn Compression,
    chunks: &mut Vec<ChunkRef<'a, 'f>>,
) -> Result<(), EncodeError> {
    for cel in &frame.cels {
        chunks.push(cel_chunk_ref(cel, compression)?);
        if let Some(extra) = cel.extra {
            chunks.push(ChunkRef::Owned(Chunk::CelExtra(extra)));
        }
        if !cel.user_data.is_empty() {
            chunks.push(ChunkRef::Owned(Chunk::UserData(cel.user_data.clone())));
        }
    }
    Ok(())
}

/// Emits the stored payload verbatim when the cel still holds it, otherwise
/// re-deflates the decoded cache of a modified cel.
fn cel_chunk_ref<'a, 'f>(
    cel: &'f Cel<'a>,
    compression: &dyn Compression,
) -> Result<ChunkRef<'a, 'f>, EncodeError> {
    match &cel.chunk.content {
        CelContent::CompressedImage {
            width,
            height,
            data,
        } if data.is_empty() => {
            let pixels = cel.pixels.as_ref().ok_or(EncodeError::BadChunkSize {
                chunk_type: crate::binary::chunk_type::ChunkType::Cel.to_word(),
            })?;
            let deflated = compression.deflate(pixels)?;
            Ok(ChunkRef::Owned(Chunk::Cel(CelChunk {
                content: CelContent::CompressedImage {
                    width: *width,
                    height: *height,
                    data: Cow::Owned(deflated),
                },
                ..cel.chunk.clone()
            })))
        }
        CelContent::CompressedTilemap {
            width,
            height,
            bits_per_tile,
            masks,
            data,
        } if data.is_empty() => {
            let tiles = cel.tiles.as_ref().ok_or(EncodeError::BadChunkSize {
                chunk_type: crate::binary::chunk_type::ChunkType::Cel.to_word(),
            })?;
            let packed = pack_tiles(tiles, *bits_per_tile, *masks)?;
            let deflated = compression.deflate(&packed)?;
            Ok(ChunkRef::Owned(Chunk::Cel(CelChunk {
                content: CelContent::CompressedTilemap {
                    width: *width,
                    height: *height,
                    bits_per_tile: *bits_per_tile,
                    masks: *masks,
                    data: Cow::Owned(deflated),
                },
                ..cel.chunk.clone()
            })))
        }
        _ => Ok(ChunkRef::Owned(Chunk::Cel(cel.chunk.clone()))),
    }
}

/// Tileset re-emission follows the same rule as cels: verbatim strip when
/// present, re-deflated pixel cache when the strip was dropped.
fn tileset_chunk<'a>(
    tileset: &Tileset<'a>,
    compression: &dyn Compression,
) -> Result<Chunk<'a>, EncodeError> {
    match &tileset.chunk.tiles {
        Some(strip) if strip.is_empty() => {
            let pixels = tileset.pixels.as_ref().ok_or(EncodeError::BadChunkSize {
                chunk_type: crate::binary::chunk_type::ChunkType::Tileset.to_word(),
            })?;
            let deflated = compression.deflate(pixels)?;
            let mut chunk = tileset.chunk.clone();
            chunk.tiles = Some(Cow::Owned(deflated));
            Ok(Chunk::Tileset(chunk))
        }
        _ => Ok(Chunk::Tileset(tileset.chunk.clone())),
    }
}
