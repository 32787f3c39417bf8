//! The stateful walk over each frame's chunk sequence. The wire format
//! leaves ownership of user data, cel extras, tag metadata and tile metadata
//! implicit: a chunk belongs to whatever attachable thing was decoded just
//! before it. This module owns those rules and nothing else, so they can be
//! exercised with synthetic chunk sequences, away from the byte layer.

use tracing::debug;

use crate::binary::chunk::{Chunk, UnknownChunk};
use crate::binary::chunks::external_files::ExternalFile;
use crate::binary::chunks::old_palette::OldPaletteChunk;
use crate::binary::chunks::color_profile::ColorProfileChunk;
use crate::binary::chunks::user_data::UserDataChunk;
use crate::binary::palette::Palette;
use crate::wrappers::{Cel, Frame, Layer, Slice, Tag, Tileset};

/// What a user data chunk would currently attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum AttachTarget {
    #[default]
    None,
    Layer(usize),
    Cel(usize, usize),
    Slice(usize),
    Tileset(usize),
}

/// Walks the slots of the tags chunk that was just decoded: the next user
/// data chunks go to tags[start], tags[start + 1], …
#[derive(Debug, Clone, Copy)]
struct TagsCursor {
    start: usize,
    len: usize,
    next: usize,
}

/// After a tileset chunk the first user data chunk is the tileset's own,
/// every one after that belongs to tile 0, 1, 2, … up to the tile count.
#[derive(Debug, Clone, Copy)]
struct TilesetCursor {
    tileset: usize,
    tile_phase: bool,
    tile_index: u32,
}

#[derive(Debug, Default)]
pub struct ChunkInterpreter<'a> {
    pub layers: Vec<Layer<'a>>,
    pub frames: Vec<Frame<'a>>,
    pub tags: Vec<Tag<'a>>,
    pub slices: Vec<Slice<'a>>,
    pub tilesets: Vec<Tileset<'a>>,
    pub palette: Palette<'a>,
    pub saw_palette_chunk: bool,
    pub old_palettes: Vec<OldPaletteChunk>,
    pub color_profile: Option<ColorProfileChunk<'a>>,
    pub external_files: Vec<ExternalFile<'a>>,
    pub sprite_user_data: Option<UserDataChunk<'a>>,
    pub unknown_chunks: Vec<UnknownChunk<'a>>,

    attach: AttachTarget,
    pending_tags: Option<TagsCursor>,
    pending_tileset: Option<TilesetCursor>,
    last_cel: Option<(usize, usize)>,
}

impl<'a> ChunkInterpreter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the next frame. `duration` is the effective duration, after
    /// the zero-duration fallback to the header speed.
    pub fn begin_frame(&mut self, duration: u32) {
        self.frames.push(Frame {
            duration,
            cels: Vec::new(),
            chunks: None,
        });
    }

    fn clear_cursors(&mut self) {
        self.pending_tags = None;
        self.pending_tileset = None;
    }

    pub fn interpret(&mut self, chunk: Chunk<'a>) {
        match chunk {
            Chunk::Layer(layer) => {
                self.clear_cursors();
                self.attach = AttachTarget::Layer(self.layers.len());
                self.layers.push(Layer {
                    chunk: layer,
                    user_data: UserDataChunk::default(),
                });
            }
            Chunk::Cel(cel) => {
                self.clear_cursors();
                let frame_index = self.frames.len().saturating_sub(1);
                let Some(frame) = self.frames.last_mut() else {
                    debug!("cel chunk before any frame, discarding");
                    return;
                };
                let cel_index = frame.cels.len();
                frame.cels.push(Cel::new(cel));
                self.attach = AttachTarget::Cel(frame_index, cel_index);
                self.last_cel = Some((frame_index, cel_index));
            }
            Chunk::CelExtra(extra) => {
                if let Some((frame, cel)) = self.last_cel {
                    self.frames[frame].cels[cel].extra = Some(extra);
                } else {
                    debug!("cel extra chunk without a previous cel, discarding");
                }
            }
            Chunk::Slice(slice) => {
                self.clear_cursors();
                self.attach = AttachTarget::Slice(self.slices.len());
                self.slices.push(Slice {
                    chunk: slice,
                    user_data: UserDataChunk::default(),
                });
            }
            Chunk::Tileset(tileset) => {
                self.pending_tags = None;
                let index = self.tilesets.len();
                self.attach = AttachTarget::Tileset(index);
                self.pending_tileset = Some(TilesetCursor {
                    tileset: index,
                    tile_phase: false,
                    tile_index: 0,
                });
                self.tilesets.push(Tileset::new(tileset));
            }
            Chunk::Tags(tags) => {
                self.attach = AttachTarget::None;
                self.pending_tileset = None;
                self.pending_tags = Some(TagsCursor {
                    start: self.tags.len(),
                    len: tags.tags.len(),
                    next: 0,
                });
                self.tags.extend(tags.tags.into_iter().map(|chunk| Tag {
                    chunk,
                    user_data: UserDataChunk::default(),
                }));
            }
            Chunk::Palette(palette) => {
                self.attach = AttachTarget::None;
                self.clear_cursors();
                self.saw_palette_chunk = true;
                self.palette.apply_chunk(&palette);
            }
            Chunk::OldPalette04(palette) | Chunk::OldPalette11(palette) => {
                self.attach = AttachTarget::None;
                self.clear_cursors();
                self.old_palettes.push(palette);
            }
            Chunk::ColorProfile(profile) => {
                self.attach = AttachTarget::None;
                self.clear_cursors();
                self.color_profile = Some(profile);
            }
            Chunk::ExternalFiles(files) => {
                self.attach = AttachTarget::None;
                self.clear_cursors();
                self.external_files.extend(files.entries);
            }
            Chunk::UserData(user_data) => self.attach_user_data(user_data),
            Chunk::Unknown(unknown) => {
                self.unknown_chunks.push(unknown);
            }
        }
    }

    /// The attachment rules, first match wins: the pending tags cursor, the
    /// pending tileset cursor, the last attachable entity, sprite-level user
    /// data on the first frame, or the floor.
    fn attach_user_data(&mut self, user_data: UserDataChunk<'a>) {
        if let Some(cursor) = &mut self.pending_tags {
            if cursor.next < cursor.len {
                self.tags[cursor.start + cursor.next].user_data = user_data;
                cursor.next += 1;
                return;
            }
        }
        if let Some(cursor) = &mut self.pending_tileset {
            let tileset = &mut self.tilesets[cursor.tileset];
            if !cursor.tile_phase {
                tileset.user_data = user_data;
                cursor.tile_phase = true;
                cursor.tile_index = 0;
            } else if cursor.tile_index < tileset.chunk.tile_count {
                tileset.tile_user_data.push(user_data);
                cursor.tile_index += 1;
            } else {
                debug!("user data past the tile count, discarding");
            }
            return;
        }
        match self.attach {
            AttachTarget::Layer(index) => self.layers[index].user_data = user_data,
            AttachTarget::Cel(frame, cel) => self.frames[frame].cels[cel].user_data = user_data,
            AttachTarget::Slice(index) => self.slices[index].user_data = user_data,
            AttachTarget::Tileset(index) => self.tilesets[index].user_data = user_data,
            AttachTarget::None => {
                if self.frames.len() <= 1 {
                    self.sprite_user_data = Some(user_data);
                } else {
                    debug!("user data with no attachable target, discarding");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::binary::blend_mode::BlendMode;
    use crate::binary::chunks::cel::{CelChunk, CelContent};
    use crate::binary::chunks::layer::{LayerChunk, LayerFlags, LayerType};
    use crate::binary::chunks::tags::{AnimationDirection, TagChunk, TagsChunk};
    use crate::binary::chunks::tileset::{TilesetChunk, TilesetFlags};

    fn user_data(text: &str) -> Chunk<'static> {
        Chunk::UserData(UserDataChunk {
            text: Some(Cow::Owned(text.to_owned())),
            color: None,
            properties: None,
        })
    }

    fn layer(name: &str) -> Chunk<'static> {
        Chunk::Layer(LayerChunk {
            flags: LayerFlags::VISIBLE,
            layer_type: LayerType::Normal,
            child_level: 0,
            default_width: 0,
            default_height: 0,
            blend_mode: BlendMode::Normal,
            opacity: 255,
            name: Cow::Owned(name.to_owned()),
            tileset_index: None,
        })
    }

    fn cel(layer_index: u16) -> Chunk<'static> {
        Chunk::Cel(CelChunk {
            layer_index,
            x: 0,
            y: 0,
            opacity: 255,
            z_index: 0,
            content: CelContent::Linked { frame_position: 0 },
        })
    }

    fn tags(names: &[&str]) -> Chunk<'static> {
        Chunk::Tags(TagsChunk {
            tags: names
                .iter()
                .map(|name| TagChunk {
                    from_frame: 0,
                    to_frame: 0,
                    direction: AnimationDirection::Forward,
                    repeat: 0,
                    color: [0, 0, 0],
                    name: Cow::Owned((*name).to_owned()),
                })
                .collect(),
        })
    }

    fn tileset(tile_count: u32) -> Chunk<'static> {
        Chunk::Tileset(TilesetChunk {
            id: 0,
            flags: TilesetFlags::TILES,
            tile_count,
            tile_width: 8,
            tile_height: 8,
            base_index: 1,
            name: Cow::Borrowed("tiles"),
            external: None,
            tiles: Some(Cow::Borrowed(&[])),
        })
    }

    fn run(chunks: Vec<Chunk<'static>>) -> ChunkInterpreter<'static> {
        let mut interpreter = ChunkInterpreter::new();
        interpreter.begin_frame(100);
        for chunk in chunks {
            interpreter.interpret(chunk);
        }
        interpreter
    }

    #[test]
    fn user_data_attaches_to_previous_layer_and_cel() {
        let it = run(vec![
            layer("a"),
            user_data("layer a"),
            layer("b"),
            cel(0),
            user_data("cel 0"),
        ]);
        assert_eq!(it.layers[0].user_data.text.as_deref(), Some("layer a"));
        assert!(it.layers[1].user_data.is_empty());
        assert_eq!(it.frames[0].cels[0].user_data.text.as_deref(), Some("cel 0"));
    }

    #[test]
    fn tags_consume_user_data_in_order_then_fall_through() {
        let it = run(vec![
            tags(&["t0", "t1", "t2"]),
            user_data("for t0"),
            user_data("for t1"),
            user_data("for t2"),
            user_data("sprite level"),
        ]);
        assert_eq!(it.tags[0].user_data.text.as_deref(), Some("for t0"));
        assert_eq!(it.tags[1].user_data.text.as_deref(), Some("for t1"));
        assert_eq!(it.tags[2].user_data.text.as_deref(), Some("for t2"));
        // The cursor is exhausted and the tags chunk cleared the attach
        // target, so the fourth chunk lands on the sprite (frame 0).
        assert_eq!(it.sprite_user_data.unwrap().text.as_deref(), Some("sprite level"));
    }

    #[test]
    fn partial_tag_user_data() {
        let it = run(vec![tags(&["t0", "t1", "t2"]), user_data("a"), user_data("b")]);
        assert!(!it.tags[0].user_data.is_empty());
        assert!(!it.tags[1].user_data.is_empty());
        assert!(it.tags[2].user_data.is_empty());
    }

    #[test]
    fn tileset_user_data_phases() {
        let it = run(vec![
            tileset(2),
            user_data("the tileset"),
            user_data("tile 0"),
            user_data("tile 1"),
        ]);
        let ts = &it.tilesets[0];
        assert_eq!(ts.user_data.text.as_deref(), Some("the tileset"));
        assert_eq!(ts.tile_user_data.len(), 2);
        assert_eq!(ts.tile_user_data[1].text.as_deref(), Some("tile 1"));
    }

    #[test]
    fn tile_user_data_is_bounded_by_tile_count() {
        let it = run(vec![
            tileset(1),
            user_data("the tileset"),
            user_data("tile 0"),
            user_data("beyond"),
        ]);
        assert_eq!(it.tilesets[0].tile_user_data.len(), 1);
        assert!(it.sprite_user_data.is_none());
    }

    #[test]
    fn sprite_user_data_only_on_first_frame() {
        let mut interpreter = ChunkInterpreter::new();
        interpreter.begin_frame(100);
        interpreter.begin_frame(100);
        interpreter.interpret(user_data("late"));
        assert!(interpreter.sprite_user_data.is_none());
    }

    #[test]
    fn cel_extra_attaches_to_last_cel() {
        use crate::binary::chunks::cel_extra::{CelExtraChunk, CelExtraFlags};
        let it = run(vec![
            cel(0),
            Chunk::CelExtra(CelExtraChunk {
                flags: CelExtraFlags::PRECISE_BOUNDS,
                ..CelExtraChunk::default()
            }),
        ]);
        assert!(it.frames[0].cels[0].extra.is_some());
    }
}
