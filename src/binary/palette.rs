use super::chunks::old_palette::OldPaletteChunk;
use super::chunks::palette::{PaletteChunk, PaletteEntry};
use super::scalars::Color;

/// The effective color table of the sprite, dense from index 0. Modern
/// palette chunks write windows into it; old palette chunks are replayed
/// packet by packet when no modern chunk exists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Palette<'a> {
    pub entries: Vec<PaletteEntry<'a>>,
}

impl<'a> Palette<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn color(&self, index: usize) -> Option<Color> {
        self.entries.get(index).map(|entry| entry.color)
    }

    fn ensure_len(&mut self, len: usize) {
        if self.entries.len() < len {
            self.entries.resize(
                len,
                PaletteEntry {
                    color: Color::default(),
                    name: None,
                },
            );
        }
    }

    /// Writes the chunk's `[first_index, last_index]` window into the table.
    pub fn apply_chunk(&mut self, chunk: &PaletteChunk<'a>) {
        let first = chunk.first_index as usize;
        self.ensure_len(first + chunk.entries.len());
        for (offset, entry) in chunk.entries.iter().enumerate() {
            self.entries[first + offset] = entry.clone();
        }
    }

    /// Replays one old palette chunk: each packet skips some slots and then
    /// writes a run of RGB colors at the running index, always fully opaque.
    pub fn apply_old_packets(&mut self, chunk: &OldPaletteChunk) {
        let mut index = 0usize;
        for packet in &chunk.packets {
            index += packet.skip as usize;
            self.ensure_len(index + packet.colors.len());
            for &[red, green, blue] in &packet.colors {
                self.entries[index] = PaletteEntry {
                    color: Color {
                        red,
                        green,
                        blue,
                        alpha: 255,
                    },
                    name: None,
                };
                index += 1;
            }
        }
    }

    /// The single modern chunk this table re-encodes as.
    pub fn to_chunk(&self) -> Option<PaletteChunk<'a>> {
        if self.entries.is_empty() {
            return None;
        }
        Some(PaletteChunk {
            size: self.entries.len() as u32,
            first_index: 0,
            last_index: self.entries.len() as u32 - 1,
            entries: self.entries.clone(),
        })
    }

    /// The legacy packet form: a single packet covering the first 256
    /// entries, alpha dropped.
    pub fn to_old_chunk(&self) -> Option<OldPaletteChunk> {
        use super::chunks::old_palette::OldPalettePacket;
        if self.entries.is_empty() {
            return None;
        }
        let colors = self
            .entries
            .iter()
            .take(256)
            .map(|entry| [entry.color.red, entry.color.green, entry.color.blue])
            .collect();
        Some(OldPaletteChunk {
            packets: vec![OldPalettePacket { skip: 0, colors }],
        })
    }
}

/// Builds the palette from old chunks alone, for files that predate the
/// modern palette chunk.
pub fn palette_from_old_chunks<'a>(chunks: &[OldPaletteChunk]) -> Palette<'a> {
    let mut palette = Palette::default();
    for chunk in chunks {
        palette.apply_old_packets(chunk);
    }
    palette
}
