use strum_macros::FromRepr;

use super::scalars::Word;

/// The chunk-type codes this codec understands. Every other code is kept as
/// an unknown chunk with its payload intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u16)]
pub enum ChunkType {
    /// Old palette chunk, 4-bit-era packets.
    OldPalette04 = 0x0004,
    /// Old palette chunk, 6-bit-era packets. Same shape as 0x0004.
    OldPalette11 = 0x0011,
    Layer = 0x2004,
    Cel = 0x2005,
    CelExtra = 0x2006,
    ColorProfile = 0x2007,
    ExternalFiles = 0x2008,
    Tags = 0x2018,
    Palette = 0x2019,
    UserData = 0x2020,
    Slice = 0x2022,
    Tileset = 0x2023,
}

impl ChunkType {
    pub fn from_word(value: Word) -> Option<Self> {
        ChunkType::from_repr(value)
    }

    pub fn to_word(self) -> Word {
        self as Word
    }
}
