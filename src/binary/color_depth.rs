use super::scalars::Word;

/// Color depth from the file header, in bits per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// 8 bpp, palette indices.
    Indexed,
    /// 16 bpp, grayscale value + alpha.
    Grayscale,
    /// 32 bpp RGBA.
    Rgba,
    /// Anything else; only reachable with `strict = false`.
    Unknown(Word),
}

impl From<Word> for ColorDepth {
    fn from(value: Word) -> Self {
        match value {
            8 => ColorDepth::Indexed,
            16 => ColorDepth::Grayscale,
            32 => ColorDepth::Rgba,
            other => ColorDepth::Unknown(other),
        }
    }
}

impl ColorDepth {
    pub fn to_word(self) -> Word {
        match self {
            ColorDepth::Indexed => 8,
            ColorDepth::Grayscale => 16,
            ColorDepth::Rgba => 32,
            ColorDepth::Unknown(raw) => raw,
        }
    }

    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            ColorDepth::Indexed => Some(1),
            ColorDepth::Grayscale => Some(2),
            ColorDepth::Rgba => Some(4),
            ColorDepth::Unknown(_) => None,
        }
    }
}
