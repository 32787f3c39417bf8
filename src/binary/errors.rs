use nom::error::ErrorKind;
use thiserror::Error;

use crate::compression::CompressionError;
use crate::tilemap::InvalidBitsPerTile;

use super::scalars::Word;

pub type ParseResult<'a, T> = nom::IResult<&'a [u8], T, ParseError<'a>>;

/// Wire-level parse failure. The named variants cover the structurally
/// invalid cases; everything else is a plain nom error carrying the failing
/// input position so the caller can recover an absolute byte offset.
#[derive(Debug, PartialEq, Error)]
pub enum ParseError<'a> {
    #[error("bad file magic number {0:#06x}")]
    BadFileMagic(Word),
    #[error("bad frame magic number {0:#06x}")]
    BadFrameMagic(Word),
    #[error("unsupported color depth {0}")]
    UnsupportedColorDepth(Word),
    #[error("invalid cel type {0}")]
    InvalidCelType(Word),
    #[error("declared chunk size smaller than the 6-byte chunk header")]
    BadChunkSize,
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    #[error("parse error {kind:?}")]
    Nom { input: &'a [u8], kind: ErrorKind },
}

impl<'a> ParseError<'a> {
    /// The input position the error occurred at, when one was recorded.
    pub fn input(&self) -> Option<&'a [u8]> {
        match self {
            ParseError::Nom { input, .. } => Some(input),
            _ => None,
        }
    }
}

impl<'a> nom::error::ParseError<&'a [u8]> for ParseError<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        ParseError::Nom { input, kind }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

/// Everything that can go wrong while turning bytes into a sprite, or while
/// operating on the decoded model (linked-cel resolution, pixel and tilemap
/// decoding). Offsets are absolute positions in the decoded buffer where
/// known.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("bad magic number {found:#06x} at byte {offset}")]
    BadMagic {
        found: Word,
        offset: usize,
        frame: Option<usize>,
    },
    #[error("read past end of input near byte {offset}")]
    OutOfBounds {
        offset: usize,
        frame: Option<usize>,
        chunk_type: Option<Word>,
    },
    #[error("declared size inconsistent with payload (frame {frame:?}, byte {offset:?})")]
    BadChunkSize {
        offset: Option<usize>,
        frame: Option<usize>,
    },
    #[error("unsupported color depth {0}")]
    UnsupportedColorDepth(Word),
    #[error("invalid cel type {cel_type} (frame {frame:?})")]
    InvalidCelType {
        cel_type: Word,
        frame: Option<usize>,
    },
    #[error("invalid layer type {layer_type} (frame {frame:?})")]
    InvalidLayerType {
        layer_type: Word,
        frame: Option<usize>,
    },
    #[error("string is not valid utf-8 in frame {frame:?}")]
    InvalidString { frame: Option<usize> },
    #[error("decompression failed: {0}")]
    DecompressionFailed(#[from] CompressionError),
    #[error("linked cel in frame {frame} has no target on layer {layer}")]
    InvalidLinkedCel { frame: usize, layer: usize },
    #[error("no tileset at index {tileset_index}")]
    MissingTileset { tileset_index: u32 },
    #[error("tile index {tile_index} outside 0..{tile_count}")]
    TileIndexOutOfBounds { tile_index: u32, tile_count: u32 },
    #[error(transparent)]
    InvalidBitsPerTile(#[from] InvalidBitsPerTile),
}

/// Encode-side failures. `BadChunkSize` doubles for the two unrecoverable
/// cases: a payload too large for the u32 size field, and a raw value or
/// chunk that was asked to re-emit bytes it never preserved.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("string length {0} exceeds the 65535 byte limit")]
    StringTooLong(usize),
    #[error("chunk {chunk_type:#06x} cannot be framed with a consistent size")]
    BadChunkSize { chunk_type: Word },
    #[error("compression failed: {0}")]
    CompressionFailed(#[from] CompressionError),
    #[error("cannot pack tilemap: {0}")]
    InvalidBitsPerTile(#[from] InvalidBitsPerTile),
    #[error("frame {frame} has no preserved chunk list")]
    MissingChunkList { frame: usize },
}
