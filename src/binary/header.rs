use bitflags::bitflags;
use nom::bytes::complete::take;

use super::color_depth::ColorDepth;
use super::errors::{ParseError, ParseResult};
use super::scalars::{byte, dword, short, word, Byte, Dword, Short, Word};
use super::writer::AseWriter;

pub const FILE_MAGIC: Word = 0xA5E0;
pub const HEADER_SIZE: usize = 128;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeaderFlags: Dword {
        /// Layer opacity has a valid value.
        const LAYER_OPACITY_VALID = 0x1;
    }
}

/// The 128-byte file header. The raw `magic` is kept so a non-strict decode
/// can surface what it actually found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Whole-file size as declared on the wire; back-patched on encode.
    pub file_size: Dword,
    pub magic: Word,
    pub frame_count: Word,
    pub width: Word,
    pub height: Word,
    pub color_depth: ColorDepth,
    pub flags: HeaderFlags,
    /// Deprecated global frame duration in ms; substituted for frames that
    /// declare a zero duration.
    pub speed: Word,
    /// Palette index treated as transparent. Indexed color depth only.
    pub transparent_index: Byte,
    pub color_count: Word,
    pub pixel_width: Byte,
    pub pixel_height: Byte,
    pub grid_x: Short,
    pub grid_y: Short,
    pub grid_width: Word,
    pub grid_height: Word,
}

impl Header {
    /// A header for a new sprite with the defaults the format documents:
    /// square pixels, 16x16 grid, 100 ms speed.
    pub fn new(width: Word, height: Word, color_depth: ColorDepth) -> Self {
        Header {
            file_size: 0,
            magic: FILE_MAGIC,
            frame_count: 0,
            width,
            height,
            color_depth,
            flags: HeaderFlags::LAYER_OPACITY_VALID,
            speed: 100,
            transparent_index: 0,
            color_count: 0,
            pixel_width: 1,
            pixel_height: 1,
            grid_x: 0,
            grid_y: 0,
            grid_width: 16,
            grid_height: 16,
        }
    }
}

pub fn parse_header(input: &[u8], strict: bool) -> ParseResult<'_, Header> {
    let (input, file_size) = dword(input)?;
    let (input, magic) = word(input)?;
    if strict && magic != FILE_MAGIC {
        return Err(nom::Err::Failure(ParseError::BadFileMagic(magic)));
    }
    let (input, frame_count) = word(input)?;
    let (input, width) = word(input)?;
    let (input, height) = word(input)?;
    let (input, raw_depth) = word(input)?;
    let color_depth = ColorDepth::from(raw_depth);
    if strict && matches!(color_depth, ColorDepth::Unknown(_)) {
        return Err(nom::Err::Failure(ParseError::UnsupportedColorDepth(
            raw_depth,
        )));
    }
    let (input, flags) = dword(input)?;
    let (input, speed) = word(input)?;
    let (input, _) = take(8usize)(input)?;
    let (input, transparent_index) = byte(input)?;
    let (input, _) = take(3usize)(input)?;
    let (input, color_count) = word(input)?;
    let (input, pixel_width) = byte(input)?;
    let (input, pixel_height) = byte(input)?;
    let (input, grid_x) = short(input)?;
    let (input, grid_y) = short(input)?;
    let (input, grid_width) = word(input)?;
    let (input, grid_height) = word(input)?;
    let (input, _) = take(84usize)(input)?;

    Ok((
        input,
        Header {
            file_size,
            magic,
            frame_count,
            width,
            height,
            color_depth,
            flags: HeaderFlags::from_bits_retain(flags),
            speed,
            transparent_index,
            color_count,
            pixel_width,
            pixel_height,
            grid_x,
            grid_y,
            grid_width,
            grid_height,
        },
    ))
}

/// Writes the 128-byte header with a zero size field; the caller patches the
/// final size at `size_mark` once the frames are emitted.
pub fn encode_header(header: &Header, frame_count: Word, w: &mut AseWriter) -> usize {
    let size_mark = w.mark();
    w.put_dword(0);
    w.put_word(FILE_MAGIC);
    w.put_word(frame_count);
    w.put_word(header.width);
    w.put_word(header.height);
    w.put_word(header.color_depth.to_word());
    w.put_dword(header.flags.bits());
    w.put_word(header.speed);
    w.skip(8);
    w.put_byte(header.transparent_index);
    w.skip(3);
    w.put_word(header.color_count);
    w.put_byte(header.pixel_width);
    w.put_byte(header.pixel_height);
    w.put_short(header.grid_x);
    w.put_short(header.grid_y);
    w.put_word(header.grid_width);
    w.put_word(header.grid_height);
    w.skip(84);
    size_mark
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = Header::new(64, 32, ColorDepth::Rgba);
        let mut w = AseWriter::new();
        encode_header(&header, 3, &mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let (rest, parsed) = parse_header(&bytes, true).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.width, 64);
        assert_eq!(parsed.height, 32);
        assert_eq!(parsed.frame_count, 3);
        assert_eq!(parsed.color_depth, ColorDepth::Rgba);
        assert_eq!(parsed.grid_width, 16);
    }

    #[test]
    fn bad_magic_is_strict_only() {
        let header = Header::new(8, 8, ColorDepth::Indexed);
        let mut w = AseWriter::new();
        encode_header(&header, 1, &mut w);
        let mut bytes = w.into_bytes();
        bytes[4] = 0x00;
        bytes[5] = 0x00;

        assert!(matches!(
            parse_header(&bytes, true),
            Err(nom::Err::Failure(ParseError::BadFileMagic(0)))
        ));
        let (_, parsed) = parse_header(&bytes, false).unwrap();
        assert_eq!(parsed.magic, 0);
    }
}
