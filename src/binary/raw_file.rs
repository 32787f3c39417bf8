use nom::Offset;

use super::errors::{DecodeError, ParseError};
use super::header::{parse_header, Header};
use super::raw_frame::{parse_rawframe, RawFrame};

/// The file skeleton: the header plus every frame's flat chunk list, before
/// any interpretation.
#[derive(Debug)]
pub struct RawFile<'a> {
    pub header: Header,
    pub frames: Vec<RawFrame<'a>>,
}

/// Parses the whole file structure. With `strict` set, magic numbers and the
/// color depth gate the decode; without it mismatches are recorded in the
/// header and parsing continues, which is what recovery tooling wants.
pub fn parse_raw_file(data: &[u8], strict: bool) -> Result<RawFile<'_>, DecodeError> {
    let (mut rest, header) =
        parse_header(data, strict).map_err(|e| into_decode_error(data, None, 0, e))?;

    let mut frames = Vec::with_capacity(header.frame_count as usize);
    for frame_index in 0..header.frame_count as usize {
        let frame_offset = data.offset(rest);
        let (after, frame) = parse_rawframe(rest, strict)
            .map_err(|e| into_decode_error(data, Some(frame_index), frame_offset, e))?;
        frames.push(frame);
        rest = after;
    }

    Ok(RawFile { header, frames })
}

fn into_decode_error(
    base: &[u8],
    frame: Option<usize>,
    frame_offset: usize,
    err: nom::Err<ParseError<'_>>,
) -> DecodeError {
    match err {
        nom::Err::Incomplete(_) => DecodeError::OutOfBounds {
            offset: base.len(),
            frame,
            chunk_type: None,
        },
        nom::Err::Error(e) | nom::Err::Failure(e) => match e {
            ParseError::BadFileMagic(found) => DecodeError::BadMagic {
                found,
                offset: 4,
                frame: None,
            },
            ParseError::BadFrameMagic(found) => DecodeError::BadMagic {
                found,
                offset: frame_offset + 4,
                frame,
            },
            ParseError::UnsupportedColorDepth(depth) => DecodeError::UnsupportedColorDepth(depth),
            ParseError::InvalidCelType(cel_type) => DecodeError::InvalidCelType { cel_type, frame },
            ParseError::BadChunkSize => DecodeError::BadChunkSize {
                offset: Some(frame_offset),
                frame,
            },
            ParseError::InvalidUtf8 => DecodeError::InvalidString { frame },
            ParseError::Nom { input, .. } => DecodeError::OutOfBounds {
                offset: base.offset(input),
                frame,
                chunk_type: None,
            },
        },
    }
}
