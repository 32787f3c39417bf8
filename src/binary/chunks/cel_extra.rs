use bitflags::bitflags;
use nom::bytes::complete::take;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{dword, fixed, Dword, Fixed};
use crate::binary::writer::AseWriter;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CelExtraFlags: Dword {
        const PRECISE_BOUNDS = 0x1;
    }
}

/// Sub-pixel placement for the previous cel chunk: position and size as
/// 16.16 fixed-point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CelExtraChunk {
    pub flags: CelExtraFlags,
    pub x: Fixed,
    pub y: Fixed,
    pub width: Fixed,
    pub height: Fixed,
}

pub fn parse_cel_extra_chunk(input: &[u8]) -> ParseResult<'_, CelExtraChunk> {
    let (input, flags) = dword(input)?;
    let (input, x) = fixed(input)?;
    let (input, y) = fixed(input)?;
    let (input, width) = fixed(input)?;
    let (input, height) = fixed(input)?;
    let (input, _) = take(16usize)(input)?;
    Ok((
        input,
        CelExtraChunk {
            flags: CelExtraFlags::from_bits_retain(flags),
            x,
            y,
            width,
            height,
        },
    ))
}

pub fn encode_cel_extra_chunk(chunk: &CelExtraChunk, w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_dword(chunk.flags.bits());
    w.put_fixed(chunk.x);
    w.put_fixed(chunk.y);
    w.put_fixed(chunk.width);
    w.put_fixed(chunk.height);
    w.skip(16);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cel_extra_round_trip() {
        let chunk = CelExtraChunk {
            flags: CelExtraFlags::PRECISE_BOUNDS,
            x: Fixed::from_f64(1.25),
            y: Fixed::from_f64(-2.5),
            width: Fixed::from_f64(16.0),
            height: Fixed::from_f64(16.0),
        };
        let mut w = AseWriter::new();
        encode_cel_extra_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_cel_extra_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }
}
