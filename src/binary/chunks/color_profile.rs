use std::borrow::Cow;

use bitflags::bitflags;
use nom::bytes::complete::take;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{dword, fixed, word, Fixed, Word};
use crate::binary::writer::AseWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorProfileType {
    None,
    Srgb,
    EmbeddedIcc,
    Unknown(Word),
}

impl From<Word> for ColorProfileType {
    fn from(value: Word) -> Self {
        match value {
            0 => ColorProfileType::None,
            1 => ColorProfileType::Srgb,
            2 => ColorProfileType::EmbeddedIcc,
            other => ColorProfileType::Unknown(other),
        }
    }
}

impl ColorProfileType {
    pub fn to_word(self) -> Word {
        match self {
            ColorProfileType::None => 0,
            ColorProfileType::Srgb => 1,
            ColorProfileType::EmbeddedIcc => 2,
            ColorProfileType::Unknown(raw) => raw,
        }
    }
}

impl Default for ColorProfileType {
    fn default() -> Self {
        ColorProfileType::None
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ColorProfileFlags: Word {
        /// Use the fixed gamma below instead of the profile's.
        const SPECIAL_GAMMA = 0x1;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorProfileChunk<'a> {
    pub profile_type: ColorProfileType,
    pub flags: ColorProfileFlags,
    pub gamma: Fixed,
    /// Only present for `ColorProfileType::EmbeddedIcc`.
    pub icc_profile: Option<Cow<'a, [u8]>>,
}

pub fn parse_color_profile_chunk(input: &[u8]) -> ParseResult<'_, ColorProfileChunk<'_>> {
    let (input, profile_type) = word(input)?;
    let profile_type = ColorProfileType::from(profile_type);
    let (input, flags) = word(input)?;
    let (input, gamma) = fixed(input)?;
    let (input, _) = take(8usize)(input)?;
    let (input, icc_profile) = if profile_type == ColorProfileType::EmbeddedIcc {
        let (input, len) = dword(input)?;
        let (input, data) = take(len as usize)(input)?;
        (input, Some(Cow::Borrowed(data)))
    } else {
        (input, None)
    };
    Ok((
        input,
        ColorProfileChunk {
            profile_type,
            flags: ColorProfileFlags::from_bits_retain(flags),
            gamma,
            icc_profile,
        },
    ))
}

pub fn encode_color_profile_chunk(
    chunk: &ColorProfileChunk<'_>,
    w: &mut AseWriter,
) -> Result<(), EncodeError> {
    w.put_word(chunk.profile_type.to_word());
    w.put_word(chunk.flags.bits());
    w.put_fixed(chunk.gamma);
    w.skip(8);
    if let Some(icc) = &chunk.icc_profile {
        w.put_dword(icc.len() as u32);
        w.put_bytes(icc);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icc_profile_round_trip() {
        let chunk = ColorProfileChunk {
            profile_type: ColorProfileType::EmbeddedIcc,
            flags: ColorProfileFlags::empty(),
            gamma: Fixed::default(),
            icc_profile: Some(Cow::Borrowed(&[1, 2, 3, 4])),
        };
        let mut w = AseWriter::new();
        encode_color_profile_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_color_profile_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }
}
