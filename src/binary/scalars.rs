//! Scalar types of the .aseprite wire format and their nom parsers. All
//! integers are little-endian. The names follow the file-format document:
//! BYTE, WORD, SHORT, DWORD, LONG, QWORD, LONG64, FIXED.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use nom::bytes::complete::take;
use nom::number::complete::{
    le_f32, le_f64, le_i16, le_i32, le_i64, le_u16, le_u32, le_u64, le_u8,
};

use super::errors::{ParseError, ParseResult};

pub type Byte = u8;
pub type Word = u16;
pub type Short = i16;
pub type Dword = u32;
pub type Long = i32;
pub type Qword = u64;
pub type Long64 = i64;
pub type Float = f32;
pub type Double = f64;

pub fn byte(input: &[u8]) -> ParseResult<'_, Byte> {
    le_u8(input)
}

pub fn word(input: &[u8]) -> ParseResult<'_, Word> {
    le_u16(input)
}

pub fn short(input: &[u8]) -> ParseResult<'_, Short> {
    le_i16(input)
}

pub fn dword(input: &[u8]) -> ParseResult<'_, Dword> {
    le_u32(input)
}

pub fn long(input: &[u8]) -> ParseResult<'_, Long> {
    le_i32(input)
}

pub fn qword(input: &[u8]) -> ParseResult<'_, Qword> {
    le_u64(input)
}

pub fn long64(input: &[u8]) -> ParseResult<'_, Long64> {
    le_i64(input)
}

pub fn float(input: &[u8]) -> ParseResult<'_, Float> {
    le_f32(input)
}

pub fn double(input: &[u8]) -> ParseResult<'_, Double> {
    le_f64(input)
}

/// 16.16 signed fixed-point value, stored as the raw wire integer so a
/// decode/encode round trip is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fixed(pub Long);

impl Fixed {
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 65536.0
    }

    /// Precision loss is at most 1/65536.
    pub fn from_f64(value: f64) -> Self {
        Fixed((value * 65536.0).round() as Long)
    }
}

pub fn fixed(input: &[u8]) -> ParseResult<'_, Fixed> {
    let (input, raw) = long(input)?;
    Ok((input, Fixed(raw)))
}

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub red: Byte,
    pub green: Byte,
    pub blue: Byte,
    pub alpha: Byte,
}

pub fn parse_color(input: &[u8]) -> ParseResult<'_, Color> {
    let (input, channels) = take(4usize)(input)?;
    Ok((
        input,
        Color {
            red: channels[0],
            green: channels[1],
            blue: channels[2],
            alpha: channels[3],
        },
    ))
}

/// Length-prefixed string: WORD byte count followed by that many bytes of
/// UTF-8. The empty string is the two zero bytes of its length prefix.
pub fn parse_string(input: &[u8]) -> ParseResult<'_, Cow<'_, str>> {
    let (input, len) = word(input)?;
    let (input, bytes) = take(len as usize)(input)?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok((input, Cow::Borrowed(s))),
        Err(_) => Err(nom::Err::Failure(ParseError::InvalidUtf8)),
    }
}

/// 16 raw bytes on the wire, shown in the canonical 8-4-4-4-12 dashed hex
/// form. `FromStr` accepts the dashed form or 32 bare hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uuid(pub [u8; 16]);

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12],
            b[13], b[14], b[15],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not a valid uuid string")]
pub struct UuidParseError;

impl FromStr for Uuid {
    type Err = UuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 16];
        let mut nibbles = 0usize;
        for c in s.chars() {
            if c == '-' {
                continue;
            }
            let digit = c.to_digit(16).ok_or(UuidParseError)? as u8;
            if nibbles >= 32 {
                return Err(UuidParseError);
            }
            let i = nibbles / 2;
            bytes[i] = (bytes[i] << 4) | digit;
            nibbles += 1;
        }
        if nibbles != 32 {
            return Err(UuidParseError);
        }
        Ok(Uuid(bytes))
    }
}

pub fn parse_uuid(input: &[u8]) -> ParseResult<'_, Uuid> {
    let (input, bytes) = take(16usize)(input)?;
    let mut raw = [0u8; 16];
    raw.copy_from_slice(bytes);
    Ok((input, Uuid(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_round_trip() {
        let f = Fixed::from_f64(1.5);
        assert_eq!(f, Fixed(0x0001_8000));
        assert_eq!(f.to_f64(), 1.5);
        assert_eq!(Fixed::from_f64(-0.25).0, -16384);
    }

    #[test]
    fn string_empty_and_utf8() {
        let (rest, s) = parse_string(&[0, 0, 0xff]).unwrap();
        assert_eq!(s, "");
        assert_eq!(rest, &[0xff]);

        let (_, s) = parse_string(&[4, 0, b'n', b'a', b'm', b'e']).unwrap();
        assert_eq!(s, "name");

        assert!(parse_string(&[2, 0, 0xff, 0xfe]).is_err());
    }

    #[test]
    fn uuid_display_and_parse() {
        let u = Uuid([
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
            0x77, 0x88,
        ]);
        let s = u.to_string();
        assert_eq!(s, "12345678-9abc-def0-1122-334455667788");
        assert_eq!(s.parse::<Uuid>().unwrap(), u);
        assert_eq!("123456789abcdef01122334455667788".parse::<Uuid>().unwrap(), u);
        assert!("12345".parse::<Uuid>().is_err());
    }
}
