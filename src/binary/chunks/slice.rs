use std::borrow::Cow;

use bitflags::bitflags;
use nom::combinator::cond;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{dword, long, parse_string, Dword, Long};
use crate::binary::writer::AseWriter;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SliceFlags: Dword {
        const NINE_PATCH = 0x1;
        const HAS_PIVOT = 0x2;
    }
}

/// Center rectangle of a 9-patch slice, relative to the slice bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NinePatch {
    pub center_x: Long,
    pub center_y: Long,
    pub center_width: Dword,
    pub center_height: Dword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pivot {
    pub x: Long,
    pub y: Long,
}

/// A slice key takes effect at `frame` and stays in effect until another key
/// replaces it. Keys are stored sorted by frame, which `key_at` relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceKey {
    pub frame: Dword,
    pub x: Long,
    pub y: Long,
    pub width: Dword,
    pub height: Dword,
    pub nine_patch: Option<NinePatch>,
    pub pivot: Option<Pivot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceChunk<'a> {
    pub name: Cow<'a, str>,
    pub flags: SliceFlags,
    pub keys: Vec<SliceKey>,
}

impl SliceChunk<'_> {
    /// The key in effect on `frame`: the one with the greatest frame index
    /// not beyond it. `None` before the first key.
    pub fn key_at(&self, frame: Dword) -> Option<&SliceKey> {
        let next = self.keys.partition_point(|key| key.frame <= frame);
        next.checked_sub(1).map(|i| &self.keys[i])
    }
}

pub fn parse_slice_chunk(input: &[u8]) -> ParseResult<'_, SliceChunk<'_>> {
    let (input, key_count) = dword(input)?;
    let (input, flags) = dword(input)?;
    let flags = SliceFlags::from_bits_retain(flags);
    let (input, _) = dword(input)?;
    let (mut input, name) = parse_string(input)?;

    let mut keys = Vec::with_capacity((key_count as usize).min(1024));
    for _ in 0..key_count {
        let (rest, key) = parse_slice_key(input, flags)?;
        keys.push(key);
        input = rest;
    }
    Ok((input, SliceChunk { name, flags, keys }))
}

fn parse_slice_key(input: &[u8], flags: SliceFlags) -> ParseResult<'_, SliceKey> {
    let (input, frame) = dword(input)?;
    let (input, x) = long(input)?;
    let (input, y) = long(input)?;
    let (input, width) = dword(input)?;
    let (input, height) = dword(input)?;
    let (input, nine_patch) = cond(flags.contains(SliceFlags::NINE_PATCH), parse_nine_patch)(input)?;
    let (input, pivot) = cond(flags.contains(SliceFlags::HAS_PIVOT), parse_pivot)(input)?;
    Ok((
        input,
        SliceKey {
            frame,
            x,
            y,
            width,
            height,
            nine_patch,
            pivot,
        },
    ))
}

fn parse_nine_patch(input: &[u8]) -> ParseResult<'_, NinePatch> {
    let (input, center_x) = long(input)?;
    let (input, center_y) = long(input)?;
    let (input, center_width) = dword(input)?;
    let (input, center_height) = dword(input)?;
    Ok((
        input,
        NinePatch {
            center_x,
            center_y,
            center_width,
            center_height,
        },
    ))
}

fn parse_pivot(input: &[u8]) -> ParseResult<'_, Pivot> {
    let (input, x) = long(input)?;
    let (input, y) = long(input)?;
    Ok((input, Pivot { x, y }))
}

pub fn encode_slice_chunk(chunk: &SliceChunk<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_dword(chunk.keys.len() as u32);
    w.put_dword(chunk.flags.bits());
    w.put_dword(0);
    w.put_string(&chunk.name)?;
    for key in &chunk.keys {
        w.put_dword(key.frame);
        w.put_long(key.x);
        w.put_long(key.y);
        w.put_dword(key.width);
        w.put_dword(key.height);
        if chunk.flags.contains(SliceFlags::NINE_PATCH) {
            let center = key.nine_patch.unwrap_or(NinePatch {
                center_x: 0,
                center_y: 0,
                center_width: 0,
                center_height: 0,
            });
            w.put_long(center.center_x);
            w.put_long(center.center_y);
            w.put_dword(center.center_width);
            w.put_dword(center.center_height);
        }
        if chunk.flags.contains(SliceFlags::HAS_PIVOT) {
            let pivot = key.pivot.unwrap_or(Pivot { x: 0, y: 0 });
            w.put_long(pivot.x);
            w.put_long(pivot.y);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice_with_keys(frames: &[Dword]) -> SliceChunk<'static> {
        SliceChunk {
            name: Cow::Borrowed("hit"),
            flags: SliceFlags::empty(),
            keys: frames
                .iter()
                .map(|&frame| SliceKey {
                    frame,
                    x: frame as Long * 5 + 10,
                    y: 0,
                    width: frame + 20,
                    height: 10,
                    nine_patch: None,
                    pivot: None,
                })
                .collect(),
        }
    }

    #[test]
    fn key_lookup_is_a_step_function() {
        let slice = slice_with_keys(&[0, 2]);
        assert_eq!(slice.key_at(0).unwrap().frame, 0);
        assert_eq!(slice.key_at(1).unwrap().frame, 0);
        assert_eq!(slice.key_at(2).unwrap().frame, 2);
        assert_eq!(slice.key_at(100).unwrap().frame, 2);

        let late = slice_with_keys(&[3]);
        assert!(late.key_at(2).is_none());
    }

    #[test]
    fn slice_round_trip_with_nine_patch_and_pivot() {
        let chunk = SliceChunk {
            name: Cow::Borrowed("frame"),
            flags: SliceFlags::NINE_PATCH | SliceFlags::HAS_PIVOT,
            keys: vec![SliceKey {
                frame: 0,
                x: -4,
                y: 2,
                width: 32,
                height: 32,
                nine_patch: Some(NinePatch {
                    center_x: 8,
                    center_y: 8,
                    center_width: 16,
                    center_height: 16,
                }),
                pivot: Some(Pivot { x: 16, y: 16 }),
            }],
        };
        let mut w = AseWriter::new();
        encode_slice_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_slice_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }
}
