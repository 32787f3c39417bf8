use std::borrow::Cow;

use nom::bytes::complete::take;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{byte, parse_string, word, Byte, Word};
use crate::binary::writer::AseWriter;

/// After the tags chunk, one user data chunk may follow per tag, in tag
/// order. That attachment is resolved by the stream interpreter, not here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagsChunk<'a> {
    pub tags: Vec<TagChunk<'a>>,
}

/// A named range of frames, both endpoints inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct TagChunk<'a> {
    pub from_frame: Word,
    pub to_frame: Word,
    pub direction: AnimationDirection,
    /// Play the section N times; 0 means unspecified (infinite in the UI).
    pub repeat: Word,
    /// Deprecated tag color; the user data color replaces it.
    pub color: [Byte; 3],
    pub name: Cow<'a, str>,
}

/// The frame sequence a tag plays, with the repeat left as metadata: a
/// repeat of 0 means unspecified, which the UI treats as infinite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    pub frames: Vec<usize>,
    pub repeat: Word,
}

impl TagChunk<'_> {
    /// Resolves the playback order. Ping-pong directions exclude the
    /// endpoint on the return leg so it is not played twice.
    pub fn playback(&self) -> Playback {
        let from = self.from_frame as usize;
        let to = self.to_frame as usize;
        let frames = match self.direction {
            AnimationDirection::Forward | AnimationDirection::Unknown(_) => (from..=to).collect(),
            AnimationDirection::Reverse => (from..=to).rev().collect(),
            AnimationDirection::PingPong => {
                let mut frames: Vec<usize> = (from..=to).collect();
                frames.extend((from + 1..to).rev());
                frames
            }
            AnimationDirection::PingPongReverse => {
                let mut frames: Vec<usize> = (from..=to).rev().collect();
                frames.extend(from + 1..to);
                frames
            }
        };
        Playback {
            frames,
            repeat: self.repeat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationDirection {
    Forward,
    Reverse,
    PingPong,
    PingPongReverse,
    Unknown(Byte),
}

impl From<Byte> for AnimationDirection {
    fn from(value: Byte) -> Self {
        match value {
            0 => AnimationDirection::Forward,
            1 => AnimationDirection::Reverse,
            2 => AnimationDirection::PingPong,
            3 => AnimationDirection::PingPongReverse,
            other => AnimationDirection::Unknown(other),
        }
    }
}

impl AnimationDirection {
    pub fn to_byte(self) -> Byte {
        match self {
            AnimationDirection::Forward => 0,
            AnimationDirection::Reverse => 1,
            AnimationDirection::PingPong => 2,
            AnimationDirection::PingPongReverse => 3,
            AnimationDirection::Unknown(raw) => raw,
        }
    }
}

pub fn parse_tags_chunk(input: &[u8]) -> ParseResult<'_, TagsChunk<'_>> {
    let (input, number_of_tags) = word(input)?;
    let (mut input, _) = take(8usize)(input)?;
    let mut tags = Vec::with_capacity(number_of_tags as usize);
    for _ in 0..number_of_tags {
        let (rest, tag) = parse_tag(input)?;
        tags.push(tag);
        input = rest;
    }
    Ok((input, TagsChunk { tags }))
}

pub fn parse_tag(input: &[u8]) -> ParseResult<'_, TagChunk<'_>> {
    let (input, from_frame) = word(input)?;
    let (input, to_frame) = word(input)?;
    let (input, direction) = byte(input)?;
    let (input, repeat) = word(input)?;
    let (input, _) = take(6usize)(input)?;
    let (input, color) = take(3usize)(input)?;
    let (input, _) = byte(input)?;
    let (input, name) = parse_string(input)?;
    Ok((
        input,
        TagChunk {
            from_frame,
            to_frame,
            direction: AnimationDirection::from(direction),
            repeat,
            color: [color[0], color[1], color[2]],
            name,
        },
    ))
}

pub fn encode_tags_chunk(chunk: &TagsChunk<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_word(chunk.tags.len() as Word);
    w.skip(8);
    for tag in &chunk.tags {
        w.put_word(tag.from_frame);
        w.put_word(tag.to_frame);
        w.put_byte(tag.direction.to_byte());
        w.put_word(tag.repeat);
        w.skip(6);
        w.put_bytes(&tag.color);
        w.put_byte(0);
        w.put_string(&tag.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(from: Word, to: Word, direction: AnimationDirection) -> TagChunk<'static> {
        TagChunk {
            from_frame: from,
            to_frame: to,
            direction,
            repeat: 0,
            color: [0, 0, 0],
            name: Cow::Borrowed(""),
        }
    }

    #[test]
    fn playback_directions() {
        assert_eq!(
            tag(0, 2, AnimationDirection::Forward).playback().frames,
            vec![0, 1, 2]
        );
        assert_eq!(
            tag(0, 2, AnimationDirection::Reverse).playback().frames,
            vec![2, 1, 0]
        );
        assert_eq!(
            tag(0, 2, AnimationDirection::PingPong).playback().frames,
            vec![0, 1, 2, 1]
        );
        assert_eq!(
            tag(0, 2, AnimationDirection::PingPongReverse)
                .playback()
                .frames,
            vec![2, 1, 0, 1]
        );
    }

    #[test]
    fn playback_degenerate_ranges() {
        // A single-frame tag plays that frame once in every direction.
        for direction in [
            AnimationDirection::Forward,
            AnimationDirection::Reverse,
            AnimationDirection::PingPong,
            AnimationDirection::PingPongReverse,
        ] {
            assert_eq!(tag(3, 3, direction).playback().frames, vec![3]);
        }
        // Ping-pong length is 2 * (to - from) for a proper range.
        assert_eq!(tag(2, 6, AnimationDirection::PingPong).playback().frames.len(), 8);
    }

    #[test]
    fn tags_round_trip() {
        let chunk = TagsChunk {
            tags: vec![
                TagChunk {
                    from_frame: 0,
                    to_frame: 3,
                    direction: AnimationDirection::PingPong,
                    repeat: 0,
                    color: [255, 128, 0],
                    name: Cow::Borrowed("walk"),
                },
                TagChunk {
                    from_frame: 4,
                    to_frame: 4,
                    direction: AnimationDirection::Unknown(7),
                    repeat: 2,
                    color: [0, 0, 0],
                    name: Cow::Borrowed("idle"),
                },
            ],
        };
        let mut w = AseWriter::new();
        encode_tags_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_tags_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }
}
