use nom::bytes::complete::take;
use tracing::warn;

use super::chunk::{parse_chunks, Chunk};
use super::chunks::cel::CelChunk;
use super::errors::{ParseError, ParseResult};
use super::scalars::{dword, word, Word};

pub const FRAME_MAGIC: Word = 0xF1FA;
pub const FRAME_HEADER_SIZE: u32 = 16;

/// One frame as it sits on the wire: a duration and the flat chunk list.
/// Attachment of user data, cel extras and the rest is the stream
/// interpreter's job.
#[derive(Debug, Clone)]
pub struct RawFrame<'a> {
    pub duration: Word,
    pub chunks: Vec<Chunk<'a>>,
}

impl<'a> RawFrame<'a> {
    pub fn cels(&self) -> impl Iterator<Item = &CelChunk<'a>> {
        self.chunks.iter().filter_map(|chunk| {
            if let Chunk::Cel(cel) = chunk {
                Some(cel)
            } else {
                None
            }
        })
    }
}

/// Pre-1.2 files only set the old 16-bit count; modern files saturate it to
/// 0xFFFF and put the real count in the new field.
fn chunk_count(old_count: Word, new_count: u32) -> usize {
    if new_count != 0 && old_count == 0xFFFF {
        new_count as usize
    } else {
        old_count as usize
    }
}

/// Parses one frame. The returned remainder starts exactly `frame_size`
/// bytes after the frame start, whatever the chunk parsers consumed, so a
/// codec that under-reads leaves the rest of the file recoverable.
pub fn parse_rawframe(input: &[u8], strict: bool) -> ParseResult<'_, RawFrame<'_>> {
    let (input, frame_size) = dword(input)?;
    if frame_size < FRAME_HEADER_SIZE {
        return Err(nom::Err::Failure(ParseError::BadChunkSize));
    }
    let (rest, body) = take(frame_size - 4)(input)?;

    let (body, magic) = word(body)?;
    if magic != FRAME_MAGIC {
        if strict {
            return Err(nom::Err::Failure(ParseError::BadFrameMagic(magic)));
        }
        warn!(magic, "frame magic mismatch, continuing (strict = false)");
    }
    let (body, old_chunk_count) = word(body)?;
    let (body, duration) = word(body)?;
    let (body, _) = take(2usize)(body)?;
    let (body, new_chunk_count) = dword(body)?;

    let count = chunk_count(old_chunk_count, new_chunk_count);
    let (_, chunks) = parse_chunks(body, count)?;

    Ok((rest, RawFrame { duration, chunks }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_precedence() {
        // Modern files saturate the old field.
        assert_eq!(chunk_count(0xFFFF, 70000), 70000);
        // Old files only set the old field.
        assert_eq!(chunk_count(12, 0), 12);
        // When both are set without saturation, the old field wins.
        assert_eq!(chunk_count(12, 70000), 12);
        // Saturated old field with an unset new field stays as-is.
        assert_eq!(chunk_count(0xFFFF, 0), 0xFFFF);
    }
}
