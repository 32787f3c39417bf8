use std::borrow::Cow;

use bitflags::bitflags;
use nom::bytes::complete::take;
use nom::combinator::{cond, verify};

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{dword, parse_color, parse_string, word, Color, Dword, Word};
use crate::binary::writer::AseWriter;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PaletteEntryFlags: Word {
        const HAS_NAME = 0x1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry<'a> {
    pub color: Color,
    pub name: Option<Cow<'a, str>>,
}

/// The modern palette chunk: a declared total size plus one record for every
/// index in the inclusive `[first_index, last_index]` window.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteChunk<'a> {
    pub size: Dword,
    pub first_index: Dword,
    pub last_index: Dword,
    pub entries: Vec<PaletteEntry<'a>>,
}

pub fn parse_palette_chunk(input: &[u8]) -> ParseResult<'_, PaletteChunk<'_>> {
    let (input, size) = dword(input)?;
    let (input, first_index) = dword(input)?;
    let (input, last_index) = verify(dword, |&last| last >= first_index)(input)?;
    let (mut input, _) = take(8usize)(input)?;

    let count = (last_index - first_index + 1) as usize;
    let mut entries = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let (rest, entry) = parse_palette_entry(input)?;
        entries.push(entry);
        input = rest;
    }
    Ok((
        input,
        PaletteChunk {
            size,
            first_index,
            last_index,
            entries,
        },
    ))
}

pub fn parse_palette_entry(input: &[u8]) -> ParseResult<'_, PaletteEntry<'_>> {
    let (input, flags) = word(input)?;
    let flags = PaletteEntryFlags::from_bits_truncate(flags);
    let (input, color) = parse_color(input)?;
    let (input, name) = cond(flags.contains(PaletteEntryFlags::HAS_NAME), parse_string)(input)?;
    Ok((input, PaletteEntry { color, name }))
}

pub fn encode_palette_chunk(chunk: &PaletteChunk<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_dword(chunk.size);
    w.put_dword(chunk.first_index);
    w.put_dword(chunk.last_index);
    w.skip(8);
    for entry in &chunk.entries {
        let flags = if entry.name.is_some() {
            PaletteEntryFlags::HAS_NAME
        } else {
            PaletteEntryFlags::empty()
        };
        w.put_word(flags.bits());
        w.put_color(entry.color);
        if let Some(name) = &entry.name {
            w.put_string(name)?;
        }
    }
    Ok(())
}
