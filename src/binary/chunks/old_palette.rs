use nom::bytes::complete::take;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{byte, word, Byte};
use crate::binary::writer::AseWriter;

/// One packet of an old palette chunk: skip some palette slots, then write a
/// run of RGB colors. A stored count of zero means 256 colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OldPalettePacket {
    pub skip: Byte,
    pub colors: Vec<[Byte; 3]>,
}

/// Pre-1.2 palette data. Chunk types 0x0004 and 0x0011 share this layout;
/// the 6-bit values of 0x0011 are carried through without rescaling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OldPaletteChunk {
    pub packets: Vec<OldPalettePacket>,
}

pub fn parse_old_palette_chunk(input: &[u8]) -> ParseResult<'_, OldPaletteChunk> {
    let (mut input, packet_count) = word(input)?;
    let mut packets = Vec::with_capacity(packet_count as usize);
    for _ in 0..packet_count {
        let (rest, skip) = byte(input)?;
        let (mut rest, count) = byte(rest)?;
        let count = if count == 0 { 256 } else { count as usize };
        let mut colors = Vec::with_capacity(count);
        for _ in 0..count {
            let (r, rgb) = take(3usize)(rest)?;
            colors.push([rgb[0], rgb[1], rgb[2]]);
            rest = r;
        }
        packets.push(OldPalettePacket { skip, colors });
        input = rest;
    }
    Ok((input, OldPaletteChunk { packets }))
}

pub fn encode_old_palette_chunk(
    chunk: &OldPaletteChunk,
    w: &mut AseWriter,
) -> Result<(), EncodeError> {
    w.put_word(chunk.packets.len() as u16);
    for packet in &chunk.packets {
        w.put_byte(packet.skip);
        let count = packet.colors.len();
        w.put_byte(if count == 256 { 0 } else { count as Byte });
        for rgb in &packet.colors {
            w.put_bytes(rgb);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_round_trip() {
        let chunk = OldPaletteChunk {
            packets: vec![
                OldPalettePacket {
                    skip: 2,
                    colors: vec![[255, 0, 0], [0, 255, 0]],
                },
                OldPalettePacket {
                    skip: 0,
                    colors: vec![[0, 0, 255]],
                },
            ],
        };
        let mut w = AseWriter::new();
        encode_old_palette_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_old_palette_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }

    #[test]
    fn zero_count_means_256_colors() {
        let mut w = AseWriter::new();
        w.put_word(1);
        w.put_byte(0);
        w.put_byte(0);
        for i in 0..256u16 {
            w.put_bytes(&[i as u8, 0, 0]);
        }
        let bytes = w.into_bytes();
        let (_, parsed) = parse_old_palette_chunk(&bytes).unwrap();
        assert_eq!(parsed.packets[0].colors.len(), 256);
    }
}
