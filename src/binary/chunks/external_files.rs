use std::borrow::Cow;

use nom::bytes::complete::take;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{byte, dword, parse_string, Byte, Dword};
use crate::binary::writer::AseWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalFileType {
    Palette,
    Tileset,
    /// Extension name for properties stored in user data.
    Properties,
    TileManagementPlugin,
    Unknown(Byte),
}

impl From<Byte> for ExternalFileType {
    fn from(value: Byte) -> Self {
        match value {
            0 => ExternalFileType::Palette,
            1 => ExternalFileType::Tileset,
            2 => ExternalFileType::Properties,
            3 => ExternalFileType::TileManagementPlugin,
            other => ExternalFileType::Unknown(other),
        }
    }
}

impl ExternalFileType {
    pub fn to_byte(self) -> Byte {
        match self {
            ExternalFileType::Palette => 0,
            ExternalFileType::Tileset => 1,
            ExternalFileType::Properties => 2,
            ExternalFileType::TileManagementPlugin => 3,
            ExternalFileType::Unknown(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalFile<'a> {
    /// Referenced from other chunks by this id.
    pub id: Dword,
    pub file_type: ExternalFileType,
    pub name: Cow<'a, str>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExternalFilesChunk<'a> {
    pub entries: Vec<ExternalFile<'a>>,
}

pub fn parse_external_files_chunk(input: &[u8]) -> ParseResult<'_, ExternalFilesChunk<'_>> {
    let (input, count) = dword(input)?;
    let (mut input, _) = take(8usize)(input)?;
    let mut entries = Vec::with_capacity((count as usize).min(1024));
    for _ in 0..count {
        let (rest, id) = dword(input)?;
        let (rest, file_type) = byte(rest)?;
        let (rest, _) = take(7usize)(rest)?;
        let (rest, name) = parse_string(rest)?;
        entries.push(ExternalFile {
            id,
            file_type: ExternalFileType::from(file_type),
            name,
        });
        input = rest;
    }
    Ok((input, ExternalFilesChunk { entries }))
}

pub fn encode_external_files_chunk(
    chunk: &ExternalFilesChunk<'_>,
    w: &mut AseWriter,
) -> Result<(), EncodeError> {
    w.put_dword(chunk.entries.len() as u32);
    w.skip(8);
    for entry in &chunk.entries {
        w.put_dword(entry.id);
        w.put_byte(entry.file_type.to_byte());
        w.skip(7);
        w.put_string(&entry.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_files_round_trip() {
        let chunk = ExternalFilesChunk {
            entries: vec![
                ExternalFile {
                    id: 1,
                    file_type: ExternalFileType::Tileset,
                    name: Cow::Borrowed("tiles.aseprite"),
                },
                ExternalFile {
                    id: 8,
                    file_type: ExternalFileType::Unknown(9),
                    name: Cow::Borrowed("plugin"),
                },
            ],
        };
        let mut w = AseWriter::new();
        encode_external_files_chunk(&chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_external_files_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, chunk);
    }
}
