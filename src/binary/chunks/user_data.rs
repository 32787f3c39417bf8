use std::borrow::Cow;

use bitflags::bitflags;
use nom::combinator::rest;

use crate::binary::errors::{EncodeError, ParseResult};
use crate::binary::scalars::{
    byte, double, dword, fixed, float, long, long64, parse_color, parse_string, parse_uuid, qword,
    short, word, Color, Double, Dword, Fixed, Float, Long, Long64, Qword, Short, Uuid, Word,
};
use crate::binary::writer::AseWriter;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UserDataFlags: Dword {
        const HAS_TEXT = 0x1;
        const HAS_COLOR = 0x2;
        const HAS_PROPERTIES = 0x4;
    }
}

/// Free-form metadata. The wire format never says what it belongs to; the
/// stream interpreter attaches it to the entity decoded just before it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDataChunk<'a> {
    pub text: Option<Cow<'a, str>>,
    pub color: Option<Color>,
    pub properties: Option<Vec<ExtensionProperties<'a>>>,
}

impl UserDataChunk<'_> {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.color.is_none() && self.properties.is_none()
    }
}

/// One extension block: properties grouped under the id of the extension
/// that wrote them (0 is the sprite's own block).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtensionProperties<'a> {
    pub extension_id: Dword,
    pub properties: Vec<Property<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property<'a> {
    pub name: Cow<'a, str>,
    pub value: Value<'a>,
}

pub const TYPE_NULL: Word = 0x0000;
pub const TYPE_BOOL: Word = 0x0001;
pub const TYPE_INT8: Word = 0x0002;
pub const TYPE_UINT8: Word = 0x0003;
pub const TYPE_INT16: Word = 0x0004;
pub const TYPE_UINT16: Word = 0x0005;
pub const TYPE_INT32: Word = 0x0006;
pub const TYPE_UINT32: Word = 0x0007;
pub const TYPE_INT64: Word = 0x0008;
pub const TYPE_UINT64: Word = 0x0009;
pub const TYPE_FIXED: Word = 0x000A;
pub const TYPE_FLOAT: Word = 0x000B;
pub const TYPE_DOUBLE: Word = 0x000C;
pub const TYPE_STRING: Word = 0x000D;
pub const TYPE_POINT: Word = 0x000E;
pub const TYPE_SIZE: Word = 0x000F;
pub const TYPE_RECT: Word = 0x0010;
pub const TYPE_VECTOR: Word = 0x0011;
pub const TYPE_PROPERTIES: Word = 0x0012;
pub const TYPE_UUID: Word = 0x0013;

/// A property value, one arm per wire type. Values re-encode under their own
/// tag; no numeric-range inference is performed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    /// Excess-128 on the wire: the stored byte minus 128.
    Int8(i8),
    Uint8(u8),
    Int16(Short),
    Uint16(Word),
    Int32(Long),
    Uint32(Dword),
    Int64(Long64),
    Uint64(Qword),
    Fixed(Fixed),
    Float(Float),
    Double(Double),
    String(Cow<'a, str>),
    Point { x: Long, y: Long },
    Size { w: Long, h: Long },
    Rect { x: Long, y: Long, w: Long, h: Long },
    Vector(Vec<Value<'a>>),
    Properties(Vec<Property<'a>>),
    Uuid(Uuid),
    /// A value of a type this codec does not know. Decoding cannot tell
    /// where such a value ends, so it swallows the rest of the chunk payload
    /// and re-emits it verbatim.
    Raw { type_code: Word, bytes: Cow<'a, [u8]> },
}

impl Value<'_> {
    pub fn type_code(&self) -> Word {
        match self {
            Value::Null => TYPE_NULL,
            Value::Bool(_) => TYPE_BOOL,
            Value::Int8(_) => TYPE_INT8,
            Value::Uint8(_) => TYPE_UINT8,
            Value::Int16(_) => TYPE_INT16,
            Value::Uint16(_) => TYPE_UINT16,
            Value::Int32(_) => TYPE_INT32,
            Value::Uint32(_) => TYPE_UINT32,
            Value::Int64(_) => TYPE_INT64,
            Value::Uint64(_) => TYPE_UINT64,
            Value::Fixed(_) => TYPE_FIXED,
            Value::Float(_) => TYPE_FLOAT,
            Value::Double(_) => TYPE_DOUBLE,
            Value::String(_) => TYPE_STRING,
            Value::Point { .. } => TYPE_POINT,
            Value::Size { .. } => TYPE_SIZE,
            Value::Rect { .. } => TYPE_RECT,
            Value::Vector(_) => TYPE_VECTOR,
            Value::Properties(_) => TYPE_PROPERTIES,
            Value::Uuid(_) => TYPE_UUID,
            Value::Raw { type_code, .. } => *type_code,
        }
    }

    /// True when this value (or its last nested value) swallowed the rest of
    /// the payload, meaning no further records can follow it.
    fn is_terminal(&self) -> bool {
        match self {
            Value::Raw { .. } => true,
            Value::Vector(values) => values.last().is_some_and(Value::is_terminal),
            Value::Properties(props) => props.last().is_some_and(|p| p.value.is_terminal()),
            _ => false,
        }
    }
}

pub fn parse_user_data_chunk(input: &[u8]) -> ParseResult<'_, UserDataChunk<'_>> {
    let (input, flags) = dword(input)?;
    let flags = UserDataFlags::from_bits_retain(flags);

    let (input, text) = if flags.contains(UserDataFlags::HAS_TEXT) {
        let (input, s) = parse_string(input)?;
        (input, Some(s))
    } else {
        (input, None)
    };
    let (input, color) = if flags.contains(UserDataFlags::HAS_COLOR) {
        let (input, c) = parse_color(input)?;
        (input, Some(c))
    } else {
        (input, None)
    };
    let (input, properties) = if flags.contains(UserDataFlags::HAS_PROPERTIES) {
        let (input, maps) = parse_extension_blocks(input)?;
        (input, Some(maps))
    } else {
        (input, None)
    };

    Ok((
        input,
        UserDataChunk {
            text,
            color,
            properties,
        },
    ))
}

fn parse_extension_blocks(input: &[u8]) -> ParseResult<'_, Vec<ExtensionProperties<'_>>> {
    let (mut input, block_count) = dword(input)?;
    let mut blocks = Vec::with_capacity((block_count as usize).min(1024));
    for _ in 0..block_count {
        let (rest, extension_id) = dword(input)?;
        let (rest, properties) = parse_property_records(rest)?;
        let terminal = properties
            .last()
            .is_some_and(|p: &Property<'_>| p.value.is_terminal());
        blocks.push(ExtensionProperties {
            extension_id,
            properties,
        });
        input = rest;
        if terminal {
            break;
        }
    }
    Ok((input, blocks))
}

fn parse_property_records(input: &[u8]) -> ParseResult<'_, Vec<Property<'_>>> {
    let (mut input, count) = dword(input)?;
    let mut properties = Vec::with_capacity((count as usize).min(1024));
    for _ in 0..count {
        let (rest, name) = parse_string(input)?;
        let (rest, type_code) = word(rest)?;
        let (rest, value) = parse_value(rest, type_code)?;
        let terminal = value.is_terminal();
        properties.push(Property { name, value });
        input = rest;
        if terminal {
            break;
        }
    }
    Ok((input, properties))
}

fn parse_value(input: &[u8], type_code: Word) -> ParseResult<'_, Value<'_>> {
    match type_code {
        TYPE_NULL => Ok((input, Value::Null)),
        TYPE_BOOL => {
            let (input, v) = byte(input)?;
            Ok((input, Value::Bool(v != 0)))
        }
        TYPE_INT8 => {
            let (input, v) = byte(input)?;
            Ok((input, Value::Int8((i16::from(v) - 128) as i8)))
        }
        TYPE_UINT8 => {
            let (input, v) = byte(input)?;
            Ok((input, Value::Uint8(v)))
        }
        TYPE_INT16 => {
            let (input, v) = short(input)?;
            Ok((input, Value::Int16(v)))
        }
        TYPE_UINT16 => {
            let (input, v) = word(input)?;
            Ok((input, Value::Uint16(v)))
        }
        TYPE_INT32 => {
            let (input, v) = long(input)?;
            Ok((input, Value::Int32(v)))
        }
        TYPE_UINT32 => {
            let (input, v) = dword(input)?;
            Ok((input, Value::Uint32(v)))
        }
        TYPE_INT64 => {
            let (input, v) = long64(input)?;
            Ok((input, Value::Int64(v)))
        }
        TYPE_UINT64 => {
            let (input, v) = qword(input)?;
            Ok((input, Value::Uint64(v)))
        }
        TYPE_FIXED => {
            let (input, v) = fixed(input)?;
            Ok((input, Value::Fixed(v)))
        }
        TYPE_FLOAT => {
            let (input, v) = float(input)?;
            Ok((input, Value::Float(v)))
        }
        TYPE_DOUBLE => {
            let (input, v) = double(input)?;
            Ok((input, Value::Double(v)))
        }
        TYPE_STRING => {
            let (input, v) = parse_string(input)?;
            Ok((input, Value::String(v)))
        }
        TYPE_POINT => {
            let (input, x) = long(input)?;
            let (input, y) = long(input)?;
            Ok((input, Value::Point { x, y }))
        }
        TYPE_SIZE => {
            let (input, w) = long(input)?;
            let (input, h) = long(input)?;
            Ok((input, Value::Size { w, h }))
        }
        TYPE_RECT => {
            let (input, x) = long(input)?;
            let (input, y) = long(input)?;
            let (input, w) = long(input)?;
            let (input, h) = long(input)?;
            Ok((input, Value::Rect { x, y, w, h }))
        }
        TYPE_VECTOR => parse_vector(input),
        TYPE_PROPERTIES => {
            let (input, props) = parse_property_records(input)?;
            Ok((input, Value::Properties(props)))
        }
        TYPE_UUID => {
            let (input, v) = parse_uuid(input)?;
            Ok((input, Value::Uuid(v)))
        }
        unknown => {
            let (input, bytes) = rest(input)?;
            Ok((
                input,
                Value::Raw {
                    type_code: unknown,
                    bytes: Cow::Borrowed(bytes),
                },
            ))
        }
    }
}

fn parse_vector(vector_start: &[u8]) -> ParseResult<'_, Value<'_>> {
    let (input, count) = dword(vector_start)?;
    let (mut input, element_type) = word(input)?;
    let mut values = Vec::with_capacity((count as usize).min(1024));
    if element_type == 0 {
        // Heterogeneous form: every element carries its own type tag.
        for _ in 0..count {
            let (rest, type_code) = word(input)?;
            let (rest, value) = parse_value(rest, type_code)?;
            let terminal = value.is_terminal();
            values.push(value);
            input = rest;
            if terminal {
                break;
            }
        }
    } else if !known_type(element_type) {
        // The element size is unknowable; keep the whole vector raw, from
        // the count onward, under the vector's own tag.
        let (input, bytes) = rest(vector_start)?;
        return Ok((
            input,
            Value::Raw {
                type_code: TYPE_VECTOR,
                bytes: Cow::Borrowed(bytes),
            },
        ));
    } else {
        for _ in 0..count {
            let (rest, value) = parse_value(input, element_type)?;
            let terminal = value.is_terminal();
            values.push(value);
            input = rest;
            if terminal {
                break;
            }
        }
    }
    Ok((input, Value::Vector(values)))
}

fn known_type(type_code: Word) -> bool {
    (TYPE_NULL..=TYPE_UUID).contains(&type_code)
}

pub fn encode_user_data_chunk(
    chunk: &UserDataChunk<'_>,
    w: &mut AseWriter,
) -> Result<(), EncodeError> {
    let mut flags = UserDataFlags::empty();
    flags.set(UserDataFlags::HAS_TEXT, chunk.text.is_some());
    flags.set(UserDataFlags::HAS_COLOR, chunk.color.is_some());
    flags.set(UserDataFlags::HAS_PROPERTIES, chunk.properties.is_some());
    w.put_dword(flags.bits());

    if let Some(text) = &chunk.text {
        w.put_string(text)?;
    }
    if let Some(color) = chunk.color {
        w.put_color(color);
    }
    if let Some(blocks) = &chunk.properties {
        w.put_dword(blocks.len() as u32);
        for block in blocks {
            w.put_dword(block.extension_id);
            encode_property_records(&block.properties, w)?;
        }
    }
    Ok(())
}

fn encode_property_records(properties: &[Property<'_>], w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_dword(properties.len() as u32);
    for property in properties {
        w.put_string(&property.name)?;
        w.put_word(property.value.type_code());
        encode_value(&property.value, w)?;
    }
    Ok(())
}

fn encode_value(value: &Value<'_>, w: &mut AseWriter) -> Result<(), EncodeError> {
    match value {
        Value::Null => {}
        Value::Bool(v) => w.put_byte(u8::from(*v)),
        Value::Int8(v) => w.put_byte((i16::from(*v) + 128) as u8),
        Value::Uint8(v) => w.put_byte(*v),
        Value::Int16(v) => w.put_short(*v),
        Value::Uint16(v) => w.put_word(*v),
        Value::Int32(v) => w.put_long(*v),
        Value::Uint32(v) => w.put_dword(*v),
        Value::Int64(v) => w.put_long64(*v),
        Value::Uint64(v) => w.put_qword(*v),
        Value::Fixed(v) => w.put_fixed(*v),
        Value::Float(v) => w.put_float(*v),
        Value::Double(v) => w.put_double(*v),
        Value::String(v) => w.put_string(v)?,
        Value::Point { x, y } => {
            w.put_long(*x);
            w.put_long(*y);
        }
        Value::Size { w: width, h } => {
            w.put_long(*width);
            w.put_long(*h);
        }
        Value::Rect { x, y, w: width, h } => {
            w.put_long(*x);
            w.put_long(*y);
            w.put_long(*width);
            w.put_long(*h);
        }
        Value::Vector(values) => encode_vector(values, w)?,
        Value::Properties(props) => encode_property_records(props, w)?,
        Value::Uuid(v) => w.put_uuid(*v),
        Value::Raw { bytes, .. } => w.put_bytes(bytes),
    }
    Ok(())
}

fn encode_vector(values: &[Value<'_>], w: &mut AseWriter) -> Result<(), EncodeError> {
    w.put_dword(values.len() as u32);
    // The homogeneous form only exists for known element types: a shared
    // `Raw` type code must stay in the per-element-tag form, or the output
    // would re-decode through the whole-vector-raw fallback.
    let homogeneous = values
        .first()
        .map(Value::type_code)
        .filter(|&tag| {
            tag != 0 && known_type(tag) && values.iter().all(|v| v.type_code() == tag)
        });
    match homogeneous {
        Some(tag) => {
            w.put_word(tag);
            for value in values {
                encode_value(value, w)?;
            }
        }
        None => {
            w.put_word(0);
            for value in values {
                w.put_word(value.type_code());
                encode_value(value, w)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(chunk: &UserDataChunk<'_>) -> UserDataChunk<'static> {
        let mut w = AseWriter::new();
        encode_user_data_chunk(chunk, &mut w).unwrap();
        let bytes = w.into_bytes();
        let (rest, parsed) = parse_user_data_chunk(&bytes).unwrap();
        assert!(rest.is_empty());
        // Detach from the scratch buffer so the caller can keep it.
        fn own(chunk: UserDataChunk<'_>) -> UserDataChunk<'static> {
            UserDataChunk {
                text: chunk.text.map(|t| Cow::Owned(t.into_owned())),
                color: chunk.color,
                properties: chunk.properties.map(|blocks| {
                    blocks.into_iter().map(own_block).collect()
                }),
            }
        }
        fn own_block(block: ExtensionProperties<'_>) -> ExtensionProperties<'static> {
            ExtensionProperties {
                extension_id: block.extension_id,
                properties: block.properties.into_iter().map(own_property).collect(),
            }
        }
        fn own_property(p: Property<'_>) -> Property<'static> {
            Property {
                name: Cow::Owned(p.name.into_owned()),
                value: own_value(p.value),
            }
        }
        fn own_value(v: Value<'_>) -> Value<'static> {
            match v {
                Value::String(s) => Value::String(Cow::Owned(s.into_owned())),
                Value::Vector(vs) => Value::Vector(vs.into_iter().map(own_value).collect()),
                Value::Properties(ps) => {
                    Value::Properties(ps.into_iter().map(own_property).collect())
                }
                Value::Raw { type_code, bytes } => Value::Raw {
                    type_code,
                    bytes: Cow::Owned(bytes.into_owned()),
                },
                Value::Null => Value::Null,
                Value::Bool(x) => Value::Bool(x),
                Value::Int8(x) => Value::Int8(x),
                Value::Uint8(x) => Value::Uint8(x),
                Value::Int16(x) => Value::Int16(x),
                Value::Uint16(x) => Value::Uint16(x),
                Value::Int32(x) => Value::Int32(x),
                Value::Uint32(x) => Value::Uint32(x),
                Value::Int64(x) => Value::Int64(x),
                Value::Uint64(x) => Value::Uint64(x),
                Value::Fixed(x) => Value::Fixed(x),
                Value::Float(x) => Value::Float(x),
                Value::Double(x) => Value::Double(x),
                Value::Point { x, y } => Value::Point { x, y },
                Value::Size { w, h } => Value::Size { w, h },
                Value::Rect { x, y, w, h } => Value::Rect { x, y, w, h },
                Value::Uuid(x) => Value::Uuid(x),
            }
        }
        own(parsed)
    }

    #[test]
    fn text_and_color() {
        let chunk = UserDataChunk {
            text: Some(Cow::Borrowed("spawn point")),
            color: Some(Color {
                red: 1,
                green: 2,
                blue: 3,
                alpha: 4,
            }),
            properties: None,
        };
        assert_eq!(round_trip(&chunk), chunk);
    }

    #[test]
    fn int8_is_excess_128_on_the_wire() {
        let mut w = AseWriter::new();
        encode_value(&Value::Int8(-128), &mut w).unwrap();
        encode_value(&Value::Int8(0), &mut w).unwrap();
        encode_value(&Value::Int8(127), &mut w).unwrap();
        assert_eq!(w.into_bytes(), vec![0, 128, 255]);

        let (_, v) = parse_value(&[0], TYPE_INT8).unwrap();
        assert_eq!(v, Value::Int8(-128));
    }

    #[test]
    fn nested_properties_round_trip() {
        let chunk = UserDataChunk {
            text: None,
            color: None,
            properties: Some(vec![ExtensionProperties {
                extension_id: 0,
                properties: vec![
                    Property {
                        name: Cow::Borrowed("speed"),
                        value: Value::Double(1.5),
                    },
                    Property {
                        name: Cow::Borrowed("bounds"),
                        value: Value::Rect {
                            x: 0,
                            y: 0,
                            w: 32,
                            h: 16,
                        },
                    },
                    Property {
                        name: Cow::Borrowed("nested"),
                        value: Value::Properties(vec![Property {
                            name: Cow::Borrowed("hidden"),
                            value: Value::Bool(true),
                        }]),
                    },
                    Property {
                        name: Cow::Borrowed("frames"),
                        value: Value::Vector(vec![
                            Value::Uint16(1),
                            Value::Uint16(2),
                            Value::Uint16(3),
                        ]),
                    },
                    Property {
                        name: Cow::Borrowed("mixed"),
                        value: Value::Vector(vec![Value::Uint8(1), Value::String(Cow::Borrowed("x"))]),
                    },
                ],
            }]),
        };
        assert_eq!(round_trip(&chunk), chunk);
    }

    #[test]
    fn vector_with_unknown_element_type_stays_heterogeneous() {
        // Heterogeneous wire form whose single element has an unknown tag.
        let mut w = AseWriter::new();
        w.put_dword(UserDataFlags::HAS_PROPERTIES.bits());
        w.put_dword(1);
        w.put_dword(0);
        w.put_dword(1);
        w.put_string("v").unwrap();
        w.put_word(TYPE_VECTOR);
        w.put_dword(1); // element count
        w.put_word(0); // per-element tags
        w.put_word(0x4242);
        w.put_bytes(&[1, 2, 3]);
        let bytes = w.into_bytes();

        let (_, parsed) = parse_user_data_chunk(&bytes).unwrap();
        let blocks = parsed.properties.as_ref().unwrap();
        assert!(matches!(
            &blocks[0].properties[0].value,
            Value::Vector(values)
                if matches!(&values[0], Value::Raw { type_code: 0x4242, .. })
        ));

        // Re-encoding must not collapse the raw tag into the homogeneous
        // element-type field; the output stays byte-identical.
        let mut w = AseWriter::new();
        encode_user_data_chunk(&parsed, &mut w).unwrap();
        assert_eq!(w.into_bytes(), bytes);
    }

    #[test]
    fn unknown_value_type_keeps_raw_bytes() {
        let mut w = AseWriter::new();
        w.put_dword(UserDataFlags::HAS_PROPERTIES.bits());
        w.put_dword(1);
        w.put_dword(0);
        w.put_dword(1);
        w.put_string("weird").unwrap();
        w.put_word(0x4242);
        w.put_bytes(&[9, 8, 7]);
        let bytes = w.into_bytes();

        let (_, parsed) = parse_user_data_chunk(&bytes).unwrap();
        let blocks = parsed.properties.as_ref().unwrap();
        assert_eq!(
            blocks[0].properties[0].value,
            Value::Raw {
                type_code: 0x4242,
                bytes: Cow::Borrowed(&[9, 8, 7][..]),
            }
        );

        let mut w = AseWriter::new();
        encode_user_data_chunk(&parsed, &mut w).unwrap();
        assert_eq!(w.into_bytes(), bytes);
    }
}
