//! Little-endian output buffer for encoding. The counterpart of the nom
//! parsers in [`super::scalars`]: every `put_*` here is inverted by the
//! parser of the same scalar.

use super::errors::EncodeError;
use super::scalars::{Byte, Color, Double, Dword, Fixed, Float, Long, Long64, Qword, Short, Uuid, Word};

const INITIAL_CAPACITY: usize = 4096;

/// Growable output buffer with size back-patching. Positions handed out by
/// [`AseWriter::mark`] stay valid because the buffer only ever appends.
#[derive(Debug)]
pub struct AseWriter {
    buf: Vec<u8>,
}

impl Default for AseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AseWriter {
    pub fn new() -> Self {
        AseWriter {
            buf: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_byte(&mut self, v: Byte) {
        self.buf.push(v);
    }

    pub fn put_word(&mut self, v: Word) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_short(&mut self, v: Short) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_dword(&mut self, v: Dword) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_long(&mut self, v: Long) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_qword(&mut self, v: Qword) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_long64(&mut self, v: Long64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_float(&mut self, v: Float) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_double(&mut self, v: Double) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_fixed(&mut self, v: Fixed) {
        self.put_long(v.0);
    }

    pub fn put_color(&mut self, c: Color) {
        self.buf
            .extend_from_slice(&[c.red, c.green, c.blue, c.alpha]);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// WORD length prefix then the UTF-8 bytes. Fails above 65535 bytes.
    pub fn put_string(&mut self, s: &str) -> Result<(), EncodeError> {
        let len = s.len();
        if len > usize::from(Word::MAX) {
            return Err(EncodeError::StringTooLong(len));
        }
        self.put_word(len as Word);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn put_uuid(&mut self, uuid: Uuid) {
        self.buf.extend_from_slice(&uuid.0);
    }

    /// Reserved regions are written as zeros.
    pub fn skip(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Current position, for a later `patch_*` call.
    pub fn mark(&self) -> usize {
        self.buf.len()
    }

    pub fn patch_word(&mut self, mark: usize, v: Word) {
        self.buf[mark..mark + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn patch_dword(&mut self, mark: usize, v: Dword) {
        self.buf[mark..mark + 4].copy_from_slice(&v.to_le_bytes());
    }
}
