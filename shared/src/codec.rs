//! Binary reading/writing primitives and frame encoding.
//!
//! All numeric values are fixed-width little-endian. Strings are an `i32`
//! byte length followed by UTF-8 bytes. A frame is laid out as
//!
//! ```text
//! [total length: i32][type tag: i32][payload ...]
//! ```
//!
//! where `total length` counts the tag and the payload but not itself.

use crate::error::ProtocolError;
use crate::message::{Message, MessageType};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the length prefix in front of every frame.
pub const LENGTH_PREFIX_SIZE: usize = 4;
/// Size of the message type tag.
pub const TYPE_TAG_SIZE: usize = 4;

/// Cursor over one frame's bytes that fails instead of panicking on short data.
#[derive(Debug)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { buf: data.into() }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn ensure(&self, len: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < len {
            return Err(ProtocolError::UnexpectedEof);
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    /// Read an `i32` length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(ProtocolError::InvalidStringLength(len));
        }
        let len = len as usize;
        self.ensure(len)?;
        let raw = self.buf.split_to(len);
        String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Consume the reader, failing if any payload bytes were left unread.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.buf.remaining() {
            0 => Ok(()),
            extra => Err(ProtocolError::TrailingBytes(extra)),
        }
    }
}

/// Growable little-endian writer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    #[inline]
    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    /// Write an `i32` length-prefixed UTF-8 string.
    pub fn put_string(&mut self, s: &str) {
        self.buf.put_i32_le(s.len() as i32);
        self.buf.put_slice(s.as_bytes());
    }

    pub fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Encode a message into a complete, length-prefixed frame.
pub fn encode_frame(message: &Message) -> Bytes {
    let mut body = BinaryWriter::new();
    body.put_i32(message.message_type() as i32);
    message.encode_payload(&mut body);
    let body = body.finish();

    let mut frame = BinaryWriter::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.put_i32(body.len() as i32);
    frame.put_slice(&body);
    frame.finish()
}

/// Decode the tag+payload region of exactly one frame.
pub fn decode_frame(body: impl Into<Bytes>) -> Result<Message, ProtocolError> {
    let mut reader = BinaryReader::new(body);
    let tag = reader.read_i32()?;
    let message_type = MessageType::try_from(tag)?;
    let message = Message::decode_payload(message_type, &mut reader)?;
    reader.finish()?;
    Ok(message)
}
