//! Reassembly of length-prefixed frames from an arbitrarily chunked byte stream.

use crate::codec::{LENGTH_PREFIX_SIZE, TYPE_TAG_SIZE};
use crate::error::ProtocolError;
use crate::MAX_FRAME_LENGTH;
use bytes::{Buf, Bytes, BytesMut};

/// Carry-over buffer plus the length of the frame currently being waited on.
///
/// Bytes go in through [`extend`](Self::extend) (or straight into
/// [`buffer_mut`](Self::buffer_mut) from a socket read); complete frames come
/// out of [`next_frame`](Self::next_frame) as their tag+payload region.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: BytesMut,
    pending_length: Option<usize>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            pending_length: None,
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Bytes buffered but not yet handed out, excluding a consumed length prefix.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Take the next complete frame, or `Ok(None)` if more bytes are needed.
    ///
    /// A length prefix outside `TYPE_TAG_SIZE..=MAX_FRAME_LENGTH` is an error
    /// the stream cannot recover from.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        let length = match self.pending_length {
            Some(length) => length,
            None => {
                if self.buffer.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }
                let declared = self.buffer.get_i32_le();
                let length = usize::try_from(declared)
                    .ok()
                    .filter(|len| (TYPE_TAG_SIZE..=MAX_FRAME_LENGTH).contains(len))
                    .ok_or(ProtocolError::InvalidFrameLength(declared))?;
                self.pending_length = Some(length);
                length
            }
        };

        if self.buffer.len() < length {
            return Ok(None);
        }

        self.pending_length = None;
        Ok(Some(self.buffer.split_to(length).freeze()))
    }
}
