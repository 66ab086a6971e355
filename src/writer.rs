//! Message writers: present a message as a byte-stream sink, emitting one or
//! many frames with correct FIN/continuation/masking.

use std::io::Write;

use crate::close::CloseFrame;
use crate::error::{Error, Result};
use crate::header::FrameHeader;
use crate::mask::{self, MaskPolicy};
use crate::opcode::Opcode;

/// Writes exactly one frame for a payload of a declared length `L`, masking
/// in a transient scratch buffer when configured. The header is emitted at
/// construction time with `fin=true`. Writing past `L` returns
/// `Error::EndOfStream`; every call before that writes up to the remaining
/// room and returns the count actually written.
pub struct SingleFrameWriter<'t, W> {
    transport: &'t mut W,
    masking_key: Option<[u8; 4]>,
    len: u64,
    written: u64,
}

impl<'t, W: Write> SingleFrameWriter<'t, W> {
    pub fn new(transport: &'t mut W, opcode: Opcode, len: u64, mask: MaskPolicy) -> Result<Self> {
        let masking_key = mask.resolve_key()?;
        let header = FrameHeader::new_data(opcode, true, len, masking_key);
        header.encode(transport)?;
        Ok(SingleFrameWriter { transport, masking_key, len, written: 0 })
    }

    /// A control-frame writer: `opcode` must be a control opcode and
    /// `payload_len` (≤125) is not permitted to use the extended length
    /// forms — enforced by [`FrameHeader::new_control`].
    pub fn new_control(transport: &'t mut W, opcode: Opcode, payload_len: u8, mask: MaskPolicy) -> Result<Self> {
        let masking_key = mask.resolve_key()?;
        let header = FrameHeader::new_control(opcode, payload_len, masking_key)?;
        header.encode(transport)?;
        Ok(SingleFrameWriter { transport, masking_key, len: payload_len as u64, written: 0 })
    }

    /// Write up to `self.len - self.written` bytes of `bytes`. Returns
    /// `Error::EndOfStream` once the declared length has already been
    /// reached.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let room = (self.len - self.written) as usize;
        if room == 0 {
            return Err(Error::EndOfStream);
        }

        let n = bytes.len().min(room);
        let chunk = &bytes[..n];

        if let Some(key) = self.masking_key {
            let mut scratch = chunk.to_vec();
            mask::apply_mask(self.written as usize, key, &mut scratch);
            self.transport.write_all(&scratch)?;
        } else {
            self.transport.write_all(chunk)?;
        }

        self.written += n as u64;
        Ok(n)
    }

    /// Pad the remainder of the declared length with zero bytes, used to
    /// satisfy `L` when the caller bails out early.
    pub fn discard(&mut self) -> Result<()> {
        const ZEROS: [u8; 4096] = [0u8; 4096];
        while self.written < self.len {
            self.write(&ZEROS)?;
        }
        Ok(())
    }
}

/// Writes an open-ended message with no declared length up front. The first
/// frame carries the message's opcode; every subsequent `write` emits
/// exactly one `continuation` frame with `fin=false`. Each call maps
/// one-to-one onto a wire frame, so callers should buffer small writes
/// themselves to avoid per-frame header overhead.
pub struct MultiFrameWriter<'t, W> {
    transport: &'t mut W,
    opcode: Opcode,
    mask: MaskPolicy,
    first_frame: bool,
    closed: bool,
}

impl<'t, W: Write> MultiFrameWriter<'t, W> {
    pub fn new(transport: &'t mut W, opcode: Opcode, mask: MaskPolicy) -> Self {
        MultiFrameWriter { transport, opcode, mask, first_frame: true, closed: false }
    }

    /// Emit one non-final frame carrying `bytes`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::InvalidMessage("write called on a closed multi-frame writer"));
        }
        self.emit_frame(bytes, false)
    }

    /// Emit the terminal `fin=true` frame with an empty payload.
    pub fn close(&mut self) -> Result<()> {
        self.close_with(&[])
    }

    /// Emit the terminal `fin=true` frame carrying `bytes`.
    pub fn close_with(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.emit_frame(bytes, true)?;
        self.closed = true;
        Ok(())
    }

    fn emit_frame(&mut self, bytes: &[u8], fin: bool) -> Result<usize> {
        let opcode = if self.first_frame { self.opcode } else { Opcode::Continuation };
        let masking_key = self.mask.resolve_key()?;
        let header = FrameHeader::new_data(opcode, fin, bytes.len() as u64, masking_key);
        header.encode(self.transport)?;

        if let Some(key) = masking_key {
            let mut scratch = bytes.to_vec();
            mask::apply_mask(0, key, &mut scratch);
            self.transport.write_all(&scratch)?;
        } else {
            self.transport.write_all(bytes)?;
        }

        self.first_frame = false;
        Ok(bytes.len())
    }
}

/// Send a close frame. `frame` of `None` sends an empty close payload.
/// Rejects a `code` that is not in the sendable set (RFC 6455 §7.4).
pub fn write_close(transport: &mut impl Write, frame: Option<&CloseFrame>, mask: MaskPolicy) -> Result<()> {
    if let Some(frame) = frame {
        if !frame.code.is_sendable() {
            return Err(Error::InvalidMessage("close code is reserved for local reporting only"));
        }
    }
    let payload = crate::close::build_close_payload(frame);
    if payload.len() > 125 {
        return Err(Error::InvalidMessage("close reason is too long to fit in a control frame"));
    }
    let mut writer = SingleFrameWriter::new_control(transport, Opcode::Close, payload.len() as u8, mask)?;
    let written = writer.write(&payload)?;
    if written != payload.len() {
        return Err(Error::UnexpectedControlFrameResponseFailure);
    }
    Ok(())
}
