//! The message reader: presents a message as a byte stream, transparently
//! dispatching interleaved control frames and enforcing the fragmentation
//! and text-UTF-8 invariants.

use std::io::{Read, Write};

use crate::control::ControlHandler;
use crate::error::{Error, Result};
use crate::header::FrameHeader;
use crate::mask;
use crate::opcode::Opcode;
use crate::utf8::{self, Utf8Carry};

#[derive(Debug)]
enum State {
    InPayload { header: FrameHeader, idx: u64, carry: Utf8Carry },
    WaitingNextHeader { carry: Utf8Carry },
    Done,
    Err(Error),
}

/// A single in-flight message. Its internal state machine collapses the
/// single-frame and multi-frame cases spec.md distinguishes: both are an
/// `InPayload` run, differing only in whether exhausting the current frame's
/// payload transitions to `Done` (the frame's `fin` was set) or to
/// `WaitingNextHeader` (it wasn't).
pub struct MessageReader<'t, R, W, H> {
    transport: &'t mut R,
    control_writer: &'t mut W,
    handler: H,
    is_text: bool,
    state: State,
}

/// Consume frame headers from `transport`, dispatching each control frame to
/// `handler` (which may use `control_writer` to emit a pong), until a
/// non-control frame header arrives. That frame becomes the message's first
/// frame; it must be `text` or `binary` with no reserved bits set.
pub fn read_message<'t, R, W, H>(
    transport: &'t mut R,
    control_writer: &'t mut W,
    mut handler: H,
) -> Result<MessageReader<'t, R, W, H>>
where
    R: Read,
    W: Write,
    H: ControlHandler<W>,
{
    let header = next_data_header(transport, control_writer, &mut handler)?;

    if header.opcode != Opcode::Text && header.opcode != Opcode::Binary {
        return Err(Error::InvalidMessage("message must start with a text or binary frame"));
    }
    if header.rsv1 || header.rsv2 || header.rsv3 {
        return Err(Error::InvalidMessage("reserved bit set"));
    }

    let is_text = header.opcode == Opcode::Text;
    Ok(MessageReader {
        transport,
        control_writer,
        handler,
        is_text,
        state: State::InPayload { header, idx: 0, carry: Utf8Carry::default() },
    })
}

/// Read headers, transparently consuming and dispatching any control frames,
/// until a data-frame header arrives.
fn next_data_header<R, W, H>(transport: &mut R, control_writer: &mut W, handler: &mut H) -> Result<FrameHeader>
where
    R: Read,
    W: Write,
    H: ControlHandler<W>,
{
    loop {
        let header = FrameHeader::decode(transport)?;

        if header.opcode.is_control() {
            if !header.fin {
                return Err(Error::InvalidMessage("fragmented control frame"));
            }
            if header.rsv1 || header.rsv2 || header.rsv3 {
                return Err(Error::InvalidMessage("reserved bit set on control frame"));
            }
            if header.payload_len() > 125 {
                return Err(Error::InvalidMessage("control frame payload exceeds 125 bytes"));
            }
            if header.uses_extended_length_form() {
                return Err(Error::InvalidMessage("control frame used an extended-length wire form"));
            }

            let len = header.payload_len() as usize;
            let mut payload = vec![0u8; len];
            transport.read_exact(&mut payload)?;
            if let Some(key) = header.masking_key {
                mask::apply_mask(0, key, &mut payload);
            }

            handler.on_control_frame(&header, &payload, control_writer)?;
            continue;
        }

        return Ok(header);
    }
}

impl<'t, R, W, H> MessageReader<'t, R, W, H>
where
    R: Read,
    W: Write,
    H: ControlHandler<W>,
{
    /// Whether the message's first frame was `text` (vs. `binary`).
    pub fn is_text(&self) -> bool {
        self.is_text
    }

    /// Read up to `buf.len()` bytes of the message body. Returns `0` only at
    /// the true end of the message, never merely at a frame boundary. A
    /// partial read may return fewer bytes than requested. Once a protocol
    /// or UTF-8 error has been seen, every subsequent call returns that same
    /// error.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let state = std::mem::replace(&mut self.state, State::Done);
            match state {
                State::Err(err) => {
                    self.state = State::Err(err.clone());
                    return Err(err);
                }
                State::Done => {
                    self.state = State::Done;
                    return Ok(0);
                }
                State::WaitingNextHeader { carry } => {
                    match next_data_header(self.transport, self.control_writer, &mut self.handler) {
                        Ok(header) => {
                            if header.opcode != Opcode::Continuation {
                                let err = Error::InvalidMessage("expected a continuation frame");
                                self.state = State::Err(err.clone());
                                return Err(err);
                            }
                            if header.rsv1 || header.rsv2 || header.rsv3 {
                                let err = Error::InvalidMessage("reserved bit set");
                                self.state = State::Err(err.clone());
                                return Err(err);
                            }
                            self.state = State::InPayload { header, idx: 0, carry };
                        }
                        Err(err) => {
                            self.state = State::Err(err.clone());
                            return Err(err);
                        }
                    }
                }
                State::InPayload { header, idx, carry } => {
                    let remaining = header.payload_len() - idx;

                    if remaining == 0 {
                        if header.fin {
                            if !carry.is_empty() {
                                let err = Error::InvalidUtf8;
                                self.state = State::Err(err.clone());
                                return Err(err);
                            }
                            self.state = State::Done;
                            return Ok(0);
                        }
                        self.state = State::WaitingNextHeader { carry };
                        continue;
                    }

                    if buf.is_empty() {
                        self.state = State::InPayload { header, idx, carry };
                        return Ok(0);
                    }

                    let want = (buf.len() as u64).min(remaining) as usize;
                    match self.transport.read(&mut buf[..want]) {
                        Ok(0) => {
                            let err = Error::EndOfStream;
                            self.state = State::Err(err.clone());
                            return Err(err);
                        }
                        Ok(n) => {
                            if let Some(key) = header.masking_key {
                                mask::apply_mask(idx as usize, key, &mut buf[..n]);
                            }

                            let new_carry = if self.is_text {
                                match utf8::validate(carry, &buf[..n]) {
                                    Ok(c) => c,
                                    Err(err) => {
                                        self.state = State::Err(err.clone());
                                        return Err(err);
                                    }
                                }
                            } else {
                                carry
                            };

                            self.state = State::InPayload { header, idx: idx + n as u64, carry: new_carry };
                            return Ok(n);
                        }
                        Err(io_err) => {
                            let err: Error = io_err.into();
                            self.state = State::Err(err.clone());
                            return Err(err);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::default_control_handler;
    use crate::mask::MaskPolicy;
    use std::io::Cursor;

    fn read_to_vec<R, W, H>(reader: &mut MessageReader<R, W, H>) -> Result<Vec<u8>>
    where
        R: Read,
        W: Write,
        H: ControlHandler<W>,
    {
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        Ok(out)
    }

    #[test]
    fn s1_single_frame_unmasked_hello() {
        let mut input = Cursor::new(vec![0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);
        let mut out = Vec::new();
        let mut reader =
            read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked)).unwrap();
        assert!(reader.is_text());
        assert_eq!(read_to_vec(&mut reader).unwrap(), b"Hello");
    }

    #[test]
    fn s2_single_frame_masked_hello() {
        let mut input =
            Cursor::new(vec![0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58]);
        let mut out = Vec::new();
        let mut reader =
            read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked)).unwrap();
        assert_eq!(read_to_vec(&mut reader).unwrap(), b"Hello");
    }

    #[test]
    fn s3_two_fragment_unmasked_hello() {
        let mut input = Cursor::new(vec![0x01, 0x03, b'H', b'e', b'l', 0x80, 0x02, b'l', b'o']);
        let mut out = Vec::new();
        let mut reader =
            read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked)).unwrap();
        assert_eq!(read_to_vec(&mut reader).unwrap(), b"Hello");
    }

    #[test]
    fn s4_fragmented_text_with_interleaved_ping() {
        let mut wire = vec![0x01, 0x03, b'H', b'e', b'l'];
        wire.extend_from_slice(&[0x89, 0x05, b'H', b'e', b'l', b'l', b'o']);
        wire.extend_from_slice(&[0x80, 0x02, b'l', b'o']);
        let mut input = Cursor::new(wire);
        let mut control_out = Vec::new();
        let mut reader = read_message(
            &mut input,
            &mut control_out,
            default_control_handler(MaskPolicy::Fixed(0x37fa213d)),
        )
        .unwrap();
        assert_eq!(read_to_vec(&mut reader).unwrap(), b"Hello");
        assert_eq!(
            control_out,
            vec![0x8a, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58]
        );
    }

    #[test]
    fn s6_reserved_bit_set_is_invalid_message() {
        let mut input = Cursor::new(vec![0xC1, 0x05, b'H', b'e', b'l', b'l', b'o']);
        let mut out = Vec::new();
        let result = read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked));
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn s6_unterminated_text_sequence_is_invalid_utf8() {
        // Single final frame ending on a lead byte with no continuation.
        let mut input = Cursor::new(vec![0x81, 0x01, 0xC3]);
        let mut out = Vec::new();
        let mut reader =
            read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked)).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(reader.read(&mut buf), Err(Error::InvalidUtf8)));
        // Latched: a second read returns the same error.
        assert!(matches!(reader.read(&mut buf), Err(Error::InvalidUtf8)));
    }

    #[test]
    fn s6_control_frame_with_extended_length_marker_is_invalid_message() {
        // fin=1, opcode=ping, marker=126, extended field decodes to 3 — still rejected.
        let mut input = Cursor::new(vec![0x89, 126, 0x00, 0x03, b'p', b'i', b'n']);
        let mut out = Vec::new();
        let result = read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked));
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn s6_fragmented_control_frame_is_invalid_message() {
        let mut input = Cursor::new(vec![0x09, 0x00]); // fin=0, opcode=ping
        let mut out = Vec::new();
        let result = read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked));
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn s6_leading_continuation_frame_is_invalid_message() {
        let mut input = Cursor::new(vec![0x80, 0x00]); // fin=1, opcode=continuation
        let mut out = Vec::new();
        let result = read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked));
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn close_frame_is_surfaced_as_an_error() {
        let mut wire = vec![0x01, 0x03, b'H', b'e', b'l'];
        let mut close_payload = 1000u16.to_be_bytes().to_vec();
        close_payload.extend_from_slice(b"done");
        wire.push(0x88);
        wire.push(close_payload.len() as u8);
        wire.extend_from_slice(&close_payload);
        let mut input = Cursor::new(wire);
        let mut out = Vec::new();
        let mut reader =
            read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked)).unwrap();
        let mut buf = [0u8; 16];
        let result = loop {
            match reader.read(&mut buf) {
                Ok(0) => panic!("reached end of message before the close frame"),
                Ok(_) => continue,
                Err(err) => break err,
            }
        };
        assert!(matches!(result, Error::ReceivedCloseFrame(_)));
    }

    #[test]
    fn partial_reads_are_honored() {
        let mut input = Cursor::new(vec![0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);
        let mut out = Vec::new();
        let mut reader =
            read_message(&mut input, &mut out, default_control_handler(MaskPolicy::Unmasked)).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"He");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ll");
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(&buf[..1], b"o");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
