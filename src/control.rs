//! The control-frame handler contract.
//!
//! A handler is a capability — "given a control frame, react using this
//! writer" — not a virtual method on a connection object, so it is modeled
//! as a plain closure trait. Tests can supply a panicking stub or a
//! capturing mock; production code uses [`default_control_handler`].

use std::io::Write;

use crate::error::{Error, Result};
use crate::header::FrameHeader;
use crate::mask::MaskPolicy;
use crate::opcode::Opcode;
use crate::close;
use crate::writer::SingleFrameWriter;

/// Reacts to a control frame discovered mid-read. `writer` is the write half
/// of the same connection, so a ping can be answered with a pong without the
/// reader needing to know anything about the transport's write side.
pub trait ControlHandler<W: Write> {
    fn on_control_frame(&mut self, header: &FrameHeader, payload: &[u8], writer: &mut W) -> Result<()>;
}

impl<F, W> ControlHandler<W> for F
where
    W: Write,
    F: FnMut(&FrameHeader, &[u8], &mut W) -> Result<()>,
{
    fn on_control_frame(&mut self, header: &FrameHeader, payload: &[u8], writer: &mut W) -> Result<()> {
        self(header, payload, writer)
    }
}

/// The default reaction: answer a ping with a pong (masked per `mask`),
/// ignore a pong, and surface a close frame as [`Error::ReceivedCloseFrame`].
pub fn default_control_handler<W: Write>(
    mask: MaskPolicy,
) -> impl FnMut(&FrameHeader, &[u8], &mut W) -> Result<()> {
    move |header, payload, writer| react(mask, header, payload, writer)
}

fn react<W: Write>(mask: MaskPolicy, header: &FrameHeader, payload: &[u8], writer: &mut W) -> Result<()> {
    match header.opcode {
        Opcode::Ping => {
            let mut pong = SingleFrameWriter::new_control(writer, Opcode::Pong, payload.len() as u8, mask)
                .map_err(|_| Error::UnexpectedControlFrameResponseFailure)?;
            pong.write(payload).map_err(|_| Error::UnexpectedControlFrameResponseFailure)?;
            Ok(())
        }
        Opcode::Pong => Ok(()),
        Opcode::Close => {
            let close_frame = close::parse_close_payload(payload)?;
            Err(Error::ReceivedCloseFrame(close_frame))
        }
        _ => unreachable!("only control opcodes reach the control handler"),
    }
}
