//! The error taxonomy shared by every layer of the codec.
//!
//! Readers latch the first protocol or UTF-8 error they see; latching needs
//! to hand the same error back on every subsequent call without consuming
//! it, so `Error` is `Clone`. `std::io::Error` itself isn't `Clone`, so a
//! transport failure is projected into its `ErrorKind` plus a rendered
//! message rather than carried verbatim — see the Open Questions note in
//! SPEC_FULL.md about not coalescing transport errors into one opaque
//! variant.

use std::io;

use crate::close::CloseFrame;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The transport returned a short/empty read where a full header or
    /// payload chunk was required, or the peer closed the connection.
    #[error("transport reached end of stream")]
    EndOfStream,

    /// Any other transport failure. The kind and message are preserved
    /// rather than collapsed, so a caller wrapping a richer transport can
    /// still distinguish e.g. a reset from a permission error.
    #[error("transport error ({kind:?}): {message}")]
    Transport { kind: io::ErrorKind, message: String },

    /// A local, connection-fatal protocol violation (RFC 6455 close code
    /// 1002 territory): reserved bits set, an unknown opcode, a fragmented
    /// control frame, an oversized control payload, a continuation arriving
    /// without a preceding start frame, or a non-continuation frame arriving
    /// mid-fragment.
    #[error("protocol violation: {0}")]
    InvalidMessage(&'static str),

    /// A text payload failed incremental UTF-8 validation, or a message
    /// ended on a partial code point (RFC 6455 close code 1007 territory).
    #[error("invalid utf-8 in text payload")]
    InvalidUtf8,

    /// A frame declared a payload length that does not fit in this host's
    /// addressable size.
    #[error("frame payload length {0} exceeds host addressable size")]
    PayloadTooLong(u64),

    /// The control-frame handler observed a close frame. The caller should
    /// complete the closing handshake and tear down the transport.
    #[error("peer sent a close frame: {0:?}")]
    ReceivedCloseFrame(Option<CloseFrame>),

    /// The default control handler's pong (or another handler's writeback)
    /// failed to write; the connection is unsalvageable.
    #[error("failed writing a control-frame response")]
    UnexpectedControlFrameResponseFailure,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::EndOfStream
        } else {
            Error::Transport { kind: err.kind(), message: err.to_string() }
        }
    }
}
