//! Close status codes and the close-frame payload (RFC 6455 §7.4).

use crate::error::{Error, Result};
use crate::utf8::{self, Utf8Carry};

/// A 16-bit close status code, the first two bytes of a close-frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    pub const NORMAL: CloseCode = CloseCode(1000);
    pub const GOING_AWAY: CloseCode = CloseCode(1001);
    pub const PROTOCOL_ERROR: CloseCode = CloseCode(1002);
    pub const CANNOT_ACCEPT: CloseCode = CloseCode(1003);
    pub const NO_STATUS_CODE_PRESENT: CloseCode = CloseCode(1005);
    pub const CLOSED_ABNORMALLY: CloseCode = CloseCode(1006);
    pub const INCONSISTENT_FORMAT: CloseCode = CloseCode(1007);
    pub const POLICY_VIOLATION: CloseCode = CloseCode(1008);
    pub const MESSAGE_TOO_LARGE: CloseCode = CloseCode(1009);
    pub const EXPECTED_EXTENSION: CloseCode = CloseCode(1010);
    pub const INVALID_TLS_SIGNATURE: CloseCode = CloseCode(1015);

    /// Codes that MAY appear on the wire. `1005`, `1006`, `1015`, and any
    /// code outside the registered/private ranges are for local reporting
    /// only and must never be sent.
    pub fn is_sendable(self) -> bool {
        matches!(self.0, 1000..=1003 | 1007..=1010 | 3000..=4999)
    }
}

/// A decoded or to-be-encoded close frame: a status code plus a UTF-8 reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: CloseCode,
    pub reason: String,
}

/// Parse a close-frame payload. `Ok(None)` means an empty close frame (no
/// status code present). A payload of exactly one byte, or a reason that
/// fails UTF-8 validation, is a protocol violation.
pub fn parse_close_payload(payload: &[u8]) -> Result<Option<CloseFrame>> {
    if payload.is_empty() {
        return Ok(None);
    }
    if payload.len() < 2 {
        return Err(Error::InvalidMessage("close frame payload shorter than 2 bytes"));
    }

    let code = CloseCode(u16::from_be_bytes([payload[0], payload[1]]));
    let reason_bytes = &payload[2..];

    let carry = utf8::validate(Utf8Carry::default(), reason_bytes)?;
    if !carry.is_empty() {
        return Err(Error::InvalidUtf8);
    }
    // utf8::validate already proved this is well-formed UTF-8.
    let reason = String::from_utf8(reason_bytes.to_vec()).map_err(|_| Error::InvalidUtf8)?;

    Ok(Some(CloseFrame { code, reason }))
}

/// Build a close-frame payload. `None` produces an empty payload.
pub fn build_close_payload(frame: Option<&CloseFrame>) -> Vec<u8> {
    match frame {
        None => Vec::new(),
        Some(frame) => {
            let mut payload = Vec::with_capacity(2 + frame.reason.len());
            payload.extend_from_slice(&frame.code.0.to_be_bytes());
            payload.extend_from_slice(frame.reason.as_bytes());
            payload
        }
    }
}
