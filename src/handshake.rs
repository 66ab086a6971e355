//! The HTTP Upgrade handshake's request/response bytes (RFC 6455 §1.3, §4).
//!
//! This is a collaborator, not part of the frame codec core: it never opens
//! a socket or negotiates TLS. A caller sends [`build_handshake_request`]'s
//! output over an already-connected transport, reads the response back
//! itself, and passes it to [`validate_handshake_response`] before switching
//! that same transport over to [`crate::read_message`] /
//! [`crate::SingleFrameWriter`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Generate a random 16-byte `Sec-WebSocket-Key`, base64-encoded.
///
/// Unlike a handshake key derived from wall-clock time, this draws from a
/// CSPRNG — RFC 6455 requires the key to be "randomly selected", and a
/// predictable key defeats the point of the handshake's replay check.
pub fn generate_sec_key() -> Result<String> {
    let mut key = [0u8; 16];
    getrandom::fill(&mut key).map_err(|_| Error::Transport {
        kind: std::io::ErrorKind::Other,
        message: "failed to source a random Sec-WebSocket-Key".into(),
    })?;
    Ok(BASE64.encode(key))
}

fn compute_accept_key(sec_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(sec_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Build the `GET` request that initiates the handshake.
pub fn build_handshake_request(host: &str, path: &str, sec_key: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {sec_key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    )
}

/// Validate a handshake response: status `101`, the required `Upgrade` and
/// `Connection` headers, and a `Sec-WebSocket-Accept` matching `sec_key`.
pub fn validate_handshake_response(response: &str, sec_key: &str) -> Result<()> {
    if !response.starts_with("HTTP/1.1 101") {
        return Err(Error::InvalidMessage("handshake response did not return 101 Switching Protocols"));
    }

    let lower = response.to_lowercase();
    if !lower.contains("upgrade: websocket") {
        return Err(Error::InvalidMessage("handshake response missing 'Upgrade: websocket'"));
    }
    if !lower.contains("connection: upgrade") {
        return Err(Error::InvalidMessage("handshake response missing 'Connection: Upgrade'"));
    }

    let accept_value = response
        .lines()
        .find_map(|line| {
            let lower_line = line.to_lowercase();
            if lower_line.starts_with("sec-websocket-accept:") {
                Some(line.split_once(':')?.1.trim())
            } else {
                None
            }
        })
        .ok_or(Error::InvalidMessage("handshake response missing 'Sec-WebSocket-Accept'"))?;

    if accept_value != compute_accept_key(sec_key) {
        return Err(Error::InvalidMessage("handshake response has a mismatched Sec-WebSocket-Accept"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_key_matches_the_rfc_6455_worked_example() {
        // RFC 6455 §1.3's own example.
        assert_eq!(compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn validates_a_correct_response() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let response = "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";
        assert!(validate_handshake_response(response, key).is_ok());
    }

    #[test]
    fn rejects_a_non_101_status() {
        let response = "HTTP/1.1 200 OK\r\n\r\n";
        assert!(validate_handshake_response(response, "anything").is_err());
    }

    #[test]
    fn rejects_a_mismatched_accept_key() {
        let response = "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: not-the-right-value\r\n\r\n";
        assert!(validate_handshake_response(response, "dGhlIHNhbXBsZSBub25jZQ==").is_err());
    }

    #[test]
    fn generated_sec_keys_are_well_formed_base64_of_16_bytes() {
        let key = generate_sec_key().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(&key).unwrap();
        assert_eq!(decoded.len(), 16);
    }
}
