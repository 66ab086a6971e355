//! WebSocket (RFC 6455) frame codec and blocking message streamer.
//!
//! This crate implements the hard core of a WebSocket client: bit-exact
//! frame header encoding, in-place payload masking, incremental UTF-8
//! validation across frame boundaries, and a message reader/writer pair that
//! never buffers a whole message. It does not perform the HTTP Upgrade
//! handshake's transport (TLS) or any extension negotiation; see
//! [`handshake`] for the thin collaborator that builds the handshake's
//! request/response bytes once a byte-level transport is already connected.

pub mod close;
pub mod control;
pub mod error;
pub mod handshake;
pub mod header;
pub mod mask;
pub mod opcode;
pub mod reader;
pub mod utf8;
pub mod writer;

pub use close::{CloseCode, CloseFrame};
pub use control::{default_control_handler, ControlHandler};
pub use error::{Error, Result};
pub use header::FrameHeader;
pub use mask::MaskPolicy;
pub use opcode::Opcode;
pub use reader::{read_message, MessageReader};
pub use writer::{write_close, MultiFrameWriter, SingleFrameWriter};
