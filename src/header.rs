//! Frame header encode/decode (RFC 6455 §5.2).
//!
//! Three wire encodings share one logical shape: a 2-byte short header
//! (payload ≤125), a 4-byte medium header (marker `126` + 16-bit length), and
//! a 10-byte long header (marker `127` + 64-bit length), each gaining 4 bytes
//! when masked. `FrameHeader` exposes the decoded fields through
//! `payload_len()`, and separately tracks whether an extended-length marker
//! was used on the wire — a control frame must reject that regardless of
//! what length it decoded to.

use std::io::{Read, Write};

use log::trace;

use crate::error::{Error, Result};
use crate::opcode::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: Opcode,
    pub masking_key: Option<[u8; 4]>,
    payload_len: u64,
    /// Whether the wire form used the `126`/`127` length marker, independent
    /// of what the decoded length turned out to be. A control frame that
    /// used this form is malformed regardless of its decoded length — see
    /// `uses_extended_length_form`.
    extended_length_form: bool,
}

impl FrameHeader {
    /// A data-frame header with no reserved bits set.
    pub fn new_data(opcode: Opcode, fin: bool, payload_len: u64, masking_key: Option<[u8; 4]>) -> Self {
        FrameHeader {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            masking_key,
            payload_len,
            extended_length_form: payload_len > 125,
        }
    }

    /// A control-frame header. Control payloads can never use the extended
    /// length forms, so this rejects a length over 125 up front.
    pub fn new_control(opcode: Opcode, payload_len: u8, masking_key: Option<[u8; 4]>) -> Result<Self> {
        if !opcode.is_control() {
            return Err(Error::InvalidMessage("new_control called with a data opcode"));
        }
        if payload_len > 125 {
            return Err(Error::InvalidMessage("control frame payload exceeds 125 bytes"));
        }
        Ok(FrameHeader::new_data(opcode, true, payload_len as u64, masking_key))
    }

    /// The effective payload length: the 7-bit length field when ≤125, else
    /// the decoded extended-length field.
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    pub fn mask_present(&self) -> bool {
        self.masking_key.is_some()
    }

    /// Whether this header's wire form carried an extended (`126`/`127`)
    /// length marker. RFC 6455 §5.5 requires control-frame payloads to use
    /// the short form, so a control frame must reject a header that used an
    /// extended marker even when the decoded length happens to be ≤125.
    pub fn uses_extended_length_form(&self) -> bool {
        self.extended_length_form
    }

    /// Read and decode one frame header from `transport`. Fails with
    /// `Error::EndOfStream` if the transport closes mid-header, with
    /// `Error::InvalidMessage` on an unknown opcode, and with
    /// `Error::PayloadTooLong` if the declared length exceeds this host's
    /// addressable size.
    pub fn decode(transport: &mut impl Read) -> Result<Self> {
        let mut first_two = [0u8; 2];
        transport.read_exact(&mut first_two)?;

        let fin = first_two[0] & 0x80 != 0;
        let rsv1 = first_two[0] & 0x40 != 0;
        let rsv2 = first_two[0] & 0x20 != 0;
        let rsv3 = first_two[0] & 0x10 != 0;
        let opcode = Opcode::try_from(first_two[0] & 0x0F)?;

        let masked = first_two[1] & 0x80 != 0;
        let len7 = first_two[1] & 0x7F;

        let payload_len: u64 = if len7 == 126 {
            let mut ext = [0u8; 2];
            transport.read_exact(&mut ext)?;
            u16::from_be_bytes(ext) as u64
        } else if len7 == 127 {
            let mut ext = [0u8; 8];
            transport.read_exact(&mut ext)?;
            u64::from_be_bytes(ext)
        } else {
            len7 as u64
        };

        if usize::try_from(payload_len).is_err() {
            return Err(Error::PayloadTooLong(payload_len));
        }

        let extended_length_form = len7 == 126 || len7 == 127;

        let masking_key = if masked {
            let mut key = [0u8; 4];
            transport.read_exact(&mut key)?;
            Some(key)
        } else {
            None
        };

        trace!(
            "decoded frame header: fin={fin} opcode={opcode:?} masked={masked} payload_len={payload_len}"
        );

        Ok(FrameHeader { fin, rsv1, rsv2, rsv3, opcode, masking_key, payload_len, extended_length_form })
    }

    /// Encode this header to `transport`, choosing the minimal wire form for
    /// `self.payload_len()`.
    pub fn encode(&self, transport: &mut impl Write) -> Result<()> {
        let mut first = u8::from(self.opcode);
        if self.fin {
            first |= 0x80;
        }
        if self.rsv1 {
            first |= 0x40;
        }
        if self.rsv2 {
            first |= 0x20;
        }
        if self.rsv3 {
            first |= 0x10;
        }

        let mask_bit = if self.masking_key.is_some() { 0x80 } else { 0x00 };

        let mut out = Vec::with_capacity(14);
        out.push(first);

        if self.payload_len <= 125 {
            out.push(mask_bit | self.payload_len as u8);
        } else if self.payload_len <= u16::MAX as u64 {
            out.push(mask_bit | 126);
            out.extend_from_slice(&(self.payload_len as u16).to_be_bytes());
        } else {
            out.push(mask_bit | 127);
            out.extend_from_slice(&self.payload_len.to_be_bytes());
        }

        if let Some(key) = self.masking_key {
            out.extend_from_slice(&key);
        }

        trace!(
            "encoding frame header: fin={} opcode={:?} masked={} payload_len={}",
            self.fin,
            self.opcode,
            self.masking_key.is_some(),
            self.payload_len
        );

        transport.write_all(&out)?;
        Ok(())
    }
}
