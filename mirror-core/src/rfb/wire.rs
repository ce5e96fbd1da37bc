//! Fixed-layout RFB 3.8 messages used by this client.
//!
//! Only the subset needed for a no-auth, Raw-encoding session is
//! modelled. All multi-byte fields are big-endian per RFC 6143.
//!
//! ## Wire format
//!
//! **FramebufferUpdateRequest** (10 bytes):
//! ```text
//! message_type:  u8   (3)
//! incremental:   u8
//! x, y, w, h:    u16  (4 × 2)
//! ```
//!
//! **SetEncodings** (8 bytes, single encoding):
//! ```text
//! message_type:  u8   (2)
//! padding:       u8
//! num_encodings: u16  (1)
//! encoding:      i32  (0 = Raw)
//! ```
//!
//! **FramebufferUpdate header** (4 bytes):
//! ```text
//! message_type:  u8   (0)
//! padding:       u8
//! num_rects:     u16
//! ```
//!
//! **Rectangle header** (12 bytes):
//! ```text
//! x, y, w, h:    u16  (4 × 2)
//! encoding:      i32
//! ```

use crate::error::MirrorError;

// ── Constants ────────────────────────────────────────────────────

/// The protocol version this client always claims.
pub const PROTOCOL_VERSION: &[u8; 12] = b"RFB 003.008\n";

/// Security type 1: no authentication.
pub const SECURITY_TYPE_NONE: u8 = 1;

/// Client-init shared-session flag.
pub const CLIENT_INIT_SHARED: u8 = 1;

/// Raw pixel encoding.
pub const ENCODING_RAW: i32 = 0;

/// Server→client FramebufferUpdate message type.
pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;

/// At most this many bytes of the server-init message are read; the
/// pixel-format detail and name string beyond the prefix are ignored.
pub const SERVER_INIT_MAX: usize = 8192;

// ── ServerInit ───────────────────────────────────────────────────

/// The parsed prefix of the server-init message.
///
/// Only the framebuffer size and bits-per-pixel are extracted; the
/// rest of the pixel format and the desktop name are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerInit {
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
}

impl ServerInit {
    /// Minimum prefix length needed to extract the fields above.
    pub const MIN_SIZE: usize = 5;

    /// Parse from the server-init prefix bytes.
    pub fn decode(data: &[u8]) -> Result<Self, MirrorError> {
        if data.len() < Self::MIN_SIZE {
            return Err(MirrorError::ProtocolViolation("server-init too short"));
        }
        Ok(Self {
            width: u16::from_be_bytes([data[0], data[1]]),
            height: u16::from_be_bytes([data[2], data[3]]),
            bits_per_pixel: data[4],
        })
    }
}

// ── SecurityResult ───────────────────────────────────────────────

/// Decode the 4-byte security result. Zero means success.
pub fn decode_security_result(data: [u8; 4]) -> u32 {
    u32::from_be_bytes(data)
}

// ── SetEncodings ─────────────────────────────────────────────────

/// SetEncodings advertising Raw support only.
#[derive(Debug, Clone, Copy)]
pub struct SetEncodings;

impl SetEncodings {
    /// Encoded size on the wire.
    pub const SIZE: usize = 8;

    /// Serialize to bytes.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = 2; // message type
        buf[1] = 0; // padding
        buf[2..4].copy_from_slice(&1u16.to_be_bytes());
        buf[4..8].copy_from_slice(&ENCODING_RAW.to_be_bytes());
        buf
    }
}

// ── UpdateRequest ────────────────────────────────────────────────

/// A non-incremental FramebufferUpdateRequest for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl UpdateRequest {
    /// Encoded size on the wire.
    pub const SIZE: usize = 10;

    /// Serialize to bytes. `incremental` is always 0: the client
    /// requests the full region every cycle.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = 3; // message type
        buf[1] = 0; // incremental
        buf[2..4].copy_from_slice(&self.x.to_be_bytes());
        buf[4..6].copy_from_slice(&self.y.to_be_bytes());
        buf[6..8].copy_from_slice(&self.width.to_be_bytes());
        buf[8..10].copy_from_slice(&self.height.to_be_bytes());
        buf
    }
}

// ── UpdateHeader ─────────────────────────────────────────────────

/// Header of a server FramebufferUpdate response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateHeader {
    pub message_type: u8,
    pub num_rects: u16,
}

impl UpdateHeader {
    /// Encoded size on the wire.
    pub const SIZE: usize = 4;

    /// Deserialize from bytes (padding byte ignored).
    pub fn decode(data: &[u8]) -> Result<Self, MirrorError> {
        if data.len() < Self::SIZE {
            return Err(MirrorError::ProtocolViolation("update header too short"));
        }
        Ok(Self {
            message_type: data[0],
            num_rects: u16::from_be_bytes([data[2], data[3]]),
        })
    }
}

// ── RectHeader ───────────────────────────────────────────────────

/// Per-rectangle header inside a FramebufferUpdate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectHeader {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: i32,
}

impl RectHeader {
    /// Encoded size on the wire.
    pub const SIZE: usize = 12;

    /// Deserialize from bytes.
    pub fn decode(data: &[u8]) -> Result<Self, MirrorError> {
        if data.len() < Self::SIZE {
            return Err(MirrorError::ProtocolViolation("rect header too short"));
        }
        Ok(Self {
            x: u16::from_be_bytes([data[0], data[1]]),
            y: u16::from_be_bytes([data[2], data[3]]),
            width: u16::from_be_bytes([data[4], data[5]]),
            height: u16::from_be_bytes([data[6], data[7]]),
            encoding: i32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }

    /// Payload size a Raw rectangle carries at the given depth.
    pub fn payload_len(&self, bits_per_pixel: u8) -> usize {
        self.width as usize * self.height as usize * (bits_per_pixel as usize / 8)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_literal() {
        assert_eq!(PROTOCOL_VERSION.len(), 12);
        assert_eq!(&PROTOCOL_VERSION[..], b"RFB 003.008\n");
    }

    #[test]
    fn set_encodings_exact_bytes() {
        let bytes = SetEncodings.encode();
        assert_eq!(bytes, [2, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn update_request_exact_bytes() {
        let req = UpdateRequest {
            x: 0,
            y: 0,
            width: 320,
            height: 700,
        };
        // 320 = 0x0140, 700 = 0x02BC, big-endian.
        assert_eq!(req.encode(), [3, 0, 0, 0, 0, 0, 0x01, 0x40, 0x02, 0xBC]);
    }

    #[test]
    fn server_init_decode() {
        let mut data = vec![0u8; 24];
        data[0..2].copy_from_slice(&1080u16.to_be_bytes());
        data[2..4].copy_from_slice(&2400u16.to_be_bytes());
        data[4] = 32;

        let init = ServerInit::decode(&data).unwrap();
        assert_eq!(init.width, 1080);
        assert_eq!(init.height, 2400);
        assert_eq!(init.bits_per_pixel, 32);
    }

    #[test]
    fn server_init_too_short() {
        assert!(ServerInit::decode(&[0, 1, 2]).is_err());
    }

    #[test]
    fn security_result_values() {
        assert_eq!(decode_security_result([0, 0, 0, 0]), 0);
        assert_eq!(decode_security_result([0, 0, 0, 1]), 1);
        assert_eq!(decode_security_result([0xDE, 0xAD, 0xBE, 0xEF]), 0xDEADBEEF);
    }

    #[test]
    fn update_header_decode() {
        let hdr = UpdateHeader::decode(&[0, 0, 0, 3]).unwrap();
        assert_eq!(hdr.message_type, MSG_FRAMEBUFFER_UPDATE);
        assert_eq!(hdr.num_rects, 3);

        assert!(UpdateHeader::decode(&[0, 0]).is_err());
    }

    #[test]
    fn rect_header_decode() {
        let mut data = [0u8; 12];
        data[0..2].copy_from_slice(&10u16.to_be_bytes());
        data[2..4].copy_from_slice(&20u16.to_be_bytes());
        data[4..6].copy_from_slice(&320u16.to_be_bytes());
        data[6..8].copy_from_slice(&700u16.to_be_bytes());
        data[8..12].copy_from_slice(&ENCODING_RAW.to_be_bytes());

        let rect = RectHeader::decode(&data).unwrap();
        assert_eq!(rect.x, 10);
        assert_eq!(rect.y, 20);
        assert_eq!(rect.width, 320);
        assert_eq!(rect.height, 700);
        assert_eq!(rect.encoding, ENCODING_RAW);
        assert_eq!(rect.payload_len(32), 320 * 700 * 4);
    }

    #[test]
    fn rect_header_too_short() {
        assert!(RectHeader::decode(&[0u8; 11]).is_err());
    }
}
