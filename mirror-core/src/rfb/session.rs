//! RFB client session: handshake and framebuffer capture.
//!
//! One [`RfbSession`] owns one TCP stream. [`RfbSession::connect`]
//! runs the fixed handshake sequence (version exchange → security
//! negotiation → security result → server-init prefix → client-init →
//! SetEncodings); [`RfbSession::capture_screen`] then drives one
//! update-request/response cycle per call.
//!
//! Error policy (see `MirrorError`): handshake failures are fatal to
//! the attempt and surface as `Err`, driving the caller's reconnect
//! loop. Steady-state protocol violations (unexpected message type,
//! unsupported encoding or depth) are absorbed as `Ok(None)` — "no
//! frame this cycle". I/O failures, including the stream closing
//! mid-payload, are `Err`: the connection is dead and callers must
//! react differently than to a skipped frame.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::MirrorError;
use crate::rfb::frame::{RawRect, UI_HEIGHT, UI_WIDTH};
use crate::rfb::wire::{
    self, RectHeader, ServerInit, SetEncodings, UpdateHeader, UpdateRequest,
};

// ── Constants ────────────────────────────────────────────────────

/// Deadline for establishing the TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Payload bytes are read in chunks of at most this size.
const READ_CHUNK: usize = 64 * 1024;

/// The fixed capture region requested every cycle, irrespective of
/// the negotiated remote resolution. The frame decoder's crop offset
/// is tied to this region; neither generalizes (a deliberate
/// constraint of the protocol subset).
pub const CAPTURE_REGION: UpdateRequest = UpdateRequest {
    x: 0,
    y: 0,
    width: UI_WIDTH as u16,
    height: UI_HEIGHT as u16,
};

// ── SessionPhase ─────────────────────────────────────────────────

/// Lifecycle phase of an RFB connection.
///
/// ```text
///  Disconnected ──► HandshakeInProgress ──► Authenticated ──► Streaming
/// ```
///
/// Transitions are strictly forward; re-entering an earlier phase
/// requires a fresh connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No active connection. Initial state.
    #[default]
    Disconnected,

    /// TCP link is up; version/security exchange in flight.
    HandshakeInProgress,

    /// Security result accepted; reading server parameters.
    Authenticated,

    /// Handshake complete; update cycles may run.
    Streaming,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::HandshakeInProgress => write!(f, "HandshakeInProgress"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Streaming => write!(f, "Streaming"),
        }
    }
}

impl SessionPhase {
    /// Advance to the next phase in the fixed order.
    ///
    /// Returns an error on any attempt to skip or move backwards.
    fn advance(&mut self, next: SessionPhase) -> Result<(), MirrorError> {
        let valid = matches!(
            (*self, next),
            (Self::Disconnected, Self::HandshakeInProgress)
                | (Self::HandshakeInProgress, Self::Authenticated)
                | (Self::Authenticated, Self::Streaming)
        );
        if !valid {
            return Err(MirrorError::ProtocolViolation(
                "invalid session phase transition",
            ));
        }
        *self = next;
        Ok(())
    }
}

// ── RfbSession ───────────────────────────────────────────────────

/// A connected RFB client session.
#[derive(Debug)]
pub struct RfbSession {
    stream: TcpStream,
    phase: SessionPhase,
    bits_per_pixel: u8,
    /// Remote framebuffer size as announced in server-init.
    /// Informational only — never used to size update requests.
    remote_size: (u16, u16),
}

impl RfbSession {
    /// Connect and run the full handshake.
    ///
    /// Fails with `Connection`/`ConnectTimeout` if the stream cannot
    /// be opened or closes mid-handshake, and with
    /// `AuthenticationFailed` on a nonzero security result.
    pub async fn connect(host: &str, port: u16) -> Result<Self, MirrorError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| MirrorError::ConnectTimeout(CONNECT_TIMEOUT))??;
        // Small writes every cycle; coalescing them adds latency.
        stream.set_nodelay(true)?;

        let mut session = Self {
            stream,
            phase: SessionPhase::Disconnected,
            bits_per_pixel: 0,
            remote_size: (0, 0),
        };
        session.handshake().await?;
        Ok(session)
    }

    /// The negotiated remote framebuffer size.
    pub fn remote_size(&self) -> (u16, u16) {
        self.remote_size
    }

    /// The negotiated bits-per-pixel.
    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    async fn handshake(&mut self) -> Result<(), MirrorError> {
        self.phase.advance(SessionPhase::HandshakeInProgress)?;

        // Version exchange. The server's claimed version is read and
        // discarded; this client always speaks 3.8.
        self.stream.write_all(wire::PROTOCOL_VERSION).await?;
        let mut server_version = [0u8; 12];
        self.stream.read_exact(&mut server_version).await?;

        // Security negotiation: discard the offered type list and
        // select None.
        let mut count = [0u8; 1];
        self.stream.read_exact(&mut count).await?;
        let mut offered = vec![0u8; count[0] as usize];
        self.stream.read_exact(&mut offered).await?;
        self.stream
            .write_all(&[wire::SECURITY_TYPE_NONE])
            .await?;

        // Security result.
        let mut result = [0u8; 4];
        self.stream.read_exact(&mut result).await?;
        let code = wire::decode_security_result(result);
        if code != 0 {
            return Err(MirrorError::AuthenticationFailed(code));
        }
        self.phase.advance(SessionPhase::Authenticated)?;

        // Server-init prefix: one read of up to 8 KiB; only the
        // framebuffer size and depth are extracted.
        let mut buf = vec![0u8; wire::SERVER_INIT_MAX];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        let init = ServerInit::decode(&buf[..n])?;
        self.remote_size = (init.width, init.height);
        self.bits_per_pixel = init.bits_per_pixel;

        // Client-init (shared session) and SetEncodings (Raw only).
        self.stream.write_all(&[wire::CLIENT_INIT_SHARED]).await?;
        self.stream.write_all(&SetEncodings.encode()).await?;

        self.phase.advance(SessionPhase::Streaming)?;
        debug!(
            width = init.width,
            height = init.height,
            bpp = init.bits_per_pixel,
            "handshake complete"
        );
        Ok(())
    }

    /// Run one update-request/response cycle.
    ///
    /// Returns `Ok(Some(rect))` with the raw 32-bpp rectangle on
    /// success, `Ok(None)` when this cycle produced no usable frame
    /// (absorbed protocol violation), and `Err` when the connection
    /// is dead.
    pub async fn capture_screen(&mut self) -> Result<Option<RawRect>, MirrorError> {
        if self.phase != SessionPhase::Streaming {
            return Err(MirrorError::ProtocolViolation("session is not streaming"));
        }

        self.stream.write_all(&CAPTURE_REGION.encode()).await?;

        let mut header = [0u8; UpdateHeader::SIZE];
        self.stream.read_exact(&mut header).await?;
        let header = UpdateHeader::decode(&header)?;
        if header.message_type != wire::MSG_FRAMEBUFFER_UPDATE {
            debug!(message_type = header.message_type, "unexpected message type");
            return Ok(None);
        }

        for _ in 0..header.num_rects {
            let mut rect = [0u8; RectHeader::SIZE];
            self.stream.read_exact(&mut rect).await?;
            let rect = RectHeader::decode(&rect)?;

            if rect.encoding != wire::ENCODING_RAW {
                debug!(encoding = rect.encoding, "unsupported encoding");
                return Ok(None);
            }

            // The payload is consumed at the negotiated depth even
            // when that depth is not decodable, so the stream stays
            // positioned at the next message.
            let payload = self.read_payload(rect.payload_len(self.bits_per_pixel)).await?;

            if self.bits_per_pixel != 32 {
                debug!(bpp = self.bits_per_pixel, "unsupported pixel depth");
                return Ok(None);
            }

            return Ok(Some(RawRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                data: payload,
            }));
        }

        Ok(None)
    }

    /// Read exactly `expected` payload bytes in ≤64 KiB chunks.
    async fn read_payload(&mut self, expected: usize) -> Result<Vec<u8>, MirrorError> {
        let mut data = vec![0u8; expected];
        let mut filled = 0usize;
        while filled < expected {
            let cap = (expected - filled).min(READ_CHUNK);
            let n = self.stream.read(&mut data[filled..filled + cap]).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            filled += n;
        }
        Ok(data)
    }

    /// Best-effort shutdown; errors are swallowed.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_transitions_forward_only() {
        let mut phase = SessionPhase::Disconnected;
        phase.advance(SessionPhase::HandshakeInProgress).unwrap();
        phase.advance(SessionPhase::Authenticated).unwrap();
        phase.advance(SessionPhase::Streaming).unwrap();

        // No re-entry into an earlier phase.
        assert!(phase.advance(SessionPhase::Disconnected).is_err());
        assert!(phase.advance(SessionPhase::HandshakeInProgress).is_err());
        assert_eq!(phase, SessionPhase::Streaming);
    }

    #[test]
    fn phase_no_skipping() {
        let mut phase = SessionPhase::Disconnected;
        assert!(phase.advance(SessionPhase::Streaming).is_err());
        assert_eq!(phase, SessionPhase::Disconnected);
    }

    #[test]
    fn capture_region_is_fixed_viewport() {
        assert_eq!(CAPTURE_REGION.x, 0);
        assert_eq!(CAPTURE_REGION.y, 0);
        assert_eq!(CAPTURE_REGION.width, 320);
        assert_eq!(CAPTURE_REGION.height, 700);
    }
}
