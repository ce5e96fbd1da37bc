//! # RFB client subset
//!
//! A minimal RFB (VNC) 3.8 client speaking no-auth, Raw-encoding
//! sessions against a fixed 320×700 viewport.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ wire        │ ──► │ session      │ ──► │ frame        │
//! │ msg codecs  │     │ handshake +  │     │ crop +       │
//! │             │     │ capture loop │     │ resample     │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! | Module    | Purpose                                         |
//! |-----------|-------------------------------------------------|
//! | `wire`    | Fixed big-endian message shapes (RFC 6143 subset) |
//! | `session` | Connection lifecycle, handshake, update cycles  |
//! | `frame`   | Raw rectangle → viewport-sized RGBA frame       |

pub mod frame;
pub mod session;
pub mod wire;

// ── Re-exports ───────────────────────────────────────────────────

pub use frame::{Frame, RawRect, UI_HEIGHT, UI_WIDTH};
pub use session::{RfbSession, SessionPhase, CAPTURE_REGION};
pub use wire::{RectHeader, ServerInit, SetEncodings, UpdateHeader, UpdateRequest};
