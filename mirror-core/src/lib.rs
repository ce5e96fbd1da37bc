//! # mirror-core
//!
//! Core library for mirroring a remote framebuffer over a minimal
//! RFB (VNC) session and translating local pointer gestures into
//! device input commands.
//!
//! This crate contains:
//! - **Wire codec**: fixed-layout RFB 3.8 message subset (`rfb::wire`)
//! - **Session**: handshake + update-request/response cycles (`rfb::session`)
//! - **Frame decode**: Raw rectangle → viewport frame (`rfb::frame`)
//! - **Gesture**: per-pointer-session classification state machine (`gesture`)
//! - **Geometry**: UI-viewport → device-pixel mapping (`geometry`)
//! - **Dispatch**: serialized device-command queue + sink trait (`dispatch`)
//! - **Capture**: session lifecycle and frame publication (`capture`)
//! - **Input**: gesture→command pipeline actor (`input`)
//! - **Error**: `MirrorError` — typed, `thiserror`-based hierarchy (`error`)
//!
//! Concurrency model: the capture loop, the input-event actor, and
//! the dispatcher worker are three independent tasks sharing no
//! mutable state; the command queue is the only synchronization
//! point, and one `CancellationToken` is the only shutdown signal.

pub mod capture;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod input;
pub mod rfb;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capture::{CaptureConfig, CaptureService, CaptureStats};
pub use dispatch::{Command, CommandDispatcher, CommandSender, DeviceControl, KeyInput};
pub use error::MirrorError;
pub use geometry::{DeviceGeometry, Point};
pub use gesture::{Gesture, GestureClassifier, GesturePhase};
pub use input::{InputPipeline, PointerEvent, PointerSender};
pub use rfb::{Frame, RawRect, RfbSession, SessionPhase, UI_HEIGHT, UI_WIDTH};
