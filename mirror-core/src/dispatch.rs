//! Serialized delivery of device input commands.
//!
//! A single unbounded FIFO queue drained by one worker task. The
//! worker performs exactly one awaited call into the device-control
//! sink per command, in enqueue order, so injected input never
//! overlaps. A failed sink call is logged and dropped — commands are
//! fire-and-forget, never retried or requeued.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::MirrorError;

// ── Command ──────────────────────────────────────────────────────

/// A translated input command in device-pixel coordinates.
/// Immutable once enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Tap { x: i32, y: i32 },
    Swipe { x0: i32, y0: i32, x1: i32, y1: i32 },
    LongPress { x: i32, y: i32, duration_ms: u64 },
    Key(KeyInput),
}

/// A forwarded keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// A printable character, injected as text.
    Text(char),
    /// A device key code (enter, backspace, ...).
    Code(u32),
}

// ── DeviceControl ────────────────────────────────────────────────

/// The external device-control sink that executes input on the
/// mirrored device. All calls are fire-and-forget; no return value
/// beyond success/failure is consumed.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    async fn tap(&self, x: i32, y: i32) -> Result<(), MirrorError>;
    async fn swipe(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), MirrorError>;
    async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> Result<(), MirrorError>;
    async fn key(&self, input: KeyInput) -> Result<(), MirrorError>;
}

// ── CommandSender ────────────────────────────────────────────────

/// Cloneable enqueue handle for the command queue.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender {
    /// Enqueue a command for ordered delivery.
    pub fn enqueue(&self, command: Command) -> Result<(), MirrorError> {
        self.tx.send(command)?;
        Ok(())
    }
}

// ── CommandDispatcher ────────────────────────────────────────────

/// Owns the queue's worker task.
pub struct CommandDispatcher {
    tx: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl CommandDispatcher {
    /// Spawn the worker draining the queue into `sink`.
    ///
    /// The worker observes `shutdown` between items; an in-flight
    /// sink call always completes before the worker exits. Commands
    /// still queued at shutdown are dropped (acceptable loss).
    pub fn spawn(sink: Arc<dyn DeviceControl>, shutdown: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        let handle = tokio::spawn(async move {
            loop {
                let command = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    cmd = rx.recv() => match cmd {
                        Some(c) => c,
                        None => break,
                    },
                };

                debug!(?command, "dispatching");
                if let Err(e) = deliver(sink.as_ref(), command).await {
                    // Fire-and-forget: log and move on to the next item.
                    warn!(?command, error = %e, "device command failed");
                }
            }
        });

        Self { tx, handle }
    }

    /// A cloneable enqueue handle.
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Wait for the worker to exit after cancellation.
    pub async fn join(self) {
        drop(self.tx);
        let _ = self.handle.await;
    }
}

async fn deliver(sink: &dyn DeviceControl, command: Command) -> Result<(), MirrorError> {
    match command {
        Command::Tap { x, y } => sink.tap(x, y).await,
        Command::Swipe { x0, y0, x1, y1 } => sink.swipe(x0, y0, x1, y1).await,
        Command::LongPress { x, y, duration_ms } => sink.long_press(x, y, duration_ms).await,
        Command::Key(input) => sink.key(input).await,
    }
}

// ── Tests ────────────────────────────────────────────────────────
