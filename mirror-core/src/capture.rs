//! Capture service: session lifecycle + frame publication.
//!
//! Drives [`RfbSession`] → frame decode in a loop and publishes
//! changed frames to the display collaborator through a
//! `tokio::sync::watch` channel, so the renderer always sees the
//! latest frame without blocking the capture path.
//!
//! Connection policy: connect is retried forever with a fixed delay
//! (the remote endpoint is started asynchronously by an external
//! collaborator, so "not yet reachable" is the normal initial
//! state). A cycle that yields no frame is skipped; a dead
//! connection tears the session down and re-enters the connect loop.
//! Shutdown is cooperative via a `CancellationToken` observed at
//! iteration boundaries — in-flight reads complete or error out
//! first.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::rfb::frame::{self, Frame};
use crate::rfb::session::RfbSession;

// ── CaptureConfig ────────────────────────────────────────────────

/// Configuration for [`CaptureService`].
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Remote streaming endpoint host.
    pub host: String,
    /// Remote streaming endpoint port.
    pub port: u16,
    /// Fixed delay between connect attempts.
    pub reconnect_delay: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5900,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

// ── CaptureStats ─────────────────────────────────────────────────

/// Per-cycle statistics exposed to the UI.
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    /// Current smoothed frames per second.
    pub fps: f64,
    /// Frames published since start.
    pub total_frames: u64,
    /// Cycles that produced no usable frame.
    pub skipped_cycles: u64,
    /// Remote framebuffer size from the last handshake.
    pub remote_width: u16,
    pub remote_height: u16,
    /// Whether a session is currently established.
    pub connected: bool,
}

// ── CaptureService ───────────────────────────────────────────────

/// Owns the capture loop. Create, clone the receivers, then call
/// [`run`](Self::run) in a task; it exits when the shutdown token is
/// cancelled.
pub struct CaptureService {
    config: CaptureConfig,
    shutdown: CancellationToken,
    frame_tx: watch::Sender<Option<Frame>>,
    frame_rx: watch::Receiver<Option<Frame>>,
    stats_tx: watch::Sender<CaptureStats>,
    stats_rx: watch::Receiver<CaptureStats>,
}

impl CaptureService {
    pub fn new(config: CaptureConfig, shutdown: CancellationToken) -> Self {
        let (frame_tx, frame_rx) = watch::channel(None);
        let (stats_tx, stats_rx) = watch::channel(CaptureStats::default());
        Self {
            config,
            shutdown,
            frame_tx,
            frame_rx,
            stats_tx,
            stats_rx,
        }
    }

    /// Latest-frame channel for the display collaborator.
    pub fn frame_receiver(&self) -> watch::Receiver<Option<Frame>> {
        self.frame_rx.clone()
    }

    /// Statistics channel.
    pub fn stats_receiver(&self) -> watch::Receiver<CaptureStats> {
        self.stats_rx.clone()
    }

    /// Run until the shutdown token is cancelled.
    pub async fn run(self) {
        let mut stats = CaptureStats::default();

        while !self.shutdown.is_cancelled() {
            let mut session = match self.connect_with_retry().await {
                Some(s) => s,
                None => break, // cancelled while connecting
            };

            let (rw, rh) = session.remote_size();
            info!(
                host = %self.config.host,
                port = self.config.port,
                remote_width = rw,
                remote_height = rh,
                "session established"
            );
            stats.connected = true;
            stats.remote_width = rw;
            stats.remote_height = rh;
            let _ = self.stats_tx.send(stats.clone());

            self.stream_frames(&mut session, &mut stats).await;

            stats.connected = false;
            let _ = self.stats_tx.send(stats.clone());
            session.close().await;
        }
    }

    /// Connect, retrying with a fixed delay until cancelled.
    async fn connect_with_retry(&self) -> Option<RfbSession> {
        loop {
            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                r = RfbSession::connect(&self.config.host, self.config.port) => r,
            };

            match attempt {
                Ok(session) => return Some(session),
                Err(e) => {
                    debug!(error = %e, "connect failed; retrying");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return None,
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                    }
                }
            }
        }
    }

    /// Capture cycles until cancellation or a dead connection.
    async fn stream_frames(&self, session: &mut RfbSession, stats: &mut CaptureStats) {
        let mut last_published: Option<Frame> = None;
        let mut fps_samples: Vec<Duration> = Vec::with_capacity(64);
        let mut last_frame_time = Instant::now();

        loop {
            let captured = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                r = session.capture_screen() => r,
            };

            let rect = match captured {
                Ok(Some(rect)) => rect,
                Ok(None) => {
                    // No usable frame this cycle; retry immediately.
                    stats.skipped_cycles += 1;
                    let _ = self.stats_tx.send(stats.clone());
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "capture failed; reconnecting");
                    return;
                }
            };

            let frame = match frame::decode(rect) {
                Ok(f) => f,
                Err(e) => {
                    debug!(error = %e, "undecodable frame skipped");
                    stats.skipped_cycles += 1;
                    continue;
                }
            };

            // Publish only when the frame actually changed.
            if last_published.as_ref() == Some(&frame) {
                continue;
            }
            last_published = Some(frame.clone());
            let _ = self.frame_tx.send(Some(frame));

            stats.total_frames += 1;
            let now = Instant::now();
            fps_samples.push(now.duration_since(last_frame_time));
            last_frame_time = now;
            if fps_samples.len() > 60 {
                fps_samples.remove(0);
            }
            let avg: f64 =
                fps_samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / fps_samples.len() as f64;
            stats.fps = if avg > 0.0 { 1.0 / avg } else { 0.0 };
            let _ = self.stats_tx.send(stats.clone());
        }
    }
}
