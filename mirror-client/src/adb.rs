//! adb device bridge.
//!
//! Thin shell-outs to the `adb` binary: device discovery, companion
//! app lifecycle, port forwarding, and the [`DeviceControl`] sink
//! that injects taps, swipes, long-presses and keys via `input`.
//! No protocol logic lives here — every method is one adb
//! invocation.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use mirror_core::dispatch::{DeviceControl, KeyInput};
use mirror_core::error::MirrorError;

use crate::config::AdbConfig;

// ── DeviceInfo ───────────────────────────────────────────────────

/// Discovered device identity and geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: String,
    pub screen_width: u32,
    pub screen_height: u32,
}

// ── AdbBridge ────────────────────────────────────────────────────

/// Wraps every adb interaction the client performs.
pub struct AdbBridge {
    bin: String,
    serial: Option<String>,
    package: String,
    apk_path: Option<String>,
    app_running: AtomicBool,
    server_running: AtomicBool,
}

impl AdbBridge {
    pub fn new(config: &AdbConfig) -> Self {
        Self {
            bin: config.bin.clone(),
            serial: config.serial.clone(),
            package: config.package.clone(),
            apk_path: config.apk_path.clone(),
            app_running: AtomicBool::new(false),
            server_running: AtomicBool::new(false),
        }
    }

    /// Run `adb <args>` and return trimmed stdout.
    async fn adb(&self, args: &[&str]) -> Result<String, MirrorError> {
        let mut cmd = Command::new(&self.bin);
        if let Some(serial) = &self.serial {
            cmd.args(["-s", serial]);
        }
        cmd.args(args);

        let output = cmd
            .output()
            .await
            .map_err(|e| MirrorError::Device(format!("{} failed to spawn: {e}", self.bin)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MirrorError::Device(format!(
                "adb {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run `adb shell <args>`.
    async fn shell(&self, args: &[&str]) -> Result<String, MirrorError> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        self.adb(&full).await
    }

    // ── Bootstrap ────────────────────────────────────────────────

    /// Start the adb server and forward the streaming port.
    pub async fn bootstrap(&self, local_port: u16, remote_port: u16) -> Result<(), MirrorError> {
        self.adb(&["start-server"]).await?;
        self.adb(&[
            "forward",
            &format!("tcp:{local_port}"),
            &format!("tcp:{remote_port}"),
        ])
        .await?;
        info!(local_port, remote_port, "adb port forward established");
        Ok(())
    }

    /// Serials of devices currently in the `device` state.
    pub async fn devices(&self) -> Result<Vec<String>, MirrorError> {
        let out = self.adb(&["devices"]).await?;
        Ok(out
            .lines()
            .skip(1) // "List of devices attached"
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(serial), Some("device")) => Some(serial.to_string()),
                    _ => None,
                }
            })
            .collect())
    }

    /// Discover the single attached device and its geometry.
    ///
    /// Fails when no device is attached, or when several are and no
    /// serial was configured.
    pub async fn discover(&self) -> Result<DeviceInfo, MirrorError> {
        let devices = self.devices().await?;
        match (devices.len(), &self.serial) {
            (0, _) => return Err(MirrorError::Device("no devices connected".into())),
            (1, _) => {}
            (_, Some(_)) => {}
            (n, None) => {
                return Err(MirrorError::Device(format!(
                    "{n} devices connected; set a serial to pick one"
                )));
            }
        }

        let size = self.shell(&["wm", "size"]).await?;
        let (screen_width, screen_height) = parse_wm_size(&size)?;
        let model = self.shell(&["getprop", "ro.product.model"]).await?;

        Ok(DeviceInfo {
            model,
            screen_width,
            screen_height,
        })
    }

    // ── Companion app lifecycle ──────────────────────────────────

    /// Install the companion app when missing and an APK is
    /// configured; otherwise just report presence.
    pub async fn ensure_app_installed(&self) -> Result<bool, MirrorError> {
        let packages = self.shell(&["pm", "list", "packages", &self.package]).await?;
        if packages
            .lines()
            .any(|l| l.trim() == format!("package:{}", self.package))
        {
            return Ok(true);
        }

        let Some(apk) = &self.apk_path else {
            warn!(package = %self.package, "companion app missing and no apk_path configured");
            return Ok(false);
        };

        info!(apk = %apk, "installing companion app");
        self.adb(&["install", "-r", apk]).await?;
        // The app posts a foreground notification while streaming.
        self.shell(&[
            "pm",
            "grant",
            &self.package,
            "android.permission.POST_NOTIFICATIONS",
        ])
        .await?;
        Ok(true)
    }

    /// Launch the companion app's main activity.
    pub async fn start_app(&self) -> Result<(), MirrorError> {
        if self.app_running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shell(&["am", "start", "-n", &format!("{}/.MainActivity", self.package)])
            .await?;
        Ok(())
    }

    /// Force-stop the companion app.
    pub async fn stop_app(&self) -> Result<(), MirrorError> {
        if !self.app_running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.shell(&["am", "force-stop", &self.package]).await?;
        Ok(())
    }

    /// Ask the app to start its streaming server.
    pub async fn start_stream_server(&self) -> Result<(), MirrorError> {
        if self.server_running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shell(&[
            "am",
            "broadcast",
            "-a",
            &format!("{}.START_STREAM", self.package),
        ])
        .await?;
        Ok(())
    }

    /// Ask the app to stop its streaming server.
    pub async fn stop_stream_server(&self) -> Result<(), MirrorError> {
        if !self.server_running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.shell(&[
            "am",
            "broadcast",
            "-a",
            &format!("{}.STOP_STREAM", self.package),
        ])
        .await?;
        Ok(())
    }
}

// ── DeviceControl ────────────────────────────────────────────────

#[async_trait]
impl DeviceControl for AdbBridge {
    async fn tap(&self, x: i32, y: i32) -> Result<(), MirrorError> {
        debug!(x, y, "input tap");
        self.shell(&["input", "tap", &x.to_string(), &y.to_string()])
            .await?;
        Ok(())
    }

    async fn swipe(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), MirrorError> {
        debug!(x0, y0, x1, y1, "input swipe");
        self.shell(&[
            "input",
            "swipe",
            &x0.to_string(),
            &y0.to_string(),
            &x1.to_string(),
            &y1.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> Result<(), MirrorError> {
        debug!(x, y, duration_ms, "input long-press");
        // A zero-motion timed swipe is how `input` expresses a
        // long-press.
        let (xs, ys) = (x.to_string(), y.to_string());
        self.shell(&["input", "swipe", &xs, &ys, &xs, &ys, &duration_ms.to_string()])
            .await?;
        Ok(())
    }

    async fn key(&self, input: KeyInput) -> Result<(), MirrorError> {
        match input {
            KeyInput::Text(c) => {
                debug!(%c, "input text");
                self.shell(&["input", "text", &c.to_string()]).await?;
            }
            KeyInput::Code(code) => {
                debug!(code, "input keyevent");
                self.shell(&["input", "keyevent", &code.to_string()]).await?;
            }
        }
        Ok(())
    }
}

// ── Parsing ──────────────────────────────────────────────────────

/// Parse `wm size` output, e.g. `Physical size: 1080x2400`.
pub fn parse_wm_size(output: &str) -> Result<(u32, u32), MirrorError> {
    let line = output
        .lines()
        .find(|l| l.contains(':'))
        .ok_or_else(|| MirrorError::Device(format!("unrecognized wm size output: {output:?}")))?;
    let dims = line
        .rsplit(':')
        .next()
        .unwrap_or_default()
        .trim();
    let (w, h) = dims
        .split_once('x')
        .ok_or_else(|| MirrorError::Device(format!("unrecognized wm size output: {output:?}")))?;
    let width = w
        .trim()
        .parse()
        .map_err(|_| MirrorError::Device(format!("bad width in wm size output: {w:?}")))?;
    let height = h
        .trim()
        .parse()
        .map_err(|_| MirrorError::Device(format!("bad height in wm size output: {h:?}")))?;
    Ok((width, height))
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_physical_size() {
        assert_eq!(
            parse_wm_size("Physical size: 1080x2400").unwrap(),
            (1080, 2400)
        );
    }

    #[test]
    fn parse_size_with_override_line() {
        let out = "Physical size: 1080x2400\nOverride size: 720x1600";
        // First line with a colon wins; adb reports the physical
        // size first.
        assert_eq!(parse_wm_size(out).unwrap(), (1080, 2400));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_wm_size("").is_err());
        assert!(parse_wm_size("no size here").is_err());
        assert!(parse_wm_size("Physical size: huge").is_err());
    }
}
