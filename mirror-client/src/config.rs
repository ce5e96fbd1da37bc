//! Client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the mirror client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Streaming endpoint settings.
    pub network: NetworkConfig,
    /// adb bridge settings.
    pub adb: AdbConfig,
    /// Input forwarding settings.
    pub input: InputConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Streaming endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host the forwarded RFB endpoint is reachable at.
    pub host: String,
    /// Local port of the forwarded RFB endpoint.
    pub port: u16,
    /// Delay between connect attempts in milliseconds.
    pub reconnect_delay_ms: u64,
}

/// adb bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdbConfig {
    /// adb binary to invoke.
    pub bin: String,
    /// Target device serial; required only with multiple devices.
    pub serial: Option<String>,
    /// Remote port the companion app's server listens on.
    pub remote_port: u16,
    /// Companion app package name.
    pub package: String,
    /// Optional APK to install when the app is missing.
    pub apk_path: Option<String>,
    /// Delay between device discovery attempts in milliseconds.
    pub discovery_retry_ms: u64,
}

/// Input forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Forward keyboard input to the device.
    pub forward_keyboard: bool,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            adb: AdbConfig::default(),
            input: InputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5900,
            reconnect_delay_ms: 1000,
        }
    }
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            bin: "adb".into(),
            serial: None,
            remote_port: 5900,
            package: "com.mirror.agent".into(),
            apk_path: None,
            discovery_retry_ms: 3000,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            forward_keyboard: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ClientConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("host"));
        assert!(text.contains("package"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ClientConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.port, 5900);
        assert_eq!(parsed.adb.bin, "adb");
        assert!(parsed.input.forward_keyboard);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: ClientConfig = toml::from_str("[network]\nport = 5901\n").unwrap();
        assert_eq!(parsed.network.port, 5901);
        assert_eq!(parsed.network.host, "127.0.0.1");
        assert_eq!(parsed.adb.remote_port, 5900);
    }
}
