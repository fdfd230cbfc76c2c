//! # Configuration Management
//!
//! This module handles loading the service configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with WAVEFORM_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` (deployment platforms set these)
//! 2. Environment variables (WAVEFORM_SERVER__PORT, WAVEFORM_FETCH__TIMEOUT_SECS, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Nested keys use a double underscore so that field names containing a
//! single underscore (`max_audio_bytes`, `timeout_secs`) survive the mapping.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Hard ceiling on the number of audio bytes read from any source (150 MiB).
pub const DEFAULT_MAX_AUDIO_BYTES: u64 = 150 * 1024 * 1024;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Each stage of the request pipeline (fetching, staging, waveform generation)
/// reads only its own group, which keeps the handler signatures small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub waveform: WaveformToolConfig,
    pub staging: StagingConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "0.0.0.0"`: Accept connections from any interface (default, container friendly)
/// - `host = "127.0.0.1"`: Only accept connections from localhost
/// - `port = 8080`: The port the service has always listened on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for downloading audio referenced by URL.
///
/// ## Fields:
/// - `timeout_secs`: Overall deadline for the download, including the body
/// - `connect_timeout_secs`: Deadline for establishing the TCP/TLS connection
/// - `max_redirects`: How many redirect hops are followed before giving up
/// - `max_audio_bytes`: Byte ceiling applied to downloads and data URIs alike
/// - `allow_private_hosts`: Skip the loopback/private address check (internal storage only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_redirects: usize,
    pub max_audio_bytes: u64,
    pub allow_private_hosts: bool,
}

/// How the external `audiowaveform` binary is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformToolConfig {
    /// Program name or absolute path of the waveform generator
    pub binary: String,
    /// Deadline for a single invocation; the child is killed when it expires
    pub timeout_secs: u64,
}

/// Where request audio is staged on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Directory for temporary audio files; empty means the system temp dir
    pub temp_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            fetch: FetchConfig {
                timeout_secs: 30,
                connect_timeout_secs: 10,
                max_redirects: 5,
                max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
                allow_private_hosts: false,
            },
            waveform: WaveformToolConfig {
                binary: "audiowaveform".to_string(),
                timeout_secs: 120,
            },
            staging: StagingConfig {
                temp_dir: String::new(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with WAVEFORM_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `WAVEFORM_SERVER__PORT=3000`: Override server port
    /// - `WAVEFORM_WAVEFORM__BINARY=/opt/bin/audiowaveform`: Use a specific tool build
    /// - `WAVEFORM_STAGING__TEMP_DIR=/scratch`: Stage audio on a dedicated volume
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("WAVEFORM")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Fetch and tool deadlines are non-zero (a zero deadline fails every request)
    /// - The byte ceiling is non-zero
    /// - A waveform binary is named
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.fetch.timeout_secs == 0 || self.fetch.connect_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Fetch timeouts must be greater than 0"));
        }

        if self.fetch.max_audio_bytes == 0 {
            return Err(anyhow::anyhow!("Max audio bytes must be greater than 0"));
        }

        if self.waveform.binary.trim().is_empty() {
            return Err(anyhow::anyhow!("Waveform binary must not be empty"));
        }

        if self.waveform.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Waveform timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Largest request body accepted on the waveform endpoint.
    ///
    /// A data URI carries the audio base64-encoded, so the body must hold
    /// 4/3 of the byte ceiling plus room for the JSON envelope and MIME header.
    pub fn max_request_bytes(&self) -> usize {
        let encoded = self.fetch.max_audio_bytes.div_ceil(3) * 4;
        (encoded + 64 * 1024) as usize
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl WaveformToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StagingConfig {
    /// The configured staging directory, or `None` for the system default.
    pub fn dir(&self) -> Option<PathBuf> {
        let trimmed = self.temp_dir.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.fetch.max_audio_bytes, 157_286_400);
        assert_eq!(config.waveform.binary, "audiowaveform");
        assert!(!config.fetch.allow_private_hosts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.waveform.binary = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fetch.max_audio_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.waveform.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_limit_fits_encoded_ceiling() {
        let config = AppConfig::default();
        let encoded = (config.fetch.max_audio_bytes as usize).div_ceil(3) * 4;
        assert!(config.max_request_bytes() > encoded);
    }

    #[test]
    fn test_staging_dir() {
        let mut config = AppConfig::default();
        assert!(config.staging.dir().is_none());

        config.staging.temp_dir = "/var/tmp/waveforms".to_string();
        assert_eq!(config.staging.dir(), Some(PathBuf::from("/var/tmp/waveforms")));
    }
}
