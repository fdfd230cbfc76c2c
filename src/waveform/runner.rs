//! Runs the external waveform tool.

use crate::config::WaveformToolConfig;
use crate::error::{AppError, AppResult};
use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

/// Invokes `audiowaveform` with a deadline.
///
/// The child is spawned with `kill_on_drop`, so it is terminated both when
/// the deadline expires and when the request future is dropped because the
/// client went away.
#[derive(Debug, Clone)]
pub struct WaveformGenerator {
    binary: String,
    timeout: Duration,
}

impl WaveformGenerator {
    pub fn new(config: &WaveformToolConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout(),
        }
    }

    /// Run the tool and parse its stdout as JSON.
    ///
    /// ## Errors (all `AppError::Processing`):
    /// - the binary cannot be started
    /// - the deadline expires
    /// - the tool exits non-zero (message carries its stderr)
    /// - stdout is not JSON
    pub async fn generate(&self, args: Vec<OsString>) -> AppResult<serde_json::Value> {
        debug!(binary = %self.binary, ?args, "Running waveform tool");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(binary = %self.binary, error = %e, "Failed to start waveform tool");
                AppError::Processing(format!("Failed to execute audiowaveform: {}", e))
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                AppError::Processing(format!("Failed to execute audiowaveform: {}", e))
            })?,
            Err(_) => {
                error!(timeout_secs = self.timeout.as_secs_f64(), "Waveform tool timed out");
                return Err(AppError::Processing(format!(
                    "audiowaveform did not finish within {} seconds",
                    self.timeout.as_secs_f64()
                )));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            error!(status = %output.status, stderr = %stderr, "Waveform tool failed");
            return Err(AppError::Processing(format!(
                "Failed to execute audiowaveform: {}",
                stderr
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            let message = if stderr.is_empty() {
                format!("Failed to parse waveform data from tool: {}", e)
            } else {
                format!("Failed to parse waveform data from tool: {} ({})", e, stderr)
            };
            AppError::Processing(message)
        })
    }
}
