//! # Waveform Generation
//!
//! Translates request options into an `audiowaveform` command line and runs
//! the tool against the staged audio. The tool's JSON is returned untouched.
//!
//! ## Command Line Contract:
//! ```text
//! audiowaveform -i <path> --input-format {wav|mp3} --output-format json
//!     [--pixels-per-second N | --zoom N] [--bits N] [--split-channels]
//!     [--amplitude-scale F]
//! ```

pub mod runner;

pub use runner::WaveformGenerator;

use crate::audio::AudioFormat;
use crate::error::{AppError, AppResult};
use std::ffi::OsString;
use std::path::Path;

/// Horizontal resolution of the generated waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Let the tool pick its default zoom
    Default,
    /// Spread this many points across the whole file
    TotalPoints(u64),
    PointsPerSecond(u64),
    /// Input samples per output point
    Zoom(u64),
}

impl Resolution {
    /// Pick the resolution from the request fields; zero means "not set".
    ///
    /// Precedence: total points, then points per second, then zoom.
    pub fn from_request(total_points: u64, points_per_second: u64, zoom: u64) -> Self {
        if total_points > 0 {
            Resolution::TotalPoints(total_points)
        } else if points_per_second > 0 {
            Resolution::PointsPerSecond(points_per_second)
        } else if zoom > 0 {
            Resolution::Zoom(zoom)
        } else {
            Resolution::Default
        }
    }
}

/// Everything about the tool invocation that comes from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformOptions {
    pub resolution: Resolution,
    /// 8 or 16; `None` leaves the tool default
    pub bits: Option<u8>,
    pub split_channels: bool,
    /// Only positive scales are passed on
    pub amplitude_scale: Option<f64>,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::Default,
            bits: None,
            split_channels: false,
            amplitude_scale: None,
        }
    }
}

impl WaveformOptions {
    /// Build the tool arguments for the staged file.
    ///
    /// `duration` is needed to turn a total point count into a density; a
    /// zero-length file cannot be spread over any number of points.
    pub fn command_args(
        &self,
        input: &Path,
        format: AudioFormat,
        duration: f64,
    ) -> AppResult<Vec<OsString>> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "--input-format".into(),
            format.as_str().into(),
            "--output-format".into(),
            "json".into(),
        ];

        match self.resolution {
            Resolution::TotalPoints(points) => {
                if !(duration > 0.0) {
                    return Err(AppError::Processing(
                        "Cannot derive points per second: audio duration is zero".to_string(),
                    ));
                }
                let pps = points as f64 / duration;
                args.push("--pixels-per-second".into());
                args.push(format!("{:.2}", pps).into());
            }
            Resolution::PointsPerSecond(pps) => {
                args.push("--pixels-per-second".into());
                args.push(pps.to_string().into());
            }
            Resolution::Zoom(zoom) => {
                args.push("--zoom".into());
                args.push(zoom.to_string().into());
            }
            Resolution::Default => {}
        }

        if let Some(bits) = self.bits {
            args.push("--bits".into());
            args.push(bits.to_string().into());
        }

        if self.split_channels {
            args.push("--split-channels".into());
        }

        if let Some(scale) = self.amplitude_scale.filter(|scale| *scale > 0.0) {
            args.push("--amplitude-scale".into());
            args.push(format!("{:.2}", scale).into());
        }

        Ok(args)
    }
}

/// Stand-in `audiowaveform` executables for tests.
#[cfg(all(test, unix))]
pub mod testing {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Canned tool output shaped like audiowaveform's JSON format.
    pub const SAMPLE_OUTPUT: &str = r#"{"version":2,"channels":1,"sample_rate":8000,"samples_per_pixel":800,"bits":8,"length":2,"data":[-3,4,-2,2]}"#;

    /// Write an executable shell script named `audiowaveform` into `dir`.
    pub fn write_tool(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("audiowaveform");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A tool that records its arguments (one per line) in `args.txt` and
    /// prints [`SAMPLE_OUTPUT`].
    pub fn recording_tool(dir: &Path) -> PathBuf {
        let args_file = dir.join("args.txt");
        write_tool(
            dir,
            &format!(
                "printf '%s\\n' \"$@\" > '{}'\necho '{}'",
                args_file.display(),
                SAMPLE_OUTPUT
            ),
        )
    }

    /// Arguments captured by [`recording_tool`].
    pub fn recorded_args(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("args.txt"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
