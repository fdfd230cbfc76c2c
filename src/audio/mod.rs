//! # Audio Input Module
//!
//! Everything between the validated request and the waveform tool:
//! locating the audio, bringing its bytes into the process, staging them on
//! disk and reading container metadata.
//!
//! ## Key Components:
//! - **source**: Parses `audio_url` into a data URI or a vetted remote URL
//! - **fetch**: Downloads remote audio with a deadline and a byte ceiling
//! - **staging**: Request-scoped temporary file, removed on drop
//! - **metadata**: WAV and MP3 header inspection
//!
//! ## Supported Containers:
//! - **WAV**: RIFF/WAVE, PCM or IEEE float
//! - **MP3**: MPEG-1/2/2.5 Layer III bitstreams

pub mod fetch;
#[cfg(test)]
pub mod fixtures;
pub mod metadata;
pub mod source;
pub mod staging;

use std::fmt;

/// Container formats the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Value passed to `audiowaveform --input-format`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    /// Detects the format from a data URI header such as `data:audio/wav;base64`.
    pub fn from_mime_header(header: &str) -> Option<Self> {
        if header.contains("audio/wav") {
            Some(AudioFormat::Wav)
        } else if header.contains("audio/mpeg") {
            Some(AudioFormat::Mp3)
        } else {
            None
        }
    }

    /// Detects the format from the extension of a URL path.
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".wav") {
            Some(AudioFormat::Wav)
        } else if lower.ends_with(".mp3") {
            Some(AudioFormat::Mp3)
        } else {
            None
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_mime_header() {
        assert_eq!(AudioFormat::from_mime_header("data:audio/wav;base64"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_mime_header("data:audio/mpeg;base64"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_mime_header("data:audio/ogg;base64"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(AudioFormat::from_path("/media/Take1.WAV"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_path("/podcast/episode.mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_path("/podcast/episode.flac"), None);
        assert_eq!(AudioFormat::from_path("/podcast/"), None);
    }
}
