//! # Container Metadata Extraction
//!
//! Reads duration, sample rate, channel count and bitrate from a staged
//! audio file without decoding any audio.
//!
//! ## Format Handling:
//! - **WAV**: header fields from the `fmt ` chunk, frame count from the
//!   length the `data` chunk declares
//! - **MP3**: frame-by-frame demux; the first frame supplies the stream
//!   parameters and the per-frame durations are summed
//!
//! Both paths do blocking file I/O and are run on actix's blocking pool.

use crate::audio::AudioFormat;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Container-level facts about the audio, serialised into the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioMetadata {
    /// Length in seconds
    pub duration: f64,
    /// Samples per second per channel
    pub sample_rate: u32,
    pub channels: u16,
    /// Average bits per second
    pub bitrate: u64,
    /// Size of the staged file in bytes
    pub file_size: u64,
}

/// Inspect the file at `path` according to its container format.
pub fn extract(path: &Path, format: AudioFormat) -> AppResult<AudioMetadata> {
    let file = File::open(path)
        .map_err(|e| AppError::Processing(format!("Failed to open audio file: {}", e)))?;
    let file_size = file
        .metadata()
        .map_err(|e| AppError::Processing(format!("Failed to stat audio file: {}", e)))?
        .len();

    let metadata = match format {
        AudioFormat::Wav => wav_metadata(file, file_size),
        AudioFormat::Mp3 => mp3_metadata(file, file_size),
    }
    .map_err(|e| match e {
        AppError::Processing(msg) => {
            AppError::Processing(format!("Failed to extract metadata: {}", msg))
        }
        other => other,
    })?;

    debug!(
        format = %format,
        duration = metadata.duration,
        sample_rate = metadata.sample_rate,
        channels = metadata.channels,
        bitrate = metadata.bitrate,
        file_size = metadata.file_size,
        "Extracted audio metadata"
    );
    Ok(metadata)
}

/// Header-only WAV inspection.
///
/// Duration comes from the length the `data` chunk declares, not from the
/// bytes actually present, so a file cut short at the byte ceiling still
/// reports its full length. `WAVE_FORMAT_EXTENSIBLE` headers and every PCM
/// width `hound` understands are accepted; no samples are read.
fn wav_metadata(file: File, file_size: u64) -> AppResult<AudioMetadata> {
    let reader = hound::WavReader::new(BufReader::new(file))
        .map_err(|e| AppError::Processing(format!("invalid wav file: {}", e)))?;
    let spec = reader.spec();

    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(AppError::Processing(
            "invalid wav file: header declares zero sample rate or channels".to_string(),
        ));
    }

    let bytes_per_sample = u64::from(spec.bits_per_sample).div_ceil(8);
    let bytes_per_second = u64::from(spec.sample_rate) * u64::from(spec.channels) * bytes_per_sample;

    Ok(AudioMetadata {
        duration: f64::from(reader.duration()) / f64::from(spec.sample_rate),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bitrate: bytes_per_second * 8,
        file_size,
    })
}

fn mp3_metadata(file: File, file_size: u64) -> AppResult<AudioMetadata> {
    let stream = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let detected = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AppError::Processing(format!("invalid mp3 file: {}", e)))?;
    let mut reader = detected.format;

    let track = reader
        .default_track()
        .ok_or_else(|| AppError::Processing("invalid mp3 file: no audio track".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| AppError::Processing("invalid mp3 file: missing sample rate".to_string()))?;
    // Single-channel mode is mono; stereo, joint stereo and dual channel all count as two.
    let channels = match params.channels {
        Some(layout) if layout.count() == 1 => 1,
        _ => 2,
    };

    let mut frames: u64 = 0;
    let mut total_dur: u64 = 0;
    loop {
        match reader.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                total_dur += packet.dur();
                frames += 1;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) if frames > 0 => {
                // Trailing tags, padding or a damaged tail after valid audio.
                debug!(frames, error = %e, "Stopping MP3 frame scan");
                break;
            }
            Err(e) => {
                return Err(AppError::Processing(format!("invalid mp3 file: {}", e)));
            }
        }
    }

    if frames == 0 {
        return Err(AppError::Processing(
            "invalid mp3 file: no MPEG audio frames found".to_string(),
        ));
    }

    let duration = match params.time_base {
        Some(time_base) => {
            let time = time_base.calc_time(total_dur);
            time.seconds as f64 + time.frac
        }
        None => total_dur as f64 / sample_rate as f64,
    };

    Ok(AudioMetadata {
        duration,
        sample_rate,
        channels,
        bitrate: average_bitrate(file_size, duration),
        file_size,
    })
}

/// Whole-file average bitrate; zero when the duration is unknown or zero.
pub fn average_bitrate(file_size: u64, duration: f64) -> u64 {
    if duration > 0.0 {
        ((file_size * 8) as f64 / duration).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fixtures::{
        mp3_bytes, riff_wav, wav_bytes, RiffFormat, MP3_FRAME_LEN, MP3_FRAME_SAMPLES,
    };
    use crate::audio::staging::StagedAudio;

    fn stage(bytes: &[u8]) -> StagedAudio {
        StagedAudio::write(bytes, None).unwrap()
    }

    #[test]
    fn test_wav_stereo_header() {
        let bytes = wav_bytes(2, 44_100, 2);
        let staged = stage(&bytes);

        let metadata = extract(staged.path(), AudioFormat::Wav).unwrap();
        assert_eq!(metadata.sample_rate, 44_100);
        assert_eq!(metadata.channels, 2);
        assert!((metadata.duration - 2.0).abs() < 1e-9);
        assert_eq!(metadata.bitrate, 44_100 * 2 * 16);
        assert_eq!(metadata.file_size, bytes.len() as u64);
    }

    #[test]
    fn test_wav_mono_header() {
        let staged = stage(&wav_bytes(1, 8_000, 10));

        let metadata = extract(staged.path(), AudioFormat::Wav).unwrap();
        assert_eq!(metadata.sample_rate, 8_000);
        assert_eq!(metadata.channels, 1);
        assert!((metadata.duration - 10.0).abs() < 1e-9);
        assert_eq!(metadata.bitrate, 128_000);
    }

    #[test]
    fn test_wav_extensible_header() {
        let bytes = riff_wav(RiffFormat::Extensible, 2, 48_000, 16, 48_000 * 4, 48_000 * 4);
        let staged = stage(&bytes);

        let metadata = extract(staged.path(), AudioFormat::Wav).unwrap();
        assert_eq!(metadata.sample_rate, 48_000);
        assert_eq!(metadata.channels, 2);
        assert!((metadata.duration - 1.0).abs() < 1e-9);
        assert_eq!(metadata.bitrate, 48_000 * 2 * 16);
    }

    #[test]
    fn test_wav_32_bit_pcm() {
        let bytes = riff_wav(RiffFormat::Pcm, 1, 16_000, 32, 16_000 * 4, 16_000 * 4);
        let staged = stage(&bytes);

        let metadata = extract(staged.path(), AudioFormat::Wav).unwrap();
        assert_eq!(metadata.channels, 1);
        assert!((metadata.duration - 1.0).abs() < 1e-9);
        assert_eq!(metadata.bitrate, 16_000 * 32);
    }

    #[test]
    fn test_wav_truncated_data_uses_declared_length() {
        // Header declares two seconds, only one second of samples follows.
        let bytes = riff_wav(RiffFormat::Pcm, 2, 8_000, 16, 8_000 * 4 * 2, 8_000 * 4);
        let staged = stage(&bytes);

        let metadata = extract(staged.path(), AudioFormat::Wav).unwrap();
        assert_eq!(metadata.sample_rate, 8_000);
        assert!((metadata.duration - 2.0).abs() < 1e-9);
        assert_eq!(metadata.file_size, bytes.len() as u64);
    }

    #[test]
    fn test_corrupt_wav_is_processing_error() {
        let staged = stage(b"this is not a riff file at all");
        match extract(staged.path(), AudioFormat::Wav) {
            Err(AppError::Processing(msg)) => assert!(msg.starts_with("Failed to extract metadata")),
            other => panic!("expected processing error, got {:?}", other),
        }
    }

    #[test]
    fn test_mp3_stereo_frames() {
        let bytes = mp3_bytes(40, false);
        let staged = stage(&bytes);

        let metadata = extract(staged.path(), AudioFormat::Mp3).unwrap();
        let expected = (40 * MP3_FRAME_SAMPLES) as f64 / 44_100.0;
        assert_eq!(metadata.sample_rate, 44_100);
        assert_eq!(metadata.channels, 2);
        assert!((metadata.duration - expected).abs() < 1e-6, "{}", metadata.duration);
        assert_eq!(metadata.file_size, (40 * MP3_FRAME_LEN) as u64);
        assert_eq!(metadata.bitrate, average_bitrate(metadata.file_size, metadata.duration));
    }

    #[test]
    fn test_mp3_mono_frames() {
        let staged = stage(&mp3_bytes(20, true));

        let metadata = extract(staged.path(), AudioFormat::Mp3).unwrap();
        assert_eq!(metadata.channels, 1);
    }

    #[test]
    fn test_mp3_trailing_garbage_ends_scan() {
        let mut bytes = mp3_bytes(30, false);
        bytes.extend_from_slice(&[0xAB; 300]);
        let staged = stage(&bytes);

        let metadata = extract(staged.path(), AudioFormat::Mp3).unwrap();
        let expected = (30 * MP3_FRAME_SAMPLES) as f64 / 44_100.0;
        assert!((metadata.duration - expected).abs() < 1e-6, "{}", metadata.duration);
    }

    #[test]
    fn test_mp3_without_frames_is_processing_error() {
        let staged = stage(&[0x11; 4096]);
        assert!(matches!(extract(staged.path(), AudioFormat::Mp3), Err(AppError::Processing(_))));
    }

    #[test]
    fn test_missing_file_is_processing_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.tmp");
        assert!(matches!(extract(&missing, AudioFormat::Wav), Err(AppError::Processing(_))));
    }

    #[test]
    fn test_average_bitrate() {
        assert_eq!(average_bitrate(1_000_000, 8.0), 1_000_000);
        assert_eq!(average_bitrate(1_000, 0.0), 0);
        assert_eq!(average_bitrate(3, 0.5), 48);
    }
}
