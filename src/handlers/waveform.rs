//! # Waveform Metadata Endpoint
//!
//! `POST /waveform-metadata` takes an audio reference, stages the audio on
//! disk and answers with container metadata plus the waveform tool's JSON.
//!
//! ## Request Pipeline:
//! 1. **Validating**: decode the JSON body and build a [`WaveformJob`]
//! 2. **Acquiring**: decode the data URI or download the remote file
//! 3. **Staging**: write the bytes to a request-scoped temporary file
//! 4. **Extracting metadata**: read the WAV/MP3 headers
//! 5. **Generating waveform**: run `audiowaveform` against the staged file
//! 6. **Responding**: `{"metadata": ..., "audiowaveform": ...}`
//!
//! Any stage failing short-circuits to an error response. The staged file is
//! owned by this handler and removed when it goes out of scope, on success and
//! on every error path alike.

use crate::audio::metadata::{self, AudioMetadata};
use crate::audio::source::{self, AudioSource};
use crate::audio::{fetch, staging::StagedAudio};
use crate::config::FetchConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::waveform::{Resolution, WaveformOptions};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Wire format of the request body.
///
/// Numeric fields use `0` (or absence) for "not set", matching the public
/// API; they are signed here only so negative input can be reported clearly.
#[derive(Debug, Default, Deserialize)]
pub struct WaveformRequest {
    pub audio_url: Option<String>,
    pub total_points: Option<i64>,
    pub points_per_second: Option<i64>,
    pub zoom: Option<i64>,
    pub bits: Option<i64>,
    pub split_channels: Option<bool>,
    pub amplitude_scale: Option<f64>,
}

/// A validated request: where the audio is and how to render it.
#[derive(Debug, Clone)]
pub struct WaveformJob {
    pub source: AudioSource,
    pub options: WaveformOptions,
}

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct WaveformResponse {
    pub metadata: AudioMetadata,
    /// Tool output, passed through unmodified
    pub audiowaveform: serde_json::Value,
}

impl WaveformRequest {
    /// Check every field and classify the audio source.
    pub fn into_job(self, allow_private_hosts: bool) -> AppResult<WaveformJob> {
        let audio_url = self
            .audio_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing required 'audio_url' field".to_string()))?;

        let total_points = self.total_points.unwrap_or(0);
        let points_per_second = self.points_per_second.unwrap_or(0);
        let zoom = self.zoom.unwrap_or(0);
        let amplitude_scale = self.amplitude_scale.unwrap_or(0.0);

        if total_points < 0 || points_per_second < 0 || zoom < 0 || amplitude_scale < 0.0 {
            return Err(AppError::BadRequest("Negative values not allowed".to_string()));
        }

        let bits = match self.bits.unwrap_or(0) {
            0 => None,
            8 => Some(8),
            16 => Some(16),
            _ => return Err(AppError::BadRequest("'bits' must be 8 or 16".to_string())),
        };

        let options = WaveformOptions {
            resolution: Resolution::from_request(
                total_points as u64,
                points_per_second as u64,
                zoom as u64,
            ),
            bits,
            split_channels: self.split_channels.unwrap_or(false),
            amplitude_scale: (amplitude_scale > 0.0).then_some(amplitude_scale),
        };

        let source = AudioSource::parse(&audio_url, allow_private_hosts)?;

        Ok(WaveformJob { source, options })
    }
}

/// `POST /waveform-metadata`
pub async fn waveform_metadata(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    match process(&state, &body).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(err) => {
            if matches!(err, AppError::Processing(_)) {
                error!(kind = err.kind(), error = %err, "Waveform request failed");
            } else {
                warn!(kind = err.kind(), error = %err, "Waveform request rejected");
            }
            Err(err)
        }
    }
}

/// Anything other than POST on the waveform resource.
pub async fn method_not_allowed() -> Result<HttpResponse, AppError> {
    Err(AppError::MethodNotAllowed)
}

async fn process(state: &AppState, body: &[u8]) -> AppResult<WaveformResponse> {
    let config = &state.config;

    let request: WaveformRequest = serde_json::from_slice(body)?;
    let job = request.into_job(config.fetch.allow_private_hosts)?;
    let format = job.source.format();
    debug!(source = %job.source.describe(), format = %format, "Request validated");

    let bytes = acquire(job.source, &config.fetch).await?;
    debug!(bytes = bytes.len(), "Audio acquired");

    let staging_dir = config.staging.dir();
    let staged = web::block(move || StagedAudio::write(&bytes, staging_dir.as_deref())).await??;
    debug!(path = %staged.path().display(), size = staged.size(), "Audio staged");

    let path = staged.to_path_buf();
    let metadata = web::block(move || metadata::extract(&path, format)).await??;

    let args = job
        .options
        .command_args(staged.path(), format, metadata.duration)?;
    let audiowaveform = state.generator.generate(args).await?;
    debug!("Waveform generated");

    // Keeps the staged file alive until the tool has finished with it.
    drop(staged);

    Ok(WaveformResponse {
        metadata,
        audiowaveform,
    })
}

async fn acquire(audio: AudioSource, config: &FetchConfig) -> AppResult<Vec<u8>> {
    match audio {
        AudioSource::Inline { encoded, .. } => {
            let max_bytes = config.max_audio_bytes;
            web::block(move || source::decode_inline(&encoded, max_bytes)).await?
        }
        AudioSource::Remote { url, .. } => fetch::download(&url, config).await,
    }
}
