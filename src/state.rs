//! # Application State
//!
//! Shared, read-only state handed to every request handler through
//! `web::Data`.
//!
//! ## Sharing Model:
//! - Each actix worker gets its own clone of [`AppState`]
//! - The configuration sits behind an `Arc`, so clones are cheap
//! - Nothing here changes after startup, so no locking is needed; requests
//!   never share mutable state

use crate::config::AppConfig;
use crate::waveform::WaveformGenerator;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Validated configuration loaded at startup
    pub config: Arc<AppConfig>,

    /// Runner for the external waveform tool, built from `config.waveform`
    pub generator: WaveformGenerator,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let generator = WaveformGenerator::new(&config.waveform);
        Self {
            config: Arc::new(config),
            generator,
        }
    }
}
