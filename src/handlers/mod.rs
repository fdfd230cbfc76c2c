//! # HTTP Routes
//!
//! - `POST /waveform-metadata`: metadata and waveform data for one audio file
//! - `GET /health`: liveness check (any method)

pub mod waveform;

pub use waveform::{method_not_allowed, waveform_metadata};

use crate::health;
use actix_web::web;

/// Register every route on the application.
///
/// `max_request_bytes` bounds the waveform request body, which has to be
/// large enough for a base64 data URI at the audio byte ceiling.
pub fn configure_routes(cfg: &mut web::ServiceConfig, max_request_bytes: usize) {
    cfg.service(
        web::resource("/waveform-metadata")
            .app_data(web::PayloadConfig::new(max_request_bytes))
            .route(web::post().to(waveform_metadata))
            .default_service(web::to(method_not_allowed)),
    )
    .service(web::resource("/health").to(health::health_check));
}
