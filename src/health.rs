//! # Health Check
//!
//! Fixed-body endpoint reporting that the HTTP server is up and routing.
//! It touches no shared state and never fails.

use actix_web::HttpResponse;
use serde_json::json;

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "waveform-metadata-api";

/// Liveness check for load balancers and orchestrators.
///
/// ## Response Format:
/// ```json
/// {
///   "status": "ok",
///   "service": "waveform-metadata-api"
/// }
/// ```
///
/// Answers any method with 200 and this fixed body. It does not check that
/// the waveform tool is installed; a missing binary surfaces as a 500 on the
/// first waveform request.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}
