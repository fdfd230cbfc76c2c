//! Classification of the `audio_url` request field.
//!
//! A request either embeds the audio as a base64 `data:` URI or points at an
//! `http(s)` URL. Classification is cheap and happens during validation; the
//! expensive part (base64 decoding or downloading) is left to acquisition.

use crate::audio::AudioFormat;
use crate::error::{AppError, AppResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const PRIVATE_URL_MESSAGE: &str = "Local/private URLs not allowed";

/// Where the audio for a request comes from.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Base64 payload taken from a `data:` URI, not yet decoded
    Inline { format: AudioFormat, encoded: String },
    /// Remote file whose host passed the literal address check
    Remote { format: AudioFormat, url: Url },
}

impl AudioSource {
    /// Parse and vet the raw `audio_url` value.
    ///
    /// `allow_private_hosts` disables the address check for deployments that
    /// fetch from internal storage.
    pub fn parse(raw: &str, allow_private_hosts: bool) -> AppResult<Self> {
        if raw.starts_with("data:") {
            Self::parse_data_uri(raw)
        } else {
            Self::parse_remote(raw, allow_private_hosts)
        }
    }

    pub fn format(&self) -> AudioFormat {
        match self {
            AudioSource::Inline { format, .. } | AudioSource::Remote { format, .. } => *format,
        }
    }

    /// Short description for log records; never includes inline payloads.
    pub fn describe(&self) -> String {
        match self {
            AudioSource::Inline { format, encoded } => {
                format!("inline {} ({} base64 chars)", format, encoded.len())
            }
            AudioSource::Remote { url, .. } => url.to_string(),
        }
    }

    fn parse_data_uri(raw: &str) -> AppResult<Self> {
        let (header, payload) = raw
            .split_once(',')
            .ok_or_else(|| AppError::BadRequest("Invalid data URI format".to_string()))?;

        let format = AudioFormat::from_mime_header(header).ok_or_else(|| {
            AppError::UnsupportedMediaType(
                "Unsupported media type in data URI. Please use 'audio/wav' or 'audio/mpeg'."
                    .to_string(),
            )
        })?;

        Ok(AudioSource::Inline {
            format,
            encoded: payload.to_string(),
        })
    }

    fn parse_remote(raw: &str, allow_private_hosts: bool) -> AppResult<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| AppError::BadRequest(format!("Invalid audio URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::BadRequest(format!(
                "Unsupported URL scheme '{}'. Please use http or https.",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| AppError::BadRequest("Audio URL has no host".to_string()))?;

        // Address vetting comes before the extension check so that private
        // hosts are refused whatever file they point at.
        if !allow_private_hosts && is_disallowed_host(host) {
            return Err(AppError::BadRequest(PRIVATE_URL_MESSAGE.to_string()));
        }

        let format = AudioFormat::from_path(url.path()).ok_or_else(|| {
            AppError::UnsupportedMediaType(
                "Unsupported audio format from URL. Please use a URL ending in '.wav' or '.mp3'."
                    .to_string(),
            )
        })?;

        Ok(AudioSource::Remote { format, url })
    }
}

/// Decode a data URI payload, truncating the result to `max_bytes`.
pub fn decode_inline(encoded: &str, max_bytes: u64) -> AppResult<Vec<u8>> {
    let mut decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::BadRequest(format!("Failed to decode base64 audio data: {}", e)))?;

    let limit = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    if decoded.len() > limit {
        tracing::warn!(
            decoded_bytes = decoded.len(),
            limit,
            "Inline audio exceeds byte ceiling, truncating"
        );
        decoded.truncate(limit);
    }
    Ok(decoded)
}

/// The error returned when a host or resolved address is refused.
pub fn private_address_error() -> AppError {
    AppError::BadRequest(PRIVATE_URL_MESSAGE.to_string())
}

/// Whether a URL host (name or IP literal) must not be fetched.
///
/// Names other than `localhost` pass here; their resolved addresses are
/// checked again before connecting.
pub fn is_disallowed_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    let literal = host.trim_start_matches('[').trim_end_matches(']');
    match literal.parse::<IpAddr>() {
        Ok(ip) => is_disallowed_ip(ip),
        Err(_) => false,
    }
}

/// Loopback, private, link-local, shared, unspecified and multicast ranges.
pub fn is_disallowed_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_disallowed_ipv4(v4),
        IpAddr::V6(v6) => is_disallowed_ipv6(v6),
    }
}

fn is_disallowed_ipv4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        // 0.0.0.0/8 "this network"
        || octets[0] == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
}

fn is_disallowed_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_disallowed_ipv4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
