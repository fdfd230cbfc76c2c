//! # Remote Audio Download
//!
//! Fetches audio referenced by an `http(s)` URL with a deadline and a byte
//! ceiling.
//!
//! ## Address Vetting:
//! - IP-literal hosts were checked when the URL was parsed; redirects to a
//!   private literal are refused by the redirect policy
//! - Every hostname the client looks up, on the first request and on each
//!   redirect hop, goes through [`PublicResolver`], which refuses the whole
//!   answer if any address is loopback, private or otherwise internal
//!
//! Both checks are skipped when `fetch.allow_private_hosts` is set.

use crate::audio::source::{is_disallowed_host, is_disallowed_ip, private_address_error};
use crate::config::FetchConfig;
use crate::error::{AppError, AppResult};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::{redirect, Client, Url};
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Download `url` into memory, stopping at `config.max_audio_bytes`.
pub async fn download(url: &Url, config: &FetchConfig) -> AppResult<Vec<u8>> {
    let client = build_client(config)?;

    let mut response = client.get(url.clone()).send().await.map_err(describe_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::FetchFailed(format!("upstream responded with {}", status)));
    }

    let limit = usize::try_from(config.max_audio_bytes).unwrap_or(usize::MAX);
    let expected = response
        .content_length()
        .map(|len| (len as usize).min(limit))
        .unwrap_or(0);
    let mut body = Vec::with_capacity(expected);

    while let Some(chunk) = response.chunk().await.map_err(describe_reqwest_error)? {
        if append_capped(&mut body, &chunk, limit) {
            warn!(url = %url, limit, "Remote audio exceeds byte ceiling, truncating");
            break;
        }
    }

    debug!(url = %url, bytes = body.len(), "Remote audio downloaded");
    Ok(body)
}

/// Append `chunk` to `buf` without letting it grow past `limit`.
///
/// Returns `true` once the ceiling has been reached and reading should stop.
pub fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let remaining = limit.saturating_sub(buf.len());
    if chunk.len() > remaining {
        buf.extend_from_slice(&chunk[..remaining]);
        true
    } else {
        buf.extend_from_slice(chunk);
        false
    }
}

/// DNS resolver that only hands out public addresses.
///
/// Installed on the download client, so it sees the original host and every
/// host a redirect points at. The connection is made to exactly the
/// addresses it vetted.
#[derive(Debug, Clone)]
pub struct PublicResolver {
    timeout: Duration,
}

impl PublicResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        let timeout = self.timeout;
        Box::pin(async move {
            match resolve_public(&host, timeout).await {
                Ok(addrs) => Ok(Box::new(addrs.into_iter()) as Addrs),
                Err(e) => Err(Box::new(e) as BoxError),
            }
        })
    }
}

fn build_client(config: &FetchConfig) -> AppResult<Client> {
    let allow_private = config.allow_private_hosts;
    let max_redirects = config.max_redirects;

    let policy = redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error(AppError::FetchFailed(format!(
                "too many redirects (limit {})",
                max_redirects
            )))
        } else if !allow_private && attempt.url().host_str().map_or(true, is_disallowed_host) {
            attempt.error(private_address_error())
        } else {
            attempt.follow()
        }
    });

    let mut builder = Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .redirect(policy)
        .user_agent(concat!("waveform-metadata-api/", env!("CARGO_PKG_VERSION")));

    if !allow_private {
        builder = builder.dns_resolver(Arc::new(PublicResolver::new(config.connect_timeout())));
    }

    builder
        .build()
        .map_err(|e| AppError::Processing(format!("Failed to build HTTP client: {}", e)))
}

/// Resolve `host` and refuse it if any address is loopback or private.
///
/// Port 0 is returned; the client substitutes the URL's port.
async fn resolve_public(host: &str, timeout: Duration) -> AppResult<Vec<SocketAddr>> {
    let lookup = tokio::net::lookup_host((host, 0));
    let addrs: Vec<SocketAddr> = tokio::time::timeout(timeout, lookup)
        .await
        .map_err(|_| AppError::FetchFailed(format!("timed out resolving host '{}'", host)))?
        .map_err(|e| AppError::FetchFailed(format!("could not resolve host '{}': {}", host, e)))?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::FetchFailed(format!("host '{}' has no addresses", host)));
    }

    if let Some(addr) = addrs.iter().find(|addr| is_disallowed_ip(addr.ip())) {
        warn!(host, address = %addr.ip(), "Host resolves to a private address");
        return Err(private_address_error());
    }

    Ok(addrs)
}

/// Map a client error to the response the caller sees.
///
/// Refusals raised by the resolver or the redirect policy travel inside
/// reqwest's error chain; they are surfaced as-is so the caller gets the
/// actual reason instead of reqwest's generic wrapper text.
fn describe_reqwest_error(err: reqwest::Error) -> AppError {
    let mut root: Option<&(dyn StdError + 'static)> = None;
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(app_error) = cause.downcast_ref::<AppError>() {
            return app_error.clone();
        }
        root = Some(cause);
        source = cause.source();
    }

    if err.is_timeout() {
        return AppError::FetchFailed("request timed out".to_string());
    }

    let detail = match root {
        Some(cause) => format!("{} ({})", err, cause),
        None => err.to_string(),
    };
    if err.is_connect() {
        AppError::FetchFailed(format!("connection failed: {}", detail))
    } else {
        AppError::FetchFailed(detail)
    }
}
