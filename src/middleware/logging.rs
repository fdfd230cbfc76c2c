use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Response header carrying the request's correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assigns every request a UUID, runs the rest of the chain inside a
/// `request` span carrying it, and echoes it back in `x-request-id`.
pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware { service }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let method = req.method().to_string();
        let uri = req.uri().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        let span = info_span!("request", request_id = %request_id);

        let fut = span.in_scope(|| {
            info!(
                method = %method,
                uri = %uri,
                remote_addr = %remote_addr,
                "Request started"
            );
            self.service.call(req)
        });

        Box::pin(
            async move {
                let result = fut.await;
                let duration = start_time.elapsed();

                match result {
                    Ok(mut response) => {
                        let status = response.status();
                        if status.is_server_error() {
                            error!(
                                method = %method,
                                uri = %uri,
                                status = %status.as_u16(),
                                duration_ms = %duration.as_millis(),
                                "Request completed with server error"
                            );
                        } else if status.is_client_error() {
                            warn!(
                                method = %method,
                                uri = %uri,
                                status = %status.as_u16(),
                                duration_ms = %duration.as_millis(),
                                "Request rejected"
                            );
                        } else {
                            info!(
                                method = %method,
                                uri = %uri,
                                status = %status.as_u16(),
                                duration_ms = %duration.as_millis(),
                                "Request completed"
                            );
                        }

                        if let Ok(value) = HeaderValue::from_str(&request_id) {
                            response
                                .headers_mut()
                                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                        }
                        Ok(response)
                    }
                    Err(err) => {
                        error!(
                            method = %method,
                            uri = %uri,
                            remote_addr = %remote_addr,
                            duration_ms = %duration.as_millis(),
                            error = %err,
                            "Request failed"
                        );
                        Err(err)
                    }
                }
            }
            .instrument(span),
        )
    }
}
