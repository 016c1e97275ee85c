//! Request middleware.
//!
//! - **Correlation id**: taken from `X-Correlation-ID` or generated, stored
//!   in request extensions, attached to a tracing span and echoed in the
//!   response header
//! - **Honeypot**: rejection of bodies whose decoy field was filled in
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use service_portal_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/api/otp/settings", get(otp_settings))
//!     .layer(correlation_id_layer());
//! ```

use crate::error::AppError;
use crate::extractors::{ClientIp, UserAgent};
use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        // guest_id is filled in by the AuthenticatedGuest extractor.
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri().path(),
            guest_id = tracing::field::Empty,
        );

        let fut = self.inner.call(req).instrument(span);

        Box::pin(async move {
            let mut response = fut.await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Read the correlation id stored by [`correlation_id_layer`].
pub trait CorrelationIdExt {
    /// The correlation id, or `None` if the middleware is not installed.
    fn correlation_id(&self) -> Option<Uuid>;
}

impl CorrelationIdExt for Request {
    fn correlation_id(&self) -> Option<Uuid> {
        self.extensions().get::<Uuid>().copied()
    }
}

/// Reject a request whose honeypot field is non-empty.
///
/// Real users never see the field, so any value marks automated
/// submission. The caller gets the same generic 400 for every case.
///
/// # Errors
///
/// Returns a 400 "Invalid request" when `honeypot` holds anything but
/// whitespace.
pub fn reject_honeypot(
    honeypot: Option<&str>,
    route: &'static str,
    client_ip: &ClientIp,
    user_agent: &UserAgent,
) -> Result<(), AppError> {
    match honeypot.map(str::trim) {
        Some(value) if !value.is_empty() => {
            tracing::warn!(
                route,
                client_ip = %client_ip.0,
                user_agent = %user_agent.0,
                "Honeypot field filled, rejecting request"
            );
            metrics::counter!("guest.honeypot.rejected.total", "route" => route).increment(1);
            Err(AppError::bad_request("Invalid request"))
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use std::net::{IpAddr, Ipv4Addr};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/test",
                get(|req: Request<Body>| async move {
                    req.correlation_id().map(|id| id.to_string()).unwrap_or_default()
                }),
            )
            .layer(correlation_id_layer())
    }

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        let correlation_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present");
        assert!(Uuid::parse_str(correlation_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_and_visible_to_handler() {
        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CORRELATION_ID_HEADER).unwrap(),
            request_uuid.to_string().as_str()
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, request_uuid.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_uuid_generates_new() {
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let uuid_str = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(Uuid::parse_str(uuid_str).is_ok());
    }

    #[test]
    fn test_honeypot() {
        let ip = ClientIp(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let agent = UserAgent("bot".into());
        assert!(reject_honeypot(None, "register", &ip, &agent).is_ok());
        assert!(reject_honeypot(Some("  "), "register", &ip, &agent).is_ok());

        let err = reject_honeypot(Some("http://spam"), "register", &ip, &agent).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Invalid request");
    }
}
