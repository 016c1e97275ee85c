//! Axum HTTP surface for the service portal.
//!
//! Handlers are a thin imperative shell over the booking and guest session
//! stores:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, headers
//! │  - Token → identity (every request)     │  ← Honeypot, IP limits
//! │  - Error → status code                  │  ← Tracing, CORS
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Booking reducer                      │  ← Capacity invariant
//! │  - Guest session reducer                │  ← Codes and tokens
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **Correlate**: the middleware assigns a correlation id and span
//! 2. **Authenticate**: `AuthenticatedGuest` resolves `X-Guest-Token`
//! 3. **Guard**: honeypot check and per-IP rate limit on public writes
//! 4. **Dispatch** through the service facade and wait for the reply
//! 5. **Map** the domain result or error to a JSON response
//!
//! # Example
//!
//! ```ignore
//! use service_portal_web::{AppState, router};
//!
//! let state = AppState::new(booking_service, guest_service);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{
    AuthenticatedGuest, ClientIp, CorrelationId, GUEST_TOKEN_HEADER, GuestToken, UserAgent,
};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};
pub use router::{api_router, router};
pub use state::{AppState, RateLimits};
