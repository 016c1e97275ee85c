//! # Service Portal Guest Sessions
//!
//! Guest identities for the service portal, signed in by document number
//! with an optional one-time code, holding a rotating bearer token.
//!
//! ## Features
//!
//! - **Registration and sign-in** by document number
//! - **One-time codes** over SMS or `WhatsApp`, hashed at rest, single use,
//!   with expiry, resend cooldown, hourly limits and lockout
//! - **Bearer tokens**: 256-bit, stored as SHA-256, rotated on every sign-in
//!   and rejected once stale
//!
//! ## Architecture
//!
//! Sessions are implemented as a reducer with effects, executed by a `Store`:
//!
//! ```text
//! Action → Reducer → (State, Effects) → Effect Execution → More Actions
//! ```
//!
//! ## Example: sign-in with a code
//!
//! ```rust,ignore
//! use service_portal_auth::*;
//!
//! let service = GuestSessionService::new(environment);
//!
//! // 1. A code is sent to the phone on file
//! let SignInOutcome::RequiresOtp(delivery) = service.lookup_by_document("10203040").await? else {
//!     unreachable!("codes are enabled");
//! };
//!
//! // 2. The guest submits it and receives a token
//! let session = service.verify_otp("10203040", "482913").await?;
//!
//! // 3. Later requests present the token
//! let identity = service.validate_token(&session.token).await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod crypto;
pub mod environment;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;
pub mod providers;
pub mod reducers;
pub mod service;
pub mod state;
pub mod stores;
pub mod validation;

// Re-export main types for convenience
pub use actions::{GuestAction, GuestSession, OtpDelivery};
pub use config::{GuestAuthConfig, OtpChannel, OtpSettings, PublicOtpSettings};
pub use environment::GuestEnvironment;
pub use error::{GuestError, Result};
pub use reducers::GuestSessionReducer;
pub use service::{GuestSessionService, GuestStore, InMemoryGuestService, SignInOutcome};
pub use state::{ContactUpdate, GuestId, GuestIdentity, GuestState, RegistrationForm};
pub use stores::{InMemoryIdentityRepository, InMemoryPendingOtpStore, InMemoryRateLimiter};
