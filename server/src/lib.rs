//! Service portal server.
//!
//! Wires the booking engine and guest sessions behind the HTTP surface:
//!
//! 1. [`config::Config`] reads `PORTAL_*` variables
//! 2. [`app::load_catalog`] reads the plans and resources
//! 3. [`app::build`] picks the OTP sender and meeting provider, starts both
//!    stores and returns the router state plus the draft reaper
//!
//! The binary in `main.rs` adds tracing, metrics, signals and shutdown.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
