//! Cinestream - Movie catalogue with session-bound range streaming
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod recommender;
pub mod selector;
pub mod server;
pub mod session;
pub mod streaming;
