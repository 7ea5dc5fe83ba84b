//! Cinestream-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across cinestream:
//!
//! - **Typed IDs**: Type-safe wrappers around SQLite row ids for movies, users, etc.
//! - **Path Utilities**: Upload layout, timestamped file naming, type detection
//! - **Error Handling**: The error taxonomy shared by storage and HTTP layers
//!
//! # Examples
//!
//! ```
//! use cinestream_common::{Error, MovieId, Result};
//! use cinestream_common::paths::is_video_file;
//! use std::path::Path;
//!
//! let movie_id = MovieId::from(42);
//! assert_eq!(movie_id.get(), 42);
//!
//! assert!(is_video_file(Path::new("movie.mp4")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("movie", 42))
//! }
//! assert_eq!(example().unwrap_err().http_status(), 404);
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::*;
