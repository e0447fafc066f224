//! # Google Photos Provider
//!
//! Implements the `MediaLibrary` trait for the Google Photos Library API v1.
//!
//! ## Overview
//!
//! - Listing every media item of the library, page by page
//! - Original-quality downloads through a freshly fetched `baseUrl`
//!   (`=d` for photos, `=dv` for videos)
//! - Two-step uploads: raw bytes for an upload token, then
//!   `mediaItems:batchCreate`
//!
//! The library reports no byte sizes; items carry dimensions, camera and
//! frame-rate details instead.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GooglePhotosConnector;
pub use error::{GooglePhotosError, Result};
