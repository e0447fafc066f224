//! # Google Drive Provider
//!
//! Implements the `FolderStore` trait for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Folder listing (files first, then sub-folders depth-first when recursive)
//! - Sub-folder listing for folder pickers
//! - Whole-file downloads to a local path
//! - Multipart uploads with the content type chosen by file extension
//! - Exponential backoff on rate limiting and server errors
//!
//! Access tokens are obtained by the host; this crate only sends them.

pub mod connector;
pub mod error;
pub mod mime;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
pub use mime::mime_for_name;
