//! # Desktop Bridge Implementations
//!
//! Native implementations of the bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest` with rustls and connection pooling;
//!   `execute_with_retry` backs off on 429 and 5xx responses
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use provider_google_drive::GoogleDriveConnector;
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let drive = GoogleDriveConnector::new(http, access_token);
//! ```

mod http;

pub use http::ReqwestHttpClient;
