//! Authorization gate for directory-backed principals.
//!
//! Converts an already-authenticated identity assertion (`name` or
//! `name@REALM`) into an authorization decision by resolving the user
//! against the directory under a group allow-list. This crate performs
//! authorization only; credential verification happened upstream on the
//! delegated channel.
//!
//! # Example
//!
//! ```ignore
//! use castellan_auth::{AuthorizationBackend, GssapiAuthBackend};
//! use castellan_directory::{DirectoryConfig, DirectoryConnection};
//!
//! let directory = DirectoryConnection::connect(DirectoryConfig::new()).await?;
//! let backend = GssapiAuthBackend::new(directory, vec!["dav-access".to_string()]);
//!
//! match backend.check("alice@EXAMPLE.COM").await {
//!     AuthOutcome::Granted { principal } => println!("welcome {principal}"),
//!     AuthOutcome::Denied { reason } => println!("denied: {reason}"),
//! }
//! ```

mod backend;

// Re-export public API
pub use backend::{AuthOutcome, AuthorizationBackend, GssapiAuthBackend};
