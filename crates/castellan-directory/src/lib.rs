//! # Castellan Directory
//!
//! Identity resolution against a FreeIPA-style LDAP domain.
//!
//! This crate provides the directory half of castellan: a single
//! GSSAPI-authenticated LDAP session with DNS-based autodiscovery of the
//! local domain, kerberos realm, directory servers and base DN, a small
//! filter-composition algebra with injection-safe escaping, and read-only
//! `User`/`Group` principal entities resolved through that session.
//!
//! ## Features
//!
//! - DNS autodiscovery (PTR domain, `_kerberos` TXT realm, `_ldap._tcp` SRV)
//! - STARTTLS upgrade and SASL/GSSAPI bind with the ambient credential
//! - Safe LDAP filter composition (RFC 4515 / RFC 4514 escaping)
//! - Group allow-list restriction on every principal query
//! - Nested group membership intersection
//!
//! ## Example
//!
//! ```ignore
//! use castellan_directory::{DirectoryConfig, DirectoryConnection, FilterTest, User};
//!
//! let config = DirectoryConfig::new().with_realm("EXAMPLE.COM");
//! let directory = DirectoryConnection::connect(config).await?;
//!
//! let allowed = vec!["dav-access".to_string()];
//! if let Some(user) = User::get(&directory, "alice", &[], FilterTest::AllOf, &allowed).await? {
//!     println!("{:?}", user.to_principal());
//! }
//! ```

pub mod config;
pub mod connection;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod filter;
pub mod groups;
pub mod principal;
pub mod schema;
pub mod users;

// Re-exports
pub use config::DirectoryConfig;
pub use connection::DirectoryConnection;
pub use entry::SearchEntryExt;
pub use error::{DirectoryError, DirectoryResult};
pub use filter::{Condition, FilterTest};
pub use groups::Group;
pub use principal::{DirectoryPrincipal, Principal};
pub use users::User;
