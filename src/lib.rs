//! orex - an async OCI Distribution client core.
//!
//! orex talks the OCI Distribution protocol directly: parsing references,
//! verifying content-addressed blobs and manifests, enumerating referrers,
//! and paginating tag and catalog listings. It does not bundle a CLI, a
//! credential store, or a local content cache — those are the concern of a
//! caller that composes this crate's [`Repository`] and [`Registry`] clients
//! with its own transport, auth, and storage layers.
//!
//! # Quick start
//!
//! ```no_run
//! use orex::config::RepositoryOptions;
//! use orex::repository::Repository;
//!
//! # async fn run() -> Result<(), orex::Error> {
//! let repo = Repository::new("registry.example.com/library/nginx:latest", RepositoryOptions::new())?;
//! let desc = repo.resolve(repo.reference()).await?;
//! println!("{} resolved to {}", repo.reference(), desc.digest);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`Reference`] parses and renders `registry[:port]/repository[:tag|@digest]`.
//! - [`Repository`] is the main entry point: it dispatches `Fetch`/`Push`/
//!   `Exists`/`Delete` to a [`blob`] or [`manifest`] store by descriptor media
//!   type, and exposes tagging, tag listing, and referrers enumeration
//!   directly.
//! - [`Registry`] enumerates a registry's catalog and hands out `Repository`
//!   values scoped to one repository name.
//! - [`transport::HttpTransport`] is the pluggable seam every HTTP exchange
//!   goes through; [`auth::CredentialProvider`] is the pluggable seam for
//!   looking up credentials. Neither is implemented by this crate beyond a
//!   `reqwest`-backed default.

#![warn(clippy::all)]

pub use config::RepositoryOptions;
pub use descriptor::Descriptor;
pub use digest::Digest;
pub use error::{Error, Result};
pub use reference::Reference;
pub use registry::Registry;
pub use repository::{Content, Repository};

/// Returns this crate's version.
///
/// # Examples
///
/// ```
/// let version = orex::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod auth;
pub mod blob;
pub mod config;
pub mod descriptor;
pub mod digest;
pub mod error;
#[doc(hidden)]
pub mod link;
pub mod manifest;
pub mod reference;
pub mod referrers;
pub mod registry;
pub mod repository;
pub mod transport;
#[doc(hidden)]
pub mod url;
pub mod warning;
