//! # newsdesk-store
//!
//! Clients for the hosted Backend-as-a-Service that owns all newsdesk state.
//!
//! The service boundary is expressed as three traits:
//! - [`Store`]: table-scoped select/insert/update/delete/count against the
//!   relational database, described by a [`Query`]
//! - [`IdentityProvider`]: sign-up, sign-in, token verification, invites and
//!   admin user updates
//! - [`ObjectStorage`]: path-addressed uploads with public URLs
//!
//! [`rest`] implements them over HTTP (PostgREST, GoTrue and the storage
//! API). [`memory`] implements them in process for local development and
//! tests.

pub mod error;
pub mod identity;
pub mod memory;
pub mod query;
pub mod rest;
pub mod storage;
pub mod store;
pub mod tables;

pub use error::{BaasError, Result};
pub use identity::{AuthUser, IdentityProvider, Session, UserUpdate};
pub use query::{Filter, Query};
pub use storage::ObjectStorage;
pub use store::{Store, StoreExt};
