//! # newsdesk-shared
//!
//! Domain vocabulary shared by every newsdesk crate: roles, article
//! statuses, the row models stored in the hosted database, slug derivation
//! and the handful of constants the API contract depends on.

pub mod constants;
pub mod error;
pub mod models;
pub mod slug;
pub mod types;

pub use error::ParseError;
pub use types::{ArticleStatus, Role};
