//! In-process implementations of the backend traits.
//!
//! Used when the server runs without a hosted backend (`NEWSDESK_BACKEND=memory`)
//! and as the test doubles for the service layer. State lives in
//! `tokio::sync::RwLock`-guarded maps and disappears with the process.

mod identity;
mod storage;
mod store;

pub use identity::MemoryIdentity;
pub use storage::{MemoryStorage, StoredObject};
pub use store::MemoryStore;

use chrono::{SecondsFormat, Utc};

use crate::error::BaasError;

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn rejected(service: &'static str, status: u16, message: impl Into<String>) -> BaasError {
    BaasError::Api {
        service,
        status,
        message: message.into(),
    }
}
