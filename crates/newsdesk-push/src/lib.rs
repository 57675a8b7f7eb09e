//! # newsdesk-push
//!
//! Push notification delivery: the [`PushGateway`] contract, its FCM HTTP v1
//! implementation, the workflow message templates and the batching
//! [`Dispatcher`].

pub mod dispatcher;
pub mod error;
pub mod fcm;
pub mod gateway;
pub mod message;
pub mod templates;

pub use dispatcher::{is_deliverable, DispatchReport, Dispatcher};
pub use error::{PushError, Result};
pub use fcm::{FcmGateway, ServiceAccount};
pub use gateway::{DeliveryResult, PushGateway, RecordingGateway};
pub use message::PushMessage;
