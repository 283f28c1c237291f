//! Adapters for the systems the transport order saga talks to.
//!
//! Each collaborator is a trait with an HTTP implementation and an in-memory
//! implementation for tests:
//! - [`CrmClient`]: record creation, attachments and updates in the CRM
//! - [`TokenProvider`]: OAuth access tokens for the CRM
//! - [`FileFetcher`]: download of release forms into scratch storage
//! - [`Notifier`]: announcements on a messaging channel

pub mod client;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod memory;
pub mod notify;
pub mod token;

pub use client::{CrmClient, DEALS_MODULE, HttpCrmClient, VEHICLES_MODULE};
pub use envelope::RecordResult;
pub use error::{CrmError, FetchError, NotifyError, TokenError};
pub use fetch::{FileFetcher, HttpFileFetcher, InMemoryFileFetcher};
pub use memory::{AttachmentSource, InMemoryCrmClient, RecordedAttachment};
pub use notify::{InMemoryNotifier, NoopNotifier, Notifier, SlackNotifier};
pub use token::{RefreshCredentials, RefreshTokenProvider, StaticToken, TokenProvider};
