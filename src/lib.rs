//! An observable, in-memory JSON:API resource layer with CRUD
//! synchronization against a REST backend.
//!
//! Two composable pieces:
//!
//! - [`Record`] — a single addressable resource: attributes, relationship
//!   reference descriptors, request-state flags, and `fetch`/`save`/
//!   `create`/`destroy` against its own URL.
//! - [`RecordSet`] — an ordered, unique-by-id sequence of records with
//!   pagination metadata and batch reconciliation (add/merge/remove) against
//!   incoming documents.
//!
//! Writes default to optimistic: mutations apply immediately and roll back
//! if the backend rejects them. Pass `wait: true` to defer mutation until
//! the backend confirms.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use jsonapi_store::{FetchOptions, HttpTransport, RecordSet, SetOptions};
//!
//! let transport = Arc::new(HttpTransport::new("https://api.example.com"));
//! let users = RecordSet::with_url("users", "/api/v1/users", transport);
//!
//! users.fetch(FetchOptions::default(), SetOptions::default()).await?;
//! if let Some(user) = users.get("1") {
//!     println!("{:?}", user.get_attribute("firstName"));
//! }
//! ```

mod document;
mod error;
mod observable;
mod owner;
mod record;
mod record_set;
mod transport;
mod unique_id;

pub use document::{
    Document, Identifier, PrimaryData, Relationship, RelationshipData, Resource,
};
pub use error::StoreError;
pub use observable::{ObservableList, ObservableMap, CHANGE_EVENT};
pub use owner::Owner;
pub use record::{
    CreateOptions, FetchOptions, IncludedHook, Patch, Payload, Record, SaveOptions,
};
pub use record_set::{
    RecordFactory, RecordInput, RecordSet, RecordSetOptions, RemoveInput, SetOptions,
};
pub use transport::{Response, Transport};
pub use unique_id::unique_id;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export the EventEmitter from the event_emitter_rs crate
pub use event_emitter_rs::EventEmitter;
