//! Schema storage: per-schema body files plus a JSON registry of metadata.

pub mod document;
pub mod error;
pub mod registry;
pub mod store;


pub use document::{validate_id, Document, DocumentMetadata};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use registry::CorruptRegistryPolicy;
pub use store::{DocumentStore, OpenOptions};
