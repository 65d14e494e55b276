pub mod storage;

pub use storage::{
    CorruptRegistryPolicy, Document, DocumentMetadata, DocumentStore, ErrorKind, OpenOptions,
    StoreError, StoreResult,
};
