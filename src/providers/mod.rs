//! Provider abstractions for object storage, the vector index, and completions
//!
//! These are explicitly owned, injected dependencies constructed once by the
//! hosting application, so tests can substitute fakes.

pub mod completion;
pub mod memory_index;
pub mod object_store;
pub mod rest_index;
pub mod vector_index;

#[cfg(feature = "gcp")]
pub mod gcs_store;

pub use completion::{CompletionClient, CompletionMessage, OpenAiCompatClient};
pub use memory_index::MemoryVectorIndex;
pub use object_store::{FsObjectStore, ObjectStore};
pub use rest_index::RestVectorIndex;
pub use vector_index::{VectorIndex, VectorMatch, VectorMetadata, VectorRecord};

#[cfg(feature = "gcp")]
pub use gcs_store::GcsObjectStore;
