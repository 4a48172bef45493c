mod deadline;
mod error;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod object;

pub use deadline::{DeadlineBlobStore, with_deadline};
pub use error::{StorageError, validate_key};
pub use traits::{BlobInfo, BlobObject, BlobStore, BoxReader};
