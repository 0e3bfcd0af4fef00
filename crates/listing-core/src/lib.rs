//! Core data model shared by every crate in the listing search workspace:
//! the normalized `Listing` record, the `FilterSet` consumed by callers,
//! source identity, and the error taxonomy used end to end.

pub mod error;
pub mod facts;
pub mod filters;
pub mod fingerprint;
pub mod listing;
pub mod source;

pub use error::{ErrorKind, SearchError};
pub use filters::FilterSet;
pub use fingerprint::FingerprintKey;
pub use listing::Listing;
pub use source::{SourceDescriptor, SourceKind};
