// ABOUTME: Core library for fragments: media types, the fragment entity, storage contract, and conversion.
// ABOUTME: Backends plug in through StorageBackend; the in-memory backend lives here, durable ones elsewhere.

pub mod backend;
pub mod convert;
pub mod error;
pub mod fragment;
pub mod media;
pub mod memory;
pub mod record;

pub use backend::{SharedBackend, StorageBackend, StorageError};
pub use convert::{Converted, Converter, resolve_target};
pub use error::{FragmentError, Missing, Result};
pub use fragment::{Fragment, NewFragment};
pub use media::{Format, MediaType};
pub use memory::MemoryBackend;
pub use record::{FragmentListing, FragmentRecord};
