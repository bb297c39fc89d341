//! Source Module
//!
//! Credential source registry, its lock/unlock state machine and the
//! collaborator traits it depends on.

pub mod manager;
pub mod traits;
pub mod types;

pub use manager::SourceManager;
pub use traits::{CredentialMarshaller, Secret, StorageBackend};
pub use types::*;
