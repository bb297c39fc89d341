//! Storage Backends
//!
//! Reference implementations of [`StorageBackend`](crate::source::traits::StorageBackend).

pub mod keychain;
pub mod memory;

pub use keychain::KeyringStorage;
pub use memory::MemoryStorage;
