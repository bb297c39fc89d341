//! Persistence Module
//!
//! Storage key derivation, the serialized storage queue and the
//! dehydrate/rehydrate protocol.

pub mod keys;
pub mod protocol;
pub mod queue;

pub use keys::KeyEncoder;
pub use protocol::{LiveSource, WrittenPacket};
pub use queue::PersistenceQueue;
