//! Credentials Module
//!
//! Reference credential objects and marshaller, sealed with Argon2id and
//! XChaCha20-Poly1305.

pub mod cipher;
pub mod marshaller;
pub mod secret;

pub use cipher::KdfParams;
pub use marshaller::SealingMarshaller;
pub use secret::Credentials;
