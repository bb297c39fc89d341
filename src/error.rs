//! Vault Errors
//!
//! Every failure surfaced by the source registry, its persistence protocol
//! and the reference collaborators.

use thiserror::Error;

use crate::source::types::SourceStatus;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Source already exists: {name}")]
    DuplicateSource { name: String },

    #[error("Source not found: {name}")]
    NotFound { name: String },

    #[error("Source '{name}' is in an invalid state: {state}")]
    InvalidState { name: String, state: SourceStatus },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VaultError {
    pub fn duplicate_source(name: impl Into<String>) -> Self {
        Self::DuplicateSource { name: name.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn invalid_state(name: impl Into<String>, state: SourceStatus) -> Self {
        Self::InvalidState {
            name: name.into(),
            state,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
