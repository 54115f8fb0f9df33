//! dd-core: Core types and traits for deepduck
//!
//! This crate provides the foundational types and traits used throughout
//! the workspace: the language-model `Provider` interface, the `WebSearch`
//! and `PageFetcher` capabilities, and the shared error type.

pub mod blocking;
pub mod error;
pub mod message;
pub mod provider;
pub mod web;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use blocking::run_blocking;
pub use error::Error;
pub use message::{Message, Role, Usage};
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
pub use web::{PageFetcher, WebSearch, DEFAULT_MAX_RESULTS};

pub type Result<T> = std::result::Result<T, Error>;
