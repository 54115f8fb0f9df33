//! dd-providers: LLM provider implementations for deepduck
//!
//! This crate provides implementations of the Provider trait for various LLM APIs.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;
