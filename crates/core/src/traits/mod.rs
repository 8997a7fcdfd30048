//! Core traits
//!
//! Seams where backends plug in. Implementations live in their own crates
//! (`frontdesk-llm` for chat backends); tests use in-process mocks.

mod chat;

pub use chat::{ChatCompletion, ChatError, ChatModel, ChatRequest};
