//! Knowledge base lookups for the `get_additional_context` function.
//!
//! [`KnowledgeApi`] is one attempt against the external Q&A service;
//! [`KnowledgeClient`] wraps it with the bounded retry and fallback answer
//! the relay relies on. The only production implementation is CustomGPT.

mod base;
mod client;
pub mod customgpt;

pub use base::{
    FALLBACK_ANSWER, KnowledgeApi, KnowledgeError, KnowledgeResult, KnowledgeScope, RetryPolicy,
};
pub use client::KnowledgeClient;
pub use customgpt::CustomGptApi;
