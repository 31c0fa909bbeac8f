//! Icebox Model - prompt assembly and the generation client
//!
//! The prompt side is fully deterministic: fixed persona, fixed task
//! rules, schema contract restated verbatim on every call, and dynamic
//! augmentation appended only for fields that are present. The client
//! side performs exactly one attempt against an OpenAI-compatible
//! endpoint in JSON-object mode and hands the raw text to recovery.

#![warn(unreachable_pub)]

pub mod client;
pub mod config;
pub mod prompt;

pub use client::{GenerationBackend, GenerationError, GenerationRequest, OpenAiGenerator};
pub use config::ModelConfig;
pub use prompt::{assemble, AssembledPrompt, PromptInputs};
