//! # helm-llm
//!
//! The model gateway boundary: the [`ModelGateway`] trait the run controller
//! drives, a concrete non-streaming Anthropic Messages backend, and a
//! scripted gateway for tests.
//!
//! The controller never sees provider wire formats — it hands a
//! [`helm_core::Context`] plus options across this boundary and receives
//! assistant text and/or tool calls back.

#![deny(unsafe_code)]

pub mod anthropic;
pub mod gateway;
pub mod testing;

pub use anthropic::{AnthropicConfig, AnthropicGateway};
pub use gateway::{CompletionOptions, GatewayError, GatewayResult, ModelGateway, ModelResponse};
pub use testing::ScriptedGateway;
