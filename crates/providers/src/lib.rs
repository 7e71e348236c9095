//! `reso-providers`: prompt synthesis for Reso.
//!
//! [`PromptSynthesizer`] is the orchestrator-facing trait;
//! [`AnthropicSynthesizer`] implements it over the Anthropic Messages API.

pub mod anthropic;
pub mod parse;
pub mod prompts;
pub mod traits;
pub mod util;

pub use anthropic::AnthropicSynthesizer;
pub use traits::PromptSynthesizer;
