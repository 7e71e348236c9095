//! `reso-suno`: generation backend adapter for Reso.
//!
//! The orchestrator talks to the backend only through
//! [`GenerationBackend`]. [`SunoClient`] implements it against the
//! self-hosted suno-api bridge, which owns the browser session and the
//! single pending-captcha slot.

pub mod backend;
pub mod rest;
pub mod types;

pub use backend::{ClipStatus, GenerationBackend};
pub use rest::{from_reqwest, SunoClient};
