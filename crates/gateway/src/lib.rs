//! `reso-gateway`: the Reso orchestrator, its HTTP/SSE API and CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
pub mod store;
