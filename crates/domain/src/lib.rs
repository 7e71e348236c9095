pub mod backoff;
pub mod config;
pub mod credential;
pub mod error;
pub mod event;
pub mod profile;
pub mod prompt;
pub mod trace;
