//! Shared types for the conversation-state MCP workspace
//!
//! Holds the pieces every other crate leans on: the `Secret` wrapper used for
//! OAuth client secrets and bearer tokens, and the configuration error type
//! returned while loading service configuration.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
