//! Tool registry, dispatch and JSON-RPC handling for MCP servers
//!
//! Tools implement the `Tool` trait and are registered by name in a
//! `ToolRegistry`. `DispatchServer` looks tools up, validates arguments
//! against their input schema, runs them, and folds every failure (including
//! panics) into a uniform error envelope. `RpcHandler` maps JSON-RPC 2.0
//! messages onto the dispatcher and is independent of the transport.

pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod rpc;
pub mod schema;
pub mod tool;

pub use dispatch::{CallToolResult, ContentBlock, DispatchPhase, DispatchServer};
pub use envelope::CallResult;
pub use error::{ErrorKind, ToolFailure};
pub use registry::ToolRegistry;
pub use rpc::{PROTOCOL_VERSION, RpcError, RpcHandler, ServerInfo};
pub use schema::validate_arguments;
pub use tool::{Tool, ToolDescriptor, ToolFuture};
