//! MCP (Model Context Protocol) server for Android device control.
//!
//! Provides a JSON-RPC 2.0 interface over stdio so that AI assistants can
//! drive adb and Gradle. Exposes tools for device listing, shell commands,
//! screenshots, package management, activity launching, UI hierarchy dumps,
//! and project builds.

/// Tool registry and argument schemas.
pub mod registry;

/// MCP server implementation.
pub mod server;

/// Tool definitions and handlers.
pub mod tools;

/// JSON-RPC 2.0 transport types.
pub mod transport;

pub use registry::{ToolDefinition, ToolDescriptor, ToolRegistry};
pub use server::McpServer;
pub use tools::{standard_registry, ToolContext};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
