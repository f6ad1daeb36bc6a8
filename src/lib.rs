pub mod commands;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod process;
