pub mod config_cmd;
pub mod mcp;
pub mod models;
pub mod preset;
