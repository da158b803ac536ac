pub mod config;
pub mod dependencies;
pub mod error;
pub mod http;
pub mod mcp;
pub mod params;
pub mod server;
pub mod tools;
pub mod translations;
pub mod types;
