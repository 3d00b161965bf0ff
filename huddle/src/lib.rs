pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mcp;
pub mod metrics;

pub use config::Config;
pub use error::{Error, Result};
