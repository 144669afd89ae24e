pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, FileConfig, LexiconConfig};
pub use error::ConfigError;
pub use types::*;
