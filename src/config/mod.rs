// Configuration management module
// TOML settings for the embedding backend, chunking, store, retrieval and conversations

pub mod settings;

pub use settings::{Config, ConfigError, OllamaConfig};

