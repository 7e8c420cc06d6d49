// Configuration loading

pub mod settings;

pub use settings::{
    EndpointSettings, HttpSection, PreviewSection, ProposalSection, ServiceConfig, ServiceSection,
    CONFIG_ENV_VAR,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Config file could not be read.
    Io(String),
    /// TOML syntax or type error.
    Parse(String),
    /// Parsed, but a value is out of range.
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "config parse error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
