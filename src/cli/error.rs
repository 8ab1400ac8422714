//! CLI error type

use crate::cache::CacheError;
use crate::client::ApiError;
use crate::config::ConfigError;
use crate::pipeline::PipelineError;
use crate::sink::SinkError;

/// Errors surfaced by CLI commands
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// API client error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Sink error
    #[error(transparent)]
    Sink(#[from] SinkError),
}
