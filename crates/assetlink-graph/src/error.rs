use assetlink_config::ConfigError;
use assetlink_session::SessionError;
use thiserror::Error;

/// Errors from the dependency graph.
///
/// Unresolvable references and unknown ids are not errors; queries report
/// them as data or as `None`.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A graph invariant does not hold.
    #[error("Dependency graph invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, GraphError>;
