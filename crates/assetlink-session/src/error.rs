//! Error types for session mutations.

use thiserror::Error;

use crate::id::{AssetId, PackageId};

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("package not found: {0}")]
    PackageNotFound(PackageId),

    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("package already present in session: {0}")]
    DuplicatePackage(PackageId),

    #[error("asset already present in session: {0}")]
    DuplicateAsset(AssetId),

    #[error("package {0} is read-only")]
    ReadOnlyPackage(PackageId),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("session has been disposed")]
    Disposed,
}
