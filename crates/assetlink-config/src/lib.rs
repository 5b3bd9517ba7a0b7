//! Configuration for the assetlink dependency graph.
//!
//! Values come from defaults, an optional `assetlink.toml` and
//! `ASSETLINK_`-prefixed environment variables, merged with figment.

pub mod config;
pub mod error;
mod loading;
pub mod settings;

pub use config::*;
pub use error::*;
pub use settings::*;
