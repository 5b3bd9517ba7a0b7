use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};

use crate::config::{AssetLinkConfig, CONFIG_FILE_NAME, ENV_PREFIX};
use crate::error::{ConfigError, Result};

impl AssetLinkConfig {
    /// Load configuration from multiple sources.
    /// Priority: environment variables > config file > defaults
    ///
    /// An explicit `config_path` must exist. Without one, `assetlink.toml` in
    /// the current directory is used if present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };
        Self::extract(Self::figment(config_file)?)
    }

    /// Load `assetlink.toml` from `root` if it exists, defaults otherwise.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let candidate = root.as_ref().join(CONFIG_FILE_NAME);
        let config_file = candidate.exists().then_some(candidate);
        Self::extract(Self::figment(config_file)?)
    }

    /// The provider chain used by [`load`](Self::load), exposed so callers
    /// can merge their own layers on top.
    ///
    /// The config file is read up front, so an unreadable file is reported
    /// as [`ConfigError::Io`] rather than as a bad value.
    pub fn figment(config_file: Option<PathBuf>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(AssetLinkConfig::default()));

        if let Some(path) = config_file {
            tracing::debug!("Loading assetlink config from: {}", path.display());
            let contents = std::fs::read_to_string(&path)?;
            figment = figment.merge(Toml::string(&contents));
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: AssetLinkConfig = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: Some(e.to_string()),
        })?;
        config.validate()?;
        Ok(config)
    }
}
