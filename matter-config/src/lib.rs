use log::warn;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub mod codec;

pub use codec::{ReaderConfig, TrailingElements, WriterConfig};

const CONFIG_ROOT_FOLDER: &str = "config/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't access configuration at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Couldn't parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Limits and policies shared by every reader and writer built from this configuration.
///
/// Nothing here changes the wire format; the defaults accept every stream a
/// default writer produces.
#[derive(Deserialize, Serialize, Default, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct CodecConfiguration {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
}

impl CodecConfiguration {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(exec_dir: &Path) -> Result<Self, ConfigError> {
        <Self as LoadConfiguration>::load(exec_dir)
    }
}

pub trait LoadConfiguration {
    fn load(exec_dir: &Path) -> Result<Self, ConfigError>
    where
        Self: Sized + Default + Serialize + DeserializeOwned,
    {
        let config_dir = exec_dir.join(CONFIG_ROOT_FOLDER);
        if !config_dir.exists() {
            log::debug!("creating new config root folder");
            fs::create_dir(&config_dir).map_err(|source| ConfigError::Io {
                path: config_dir.clone(),
                source,
            })?;
        }
        let path = config_dir.join(Self::get_path());

        let config = if path.exists() {
            let file_content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&file_content)?
        } else {
            let content = Self::default();

            match toml::to_string(&content) {
                Ok(serialized) => {
                    if let Err(err) = fs::write(&path, serialized) {
                        warn!(
                            "Couldn't write default config to {:?}. Reason: {}",
                            &path, err
                        );
                    }
                }
                Err(err) => warn!("Couldn't serialize default config. Reason: {}", err),
            }

            content
        };

        config.validate()?;
        Ok(config)
    }

    fn get_path() -> &'static Path;

    fn validate(&self) -> Result<(), ConfigError>;
}

impl LoadConfiguration for CodecConfiguration {
    fn get_path() -> &'static Path {
        Path::new("codec.toml")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.reader.validate()?;
        self.writer.validate()
    }
}
