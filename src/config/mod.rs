//! Settings handling
//!
//! An optional `yarn-esbuild.toml` supplies flag defaults and controls how
//! the bundler is launched and whether package manager detection runs.

mod schema;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::bundler::{PnpPolicy, ProcessBundler};
use crate::utils::expand_home;

pub use schema::*;

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV: &str = "YARN_ESBUILD_CONFIG";

/// Settings file name looked up in the working directory
pub const CONFIG_FILE: &str = "yarn-esbuild.toml";

/// Settings file looked up in the home directory
pub const HOME_CONFIG_FILE: &str = "~/.yarn-esbuild.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported default for --{flag} in {}", path.display())]
    UnsupportedDefault { flag: String, path: PathBuf },
}

/// Main settings structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Flag name to value, applied as if typed before the user's arguments
    #[serde(default)]
    pub defaults: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub bundler: BundlerSettings,

    #[serde(default)]
    pub package_manager: PackageManagerSettings,

    /// File the settings came from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut settings: Settings = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.source = Some(path.to_path_buf());
        settings.validate()?;
        Ok(settings)
    }

    /// Find and load the settings for this process
    ///
    /// `YARN_ESBUILD_CONFIG` wins, then `./yarn-esbuild.toml`, then
    /// `~/.yarn-esbuild.toml`. With no file anywhere the built-in defaults
    /// are used.
    pub fn discover() -> Result<Self, SettingsError> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
            let path = expand_home(&explicit.to_string_lossy());
            return Self::load(path);
        }

        for candidate in [PathBuf::from(CONFIG_FILE), expand_home(HOME_CONFIG_FILE)] {
            if candidate.is_file() {
                debug!("Loading settings from {}", candidate.display());
                return Self::load(candidate);
            }
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        for (flag, value) in &self.defaults {
            if render_default(flag, value).is_none() {
                return Err(SettingsError::UnsupportedDefault {
                    flag: flag.clone(),
                    path: self.source.clone().unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// `[defaults]` rendered as command-line arguments
    pub fn default_args(&self) -> Vec<String> {
        self.defaults
            .iter()
            .filter_map(|(flag, value)| render_default(flag, value))
            .flatten()
            .collect()
    }

    /// The bundler described by `[bundler]`
    pub fn process_bundler(&self) -> ProcessBundler {
        let bundler = ProcessBundler::new(&self.bundler.program).with_prefix_args(self.bundler.args.clone());
        match &self.bundler.version {
            Some(version) => bundler.with_version(version),
            None => bundler,
        }
    }

    /// Plug'n'Play policy from `[package-manager]`
    pub fn pnp_policy(&self) -> PnpPolicy {
        PnpPolicy {
            enabled: self.package_manager.detect,
            min_version: self.package_manager.min_yarn_version.clone(),
            node: self.bundler.node.clone(),
        }
    }
}

fn render_default(flag: &str, value: &toml::Value) -> Option<Vec<String>> {
    let scalar = |value: &toml::Value| match value {
        toml::Value::Boolean(true) => Some(format!("--{flag}")),
        toml::Value::Boolean(false) => Some(format!("--{flag}=false")),
        toml::Value::String(text) => Some(format!("--{flag}={text}")),
        toml::Value::Integer(number) => Some(format!("--{flag}={number}")),
        _ => None,
    };

    match value {
        toml::Value::Array(items) => items.iter().map(scalar).collect(),
        other => scalar(other).map(|arg| vec![arg]),
    }
}
