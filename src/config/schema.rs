//! Settings file schema

use semver::Version;
use serde::Deserialize;

/// How the bundler executable is launched
#[derive(Debug, Clone, Deserialize)]
pub struct BundlerSettings {
    /// Executable to run
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the generated flags
    #[serde(default)]
    pub args: Vec<String>,

    /// Version reported to service-mode hosts; defaults to the built-in one
    #[serde(default)]
    pub version: Option<String>,

    /// Node.js executable for Plug'n'Play builds
    #[serde(default = "default_node")]
    pub node: String,
}

impl Default for BundlerSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            version: None,
            node: default_node(),
        }
    }
}

fn default_program() -> String {
    "esbuild".to_string()
}

fn default_node() -> String {
    "node".to_string()
}

/// Package manager detection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageManagerSettings {
    /// Add the Plug'n'Play plugin when Yarn Berry is detected
    #[serde(default = "default_true")]
    pub detect: bool,

    /// Oldest yarn release that gets the plugin
    #[serde(default = "default_min_yarn_version")]
    pub min_yarn_version: Version,
}

impl Default for PackageManagerSettings {
    fn default() -> Self {
        Self {
            detect: true,
            min_yarn_version: default_min_yarn_version(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_yarn_version() -> Version {
    Version::new(2, 0, 0)
}
