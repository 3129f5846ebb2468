//! Hands builds to the bundler, adding the Plug'n'Play plugin for Yarn Berry projects

use std::sync::Arc;

use semver::Version;
use tracing::debug;

use super::{BuildError, BuildOptions, BuildResult, Bundler};
use crate::package_manager::{PackageManager, PackageManagerDetector};
use crate::plugins::{PnpPlugin, PNP_PLUGIN_NAME};

/// When to add the Plug'n'Play plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnpPolicy {
    pub enabled: bool,
    /// Oldest yarn release with Plug'n'Play installs
    pub min_version: Version,
    /// Node.js executable that runs the plugin build
    pub node: String,
}

impl Default for PnpPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_version: Version::new(2, 0, 0),
            node: "node".to_string(),
        }
    }
}

pub struct Delegator<B> {
    bundler: B,
    detector: PackageManagerDetector,
    policy: PnpPolicy,
}

impl<B: Bundler> Delegator<B> {
    pub fn new(bundler: B, detector: PackageManagerDetector) -> Self {
        Self {
            bundler,
            detector,
            policy: PnpPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PnpPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn bundler(&self) -> &B {
        &self.bundler
    }

    /// Build with the wrapped bundler; its result or error is returned as is
    pub async fn build(&self, mut options: BuildOptions) -> Result<BuildResult, BuildError> {
        if self.policy.enabled {
            self.augment(&mut options).await;
        }
        debug!("Build options: {:?}", options);
        self.bundler.build(options).await
    }

    async fn augment(&self, options: &mut BuildOptions) {
        let manager = match self.detector.identify(&options.cwd).await {
            Ok(manager) => manager,
            Err(err) => {
                debug!("Skipping plugin detection: {err}");
                return;
            }
        };

        if manager != PackageManager::Yarn {
            return;
        }
        if !self.detector.verify_version(manager, &self.policy.min_version).await {
            debug!("yarn is older than {}, not adding {PNP_PLUGIN_NAME}", self.policy.min_version);
            return;
        }
        if options.has_plugin(PNP_PLUGIN_NAME) {
            return;
        }

        debug!("Adding {PNP_PLUGIN_NAME}");
        options.plugins.push(Arc::new(PnpPlugin::with_node(&self.policy.node)));
    }
}
