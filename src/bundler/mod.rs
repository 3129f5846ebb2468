//! The external bundler
//!
//! Bundling itself happens in esbuild. This module defines the seam to it:
//! the [`Bundler`] trait, the process-backed implementation and the
//! [`Delegator`] that augments plugins before handing a build off.

mod delegate;
mod options;
mod process;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use delegate::{Delegator, PnpPolicy};
pub use options::{BuildOptions, OptionValue, Options};
pub use process::ProcessBundler;

/// esbuild release whose option surface the flag table mirrors
pub const BUNDLER_VERSION: &str = "0.14.54";

/// Result of a build operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Wall-clock duration of the bundler run
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to start bundler `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bundler exited with {}", exit_status(.code))]
    Failed { code: Option<i32> },

    #[error("plugin `{name}` failed during setup")]
    Plugin {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// An opaque bundler: takes build options, returns a result
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Version of the bundler, compared against the host in service mode
    fn version(&self) -> &str;

    async fn build(&self, options: BuildOptions) -> Result<BuildResult, BuildError>;
}
