//! Plugin system
//!
//! Plugins get a chance to adjust the bundler invocation before it is
//! spawned. The only built-in plugin hands the build to esbuild's JavaScript
//! API together with `@yarnpkg/esbuild-plugin-pnp`, so modules resolve
//! through the Yarn Plug'n'Play install layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::bundler::Options;
use crate::utils::is_file;

/// Name under which [`PnpPlugin`] registers itself
pub const PNP_PLUGIN_NAME: &str = "pnpPlugin";

/// Plug'n'Play runtime file names, in lookup order
const PNP_RUNTIMES: &[&str] = &[".pnp.cjs", ".pnp.js"];

/// Node.js script that runs a Plug'n'Play build
pub const PNP_DRIVER: &str = include_str!("pnp_build.js");

/// Environment variable carrying the build to [`PNP_DRIVER`] as JSON
pub const PNP_BUILD_ENV: &str = "YARN_ESBUILD_BUILD";

/// The pending bundler invocation, open to plugins
#[derive(Debug, Clone)]
pub struct PluginBuild {
    /// Working directory of the bundler process
    pub cwd: PathBuf,

    /// Executable to run
    pub program: String,

    /// Arguments, in order
    pub args: Vec<String>,

    /// Environment overrides on top of the inherited environment
    pub env: BTreeMap<String, String>,

    /// The build the arguments were rendered from
    pub entry_points: Vec<String>,
    pub options: Options,
    pub node_paths: Vec<PathBuf>,
}

impl PluginBuild {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            entry_points: Vec::new(),
            options: Options::new(),
            node_paths: Vec::new(),
        }
    }

    /// Current value of an environment variable as the bundler will see it
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Build the process command for this invocation
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env).current_dir(&self.cwd);
        command
    }
}

/// Plugin trait - implement this to hook into the build
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name; at most one plugin per name is added automatically
    fn name(&self) -> &str;

    /// Adjust the invocation before the bundler runs
    async fn setup(&self, build: &mut PluginBuild) -> Result<()>;
}

/// The build as the driver script reads it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DriverBuild<'a> {
    entry_points: &'a [String],
    options: &'a Options,
    node_paths: Vec<String>,
}

/// Resolves modules through the Yarn Plug'n'Play runtime
///
/// Setup turns the invocation into `node -e <driver>`, with the Plug'n'Play
/// runtime preloaded so the driver can load esbuild and the resolver plugin
/// from the project's own dependencies.
#[derive(Debug, Clone)]
pub struct PnpPlugin {
    node: String,
}

impl PnpPlugin {
    pub fn new() -> Self {
        Self::with_node("node")
    }

    /// Run the build with a specific Node.js executable
    pub fn with_node(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl Default for PnpPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for PnpPlugin {
    fn name(&self) -> &str {
        PNP_PLUGIN_NAME
    }

    async fn setup(&self, build: &mut PluginBuild) -> Result<()> {
        let Some(runtime) = find_pnp_runtime(&build.cwd).await else {
            debug!("No Plug'n'Play runtime above {}", build.cwd.display());
            return Ok(());
        };
        debug!("Using Plug'n'Play runtime {}", runtime.display());

        let require = format!(
            "--require {}",
            serde_json::to_string(&runtime.display().to_string())?
        );
        let node_options = match build.env_var("NODE_OPTIONS") {
            Some(existing) if existing.contains(&require) => existing,
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {require}"),
            _ => require,
        };
        build.set_env("NODE_OPTIONS", node_options);

        let payload = serde_json::to_string(&DriverBuild {
            entry_points: &build.entry_points,
            options: &build.options,
            node_paths: build
                .node_paths
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        })?;
        build.set_env(PNP_BUILD_ENV, payload);
        build.program = self.node.clone();
        build.args = vec!["-e".to_string(), PNP_DRIVER.to_string()];
        Ok(())
    }
}

/// Walk up from `dir` to the nearest Plug'n'Play runtime
pub async fn find_pnp_runtime(dir: &Path) -> Option<PathBuf> {
    let start = tokio::fs::canonicalize(dir)
        .await
        .unwrap_or_else(|_| dir.to_path_buf());

    for ancestor in start.ancestors() {
        for name in PNP_RUNTIMES {
            let candidate = ancestor.join(name);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use pretty_assertions::assert_eq;

    use crate::bundler::OptionValue;

    #[tokio::test]
    async fn test_finds_runtime_in_ancestor() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(".pnp.cjs"), "").unwrap();
        let nested = root.path().join("packages/app");
        fs::create_dir_all(&nested).unwrap();

        let runtime = find_pnp_runtime(&nested).await.unwrap();
        assert_eq!(runtime.file_name().unwrap(), ".pnp.cjs");
    }

    #[tokio::test]
    async fn test_setup_appends_require_once() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(".pnp.js"), "").unwrap();

        let mut build = PluginBuild::new("esbuild", root.path());
        build.set_env("NODE_OPTIONS", "--max-old-space-size=4096");

        PnpPlugin::new().setup(&mut build).await.unwrap();
        PnpPlugin::new().setup(&mut build).await.unwrap();

        let node_options = build.env.get("NODE_OPTIONS").unwrap();
        assert!(node_options.starts_with("--max-old-space-size=4096 --require "));
        assert!(node_options.contains(".pnp.js"));
        assert_eq!(node_options.matches("--require").count(), 1);
    }

    #[tokio::test]
    async fn test_setup_runs_build_through_node_driver() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(".pnp.cjs"), "").unwrap();

        let mut build = PluginBuild::new("esbuild", root.path());
        build.args = vec!["--bundle".into(), "--outfile=out.js".into(), "src/index.ts".into()];
        build.entry_points = vec!["src/index.ts".into()];
        build.options.insert("bundle", true.into());
        build.options.insert("outfile", "out.js".into());
        build.options.insert(
            "define",
            OptionValue::Map(BTreeMap::from([("RELEASE".to_string(), "true".to_string())])),
        );
        build.node_paths = vec![PathBuf::from("/opt/lib")];

        PnpPlugin::with_node("/usr/bin/node").setup(&mut build).await.unwrap();

        assert_eq!(build.program, "/usr/bin/node");
        assert_eq!(build.args, vec!["-e".to_string(), PNP_DRIVER.to_string()]);
        assert!(PNP_DRIVER.contains("require('@yarnpkg/esbuild-plugin-pnp')"));
        assert!(PNP_DRIVER.contains(PNP_BUILD_ENV));

        let payload: serde_json::Value = serde_json::from_str(build.env.get(PNP_BUILD_ENV).unwrap()).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "entryPoints": ["src/index.ts"],
                "options": {
                    "bundle": true,
                    "define": { "RELEASE": "true" },
                    "outfile": "out.js",
                },
                "nodePaths": ["/opt/lib"],
            })
        );
    }

    #[tokio::test]
    async fn test_setup_without_runtime_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let mut build = PluginBuild::new("esbuild", root.path());
        build.args = vec!["entry.js".into()];
        build.set_env("NODE_OPTIONS", "");

        PnpPlugin::new().setup(&mut build).await.unwrap();
        assert_eq!(build.program, "esbuild");
        assert_eq!(build.args, vec!["entry.js"]);
        assert_eq!(build.env.get("NODE_OPTIONS").map(String::as_str), Some(""));
        assert!(!build.env.contains_key(PNP_BUILD_ENV));
    }
}
