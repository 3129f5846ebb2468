//! Bundler backed by the esbuild executable

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{BuildError, BuildOptions, BuildResult, Bundler, BUNDLER_VERSION};
use crate::cli::schema;
use crate::plugins::PluginBuild;

/// Runs esbuild as a child process with inherited output
#[derive(Debug, Clone)]
pub struct ProcessBundler {
    program: String,
    /// Arguments placed before the rendered flags
    prefix_args: Vec<String>,
    version: String,
}

impl ProcessBundler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            version: BUNDLER_VERSION.to_string(),
        }
    }

    pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
        self.prefix_args = args;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The invocation for `options`, before plugins run
    pub fn invocation(&self, options: &BuildOptions) -> PluginBuild {
        let mut build = PluginBuild::new(&self.program, &options.cwd);
        build.args.extend(self.prefix_args.iter().cloned());

        for (key, value) in options.options.iter() {
            match schema::by_key(key) {
                Some(spec) => build.args.extend(spec.render(value)),
                None => warn!("Dropping unknown option {key}"),
            }
        }
        build.args.extend(options.entry_points.iter().cloned());

        build.entry_points = options.entry_points.clone();
        build.options = options.options.clone();
        build.node_paths = options.node_paths.clone();

        if !options.node_paths.is_empty() {
            match std::env::join_paths(&options.node_paths) {
                Ok(joined) => build.set_env("NODE_PATH", joined.to_string_lossy()),
                Err(err) => warn!("Ignoring NODE_PATH: {err}"),
            }
        }
        build
    }
}

#[async_trait]
impl Bundler for ProcessBundler {
    fn version(&self) -> &str {
        &self.version
    }

    async fn build(&self, options: BuildOptions) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let mut invocation = self.invocation(&options);

        for plugin in &options.plugins {
            debug!("Running plugin {}", plugin.name());
            plugin
                .setup(&mut invocation)
                .await
                .map_err(|source| BuildError::Plugin {
                    name: plugin.name().to_string(),
                    source,
                })?;
        }

        debug!("{} {}", invocation.program, invocation.args.join(" "));

        // Long-running builds get a pipe that stays open until we exit, so
        // stdin handling stays with this process.
        let mut command = invocation.to_command();
        command.kill_on_drop(true);
        if options.is_long_running() {
            command.stdin(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|source| BuildError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        let _stdin = child.stdin.take();

        let status = child.wait().await.map_err(|source| BuildError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(BuildError::Failed {
                code: status.code(),
            });
        }

        Ok(BuildResult {
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::bundler::{OptionValue, Options};
    use crate::plugins::PnpPlugin;

    fn build_options() -> BuildOptions {
        let mut options = Options::new();
        options.insert("bundle", true.into());
        options.insert("outfile", "out.js".into());
        options.insert(
            "define",
            OptionValue::Map(BTreeMap::from([("RELEASE".to_string(), "true".to_string())])),
        );
        options.insert("external", OptionValue::List(vec!["fs".into()]));

        BuildOptions {
            entry_points: vec!["entry.js".into()],
            options,
            cwd: PathBuf::from("."),
            ..BuildOptions::default()
        }
    }

    #[test]
    fn test_invocation_renders_flags_then_entry_points() {
        let bundler = ProcessBundler::new("esbuild");
        let invocation = bundler.invocation(&build_options());

        assert_eq!(invocation.program, "esbuild");
        assert_eq!(invocation.entry_points, vec!["entry.js"]);
        assert_eq!(invocation.options, build_options().options);
        assert_eq!(
            invocation.args,
            vec![
                "--bundle",
                "--define:RELEASE=true",
                "--external:fs",
                "--outfile=out.js",
                "entry.js",
            ]
        );
    }

    #[test]
    fn test_invocation_prefix_args_and_node_path() {
        let bundler = ProcessBundler::new("node").with_prefix_args(vec!["esbuild.js".into()]);
        let mut options = build_options();
        options.node_paths = vec![PathBuf::from("/opt/lib"), PathBuf::from("/usr/lib/node")];

        let invocation = bundler.invocation(&options);
        assert_eq!(invocation.args.first().map(String::as_str), Some("esbuild.js"));

        let node_path = invocation.env.get("NODE_PATH").unwrap();
        let split: Vec<PathBuf> = std::env::split_paths(node_path).collect();
        assert_eq!(split, options.node_paths);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let bundler = ProcessBundler::new("definitely-not-an-esbuild-binary");
        let err = bundler.build(build_options()).await.unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_relayed() {
        let project = tempfile::tempdir().unwrap();
        let ok = ProcessBundler::new("sh").with_prefix_args(vec!["-c".into(), "exit 0".into()]);
        let mut options = build_options();
        options.cwd = project.path().to_path_buf();
        options.plugins.push(Arc::new(PnpPlugin::new()));
        assert!(ok.build(options).await.is_ok());

        let failing = ProcessBundler::new("sh").with_prefix_args(vec!["-c".into(), "exit 3".into()]);
        let err = failing.build(build_options()).await.unwrap_err();
        assert!(matches!(err, BuildError::Failed { code: Some(3) }));
    }

    #[test]
    fn test_default_version() {
        assert_eq!(ProcessBundler::new("esbuild").version(), BUNDLER_VERSION);
        assert_eq!(ProcessBundler::new("esbuild").with_version("0.19.0").version(), "0.19.0");
    }
}
