//! yarn-esbuild - esbuild from the command line, Plug'n'Play aware
//!
//! Translates esbuild flags into a build, adds the Yarn Plug'n'Play plugin
//! when the project needs it, and relays esbuild's exit status.

use std::process::ExitCode;

use anyhow::{Context, Result};

use yarn_esbuild::{Cli, PackageManagerDetector, Settings};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let settings = Settings::discover().context("Failed to load settings")?;
    let bundler = settings.process_bundler();

    let cli = Cli::new(settings, bundler, PackageManagerDetector::new());
    let status = cli.execute(std::env::args().skip(1).collect()).await;

    Ok(ExitCode::from(status))
}
