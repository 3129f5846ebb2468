//! yarn-esbuild library
//!
//! Command-line front end for the esbuild bundler. Flags are parsed against
//! a declarative table, forwarded to esbuild, and Yarn Berry projects get
//! the Plug'n'Play resolution plugin added automatically.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod logging;
pub mod package_manager;
pub mod plugins;
pub mod utils;

pub use bundler::{Bundler, Delegator, ProcessBundler};
pub use cli::Cli;
pub use config::Settings;
pub use package_manager::{PackageManager, PackageManagerDetector};
