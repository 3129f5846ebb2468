//! Command-line interface
//!
//! Wires parsed arguments to the build delegator:
//! - logger verbosity from `--log-level` / `--verbose`
//! - `--version`, and the `--service` / `--ping` handshake
//! - stdin lifecycle for watch and serve modes
//! - exit status from the build result

pub mod parser;
pub mod schema;
pub mod stdin;

use std::error::Error;
use std::fmt::Display;
use std::io::IsTerminal;
use std::path::PathBuf;

use colored::Colorize;
use tracing::{debug, info};

use crate::bundler::{Bundler, Delegator};
use crate::config::Settings;
use crate::logging::init_tracing;
use crate::package_manager::PackageManagerDetector;
use crate::utils::{format_duration, node_paths_from_env};

pub use parser::{command, parse_args, parse_args_with_defaults, ArgsError, ParsedArgs};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
/// Malformed command line
pub const EXIT_USAGE: u8 = 2;

/// One invocation of the command-line front end
pub struct Cli<B> {
    settings: Settings,
    delegator: Delegator<B>,
    attach_stdin: bool,
}

impl<B: Bundler> Cli<B> {
    pub fn new(settings: Settings, bundler: B, detector: PackageManagerDetector) -> Self {
        let delegator = Delegator::new(bundler, detector).with_policy(settings.pnp_policy());
        Self {
            settings,
            delegator,
            attach_stdin: true,
        }
    }

    /// Leave stdin alone even in watch and serve modes
    pub fn without_stdin(mut self) -> Self {
        self.attach_stdin = false;
        self
    }

    pub fn bundler(&self) -> &B {
        self.delegator.bundler()
    }

    /// Run with the arguments that follow the program name; returns the exit status
    pub async fn execute(&self, args: Vec<String>) -> u8 {
        let parsed = match parse_args_with_defaults(self.settings.default_args(), args) {
            Ok(parsed) => parsed,
            Err(ArgsError::Usage(err)) => {
                let _ = err.print();
                return u8::try_from(err.exit_code()).unwrap_or(EXIT_USAGE);
            }
            Err(err) => {
                report(err);
                return EXIT_USAGE;
            }
        };

        init_tracing(parsed.log_level());
        if let Some(source) = &self.settings.source {
            debug!("Settings loaded from {}", source.display());
        }

        if parsed.flag("version") {
            println!("{}", self.bundler().version());
            return EXIT_SUCCESS;
        }

        if let Some(host_version) = parsed.string("service") {
            let version = self.bundler().version();
            if host_version != version {
                report(format!(
                    "Cannot start service: Host version \"{host_version}\" does not match binary version \"{version}\""
                ));
                return EXIT_FAILURE;
            }
        }

        if parsed.flag("ping") {
            debug!("ping");
            return EXIT_SUCCESS;
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let options = parsed.build_options(cwd, node_paths_from_env());

        if self.watches_stdin(&parsed, std::io::stdin().is_terminal()) {
            debug!("Watching stdin");
            stdin::spawn_lifecycle();
        }

        match self.delegator.build(options).await {
            Ok(result) => {
                info!("Build finished in {}", format_duration(result.elapsed));
                EXIT_SUCCESS
            }
            Err(err) => {
                report(error_chain(&err));
                EXIT_FAILURE
            }
        }
    }

    /// Whether stdin decides when a watch or serve run ends
    fn watches_stdin(&self, parsed: &ParsedArgs, stdin_is_terminal: bool) -> bool {
        self.attach_stdin && parsed.is_long_running() && !stdin_is_terminal
    }
}

/// Fatal diagnostics go to stderr whatever the log level
fn report(message: impl Display) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// `err` followed by its causes, `: ` separated
fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
