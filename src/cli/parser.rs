//! Schema-driven argument parsing
//!
//! Turns the process arguments into [`ParsedArgs`]: the entry points, the
//! normalized option object for the bundler and the CLI-only controls.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use super::schema::{self, Coercion, FlagKind, FlagSpec, FLAGS, LOADERS};
use crate::bundler::{BuildOptions, OptionValue, Options};
use crate::logging::LogLevel;

const ENTRY_POINTS: &str = "entry-points";

const EXAMPLES: &str = "\
Examples:
  yarn-esbuild --bundle entry_point.js --outdir=dist --minify --sourcemap
      Produces dist/entry_point.js and dist/entry_point.js.map

  yarn-esbuild --bundle entry_point.js --outfile=out.js --loader:.js=jsx
      Allow JSX syntax in .js files

  yarn-esbuild example.js --outfile=out.js --define:RELEASE=true
      Substitute the identifier RELEASE for the literal true

  yarn-esbuild --minify --loader=ts < input.ts > output.js
      Minify a TypeScript file read from stdin

  yarn-esbuild app.ts --bundle --watch
      Automatically rebuild when input files are changed

  yarn-esbuild app.ts --bundle --servedir=www --outdir=www/js --serve
      Start a local HTTP server for everything in \"www\"";

/// Errors produced while reading the command line
#[derive(Debug, Error)]
pub enum ArgsError {
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("invalid value \"{entry}\" for --{flag}: expected K=V")]
    MalformedEntry { flag: &'static str, entry: String },

    #[error("invalid loader \"{loader}\" in \"{entry}\" for --{flag}")]
    InvalidLoader {
        flag: &'static str,
        entry: String,
        loader: String,
    },
}

/// Result of parsing one invocation
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    pub entry_points: Vec<String>,
    values: Options,
    explicit: BTreeSet<&'static str>,
}

impl ParsedArgs {
    /// Normalized value for a flag, by command-line name
    pub fn value(&self, name: &str) -> Option<&OptionValue> {
        schema::by_name(name).and_then(|spec| self.values.get(spec.key))
    }

    pub fn flag(&self, name: &str) -> bool {
        self.value(name).and_then(OptionValue::as_bool).unwrap_or(false)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(OptionValue::as_str)
    }

    pub fn number(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(OptionValue::as_number)
    }

    /// Whether the flag was given by the user rather than filled by a default
    pub fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    /// Logger verbosity: an explicit `--log-level` wins, then `--verbose`,
    /// otherwise nothing is logged.
    pub fn log_level(&self) -> LogLevel {
        if self.is_explicit("log-level") {
            if let Some(level) = self.string("log-level").and_then(LogLevel::from_name) {
                return level;
            }
        }
        if self.flag("verbose") {
            LogLevel::Debug
        } else {
            LogLevel::Silent
        }
    }

    /// Serve or watch mode was requested
    pub fn is_long_running(&self) -> bool {
        self.flag("watch") || matches!(self.value("serve"), Some(value) if value != &OptionValue::Bool(false))
    }

    /// The option object forwarded to the bundler
    pub fn bundler_options(&self) -> Options {
        let mut options: Options = self
            .values
            .iter()
            .filter(|(key, _)| schema::by_key(key).is_some_and(|spec| spec.forward))
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();

        match options.get("serve") {
            Some(OptionValue::Bool(true)) => {
                let host = self.string("host").unwrap_or("0.0.0.0");
                let port = self.number("port").unwrap_or(8000);
                options.insert("serve", OptionValue::Str(format!("{host}:{port}")));
            }
            _ => {}
        }

        // esbuild spells "off" for these by leaving the flag out
        let disabled: Vec<String> = options
            .iter()
            .filter(|(key, value)| {
                **value == OptionValue::Bool(false)
                    && schema::by_key(key).is_some_and(|spec| spec.coercion == Coercion::Boolish)
            })
            .map(|(key, _)| key.to_string())
            .collect();
        for key in disabled {
            options.remove(&key);
        }
        options
    }

    /// Assemble the build for the delegator
    pub fn build_options(&self, cwd: PathBuf, node_paths: Vec<PathBuf>) -> BuildOptions {
        BuildOptions {
            entry_points: self.entry_points.clone(),
            options: self.bundler_options(),
            node_paths,
            plugins: Vec::new(),
            cwd,
        }
    }
}

/// The clap command generated from the flag table
pub fn command() -> Command {
    let entry_points = Arg::new(ENTRY_POINTS)
        .value_name("ENTRY POINTS")
        .num_args(1..)
        .action(ArgAction::Append);

    FLAGS.iter().fold(
        Command::new("yarn-esbuild")
            .about("Command-line front end for esbuild with Yarn Plug'n'Play support")
            .override_usage("yarn-esbuild [options] [entry points]")
            .after_help(EXAMPLES)
            .disable_version_flag(true)
            .args_override_self(true)
            .arg(entry_points),
        |command, spec| command.arg(spec.to_arg()),
    )
}

/// Rewrite esbuild's `--name:payload` syntax into `--name=payload` for
/// repeatable flags.
fn normalize_structured(arg: String) -> String {
    let Some(rest) = arg.strip_prefix("--") else {
        return arg;
    };
    let Some((name, payload)) = rest.split_once(':') else {
        return arg;
    };
    match schema::by_name(name) {
        Some(spec) if spec.kind == FlagKind::Repeated => format!("--{name}={payload}"),
        _ => arg,
    }
}

/// Parse the arguments that follow the program name
pub fn parse_args<I, T>(args: I) -> Result<ParsedArgs, ArgsError>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    parse_args_with_defaults(Vec::new(), args)
}

/// Parse with `defaults` treated as if typed before the user's arguments
pub fn parse_args_with_defaults<I, T>(defaults: Vec<String>, args: I) -> Result<ParsedArgs, ArgsError>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut argv = vec!["yarn-esbuild".to_string()];
    argv.extend(defaults);

    let mut passthrough = false;
    for arg in args.into_iter().map(Into::into) {
        if passthrough {
            argv.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            argv.push(arg);
            continue;
        }
        argv.push(normalize_structured(arg));
    }

    let matches = command().try_get_matches_from(argv)?;
    from_matches(&matches)
}

fn from_matches(matches: &ArgMatches) -> Result<ParsedArgs, ArgsError> {
    let entry_points = matches
        .get_many::<String>(ENTRY_POINTS)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut values = Options::new();
    let mut explicit = BTreeSet::new();

    for spec in FLAGS {
        if matches.value_source(spec.name) == Some(ValueSource::CommandLine) {
            explicit.insert(spec.name);
        }
        if let Some(value) = extract(spec, matches)? {
            values.insert(spec.key, value);
        }
    }

    Ok(ParsedArgs {
        entry_points,
        values,
        explicit,
    })
}

fn extract(spec: &'static FlagSpec, matches: &ArgMatches) -> Result<Option<OptionValue>, ArgsError> {
    let value = match spec.kind {
        FlagKind::Flag => matches.get_one::<bool>(spec.name).copied().map(OptionValue::Bool),
        FlagKind::Number => matches.get_one::<i64>(spec.name).copied().map(OptionValue::Number),
        FlagKind::String | FlagKind::OptionalValue => match matches.get_one::<String>(spec.name) {
            Some(raw) => Some(coerce_one(spec, raw.clone())),
            None => None,
        },
        FlagKind::Repeated => match matches.get_many::<String>(spec.name) {
            Some(raw) => Some(coerce_many(spec, raw.cloned().collect())?),
            None => None,
        },
    };
    Ok(value)
}

fn coerce_one(spec: &FlagSpec, raw: String) -> OptionValue {
    match (spec.coercion, raw.as_str()) {
        (Coercion::Boolish, "true") => OptionValue::Bool(true),
        (Coercion::Boolish, "false") => OptionValue::Bool(false),
        _ => OptionValue::Str(raw),
    }
}

fn coerce_many(spec: &'static FlagSpec, entries: Vec<String>) -> Result<OptionValue, ArgsError> {
    match spec.coercion {
        Coercion::KeyValue => Ok(OptionValue::Map(key_values(spec.name, &entries)?)),
        Coercion::Loader => {
            // A lone `--loader=L` is the loader for stdin input
            if let [entry] = entries.as_slice() {
                if LOADERS.contains(&entry.as_str()) {
                    return Ok(OptionValue::Str(entry.clone()));
                }
            }
            let loaders = key_values(spec.name, &entries)?;
            if let Some((ext, loader)) = loaders.iter().find(|(_, loader)| !LOADERS.contains(&loader.as_str())) {
                return Err(ArgsError::InvalidLoader {
                    flag: spec.name,
                    entry: format!("{ext}={loader}"),
                    loader: loader.clone(),
                });
            }
            Ok(OptionValue::Map(loaders))
        }
        Coercion::CommaList => Ok(OptionValue::List(
            entries
                .iter()
                .flat_map(|entry| entry.split(','))
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        Coercion::None | Coercion::Boolish => Ok(OptionValue::List(entries)),
    }
}

/// Split `K=V` entries at the first `=`; later keys win
fn key_values(flag: &'static str, entries: &[String]) -> Result<BTreeMap<String, String>, ArgsError> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            None => Err(ArgsError::MalformedEntry {
                flag,
                entry: entry.clone(),
            }),
        })
        .collect()
}
