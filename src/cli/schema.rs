//! The flag table
//!
//! Every recognized flag is declared exactly once in [`FLAGS`]. The parser
//! builds its clap command from this table, and the process bundler uses the
//! same entries to render normalized values back into esbuild flag syntax.

use std::collections::HashMap;

use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction};
use once_cell::sync::Lazy;

use crate::bundler::OptionValue;

/// How a flag consumes values on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Boolean; `--name` or `--name=true|false`
    Flag,
    /// Single string value
    String,
    /// Single integer value
    Number,
    /// May be given many times, values accumulate in order
    Repeated,
    /// `--name` alone or `--name=value`
    OptionalValue,
}

/// Post-parse transform applied to the raw value(s) of a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    None,
    /// `K=V` entries into a mapping
    KeyValue,
    /// `.ext=loader` entries into a mapping, loader names validated
    Loader,
    /// Comma-separated entries flattened into one list
    CommaList,
    /// `true`/`false` become booleans, anything else stays a string
    Boolish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Simple,
    Advanced,
    Serve,
    Internal,
}

impl Group {
    pub fn heading(self) -> &'static str {
        match self {
            Group::Simple => "Simple options",
            Group::Advanced => "Advanced options",
            Group::Serve => "Serve options",
            Group::Internal => "Internal options",
        }
    }
}

/// Declaration of a single flag
#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    /// Flag name as typed, without the leading `--`
    pub name: &'static str,
    /// Key in the normalized option object
    pub key: &'static str,
    pub kind: FlagKind,
    pub choices: &'static [&'static str],
    pub defaults: &'static [&'static str],
    pub coercion: Coercion,
    /// Whether the value is part of the bundler option object
    pub forward: bool,
    pub hidden: bool,
    pub group: Group,
    pub help: &'static str,
}

impl FlagSpec {
    const fn new(name: &'static str, key: &'static str, kind: FlagKind, help: &'static str) -> Self {
        Self {
            name,
            key,
            kind,
            choices: &[],
            defaults: &[],
            coercion: Coercion::None,
            forward: true,
            hidden: false,
            group: Group::Simple,
            help,
        }
    }

    const fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }

    const fn defaults(mut self, defaults: &'static [&'static str]) -> Self {
        self.defaults = defaults;
        self
    }

    const fn coerce(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    const fn advanced(mut self) -> Self {
        self.group = Group::Advanced;
        self
    }

    const fn serve(mut self) -> Self {
        self.group = Group::Serve;
        self.forward = false;
        self
    }

    const fn internal(mut self) -> Self {
        self.group = Group::Internal;
        self.hidden = true;
        self
    }

    const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    const fn cli_only(mut self) -> Self {
        self.forward = false;
        self
    }

    /// The clap argument for this flag
    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name)
            .long(self.name)
            .help(self.help)
            .hide(self.hidden)
            .help_heading(self.group.heading());

        arg = match self.kind {
            FlagKind::Flag => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(clap::value_parser!(bool))
                .action(ArgAction::Set),
            FlagKind::String => arg.num_args(1).allow_hyphen_values(true).action(ArgAction::Set),
            FlagKind::Number => arg
                .num_args(1)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64))
                .action(ArgAction::Set),
            FlagKind::Repeated => arg.num_args(1).allow_hyphen_values(true).action(ArgAction::Append),
            FlagKind::OptionalValue => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .action(ArgAction::Set),
        };

        if !self.choices.is_empty() {
            arg = arg.value_parser(PossibleValuesParser::new(self.choices.iter().copied()));
        }
        if !self.defaults.is_empty() {
            arg = arg.default_values(self.defaults.iter().copied());
        }
        arg
    }

    /// Render a normalized value back into esbuild flag syntax
    pub fn render(&self, value: &OptionValue) -> Vec<String> {
        let name = self.name;
        match value {
            OptionValue::Bool(true) => vec![format!("--{name}")],
            OptionValue::Bool(false) => vec![format!("--{name}=false")],
            OptionValue::Number(number) => vec![format!("--{name}={number}")],
            OptionValue::Str(text) => vec![format!("--{name}={text}")],
            OptionValue::List(items) if self.coercion == Coercion::CommaList => {
                vec![format!("--{name}={}", items.join(","))]
            }
            OptionValue::List(items) => items.iter().map(|item| format!("--{name}:{item}")).collect(),
            OptionValue::Map(entries) => entries
                .iter()
                .map(|(key, value)| format!("--{name}:{key}={value}"))
                .collect(),
        }
    }
}

pub const FORMATS: &[&str] = &["life", "cjs", "esm"];
pub const PLATFORMS: &[&str] = &["browser", "node", "neutral"];
pub const SOURCEMAPS: &[&str] = &["true", "false", "inline", "external", "both", "linked"];
pub const LOADERS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "css", "json", "text", "base64", "file", "dataurl", "binary",
    "default",
];
pub const LOG_LEVELS: &[&str] = &["verbose", "debug", "info", "warning", "error", "silent"];
pub const LEGAL_COMMENTS: &[&str] = &["none", "inline", "eof", "linked", "external"];
pub const CHARSETS: &[&str] = &["ascii", "utf8"];
pub const JSX_MODES: &[&str] = &["transform", "preserve"];
pub const DROPS: &[&str] = &["console", "debugger"];

use FlagKind::{Flag, Number, OptionalValue, Repeated, String as Str};

pub static FLAGS: &[FlagSpec] = &[
    // Simple options
    FlagSpec::new("bundle", "bundle", Flag, "Bundle all dependencies into the output files"),
    FlagSpec::new("define", "define", Repeated, "Substitute K with V while parsing (--define:K=V)")
        .coerce(Coercion::KeyValue),
    FlagSpec::new("external", "external", Repeated, "Exclude module M from the bundle (can use * wildcards)"),
    FlagSpec::new("format", "format", Str, "Output format (no default when not bundling, otherwise iife for browser and cjs for node)")
        .choices(FORMATS),
    FlagSpec::new("loader", "loader", Repeated, "Use loader L to load file extension X (--loader:X=L)")
        .coerce(Coercion::Loader),
    FlagSpec::new("minify", "minify", Flag, "Minify the output (sets all --minify-* flags)"),
    FlagSpec::new("outdir", "outdir", Str, "The output directory (for multiple entry points)"),
    FlagSpec::new("outfile", "outfile", Str, "The output file (for one entry point)"),
    FlagSpec::new("platform", "platform", Str, "Platform target")
        .choices(PLATFORMS)
        .defaults(&["browser"]),
    FlagSpec::new("serve", "serve", OptionalValue, "Start a local HTTP server on this host:port for outputs")
        .coerce(Coercion::Boolish),
    FlagSpec::new("sourcemap", "sourcemap", OptionalValue, "Emit a source map")
        .choices(SOURCEMAPS)
        .coerce(Coercion::Boolish),
    FlagSpec::new("splitting", "splitting", Flag, "Enable code splitting (currently only for esm)"),
    FlagSpec::new("target", "target", Str, "Environment target (e.g. es2017, chrome58, node10, default esnext)"),
    FlagSpec::new("watch", "watch", Flag, "Watch mode: rebuild on file system changes"),
    // Advanced options
    FlagSpec::new("allow-overwrite", "allowOverwrite", Flag, "Allow output files to overwrite input files").advanced(),
    FlagSpec::new("analyze", "analyze", OptionalValue, "Print a report about the contents of the bundle (--analyze=verbose for detail)")
        .choices(&["true", "false", "verbose"])
        .coerce(Coercion::Boolish)
        .advanced(),
    FlagSpec::new("asset-names", "assetNames", Str, "Path template to use for \"file\" loader files (default \"[name]-[hash]\")").advanced(),
    FlagSpec::new("banner", "banner", Repeated, "Text to be prepended to each output file of type T (--banner:T=text)")
        .coerce(Coercion::KeyValue)
        .advanced(),
    FlagSpec::new("charset", "charset", Str, "Output charset (utf8 leaves UTF-8 code points unescaped)")
        .choices(CHARSETS)
        .defaults(&["utf8"])
        .advanced(),
    FlagSpec::new("chunk-names", "chunkNames", Str, "Path template to use for code splitting chunks (default \"[name]-[hash]\")").advanced(),
    FlagSpec::new("color", "color", Flag, "Force use of color terminal escapes").advanced(),
    FlagSpec::new("drop", "drop", Repeated, "Remove certain constructs")
        .choices(DROPS)
        .advanced(),
    FlagSpec::new("entry-names", "entryNames", Str, "Path template to use for entry point output paths (default \"[dir]/[name]\")").advanced(),
    FlagSpec::new("footer", "footer", Repeated, "Text to be appended to each output file of type T (--footer:T=text)")
        .coerce(Coercion::KeyValue)
        .advanced(),
    FlagSpec::new("global-name", "globalName", Str, "The name of the global for the IIFE format").advanced(),
    FlagSpec::new("ignore-annotations", "ignoreAnnotations", Flag, "Enable this to work with packages that have incorrect tree-shaking annotations").advanced(),
    FlagSpec::new("inject", "inject", Repeated, "Import the file F into all input files and automatically replace matching globals with imports").advanced(),
    FlagSpec::new("jsx", "jsx", Str, "Set to \"preserve\" to disable transforming JSX to JS")
        .choices(JSX_MODES)
        .defaults(&["transform"])
        .advanced(),
    FlagSpec::new("jsx-factory", "jsxFactory", Str, "What to use for JSX instead of React.createElement").advanced(),
    FlagSpec::new("jsx-fragment", "jsxFragment", Str, "What to use for JSX instead of React.Fragment").advanced(),
    FlagSpec::new("keep-names", "keepNames", Flag, "Preserve \"name\" on functions and classes").advanced(),
    FlagSpec::new("legal-comments", "legalComments", Str, "Where to place legal comments")
        .choices(LEGAL_COMMENTS)
        .defaults(&["eof"])
        .advanced(),
    FlagSpec::new("log-level", "logLevel", Str, "Disable logging or change its verbosity")
        .choices(LOG_LEVELS)
        .defaults(&["info"])
        .advanced(),
    FlagSpec::new("log-limit", "logLimit", Number, "Maximum message count or 0 to disable")
        .defaults(&["6"])
        .advanced(),
    FlagSpec::new("main-fields", "mainFields", Repeated, "Override the main file order in package.json")
        .coerce(Coercion::CommaList)
        .advanced(),
    FlagSpec::new("metafile", "metafile", Str, "Write metadata about the build to a JSON file").advanced(),
    FlagSpec::new("minify-whitespace", "minifyWhitespace", Flag, "Remove whitespace in output files").advanced(),
    FlagSpec::new("minify-identifiers", "minifyIdentifiers", Flag, "Shorten identifiers in output files").advanced(),
    FlagSpec::new("minify-syntax", "minifySyntax", Flag, "Use equivalent but shorter syntax in output files").advanced(),
    FlagSpec::new("out-extension", "outExtension", Repeated, "Use a custom output extension instead of \".js\" (--out-extension:.js=.mjs)")
        .coerce(Coercion::KeyValue)
        .advanced(),
    FlagSpec::new("outbase", "outbase", Str, "The base path used to determine entry point output paths (for multiple entry points)").advanced(),
    FlagSpec::new("preserve-symlinks", "preserveSymlinks", Flag, "Disable symlink resolution for module lookup").advanced(),
    FlagSpec::new("public-path", "publicPath", Str, "Set the base URL for the \"file\" loader").advanced(),
    FlagSpec::new("pure", "pure", Repeated, "Mark the name N as a pure function for tree shaking").advanced(),
    FlagSpec::new("resolve-extensions", "resolveExtensions", Repeated, "A comma-separated list of implicit extensions")
        .coerce(Coercion::CommaList)
        .defaults(&[".tsx,.ts,.jsx,.js,.css,.json"])
        .advanced(),
    FlagSpec::new("servedir", "servedir", Str, "What to serve in addition to generated output files")
        .advanced()
        .hidden(),
    FlagSpec::new("source-root", "sourceRoot", Str, "Sets the \"sourceRoot\" field in generated source maps").advanced(),
    FlagSpec::new("sourcefile", "sourcefile", Str, "Set the source file for the source map (for stdin)").advanced(),
    FlagSpec::new("sources-content", "sourcesContent", Flag, "Set to false to omit \"sourcesContent\" in generated source maps").advanced(),
    FlagSpec::new("tree-shaking", "treeShaking", Flag, "Force tree shaking on or off (false | true)").advanced(),
    FlagSpec::new("tsconfig", "tsconfig", Str, "Use this tsconfig.json file instead of other ones").advanced(),
    FlagSpec::new("version", "version", Flag, "Print the current version and exit")
        .advanced()
        .cli_only(),
    // Serve options
    FlagSpec::new("host", "host", Str, "The HTTP host used by a bare --serve")
        .defaults(&["0.0.0.0"])
        .serve(),
    FlagSpec::new("port", "port", Number, "The HTTP port used by a bare --serve")
        .defaults(&["8000"])
        .serve(),
    // Internal options
    FlagSpec::new("service", "service", Str, "Host version for service mode").internal().cli_only(),
    FlagSpec::new("ping", "ping", Flag, "Health check for service mode").internal().cli_only(),
    FlagSpec::new("verbose", "verbose", Flag, "Shorthand for debug logging").internal().cli_only(),
    FlagSpec::new("heap", "heap", Str, "Write a heap profile").internal(),
    FlagSpec::new("trace", "trace", Str, "Write a runtime trace").internal(),
    FlagSpec::new("timing", "timing", Flag, "Print internal timing").internal(),
    FlagSpec::new("cpuprofile", "cpuprofile", Str, "Write a CPU profile").internal(),
];

static BY_NAME: Lazy<HashMap<&'static str, &'static FlagSpec>> =
    Lazy::new(|| FLAGS.iter().map(|spec| (spec.name, spec)).collect());

static BY_KEY: Lazy<HashMap<&'static str, &'static FlagSpec>> =
    Lazy::new(|| FLAGS.iter().map(|spec| (spec.key, spec)).collect());

/// Look up a flag by its command-line name
pub fn by_name(name: &str) -> Option<&'static FlagSpec> {
    BY_NAME.get(name).copied()
}

/// Look up a flag by its normalized option key
pub fn by_key(key: &str) -> Option<&'static FlagSpec> {
    BY_KEY.get(key).copied()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;

    #[test]
    fn test_names_and_keys_are_unique() {
        let names: HashSet<_> = FLAGS.iter().map(|spec| spec.name).collect();
        let keys: HashSet<_> = FLAGS.iter().map(|spec| spec.key).collect();
        assert_eq!(names.len(), FLAGS.len());
        assert_eq!(keys.len(), FLAGS.len());
    }

    #[test]
    fn test_defaults_are_valid_choices() {
        for spec in FLAGS.iter().filter(|spec| !spec.choices.is_empty()) {
            for default in spec.defaults {
                assert!(spec.choices.contains(default), "{} default {default}", spec.name);
            }
        }
    }

    #[test]
    fn test_cli_only_flags() {
        for name in ["service", "ping", "verbose", "host", "port", "version"] {
            assert!(!by_name(name).unwrap().forward, "{name} must not be forwarded");
        }
        assert!(by_name("servedir").unwrap().forward);
        assert!(by_name("servedir").unwrap().hidden);
    }

    #[test]
    fn test_format_choices_kept_verbatim() {
        assert_eq!(by_name("format").unwrap().choices, &["life", "cjs", "esm"]);
    }

    #[test]
    fn test_render() {
        let define = by_key("define").unwrap();
        let entries = BTreeMap::from([("DEBUG".to_string(), "false".to_string())]);
        assert_eq!(define.render(&OptionValue::Map(entries)), vec!["--define:DEBUG=false"]);

        let external = by_key("external").unwrap();
        let modules = OptionValue::List(vec!["fs".into(), "path".into()]);
        assert_eq!(external.render(&modules), vec!["--external:fs", "--external:path"]);

        let extensions = by_key("resolveExtensions").unwrap();
        let list = OptionValue::List(vec![".ts".into(), ".js".into()]);
        assert_eq!(extensions.render(&list), vec!["--resolve-extensions=.ts,.js"]);

        let tree_shaking = by_key("treeShaking").unwrap();
        assert_eq!(tree_shaking.render(&false.into()), vec!["--tree-shaking=false"]);
        assert_eq!(tree_shaking.render(&true.into()), vec!["--tree-shaking"]);

        let limit = by_key("logLimit").unwrap();
        assert_eq!(limit.render(&OptionValue::Number(0)), vec!["--log-limit=0"]);
    }
}
