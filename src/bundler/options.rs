//! Normalized build options handed to the bundler

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::plugins::Plugin;

/// A single parsed and coerced option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(i64),
    Str(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            OptionValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

/// Option name (camelCase, as the bundler spells it) to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, OptionValue>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue) -> Option<OptionValue> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True only when the option is present and set to `true`
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).and_then(OptionValue::as_bool).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl FromIterator<(String, OptionValue)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything the bundler needs for one build
#[derive(Clone, Default)]
pub struct BuildOptions {
    /// Entry point paths, in the order given
    pub entry_points: Vec<String>,

    /// Bundler option object
    pub options: Options,

    /// Extra module search directories (from `NODE_PATH`)
    pub node_paths: Vec<PathBuf>,

    /// Plugins applied to the build, in order
    pub plugins: Vec<Arc<dyn Plugin>>,

    /// Working directory of the build
    pub cwd: PathBuf,
}

impl BuildOptions {
    /// Names of the registered plugins
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin.name() == name)
    }

    /// Watch or serve mode keeps the bundler running after the first build
    pub fn is_long_running(&self) -> bool {
        self.options.is_enabled("watch") || self.options.contains("serve")
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("entry_points", &self.entry_points)
            .field("options", &self.options)
            .field("node_paths", &self.node_paths)
            .field("plugins", &self.plugin_names())
            .field("cwd", &self.cwd)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_options_serialize_as_bundler_object() {
        let mut options = Options::new();
        options.insert("bundle", true.into());
        options.insert("outfile", "out.js".into());
        options.insert(
            "define",
            OptionValue::Map(BTreeMap::from([("RELEASE".to_string(), "true".to_string())])),
        );
        options.insert("logLimit", OptionValue::Number(6));

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "bundle": true,
                "define": { "RELEASE": "true" },
                "logLimit": 6,
                "outfile": "out.js",
            })
        );
    }

    #[test]
    fn test_long_running_modes() {
        let mut build = BuildOptions::default();
        assert!(!build.is_long_running());

        build.options.insert("watch", false.into());
        assert!(!build.is_long_running());

        build.options.insert("serve", "0.0.0.0:8000".into());
        assert!(build.is_long_running());
    }
}
