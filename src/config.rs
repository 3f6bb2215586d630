//! Flat key/value configuration.
//!
//! Properties drive everything the pipeline does: which passes run, the
//! attribute and style rewrite rules, serialization settings, and the OPF
//! metadata. The on-disk format is the classic `key = value` properties
//! file (`#`/`!` comments), discovered next to the input document and
//! merged with caller-registered values.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Well-known property keys.
pub const PROP_ATTRIBUTE_REMOVE: &str = "attribute.remove";
pub const PROP_ATTRIBUTE_REPLACE: &str = "attribute.replace";
pub const PROP_ESCAPED_CHARS: &str = "escaped.chars";
pub const PROP_INPUT_CHARSET: &str = "input.charset";
pub const PROP_OPF_COVER_IMAGE: &str = "opf.manifest.cover.image";
pub const PROP_OPF_COVER_IMAGE_TYPE: &str = "opf.manifest.cover.image.type";
pub const PROP_OPF_METADATA_AUTHOR: &str = "opf.metadata.author";
pub const PROP_OPF_METADATA_LANGUAGE: &str = "opf.metadata.language";
pub const PROP_OPF_METADATA_TITLE: &str = "opf.metadata.title";
pub const PROP_OUTPUT_ENCODING: &str = "output.encoding";
pub const PROP_OUTPUT_FORMAT: &str = "output.format";
pub const PROP_STYLE_REPLACE: &str = "style.replace";
pub const PROP_STYLE_REPLACE_WHITELIST: &str = "style.replace.whitelist";
pub const PROP_TRANSFORMER: &str = "transformer";

pub const OUTPUT_FORMAT_COMPACT: &str = "compact";
pub const OUTPUT_FORMAT_PRETTY: &str = "pretty";

/// Name of the configuration file discovered beside the input document.
pub const CONFIG_FILE_NAME: &str = "wordbook.properties";

/// Ordered property map with deterministic (sorted) key iteration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    properties: HashMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// All keys in sorted order. Rule evaluation and pass registration
    /// depend on this being deterministic.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.properties.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Keys with the given dotted prefix, sorted.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &str) -> Vec<&'a str> {
        let dotted = format!("{prefix}.");
        let mut keys: Vec<&str> = self
            .properties
            .keys()
            .map(|s| s.as_str())
            .filter(|k| k.starts_with(&dotted))
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Merge `overrides` into a copy of self; an override wins on key
    /// collision.
    pub fn merged(&self, overrides: &Config) -> Config {
        let mut result = self.clone();
        for (k, v) in &overrides.properties {
            result.properties.insert(k.clone(), v.clone());
        }
        result
    }

    /// Parse properties-file text (`key = value`, `#`/`!` comments).
    pub fn parse(text: &str) -> Config {
        let mut config = Config::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            if let Some(eq) = line.find('=') {
                let key = line[..eq].trim();
                let value = line[eq + 1..].trim();
                if !key.is_empty() {
                    config.set(key, value);
                }
            }
        }
        config
    }

    /// Load a properties file.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        Ok(Config::parse(&text))
    }

    /// Discover `wordbook.properties` beside the input file. Returns an
    /// empty config when none exists.
    pub fn load_beside(input: &Path) -> Result<Config> {
        let basedir = input.parent().unwrap_or_else(|| Path::new("."));
        let config_file = basedir.join(CONFIG_FILE_NAME);
        log::debug!("Search configuration: {}", config_file.display());
        if config_file.is_file() {
            log::debug!("Load configuration from: {}", config_file.display());
            Config::load(&config_file)
        } else {
            Ok(Config::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_properties() {
        let config = Config::parse(
            "# comment\n\
             ! also a comment\n\
             output.format = pretty\n\
             opf.metadata.title=My Book\n\
             \n\
             attribute.replace.body.style = ,\n",
        );
        assert_eq!(config.get("output.format"), Some("pretty"));
        assert_eq!(config.get("opf.metadata.title"), Some("My Book"));
        assert_eq!(config.get("attribute.replace.body.style"), Some(","));
        assert_eq!(config.len(), 3);
    }

    #[test]
    fn sorted_keys_are_deterministic() {
        let mut config = Config::new();
        config.set("transformer.02", "style");
        config.set("transformer.01", "attribute");
        config.set("transformer.10", "opf");
        assert_eq!(
            config.sorted_keys(),
            vec!["transformer.01", "transformer.02", "transformer.10"]
        );
    }

    #[test]
    fn prefix_filter() {
        let mut config = Config::new();
        config.set("style.replace.heading", "h.*,Heading");
        config.set("style.replace.whitelist", "Toc");
        config.set("attribute.remove.p.style", "true");
        let keys = config.keys_with_prefix(PROP_STYLE_REPLACE);
        assert_eq!(keys, vec!["style.replace.heading", "style.replace.whitelist"]);
    }

    #[test]
    fn merge_override_wins() {
        let mut base = Config::new();
        base.set("output.format", "compact");
        base.set("opf.metadata.title", "From File");
        let mut overrides = Config::new();
        overrides.set("output.format", "pretty");

        let merged = base.merged(&overrides);
        assert_eq!(merged.get("output.format"), Some("pretty"));
        assert_eq!(merged.get("opf.metadata.title"), Some("From File"));
    }
}
