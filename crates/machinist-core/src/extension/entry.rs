//! A single extension map entry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TRACING_TARGET_EXTENSION;

/// Options attached to an extension entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionOptions {
    /// Node types this extension claims even if others list them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preemptions: Vec<String>,
    /// Last-resort regular expression matched against node type names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodename_pattern: Option<String>,
    /// Display title, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_aux: Option<String>,
}

impl ExtensionOptions {
    /// Reads options from a JSON object, ignoring fields of the wrong type.
    pub(crate) fn from_value(value: &Value) -> Self {
        Self {
            preemptions: value.get("preemptions").map(string_list).unwrap_or_default(),
            nodename_pattern: value
                .get("nodename_pattern")
                .and_then(Value::as_str)
                .map(str::to_owned),
            title_aux: value
                .get("title_aux")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// Node types provided by one extension plus its options.
///
/// The node name pattern is compiled once when the options are attached.
/// A pattern that fails to compile is logged and ignored; the entry keeps
/// its node list.
#[derive(Debug, Clone, Default)]
pub struct ExtensionEntry {
    node_types: Vec<String>,
    options: ExtensionOptions,
    pattern: Option<Regex>,
}

impl ExtensionEntry {
    /// Creates an entry providing the given node types.
    pub fn new<I, S>(node_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            node_types: node_types.into_iter().map(Into::into).collect(),
            options: ExtensionOptions::default(),
            pattern: None,
        }
    }

    /// Replaces the options and compiles the node name pattern.
    pub fn with_options(mut self, options: ExtensionOptions) -> Self {
        self.pattern = options.nodename_pattern.as_deref().and_then(compile_pattern);
        self.options = options;
        self
    }

    /// Sets the node types this extension preempts.
    pub fn with_preemptions<I, S>(mut self, preemptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.preemptions = preemptions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets and compiles the node name pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.pattern = compile_pattern(&pattern);
        self.options.nodename_pattern = Some(pattern);
        self
    }

    /// Sets the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.options.title_aux = Some(title.into());
        self
    }

    /// Returns the node types listed by this entry.
    pub fn node_types(&self) -> &[String] {
        &self.node_types
    }

    /// Returns the entry options.
    pub fn options(&self) -> &ExtensionOptions {
        &self.options
    }

    /// Returns the node types this entry preempts.
    pub fn preemptions(&self) -> &[String] {
        &self.options.preemptions
    }

    /// Returns the compiled node name pattern, if any.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Returns the display title, if any.
    pub fn title(&self) -> Option<&str> {
        self.options.title_aux.as_deref()
    }

    /// Returns true if this entry lists the given node type.
    pub fn provides(&self, node_type: &str) -> bool {
        self.node_types.iter().any(|listed| listed == node_type)
    }

    /// Reads an entry from its `[[node types...], {options}]` source shape.
    ///
    /// Returns `None` when the value is not an array. Non-string node types
    /// are dropped and missing options default to empty.
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        let parts = value.as_array()?;
        let node_types = parts.first().map(string_list).unwrap_or_default();
        let options = parts
            .get(1)
            .map(ExtensionOptions::from_value)
            .unwrap_or_default();

        Some(Self::new(node_types).with_options(options))
    }
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET_EXTENSION,
                pattern,
                error = %error,
                "ignoring node name pattern that does not compile"
            );
            None
        }
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_source_shape() {
        let entry = ExtensionEntry::from_value(&json!([
            ["IPAdapter", 7, "IPAdapterAdvanced"],
            {"preemptions": ["IPAdapter"], "nodename_pattern": "^IPAdapter", "title_aux": "IPAdapter plus"}
        ]))
        .unwrap();

        assert_eq!(entry.node_types(), ["IPAdapter", "IPAdapterAdvanced"]);
        assert_eq!(entry.preemptions(), ["IPAdapter"]);
        assert_eq!(entry.title(), Some("IPAdapter plus"));
        assert!(entry.pattern().unwrap().is_match("IPAdapterTiled"));
        assert!(entry.provides("IPAdapter"));
        assert!(!entry.provides("KSampler"));
    }

    #[test]
    fn missing_options_default_to_empty() {
        let entry = ExtensionEntry::from_value(&json!([["A"]])).unwrap();
        assert_eq!(entry.options(), &ExtensionOptions::default());
        assert!(entry.pattern().is_none());

        assert!(ExtensionEntry::from_value(&json!({"A": 1})).is_none());
    }

    #[test]
    fn invalid_pattern_keeps_node_list() {
        let entry = ExtensionEntry::new(["A", "B"]).with_pattern("(unclosed");
        assert!(entry.pattern().is_none());
        assert_eq!(entry.options().nodename_pattern.as_deref(), Some("(unclosed"));
        assert_eq!(entry.node_types(), ["A", "B"]);
    }

    #[test]
    fn wrong_typed_options_are_ignored() {
        let entry = ExtensionEntry::from_value(&json!([
            [],
            {"preemptions": "A", "nodename_pattern": 3}
        ]))
        .unwrap();
        assert!(entry.preemptions().is_empty());
        assert!(entry.pattern().is_none());
    }
}
