//! Insertion-ordered extension map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

use super::ExtensionEntry;
use crate::{Error, Result, TRACING_TARGET_EXTENSION};

/// Key of the entry whose node types are built into the pipeline tool.
pub const CORE_EXTENSION_ID: &str = "https://github.com/comfyanonymous/ComfyUI";

/// Extensions moved to the front of iteration order after loading.
///
/// Earlier entries win reverse-index ties, so listing an extension here
/// makes it the owner of node types it shares with others.
pub const PRIORITY_EXTENSIONS: &[&str] = &["https://github.com/cubiq/ComfyUI_IPAdapter_plus"];

/// Snapshot shipped with the crate for offline operation.
const BUNDLED_MAP: &str = include_str!("../../data/extension-node-map.json");

/// Where an extension map came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtensionSource {
    /// Fetched from the upstream document.
    Remote,
    /// Parsed from the snapshot shipped with the crate.
    Bundled,
    /// Built in memory.
    #[default]
    Memory,
}

/// Mapping from extension identifier to the node types it provides.
///
/// Iteration order is insertion order and is significant for resolution.
/// Exactly one key is designated as the core entry.
#[derive(Debug, Clone)]
pub struct ExtensionMap {
    entries: IndexMap<String, ExtensionEntry>,
    core_id: String,
    source: ExtensionSource,
}

impl Default for ExtensionMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionMap {
    /// Creates an empty map with the default core identifier.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            core_id: CORE_EXTENSION_ID.to_owned(),
            source: ExtensionSource::Memory,
        }
    }

    /// Parses a map from its JSON document shape.
    ///
    /// The document must be a JSON object. Entries that are not arrays are
    /// skipped with a warning.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::invalid_input().with_message("extension map must be a json object")
        })?;

        let mut map = Self::new();
        for (id, entry) in object {
            match ExtensionEntry::from_value(entry) {
                Some(entry) => {
                    map.entries.insert(id.clone(), entry);
                }
                None => {
                    tracing::warn!(
                        target: TRACING_TARGET_EXTENSION,
                        extension = %id,
                        "skipping malformed extension map entry"
                    );
                }
            }
        }

        Ok(map)
    }

    /// Parses a map from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&value)
    }

    /// Returns the snapshot shipped with the crate.
    ///
    /// The snapshot is a pruned subset of the upstream map, so node types
    /// from extensions it omits resolve as unknown.
    pub fn bundled() -> Self {
        match Self::from_slice(BUNDLED_MAP.as_bytes()) {
            Ok(map) => map.with_source(ExtensionSource::Bundled),
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_EXTENSION,
                    error = %error,
                    "bundled extension map is unreadable, using an empty map"
                );
                Self::new().with_source(ExtensionSource::Bundled)
            }
        }
    }

    /// Sets the identifier of the core entry.
    pub fn with_core_id(mut self, core_id: impl Into<String>) -> Self {
        self.core_id = core_id.into();
        self
    }

    /// Records where the map came from.
    pub fn with_source(mut self, source: ExtensionSource) -> Self {
        self.source = source;
        self
    }

    /// Appends an entry, replacing any entry with the same identifier in place.
    pub fn with_entry(mut self, id: impl Into<String>, entry: ExtensionEntry) -> Self {
        self.insert(id, entry);
        self
    }

    /// Inserts an entry, returning the one it replaced.
    pub fn insert(&mut self, id: impl Into<String>, entry: ExtensionEntry) -> Option<ExtensionEntry> {
        self.entries.insert(id.into(), entry)
    }

    /// Moves the given identifiers to the front, in the given order.
    ///
    /// All other entries keep their relative order. Identifiers missing from
    /// the map are ignored.
    pub fn prioritize<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut front = 0;
        for id in ids {
            if let Some(index) = self.entries.get_index_of(id.as_ref()) {
                if index >= front {
                    self.entries.move_index(index, front);
                    front += 1;
                }
            }
        }
    }

    /// Consuming form of [`ExtensionMap::prioritize`].
    pub fn prioritized<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prioritize(ids);
        self
    }

    /// Returns the identifier of the core entry.
    pub fn core_id(&self) -> &str {
        &self.core_id
    }

    /// Returns true if the identifier is the core entry.
    pub fn is_core(&self, id: &str) -> bool {
        self.core_id == id
    }

    /// Returns the core entry if it is present.
    pub fn core(&self) -> Option<&ExtensionEntry> {
        self.entries.get(&self.core_id)
    }

    /// Returns where the map came from.
    pub fn source(&self) -> ExtensionSource {
        self.source
    }

    /// Returns the entry for an identifier.
    pub fn get(&self, id: &str) -> Option<&ExtensionEntry> {
        self.entries.get(id)
    }

    /// Iterates entries in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtensionEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Iterates identifiers in map order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
