//! Extension map response types.

use machinist_core::{ExtensionMap, ExtensionSource, PRIORITY_EXTENSIONS};
use serde::{Deserialize, Serialize};

/// Summary of the loaded extension map.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSummary {
    /// Where the map was loaded from.
    pub source: ExtensionSource,
    /// Number of extension entries, core included.
    pub extension_count: usize,
    /// Identifier of the core extension.
    pub core_extension: String,
    /// Whether the core extension has an entry in the map.
    pub core_present: bool,
    /// Number of node types the core extension provides.
    pub core_node_types: usize,
    /// Priority extensions present in the map, in precedence order.
    pub priority_extensions: Vec<String>,
}

impl From<&ExtensionMap> for ExtensionSummary {
    fn from(map: &ExtensionMap) -> Self {
        let priority_extensions = PRIORITY_EXTENSIONS
            .iter()
            .filter(|id| map.get(id).is_some())
            .map(|id| (*id).to_owned())
            .collect();

        Self {
            source: map.source(),
            extension_count: map.len(),
            core_extension: map.core_id().to_owned(),
            core_present: map.core().is_some(),
            core_node_types: map.core().map_or(0, |core| core.node_types().len()),
            priority_extensions,
        }
    }
}
