//! Extension map: which extension package provides which node types.
//!
//! The map mirrors the community-maintained `extension-node-map.json`
//! document. Each entry is keyed by the extension repository URL and lists
//! the node types it provides together with options that steer resolution.

mod entry;
mod map;

pub use entry::{ExtensionEntry, ExtensionOptions};
pub use map::{CORE_EXTENSION_ID, ExtensionMap, ExtensionSource, PRIORITY_EXTENSIONS};
