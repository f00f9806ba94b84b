//! Node dependency resolver.
//!
//! Maps every node type used by a workflow to the extension that provides
//! it. Each node type is resolved independently with a strict precedence:
//!
//! 1. Preemption index. Every node type listed by the core entry maps to the
//!    core, and every entry's `preemptions` map to that entry. Later entries
//!    in map order overwrite earlier ones.
//! 2. Reverse index of listed node types, excluding the core entry. The
//!    first extension in map order that lists the node type wins.
//! 3. Node name patterns, tested in map order. The first match wins.
//!
//! A node type owned by the core entry is built in and dropped from the
//! result. A node type with no owner is reported as unknown.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::{ExtensionMap, TRACING_TARGET_RESOLVER, WorkflowGraph};

/// Mechanism through which a node type was attributed to an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MatchKind {
    /// Preemption index, including core-listed node types.
    Preemption,
    /// Reverse index of listed node types.
    Listed,
    /// Node name pattern.
    Pattern,
}

/// Extension that owns a node type and how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOwner<'a> {
    /// Identifier of the owning extension.
    pub extension: &'a str,
    /// Mechanism that produced the match.
    pub kind: MatchKind,
}

/// Extensions required by a workflow and node types nobody provides.
///
/// Both sets are disjoint. They serialize as sorted arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Identifiers of extensions that must be installed.
    pub custom_nodes: BTreeSet<String>,
    /// Node types that could not be attributed to any extension.
    pub unknown_nodes: BTreeSet<String>,
}

impl ResolutionResult {
    /// Returns true if every used node type was attributed.
    pub fn is_complete(&self) -> bool {
        self.unknown_nodes.is_empty()
    }
}

/// Lookup indexes built from one extension map.
///
/// Building the indexes is linear in the size of the map; a resolver may
/// be reused for any number of workflows resolved against the same map.
#[derive(Debug, Clone)]
pub struct NodeResolver<'a> {
    map: &'a ExtensionMap,
    preemptions: HashMap<&'a str, &'a str>,
    providers: HashMap<&'a str, Vec<&'a str>>,
    patterns: Vec<(&'a Regex, &'a str)>,
}

impl<'a> NodeResolver<'a> {
    /// Builds the preemption index, reverse index and pattern list.
    pub fn new(map: &'a ExtensionMap) -> Self {
        let mut preemptions = HashMap::new();
        let mut providers: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        let mut patterns = Vec::new();

        for (id, entry) in map.iter() {
            if map.is_core(id) {
                for node_type in entry.node_types() {
                    preemptions.insert(node_type.as_str(), id);
                }
            } else {
                for node_type in entry.node_types() {
                    providers.entry(node_type.as_str()).or_default().push(id);
                }
            }

            for node_type in entry.preemptions() {
                preemptions.insert(node_type.as_str(), id);
            }

            if let Some(pattern) = entry.pattern() {
                patterns.push((pattern, id));
            }
        }

        tracing::trace!(
            target: TRACING_TARGET_RESOLVER,
            extensions = map.len(),
            preemptions = preemptions.len(),
            listed = providers.len(),
            patterns = patterns.len(),
            "built resolver indexes"
        );

        Self {
            map,
            preemptions,
            providers,
            patterns,
        }
    }

    /// Returns the extensions listing a node type, in map order.
    ///
    /// The core entry never appears here.
    pub fn providers(&self, node_type: &str) -> &[&'a str] {
        self.providers
            .get(node_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Finds the extension that owns a node type.
    pub fn owner(&self, node_type: &str) -> Option<NodeOwner<'a>> {
        if let Some(&extension) = self.preemptions.get(node_type) {
            return Some(NodeOwner {
                extension,
                kind: MatchKind::Preemption,
            });
        }

        if let Some(&extension) = self.providers(node_type).first() {
            return Some(NodeOwner {
                extension,
                kind: MatchKind::Listed,
            });
        }

        self.patterns
            .iter()
            .find(|(pattern, _)| pattern.is_match(node_type))
            .map(|&(_, extension)| NodeOwner {
                extension,
                kind: MatchKind::Pattern,
            })
    }

    /// Resolves the used node-type set of a workflow.
    pub fn resolve(&self, workflow: &WorkflowGraph) -> ResolutionResult {
        self.resolve_types(workflow.used_node_types())
    }

    /// Resolves an arbitrary collection of node types.
    pub fn resolve_types<I, S>(&self, node_types: I) -> ResolutionResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = ResolutionResult::default();

        for node_type in node_types {
            let node_type = node_type.as_ref();
            match self.owner(node_type) {
                Some(owner) if self.map.is_core(owner.extension) => {}
                Some(owner) => {
                    tracing::trace!(
                        target: TRACING_TARGET_RESOLVER,
                        node_type,
                        extension = owner.extension,
                        kind = %owner.kind,
                        "attributed node type"
                    );
                    result.custom_nodes.insert(owner.extension.to_owned());
                }
                None => {
                    result.unknown_nodes.insert(node_type.to_owned());
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_RESOLVER,
            custom_nodes = result.custom_nodes.len(),
            unknown_nodes = result.unknown_nodes.len(),
            "resolved node dependencies"
        );

        result
    }
}

/// Resolves a workflow against an extension map.
pub fn resolve(workflow: &WorkflowGraph, map: &ExtensionMap) -> ResolutionResult {
    NodeResolver::new(map).resolve(workflow)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ExtensionEntry;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn example_map() -> ExtensionMap {
        ExtensionMap::new()
            .with_core_id("core")
            .with_entry("core", ExtensionEntry::new(["A"]))
            .with_entry("extA", ExtensionEntry::new(["B"]).with_pattern("^C.*"))
    }

    fn workflow(types: &[&str]) -> WorkflowGraph {
        types
            .iter()
            .fold(WorkflowGraph::new(), |graph, node_type| graph.with_node(*node_type))
    }

    #[test]
    fn empty_workflow_yields_empty_sets() {
        let result = resolve(&WorkflowGraph::new(), &example_map());
        assert_eq!(result, ResolutionResult::default());
        assert!(result.is_complete());
    }

    #[test]
    fn empty_map_leaves_everything_unknown() {
        let result = resolve(&workflow(&["A", "B"]), &ExtensionMap::new());
        assert!(result.custom_nodes.is_empty());
        assert_eq!(result.unknown_nodes, set(&["A", "B"]));
    }

    #[test]
    fn core_list_reverse_index_and_pattern() {
        let result = resolve(&workflow(&["A", "B", "C1", "D"]), &example_map());
        assert_eq!(result.custom_nodes, set(&["extA"]));
        assert_eq!(result.unknown_nodes, set(&["D"]));
    }

    #[test]
    fn preemption_beats_core_ownership() {
        let map = ExtensionMap::new()
            .with_core_id("core")
            .with_entry("core", ExtensionEntry::new(["A"]))
            .with_entry(
                "extA",
                ExtensionEntry::new(["B"])
                    .with_pattern("^C.*")
                    .with_preemptions(["A"]),
            );

        let result = resolve(&workflow(&["A"]), &map);
        assert_eq!(result.custom_nodes, set(&["extA"]));
        assert!(result.unknown_nodes.is_empty());
    }

    #[test]
    fn excluded_types_never_reported() {
        let map = ExtensionMap::new()
            .with_core_id("core")
            .with_entry("catch-all", ExtensionEntry::new(["Reroute", "Note"]).with_pattern(".*"));

        let graph = workflow(&["Reroute", "Note", "workflow/group", "workflow/"]);
        let result = resolve(&graph, &map);
        assert_eq!(result, ResolutionResult::default());
    }

    #[test]
    fn core_listed_types_beat_later_listings() {
        let map = ExtensionMap::new()
            .with_core_id("core")
            .with_entry("core", ExtensionEntry::new(["KSampler"]))
            .with_entry("late", ExtensionEntry::new(["KSampler"]));

        let result = resolve(&workflow(&["KSampler"]), &map);
        assert_eq!(result, ResolutionResult::default());
    }

    #[test]
    fn precedence_is_preemption_then_listing_then_pattern() {
        let map = ExtensionMap::new()
            .with_core_id("core")
            .with_entry("by-pattern", ExtensionEntry::new(Vec::<String>::new()).with_pattern("^X"))
            .with_entry("by-listing", ExtensionEntry::new(["X"]))
            .with_entry(
                "by-preemption",
                ExtensionEntry::new(Vec::<String>::new()).with_preemptions(["X"]),
            );

        let resolver = NodeResolver::new(&map);
        let owner = resolver.owner("X").unwrap();
        assert_eq!(owner.extension, "by-preemption");
        assert_eq!(owner.kind, MatchKind::Preemption);

        let without_preemption = ExtensionMap::new()
            .with_entry("by-pattern", ExtensionEntry::new(Vec::<String>::new()).with_pattern("^X"))
            .with_entry("by-listing", ExtensionEntry::new(["X"]));
        let owner = NodeResolver::new(&without_preemption).owner("X").unwrap();
        assert_eq!(owner.extension, "by-listing");
        assert_eq!(owner.kind, MatchKind::Listed);
    }

    #[test]
    fn later_preemption_wins() {
        let map = ExtensionMap::new()
            .with_entry("first", ExtensionEntry::new(["P"]).with_preemptions(["P"]))
            .with_entry("second", ExtensionEntry::new(Vec::<String>::new()).with_preemptions(["P"]));

        let owner = NodeResolver::new(&map).owner("P").unwrap();
        assert_eq!(owner.extension, "second");
    }

    #[test]
    fn reverse_index_keeps_first_inserted() {
        let map = ExtensionMap::new()
            .with_entry("laksjdjf", ExtensionEntry::new(["IPAdapter"]))
            .with_entry("cubiq", ExtensionEntry::new(["IPAdapter"]));

        let resolver = NodeResolver::new(&map);
        assert_eq!(resolver.providers("IPAdapter"), ["laksjdjf", "cubiq"]);
        assert_eq!(resolver.owner("IPAdapter").unwrap().extension, "laksjdjf");
    }

    #[test]
    fn reordering_changes_ties_but_not_preemptions() {
        let map = ExtensionMap::new()
            .with_entry("a", ExtensionEntry::new(["Shared"]))
            .with_entry("b", ExtensionEntry::new(["Shared"]))
            .with_entry("owner", ExtensionEntry::new(["Claimed"]).with_preemptions(["Claimed"]))
            .with_entry("other", ExtensionEntry::new(["Claimed"]));

        let before = NodeResolver::new(&map);
        assert_eq!(before.owner("Shared").unwrap().extension, "a");
        assert_eq!(before.owner("Claimed").unwrap().extension, "owner");

        let reordered = map.clone().prioritized(["b", "other"]);
        let after = NodeResolver::new(&reordered);
        assert_eq!(after.owner("Shared").unwrap().extension, "b");
        assert_eq!(after.owner("Claimed").unwrap().extension, "owner");
    }

    #[test]
    fn listing_beats_earlier_pattern() {
        let map = ExtensionMap::new()
            .with_entry("early-pattern", ExtensionEntry::new(Vec::<String>::new()).with_pattern("Node$"))
            .with_entry("late-listing", ExtensionEntry::new(["MyNode"]));

        let owner = NodeResolver::new(&map).owner("MyNode").unwrap();
        assert_eq!(owner.extension, "late-listing");
    }

    #[test]
    fn first_matching_pattern_wins() {
        let map = ExtensionMap::new()
            .with_entry("broad", ExtensionEntry::new(Vec::<String>::new()).with_pattern("^VHS"))
            .with_entry("narrow", ExtensionEntry::new(Vec::<String>::new()).with_pattern("^VHS_Load"));

        let owner = NodeResolver::new(&map).owner("VHS_LoadVideo").unwrap();
        assert_eq!(owner.extension, "broad");
        assert_eq!(owner.kind, MatchKind::Pattern);
    }

    #[test]
    fn pattern_only_entry_participates() {
        let map = ExtensionMap::new().with_entry(
            "everywhere",
            ExtensionEntry::new(Vec::<String>::new()).with_pattern("Everywhere$"),
        );

        let result = resolve(&workflow(&["Seed Everywhere"]), &map);
        assert_eq!(result.custom_nodes, set(&["everywhere"]));
    }

    #[test]
    fn every_type_is_attributed_or_unknown() {
        let map = example_map();
        let resolver = NodeResolver::new(&map);
        let used = ["A", "B", "C1", "D", "extA"];
        let result = resolver.resolve(&workflow(&used));

        for node_type in used {
            let unknown = result.unknown_nodes.contains(node_type);
            assert_ne!(resolver.owner(node_type).is_some(), unknown, "{node_type}");
        }
        assert!(result.unknown_nodes.contains("extA"));
    }

    #[test]
    fn resolver_is_reusable() {
        let map = example_map();
        let resolver = NodeResolver::new(&map);
        let first = resolver.resolve(&workflow(&["B"]));
        let second = resolver.resolve(&workflow(&["D"]));
        assert_eq!(first.custom_nodes, set(&["extA"]));
        assert_eq!(second.unknown_nodes, set(&["D"]));
    }

    #[test]
    fn priority_extension_wins_bundled_ipadapter() {
        let graph = WorkflowGraph::from_value(&json!({
            "nodes": [
                {"type": "CheckpointLoaderSimple"},
                {"type": "IPAdapter"},
                {"type": "IPAdapterModelLoader"},
                {"type": "VHS_SomethingNew"},
                {"type": "Reroute"},
                {"type": "TotallyUnknownNode"},
            ]
        }));

        let unordered = ExtensionMap::bundled();
        let result = resolve(&graph, &unordered);
        assert!(result.custom_nodes.contains("https://github.com/laksjdjf/IPAdapter-ComfyUI"));

        let ordered = ExtensionMap::bundled().prioritized(crate::PRIORITY_EXTENSIONS);
        let result = resolve(&graph, &ordered);
        assert_eq!(
            result.custom_nodes,
            set(&[
                "https://github.com/Kosinkadink/ComfyUI-VideoHelperSuite",
                "https://github.com/cubiq/ComfyUI_IPAdapter_plus",
            ])
        );
        assert_eq!(result.unknown_nodes, set(&["TotallyUnknownNode"]));
    }

    #[test]
    fn result_serializes_camel_case_sorted() -> anyhow::Result<()> {
        let result = resolve(&workflow(&["D", "C2", "B", "Z"]), &example_map());
        let value = serde_json::to_value(&result)?;
        assert_eq!(value, json!({"customNodes": ["extA"], "unknownNodes": ["D", "Z"]}));
        Ok(())
    }
}
