//! Workflow graph model.
//!
//! Only the parts of a workflow document that matter for dependency
//! resolution are kept: the node type of every node and the named group
//! sub-workflows embedded under `extra.groupNodes`.
//!
//! Two document shapes are understood:
//! - UI format: `{"nodes": [{"type": "KSampler", ...}], "extra": {"groupNodes": {...}}}`
//! - API format: `{"3": {"class_type": "KSampler", "inputs": {...}}, ...}`
//!
//! Parsing is total. Sections that are absent or have the wrong shape are
//! treated as empty.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node type prefix that marks a reference to a group sub-workflow.
pub const GROUP_REFERENCE_PREFIX: &str = "workflow/";

/// Structural and annotation node types that never need an extension.
pub const SENTINEL_NODE_TYPES: [&str; 2] = ["Reroute", "Note"];

/// A single node of a workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Node type identifier, absent for malformed nodes.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl WorkflowNode {
    /// Creates a node with the given type.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
        }
    }

    /// Creates a node without a type.
    pub fn untyped() -> Self {
        Self::default()
    }

    /// Returns the node type when it denotes real node usage.
    ///
    /// Group references and sentinel types yield `None`.
    pub fn used_type(&self) -> Option<&str> {
        let node_type = self.node_type.as_deref()?;
        if SENTINEL_NODE_TYPES.contains(&node_type) || node_type.starts_with(GROUP_REFERENCE_PREFIX)
        {
            return None;
        }
        Some(node_type)
    }
}

/// Ordered node list plus named group sub-workflows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowGraph {
    nodes: Vec<WorkflowNode>,
    groups: IndexMap<String, WorkflowGraph>,
}

impl WorkflowGraph {
    /// Creates an empty workflow graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node with the given type.
    pub fn with_node(mut self, node_type: impl Into<String>) -> Self {
        self.nodes.push(WorkflowNode::new(node_type));
        self
    }

    /// Appends a node without a type.
    pub fn with_untyped_node(mut self) -> Self {
        self.nodes.push(WorkflowNode::untyped());
        self
    }

    /// Adds a named group sub-workflow.
    pub fn with_group(mut self, name: impl Into<String>, group: WorkflowGraph) -> Self {
        self.groups.insert(name.into(), group);
        self
    }

    /// Returns the top-level nodes in document order.
    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    /// Returns the group sub-workflows in document order.
    pub fn groups(&self) -> &IndexMap<String, WorkflowGraph> {
        &self.groups
    }

    /// Returns true if the graph has no nodes and no groups.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.groups.is_empty()
    }

    /// Builds a graph from an arbitrary JSON document.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::new();
        };

        if !object.contains_key("nodes") && !object.contains_key("extra") {
            return Self::from_api_format(object);
        }

        let nodes = object
            .get("nodes")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().map(|node| node_from_value(node, "type")).collect())
            .unwrap_or_default();

        let groups = object
            .get("extra")
            .and_then(|extra| extra.get("groupNodes"))
            .and_then(Value::as_object)
            .map(|groups| {
                groups
                    .iter()
                    .map(|(name, group)| (name.clone(), Self::from_value(group)))
                    .collect()
            })
            .unwrap_or_default();

        Self { nodes, groups }
    }

    fn from_api_format(object: &serde_json::Map<String, Value>) -> Self {
        let nodes = object
            .values()
            .filter(|node| node.is_object())
            .map(|node| node_from_value(node, "class_type"))
            .collect();

        Self {
            nodes,
            groups: IndexMap::new(),
        }
    }

    /// Collects the used node-type set of this graph and all nested groups.
    pub fn used_node_types(&self) -> BTreeSet<String> {
        let mut used = BTreeSet::new();
        self.collect_used_types(&mut used);
        used
    }

    fn collect_used_types(&self, used: &mut BTreeSet<String>) {
        used.extend(
            self.nodes
                .iter()
                .filter_map(WorkflowNode::used_type)
                .map(str::to_owned),
        );

        for group in self.groups.values() {
            group.collect_used_types(used);
        }
    }
}

impl From<&Value> for WorkflowGraph {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

fn node_from_value(node: &Value, type_field: &str) -> WorkflowNode {
    WorkflowNode {
        node_type: node
            .get(type_field)
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn used(value: Value) -> Vec<String> {
        WorkflowGraph::from_value(&value)
            .used_node_types()
            .into_iter()
            .collect()
    }

    #[test]
    fn ui_format_collects_node_types() {
        let types = used(json!({
            "nodes": [
                {"id": 1, "type": "KSampler"},
                {"id": 2, "type": "CLIPTextEncode"},
                {"id": 3, "type": "KSampler"},
            ]
        }));
        assert_eq!(types, ["CLIPTextEncode", "KSampler"]);
    }

    #[test]
    fn sentinels_and_group_references_are_skipped() {
        let types = used(json!({
            "nodes": [
                {"type": "Reroute"},
                {"type": "Note"},
                {"type": "workflow/upscale"},
                {"id": 4},
                {"type": 42},
                {"type": "SaveImage"},
            ]
        }));
        assert_eq!(types, ["SaveImage"]);
    }

    #[test]
    fn groups_are_traversed_recursively() {
        let types = used(json!({
            "nodes": [{"type": "workflow/outer"}],
            "extra": {
                "groupNodes": {
                    "outer": {
                        "nodes": [{"type": "IPAdapter"}, {"type": "workflow/inner"}],
                        "extra": {
                            "groupNodes": {
                                "inner": {"nodes": [{"type": "FaceDetailer"}]}
                            }
                        }
                    }
                }
            }
        }));
        assert_eq!(types, ["FaceDetailer", "IPAdapter"]);
    }

    #[test]
    fn api_format_uses_class_type() {
        let types = used(json!({
            "3": {"class_type": "KSampler", "inputs": {"seed": 5}},
            "4": {"class_type": "CheckpointLoaderSimple", "inputs": {}},
            "5": {"inputs": {}},
            "6": "not a node",
        }));
        assert_eq!(types, ["CheckpointLoaderSimple", "KSampler"]);
    }

    #[test]
    fn wrong_shapes_are_empty() {
        assert!(used(json!(null)).is_empty());
        assert!(used(json!([1, 2, 3])).is_empty());
        assert!(used(json!({"nodes": "oops", "extra": {"groupNodes": []}})).is_empty());
        assert!(used(json!({"nodes": [], "extra": 7})).is_empty());
    }

    #[test]
    fn builder_matches_parsed_document() {
        let built = WorkflowGraph::new()
            .with_node("KSampler")
            .with_untyped_node()
            .with_group("g", WorkflowGraph::new().with_node("VAEDecode"));
        let parsed = WorkflowGraph::from_value(&json!({
            "nodes": [{"type": "KSampler"}, {}],
            "extra": {"groupNodes": {"g": {"nodes": [{"type": "VAEDecode"}]}}}
        }));
        assert_eq!(built, parsed);
        assert!(!built.is_empty());
    }
}
