//! Machine specification submitted for deployment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// GPU class requested for a machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, EnumIter)]
pub enum Gpu {
    /// Whatever the platform schedules.
    #[default]
    #[serde(rename = "any")]
    #[strum(serialize = "any")]
    Any,
    /// NVIDIA T4.
    #[serde(rename = "t4")]
    #[strum(serialize = "t4")]
    T4,
    /// NVIDIA L4.
    #[serde(rename = "l4")]
    #[strum(serialize = "l4")]
    L4,
    /// NVIDIA A10G.
    #[serde(rename = "a10g")]
    #[strum(serialize = "a10g")]
    A10G,
    /// NVIDIA A100 with 40 GB.
    #[serde(rename = "a100-40gb")]
    #[strum(serialize = "a100-40gb")]
    A100Small,
    /// NVIDIA A100 with 80 GB.
    #[serde(rename = "a100-80gb")]
    #[strum(serialize = "a100-80gb")]
    A100Large,
    /// NVIDIA H100.
    #[serde(rename = "h100")]
    #[strum(serialize = "h100")]
    H100,
}

/// Installation state of a custom node package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustomNodeState {
    /// Package must be installed when the image is built.
    #[default]
    NotInstalled,
}

/// A custom node package pinned to a revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomNode {
    /// Installation state.
    #[serde(default)]
    pub state: CustomNodeState,
    /// Commit hash to install.
    pub hash: String,
}

/// Custom node packages to install, keyed by repository URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNodes {
    /// Packages keyed by repository URL.
    #[serde(default)]
    pub custom_nodes: IndexMap<String, CustomNode>,
    /// Node types nobody could attribute, kept for the record.
    #[serde(default)]
    pub unknown_nodes: Vec<String>,
}

/// A model file downloaded into the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Display name.
    pub name: String,
    /// Download URL.
    pub url: String,
    /// Destination path relative to the models directory.
    pub path: String,
}

/// Everything needed to deploy one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Machine name, also the workspace directory name.
    pub machine_name: String,
    /// GPU class.
    #[serde(default)]
    pub gpu: Gpu,
    /// Custom node packages to install.
    #[serde(default)]
    pub custom_nodes: CustomNodes,
    /// Model files to download.
    #[serde(default)]
    pub models: Vec<Model>,
    /// Extra pip requirements, comma separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_dependencies: Option<String>,
}

impl MachineSpec {
    /// Creates a spec with no custom nodes and no models.
    pub fn new(machine_name: impl Into<String>, gpu: Gpu) -> Self {
        Self {
            machine_name: machine_name.into(),
            gpu,
            custom_nodes: CustomNodes::default(),
            models: Vec::new(),
            additional_dependencies: None,
        }
    }

    /// Returns the extra pip requirements as a trimmed, non-empty list.
    pub fn additional_dependencies(&self) -> Vec<&str> {
        self.additional_dependencies
            .as_deref()
            .map(|deps| {
                deps.split(',')
                    .map(str::trim)
                    .filter(|dep| !dep.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
