//! Deployment request types.

use machinist_runtime::{CustomNodes, Gpu, MachineSpec, Model};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::validations::{
    MACHINE_NAME_MAX_LENGTH, are_repository_urls, is_machine_name, is_relative_path,
};

/// Request payload for deploying a machine.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachine {
    /// Machine name, also used as the workspace directory name.
    #[validate(
        length(min = 1, max = MACHINE_NAME_MAX_LENGTH),
        custom(function = "is_machine_name")
    )]
    pub machine_name: String,
    /// GPU class.
    #[serde(default)]
    pub gpu: Gpu,
    /// Custom node packages to install.
    #[serde(default)]
    #[validate(custom(function = "validate_custom_nodes"))]
    pub custom_nodes: CustomNodes,
    /// Model files to download.
    #[serde(default)]
    #[validate(nested)]
    pub models: Vec<CreateModel>,
    /// Extra pip requirements, comma separated.
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub additional_dependencies: Option<String>,
}

/// A model file to download into the machine.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateModel {
    /// Display name.
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    /// Download URL.
    #[validate(url)]
    pub url: String,
    /// Destination path relative to the models directory.
    #[validate(length(min = 1, max = 512), custom(function = "is_relative_path"))]
    pub path: String,
}

fn validate_custom_nodes(custom_nodes: &CustomNodes) -> Result<(), ValidationError> {
    are_repository_urls(custom_nodes.custom_nodes.keys())
}

impl CreateMachine {
    /// Converts the validated request into a deployable specification.
    pub fn into_spec(self) -> MachineSpec {
        let models = self.models.into_iter().map(Model::from).collect();

        MachineSpec {
            machine_name: self.machine_name,
            gpu: self.gpu,
            custom_nodes: self.custom_nodes,
            models,
            additional_dependencies: self
                .additional_dependencies
                .filter(|deps| !deps.trim().is_empty()),
        }
    }
}

impl From<CreateModel> for Model {
    fn from(model: CreateModel) -> Self {
        Self {
            name: model.name,
            url: model.url,
            path: model.path,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(value: serde_json::Value) -> anyhow::Result<CreateMachine> {
        Ok(serde_json::from_value(value)?)
    }

    #[test]
    fn minimal_request_is_valid() -> anyhow::Result<()> {
        let request = request(json!({ "machineName": "demo" }))?;
        assert!(request.validate().is_ok());

        let spec = request.into_spec();
        assert_eq!(spec.machine_name, "demo");
        assert_eq!(spec.gpu, Gpu::Any);
        assert!(spec.models.is_empty());
        assert!(spec.additional_dependencies.is_none());
        Ok(())
    }

    #[test]
    fn full_request_converts_to_spec() -> anyhow::Result<()> {
        let request = request(json!({
            "machineName": "sdxl",
            "gpu": "a100-40gb",
            "customNodes": {
                "customNodes": {
                    "https://github.com/cubiq/ComfyUI_essentials": {
                        "state": "not-installed",
                        "hash": "abc123"
                    }
                },
                "unknownNodes": ["Mystery"]
            },
            "models": [{
                "name": "sdxl base",
                "url": "https://example.com/sd_xl_base.safetensors",
                "path": "checkpoints"
            }],
            "additionalDependencies": "numpy, opencv-python"
        }))?;
        assert!(request.validate().is_ok());

        let spec = request.into_spec();
        assert_eq!(spec.gpu, Gpu::A100Small);
        assert_eq!(spec.custom_nodes.custom_nodes.len(), 1);
        assert_eq!(spec.models[0].path, "checkpoints");
        assert_eq!(spec.additional_dependencies(), ["numpy", "opencv-python"]);
        Ok(())
    }

    #[test]
    fn rejects_bad_machine_names() -> anyhow::Result<()> {
        let long = "x".repeat(65);
        for name in ["", "-demo", "demo/../x", "a b", long.as_str()] {
            let request = request(json!({ "machineName": name }))?;
            assert!(request.validate().is_err(), "accepted {name:?}");
        }
        Ok(())
    }

    #[test]
    fn rejects_bad_models() -> anyhow::Result<()> {
        let request = request(json!({
            "machineName": "demo",
            "models": [{ "name": "m", "url": "not a url", "path": "../../etc" }]
        }))?;

        let errors = request.validate().unwrap_err();
        assert!(errors.errors().contains_key("models"));
        Ok(())
    }

    #[test]
    fn rejects_non_url_custom_nodes() -> anyhow::Result<()> {
        let request = request(json!({
            "machineName": "demo",
            "customNodes": { "customNodes": { "essentials": { "hash": "abc" } } }
        }))?;

        assert!(request.validate().is_err());
        Ok(())
    }

    #[test]
    fn blank_dependencies_are_dropped() -> anyhow::Result<()> {
        let request = request(json!({ "machineName": "demo", "additionalDependencies": "  " }))?;
        assert!(request.into_spec().additional_dependencies.is_none());
        Ok(())
    }
}
