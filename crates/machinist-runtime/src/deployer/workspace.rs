//! Machine workspace preparation.

use std::io;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tokio::fs;

use super::DeployerConfig;
use crate::spec::{CustomNode, MachineSpec, Model};
use crate::{Error, Result, TRACING_TARGET_DEPLOYER};

/// Machine settings read by the template at build time.
#[derive(Debug, Serialize)]
struct MachineConfigFile<'a> {
    machine_name: &'a str,
    gpu: &'a str,
    idle_timeout: u64,
    additional_dependencies: Option<&'a str>,
}

/// Custom node manifest in the shape `comfy node install-deps` reads.
#[derive(Debug, Serialize)]
struct CustomNodesFile<'a> {
    custom_nodes: &'a IndexMap<String, CustomNode>,
    unknown_nodes: &'a [String],
}

/// Creates `<builds_dir>/<machine_name>` from the template and writes the
/// machine files into it. An existing workspace for the same machine is
/// replaced.
pub(crate) async fn prepare(config: &DeployerConfig, spec: &MachineSpec) -> Result<PathBuf> {
    let workspace = workspace_path(&config.builds_dir, &spec.machine_name)?;

    if fs::try_exists(&workspace)
        .await
        .map_err(|e| Error::workspace(&workspace, e))?
    {
        tracing::debug!(
            target: TRACING_TARGET_DEPLOYER,
            workspace = %workspace.display(),
            "replacing existing workspace"
        );
        fs::remove_dir_all(&workspace)
            .await
            .map_err(|e| Error::workspace(&workspace, e))?;
    }

    copy_dir(&config.template_dir, &workspace).await?;

    let machine_config = MachineConfigFile {
        machine_name: &spec.machine_name,
        gpu: spec.gpu.as_ref(),
        idle_timeout: config.idle_timeout,
        additional_dependencies: spec.additional_dependencies.as_deref(),
    };
    write_json(&workspace.join("config.json"), &machine_config).await?;

    let custom_nodes = CustomNodesFile {
        custom_nodes: &spec.custom_nodes.custom_nodes,
        unknown_nodes: &spec.custom_nodes.unknown_nodes,
    };
    write_json(&workspace.join("custom_nodes.json"), &custom_nodes).await?;
    write_json::<[Model]>(&workspace.join("models.json"), &spec.models).await?;

    tracing::debug!(
        target: TRACING_TARGET_DEPLOYER,
        workspace = %workspace.display(),
        custom_nodes = spec.custom_nodes.custom_nodes.len(),
        models = spec.models.len(),
        "workspace prepared"
    );

    Ok(workspace)
}

/// Joins the machine name onto the builds directory.
///
/// The name must be a single normal path component.
fn workspace_path(builds_dir: &Path, machine_name: &str) -> Result<PathBuf> {
    let mut components = Path::new(machine_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(builds_dir.join(machine_name)),
        _ => Err(Error::workspace(
            builds_dir.join(machine_name),
            io::Error::new(io::ErrorKind::InvalidInput, "machine name is not a plain directory name"),
        )),
    }
}

async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];

    while let Some((source, target)) = pending.pop() {
        fs::create_dir_all(&target)
            .await
            .map_err(|e| Error::workspace(&target, e))?;

        let mut entries = fs::read_dir(&source)
            .await
            .map_err(|e| Error::workspace(&source, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::workspace(&source, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::workspace(&path, e))?;
            let destination = target.join(entry.file_name());

            if file_type.is_dir() {
                pending.push((path, destination));
            } else {
                fs::copy(&path, &destination)
                    .await
                    .map_err(|e| Error::workspace(&path, e))?;
            }
        }
    }

    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes)
        .await
        .map_err(|e| Error::workspace(path, e))
}
