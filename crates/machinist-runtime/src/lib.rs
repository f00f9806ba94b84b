#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for deployer operations.
pub const TRACING_TARGET_DEPLOYER: &str = "machinist_runtime::deployer";

/// Tracing target for job lifecycle events.
pub const TRACING_TARGET_JOBS: &str = "machinist_runtime::jobs";

mod error;

pub mod deployer;
pub mod jobs;
pub mod spec;

pub use deployer::{CommandDeployer, Deployer, DeployerConfig, ProcessDeployer};
pub use error::{Error, Result};
pub use jobs::{
    Attach, JobEvent, JobId, JobManager, JobState, JobStream, JobSummary, OutputChannel, OutputLine,
};
pub use spec::{CustomNode, CustomNodeState, CustomNodes, Gpu, MachineSpec, Model};
