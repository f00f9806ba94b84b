#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for extension map operations.
pub const TRACING_TARGET_EXTENSION: &str = "machinist_core::extension";

/// Tracing target for dependency resolution.
pub const TRACING_TARGET_RESOLVER: &str = "machinist_core::resolver";

mod error;

pub mod extension;
pub mod resolver;
pub mod workflow;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use extension::{
    CORE_EXTENSION_ID, ExtensionEntry, ExtensionMap, ExtensionOptions, ExtensionSource,
    PRIORITY_EXTENSIONS,
};
pub use resolver::{MatchKind, NodeOwner, NodeResolver, ResolutionResult, resolve};
pub use workflow::{WorkflowGraph, WorkflowNode};
