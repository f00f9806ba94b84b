#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;

pub use crate::client::{ExtensionMapClient, TRACING_TARGET};
pub use crate::config::{DEFAULT_EXTENSION_MAP_URL, DEFAULT_TIMEOUT, ExtensionMapConfig};
pub use crate::error::{Error, Result};
