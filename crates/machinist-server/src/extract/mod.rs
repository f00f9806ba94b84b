//! Request extractors with improved error handling and validation.
//!
//! Drop-in replacements for the Axum extractors of the same name whose
//! rejections render as [`ErrorResponse`] bodies.
//!
//! - [`Json`] - JSON deserialization with descriptive rejection messages
//! - [`ValidateJson`] - JSON extraction followed by `validator` checks
//! - [`Path`] - path parameter extraction with type-specific hints
//!
//! [`ErrorResponse`]: crate::handler::response::ErrorResponse

pub mod reject;

pub use crate::extract::reject::{Json, Path, ValidateJson};
