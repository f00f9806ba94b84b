//! Request types for HTTP handlers.

mod machines;
mod paths;
mod validations;

pub use machines::*;
pub use paths::*;
pub use validations::*;
