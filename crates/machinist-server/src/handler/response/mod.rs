//! Response types for HTTP handlers.

mod error_response;
mod extensions;
mod machines;
mod monitors;

pub use error_response::ErrorResponse;
pub use extensions::*;
pub use machines::*;
pub use monitors::*;
