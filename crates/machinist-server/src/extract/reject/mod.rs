//! Extractors whose rejections are converted into [`Error`]s.
//!
//! [`Error`]: crate::handler::Error

pub mod enhanced_json;
pub mod enhanced_path;
pub mod validated_json;

pub use self::enhanced_json::Json;
pub use self::enhanced_path::Path;
pub use self::validated_json::ValidateJson;

/// Keeps the first lines of a rejection message, capped in length.
pub(crate) fn sanitize_error_message(message: &str, lines: usize, chars: usize) -> String {
    let lines = message.lines().take(lines).collect::<Vec<_>>();
    lines.join(" ").chars().take(chars).collect()
}
