//! Request validation utilities.

use std::path::{Component, Path};

use validator::{ValidateUrl, ValidationError};

/// Maximum length of a machine name.
pub const MACHINE_NAME_MAX_LENGTH: u64 = 64;

pub fn validation_error(code: &'static str, message: &str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.to_string().into());
    error
}

/// Checks that a machine name is usable as a directory and app name.
///
/// Accepts `[A-Za-z0-9][A-Za-z0-9_-]*`.
pub fn is_machine_name(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => {
            return Err(validation_error(
                "machine_name_start",
                "must start with a letter or a digit",
            ));
        }
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || "-_".contains(c)) {
        return Err(validation_error(
            "machine_name_invalid_chars",
            "can only contain letters, digits, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Checks that a model destination stays inside the models directory.
pub fn is_relative_path(path: &str) -> Result<(), ValidationError> {
    let escapes = Path::new(path)
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));

    if escapes {
        return Err(validation_error(
            "path_not_relative",
            "must be a relative path without '..' components",
        ));
    }

    Ok(())
}

/// Checks that every custom node key is a repository URL.
pub fn are_repository_urls<'a, I>(urls: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a String>,
{
    for url in urls {
        if !url.validate_url() {
            return Err(validation_error(
                "custom_node_url",
                &format!("'{}' is not a valid repository URL", url),
            ));
        }
    }

    Ok(())
}
