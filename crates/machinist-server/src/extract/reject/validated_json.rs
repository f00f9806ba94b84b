//! Validated JSON extractor.
//!
//! [`ValidateJson`] deserializes like [`Json`] and then runs the
//! `validator` checks of the payload type, rendering every failing field
//! into one readable message.

use std::borrow::Cow;
use std::collections::HashMap;

use axum::extract::{FromRequest, Request};
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use super::Json;
use crate::handler::{Error, ErrorKind};

/// Tracing target for request validation.
const TRACING_TARGET: &str = "machinist_server::extract::validation";

/// JSON extractor with automatic validation using the `validator` crate.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct ValidateJson<T>(pub T);

impl<T> ValidateJson<T> {
    /// Creates a new instance of [`ValidateJson`].
    #[inline]
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Returns the inner validated value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for ValidateJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        data.validate()?;
        Ok(Self::new(data))
    }
}

type Params = HashMap<Cow<'static, str>, serde_json::Value>;

/// Formats length validation errors.
fn format_length_error(field: &str, params: &Params) -> String {
    let unit = if field.ends_with("name") || field.ends_with("path") {
        "characters"
    } else {
        "items"
    };

    let number = |key: &str| params.get(key).and_then(serde_json::Value::as_u64);

    match (number("min"), number("max")) {
        (Some(min), Some(max)) => format!(
            "Field '{}' must be between {} and {} {} long",
            field, min, max, unit
        ),
        (Some(min), None) => format!("Field '{}' must be at least {} {} long", field, min, unit),
        (None, Some(max)) => format!("Field '{}' must be at most {} {} long", field, max, unit),
        _ => format!("Field '{}' has invalid length", field),
    }
}

/// Formats a single validation error.
fn format_validation_error(field: &str, error: &ValidationError) -> String {
    if let Some(custom_message) = &error.message {
        return format!("Field '{}' {}", field, custom_message);
    }

    let message = match error.code.as_ref() {
        "required" => "is required and cannot be empty".to_string(),
        "length" => return format_length_error(field, &error.params),
        "url" => "must be a valid URL (e.g., https://example.com)".to_string(),
        code => format!("failed validation: {}", code),
    };

    format!("Field '{}' {}", field, message)
}

/// Collects messages for every failing field, nested ones included.
///
/// Nested fields are reported with dotted paths (`models[0].url`).
fn collect_messages(prefix: &str, errors: &ValidationErrors, messages: &mut Vec<String>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => messages.extend(
                field_errors
                    .iter()
                    .map(|error| format_validation_error(&path, error)),
            ),
            ValidationErrorsKind::Struct(nested) => collect_messages(&path, nested, messages),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(&format!("{}[{}]", path, index), nested, messages);
                }
            }
        }
    }
}

impl From<ValidationErrors> for Error<'static> {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_messages("", &errors, &mut messages);

        let user_message = match messages.as_slice() {
            [] => "Validation failed".to_string(),
            [single_error] => single_error.clone(),
            multiple => multiple.join(". "),
        };

        tracing::warn!(
            target: TRACING_TARGET,
            errors = %user_message,
            "request validation failed"
        );

        ErrorKind::BadRequest
            .with_message(user_message)
            .with_resource("request")
    }
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Inner {
        #[validate(url)]
        url: String,
    }

    #[derive(Validate)]
    struct Outer {
        #[validate(length(min = 1, max = 4))]
        name: String,
        #[validate(nested)]
        items: Vec<Inner>,
    }

    #[test]
    fn nested_errors_are_reported_with_paths() {
        let outer = Outer {
            name: "too long".to_owned(),
            items: vec![
                Inner {
                    url: "https://example.com".to_owned(),
                },
                Inner {
                    url: "nope".to_owned(),
                },
            ],
        };

        let error: Error = outer.validate().unwrap_err().into();
        assert_eq!(error.kind(), ErrorKind::BadRequest);

        let message = error.message().unwrap_or_default();
        assert!(message.contains("Field 'items[1].url' must be a valid URL"));
        assert!(message.contains("Field 'name' must be between 1 and 4 characters long"));
    }

    #[test]
    fn custom_message_is_used() {
        let mut error = ValidationError::new("machine_name_start");
        error.message = Some("must start with a letter or a digit".into());

        assert_eq!(
            format_validation_error("machineName", &error),
            "Field 'machineName' must start with a letter or a digit"
        );
    }
}
