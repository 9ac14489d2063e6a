use std::borrow::Cow;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{ValidationError, ValidationErrors};

use crate::shared_wheel_game::Page;

static IMAGE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|png|gif)$").expect("static regex"));

const IMAGE_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Builds a `ValidationError` whose message is shown to the caller verbatim.
pub fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// The caller-facing text of a validation error.
pub fn message_of(error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| error.code.to_string())
}

/// Flattens field errors from a derived `validate()` into one line.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

pub fn validate_page(page: &str) -> Result<(), ValidationError> {
    Page::from_str(page).map(|_| ()).map_err(|_| {
        invalid(
            "invalid_page",
            format!("page must be one of lottery1, lottery2, advertisement (got {:?})", page),
        )
    })
}

pub fn validate_probability(probability: f64) -> Result<(), ValidationError> {
    if !(0.0..=100.0).contains(&probability) {
        return Err(invalid("invalid_probability", "probability must be between 0 and 100"));
    }
    Ok(())
}

/// Accepts an upload when either the declared content type or the file
/// extension names a supported image format.
pub fn is_valid_image(content_type: Option<&str>, file_name: &str) -> bool {
    let type_ok = content_type
        .map(|ct| IMAGE_CONTENT_TYPES.contains(&ct.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    type_ok || IMAGE_EXTENSION.is_match(file_name)
}
