use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use validator::{ValidateUrl, ValidationError, ValidationErrors};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidationResponse {
    pub status: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error".to_string(),
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

impl From<&ValidationErrors> for ValidationResponse {
    fn from(errors: &ValidationErrors) -> Self {
        let mut error_map = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let error_messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into())
                        .to_string()
                })
                .collect();

            error_map.insert(field.to_string(), error_messages);
        }

        Self::new(error_map)
    }
}

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error_with_message("blank", "This field must not be empty"));
    }
    Ok(())
}

/// Trims a free-text optional field, folding blank input to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts an absolute URL, or an empty string meaning "no link".
pub fn url_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_url() {
        return Ok(());
    }
    Err(error_with_message("url", "Attachment must be a valid URL"))
}
