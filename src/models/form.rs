//! Decoding of submitted form bodies
//!
//! Handlers receive form bodies as raw bytes and decode them only after the
//! actor has been checked. Decoding happens field by field, so a value of
//! the wrong shape becomes an error on that field and the form can be
//! re-presented with what was submitted.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::ValidationErrors;

use crate::error::{field_error, AppError};

/// Key for errors that belong to the form as a whole
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_TEXT: &str = "Enter a valid text value.";
pub const INVALID_CHOICE: &str = "Select a valid choice.";

/// A body that could not be turned into its typed form
#[derive(Debug, Clone)]
pub struct RejectedForm {
    /// Submitted values, as sent
    pub values: Value,
    pub errors: ValidationErrors,
}

impl RejectedForm {
    fn body(message: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(NON_FIELD_ERRORS, field_error("invalid_body", message));
        Self {
            values: Value::Object(Map::new()),
            errors,
        }
    }
}

impl From<RejectedForm> for AppError {
    fn from(rejected: RejectedForm) -> Self {
        AppError::InvalidForm(rejected.errors)
    }
}

/// Outcome of decoding one submitted form
pub type Submission<F> = Result<F, RejectedForm>;

/// Submitted values keyed by field, with the errors found while reading them
#[derive(Debug)]
pub struct FormInput {
    values: Map<String, Value>,
    errors: ValidationErrors,
}

impl FormInput {
    /// Parse a JSON object body; keys outside `fields` are form errors
    pub fn parse(body: &[u8], fields: &[&str]) -> Result<Self, RejectedForm> {
        let values = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(values)) => values,
            _ => return Err(RejectedForm::body("Expected a JSON object of form fields")),
        };

        let mut errors = ValidationErrors::new();
        for key in values.keys() {
            if !fields.contains(&key.as_str()) {
                errors.add(
                    NON_FIELD_ERRORS,
                    field_error("unknown_field", format!("Unknown field: {}", key)),
                );
            }
        }

        Ok(Self { values, errors })
    }

    /// Value of a field that must be present and not null
    pub fn required<T: DeserializeOwned>(
        &mut self,
        field: &'static str,
        invalid: &'static str,
    ) -> Option<T> {
        match self.values.get(field).cloned() {
            None | Some(Value::Null) => {
                self.errors.add(field, field_error("required", REQUIRED));
                None
            }
            Some(value) => self.decode(field, value, invalid),
        }
    }

    /// Value of a field that may be absent or null. The outer `None` marks a
    /// value that did not decode.
    pub fn optional<T: DeserializeOwned>(
        &mut self,
        field: &'static str,
        invalid: &'static str,
    ) -> Option<Option<T>> {
        match self.values.get(field).cloned() {
            None | Some(Value::Null) => Some(None),
            Some(value) => self.decode(field, value, invalid).map(Some),
        }
    }

    fn decode<T: DeserializeOwned>(
        &mut self,
        field: &'static str,
        value: Value,
        invalid: &'static str,
    ) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(_) => {
                self.errors.add(field, field_error("invalid", invalid));
                None
            }
        }
    }

    pub fn finish<F>(self, form: Option<F>) -> Submission<F> {
        match form {
            Some(form) if self.errors.errors().is_empty() => Ok(form),
            _ => Err(RejectedForm {
                values: Value::Object(self.values),
                errors: self.errors,
            }),
        }
    }
}

/// A typed form read from a submitted body
pub trait DecodeForm: Sized {
    /// Editable fields, in display order
    const FIELDS: &'static [&'static str];

    /// Read every field; `None` when any of them failed
    fn read(input: &mut FormInput) -> Option<Self>;

    fn decode(body: &[u8]) -> Submission<Self> {
        let mut input = FormInput::parse(body, Self::FIELDS)?;
        let form = Self::read(&mut input);
        input.finish(form)
    }
}
