//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::form::{DecodeForm, FormInput, INVALID_DATE, INVALID_TEXT};

/// Full author model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub date_of_death: Option<NaiveDate>,
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.last_name, self.first_name)
    }
}

/// Author create/update form. Creation and update accept the same field set.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AuthorForm {
    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub date_of_death: Option<NaiveDate>,
}

impl DecodeForm for AuthorForm {
    const FIELDS: &'static [&'static str] =
        &["first_name", "last_name", "date_of_birth", "date_of_death"];

    fn read(input: &mut FormInput) -> Option<Self> {
        let first_name = input.required("first_name", INVALID_TEXT);
        let last_name = input.required("last_name", INVALID_TEXT);
        let date_of_birth = input.required("date_of_birth", INVALID_DATE);
        let date_of_death = input.optional("date_of_death", INVALID_DATE);
        Some(Self {
            first_name: first_name?,
            last_name: last_name?,
            date_of_birth: date_of_birth?,
            date_of_death: date_of_death?,
        })
    }
}

impl From<&Author> for AuthorForm {
    fn from(author: &Author) -> Self {
        Self {
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
        }
    }
}

/// Initial values suggested by the empty author creation form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorFormInitial {
    pub date_of_death: NaiveDate,
}

impl Default for AuthorFormInitial {
    fn default() -> Self {
        Self {
            date_of_death: NaiveDate::from_ymd_opt(2016, 12, 10).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_last_name_first() {
        let author = Author {
            id: 1,
            first_name: "Ursula".to_string(),
            last_name: "Le Guin".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1929, 10, 21).unwrap(),
            date_of_death: NaiveDate::from_ymd_opt(2018, 1, 22),
        };
        assert_eq!(author.to_string(), "Le Guin, Ursula");
    }

    #[test]
    fn test_form_rejects_empty_and_long_names() {
        let form = AuthorForm {
            first_name: String::new(),
            last_name: "x".repeat(101),
            date_of_birth: NaiveDate::from_ymd_opt(1950, 1, 1).unwrap(),
            date_of_death: None,
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_form_rejects_unknown_fields() {
        let json = r#"{"first_name":"A","last_name":"B","date_of_birth":"1950-01-01","date_of_death":null,"id":4}"#;
        assert!(serde_json::from_str::<AuthorForm>(json).is_err());
    }

    #[test]
    fn test_decode_reports_bad_dates_per_field() {
        let body = br#"{"first_name":"A","last_name":"B","date_of_birth":"yesterday","date_of_death":"1990-13-01"}"#;
        let rejected = AuthorForm::decode(body).unwrap_err();
        let fields = crate::error::field_errors(&rejected.errors);
        assert_eq!(fields["date_of_birth"], vec![INVALID_DATE.to_string()]);
        assert_eq!(fields["date_of_death"], vec![INVALID_DATE.to_string()]);
        assert!(!fields.contains_key("first_name"));
        assert_eq!(rejected.values["date_of_birth"], "yesterday");
    }
}
