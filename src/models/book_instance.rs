//! Book instance (physical, loanable copy) model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::form::{DecodeForm, FormInput, INVALID_CHOICE, INVALID_DATE, INVALID_TEXT};
use crate::error::{AppError, AppResult};

/// Loan status of a copy, persisted as a one-character code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Maintenance,
        LoanStatus::OnLoan,
        LoanStatus::Available,
        LoanStatus::Reserved,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, String> {
        match code.trim() {
            "m" => Ok(LoanStatus::Maintenance),
            "o" => Ok(LoanStatus::OnLoan),
            "a" => Ok(LoanStatus::Available),
            "r" => Ok(LoanStatus::Reserved),
            other => Err(format!("Invalid loan status code: {}", other)),
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        LoanStatus::from_code(&s).map_err(|e| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.code(), buf)
    }
}

/// Book instance model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
}

impl BookInstance {
    /// A copy is overdue once today is past its due-back date
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_back.map(|due| today > due).unwrap_or(false)
    }

    /// Borrower and due-back date belong to copies on loan only
    pub fn check_loan_state(&self) -> Result<(), AppError> {
        check_loan_state(self.status, self.borrower_id, self.due_back)
    }
}

pub fn check_loan_state(
    status: LoanStatus,
    borrower_id: Option<i32>,
    due_back: Option<NaiveDate>,
) -> Result<(), AppError> {
    match status {
        LoanStatus::OnLoan if borrower_id.is_none() => Err(AppError::Validation(
            "A copy on loan must have a borrower".to_string(),
        )),
        LoanStatus::OnLoan if due_back.is_none() => Err(AppError::Validation(
            "A copy on loan must have a due-back date".to_string(),
        )),
        LoanStatus::OnLoan => Ok(()),
        other if borrower_id.is_some() => Err(AppError::Validation(format!(
            "A copy with status '{}' cannot have a borrower",
            other
        ))),
        other if due_back.is_some() => Err(AppError::Validation(format!(
            "A copy with status '{}' cannot have a due-back date",
            other
        ))),
        _ => Ok(()),
    }
}

/// Administrative create/update of a copy
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BookInstanceForm {
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1 to 200 characters"))]
    pub imprint: String,
    #[serde(default)]
    pub status: LoanStatus,
    pub due_back: Option<NaiveDate>,
    pub borrower: Option<i32>,
}

impl BookInstanceForm {
    /// Field checks first, then the loan-state invariant
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(AppError::InvalidForm)?;
        check_loan_state(self.status, self.borrower, self.due_back)
    }
}

impl DecodeForm for BookInstanceForm {
    const FIELDS: &'static [&'static str] = &["imprint", "status", "due_back", "borrower"];

    fn read(input: &mut FormInput) -> Option<Self> {
        let imprint = input.required("imprint", INVALID_TEXT);
        let status = input.optional::<LoanStatus>("status", INVALID_CHOICE);
        let due_back = input.optional("due_back", INVALID_DATE);
        let borrower = input.optional("borrower", INVALID_CHOICE);
        Some(Self {
            imprint: imprint?,
            status: status?.unwrap_or_default(),
            due_back: due_back?,
            borrower: borrower?,
        })
    }
}

/// Filters for the administrative instance list
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookInstanceFilter {
    pub status: Option<LoanStatus>,
    pub due_back: Option<NaiveDate>,
}

/// A copy on loan joined with its book title
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BorrowedCopy {
    #[sqlx(flatten)]
    pub instance: BookInstance,
    pub book_title: String,
}

/// A borrowed copy as shown in loan lists
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanEntry {
    pub instance: BookInstance,
    pub book_title: String,
    pub is_overdue: bool,
}
