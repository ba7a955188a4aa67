//! Loan renewal by a librarian

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    config::RenewalConfig,
    error::{field_error, AppResult},
    models::{
        book_instance::{BookInstance, LoanStatus},
        form::{DecodeForm, FormInput, Submission, INVALID_DATE},
        user::{Permission, UserClaims},
    },
    repository::CatalogStore,
};

pub use crate::models::form::NON_FIELD_ERRORS;

/// Bounds on a new due-back date, in weeks from today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    pub default_weeks: i64,
    pub max_weeks: i64,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            default_weeks: 3,
            max_weeks: 4,
        }
    }
}

impl From<&RenewalConfig> for RenewalPolicy {
    fn from(config: &RenewalConfig) -> Self {
        Self {
            default_weeks: config.default_weeks,
            max_weeks: config.max_weeks,
        }
    }
}

impl RenewalPolicy {
    /// Date suggested by an empty renewal form
    pub fn proposed_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::weeks(self.default_weeks)
    }

    /// Latest acceptable renewal date
    pub fn latest_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::weeks(self.max_weeks)
    }

    /// Accepts any date from today through `today + max_weeks`, both inclusive
    pub fn validate(
        &self,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<NaiveDate, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match date {
            None => errors.add(
                "renewal_date",
                field_error("required", "This field is required."),
            ),
            Some(date) if date < today => errors.add(
                "renewal_date",
                field_error("renewal_date_in_past", "Invalid date - renewal in past"),
            ),
            Some(date) if date > self.latest_date(today) => errors.add(
                "renewal_date",
                field_error(
                    "renewal_date_too_far",
                    format!(
                        "Invalid date - renewal more than {} weeks ahead",
                        self.max_weeks
                    ),
                ),
            ),
            Some(date) => return Ok(date),
        }
        Err(errors)
    }
}

/// Submitted renewal form
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RenewalForm {
    /// ISO date (YYYY-MM-DD)
    pub renewal_date: Option<NaiveDate>,
}

impl DecodeForm for RenewalForm {
    const FIELDS: &'static [&'static str] = &["renewal_date"];

    fn read(input: &mut FormInput) -> Option<Self> {
        Some(Self {
            renewal_date: input.optional("renewal_date", INVALID_DATE)?,
        })
    }
}

/// Result of one renewal attempt
#[derive(Debug)]
pub enum RenewalOutcome {
    /// Nothing submitted yet; show the form with a suggested date
    Unsubmitted {
        instance: BookInstance,
        proposed: NaiveDate,
    },
    /// Submission rejected; nothing was written
    Invalid {
        instance: BookInstance,
        /// Values as submitted
        submitted: Value,
        errors: ValidationErrors,
    },
    Applied {
        instance: BookInstance,
        previous_due_back: Option<NaiveDate>,
    },
}

#[derive(Clone)]
pub struct RenewalService {
    store: Arc<dyn CatalogStore>,
    policy: RenewalPolicy,
}

impl RenewalService {
    pub fn new(store: Arc<dyn CatalogStore>, policy: RenewalPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RenewalPolicy {
        self.policy
    }

    /// Show (`submission = None`) or apply a renewal.
    ///
    /// The actor's capability is checked before the copy is looked up and
    /// before anything submitted is looked at.
    pub async fn renew(
        &self,
        actor: &UserClaims,
        id: Uuid,
        submission: Option<Submission<RenewalForm>>,
        today: NaiveDate,
    ) -> AppResult<RenewalOutcome> {
        actor.require(Permission::CanMarkReturned)?;

        let instance = self.store.get_instance(id).await?;

        let Some(submission) = submission else {
            return Ok(RenewalOutcome::Unsubmitted {
                instance,
                proposed: self.policy.proposed_date(today),
            });
        };

        let form = match submission {
            Ok(form) => form,
            Err(rejected) => {
                return Ok(RenewalOutcome::Invalid {
                    instance,
                    submitted: rejected.values,
                    errors: rejected.errors,
                })
            }
        };

        if instance.status != LoanStatus::OnLoan {
            let mut errors = ValidationErrors::new();
            errors.add(
                NON_FIELD_ERRORS,
                field_error(
                    "not_on_loan",
                    format!("Only copies on loan can be renewed (status: {})", instance.status),
                ),
            );
            return Ok(RenewalOutcome::Invalid {
                instance,
                submitted: json!(form),
                errors,
            });
        }

        let new_due_back = match self.policy.validate(form.renewal_date, today) {
            Ok(date) => date,
            Err(errors) => {
                return Ok(RenewalOutcome::Invalid {
                    instance,
                    submitted: json!(form),
                    errors,
                })
            }
        };

        let previous_due_back = instance.due_back;
        let instance = self.store.set_due_back(id, new_due_back).await?;

        tracing::info!(
            instance_id = %id,
            actor = %actor.sub,
            previous_due_back = ?previous_due_back,
            new_due_back = %new_due_back,
            "Renewed book instance"
        );

        Ok(RenewalOutcome::Applied {
            instance,
            previous_due_back,
        })
    }
}
