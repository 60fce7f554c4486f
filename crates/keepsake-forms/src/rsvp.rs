#![forbid(unsafe_code)]

//! The RSVP form.
//!
//! Three fields are checked: name (required), email (required, well formed)
//! and attendance (one of `yes` / `no`). Every violation is reported at
//! once so the page can mark all offending fields in one pass. Submissions
//! never leave the process: a valid form becomes an [`RsvpSubmission`] that
//! is written to the log as JSON.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::validation::{Email, OneOf, Required, ValidationResult, Validator};

pub const NAME_REQUIRED: &str = "Please enter your full name.";
pub const EMAIL_REQUIRED: &str = "Please enter your email address.";
pub const EMAIL_INVALID: &str = "Please enter a valid email address.";
pub const ATTENDANCE_REQUIRED: &str = "Please let us know if you can attend.";

/// Accepted attendance answers.
pub const ATTENDANCE_CHOICES: [&str; 2] = ["yes", "no"];

/// Raw form values as typed by the guest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsvpForm {
    pub name: String,
    pub email: String,
    pub guests: String,
    pub attendance: String,
    pub meal: String,
    pub message: String,
}

impl RsvpForm {
    /// Value of `field`.
    #[must_use]
    pub fn get(&self, field: RsvpField) -> &str {
        match field {
            RsvpField::Name => &self.name,
            RsvpField::Email => &self.email,
            RsvpField::Guests => &self.guests,
            RsvpField::Attendance => &self.attendance,
            RsvpField::Meal => &self.meal,
            RsvpField::Message => &self.message,
        }
    }

    /// Replace the value of `field`.
    pub fn set(&mut self, field: RsvpField, value: impl Into<String>) {
        let slot = match field {
            RsvpField::Name => &mut self.name,
            RsvpField::Email => &mut self.email,
            RsvpField::Guests => &mut self.guests,
            RsvpField::Attendance => &mut self.attendance,
            RsvpField::Meal => &mut self.meal,
            RsvpField::Message => &mut self.message,
        };
        *slot = value.into();
    }
}

/// Form fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpField {
    Name,
    Email,
    Guests,
    Attendance,
    Meal,
    Message,
}

impl RsvpField {
    /// Fields that carry a rule.
    pub const VALIDATED: [RsvpField; 3] = [RsvpField::Name, RsvpField::Email, RsvpField::Attendance];

    /// Form control name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RsvpField::Name => "name",
            RsvpField::Email => "email",
            RsvpField::Guests => "guests",
            RsvpField::Attendance => "attendance",
            RsvpField::Meal => "meal",
            RsvpField::Message => "message",
        }
    }
}

impl fmt::Display for RsvpField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inline error attached to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: RsvpField,
    pub code: &'static str,
    pub message: String,
}

fn into_field_error(field: RsvpField, result: ValidationResult) -> Option<FieldError> {
    result.error().map(|e| FieldError {
        field,
        code: e.code,
        message: e.format_message(),
    })
}

/// Check one field, as on blur. Fields without a rule always pass.
#[must_use]
pub fn validate_field(field: RsvpField, form: &RsvpForm) -> Option<FieldError> {
    let value = form.get(field);
    let result = match field {
        RsvpField::Name => Required::new().with_message(NAME_REQUIRED).validate(value),
        RsvpField::Email => Required::new()
            .with_message(EMAIL_REQUIRED)
            .validate(value)
            .and(Email::new().with_message(EMAIL_INVALID).validate(value)),
        RsvpField::Attendance => OneOf::new(ATTENDANCE_CHOICES)
            .with_message(ATTENDANCE_REQUIRED)
            .validate(value),
        RsvpField::Guests | RsvpField::Meal | RsvpField::Message => ValidationResult::Valid,
    };
    into_field_error(field, result)
}

/// Check every rule and return all violations in field order.
#[must_use]
pub fn validate(form: &RsvpForm) -> Vec<FieldError> {
    RsvpField::VALIDATED
        .into_iter()
        .filter_map(|field| validate_field(field, form))
        .collect()
}

fn serialize_iso<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// A validated form stamped with its submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpSubmission {
    #[serde(flatten)]
    pub form: RsvpForm,
    #[serde(serialize_with = "serialize_iso")]
    pub submitted_at: DateTime<Utc>,
}

impl RsvpSubmission {
    /// JSON record as written to the log.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Validate and, if clean, stamp the form. Values are trimmed.
pub fn submit(form: &RsvpForm, now: DateTime<Utc>) -> Result<RsvpSubmission, Vec<FieldError>> {
    let errors = validate(form);
    if !errors.is_empty() {
        return Err(errors);
    }
    let trimmed = RsvpForm {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        guests: form.guests.trim().to_string(),
        attendance: form.attendance.trim().to_string(),
        meal: form.meal.trim().to_string(),
        message: form.message.trim().to_string(),
    };
    Ok(RsvpSubmission {
        form: trimmed,
        submitted_at: now,
    })
}

/// Whether the form is still editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Editing,
    /// The success panel replaces the form.
    Submitted(RsvpSubmission),
}

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; the success state is not shown.
    Blocked(Vec<FieldError>),
    Submitted(RsvpSubmission),
    /// The form was already submitted; nothing happened.
    Ignored,
}

/// Form state plus the inline errors currently displayed.
#[derive(Debug, Clone)]
pub struct RsvpController {
    form: RsvpForm,
    errors: BTreeMap<RsvpField, FieldError>,
    status: FormStatus,
}

impl Default for RsvpController {
    fn default() -> Self {
        Self::new()
    }
}

impl RsvpController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            form: RsvpForm::default(),
            errors: BTreeMap::new(),
            status: FormStatus::Editing,
        }
    }

    #[must_use]
    pub fn form(&self) -> &RsvpForm {
        &self.form
    }

    #[must_use]
    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self.status, FormStatus::Submitted(_))
    }

    /// Inline error shown for `field`, if any.
    #[must_use]
    pub fn error(&self, field: RsvpField) -> Option<&FieldError> {
        self.errors.get(&field)
    }

    /// All inline errors in field order.
    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.values()
    }

    /// Update a field value (input event). Ignored after submission.
    pub fn set_field(&mut self, field: RsvpField, value: impl Into<String>) {
        if !self.is_submitted() {
            self.form.set(field, value);
        }
    }

    /// Validate one field on blur and update its inline error.
    pub fn blur(&mut self, field: RsvpField) -> Option<FieldError> {
        let result = validate_field(field, &self.form);
        match &result {
            Some(err) => {
                self.errors.insert(field, err.clone());
            }
            None => {
                self.errors.remove(&field);
            }
        }
        result
    }

    /// Validate everything and submit locally.
    pub fn submit(&mut self, now: DateTime<Utc>) -> SubmitOutcome {
        if self.is_submitted() {
            return SubmitOutcome::Ignored;
        }
        match submit(&self.form, now) {
            Err(errors) => {
                keepsake_core::debug!(count = errors.len(), "rsvp blocked");
                self.errors = errors.iter().map(|e| (e.field, e.clone())).collect();
                SubmitOutcome::Blocked(errors)
            }
            Ok(submission) => {
                self.errors.clear();
                keepsake_core::info!(record = %submission.to_json(), "rsvp submission");
                self.status = FormStatus::Submitted(submission.clone());
                SubmitOutcome::Submitted(submission)
            }
        }
    }
}
