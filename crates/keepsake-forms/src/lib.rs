#![forbid(unsafe_code)]

//! RSVP form handling.
//!
//! - [`validation`]: a small composable validator framework
//! - [`rsvp`]: the RSVP form, its field rules and local-only submission
//!
//! # Example
//!
//! ```rust
//! use keepsake_forms::{RsvpForm, RsvpField, validate};
//!
//! let form = RsvpForm {
//!     name: String::new(),
//!     email: "a@b".into(),
//!     attendance: "yes".into(),
//!     ..RsvpForm::default()
//! };
//! let errors = validate(&form);
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors[0].field, RsvpField::Name);
//! ```

pub mod rsvp;
pub mod validation;

pub use rsvp::{
    FieldError, FormStatus, RsvpController, RsvpField, RsvpForm, RsvpSubmission, SubmitOutcome,
    submit, validate, validate_field,
};
pub use validation::{
    All, Email, OneOf, Required, ValidationError, ValidationResult, Validator,
    ERROR_CODE_EMAIL, ERROR_CODE_ONE_OF, ERROR_CODE_REQUIRED,
};
