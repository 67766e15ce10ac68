//! Client-side field validation.
//!
//! Everything in this module is pure and synchronous. Field validators return
//! `Result<(), ValidationError>`; form validators aggregate them into a
//! [`FieldErrors`] map where a missing key means the field is valid. Server
//! field errors returned by the Auth API are folded into the same map, so
//! forms render both kinds the same way.

pub mod forms;
pub mod strength;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use forms::{
    is_step_valid, validate_login_form, validate_register_form, validate_reset_password_form,
    LoginForm, RegisterForm, RegisterStep, ResetPasswordForm,
};
pub use strength::{password_strength, PasswordStrength, StrengthLabel};

/// Minimum password length for login and the strength criterion.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Number of digits in a password-reset code.
pub const OTP_LENGTH: usize = 6;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_]{3,20}$";
const NAME_PATTERN: &str = r"^[A-Za-z ]{2,30}$";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Please enter a valid email address")]
    InvalidFormat,

    #[error("Password must be at least 8 characters")]
    TooShort,

    #[error("Password is too weak. Please choose a stronger password.")]
    TooWeak,

    #[error("Passwords do not match")]
    Mismatch,

    #[error("Username must be 3-20 characters long and contain only letters, numbers, and underscores")]
    InvalidUsername,

    #[error("{0} must be 2-30 characters and contain only letters")]
    InvalidName(&'static str),

    #[error("You must agree to the terms and conditions")]
    TermsNotAccepted,

    #[error("Enter the 6-digit code")]
    InvalidCode,

    #[error("{field} must be at least {min} characters")]
    TooShortText { field: &'static str, min: usize },

    #[error("{field} must be less than {max} characters")]
    TooLongText { field: &'static str, max: usize },

    #[error("Rating must be between 1 and 5 stars")]
    RatingOutOfRange,
}

/// Which password rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicy {
    /// Only a minimum length; existing accounts may predate the strength rules.
    Login,
    /// Requires a strength score of at least 3.
    Registration,
}

/// Form field keys shared by client-side validation and server error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Email,
    Password,
    Username,
    FirstName,
    LastName,
    PasswordConfirm,
    AgreeToTerms,
    Code,
    Subject,
    Description,
    Category,
    Priority,
    Title,
    Rating,
    /// Errors not tied to an input, shown as a banner.
    General,
    /// Failure reported after a support/feedback submission.
    Submit,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
            Field::Username => "username",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::PasswordConfirm => "password_confirm",
            Field::AgreeToTerms => "agree_to_terms",
            Field::Code => "code",
            Field::Subject => "subject",
            Field::Description => "description",
            Field::Category => "category",
            Field::Priority => "priority",
            Field::Title => "title",
            Field::Rating => "rating",
            Field::General => "general",
            Field::Submit => "submit",
        }
    }

    /// Map an Auth API error-body key onto a form field.
    ///
    /// Returns `None` for keys that have no form counterpart.
    pub fn from_api_key(key: &str) -> Option<Self> {
        match key {
            "email" => Some(Field::Email),
            "username" => Some(Field::Username),
            "password" => Some(Field::Password),
            "first_name" | "firstName" => Some(Field::FirstName),
            "last_name" | "lastName" => Some(Field::LastName),
            "code" => Some(Field::Code),
            "error" | "detail" | "message" | "non_field_errors" => Some(Field::General),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-keyed error messages. An absent key means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Record the outcome of a field validator, keeping the first error per field.
    pub fn check(&mut self, field: Field, result: Result<(), ValidationError>) {
        if let Err(e) = result {
            self.0.entry(field).or_insert_with(|| e.to_string());
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.0.remove(&field)
    }

    /// Later entries overwrite earlier ones for the same field.
    pub fn merge(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

impl FromIterator<(Field, String)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (Field, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("static validation pattern compiles"))
}

fn email_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, EMAIL_PATTERN)
}

fn username_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, USERNAME_PATTERN)
}

fn name_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, NAME_PATTERN)
}

/// True when `email` has the `local@domain.tld` shape. No required check.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::Required("Email"));
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidFormat);
    }
    Ok(())
}

pub fn validate_password(password: &str, policy: PasswordPolicy) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required("Password"));
    }
    match policy {
        PasswordPolicy::Login => {
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                return Err(ValidationError::TooShort);
            }
        }
        PasswordPolicy::Registration => {
            if password_strength(password).score < 3 {
                return Err(ValidationError::TooWeak);
            }
        }
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::Required("Username"));
    }
    if !username_regex().is_match(username) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

/// Validate a personal name. `label` names the field in messages ("First name").
pub fn validate_name(name: &str, label: &'static str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required(label));
    }
    if !name_regex().is_match(name) {
        return Err(ValidationError::InvalidName(label));
    }
    Ok(())
}

pub fn validate_password_confirm(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if confirm.is_empty() {
        return Err(ValidationError::Required("Password confirmation"));
    }
    if password != confirm {
        return Err(ValidationError::Mismatch);
    }
    Ok(())
}

pub fn validate_agree_to_terms(agreed: bool) -> Result<(), ValidationError> {
    if agreed {
        Ok(())
    } else {
        Err(ValidationError::TermsNotAccepted)
    }
}

pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::Required("Code"));
    }
    if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidCode);
    }
    Ok(())
}

/// Trimmed-length bounds check used by the support and feedback forms.
pub fn validate_text_length(
    value: &str,
    label: &'static str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(label));
    }
    let len = trimmed.chars().count();
    if len < min {
        return Err(ValidationError::TooShortText { field: label, min });
    }
    if len > max {
        return Err(ValidationError::TooLongText { field: label, max });
    }
    Ok(())
}
