//! Form-level validators that aggregate the field validators.

use serde::{Deserialize, Serialize};

use super::{
    validate_agree_to_terms, validate_email, validate_name, validate_password,
    validate_password_confirm, validate_username, Field, FieldErrors, PasswordPolicy,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
    pub agree_to_terms: bool,
    pub subscribe_newsletter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

/// Pages of the multi-step registration wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterStep {
    Personal,
    Account,
    Password,
    Terms,
}

impl RegisterStep {
    pub fn fields(&self) -> &'static [Field] {
        match self {
            RegisterStep::Personal => &[Field::FirstName, Field::LastName],
            RegisterStep::Account => &[Field::Email, Field::Username],
            RegisterStep::Password => &[Field::Password, Field::PasswordConfirm],
            RegisterStep::Terms => &[Field::AgreeToTerms],
        }
    }
}

pub fn validate_login_form(form: &LoginForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(Field::Email, validate_email(&form.email));
    errors.check(
        Field::Password,
        validate_password(&form.password, PasswordPolicy::Login),
    );
    errors
}

pub fn validate_register_form(form: &RegisterForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(Field::Email, validate_email(&form.email));
    errors.check(Field::Username, validate_username(&form.username));
    errors.check(Field::FirstName, validate_name(&form.first_name, "First name"));
    errors.check(Field::LastName, validate_name(&form.last_name, "Last name"));
    errors.check(
        Field::Password,
        validate_password(&form.password, PasswordPolicy::Registration),
    );
    errors.check(
        Field::PasswordConfirm,
        validate_password_confirm(&form.password, &form.password_confirm),
    );
    errors.check(Field::AgreeToTerms, validate_agree_to_terms(form.agree_to_terms));
    errors
}

pub fn validate_reset_password_form(form: &ResetPasswordForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(
        Field::Password,
        validate_password(&form.password, PasswordPolicy::Registration),
    );
    errors.check(
        Field::PasswordConfirm,
        validate_password_confirm(&form.password, &form.password_confirm),
    );
    errors
}

/// Whether every field on one wizard page passes validation.
pub fn is_step_valid(form: &RegisterForm, step: RegisterStep) -> bool {
    let errors = validate_register_form(form);
    step.fields().iter().all(|f| !errors.contains(*f))
}
