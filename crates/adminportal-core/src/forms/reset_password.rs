use std::sync::Arc;

use tracing::{info, warn};

use super::FormStatus;
use crate::api::{AuthApi, Outcome};
use crate::validation::{
    password_strength, validate_reset_password_form, Field, FieldErrors, PasswordStrength,
    ResetPasswordForm,
};

/// Final recovery step: choose a new password for a verified code.
pub struct ResetPasswordViewModel {
    api: Arc<dyn AuthApi>,
    email: String,
    code: String,
    form: ResetPasswordForm,
    errors: FieldErrors,
    status: FormStatus,
}

impl ResetPasswordViewModel {
    pub fn new(api: Arc<dyn AuthApi>, email: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            api,
            email: email.into(),
            code: code.into(),
            form: ResetPasswordForm::default(),
            errors: FieldErrors::new(),
            status: FormStatus::Idle,
        }
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        self.form.password = value.into();
        self.errors.remove(Field::Password);
        self.errors.remove(Field::General);
        self.status.on_edit();
    }

    pub fn set_password_confirm(&mut self, value: impl Into<String>) {
        self.form.password_confirm = value.into();
        self.errors.remove(Field::PasswordConfirm);
        self.errors.remove(Field::General);
        self.status.on_edit();
    }

    pub fn password_strength(&self) -> PasswordStrength {
        password_strength(&self.form.password)
    }

    pub fn can_submit(&self) -> bool {
        !self.form.password.is_empty()
            && self.form.password == self.form.password_confirm
            && !self.status.is_loading()
    }

    /// Validate and set the new password. The server's answer is returned
    /// as-is; a rejected outcome leaves its message under `General`.
    pub async fn submit(&mut self) -> Option<Outcome> {
        let errors = validate_reset_password_form(&self.form);
        if errors.has_errors() {
            self.errors = errors;
            return None;
        }

        self.status = FormStatus::Loading;
        self.errors.clear();

        match self
            .api
            .reset_password(&self.email, &self.code, &self.form.password)
            .await
        {
            Ok(outcome) => {
                if outcome.success {
                    info!("Password reset");
                    self.status = FormStatus::Success;
                    self.form = ResetPasswordForm::default();
                } else {
                    self.status = FormStatus::Error;
                    self.errors.insert(Field::General, outcome.message.clone());
                }
                Some(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Password reset failed");
                self.status = FormStatus::Error;
                self.errors.insert(Field::General, e.to_string());
                None
            }
        }
    }

    pub fn form(&self) -> &ResetPasswordForm {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }
}
