use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::{Banner, FormStatus, BANNER_TTL};
use crate::api::AuthApi;
use crate::validation::{is_valid_email, validate_email, Field, FieldErrors};

/// First step of password recovery: ask for a reset code by email.
pub struct ForgotPasswordViewModel {
    api: Arc<dyn AuthApi>,
    email: String,
    status: FormStatus,
    banner: Option<Banner>,
    errors: FieldErrors,
    sent_message: Option<String>,
}

impl ForgotPasswordViewModel {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self {
            api,
            email: String::new(),
            status: FormStatus::Idle,
            banner: None,
            errors: FieldErrors::new(),
            sent_message: None,
        }
    }

    /// Editing the email dismisses any error immediately.
    pub fn set_email(&mut self, value: impl Into<String>) {
        self.email = value.into();
        self.errors.remove(Field::Email);
        if self.banner.take().is_some() || self.status == FormStatus::Error {
            self.status = FormStatus::Idle;
        }
    }

    pub fn can_submit(&self) -> bool {
        is_valid_email(self.email()) && !self.status.is_loading()
    }

    /// Request a reset code. On failure an error banner is shown that clears
    /// itself `BANNER_TTL` after `now`.
    pub async fn submit(&mut self, now: Instant) -> bool {
        if self.status.is_loading() {
            return false;
        }
        self.errors.clear();
        self.errors.check(Field::Email, validate_email(self.email()));
        if self.errors.has_errors() {
            return false;
        }
        self.status = FormStatus::Loading;
        self.banner = None;

        let email = self.email().to_string();
        match self.api.forgot_password(&email).await {
            Ok(outcome) if outcome.success => {
                debug!("Reset code requested");
                self.status = FormStatus::Success;
                self.sent_message = Some(outcome.message);
                true
            }
            Ok(outcome) => {
                self.fail(outcome.message, now);
                false
            }
            Err(e) => {
                warn!(error = %e, "Reset code request failed");
                self.fail(e.to_string(), now);
                false
            }
        }
    }

    fn fail(&mut self, message: String, now: Instant) {
        self.status = FormStatus::Error;
        self.banner = Some(Banner::expiring(message, now, BANNER_TTL));
    }

    /// Expire the error banner once its time is up.
    pub fn tick(&mut self, now: Instant) {
        if self.banner.as_ref().is_some_and(|b| b.is_expired(now)) {
            self.banner = None;
            self.status = FormStatus::Idle;
        }
    }

    /// Back to a blank form.
    pub fn reset(&mut self) {
        self.email.clear();
        self.status = FormStatus::Idle;
        self.banner = None;
        self.errors.clear();
        self.sent_message = None;
    }

    /// Allow another request for the same email, e.g. after stepping back.
    pub(crate) fn reopen(&mut self) {
        self.status = FormStatus::Idle;
        self.banner = None;
    }

    pub fn email(&self) -> &str {
        self.email.trim()
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.banner.as_ref().map(Banner::message)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn email_error(&self) -> Option<&str> {
        self.errors.get(Field::Email)
    }

    /// Server confirmation after a successful request.
    pub fn sent_message(&self) -> Option<&str> {
        self.sent_message.as_deref()
    }
}
