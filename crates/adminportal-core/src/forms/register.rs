//! Registration form with a debounced email-availability check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{Debounce, FormStatus};
use crate::api::{AuthApi, AuthError, RegisterRequest, RegistrationResult};
use crate::validation::{
    is_step_valid, is_valid_email, password_strength, validate_register_form, Field,
    FieldErrors, PasswordStrength, RegisterForm, RegisterStep,
};

/// Quiet period after the last email keystroke before checking availability.
pub const EMAIL_CHECK_DELAY: Duration = Duration::from_millis(1000);

pub const EMAIL_TAKEN_MESSAGE: &str = "This email is already registered";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Idle,
    Checking,
    Available,
    Taken,
    /// The check could not be completed. Never blocks submit.
    Error,
}

/// A pending availability check, tagged with the generation it was issued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCheck {
    generation: u64,
    email: String,
}

impl EmailCheck {
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Perform the check. Does not borrow the view-model, so edits can
    /// continue while it is in flight.
    pub async fn run(self, api: &dyn AuthApi) -> EmailCheckResult {
        let result = api.check_email_availability(&self.email).await;
        EmailCheckResult {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCheckResult {
    generation: u64,
    result: Result<bool, AuthError>,
}

pub struct RegisterViewModel {
    api: Arc<dyn AuthApi>,
    form: RegisterForm,
    errors: FieldErrors,
    status: FormStatus,
    email_status: EmailStatus,
    email_debounce: Debounce,
    generation: u64,
}

impl RegisterViewModel {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self {
            api,
            form: RegisterForm::default(),
            errors: FieldErrors::new(),
            status: FormStatus::Idle,
            email_status: EmailStatus::Idle,
            email_debounce: Debounce::new(EMAIL_CHECK_DELAY),
            generation: 0,
        }
    }

    /// Update the email and (re)arm the availability check.
    ///
    /// Any check already in flight becomes stale.
    pub fn set_email(&mut self, value: impl Into<String>, now: Instant) {
        self.form.email = value.into();
        self.edited(Field::Email);
        self.email_status = EmailStatus::Idle;
        self.generation += 1;
        self.email_debounce.arm(now);
    }

    pub fn set_username(&mut self, value: impl Into<String>) {
        self.form.username = value.into();
        self.edited(Field::Username);
    }

    pub fn set_first_name(&mut self, value: impl Into<String>) {
        self.form.first_name = value.into();
        self.edited(Field::FirstName);
    }

    pub fn set_last_name(&mut self, value: impl Into<String>) {
        self.form.last_name = value.into();
        self.edited(Field::LastName);
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        self.form.password = value.into();
        self.edited(Field::Password);
    }

    pub fn set_password_confirm(&mut self, value: impl Into<String>) {
        self.form.password_confirm = value.into();
        self.edited(Field::PasswordConfirm);
    }

    pub fn set_agree_to_terms(&mut self, value: bool) {
        self.form.agree_to_terms = value;
        self.edited(Field::AgreeToTerms);
    }

    pub fn set_subscribe_newsletter(&mut self, value: bool) {
        self.form.subscribe_newsletter = value;
        self.status.on_edit();
    }

    fn edited(&mut self, field: Field) {
        self.errors.remove(field);
        self.errors.remove(Field::General);
        self.status.on_edit();
    }

    /// Issue the availability check once the debounce has elapsed.
    ///
    /// Returns `None` when nothing is due or the email is not well-formed
    /// (the status then stays `Idle`).
    pub fn begin_email_check(&mut self, now: Instant) -> Option<EmailCheck> {
        if !self.email_debounce.fire_if_due(now) {
            return None;
        }
        if !is_valid_email(&self.form.email) {
            self.email_status = EmailStatus::Idle;
            return None;
        }
        self.email_status = EmailStatus::Checking;
        debug!(generation = self.generation, "Checking email availability");
        Some(EmailCheck {
            generation: self.generation,
            email: self.form.email.trim().to_string(),
        })
    }

    /// Apply a finished check. Results from a superseded generation are
    /// dropped; returns whether the result was applied.
    pub fn apply_email_check(&mut self, check: EmailCheckResult) -> bool {
        if check.generation != self.generation {
            debug!(
                stale = check.generation,
                current = self.generation,
                "Dropping stale availability result"
            );
            return false;
        }
        match check.result {
            Ok(true) => {
                self.email_status = EmailStatus::Available;
                if self.errors.get(Field::Email) == Some(EMAIL_TAKEN_MESSAGE) {
                    self.errors.remove(Field::Email);
                }
            }
            Ok(false) => {
                self.email_status = EmailStatus::Taken;
                self.errors.insert(Field::Email, EMAIL_TAKEN_MESSAGE);
            }
            Err(e) => {
                debug!(error = %e, "Availability check failed");
                self.email_status = EmailStatus::Error;
            }
        }
        true
    }

    /// Convenience for hosts that run the check inline.
    pub async fn poll_email_check(&mut self, now: Instant) {
        if let Some(check) = self.begin_email_check(now) {
            let api = Arc::clone(&self.api);
            let result = check.run(api.as_ref()).await;
            self.apply_email_check(result);
        }
    }

    /// When the pending availability check is due, if any.
    pub fn email_check_deadline(&self) -> Option<Instant> {
        self.email_debounce.deadline()
    }

    pub fn password_strength(&self) -> PasswordStrength {
        password_strength(&self.form.password)
    }

    pub fn is_step_valid(&self, step: RegisterStep) -> bool {
        is_step_valid(&self.form, step)
    }

    pub fn can_submit(&self) -> bool {
        let f = &self.form;
        !f.first_name.trim().is_empty()
            && !f.last_name.trim().is_empty()
            && !f.username.trim().is_empty()
            && is_valid_email(&f.email)
            && !f.password.is_empty()
            && !f.password_confirm.is_empty()
            && f.password == f.password_confirm
            && f.agree_to_terms
            && self.email_status != EmailStatus::Taken
            && !self.status.is_loading()
            && self.errors.is_empty()
    }

    /// Validate and register. Returns the server result on success.
    pub async fn submit(&mut self) -> Option<RegistrationResult> {
        let mut errors = validate_register_form(&self.form);
        if self.email_status == EmailStatus::Taken {
            errors.insert(Field::Email, EMAIL_TAKEN_MESSAGE);
        }
        if errors.has_errors() {
            debug!(fields = errors.len(), "Register form invalid");
            self.errors = errors;
            return None;
        }

        self.status = FormStatus::Loading;
        self.errors.clear();

        let request = RegisterRequest {
            email: self.form.email.trim().to_string(),
            username: self.form.username.trim().to_string(),
            password: self.form.password.clone(),
            first_name: self.form.first_name.trim().to_string(),
            last_name: self.form.last_name.trim().to_string(),
        };

        match self.api.register(&request).await {
            Ok(result) => {
                info!(username = %request.username, "Registration complete");
                self.reset();
                self.status = FormStatus::Success;
                Some(result)
            }
            Err(e) => {
                self.status = FormStatus::Error;
                if matches!(e, AuthError::EmailTaken(_)) {
                    self.email_status = EmailStatus::Taken;
                }
                match e.field_errors() {
                    Some(server) => self.errors.merge(server.clone()),
                    None => {
                        error!(error = %e, "Registration failed");
                        self.errors.insert(Field::General, e.to_string());
                    }
                }
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.form = RegisterForm::default();
        self.errors.clear();
        self.status = FormStatus::Idle;
        self.email_status = EmailStatus::Idle;
        self.email_debounce.cancel();
        self.generation += 1;
    }

    pub fn form(&self) -> &RegisterForm {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn email_status(&self) -> EmailStatus {
        self.email_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuthStorage;
    use crate::testing::{Call, FakeAuthApi};

    fn vm() -> (Arc<FakeAuthApi>, RegisterViewModel) {
        let api = Arc::new(FakeAuthApi::new(AuthStorage::in_memory()));
        let vm = RegisterViewModel::new(api.clone());
        (api, vm)
    }

    fn fill(vm: &mut RegisterViewModel, now: Instant) {
        vm.set_first_name("Ann");
        vm.set_last_name("Lee");
        vm.set_username("ann_lee");
        vm.set_email("ann@example.com", now);
        vm.set_password("Secret123!");
        vm.set_password_confirm("Secret123!");
        vm.set_agree_to_terms(true);
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test]
    async fn test_debounce_collapses_keystrokes() {
        let (api, mut vm) = vm();
        let t0 = Instant::now();
        let typed = ["a", "a@", "a@b", "a@b.", "a@b.co"];
        for (i, value) in typed.iter().enumerate() {
            let at = t0 + ms(150 * i as u64);
            vm.set_email(*value, at);
            vm.poll_email_check(at).await;
        }
        let last = t0 + ms(600);

        vm.poll_email_check(last + ms(999)).await;
        assert_eq!(api.count(|c| matches!(c, Call::CheckEmail(_))), 0);

        vm.poll_email_check(last + ms(1000)).await;
        vm.poll_email_check(last + ms(5000)).await;
        assert_eq!(api.calls(), vec![Call::CheckEmail("a@b.co".to_string())]);
        assert_eq!(vm.email_status(), EmailStatus::Available);
    }

    #[tokio::test]
    async fn test_invalid_email_never_checks() {
        let (api, mut vm) = vm();
        let t0 = Instant::now();
        vm.set_email("not-an-email", t0);
        vm.poll_email_check(t0 + EMAIL_CHECK_DELAY).await;
        assert_eq!(vm.email_status(), EmailStatus::Idle);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_taken_blocks_submit_until_available() {
        let (api, mut vm) = vm();
        let t0 = Instant::now();
        fill(&mut vm, t0);
        api.set_available(Ok(false));
        vm.poll_email_check(t0 + EMAIL_CHECK_DELAY).await;

        assert_eq!(vm.email_status(), EmailStatus::Taken);
        assert_eq!(vm.errors().get(Field::Email), Some(EMAIL_TAKEN_MESSAGE));
        assert!(!vm.can_submit());
        assert!(vm.submit().await.is_none());
        assert_eq!(api.count(|c| matches!(c, Call::Register(_))), 0);

        api.set_available(Ok(true));
        let t1 = t0 + ms(5000);
        vm.set_email("ann2@example.com", t1);
        vm.poll_email_check(t1 + EMAIL_CHECK_DELAY).await;
        assert_eq!(vm.email_status(), EmailStatus::Available);
        assert!(vm.can_submit());
    }

    #[tokio::test]
    async fn test_stale_result_is_dropped() {
        let (api, mut vm) = vm();
        let t0 = Instant::now();
        vm.set_email("old@example.com", t0);
        let check = vm.begin_email_check(t0 + EMAIL_CHECK_DELAY).expect("check due");
        assert_eq!(vm.email_status(), EmailStatus::Checking);

        api.set_available(Ok(false));
        let result = check.run(api.as_ref()).await;
        vm.set_email("new@example.com", t0 + ms(1500));

        assert!(!vm.apply_email_check(result));
        assert_eq!(vm.email_status(), EmailStatus::Idle);
        assert!(!vm.errors().contains(Field::Email));
    }

    #[tokio::test]
    async fn test_overlapping_checks_only_latest_applies() {
        let (api, mut vm) = vm();
        let t0 = Instant::now();
        vm.set_email("old@example.com", t0);
        let old = vm.begin_email_check(t0 + EMAIL_CHECK_DELAY).expect("old check due");

        let t1 = t0 + ms(1200);
        vm.set_email("new@example.com", t1);
        let new = vm.begin_email_check(t1 + EMAIL_CHECK_DELAY).expect("new check due");

        let (old, new) = futures::join!(old.run(api.as_ref()), new.run(api.as_ref()));
        assert!(vm.apply_email_check(new));
        assert!(!vm.apply_email_check(old));
        assert_eq!(vm.email_status(), EmailStatus::Available);
        assert_eq!(api.count(|c| matches!(c, Call::CheckEmail(_))), 2);
    }

    #[tokio::test]
    async fn test_check_error_does_not_block_submit() {
        let (api, mut vm) = vm();
        let t0 = Instant::now();
        fill(&mut vm, t0);
        api.set_available(Err(AuthError::Unknown("unsupported".to_string())));
        vm.poll_email_check(t0 + EMAIL_CHECK_DELAY).await;

        assert_eq!(vm.email_status(), EmailStatus::Error);
        assert!(vm.can_submit());
    }

    #[tokio::test]
    async fn test_submit_success_resets_form() {
        let (api, mut vm) = vm();
        fill(&mut vm, Instant::now());
        assert!(vm.password_strength().score >= 3);

        let result = vm.submit().await.expect("registered");
        assert_eq!(result.message, "User created successfully");
        assert_eq!(vm.status(), FormStatus::Success);
        assert_eq!(vm.form(), &RegisterForm::default());
        assert_eq!(api.calls(), vec![Call::Register("ann@example.com".to_string())]);
    }

    #[tokio::test]
    async fn test_server_field_errors_merge() {
        let (api, mut vm) = vm();
        let mut server = FieldErrors::new();
        server.insert(Field::Username, "A user with that username already exists.");
        api.set_register(Err(AuthError::UsernameTaken(server)));
        fill(&mut vm, Instant::now());

        assert!(vm.submit().await.is_none());
        assert_eq!(vm.status(), FormStatus::Error);
        assert_eq!(
            vm.errors().get(Field::Username),
            Some("A user with that username already exists.")
        );
        assert!(!vm.can_submit());

        vm.set_username("ann_lee2");
        assert!(vm.can_submit());
    }

    #[tokio::test]
    async fn test_network_failure_is_general() {
        let (api, mut vm) = vm();
        api.set_register(Err(AuthError::Network("offline".to_string())));
        fill(&mut vm, Instant::now());

        assert!(vm.submit().await.is_none());
        assert_eq!(vm.errors().get(Field::General), Some("offline"));
    }

    #[test]
    fn test_step_validation() {
        let (_api, mut vm) = vm();
        assert!(!vm.is_step_valid(RegisterStep::Personal));
        vm.set_first_name("Ann");
        vm.set_last_name("Lee");
        assert!(vm.is_step_valid(RegisterStep::Personal));
        assert!(!vm.is_step_valid(RegisterStep::Terms));
    }
}
