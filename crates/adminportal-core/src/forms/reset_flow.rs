//! Password-recovery flow: email, then code, then new password.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::{ForgotPasswordViewModel, OtpEntry, ResetPasswordViewModel, VerifyOtpViewModel};
use crate::api::AuthApi;
use crate::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetStep {
    CollectingEmail,
    AwaitingOtp { email: String },
    CollectingNewPassword { email: String, code: String },
    Done,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetEvent {
    EmailAccepted(String),
    CodeVerified(String),
    PasswordChanged,
    Back,
    Resend,
    Fail(String),
    Restart,
}

impl ResetStep {
    /// Transition table. Events that do not apply leave the step unchanged.
    pub fn apply(self, event: ResetEvent) -> ResetStep {
        use ResetEvent as E;
        use ResetStep as S;

        match (self, event) {
            (S::Done, _) => S::Done,
            (_, E::Fail(message)) => S::Failed { message },
            (S::CollectingEmail, E::EmailAccepted(email)) => S::AwaitingOtp { email },
            (S::AwaitingOtp { email }, E::CodeVerified(code)) => {
                S::CollectingNewPassword { email, code }
            }
            (S::AwaitingOtp { .. }, E::Back) => S::CollectingEmail,
            (S::AwaitingOtp { email }, E::Resend) => S::AwaitingOtp { email },
            (S::CollectingNewPassword { email, .. }, E::Back) => S::AwaitingOtp { email },
            (S::CollectingNewPassword { .. }, E::PasswordChanged) => S::Done,
            (S::Failed { .. }, E::Restart) => S::CollectingEmail,
            (step, event) => {
                debug!(?step, ?event, "Ignoring reset event");
                step
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResetStep::Done)
    }
}

/// Drives the three recovery view-models through `ResetStep`.
pub struct PasswordResetFlow {
    api: Arc<dyn AuthApi>,
    step: ResetStep,
    forgot: ForgotPasswordViewModel,
    otp: Option<VerifyOtpViewModel>,
    reset: Option<ResetPasswordViewModel>,
}

impl PasswordResetFlow {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self {
            forgot: ForgotPasswordViewModel::new(Arc::clone(&api)),
            api,
            step: ResetStep::CollectingEmail,
            otp: None,
            reset: None,
        }
    }

    fn transition(&mut self, event: ResetEvent) {
        let step = std::mem::replace(&mut self.step, ResetStep::CollectingEmail);
        self.step = step.apply(event);
        debug!(step = ?self.step, "Reset flow step");
    }

    pub fn step(&self) -> &ResetStep {
        &self.step
    }

    pub fn forgot(&mut self) -> &mut ForgotPasswordViewModel {
        &mut self.forgot
    }

    pub fn otp(&mut self) -> Option<&mut VerifyOtpViewModel> {
        self.otp.as_mut()
    }

    pub fn reset(&mut self) -> Option<&mut ResetPasswordViewModel> {
        self.reset.as_mut()
    }

    /// Request a code for the email entered in the first step.
    pub async fn submit_email(&mut self, now: Instant) -> bool {
        if self.step != ResetStep::CollectingEmail || !self.forgot.submit(now).await {
            return false;
        }
        let email = self.forgot.email().to_string();
        self.otp = Some(VerifyOtpViewModel::new(Arc::clone(&self.api), email.clone(), now));
        self.transition(ResetEvent::EmailAccepted(email));
        true
    }

    /// Submit a whole pasted code; advances once it verifies.
    pub async fn paste_code(&mut self, code: &str) -> Result<bool, ValidationError> {
        if !matches!(self.step, ResetStep::AwaitingOtp { .. }) {
            return Ok(false);
        }
        let Some(otp) = self.otp.as_mut() else {
            return Ok(false);
        };
        let verified = otp.paste(code).await?;
        if verified {
            self.code_verified();
        }
        Ok(verified)
    }

    /// Type one digit into the code; advances once the code verifies.
    pub async fn enter_digit(&mut self, value: &str) -> OtpEntry {
        let Some(otp) = self.otp.as_mut() else {
            return OtpEntry::Rejected;
        };
        if !matches!(self.step, ResetStep::AwaitingOtp { .. }) {
            return OtpEntry::Rejected;
        }
        let entry = otp.push(value).await;
        if let OtpEntry::Submitted { verified: true } = entry {
            self.code_verified();
        }
        entry
    }

    fn code_verified(&mut self) {
        let (Some(otp), ResetStep::AwaitingOtp { email }) = (self.otp.as_ref(), &self.step) else {
            return;
        };
        let Some(code) = otp.verified_code().map(str::to_string) else {
            return;
        };
        self.reset = Some(ResetPasswordViewModel::new(
            Arc::clone(&self.api),
            email.clone(),
            code.clone(),
        ));
        self.transition(ResetEvent::CodeVerified(code));
    }

    pub async fn resend(&mut self, now: Instant) -> bool {
        let Some(otp) = self.otp.as_mut() else {
            return false;
        };
        let sent = otp.resend(now).await;
        if sent {
            self.transition(ResetEvent::Resend);
        }
        sent
    }

    /// Set the new password. A rejected reset means the code can no longer
    /// be used, so the flow fails and must be restarted.
    pub async fn submit_new_password(&mut self) -> bool {
        if self.step.is_terminal() {
            return false;
        }
        let Some(reset) = self.reset.as_mut() else {
            return false;
        };
        match reset.submit().await {
            Some(outcome) if outcome.success => {
                self.transition(ResetEvent::PasswordChanged);
                true
            }
            Some(outcome) => {
                self.transition(ResetEvent::Fail(outcome.message));
                false
            }
            None => false,
        }
    }

    pub fn back(&mut self, now: Instant) {
        match &self.step {
            ResetStep::AwaitingOtp { .. } => {
                self.otp = None;
                self.forgot.reopen();
            }
            ResetStep::CollectingNewPassword { email, .. } => {
                self.reset = None;
                self.otp = Some(VerifyOtpViewModel::new(Arc::clone(&self.api), email.clone(), now));
            }
            _ => {}
        }
        self.transition(ResetEvent::Back);
    }

    /// Start over after a failure.
    pub fn restart(&mut self) {
        if matches!(self.step, ResetStep::Failed { .. }) {
            self.forgot.reset();
            self.otp = None;
            self.reset = None;
        }
        self.transition(ResetEvent::Restart);
    }

    /// Advance banner expiry and the resend countdown.
    pub fn tick(&mut self, now: Instant) {
        self.forgot.tick(now);
        if let Some(otp) = self.otp.as_mut() {
            otp.catch_up(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Outcome;
    use crate::storage::AuthStorage;
    use crate::testing::{Call, FakeAuthApi};

    fn email_step() -> ResetStep {
        ResetStep::AwaitingOtp {
            email: "ann@example.com".to_string(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let step = ResetStep::CollectingEmail
            .apply(ResetEvent::EmailAccepted("ann@example.com".to_string()));
        assert_eq!(step, email_step());
        let step = step.apply(ResetEvent::CodeVerified("123456".to_string()));
        assert_eq!(
            step,
            ResetStep::CollectingNewPassword {
                email: "ann@example.com".to_string(),
                code: "123456".to_string()
            }
        );
        assert_eq!(step.apply(ResetEvent::PasswordChanged), ResetStep::Done);
    }

    #[test]
    fn test_back_and_resend() {
        assert_eq!(email_step().apply(ResetEvent::Back), ResetStep::CollectingEmail);
        assert_eq!(email_step().apply(ResetEvent::Resend), email_step());
        let collecting = email_step().apply(ResetEvent::CodeVerified("1".to_string()));
        assert_eq!(collecting.apply(ResetEvent::Back), email_step());
    }

    #[test]
    fn test_failure_and_restart() {
        let failed = email_step().apply(ResetEvent::Fail("boom".to_string()));
        assert_eq!(
            failed,
            ResetStep::Failed {
                message: "boom".to_string()
            }
        );
        assert_eq!(failed.clone().apply(ResetEvent::Back), failed);
        assert_eq!(failed.apply(ResetEvent::Restart), ResetStep::CollectingEmail);
    }

    #[test]
    fn test_done_is_terminal() {
        for event in [
            ResetEvent::Back,
            ResetEvent::Restart,
            ResetEvent::Fail("x".to_string()),
            ResetEvent::EmailAccepted("a@b.co".to_string()),
        ] {
            assert_eq!(ResetStep::Done.apply(event), ResetStep::Done);
        }
        assert!(ResetStep::Done.is_terminal());
    }

    #[test]
    fn test_out_of_order_events_ignored() {
        assert_eq!(
            ResetStep::CollectingEmail.apply(ResetEvent::PasswordChanged),
            ResetStep::CollectingEmail
        );
        assert_eq!(
            ResetStep::CollectingEmail.apply(ResetEvent::CodeVerified("1".to_string())),
            ResetStep::CollectingEmail
        );
    }

    #[tokio::test]
    async fn test_full_flow() {
        let api = Arc::new(FakeAuthApi::new(AuthStorage::in_memory()));
        let mut flow = PasswordResetFlow::new(api.clone());
        let now = Instant::now();

        flow.forgot().set_email("ann@example.com");
        assert!(flow.submit_email(now).await);
        assert_eq!(flow.step(), &email_step());

        for d in ["1", "2", "3", "4", "5", "6"] {
            flow.enter_digit(d).await;
        }
        assert!(matches!(flow.step(), ResetStep::CollectingNewPassword { .. }));

        let reset = flow.reset().expect("reset step");
        reset.set_password("NewSecret1!");
        reset.set_password_confirm("NewSecret1!");
        assert!(flow.submit_new_password().await);
        assert_eq!(flow.step(), &ResetStep::Done);
        assert_eq!(
            api.calls().last(),
            Some(&Call::ResetPassword {
                email: "ann@example.com".to_string(),
                code: "123456".to_string(),
                password: "NewSecret1!".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_pasted_code_and_nothing_after_done() {
        let api = Arc::new(FakeAuthApi::new(AuthStorage::in_memory()));
        let mut flow = PasswordResetFlow::new(api.clone());
        let now = Instant::now();

        assert_eq!(flow.paste_code("123456").await, Ok(false));
        flow.forgot().set_email("ann@example.com");
        assert!(flow.submit_email(now).await);
        assert_eq!(flow.paste_code("12 34").await, Err(ValidationError::InvalidCode));
        assert_eq!(flow.step(), &email_step());

        assert_eq!(flow.paste_code("123456").await, Ok(true));
        assert!(matches!(flow.step(), ResetStep::CollectingNewPassword { .. }));

        let reset = flow.reset().expect("reset step");
        reset.set_password("NewSecret1!");
        reset.set_password_confirm("NewSecret1!");
        assert!(flow.submit_new_password().await);
        assert!(flow.step().is_terminal());

        assert!(!flow.submit_new_password().await);
        assert_eq!(flow.paste_code("123456").await, Ok(false));
        assert_eq!(flow.enter_digit("1").await, OtpEntry::Rejected);
        assert_eq!(api.count(|c| matches!(c, Call::ResetPassword { .. })), 1);
        assert_eq!(api.count(|c| matches!(c, Call::VerifyResetCode { .. })), 1);
    }

    #[tokio::test]
    async fn test_rejected_reset_fails_flow() {
        let api = Arc::new(FakeAuthApi::new(AuthStorage::in_memory()));
        let mut flow = PasswordResetFlow::new(api.clone());
        let now = Instant::now();

        flow.forgot().set_email("ann@example.com");
        flow.submit_email(now).await;
        for d in ["1", "2", "3", "4", "5", "6"] {
            flow.enter_digit(d).await;
        }
        api.set_outcome(Ok(Outcome::failed("Invalid or expired code")));
        let reset = flow.reset().expect("reset step");
        reset.set_password("NewSecret1!");
        reset.set_password_confirm("NewSecret1!");

        assert!(!flow.submit_new_password().await);
        assert_eq!(
            flow.step(),
            &ResetStep::Failed {
                message: "Invalid or expired code".to_string()
            }
        );

        flow.restart();
        assert_eq!(flow.step(), &ResetStep::CollectingEmail);
        assert_eq!(flow.forgot().email(), "");
    }

    #[tokio::test]
    async fn test_back_from_otp_allows_new_email() {
        let api = Arc::new(FakeAuthApi::new(AuthStorage::in_memory()));
        let mut flow = PasswordResetFlow::new(api.clone());
        let now = Instant::now();

        flow.forgot().set_email("ann@example.com");
        flow.submit_email(now).await;
        flow.back(now);
        assert_eq!(flow.step(), &ResetStep::CollectingEmail);
        assert!(flow.otp().is_none());

        flow.forgot().set_email("ann@example.org");
        assert!(flow.submit_email(now).await);
        assert_eq!(
            flow.step(),
            &ResetStep::AwaitingOtp {
                email: "ann@example.org".to_string()
            }
        );
    }
}
