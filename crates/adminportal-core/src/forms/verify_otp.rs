//! Six-slot reset-code entry with auto-submit and a resend countdown.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::{Countdown, FormStatus};
use crate::api::{AuthApi, AuthError};
use crate::utils::format_countdown;
use crate::validation::{validate_otp_code, ValidationError, OTP_LENGTH};

/// Seconds before a new code may be requested.
pub const RESEND_COOLDOWN_SECS: u32 = 60;

/// What happened to a single slot edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpEntry {
    /// Not a single digit, slot out of range, or the form is busy/done.
    Rejected,
    Accepted,
    /// The last empty slot was filled and the code was submitted.
    Submitted { verified: bool },
}

pub struct VerifyOtpViewModel {
    api: Arc<dyn AuthApi>,
    email: String,
    digits: [Option<char>; OTP_LENGTH],
    status: FormStatus,
    error: Option<AuthError>,
    countdown: Countdown,
    verified_code: Option<String>,
}

impl VerifyOtpViewModel {
    /// Start verifying `email`; the resend countdown starts at `now`.
    pub fn new(api: Arc<dyn AuthApi>, email: impl Into<String>, now: Instant) -> Self {
        Self {
            api,
            email: email.into(),
            digits: [None; OTP_LENGTH],
            status: FormStatus::Idle,
            error: None,
            countdown: Countdown::started_at(RESEND_COOLDOWN_SECS, now),
            verified_code: None,
        }
    }

    fn is_locked(&self) -> bool {
        matches!(self.status, FormStatus::Loading | FormStatus::Success)
    }

    /// Put `value` into slot `index`, auto-submitting when that completes
    /// the code.
    pub async fn enter(&mut self, index: usize, value: &str) -> OtpEntry {
        if index >= OTP_LENGTH || self.is_locked() {
            return OtpEntry::Rejected;
        }
        let mut chars = value.chars();
        let digit = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => c,
            _ => return OtpEntry::Rejected,
        };

        self.digits[index] = Some(digit);
        self.error = None;
        self.status.on_edit();

        if self.is_complete() {
            let verified = self.submit().await;
            OtpEntry::Submitted { verified }
        } else {
            OtpEntry::Accepted
        }
    }

    /// Fill the first empty slot.
    pub async fn push(&mut self, value: &str) -> OtpEntry {
        match self.digits.iter().position(Option::is_none) {
            Some(index) => self.enter(index, value).await,
            None => OtpEntry::Rejected,
        }
    }

    /// Fill every slot from a whole code and submit it.
    ///
    /// A malformed code is rejected without touching the slots.
    pub async fn paste(&mut self, code: &str) -> Result<bool, ValidationError> {
        let code = code.trim();
        validate_otp_code(code)?;
        if self.is_locked() {
            return Ok(false);
        }
        for (slot, digit) in self.digits.iter_mut().zip(code.chars()) {
            *slot = Some(digit);
        }
        self.error = None;
        self.status.on_edit();
        Ok(self.submit().await)
    }

    pub fn backspace(&mut self, index: usize) {
        if index < OTP_LENGTH && !self.is_locked() {
            self.digits[index] = None;
            self.status.on_edit();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    pub fn code(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    /// Verify the entered code. Also called implicitly by `enter`.
    pub async fn submit(&mut self) -> bool {
        if !self.is_complete() || self.is_locked() {
            return false;
        }
        let code = self.code();
        self.status = FormStatus::Loading;
        self.error = None;

        match self.api.verify_reset_code(&self.email, &code).await {
            Ok(outcome) if outcome.success => {
                debug!("Reset code verified");
                self.status = FormStatus::Success;
                self.verified_code = Some(code);
                true
            }
            Ok(outcome) => {
                self.status = FormStatus::Error;
                self.error = Some(AuthError::ExpiredOrInvalidCode(outcome.message));
                false
            }
            Err(e) => {
                warn!(error = %e, "Code verification failed");
                self.status = FormStatus::Error;
                self.error = Some(e);
                false
            }
        }
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) {
        self.countdown.tick();
    }

    /// Advance the countdown by wall-clock time.
    pub fn catch_up(&mut self, now: Instant) {
        self.countdown.catch_up(now);
    }

    pub fn can_resend(&self) -> bool {
        self.countdown.is_finished() && !self.is_locked()
    }

    /// Request a fresh code. Only allowed once the countdown has run out;
    /// restarts it and clears the entered digits.
    pub async fn resend(&mut self, now: Instant) -> bool {
        if !self.can_resend() {
            return false;
        }
        self.countdown.reset(now);
        self.digits = [None; OTP_LENGTH];
        self.error = None;
        self.status = FormStatus::Idle;

        match self.api.forgot_password(&self.email).await {
            Ok(outcome) if outcome.success => true,
            Ok(outcome) => {
                self.error = Some(AuthError::Unknown(outcome.message));
                false
            }
            Err(e) => {
                warn!(error = %e, "Resend failed");
                self.error = Some(e);
                false
            }
        }
    }

    pub fn countdown_display(&self) -> String {
        format_countdown(self.countdown.remaining())
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn digits(&self) -> &[Option<char>; OTP_LENGTH] {
        &self.digits
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn error(&self) -> Option<&AuthError> {
        self.error.as_ref()
    }

    /// The code that passed verification.
    pub fn verified_code(&self) -> Option<&str> {
        self.verified_code.as_deref()
    }
}
