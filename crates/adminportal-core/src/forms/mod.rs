//! Per-form view-models.
//!
//! Each view-model owns typed field values, a `FieldErrors` map and a
//! `FormStatus`, and exposes setters plus an async `submit`. Setters clear
//! the edited field's error and move an `Error` status back to `Idle`.
//! Submission validates locally first and never touches the network when
//! that fails.
//!
//! Timers (`Debounce`, `Countdown`, `Banner` expiry) are values owned by the
//! view-model and advanced by the host with the current `Instant`.

pub mod forgot_password;
pub mod login;
pub mod register;
pub mod reset_flow;
pub mod reset_password;
pub mod timer;
pub mod verify_otp;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub use forgot_password::ForgotPasswordViewModel;
pub use login::LoginViewModel;
pub use register::{EmailCheck, EmailCheckResult, EmailStatus, RegisterViewModel};
pub use reset_flow::{PasswordResetFlow, ResetEvent, ResetStep};
pub use reset_password::ResetPasswordViewModel;
pub use timer::{Countdown, Debounce};
pub use verify_otp::{OtpEntry, VerifyOtpViewModel};

/// How long an error banner stays up before clearing itself.
pub const BANNER_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl FormStatus {
    pub fn is_loading(&self) -> bool {
        *self == FormStatus::Loading
    }

    /// Editing a field after a failed submit re-enables the form.
    pub(crate) fn on_edit(&mut self) {
        if *self == FormStatus::Error {
            *self = FormStatus::Idle;
        }
    }
}

/// A general, non-field message shown above a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    message: String,
    expires_at: Option<Instant>,
}

impl Banner {
    pub fn expiring(message: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            expires_at: Some(now + ttl),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
