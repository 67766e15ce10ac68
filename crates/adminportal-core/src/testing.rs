//! In-memory `AuthApi` double shared by the session and form tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{
    AuthApi, AuthError, Credentials, Outcome, RegisterRequest, RegisteredUser, RegistrationResult,
};
use crate::models::{TokenPair, UserProfile};
use crate::storage::{AuthStorage, Scope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Login { email: String, remember_me: bool },
    Register(String),
    Logout,
    Refresh,
    ForgotPassword(String),
    VerifyResetCode { email: String, code: String },
    ResetPassword { email: String, code: String, password: String },
    CheckEmail(String),
}

pub(crate) fn sample_user() -> UserProfile {
    UserProfile {
        id: "42".to_string(),
        email: "ann@example.com".to_string(),
        display_name: "Ann Lee".to_string(),
        role: "admin".to_string(),
        avatar: None,
        first_name: Some("Ann".to_string()),
        last_name: Some("Lee".to_string()),
    }
}

pub(crate) struct FakeAuthApi {
    pub storage: AuthStorage,
    pub login: Mutex<Result<UserProfile, AuthError>>,
    pub register: Mutex<Result<RegistrationResult, AuthError>>,
    pub refresh: Mutex<Option<String>>,
    pub outcome: Mutex<Result<Outcome, AuthError>>,
    pub available: Mutex<Result<bool, AuthError>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeAuthApi {
    pub fn new(storage: AuthStorage) -> Self {
        Self {
            storage,
            login: Mutex::new(Ok(sample_user())),
            register: Mutex::new(Ok(RegistrationResult {
                message: "User created successfully".to_string(),
                user: RegisteredUser {
                    email: "ann@example.com".to_string(),
                    username: "ann_lee".to_string(),
                    first_name: "Ann".to_string(),
                    last_name: "Lee".to_string(),
                },
            })),
            refresh: Mutex::new(None),
            outcome: Mutex::new(Ok(Outcome::ok("ok"))),
            available: Mutex::new(Ok(true)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_login(&self, result: Result<UserProfile, AuthError>) {
        *self.login.lock().unwrap() = result;
    }

    pub fn set_refresh(&self, token: Option<&str>) {
        *self.refresh.lock().unwrap() = token.map(str::to_string);
    }

    pub fn set_outcome(&self, result: Result<Outcome, AuthError>) {
        *self.outcome.lock().unwrap() = result;
    }

    pub fn set_available(&self, result: Result<bool, AuthError>) {
        *self.available.lock().unwrap() = result;
    }

    pub fn set_register(&self, result: Result<RegistrationResult, AuthError>) {
        *self.register.lock().unwrap() = result;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        self.record(Call::Login {
            email: credentials.email.clone(),
            remember_me: credentials.remember_me,
        });
        let result = self.login.lock().unwrap().clone();
        if result.is_ok() {
            self.storage
                .store_tokens(
                    Scope::for_remember_me(credentials.remember_me),
                    &TokenPair {
                        access_token: "fake-access".to_string(),
                        refresh_token: "fake-refresh".to_string(),
                    },
                )
                .unwrap();
        }
        result
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RegistrationResult, AuthError> {
        self.record(Call::Register(request.email.clone()));
        self.register.lock().unwrap().clone()
    }

    async fn logout(&self) {
        self.record(Call::Logout);
        self.storage.clear_tokens().unwrap();
    }

    async fn refresh_access_token(&self) -> Option<String> {
        self.record(Call::Refresh);
        let token = self.refresh.lock().unwrap().clone();
        match &token {
            Some(t) => {
                self.storage.update_access_token(t).unwrap();
            }
            None => self.storage.clear_tokens().unwrap(),
        }
        token
    }

    async fn forgot_password(&self, email: &str) -> Result<Outcome, AuthError> {
        self.record(Call::ForgotPassword(email.to_string()));
        self.outcome.lock().unwrap().clone()
    }

    async fn verify_reset_code(&self, email: &str, code: &str) -> Result<Outcome, AuthError> {
        self.record(Call::VerifyResetCode {
            email: email.to_string(),
            code: code.to_string(),
        });
        self.outcome.lock().unwrap().clone()
    }

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<Outcome, AuthError> {
        self.record(Call::ResetPassword {
            email: email.to_string(),
            code: code.to_string(),
            password: new_password.to_string(),
        });
        self.outcome.lock().unwrap().clone()
    }

    async fn check_email_availability(&self, email: &str) -> Result<bool, AuthError> {
        self.record(Call::CheckEmail(email.to_string()));
        self.available.lock().unwrap().clone()
    }
}
