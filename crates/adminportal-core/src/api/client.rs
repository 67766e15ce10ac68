//! API client for the Auth API.
//!
//! `ApiClient` is the only code that talks HTTP. It owns token persistence:
//! tokens land in storage on login and refresh and are wiped on logout or
//! when a refresh is rejected.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::error_message;
use super::types::{
    AvailabilityResponse, Credentials, EmailRequest, LoginRequest, LoginResponse,
    MessageResponse, Outcome, RefreshRequest, RefreshResponse, RegisterRequest,
    RegisteredUser, RegistrationResult, ResetPasswordRequest, VerifyCodeRequest,
};
use super::AuthError;
use crate::config::Config;
use crate::models::UserProfile;
use crate::storage::{AuthStorage, Scope};

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_PATH: &str = "/api/auth/login/";
const REGISTER_PATH: &str = "/api/auth/register/";
const LOGOUT_PATH: &str = "/api/auth/logout/";
const REFRESH_PATH: &str = "/api/auth/refresh/";
const FORGOT_PASSWORD_PATH: &str = "/api/auth/forgot-password/";
const VERIFY_RESET_CODE_PATH: &str = "/api/auth/verify-reset-code/";
const RESET_PASSWORD_PATH: &str = "/api/auth/reset-password/";
const CHECK_EMAIL_PATH: &str = "/api/auth/check-email/";

const DEFAULT_REGISTERED_MESSAGE: &str = "User created successfully";

/// Operations the session store and view-models need from the Auth API.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Sign in, persisting tokens in the scope chosen by `remember_me`.
    async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError>;

    async fn register(&self, request: &RegisterRequest) -> Result<RegistrationResult, AuthError>;

    /// Best-effort server logout. Local tokens are always cleared.
    async fn logout(&self);

    /// Exchange the stored refresh token for a new access token.
    ///
    /// `None` when there is no refresh token or the exchange failed; in the
    /// failure case stored tokens are cleared.
    async fn refresh_access_token(&self) -> Option<String>;

    async fn forgot_password(&self, email: &str) -> Result<Outcome, AuthError>;

    async fn verify_reset_code(&self, email: &str, code: &str) -> Result<Outcome, AuthError>;

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<Outcome, AuthError>;

    /// Whether `email` is free to register.
    async fn check_email_availability(&self, email: &str) -> Result<bool, AuthError>;
}

/// HTTP client for the Auth API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    storage: AuthStorage,
}

impl ApiClient {
    pub fn new(config: &Config, storage: AuthStorage) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            storage,
        })
    }

    pub fn storage(&self) -> &AuthStorage {
        &self.storage
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.access_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.storage.access_token().is_some()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, AuthError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::from_transport(&e))
    }

    /// Read the body as text; a body that fails mid-stream is a transport error.
    async fn read_body(response: Response) -> Result<(StatusCode, String), AuthError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::from_transport(&e))?;
        Ok((status, body))
    }

    /// Shared shape of the three password-reset calls.
    async fn outcome_request<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        success_default: &str,
        failure_default: &str,
    ) -> Result<Outcome, AuthError> {
        let response = self.post_json(path, body).await?;
        let (status, body) = Self::read_body(response).await?;

        if status.is_success() {
            let parsed: MessageResponse = serde_json::from_str(&body).unwrap_or_default();
            Ok(Outcome::ok(parsed.message.unwrap_or_else(|| success_default.to_string())))
        } else {
            debug!(path, status = status.as_u16(), "Reset step rejected");
            Ok(Outcome::failed(
                error_message(&body).unwrap_or_else(|| failure_default.to_string()),
            ))
        }
    }

    fn clear_tokens_quietly(&self) {
        if let Err(e) = self.storage.clear_tokens() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        let request = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };
        let response = self.post_json(LOGIN_PATH, &request).await?;
        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Login rejected");
            return Err(AuthError::from_login_failure(status, &body));
        }

        let parsed: LoginResponse = serde_json::from_str(&body)
            .map_err(|_| AuthError::Unknown("Unexpected response from server".to_string()))?;

        let scope = Scope::for_remember_me(credentials.remember_me);
        self.storage
            .store_tokens(scope, &parsed.tokens)
            .map_err(|e| AuthError::Unknown(format!("Failed to save session: {}", e)))?;

        info!(user_id = %parsed.user.id, ?scope, "Signed in");
        Ok(parsed.user)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RegistrationResult, AuthError> {
        let response = self.post_json(REGISTER_PATH, request).await?;
        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Registration rejected");
            return Err(AuthError::from_registration_failure(status, &body));
        }

        let parsed: MessageResponse = serde_json::from_str(&body).unwrap_or_default();
        info!(username = %request.username, "Account registered");
        Ok(RegistrationResult {
            message: parsed
                .message
                .unwrap_or_else(|| DEFAULT_REGISTERED_MESSAGE.to_string()),
            user: RegisteredUser {
                email: request.email.clone(),
                username: request.username.clone(),
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
            },
        })
    }

    async fn logout(&self) {
        if let (Some(access), Some(refresh)) =
            (self.storage.access_token(), self.storage.refresh_token())
        {
            let result = self
                .client
                .post(self.url(LOGOUT_PATH))
                .bearer_auth(&access)
                .json(&RefreshRequest {
                    refresh_token: &refresh,
                })
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    warn!(status = response.status().as_u16(), "Server logout rejected")
                }
                Err(e) => warn!(error = %e, "Server logout failed"),
            }
        }
        self.clear_tokens_quietly();
        info!("Signed out");
    }

    async fn refresh_access_token(&self) -> Option<String> {
        let refresh = self.storage.refresh_token()?;

        let response = match self
            .post_json(
                REFRESH_PATH,
                &RefreshRequest {
                    refresh_token: &refresh,
                },
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.clear_tokens_quietly();
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Refresh token rejected");
            self.clear_tokens_quietly();
            return None;
        }

        let parsed: RefreshResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Unreadable refresh response");
                self.clear_tokens_quietly();
                return None;
            }
        };

        match self.storage.update_access_token(&parsed.access_token) {
            Ok(scope) => debug!(?scope, "Access token refreshed"),
            Err(e) => warn!(error = %e, "Failed to persist refreshed access token"),
        }
        Some(parsed.access_token)
    }

    async fn forgot_password(&self, email: &str) -> Result<Outcome, AuthError> {
        self.outcome_request(
            FORGOT_PASSWORD_PATH,
            &EmailRequest { email },
            "Reset code sent to your email",
            "Failed to send reset code",
        )
        .await
    }

    async fn verify_reset_code(&self, email: &str, code: &str) -> Result<Outcome, AuthError> {
        self.outcome_request(
            VERIFY_RESET_CODE_PATH,
            &VerifyCodeRequest { email, code },
            "Code verified successfully",
            "Invalid or expired code",
        )
        .await
    }

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<Outcome, AuthError> {
        self.outcome_request(
            RESET_PASSWORD_PATH,
            &ResetPasswordRequest {
                email,
                code,
                password: new_password,
            },
            "Password reset successfully",
            "Failed to reset password",
        )
        .await
    }

    async fn check_email_availability(&self, email: &str) -> Result<bool, AuthError> {
        let response = self.post_json(CHECK_EMAIL_PATH, &EmailRequest { email }).await?;
        let (status, body) = Self::read_body(response).await?;

        match status {
            s if s.is_success() => serde_json::from_str::<AvailabilityResponse>(&body)
                .map(|r| r.available)
                .map_err(|_| AuthError::Unknown("Unexpected availability response".to_string())),
            StatusCode::NOT_FOUND => Err(AuthError::Unknown(
                "Email availability check is not supported by this server".to_string(),
            )),
            _ => Err(AuthError::unexpected_status(status, &body)),
        }
    }
}
