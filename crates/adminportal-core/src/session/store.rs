use std::sync::Arc;

use tracing::{debug, info, warn};

use super::state::{reduce, Session, SessionAction};
use crate::api::{AuthApi, Credentials};
use crate::models::UserProfile;
use crate::storage::{AuthStorage, Scope};

/// Owns the one `Session` of the application and the transitions that
/// touch the Auth API.
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    storage: AuthStorage,
    session: Session,
}

impl SessionStore {
    pub fn new(api: Arc<dyn AuthApi>, storage: AuthStorage) -> Self {
        Self {
            api,
            storage,
            session: Session::default(),
        }
    }

    fn dispatch(&mut self, action: SessionAction) {
        debug!(action = action_name(&action), "Session transition");
        self.session = reduce(&self.session, action);
    }

    /// Restore a persisted session.
    ///
    /// A stored access token is only trusted after a successful refresh and
    /// with a readable cached profile; anything less ends anonymous with
    /// storage cleared.
    pub async fn initialize(&mut self) {
        if self.storage.access_token().is_none() {
            debug!("No stored session");
            self.dispatch(SessionAction::SetUser(None));
            return;
        }

        self.dispatch(SessionAction::LoginStart);

        if self.api.refresh_access_token().await.is_none() {
            info!("Stored session expired");
            self.discard_stored_session().await;
            return;
        }

        match self.storage.cached_user() {
            Ok(Some(user)) => {
                info!(user_id = %user.id, "Session restored");
                self.dispatch(SessionAction::SetUser(Some(user)));
            }
            Ok(None) => {
                warn!("Stored tokens without a cached profile");
                self.discard_stored_session().await;
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cached profile");
                self.discard_stored_session().await;
            }
        }
    }

    async fn discard_stored_session(&mut self) {
        self.api.logout().await;
        if let Err(e) = self.storage.clear_user() {
            warn!(error = %e, "Failed to clear cached profile");
        }
        self.dispatch(SessionAction::SetUser(None));
    }

    /// Sign in. Returns whether the session is now authenticated.
    pub async fn login(&mut self, email: &str, password: &str, remember_me: bool) -> bool {
        self.dispatch(SessionAction::LoginStart);

        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
            remember_me,
        };

        match self.api.login(&credentials).await {
            Ok(user) => {
                let scope = Scope::for_remember_me(remember_me);
                if let Err(e) = self.storage.store_user(scope, &user) {
                    warn!(error = %e, "Failed to cache user profile");
                }
                self.dispatch(SessionAction::LoginSuccess(user));
                true
            }
            Err(e) => {
                debug!(error = %e, "Login failed");
                self.dispatch(SessionAction::LoginFailure(e));
                false
            }
        }
    }

    /// Sign out. Always ends anonymous, whatever the server says.
    pub async fn logout(&mut self) {
        self.api.logout().await;
        if let Err(e) = self.storage.clear_user() {
            warn!(error = %e, "Failed to clear cached profile");
        }
        self.dispatch(SessionAction::Logout);
    }

    pub fn clear_error(&mut self) {
        self.dispatch(SessionAction::ClearError);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated
    }

    pub fn api(&self) -> Arc<dyn AuthApi> {
        Arc::clone(&self.api)
    }

    pub fn storage(&self) -> &AuthStorage {
        &self.storage
    }
}

fn action_name(action: &SessionAction) -> &'static str {
    match action {
        SessionAction::LoginStart => "login_start",
        SessionAction::LoginSuccess(_) => "login_success",
        SessionAction::LoginFailure(_) => "login_failure",
        SessionAction::Logout => "logout",
        SessionAction::ClearError => "clear_error",
        SessionAction::SetUser(_) => "set_user",
    }
}
