use crate::api::AuthError;
use crate::models::UserProfile;

/// Current authentication state.
///
/// `is_authenticated` always equals `user.is_some()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<AuthError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    LoginStart,
    LoginSuccess(UserProfile),
    LoginFailure(AuthError),
    Logout,
    ClearError,
    /// Restore (or drop) the user after startup; also ends loading.
    SetUser(Option<UserProfile>),
}

/// Apply `action` to `state`, returning the next session.
pub fn reduce(state: &Session, action: SessionAction) -> Session {
    match action {
        SessionAction::LoginStart => Session {
            is_loading: true,
            error: None,
            ..state.clone()
        },
        SessionAction::LoginSuccess(user) => Session {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            error: None,
        },
        SessionAction::LoginFailure(error) => Session {
            user: None,
            is_authenticated: false,
            is_loading: false,
            error: Some(error),
        },
        SessionAction::Logout => Session::default(),
        SessionAction::ClearError => Session {
            error: None,
            ..state.clone()
        },
        SessionAction::SetUser(user) => Session {
            is_authenticated: user.is_some(),
            user,
            is_loading: false,
            error: state.error.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserProfile {
        UserProfile {
            id: "1".to_string(),
            email: "ann@example.com".to_string(),
            display_name: "Ann Lee".to_string(),
            role: "admin".to_string(),
            avatar: None,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_start_then_failure() {
        let s = reduce(&Session::default(), SessionAction::LoginStart);
        assert!(s.is_loading);
        let s = reduce(
            &s,
            SessionAction::LoginFailure(AuthError::InvalidCredentials("nope".to_string())),
        );
        assert!(!s.is_authenticated);
        assert!(s.user.is_none());
        assert!(!s.is_loading);
        assert!(s.error.is_some());
    }

    #[test]
    fn test_start_then_success() {
        let failed = Session {
            error: Some(AuthError::Network("offline".to_string())),
            ..Session::default()
        };
        let s = reduce(&failed, SessionAction::LoginStart);
        assert_eq!(s.error, None);
        let s = reduce(&s, SessionAction::LoginSuccess(user()));
        assert!(s.is_authenticated);
        assert_eq!(s.user, Some(user()));
        assert_eq!(s.error, None);
        assert!(!s.is_loading);
    }

    #[test]
    fn test_logout_resets_everything() {
        let s = reduce(&Session::default(), SessionAction::LoginSuccess(user()));
        assert_eq!(reduce(&s, SessionAction::Logout), Session::default());
    }

    #[test]
    fn test_clear_error_keeps_user() {
        let s = Session {
            user: Some(user()),
            is_authenticated: true,
            is_loading: false,
            error: Some(AuthError::Unknown("x".to_string())),
        };
        let s = reduce(&s, SessionAction::ClearError);
        assert_eq!(s.error, None);
        assert!(s.is_authenticated);
    }

    #[test]
    fn test_set_user_tracks_authentication() {
        let loading = reduce(&Session::default(), SessionAction::LoginStart);
        let s = reduce(&loading, SessionAction::SetUser(Some(user())));
        assert!(s.is_authenticated);
        assert!(!s.is_loading);

        let s = reduce(&s, SessionAction::SetUser(None));
        assert!(!s.is_authenticated);
        assert!(s.user.is_none());
    }
}
