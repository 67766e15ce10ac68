//! Navigation guard.
//!
//! Decides, from the current `Session`, whether a navigation target may be
//! shown, must wait for session restore, or redirects elsewhere.

use std::fmt;

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Register,
    ForgotPassword,
    Dashboard,
    Support,
    Feedback,
    Terms,
    Privacy,
    NotFound(String),
}

impl Route {
    /// Parse a path. Query strings, fragments and trailing slashes are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default().trim();
        let normalized = path.trim_end_matches('/').to_ascii_lowercase();
        match normalized.as_str() {
            "" => Route::Root,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/forgot-password" => Route::ForgotPassword,
            "/dashboard" => Route::Dashboard,
            "/support" => Route::Support,
            "/feedback" => Route::Feedback,
            "/terms" | "/tos" => Route::Terms,
            "/privacy" | "/privacy-policy" => Route::Privacy,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::ForgotPassword => "/forgot-password",
            Route::Dashboard => "/dashboard",
            Route::Support => "/support",
            Route::Feedback => "/feedback",
            Route::Terms => "/terms",
            Route::Privacy => "/privacy",
            Route::NotFound(path) => path,
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Dashboard | Route::Support | Route::Feedback)
    }

    /// Pages that make no sense once signed in.
    fn is_sign_in_page(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    /// Session restore is still running; show a loading state.
    Pending,
    /// Go to `to`. `from` is kept so login can return the user there.
    Redirect { to: Route, from: Option<Route> },
}

pub fn guard(route: &Route, session: &Session) -> Navigation {
    match route {
        Route::Root | Route::NotFound(_) => Navigation::Redirect {
            to: Route::Dashboard,
            from: None,
        },
        r if r.requires_auth() && session.is_loading => Navigation::Pending,
        r if r.requires_auth() && !session.is_authenticated => Navigation::Redirect {
            to: Route::Login,
            from: Some(r.clone()),
        },
        r if r.is_sign_in_page() && session.is_authenticated => Navigation::Redirect {
            to: Route::Dashboard,
            from: None,
        },
        _ => Navigation::Allow,
    }
}
