use tracing::{debug, error};

use super::FormStatus;
use crate::api::AuthError;
use crate::session::SessionStore;
use crate::validation::{is_valid_email, validate_login_form, Field, FieldErrors, LoginForm};

#[derive(Debug, Default)]
pub struct LoginViewModel {
    form: LoginForm,
    errors: FieldErrors,
    status: FormStatus,
}

impl LoginViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a remembered email pre-filled.
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            form: LoginForm {
                email: email.into(),
                ..LoginForm::default()
            },
            ..Self::default()
        }
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.form.email = value.into();
        self.edited(Field::Email);
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        self.form.password = value.into();
        self.edited(Field::Password);
    }

    pub fn set_remember_me(&mut self, value: bool) {
        self.form.remember_me = value;
        self.status.on_edit();
    }

    fn edited(&mut self, field: Field) {
        self.errors.remove(field);
        self.errors.remove(Field::General);
        self.status.on_edit();
    }

    pub fn can_submit(&self) -> bool {
        is_valid_email(&self.form.email)
            && !self.form.password.trim().is_empty()
            && !self.status.is_loading()
    }

    /// Validate and sign in through `store`. Returns whether sign-in succeeded.
    pub async fn submit(&mut self, store: &mut SessionStore) -> bool {
        let errors = validate_login_form(&self.form);
        if errors.has_errors() {
            debug!(fields = errors.len(), "Login form invalid");
            self.errors = errors;
            return false;
        }

        self.status = FormStatus::Loading;
        self.errors.clear();

        let ok = store
            .login(&self.form.email, &self.form.password, self.form.remember_me)
            .await;
        if ok {
            self.status = FormStatus::Success;
            self.form = LoginForm::default();
            return true;
        }

        self.status = FormStatus::Error;
        match store.session().error.clone() {
            Some(AuthError::InvalidCredentials(message)) => {
                self.errors.insert(Field::Email, message);
            }
            Some(other) => {
                error!(error = %other, "Login failed");
                self.errors.insert(Field::General, other.to_string());
            }
            None => {
                self.errors.insert(Field::General, "Login failed");
            }
        }
        false
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuthStorage;
    use crate::testing::FakeAuthApi;
    use std::sync::Arc;

    fn store() -> (Arc<FakeAuthApi>, SessionStore) {
        let api = Arc::new(FakeAuthApi::new(AuthStorage::in_memory()));
        let store = SessionStore::new(api.clone(), api.storage.clone());
        (api, store)
    }

    #[tokio::test]
    async fn test_invalid_form_skips_network() {
        let (api, mut store) = store();
        let mut vm = LoginViewModel::new();
        assert!(!vm.can_submit());

        assert!(!vm.submit(&mut store).await);
        assert!(vm.errors().contains(Field::Email));
        assert!(vm.errors().contains(Field::Password));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_success_clears_password() {
        let (_api, mut store) = store();
        let mut vm = LoginViewModel::new();
        vm.set_email("ann@example.com");
        vm.set_password("Secret123!");
        vm.set_remember_me(true);
        assert!(vm.can_submit());

        assert!(vm.submit(&mut store).await);
        assert_eq!(vm.status(), FormStatus::Success);
        assert!(vm.form().password.is_empty());
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn test_invalid_credentials_land_on_email() {
        let (api, mut store) = store();
        api.set_login(Err(AuthError::InvalidCredentials("Invalid credentials".to_string())));
        let mut vm = LoginViewModel::new();
        vm.set_email("ann@example.com");
        vm.set_password("wrong-pass");

        assert!(!vm.submit(&mut store).await);
        assert_eq!(vm.status(), FormStatus::Error);
        assert_eq!(vm.errors().get(Field::Email), Some("Invalid credentials"));

        vm.set_email("ann@example.org");
        assert_eq!(vm.status(), FormStatus::Idle);
        assert!(!vm.errors().contains(Field::Email));
    }

    #[tokio::test]
    async fn test_network_error_is_general() {
        let (api, mut store) = store();
        api.set_login(Err(AuthError::Network("Connection timed out. Please try again.".to_string())));
        let mut vm = LoginViewModel::with_email("ann@example.com");
        vm.set_password("Secret123!");

        assert!(!vm.submit(&mut store).await);
        assert_eq!(
            vm.errors().get(Field::General),
            Some("Connection timed out. Please try again.")
        );
        assert!(!vm.errors().contains(Field::Email));
    }
}
