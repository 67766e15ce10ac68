use std::sync::Arc;

use tracing::{error, info};

use super::{validate_feedback_form, validate_support_form, FeedbackForm, SupportForm};
use crate::api::SupportApi;
use crate::forms::FormStatus;
use crate::models::{Feedback, SupportTicket};
use crate::validation::{Field, FieldErrors};

pub struct SupportViewModel {
    api: Arc<dyn SupportApi>,
    form: SupportForm,
    errors: FieldErrors,
    status: FormStatus,
}

impl SupportViewModel {
    pub fn new(api: Arc<dyn SupportApi>) -> Self {
        Self {
            api,
            form: SupportForm::default(),
            errors: FieldErrors::new(),
            status: FormStatus::Idle,
        }
    }

    /// Edit the form in place. Touched fields are revalidated on submit.
    pub fn form_mut(&mut self) -> &mut SupportForm {
        self.errors.remove(Field::Submit);
        self.status.on_edit();
        &mut self.form
    }

    pub fn validate(&mut self) -> bool {
        self.errors = validate_support_form(&self.form);
        !self.errors.has_errors()
    }

    /// Validate and file the ticket. `Some` on success, holding the ticket
    /// when the server echoed it back.
    pub async fn submit(&mut self) -> Option<Option<SupportTicket>> {
        if self.status.is_loading() || !self.validate() {
            return None;
        }
        self.status = FormStatus::Loading;

        match self.api.create_support_ticket(&self.form).await {
            Ok(ticket) => {
                info!("Support request submitted");
                self.status = FormStatus::Success;
                self.form = SupportForm::default();
                Some(ticket)
            }
            Err(e) => {
                error!(error = %e, "Support request failed");
                self.status = FormStatus::Error;
                self.errors.insert(Field::Submit, e.to_string());
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.form = SupportForm::default();
        self.errors.clear();
        self.status = FormStatus::Idle;
    }

    pub fn form(&self) -> &SupportForm {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }
}

pub struct FeedbackViewModel {
    api: Arc<dyn SupportApi>,
    form: FeedbackForm,
    errors: FieldErrors,
    status: FormStatus,
}

impl FeedbackViewModel {
    pub fn new(api: Arc<dyn SupportApi>) -> Self {
        Self {
            api,
            form: FeedbackForm::default(),
            errors: FieldErrors::new(),
            status: FormStatus::Idle,
        }
    }

    pub fn form_mut(&mut self) -> &mut FeedbackForm {
        self.errors.remove(Field::Submit);
        self.status.on_edit();
        &mut self.form
    }

    pub fn validate(&mut self) -> bool {
        self.errors = validate_feedback_form(&self.form);
        !self.errors.has_errors()
    }

    pub async fn submit(&mut self) -> Option<Option<Feedback>> {
        if self.status.is_loading() || !self.validate() {
            return None;
        }
        self.status = FormStatus::Loading;

        match self.api.submit_feedback(&self.form).await {
            Ok(feedback) => {
                info!(kind = self.form.kind.as_str(), "Feedback submitted");
                self.status = FormStatus::Success;
                self.form = FeedbackForm::default();
                Some(feedback)
            }
            Err(e) => {
                error!(error = %e, "Feedback submission failed");
                self.status = FormStatus::Error;
                self.errors.insert(Field::Submit, e.to_string());
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.form = FeedbackForm::default();
        self.errors.clear();
        self.status = FormStatus::Idle;
    }

    pub fn form(&self) -> &FeedbackForm {
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
    use crate::api::AuthError;
    use crate::models::{FeedbackKind, TicketPriority};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSupportApi {
        fail_with: Mutex<Option<String>>,
        tickets: Mutex<Vec<SupportForm>>,
        feedback: Mutex<Vec<FeedbackForm>>,
    }

    #[async_trait]
    impl SupportApi for FakeSupportApi {
        async fn create_support_ticket(
            &self,
            form: &SupportForm,
        ) -> Result<Option<SupportTicket>, AuthError> {
            if let Some(message) = self.fail_with.lock().unwrap().clone() {
                return Err(AuthError::Unknown(message));
            }
            self.tickets.lock().unwrap().push(form.clone());
            Ok(None)
        }

        async fn submit_feedback(&self, form: &FeedbackForm) -> Result<Option<Feedback>, AuthError> {
            if let Some(message) = self.fail_with.lock().unwrap().clone() {
                return Err(AuthError::Unknown(message));
            }
            self.feedback.lock().unwrap().push(form.clone());
            Ok(None)
        }

        async fn list_tickets(&self) -> Vec<SupportTicket> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_invalid_ticket_not_sent() {
        let api = Arc::new(FakeSupportApi::default());
        let mut vm = SupportViewModel::new(api.clone());
        vm.form_mut().subject = "Hey".to_string();
        assert!(vm.submit().await.is_none());
        assert!(vm.errors().contains(Field::Subject));
        assert!(vm.errors().contains(Field::Description));
        assert!(api.tickets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ticket_submitted_and_form_cleared() {
        let api = Arc::new(FakeSupportApi::default());
        let mut vm = SupportViewModel::new(api.clone());
        {
            let form = vm.form_mut();
            form.subject = "Export broken".to_string();
            form.description = "CSV export returns an empty file.".to_string();
            form.priority = TicketPriority::Urgent;
        }
        assert!(vm.submit().await.is_some());
        assert_eq!(vm.status(), FormStatus::Success);
        assert_eq!(vm.form(), &SupportForm::default());
        let sent = api.tickets.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].priority, TicketPriority::Urgent);
    }

    #[tokio::test]
    async fn test_server_failure_under_submit_key() {
        let api = Arc::new(FakeSupportApi::default());
        *api.fail_with.lock().unwrap() = Some("Too many open tickets".to_string());
        let mut vm = SupportViewModel::new(api.clone());
        {
            let form = vm.form_mut();
            form.subject = "Export broken".to_string();
            form.description = "CSV export returns an empty file.".to_string();
        }
        assert!(vm.submit().await.is_none());
        assert_eq!(vm.errors().get(Field::Submit), Some("Too many open tickets"));
        assert_eq!(vm.status(), FormStatus::Error);

        vm.form_mut().subject.push('!');
        assert!(!vm.errors().contains(Field::Submit));
        assert_eq!(vm.status(), FormStatus::Idle);

        vm.clear();
        assert!(vm.errors().is_empty());
        assert!(vm.form().subject.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_submit() {
        let api = Arc::new(FakeSupportApi::default());
        let mut vm = FeedbackViewModel::new(api.clone());
        {
            let form = vm.form_mut();
            form.kind = FeedbackKind::FeatureRequest;
            form.title = "Dark mode".to_string();
            form.description = "Please add a dark theme.".to_string();
            form.rating = Some(9);
        }
        assert!(vm.submit().await.is_none());
        assert!(vm.errors().contains(Field::Rating));

        vm.form_mut().rating = Some(4);
        assert!(vm.submit().await.is_some());
        let sent = api.feedback.lock().unwrap();
        assert_eq!(sent[0].kind, FeedbackKind::FeatureRequest);
        assert_eq!(sent[0].rating, Some(4));
    }
}
