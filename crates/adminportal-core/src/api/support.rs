//! Authenticated support-ticket and feedback calls.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::error::error_message;
use super::{ApiClient, AuthError};
use crate::models::{Feedback, SupportTicket};
use crate::support::{FeedbackForm, SupportForm};

const TICKETS_PATH: &str = "/api/support/tickets/";
const FEEDBACK_PATH: &str = "/api/support/feedback/";

#[async_trait]
pub trait SupportApi: Send + Sync {
    /// Returns the created ticket when the server echoes it back.
    async fn create_support_ticket(
        &self,
        form: &SupportForm,
    ) -> Result<Option<SupportTicket>, AuthError>;

    async fn submit_feedback(&self, form: &FeedbackForm) -> Result<Option<Feedback>, AuthError>;

    /// The signed-in user's tickets. Failures are logged and yield an empty list.
    async fn list_tickets(&self) -> Vec<SupportTicket>;
}

#[derive(Deserialize)]
struct TicketEnvelope {
    ticket: Option<SupportTicket>,
}

#[derive(Deserialize)]
struct FeedbackEnvelope {
    feedback: Option<Feedback>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TicketList {
    Bare(Vec<SupportTicket>),
    Wrapped { tickets: Vec<SupportTicket> },
}

async fn attach_files(mut form: Form, attachments: &[PathBuf]) -> Result<Form, AuthError> {
    for (i, path) in attachments.iter().enumerate() {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AuthError::Unknown(format!("Failed to read attachment {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("attachment_{}", i));
        form = form.part(format!("attachment_{}", i), Part::bytes(bytes).file_name(file_name));
    }
    Ok(form)
}

impl ApiClient {
    fn bearer(&self) -> Result<String, AuthError> {
        self.access_token()
            .ok_or_else(|| AuthError::Unknown("You must be signed in to contact support".to_string()))
    }

    async fn post_multipart(
        &self,
        path: &str,
        form: Form,
        failure_default: &str,
    ) -> Result<String, AuthError> {
        let token = self.bearer()?;
        let response = self
            .http()
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AuthError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::from_transport(&e))?;
        if status.is_success() {
            Ok(body)
        } else {
            debug!(path, status = status.as_u16(), "Support submission rejected");
            Err(AuthError::Unknown(
                error_message(&body).unwrap_or_else(|| failure_default.to_string()),
            ))
        }
    }
}

#[async_trait]
impl SupportApi for ApiClient {
    async fn create_support_ticket(
        &self,
        form: &SupportForm,
    ) -> Result<Option<SupportTicket>, AuthError> {
        let multipart = Form::new()
            .text("subject", form.subject.clone())
            .text("description", form.description.clone())
            .text("priority", form.priority.as_str())
            .text("category", form.category.as_str());
        let multipart = attach_files(multipart, &form.attachments).await?;

        let body = self
            .post_multipart(TICKETS_PATH, multipart, "Failed to create support ticket")
            .await?;
        info!(attachments = form.attachments.len(), "Support ticket created");
        Ok(serde_json::from_str::<TicketEnvelope>(&body)
            .ok()
            .and_then(|e| e.ticket))
    }

    async fn submit_feedback(&self, form: &FeedbackForm) -> Result<Option<Feedback>, AuthError> {
        let mut multipart = Form::new()
            .text("type", form.kind.as_str())
            .text("title", form.title.clone())
            .text("description", form.description.clone())
            .text("isAnonymous", form.is_anonymous.to_string());
        if let Some(rating) = form.rating {
            multipart = multipart.text("rating", rating.to_string());
        }
        let multipart = attach_files(multipart, &form.attachments).await?;

        let body = self
            .post_multipart(FEEDBACK_PATH, multipart, "Failed to submit feedback")
            .await?;
        info!(kind = form.kind.as_str(), "Feedback submitted");
        Ok(serde_json::from_str::<FeedbackEnvelope>(&body)
            .ok()
            .and_then(|e| e.feedback))
    }

    async fn list_tickets(&self) -> Vec<SupportTicket> {
        let Some(token) = self.access_token() else {
            error!("Cannot fetch tickets without a session");
            return Vec::new();
        };

        let response = match self
            .http()
            .get(self.url(TICKETS_PATH))
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                error!(status = response.status().as_u16(), "Failed to fetch tickets");
                return Vec::new();
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch tickets");
                return Vec::new();
            }
        };

        match response.json::<TicketList>().await {
            Ok(TicketList::Bare(tickets)) | Ok(TicketList::Wrapped { tickets }) => tickets,
            Err(e) => {
                error!(error = %e, "Failed to parse tickets");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{FeedbackKind, TicketCategory, TicketPriority, TokenPair};
    use crate::storage::{AuthStorage, Scope};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in_client(server: &MockServer) -> ApiClient {
        let config = Config {
            api_base_url: server.uri(),
            request_timeout_secs: 5,
            last_email: None,
        };
        let storage = AuthStorage::in_memory();
        storage
            .store_tokens(
                Scope::Ephemeral,
                &TokenPair {
                    access_token: "access-1".to_string(),
                    refresh_token: "refresh-1".to_string(),
                },
            )
            .unwrap();
        ApiClient::new(&config, storage).unwrap()
    }

    fn ticket_form() -> SupportForm {
        SupportForm {
            subject: "Cannot export report".to_string(),
            description: "The export button does nothing.".to_string(),
            priority: TicketPriority::High,
            category: TicketCategory::Technical,
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_ticket_is_authenticated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TICKETS_PATH))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "ticket": {"id": "t-9", "title": "Cannot export report", "priority": "high", "status": "open"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let ticket = client.create_support_ticket(&ticket_form()).await.unwrap();
        assert_eq!(ticket.map(|t| t.id).as_deref(), Some("t-9"));
    }

    #[tokio::test]
    async fn test_create_ticket_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TICKETS_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Too many open tickets"})))
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let err = client.create_support_ticket(&ticket_form()).await.unwrap_err();
        assert_eq!(err.to_string(), "Too many open tickets");
    }

    #[tokio::test]
    async fn test_missing_attachment_fails_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(FEEDBACK_PATH))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let form = FeedbackForm {
            kind: FeedbackKind::BugReport,
            title: "Crash".to_string(),
            description: "It crashes on save".to_string(),
            rating: Some(2),
            is_anonymous: false,
            attachments: vec!["/definitely/not/here.png".into()],
        };
        let err = client.submit_feedback(&form).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read attachment"));
    }

    #[tokio::test]
    async fn test_submit_feedback_with_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(FEEDBACK_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("screenshot.png");
        std::fs::write(&file, b"png").unwrap();

        let client = signed_in_client(&server);
        let form = FeedbackForm {
            kind: FeedbackKind::Compliment,
            title: "Nice".to_string(),
            description: "The new dashboard is great".to_string(),
            rating: Some(5),
            is_anonymous: true,
            attachments: vec![file],
        };
        assert_eq!(client.submit_feedback(&form).await.unwrap().map(|f| f.id), None);
    }

    #[tokio::test]
    async fn test_list_tickets_error_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TICKETS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        assert!(client.list_tickets().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_tickets_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TICKETS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "t-1", "title": "One"},
                {"id": "t-2", "subject": "Two"}
            ])))
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let tickets = client.list_tickets().await;
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[1].title, "Two");
    }
}
