//! Support-ticket and feedback forms.

mod view_model;

use std::path::PathBuf;

use crate::models::{FeedbackKind, TicketCategory, TicketPriority};
use crate::validation::{validate_text_length, Field, FieldErrors, ValidationError};

pub use view_model::{FeedbackViewModel, SupportViewModel};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportForm {
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
    pub category: TicketCategory,
    pub attachments: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackForm {
    pub kind: FeedbackKind,
    pub title: String,
    pub description: String,
    /// 1-5 stars; `None` when the user skipped the rating.
    pub rating: Option<u8>,
    pub is_anonymous: bool,
    pub attachments: Vec<PathBuf>,
}

pub fn validate_support_form(form: &SupportForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(Field::Subject, validate_text_length(&form.subject, "Subject", 5, 100));
    errors.check(
        Field::Description,
        validate_text_length(&form.description, "Description", 10, 1000),
    );
    errors
}

pub fn validate_feedback_form(form: &FeedbackForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(Field::Title, validate_text_length(&form.title, "Title", 3, 100));
    errors.check(
        Field::Description,
        validate_text_length(&form.description, "Description", 10, 1000),
    );
    if let Some(rating) = form.rating {
        if !(1..=5).contains(&rating) {
            errors.check(Field::Rating, Err(ValidationError::RatingOutOfRange));
        }
    }
    errors
}
