//! Data models for the admin portal.
//!
//! - `UserProfile`, `TokenPair`: identity returned by the Auth API
//! - Support types: `SupportTicket`, `Feedback` and their enums

pub mod support;
pub mod user;

pub use support::{Feedback, FeedbackKind, SupportTicket, TicketCategory, TicketPriority, TicketStatus};
pub use user::{TokenPair, UserProfile};
