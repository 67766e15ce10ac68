//! Support ticket and feedback models.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketPriority::Low => "Low",
            TicketPriority::Medium => "Medium",
            TicketPriority::High => "High",
            TicketPriority::Urgent => "Urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketCategory {
    Technical,
    Account,
    Feature,
    #[default]
    General,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 4] = [
        TicketCategory::Technical,
        TicketCategory::Account,
        TicketCategory::Feature,
        TicketCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Technical => "technical",
            TicketCategory::Account => "account",
            TicketCategory::Feature => "feature",
            TicketCategory::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackKind {
    BugReport,
    FeatureRequest,
    #[default]
    General,
    Complaint,
    Compliment,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 5] = [
        FeedbackKind::BugReport,
        FeedbackKind::FeatureRequest,
        FeedbackKind::General,
        FeedbackKind::Complaint,
        FeedbackKind::Compliment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::BugReport => "bug-report",
            FeedbackKind::FeatureRequest => "feature-request",
            FeedbackKind::General => "general",
            FeedbackKind::Complaint => "complaint",
            FeedbackKind::Compliment => "compliment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedbackKind::BugReport => "Bug Report",
            FeedbackKind::FeatureRequest => "Feature Request",
            FeedbackKind::General => "General Feedback",
            FeedbackKind::Complaint => "Complaint",
            FeedbackKind::Compliment => "Compliment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: String,
    #[serde(alias = "subject")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(rename = "assignedTo")]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub rating: Option<u8>,
    #[serde(rename = "isAnonymous", default)]
    pub is_anonymous: bool,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enums() {
        assert_eq!(TicketPriority::parse("URGENT"), Some(TicketPriority::Urgent));
        assert_eq!(TicketPriority::parse("whenever"), None);
        assert_eq!(TicketCategory::parse(" account "), Some(TicketCategory::Account));
        assert_eq!(FeedbackKind::parse("bug-report"), Some(FeedbackKind::BugReport));
    }

    #[test]
    fn test_parse_ticket() {
        let json = r#"{"id": "t-1", "title": "Cannot log in", "description": "Stuck on OTP", "priority": "high", "status": "in-progress", "category": "account", "createdAt": "2024-05-01T10:00:00Z"}"#;
        let ticket: SupportTicket = serde_json::from_str(json).expect("Failed to parse ticket JSON");
        assert_eq!(ticket.priority, TicketPriority::High);
        assert_eq!(ticket.status, Some(TicketStatus::InProgress));
        assert_eq!(ticket.category.as_deref(), Some("account"));
    }
}
