//! Publication (multi-author blog) and membership model.
//!
//! # Invariants
//! - Exactly one `owner` member per publication, the creator.
//! - Role order is `owner > admin > editor > writer`.

use super::article::ArticleId;
use super::user::UserId;
use super::{limit_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};

pub type PublicationId = i64;
pub type SubmissionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Writer,
    Editor,
    Admin,
    Owner,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Editor => "editor",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "writer" => Some(Self::Writer),
            "editor" => Some(Self::Editor),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    pub fn can_manage_members(self) -> bool {
        self >= Self::Admin
    }

    pub fn can_review(self) -> bool {
        self >= Self::Editor
    }

    pub fn can_edit_publication(self) -> bool {
        self >= Self::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: PublicationId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub owner_id: UserId,
    pub member_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublicationInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl PublicationInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, 2, 100)?;
        limit_text("description", self.description.as_deref(), 1000)?;
        limit_text("logo_url", self.logo_url.as_deref(), 500)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationMember {
    pub publication_id: PublicationId,
    pub user_id: UserId,
    pub username: String,
    pub role: MemberRole,
    pub joined_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
    RevisionRequested,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RevisionRequested => "revision_requested",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "revision_requested" => Some(Self::RevisionRequested),
            _ => None,
        }
    }
}

/// One pass of an article through a publication's review workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub article_id: ArticleId,
    pub article_title: String,
    pub publication_id: PublicationId,
    pub submitted_by: UserId,
    pub status: SubmissionStatus,
    pub reviewer_id: Option<UserId>,
    pub feedback: Option<String>,
    pub submitted_at: i64,
    pub reviewed_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::MemberRole;

    #[test]
    fn role_permissions_follow_ordering() {
        assert!(MemberRole::Owner.can_manage_members());
        assert!(MemberRole::Admin.can_manage_members());
        assert!(!MemberRole::Editor.can_manage_members());
        assert!(MemberRole::Editor.can_review());
        assert!(!MemberRole::Writer.can_review());
    }
}
