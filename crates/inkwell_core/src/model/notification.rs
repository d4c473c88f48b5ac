//! In-app notification model.

use super::user::UserId;
use serde::{Deserialize, Serialize};

pub type NotificationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Clap,
    Comment,
    Reply,
    Follow,
    PublicationInvite,
    SubmissionReceived,
    SubmissionApproved,
    SubmissionRejected,
    RevisionRequested,
    Moderation,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clap => "clap",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Follow => "follow",
            Self::PublicationInvite => "publication_invite",
            Self::SubmissionReceived => "submission_received",
            Self::SubmissionApproved => "submission_approved",
            Self::SubmissionRejected => "submission_rejected",
            Self::RevisionRequested => "revision_requested",
            Self::Moderation => "moderation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clap" => Some(Self::Clap),
            "comment" => Some(Self::Comment),
            "reply" => Some(Self::Reply),
            "follow" => Some(Self::Follow),
            "publication_invite" => Some(Self::PublicationInvite),
            "submission_received" => Some(Self::SubmissionReceived),
            "submission_approved" => Some(Self::SubmissionApproved),
            "submission_rejected" => Some(Self::SubmissionRejected),
            "revision_requested" => Some(Self::RevisionRequested),
            "moderation" => Some(Self::Moderation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub actor_id: Option<UserId>,
    pub kind: NotificationKind,
    pub message: String,
    /// Article, comment, publication or submission id depending on `kind`.
    pub entity_id: Option<i64>,
    pub is_read: bool,
    pub created_at: i64,
}

/// Insert model used by services when an event fans out to a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub actor_id: Option<UserId>,
    pub kind: NotificationKind,
    pub message: String,
    pub entity_id: Option<i64>,
}
