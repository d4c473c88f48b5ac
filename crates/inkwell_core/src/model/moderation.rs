//! Moderation records: user reports, moderator actions, automatic flags.

use super::user::UserId;
use super::{limit_text, LabelCount, ValidationError};
use serde::{Deserialize, Serialize};

pub type ReportId = i64;

/// Kind of entity a report, action or flag points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Article,
    Comment,
    User,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Comment => "comment",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "article" => Some(Self::Article),
            "comment" => Some(Self::Comment),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    HateSpeech,
    Misinformation,
    Copyright,
    Inappropriate,
    Other,
}

impl ReportReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Harassment => "harassment",
            Self::HateSpeech => "hate_speech",
            Self::Misinformation => "misinformation",
            Self::Copyright => "copyright",
            Self::Inappropriate => "inappropriate",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spam" => Some(Self::Spam),
            "harassment" => Some(Self::Harassment),
            "hate_speech" => Some(Self::HateSpeech),
            "misinformation" => Some(Self::Misinformation),
            "copyright" => Some(Self::Copyright),
            "inappropriate" => Some(Self::Inappropriate),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    pub target_type: TargetType,
    pub target_id: i64,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<UserId>,
    pub resolution_note: Option<String>,
    pub resolved_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewReport {
    pub target_type: TargetType,
    pub target_id: i64,
    pub reason: ReportReason,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewReport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        limit_text("description", self.description.as_deref(), 2000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationActionKind {
    Warn,
    HideContent,
    DeleteContent,
    SuspendUser,
    UnsuspendUser,
}

impl ModerationActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::HideContent => "hide_content",
            Self::DeleteContent => "delete_content",
            Self::SuspendUser => "suspend_user",
            Self::UnsuspendUser => "unsuspend_user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "warn" => Some(Self::Warn),
            "hide_content" => Some(Self::HideContent),
            "delete_content" => Some(Self::DeleteContent),
            "suspend_user" => Some(Self::SuspendUser),
            "unsuspend_user" => Some(Self::UnsuspendUser),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationAction {
    pub id: i64,
    pub moderator_id: Option<UserId>,
    pub target_type: TargetType,
    pub target_id: i64,
    pub action: ModerationActionKind,
    pub reason: Option<String>,
    pub report_id: Option<ReportId>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    Spam,
    Profanity,
    ExcessiveLinks,
    ExcessiveCaps,
    RepeatedCharacters,
}

impl FlagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Profanity => "profanity",
            Self::ExcessiveLinks => "excessive_links",
            Self::ExcessiveCaps => "excessive_caps",
            Self::RepeatedCharacters => "repeated_characters",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spam" => Some(Self::Spam),
            "profanity" => Some(Self::Profanity),
            "excessive_links" => Some(Self::ExcessiveLinks),
            "excessive_caps" => Some(Self::ExcessiveCaps),
            "repeated_characters" => Some(Self::RepeatedCharacters),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentFlag {
    pub id: i64,
    pub target_type: TargetType,
    pub target_id: i64,
    pub flag: FlagKind,
    pub matched_terms: Vec<String>,
    pub score: i64,
    pub reviewed: bool,
    pub reviewed_by: Option<UserId>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModerationStats {
    pub pending_reports: i64,
    pub resolved_reports: i64,
    pub dismissed_reports: i64,
    pub reports_by_reason: Vec<LabelCount>,
    pub open_flags: i64,
    pub actions_last_30_days: i64,
}
