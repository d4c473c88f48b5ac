//! Reporting, moderator actions and the automatic flag queue.
//!
//! # Invariants
//! - Every moderator action writes one `moderation_actions` row, one audit
//!   entry and notifies the affected user.
//! - A report is closed once; a reporter holds one pending report per target.
//! - Moderators cannot act on themselves or on admins.

use super::content_filter::{scan_content, ScanResult};
use super::notification_service::notify;
use super::security_monitor::SecurityMonitor;
use super::{in_transaction, require_moderator, ServiceError, ServiceResult, DAY_MS};
use crate::db::now_epoch_ms;
use crate::model::article::ArticleStatus;
use crate::model::moderation::{
    ContentFlag, ModerationAction, ModerationActionKind, ModerationStats, NewReport, Report,
    ReportId, ReportStatus, TargetType,
};
use crate::model::notification::NotificationKind;
use crate::model::security::NewAuditLog;
use crate::model::user::{User, UserId};
use crate::repo::article_repo::{ArticleRepository, SqliteArticleRepository};
use crate::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use crate::repo::moderation_repo::{
    ModerationRepository, NewModerationAction, SqliteModerationRepository,
};
use crate::repo::session_repo::{SessionRepository, SqliteSessionRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::Page;
use log::info;
use rusqlite::Connection;
use serde::Deserialize;

const STATS_ACTION_WINDOW_DAYS: i64 = 30;

/// Direct moderator action request.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionInput {
    pub target_type: TargetType,
    pub target_id: i64,
    pub action: ModerationActionKind,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Report resolution request; `action` is applied to the report target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveInput {
    #[serde(default)]
    pub action: Option<ModerationActionKind>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Persists one flag row per raised flag; returns the scan verdict.
pub(crate) fn scan_and_flag(
    conn: &Connection,
    target_type: TargetType,
    target_id: i64,
    text: &str,
) -> ServiceResult<ScanResult> {
    let result = scan_content(text);
    if result.needs_review {
        let repo = SqliteModerationRepository::new(conn);
        for hit in &result.flags {
            repo.create_flag(target_type, target_id, hit.flag, &hit.matched_terms, hit.score)?;
        }
        info!(
            "event=content_flagged module=moderation target={} id={} score={}",
            target_type.as_str(),
            target_id,
            result.score
        );
    }
    Ok(result)
}

pub struct ModerationService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ModerationService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn report(&self, reporter: &User, report: &NewReport) -> ServiceResult<Report> {
        report.validate()?;
        self.affected_user(report.target_type, report.target_id)?;

        let repo = SqliteModerationRepository::new(self.conn);
        if repo.has_pending_report(reporter.id, report.target_type, report.target_id)? {
            return Err(ServiceError::Conflict(
                "you already reported this content".to_string(),
            ));
        }
        let created = repo.create_report(reporter.id, report)?;
        info!(
            "event=report_created module=moderation report_id={} target={} reason={}",
            created.id,
            created.target_type.as_str(),
            created.reason.as_str()
        );
        Ok(created)
    }

    pub fn report_queue(
        &self,
        actor: &User,
        status: Option<ReportStatus>,
        page: Page,
    ) -> ServiceResult<Vec<Report>> {
        require_moderator(actor)?;
        Ok(SqliteModerationRepository::new(self.conn).list_reports(status, page)?)
    }

    pub fn resolve_report(
        &self,
        actor: &User,
        id: ReportId,
        input: &ResolveInput,
    ) -> ServiceResult<Report> {
        require_moderator(actor)?;
        let repo = SqliteModerationRepository::new(self.conn);
        let report = repo
            .get_report(id)?
            .ok_or_else(|| ServiceError::not_found("report", id))?;
        if report.status != ReportStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "report is already {}",
                report.status.as_str()
            )));
        }

        in_transaction(self.conn, || {
            if let Some(action) = input.action {
                self.apply(
                    actor,
                    &ActionInput {
                        target_type: report.target_type,
                        target_id: report.target_id,
                        action,
                        reason: input.note.clone(),
                    },
                    Some(report.id),
                )?;
            }
            let closed =
                repo.close_report(id, ReportStatus::Resolved, actor.id, input.note.as_deref())?;
            self.audit(actor, "report_resolved", "report", id)?;
            Ok(closed)
        })
    }

    pub fn dismiss_report(
        &self,
        actor: &User,
        id: ReportId,
        note: Option<&str>,
    ) -> ServiceResult<Report> {
        require_moderator(actor)?;
        let closed = SqliteModerationRepository::new(self.conn).close_report(
            id,
            ReportStatus::Dismissed,
            actor.id,
            note,
        )?;
        self.audit(actor, "report_dismissed", "report", id)?;
        Ok(closed)
    }

    pub fn apply_action(&self, actor: &User, input: &ActionInput) -> ServiceResult<ModerationAction> {
        require_moderator(actor)?;
        in_transaction(self.conn, || self.apply(actor, input, None))
    }

    pub fn flag_queue(
        &self,
        actor: &User,
        open_only: bool,
        page: Page,
    ) -> ServiceResult<Vec<ContentFlag>> {
        require_moderator(actor)?;
        Ok(SqliteModerationRepository::new(self.conn).list_flags(open_only, page)?)
    }

    pub fn review_flag(&self, actor: &User, flag_id: i64) -> ServiceResult<()> {
        require_moderator(actor)?;
        SqliteModerationRepository::new(self.conn).mark_flag_reviewed(flag_id, actor.id)?;
        self.audit(actor, "flag_reviewed", "content_flag", flag_id)
    }

    /// Dry-run of the content filter; nothing is stored.
    pub fn preview_scan(&self, actor: &User, text: &str) -> ServiceResult<ScanResult> {
        require_moderator(actor)?;
        Ok(scan_content(text))
    }

    pub fn actions(&self, actor: &User, page: Page) -> ServiceResult<Vec<ModerationAction>> {
        require_moderator(actor)?;
        Ok(SqliteModerationRepository::new(self.conn).list_actions(page)?)
    }

    pub fn stats(&self, actor: &User) -> ServiceResult<ModerationStats> {
        require_moderator(actor)?;
        let since = now_epoch_ms() - STATS_ACTION_WINDOW_DAYS * DAY_MS;
        Ok(SqliteModerationRepository::new(self.conn).stats(since)?)
    }

    fn apply(
        &self,
        actor: &User,
        input: &ActionInput,
        report_id: Option<ReportId>,
    ) -> ServiceResult<ModerationAction> {
        let affected = self.affected_user(input.target_type, input.target_id)?;
        if affected.id == actor.id {
            return Err(ServiceError::forbidden("cannot moderate your own content"));
        }
        if affected.is_admin() && !actor.is_admin() {
            return Err(ServiceError::forbidden("cannot moderate an admin"));
        }

        let articles = SqliteArticleRepository::new(self.conn);
        let comments = SqliteCommentRepository::new(self.conn);
        let users = SqliteUserRepository::new(self.conn);
        match (input.action, input.target_type) {
            (ModerationActionKind::Warn, _) => {}
            (ModerationActionKind::HideContent, TargetType::Article) => {
                articles.set_status(input.target_id, ArticleStatus::Archived)?
            }
            (ModerationActionKind::DeleteContent, TargetType::Article) => {
                articles.delete_article(input.target_id)?
            }
            (
                ModerationActionKind::HideContent | ModerationActionKind::DeleteContent,
                TargetType::Comment,
            ) => comments.soft_delete(input.target_id)?,
            (ModerationActionKind::SuspendUser, TargetType::User) => {
                users.set_suspended(affected.id, true)?;
                SqliteSessionRepository::new(self.conn).delete_user_sessions(affected.id, None)?;
            }
            (ModerationActionKind::UnsuspendUser, TargetType::User) => {
                users.set_suspended(affected.id, false)?
            }
            (action, target) => {
                return Err(ServiceError::invalid(format!(
                    "action `{}` does not apply to a {}",
                    action.as_str(),
                    target.as_str()
                )))
            }
        }

        let recorded = SqliteModerationRepository::new(self.conn).record_action(
            &NewModerationAction {
                moderator_id: actor.id,
                target_type: input.target_type,
                target_id: input.target_id,
                action: input.action,
                reason: input.reason.as_deref(),
                report_id,
            },
        )?;
        SecurityMonitor::new(self.conn).record_audit(
            &NewAuditLog::new(
                actor.id,
                format!("moderation_{}", input.action.as_str()),
                input.target_type.as_str(),
                Some(input.target_id),
            )
            .details(input.reason.clone().unwrap_or_default()),
        )?;

        let message = match input.reason.as_deref() {
            Some(reason) if !reason.trim().is_empty() => format!(
                "A moderator applied `{}` to your {}: {}",
                input.action.as_str(),
                input.target_type.as_str(),
                reason.trim()
            ),
            _ => format!(
                "A moderator applied `{}` to your {}",
                input.action.as_str(),
                input.target_type.as_str()
            ),
        };
        notify(
            self.conn,
            affected.id,
            Some(actor.id),
            NotificationKind::Moderation,
            message,
            Some(input.target_id),
        )?;
        info!(
            "event=moderation_action module=moderation action={} target={} id={} moderator={}",
            input.action.as_str(),
            input.target_type.as_str(),
            input.target_id,
            actor.id
        );
        Ok(recorded)
    }

    /// Resolves the user who owns a moderation target.
    fn affected_user(&self, target_type: TargetType, target_id: i64) -> ServiceResult<User> {
        let owner_id: UserId = match target_type {
            TargetType::Article => {
                SqliteArticleRepository::new(self.conn)
                    .get_article(target_id)?
                    .ok_or_else(|| ServiceError::not_found("article", target_id))?
                    .author_id
            }
            TargetType::Comment => {
                SqliteCommentRepository::new(self.conn)
                    .get_comment(target_id)?
                    .ok_or_else(|| ServiceError::not_found("comment", target_id))?
                    .user_id
            }
            TargetType::User => target_id,
        };
        SqliteUserRepository::new(self.conn)
            .get_user(owner_id)?
            .ok_or_else(|| ServiceError::not_found("user", owner_id))
    }

    fn audit(&self, actor: &User, action: &str, resource: &str, id: i64) -> ServiceResult<()> {
        SecurityMonitor::new(self.conn).record_audit(&NewAuditLog::new(
            actor.id,
            action,
            resource,
            Some(id),
        ))?;
        Ok(())
    }
}
