//! Editorial submission workflow.
//!
//! # Invariants
//! - Only the article's author, as a publication member, submits.
//! - One pending submission per article and publication.
//! - Only pending submissions are reviewed, by editors and above.

use super::moderation_service::scan_and_flag;
use super::notification_service::notify;
use super::{in_transaction, ServiceError, ServiceResult};
use crate::model::article::{ArticleId, ArticleStatus};
use crate::model::moderation::TargetType;
use crate::model::notification::NotificationKind;
use crate::model::publication::{
    MemberRole, PublicationId, Submission, SubmissionId, SubmissionStatus,
};
use crate::model::user::User;
use crate::repo::article_repo::{ArticleRepository, SqliteArticleRepository};
use crate::repo::publication_repo::{PublicationRepository, SqlitePublicationRepository};
use crate::repo::submission_repo::{SqliteSubmissionRepository, SubmissionRepository};
use log::info;
use rusqlite::Connection;

pub const FEEDBACK_MAX_CHARS: usize = 2000;

pub struct WorkflowService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> WorkflowService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn submit(
        &self,
        actor: &User,
        article_id: ArticleId,
        publication_id: PublicationId,
    ) -> ServiceResult<Submission> {
        let article = SqliteArticleRepository::new(self.conn)
            .get_article(article_id)?
            .ok_or_else(|| ServiceError::not_found("article", article_id))?;
        if article.author_id != actor.id {
            return Err(ServiceError::forbidden("only the author can submit an article"));
        }
        if article.status == ArticleStatus::Archived {
            return Err(ServiceError::invalid("archived articles cannot be submitted"));
        }

        let publications = SqlitePublicationRepository::new(self.conn);
        let publication = publications
            .get_publication(publication_id)?
            .ok_or_else(|| ServiceError::not_found("publication", publication_id))?;
        if publications.member_role(publication_id, actor.id)?.is_none() {
            return Err(ServiceError::forbidden(
                "only publication members can submit articles",
            ));
        }

        let submission = SqliteSubmissionRepository::new(self.conn).create_submission(
            article_id,
            publication_id,
            actor.id,
        )?;
        for editor in publications.member_ids_with_role(publication_id, MemberRole::Editor)? {
            notify(
                self.conn,
                editor,
                Some(actor.id),
                NotificationKind::SubmissionReceived,
                format!(
                    "{} submitted \"{}\" to {}",
                    actor.username, article.title, publication.name
                ),
                Some(submission.id),
            )?;
        }
        info!(
            "event=submission_create module=workflow status=ok submission_id={} publication_id={}",
            submission.id, publication_id
        );
        Ok(submission)
    }

    /// Pending submissions of a publication, oldest first.
    pub fn review_queue(
        &self,
        actor: &User,
        publication_id: PublicationId,
    ) -> ServiceResult<Vec<Submission>> {
        self.require_reviewer(actor, publication_id)?;
        Ok(SqliteSubmissionRepository::new(self.conn)
            .list_for_publication(publication_id, Some(SubmissionStatus::Pending))?)
    }

    /// Approves and publishes the article under the publication.
    pub fn approve(
        &self,
        actor: &User,
        id: SubmissionId,
        feedback: Option<&str>,
    ) -> ServiceResult<Submission> {
        let pending = self.require_pending_for_reviewer(actor, id)?;
        let articles = SqliteArticleRepository::new(self.conn);
        let article = articles
            .get_article(pending.article_id)?
            .ok_or_else(|| ServiceError::not_found("article", pending.article_id))?;
        if article.content.trim().is_empty() {
            return Err(ServiceError::invalid("cannot publish an article without content"));
        }

        in_transaction(self.conn, || {
            let submission = self.close(actor, id, SubmissionStatus::Approved, feedback)?;
            articles.set_publication(article.id, Some(submission.publication_id))?;
            if !article.is_published() {
                articles.set_status(article.id, ArticleStatus::Published)?;
                scan_and_flag(
                    self.conn,
                    TargetType::Article,
                    article.id,
                    &format!("{}\n{}", article.title, article.content),
                )?;
            }
            Ok(submission)
        })
    }

    pub fn reject(
        &self,
        actor: &User,
        id: SubmissionId,
        feedback: Option<&str>,
    ) -> ServiceResult<Submission> {
        self.require_pending_for_reviewer(actor, id)?;
        self.close(actor, id, SubmissionStatus::Rejected, feedback)
    }

    pub fn request_revision(
        &self,
        actor: &User,
        id: SubmissionId,
        feedback: &str,
    ) -> ServiceResult<Submission> {
        if feedback.trim().is_empty() {
            return Err(ServiceError::invalid("feedback is required for a revision request"));
        }
        self.require_pending_for_reviewer(actor, id)?;
        self.close(actor, id, SubmissionStatus::RevisionRequested, Some(feedback))
    }

    pub fn my_submissions(&self, actor: &User) -> ServiceResult<Vec<Submission>> {
        Ok(SqliteSubmissionRepository::new(self.conn).list_for_submitter(actor.id)?)
    }

    /// Visible to the submitter and to reviewers of the publication.
    pub fn get(&self, actor: &User, id: SubmissionId) -> ServiceResult<Submission> {
        let submission = self.require(id)?;
        if submission.submitted_by != actor.id {
            self.require_reviewer(actor, submission.publication_id)?;
        }
        Ok(submission)
    }

    fn require(&self, id: SubmissionId) -> ServiceResult<Submission> {
        SqliteSubmissionRepository::new(self.conn)
            .get_submission(id)?
            .ok_or_else(|| ServiceError::not_found("submission", id))
    }

    fn require_reviewer(&self, actor: &User, publication_id: PublicationId) -> ServiceResult<()> {
        let publications = SqlitePublicationRepository::new(self.conn);
        publications
            .get_publication(publication_id)?
            .ok_or_else(|| ServiceError::not_found("publication", publication_id))?;
        if actor.is_admin() {
            return Ok(());
        }
        match publications.member_role(publication_id, actor.id)? {
            Some(role) if role.can_review() => Ok(()),
            _ => Err(ServiceError::forbidden("editor role or higher required")),
        }
    }

    fn require_pending_for_reviewer(&self, actor: &User, id: SubmissionId) -> ServiceResult<Submission> {
        let submission = self.require(id)?;
        self.require_reviewer(actor, submission.publication_id)?;
        if submission.status != SubmissionStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "submission is already {}",
                submission.status.as_str()
            )));
        }
        Ok(submission)
    }

    fn close(
        &self,
        actor: &User,
        id: SubmissionId,
        status: SubmissionStatus,
        feedback: Option<&str>,
    ) -> ServiceResult<Submission> {
        let feedback = feedback.map(str::trim).filter(|text| !text.is_empty());
        if feedback.is_some_and(|text| text.chars().count() > FEEDBACK_MAX_CHARS) {
            return Err(ServiceError::invalid(format!(
                "feedback must be at most {FEEDBACK_MAX_CHARS} characters"
            )));
        }
        let submission =
            SqliteSubmissionRepository::new(self.conn).review(id, actor.id, status, feedback)?;

        let (kind, verb) = match status {
            SubmissionStatus::Approved => (NotificationKind::SubmissionApproved, "approved"),
            SubmissionStatus::Rejected => (NotificationKind::SubmissionRejected, "rejected"),
            _ => (NotificationKind::RevisionRequested, "returned for revision"),
        };
        notify(
            self.conn,
            submission.submitted_by,
            Some(actor.id),
            kind,
            format!("\"{}\" was {}", submission.article_title, verb),
            Some(submission.id),
        )?;
        info!(
            "event=submission_review module=workflow status=ok submission_id={} outcome={}",
            id,
            status.as_str()
        );
        Ok(submission)
    }
}
