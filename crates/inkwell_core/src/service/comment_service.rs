//! Comment thread use-cases.
//!
//! # Invariants
//! - Comments attach only to published articles.
//! - A reply's parent lives on the same article and is not deleted.
//! - Editing is author-only; deletion is soft.

use super::article_service::ArticleService;
use super::moderation_service::scan_and_flag;
use super::notification_service::notify;
use super::{ServiceError, ServiceResult};
use crate::model::article::ArticleId;
use crate::model::engagement::{Comment, CommentId};
use crate::model::moderation::TargetType;
use crate::model::notification::NotificationKind;
use crate::model::user::User;
use crate::repo::article_repo::{ArticleRepository, SqliteArticleRepository};
use crate::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use log::info;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCommentInput {
    pub article_id: ArticleId,
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    pub content: String,
}

pub struct CommentService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CommentService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, actor: &User, input: &NewCommentInput) -> ServiceResult<Comment> {
        let article = ArticleService::new(self.conn).require_published(input.article_id)?;
        let comments = SqliteCommentRepository::new(self.conn);

        let parent = match input.parent_id {
            Some(parent_id) => {
                let parent = comments
                    .get_comment(parent_id)?
                    .ok_or_else(|| ServiceError::not_found("comment", parent_id))?;
                if parent.article_id != article.id {
                    return Err(ServiceError::invalid(
                        "parent comment belongs to another article",
                    ));
                }
                if parent.is_deleted {
                    return Err(ServiceError::invalid("cannot reply to a deleted comment"));
                }
                Some(parent)
            }
            None => None,
        };

        let comment =
            comments.create_comment(article.id, actor.id, input.parent_id, &input.content)?;
        scan_and_flag(self.conn, TargetType::Comment, comment.id, &comment.content)?;

        notify(
            self.conn,
            article.author_id,
            Some(actor.id),
            NotificationKind::Comment,
            format!("{} commented on \"{}\"", actor.username, article.title),
            Some(article.id),
        )?;
        if let Some(parent) = parent.filter(|parent| parent.user_id != article.author_id) {
            notify(
                self.conn,
                parent.user_id,
                Some(actor.id),
                NotificationKind::Reply,
                format!("{} replied to your comment", actor.username),
                Some(comment.id),
            )?;
        }
        info!(
            "event=comment_create module=comments status=ok comment_id={} article_id={}",
            comment.id, article.id
        );
        Ok(comment)
    }

    pub fn edit(&self, actor: &User, id: CommentId, content: &str) -> ServiceResult<Comment> {
        let comment = self.require(id)?;
        if comment.user_id != actor.id {
            return Err(ServiceError::forbidden("only the author can edit a comment"));
        }
        if comment.is_deleted {
            return Err(ServiceError::not_found("comment", id));
        }
        let updated = SqliteCommentRepository::new(self.conn).update_content(id, content)?;
        let scan = scan_and_flag(self.conn, TargetType::Comment, id, &updated.content)?;
        info!(
            "event=comment_edit module=comments status=ok comment_id={id} flagged={}",
            scan.needs_review
        );
        Ok(updated)
    }

    /// Soft-deletes; allowed for the comment author, article author and moderators.
    pub fn delete(&self, actor: &User, id: CommentId) -> ServiceResult<()> {
        let comment = self.require(id)?;
        let article_author = SqliteArticleRepository::new(self.conn)
            .get_article(comment.article_id)?
            .map(|article| article.author_id);
        let allowed = comment.user_id == actor.id
            || article_author == Some(actor.id)
            || actor.can_moderate();
        if !allowed {
            return Err(ServiceError::forbidden("not allowed to delete this comment"));
        }
        SqliteCommentRepository::new(self.conn).soft_delete(id)?;
        info!("event=comment_delete module=comments status=ok comment_id={id}");
        Ok(())
    }

    /// Comments of a published article, oldest first.
    pub fn list_for_article(&self, article_id: ArticleId) -> ServiceResult<Vec<Comment>> {
        ArticleService::new(self.conn).require_published(article_id)?;
        Ok(SqliteCommentRepository::new(self.conn).list_for_article(article_id)?)
    }

    fn require(&self, id: CommentId) -> ServiceResult<Comment> {
        SqliteCommentRepository::new(self.conn)
            .get_comment(id)?
            .ok_or_else(|| ServiceError::not_found("comment", id))
    }
}
