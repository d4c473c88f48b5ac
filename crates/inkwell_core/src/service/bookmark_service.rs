//! Reading-list use-cases.

use super::article_service::ArticleService;
use super::ServiceResult;
use crate::model::article::{Article, ArticleId};
use crate::model::user::User;
use crate::repo::engagement_repo::{EngagementRepository, SqliteEngagementRepository};
use crate::repo::Page;
use rusqlite::Connection;

pub struct BookmarkService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> BookmarkService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Idempotent; returns `true` when the bookmark is new.
    pub fn add(&self, actor: &User, article_id: ArticleId) -> ServiceResult<bool> {
        ArticleService::new(self.conn).require_published(article_id)?;
        Ok(SqliteEngagementRepository::new(self.conn).add_bookmark(actor.id, article_id)?)
    }

    /// Idempotent; returns `true` when a bookmark was removed.
    pub fn remove(&self, actor: &User, article_id: ArticleId) -> ServiceResult<bool> {
        Ok(SqliteEngagementRepository::new(self.conn).remove_bookmark(actor.id, article_id)?)
    }

    pub fn list(&self, actor: &User, page: Page) -> ServiceResult<Vec<Article>> {
        Ok(SqliteEngagementRepository::new(self.conn).list_bookmarks(actor.id, page)?)
    }
}
