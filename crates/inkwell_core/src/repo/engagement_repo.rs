//! Clap and bookmark persistence.
//!
//! # Invariants
//! - One `claps` row per (article, user); `count` never exceeds
//!   `MAX_CLAPS_PER_USER`.
//! - Bookmark add/remove are idempotent.

use super::article_repo::{load_articles, ARTICLE_SELECT_SQL};
use super::{Page, RepoResult};
use crate::model::article::{Article, ArticleId};
use crate::model::engagement::{validate_clap_count, ClapOutcome, ClapSummary, MAX_CLAPS_PER_USER};
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};

pub trait EngagementRepository {
    /// Adds up to `count` claps, capping the user's total on the article.
    fn add_claps(&self, article_id: ArticleId, user_id: UserId, count: i64)
        -> RepoResult<ClapOutcome>;
    fn user_claps(&self, article_id: ArticleId, user_id: UserId) -> RepoResult<i64>;
    fn clap_summary(&self, article_id: ArticleId) -> RepoResult<ClapSummary>;
    /// Returns `true` when a new bookmark row was created.
    fn add_bookmark(&self, user_id: UserId, article_id: ArticleId) -> RepoResult<bool>;
    /// Returns `true` when a bookmark row was removed.
    fn remove_bookmark(&self, user_id: UserId, article_id: ArticleId) -> RepoResult<bool>;
    fn is_bookmarked(&self, user_id: UserId, article_id: ArticleId) -> RepoResult<bool>;
    fn bookmark_count(&self, article_id: ArticleId) -> RepoResult<i64>;
    /// Bookmarked articles, most recently bookmarked first.
    fn list_bookmarks(&self, user_id: UserId, page: Page) -> RepoResult<Vec<Article>>;
}

pub struct SqliteEngagementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEngagementRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EngagementRepository for SqliteEngagementRepository<'_> {
    fn add_claps(
        &self,
        article_id: ArticleId,
        user_id: UserId,
        count: i64,
    ) -> RepoResult<ClapOutcome> {
        validate_clap_count(count)?;

        let tx = self.conn.unchecked_transaction()?;
        let current: i64 = tx
            .query_row(
                "SELECT count FROM claps WHERE article_id = ?1 AND user_id = ?2;",
                params![article_id, user_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        let added = count.min(MAX_CLAPS_PER_USER - current).max(0);
        if added > 0 {
            tx.execute(
                "INSERT INTO claps (article_id, user_id, count)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (article_id, user_id) DO UPDATE SET
                    count = count + excluded.count,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![article_id, user_id, added],
            )?;
        }
        let article_total: i64 = tx.query_row(
            "SELECT COALESCE(SUM(count), 0) FROM claps WHERE article_id = ?1;",
            [article_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(ClapOutcome {
            added,
            user_total: current + added,
            article_total,
        })
    }

    fn user_claps(&self, article_id: ArticleId, user_id: UserId) -> RepoResult<i64> {
        let count = self
            .conn
            .query_row(
                "SELECT count FROM claps WHERE article_id = ?1 AND user_id = ?2;",
                params![article_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    fn clap_summary(&self, article_id: ArticleId) -> RepoResult<ClapSummary> {
        let summary = self.conn.query_row(
            "SELECT COALESCE(SUM(count), 0), COUNT(*) FROM claps WHERE article_id = ?1;",
            [article_id],
            |row| {
                Ok(ClapSummary {
                    total_claps: row.get(0)?,
                    clappers: row.get(1)?,
                })
            },
        )?;
        Ok(summary)
    }

    fn add_bookmark(&self, user_id: UserId, article_id: ArticleId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO bookmarks (user_id, article_id) VALUES (?1, ?2);",
            params![user_id, article_id],
        )?;
        Ok(changed > 0)
    }

    fn remove_bookmark(&self, user_id: UserId, article_id: ArticleId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM bookmarks WHERE user_id = ?1 AND article_id = ?2;",
            params![user_id, article_id],
        )?;
        Ok(changed > 0)
    }

    fn is_bookmarked(&self, user_id: UserId, article_id: ArticleId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE user_id = ?1 AND article_id = ?2);",
            params![user_id, article_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn bookmark_count(&self, article_id: ArticleId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM bookmarks WHERE article_id = ?1;",
            [article_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_bookmarks(&self, user_id: UserId, page: Page) -> RepoResult<Vec<Article>> {
        let mut sql = format!(
            "{ARTICLE_SELECT_SQL}
             INNER JOIN bookmarks b ON b.article_id = a.id
             WHERE b.user_id = ?
             ORDER BY b.created_at DESC, b.id DESC"
        );
        let mut bind_values = vec![Value::Integer(user_id)];
        page.push_sql(&mut sql, &mut bind_values);
        load_articles(self.conn, &sql, bind_values)
    }
}
