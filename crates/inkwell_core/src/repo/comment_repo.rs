//! Comment repository.
//!
//! # Invariants
//! - Deletes are soft: the row stays so replies keep their parent.
//! - Deleted comments are read back with empty content.

use super::{int_to_bool, RepoError, RepoResult};
use crate::model::article::ArticleId;
use crate::model::engagement::{validate_comment, Comment, CommentId};
use crate::model::user::UserId;
use rusqlite::{params, Connection, Row};

const COMMENT_SELECT_SQL: &str = "SELECT
    c.id,
    c.article_id,
    c.user_id,
    u.username,
    c.parent_id,
    CASE WHEN c.is_deleted = 1 THEN '' ELSE c.content END AS content,
    c.is_deleted,
    c.created_at,
    c.updated_at
FROM comments c
INNER JOIN users u ON u.id = c.user_id";

pub trait CommentRepository {
    fn create_comment(
        &self,
        article_id: ArticleId,
        user_id: UserId,
        parent_id: Option<CommentId>,
        content: &str,
    ) -> RepoResult<Comment>;
    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>>;
    fn update_content(&self, id: CommentId, content: &str) -> RepoResult<Comment>;
    fn soft_delete(&self, id: CommentId) -> RepoResult<()>;
    /// All comments of an article, oldest first.
    fn list_for_article(&self, article_id: ArticleId) -> RepoResult<Vec<Comment>>;
    fn count_for_article(&self, article_id: ArticleId) -> RepoResult<i64>;
}

pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require(&self, id: CommentId) -> RepoResult<Comment> {
        self.get_comment(id)?
            .ok_or_else(|| RepoError::not_found("comment", id))
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn create_comment(
        &self,
        article_id: ArticleId,
        user_id: UserId,
        parent_id: Option<CommentId>,
        content: &str,
    ) -> RepoResult<Comment> {
        validate_comment(content)?;
        self.conn.execute(
            "INSERT INTO comments (article_id, user_id, parent_id, content)
             VALUES (?1, ?2, ?3, ?4);",
            params![article_id, user_id, parent_id, content.trim()],
        )?;
        self.require(self.conn.last_insert_rowid())
    }

    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COMMENT_SELECT_SQL} WHERE c.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_comment_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_content(&self, id: CommentId, content: &str) -> RepoResult<Comment> {
        validate_comment(content)?;
        let changed = self.conn.execute(
            "UPDATE comments
             SET content = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND is_deleted = 0;",
            params![id, content.trim()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("comment", id));
        }
        self.require(id)
    }

    fn soft_delete(&self, id: CommentId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE comments
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("comment", id));
        }
        Ok(())
    }

    fn list_for_article(&self, article_id: ArticleId) -> RepoResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMMENT_SELECT_SQL}
             WHERE c.article_id = ?1
             ORDER BY c.created_at ASC, c.id ASC;"
        ))?;
        let mut rows = stmt.query([article_id])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(parse_comment_row(row)?);
        }
        Ok(comments)
    }

    fn count_for_article(&self, article_id: ArticleId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE article_id = ?1 AND is_deleted = 0;",
            [article_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    Ok(Comment {
        id: row.get("id")?,
        article_id: row.get("article_id")?,
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        parent_id: row.get("parent_id")?,
        content: row.get("content")?,
        is_deleted: int_to_bool(row.get("is_deleted")?, "comments.is_deleted")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
