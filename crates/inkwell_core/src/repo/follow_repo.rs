//! Follow graph persistence.

use super::user_repo::{parse_user_row, USER_COLUMNS_U};
use super::{map_constraint, Page, RepoResult};
use crate::model::user::{User, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

pub trait FollowRepository {
    /// Returns `true` when a new edge was created.
    fn follow(&self, follower_id: UserId, following_id: UserId) -> RepoResult<bool>;
    /// Returns `true` when an edge was removed.
    fn unfollow(&self, follower_id: UserId, following_id: UserId) -> RepoResult<bool>;
    fn is_following(&self, follower_id: UserId, following_id: UserId) -> RepoResult<bool>;
    fn follower_count(&self, user_id: UserId) -> RepoResult<i64>;
    fn following_count(&self, user_id: UserId) -> RepoResult<i64>;
    fn list_followers(&self, user_id: UserId, page: Page) -> RepoResult<Vec<User>>;
    fn list_following(&self, user_id: UserId, page: Page) -> RepoResult<Vec<User>>;
}

pub struct SqliteFollowRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFollowRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Users on the `join_column` side of edges whose `filter_column` is `user_id`.
    fn list_edge(
        &self,
        join_column: &str,
        filter_column: &str,
        user_id: UserId,
        page: Page,
    ) -> RepoResult<Vec<User>> {
        let mut sql = format!(
            "SELECT {USER_COLUMNS_U}
             FROM follows f
             INNER JOIN users u ON u.id = f.{join_column}
             WHERE f.{filter_column} = ?
             ORDER BY f.created_at DESC, f.id DESC"
        );
        let mut bind_values = vec![Value::Integer(user_id)];
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }
}

impl FollowRepository for SqliteFollowRepository<'_> {
    fn follow(&self, follower_id: UserId, following_id: UserId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id) VALUES (?1, ?2);",
                params![follower_id, following_id],
            )
            .map_err(|err| map_constraint(err, "cannot follow this user"))?;
        Ok(changed > 0)
    }

    fn unfollow(&self, follower_id: UserId, following_id: UserId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2;",
            params![follower_id, following_id],
        )?;
        Ok(changed > 0)
    }

    fn is_following(&self, follower_id: UserId, following_id: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2);",
            params![follower_id, following_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn follower_count(&self, user_id: UserId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE following_id = ?1;",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn following_count(&self, user_id: UserId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1;",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_followers(&self, user_id: UserId, page: Page) -> RepoResult<Vec<User>> {
        self.list_edge("follower_id", "following_id", user_id, page)
    }

    fn list_following(&self, user_id: UserId, page: Page) -> RepoResult<Vec<User>> {
        self.list_edge("following_id", "follower_id", user_id, page)
    }
}
