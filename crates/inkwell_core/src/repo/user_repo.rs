//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Usernames and emails are unique case-insensitively (`COLLATE NOCASE`).
//! - Emails are stored lowercase.
//! - Password hashes are only read through `find_credentials`/`password_hash`.

use super::{
    bool_to_int, int_to_bool, map_constraint, parse_column, Page, RepoError, RepoResult,
};
use crate::model::user::{NewUser, ProfileUpdate, User, UserId, UserRole, UserStats};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

/// User columns qualified with alias `u`, for joins.
pub(crate) const USER_COLUMNS_U: &str = "u.id, u.username, u.email, u.name, u.bio, u.avatar_url, u.role,
    u.is_verified, u.is_suspended, u.created_at, u.updated_at";

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    name,
    bio,
    avatar_url,
    role,
    is_verified,
    is_suspended,
    created_at,
    updated_at
FROM users";

/// Filters for admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub suspended: Option<bool>,
    /// Case-insensitive substring over username and email.
    pub search: Option<String>,
    pub page: Page,
}

pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Looks a user up by email or username and returns the stored hash.
    fn find_credentials(&self, login: &str) -> RepoResult<Option<(User, String)>>;
    fn password_hash(&self, id: UserId) -> RepoResult<String>;
    fn set_password_hash(&self, id: UserId, password_hash: &str) -> RepoResult<()>;
    fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> RepoResult<User>;
    fn set_role(&self, id: UserId, role: UserRole) -> RepoResult<()>;
    fn set_suspended(&self, id: UserId, suspended: bool) -> RepoResult<()>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>>;
    fn count_by_role(&self, role: UserRole) -> RepoResult<i64>;
    fn user_stats(&self, id: UserId) -> RepoResult<UserStats>;
    fn search_users(&self, text: &str, limit: u32) -> RepoResult<Vec<User>>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require(&self, id: UserId) -> RepoResult<User> {
        self.get_user(id)?
            .ok_or_else(|| RepoError::not_found("user", id))
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        user.validate()?;

        self.conn
            .execute(
                "INSERT INTO users (username, email, password_hash, name, role)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    user.username.as_str(),
                    user.email.to_lowercase(),
                    user.password_hash.as_str(),
                    user.name.as_deref(),
                    user.role.as_str(),
                ],
            )
            .map_err(|err| map_constraint(err, "username or email already registered"))?;

        self.require(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE username = ?1;"))?;
        let mut rows = stmt.query([username])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_credentials(&self, login: &str) -> RepoResult<Option<(User, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id, username, email, name, bio, avatar_url, role,
                is_verified, is_suspended, created_at, updated_at,
                password_hash
             FROM users
             WHERE email = ?1 OR username = ?1
             LIMIT 1;",
        )?;
        let mut rows = stmt.query([login.trim()])?;
        match rows.next()? {
            Some(row) => {
                let user = parse_user_row(row)?;
                let hash: String = row.get("password_hash")?;
                Ok(Some((user, hash)))
            }
            None => Ok(None),
        }
    }

    fn password_hash(&self, id: UserId) -> RepoResult<String> {
        self.conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("user", id))
    }

    fn set_password_hash(&self, id: UserId, password_hash: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET password_hash = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, password_hash],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> RepoResult<User> {
        update.validate()?;

        // A provided blank value clears the column; `None` keeps it.
        let changed = self.conn.execute(
            "UPDATE users
             SET
                name = CASE WHEN ?2 IS NULL THEN name ELSE NULLIF(TRIM(?2), '') END,
                bio = CASE WHEN ?3 IS NULL THEN bio ELSE NULLIF(TRIM(?3), '') END,
                avatar_url = CASE WHEN ?4 IS NULL THEN avatar_url ELSE NULLIF(TRIM(?4), '') END,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                update.name.as_deref(),
                update.bio.as_deref(),
                update.avatar_url.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        self.require(id)
    }

    fn set_role(&self, id: UserId, role: UserRole) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET role = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, role.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn set_suspended(&self, id: UserId, suspended: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET is_suspended = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, bool_to_int(suspended)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(role) = query.role {
            sql.push_str(" AND role = ?");
            bind_values.push(Value::Text(role.as_str().to_string()));
        }
        if let Some(suspended) = query.suspended {
            sql.push_str(" AND is_suspended = ?");
            bind_values.push(Value::Integer(bool_to_int(suspended)));
        }
        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                sql.push_str(" AND (username LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\')");
                let pattern = like_contains(search);
                bind_values.push(Value::Text(pattern.clone()));
                bind_values.push(Value::Text(pattern));
            }
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");
        query.page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn count_by_role(&self, role: UserRole) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1;",
            [role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn user_stats(&self, id: UserId) -> RepoResult<UserStats> {
        let stats = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                (SELECT COUNT(*) FROM articles WHERE author_id = ?1 AND status = 'published'),
                (SELECT COALESCE(SUM(c.count), 0)
                   FROM claps c
                   INNER JOIN articles a ON a.id = c.article_id
                  WHERE a.author_id = ?1);",
            [id],
            |row| {
                Ok(UserStats {
                    followers: row.get(0)?,
                    following: row.get(1)?,
                    published_articles: row.get(2)?,
                    claps_received: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    fn search_users(&self, text: &str, limit: u32) -> RepoResult<Vec<User>> {
        let text = text.trim();
        if text.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL}
             WHERE is_suspended = 0
               AND (username LIKE ?1 ESCAPE '\\' OR name LIKE ?1 ESCAPE '\\')
             ORDER BY
                CASE WHEN username = ?2 THEN 0 ELSE 1 END,
                username COLLATE NOCASE ASC
             LIMIT ?3;"
        ))?;
        let mut rows = stmt.query(params![like_contains(text), text, i64::from(limit)])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }
}

pub(crate) fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let role_text: String = row.get("role")?;
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        name: row.get("name")?,
        bio: row.get("bio")?,
        avatar_url: row.get("avatar_url")?,
        role: parse_column(&role_text, "users.role", UserRole::parse)?,
        is_verified: int_to_bool(row.get("is_verified")?, "users.is_verified")?,
        is_suspended: int_to_bool(row.get("is_suspended")?, "users.is_suspended")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Builds a `%text%` LIKE pattern with `%`, `_` and `\` escaped.
pub(crate) fn like_contains(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

pub(crate) fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
