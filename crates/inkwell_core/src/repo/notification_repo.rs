//! Notification persistence.
//!
//! # Invariants
//! - Every read/write path is scoped by `user_id`; a row owned by another
//!   user behaves as missing.

use super::{bool_to_int, int_to_bool, parse_column, Page, RepoError, RepoResult};
use crate::model::notification::{NewNotification, Notification, NotificationId, NotificationKind};
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

pub trait NotificationRepository {
    fn create_notification(&self, notification: &NewNotification) -> RepoResult<NotificationId>;
    fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: Page,
    ) -> RepoResult<Vec<Notification>>;
    fn unread_count(&self, user_id: UserId) -> RepoResult<i64>;
    fn mark_read(&self, user_id: UserId, id: NotificationId) -> RepoResult<()>;
    /// Returns the number of rows changed.
    fn mark_all_read(&self, user_id: UserId) -> RepoResult<usize>;
    fn delete_notification(&self, user_id: UserId, id: NotificationId) -> RepoResult<()>;
}

pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create_notification(&self, notification: &NewNotification) -> RepoResult<NotificationId> {
        self.conn.execute(
            "INSERT INTO notifications (user_id, actor_id, type, message, entity_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                notification.user_id,
                notification.actor_id,
                notification.kind.as_str(),
                notification.message.as_str(),
                notification.entity_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: Page,
    ) -> RepoResult<Vec<Notification>> {
        let mut sql = String::from(
            "SELECT id, user_id, actor_id, type, message, entity_id, is_read, created_at
             FROM notifications
             WHERE user_id = ?",
        );
        let mut bind_values = vec![Value::Integer(user_id)];
        if unread_only {
            sql.push_str(" AND is_read = ?");
            bind_values.push(Value::Integer(bool_to_int(false)));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }

    fn unread_count(&self, user_id: UserId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0;",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn mark_read(&self, user_id: UserId, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("notification", id));
        }
        Ok(())
    }

    fn mark_all_read(&self, user_id: UserId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0;",
            [user_id],
        )?;
        Ok(changed)
    }

    fn delete_notification(&self, user_id: UserId, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("notification", id));
        }
        Ok(())
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let kind_text: String = row.get("type")?;
    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        actor_id: row.get("actor_id")?,
        kind: parse_column(&kind_text, "notifications.type", NotificationKind::parse)?,
        message: row.get("message")?,
        entity_id: row.get("entity_id")?,
        is_read: int_to_bool(row.get("is_read")?, "notifications.is_read")?,
        created_at: row.get("created_at")?,
    })
}
