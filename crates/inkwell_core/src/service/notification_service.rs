//! Notification fan-out and inbox use-cases.
//!
//! # Invariants
//! - A user is never notified about their own action.
//! - Inbox operations only touch the caller's rows.

use super::ServiceResult;
use crate::model::notification::{NewNotification, Notification, NotificationId, NotificationKind};
use crate::model::user::UserId;
use crate::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use crate::repo::Page;
use log::debug;
use rusqlite::Connection;

/// Inserts one notification unless the recipient is the actor.
///
/// Returns the new id, or `None` when skipped.
pub(crate) fn notify(
    conn: &Connection,
    recipient: UserId,
    actor: Option<UserId>,
    kind: NotificationKind,
    message: impl Into<String>,
    entity_id: Option<i64>,
) -> ServiceResult<Option<NotificationId>> {
    if actor == Some(recipient) {
        return Ok(None);
    }
    let id = SqliteNotificationRepository::new(conn).create_notification(&NewNotification {
        user_id: recipient,
        actor_id: actor,
        kind,
        message: message.into(),
        entity_id,
    })?;
    debug!(
        "event=notify module=notifications kind={} recipient={}",
        kind.as_str(),
        recipient
    );
    Ok(Some(id))
}

pub struct NotificationService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> NotificationService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn list(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: Page,
    ) -> ServiceResult<Vec<Notification>> {
        Ok(SqliteNotificationRepository::new(self.conn).list_notifications(
            user_id,
            unread_only,
            page,
        )?)
    }

    pub fn unread_count(&self, user_id: UserId) -> ServiceResult<i64> {
        Ok(SqliteNotificationRepository::new(self.conn).unread_count(user_id)?)
    }

    pub fn mark_read(&self, user_id: UserId, id: NotificationId) -> ServiceResult<()> {
        Ok(SqliteNotificationRepository::new(self.conn).mark_read(user_id, id)?)
    }

    pub fn mark_all_read(&self, user_id: UserId) -> ServiceResult<usize> {
        Ok(SqliteNotificationRepository::new(self.conn).mark_all_read(user_id)?)
    }

    pub fn delete(&self, user_id: UserId, id: NotificationId) -> ServiceResult<()> {
        Ok(SqliteNotificationRepository::new(self.conn).delete_notification(user_id, id)?)
    }
}
