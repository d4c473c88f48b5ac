//! Follow graph use-cases.
//!
//! # Invariants
//! - Follow and unfollow are idempotent.
//! - Only a newly created edge notifies the followed user.

use super::notification_service::notify;
use super::{ServiceError, ServiceResult};
use crate::model::engagement::FollowStatus;
use crate::model::notification::NotificationKind;
use crate::model::user::{User, UserId};
use crate::repo::follow_repo::{FollowRepository, SqliteFollowRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use log::info;
use rusqlite::Connection;

pub struct FollowService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> FollowService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn follow(&self, actor: &User, target_id: UserId) -> ServiceResult<FollowStatus> {
        if actor.id == target_id {
            return Err(ServiceError::invalid("you cannot follow yourself"));
        }
        self.require_user(target_id)?;

        let follows = SqliteFollowRepository::new(self.conn);
        if follows.follow(actor.id, target_id)? {
            notify(
                self.conn,
                target_id,
                Some(actor.id),
                NotificationKind::Follow,
                format!("{} started following you", actor.username),
                Some(actor.id),
            )?;
            info!(
                "event=follow module=follows status=ok follower={} following={}",
                actor.id, target_id
            );
        }
        self.status(actor.id, target_id)
    }

    pub fn unfollow(&self, actor: &User, target_id: UserId) -> ServiceResult<FollowStatus> {
        self.require_user(target_id)?;
        SqliteFollowRepository::new(self.conn).unfollow(actor.id, target_id)?;
        self.status(actor.id, target_id)
    }

    pub fn status(&self, follower_id: UserId, target_id: UserId) -> ServiceResult<FollowStatus> {
        let follows = SqliteFollowRepository::new(self.conn);
        Ok(FollowStatus {
            following: follows.is_following(follower_id, target_id)?,
            followers: follows.follower_count(target_id)?,
        })
    }

    fn require_user(&self, id: UserId) -> ServiceResult<User> {
        SqliteUserRepository::new(self.conn)
            .get_user(id)?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }
}
