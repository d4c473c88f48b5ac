//! Public profile and self-service profile use-cases.

use super::{ServiceError, ServiceResult};
use crate::model::article::{Article, ArticleStatus};
use crate::model::user::{ProfileUpdate, PublicUser, User, UserId, UserStats};
use crate::repo::article_repo::{ArticleListQuery, ArticleRepository, SqliteArticleRepository};
use crate::repo::follow_repo::{FollowRepository, SqliteFollowRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::Page;
use log::info;
use rusqlite::Connection;
use serde::Serialize;

pub const USER_SEARCH_LIMIT: u32 = 20;

/// Profile page payload.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub stats: UserStats,
    /// Whether the viewer follows this user; `None` for anonymous viewers.
    pub is_following: Option<bool>,
}

pub struct UserService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> UserService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn profile(&self, viewer: Option<&User>, id: UserId) -> ServiceResult<Profile> {
        let user = self.require(id)?;
        self.build_profile(viewer, user)
    }

    pub fn profile_by_username(
        &self,
        viewer: Option<&User>,
        username: &str,
    ) -> ServiceResult<Profile> {
        let user = SqliteUserRepository::new(self.conn)
            .find_by_username(username)?
            .ok_or_else(|| ServiceError::not_found("user", username))?;
        self.build_profile(viewer, user)
    }

    pub fn update_profile(&self, actor: &User, update: &ProfileUpdate) -> ServiceResult<User> {
        let user = SqliteUserRepository::new(self.conn).update_profile(actor.id, update)?;
        info!("event=profile_update module=users status=ok user_id={}", actor.id);
        Ok(user)
    }

    pub fn published_articles(&self, id: UserId, page: Page) -> ServiceResult<Vec<Article>> {
        self.require(id)?;
        Ok(SqliteArticleRepository::new(self.conn).list_articles(&ArticleListQuery {
            author_id: Some(id),
            status: Some(ArticleStatus::Published),
            page,
            ..ArticleListQuery::default()
        })?)
    }

    pub fn followers(&self, id: UserId, page: Page) -> ServiceResult<Vec<PublicUser>> {
        self.require(id)?;
        let users = SqliteFollowRepository::new(self.conn).list_followers(id, page)?;
        Ok(users.iter().map(User::public_profile).collect())
    }

    pub fn following(&self, id: UserId, page: Page) -> ServiceResult<Vec<PublicUser>> {
        self.require(id)?;
        let users = SqliteFollowRepository::new(self.conn).list_following(id, page)?;
        Ok(users.iter().map(User::public_profile).collect())
    }

    /// Username/name substring search over active users.
    pub fn search(&self, text: &str, limit: Option<u32>) -> ServiceResult<Vec<PublicUser>> {
        let limit = limit.unwrap_or(USER_SEARCH_LIMIT).min(USER_SEARCH_LIMIT);
        let users = SqliteUserRepository::new(self.conn).search_users(text, limit)?;
        Ok(users.iter().map(User::public_profile).collect())
    }

    fn require(&self, id: UserId) -> ServiceResult<User> {
        SqliteUserRepository::new(self.conn)
            .get_user(id)?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }

    fn build_profile(&self, viewer: Option<&User>, user: User) -> ServiceResult<Profile> {
        let stats = SqliteUserRepository::new(self.conn).user_stats(user.id)?;
        let is_following = match viewer {
            Some(viewer) => Some(SqliteFollowRepository::new(self.conn).is_following(viewer.id, user.id)?),
            None => None,
        };
        Ok(Profile {
            user: user.public_profile(),
            stats,
            is_following,
        })
    }
}
