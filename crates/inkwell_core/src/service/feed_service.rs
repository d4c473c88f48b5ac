//! Reader feeds and tag discovery.

use super::{window_days, ServiceResult, DAY_MS};
use crate::db::now_epoch_ms;
use crate::model::article::{normalize_tag, Article, ArticleStatus, ScoredArticle, TagCount};
use crate::model::user::User;
use crate::repo::article_repo::{ArticleListQuery, ArticleRepository, SqliteArticleRepository};
use crate::repo::follow_repo::{FollowRepository, SqliteFollowRepository};
use crate::repo::{normalize_limit, Page};
use rusqlite::Connection;

pub const DEFAULT_TRENDING_DAYS: u32 = 7;
const MAX_TRENDING_DAYS: u32 = 365;
const MAX_TAG_SEARCH: u32 = 20;

pub struct FeedService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> FeedService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Articles by followed authors; falls back to latest when following nobody.
    pub fn personalized(&self, reader: &User, page: Page) -> ServiceResult<Vec<Article>> {
        if SqliteFollowRepository::new(self.conn).following_count(reader.id)? == 0 {
            return self.latest(page);
        }
        Ok(SqliteArticleRepository::new(self.conn).followed_feed(reader.id, page)?)
    }

    pub fn latest(&self, page: Page) -> ServiceResult<Vec<Article>> {
        Ok(SqliteArticleRepository::new(self.conn).list_articles(&ArticleListQuery {
            status: Some(ArticleStatus::Published),
            page,
            ..ArticleListQuery::default()
        })?)
    }

    pub fn trending(&self, days: Option<u32>, limit: Option<u32>) -> ServiceResult<Vec<ScoredArticle>> {
        let days = window_days(days, DEFAULT_TRENDING_DAYS, MAX_TRENDING_DAYS)?;
        let since = now_epoch_ms() - i64::from(days) * DAY_MS;
        Ok(SqliteArticleRepository::new(self.conn).trending(since, normalize_limit(limit))?)
    }

    pub fn popular_tags(&self, limit: Option<u32>) -> ServiceResult<Vec<TagCount>> {
        Ok(SqliteArticleRepository::new(self.conn).popular_tags(normalize_limit(limit))?)
    }

    pub fn search_tags(&self, prefix: &str, limit: Option<u32>) -> ServiceResult<Vec<TagCount>> {
        let limit = limit.unwrap_or(MAX_TAG_SEARCH).min(MAX_TAG_SEARCH);
        Ok(SqliteArticleRepository::new(self.conn).search_tags(prefix, limit)?)
    }

    pub fn tag_articles(&self, tag: &str, page: Page) -> ServiceResult<Vec<Article>> {
        let Some(tag) = normalize_tag(tag) else {
            return Ok(Vec::new());
        };
        Ok(SqliteArticleRepository::new(self.conn).list_articles(&ArticleListQuery {
            tag: Some(tag),
            status: Some(ArticleStatus::Published),
            page,
            ..ArticleListQuery::default()
        })?)
    }
}
