//! Platform and author analytics.
//!
//! # Invariants
//! - Platform-wide views are admin only.
//! - Article analytics are visible to the author and admins.
//! - Look-back windows are 1..=365 days.

use super::{require_admin, window_days, ServiceError, ServiceResult, DAY_MS};
use crate::db::now_epoch_ms;
use crate::model::analytics::{
    ArticleAnalytics, AuthorAnalytics, AuthorRank, EngagementTotals, GrowthPoint,
    PlatformOverview, TagStat,
};
use crate::model::article::{ArticleId, ScoredArticle};
use crate::model::user::User;
use crate::repo::analytics_repo::{AnalyticsRepository, SqliteAnalyticsRepository};
use crate::repo::article_repo::{ArticleRepository, SqliteArticleRepository};
use crate::repo::engagement_repo::{EngagementRepository, SqliteEngagementRepository};
use crate::repo::follow_repo::{FollowRepository, SqliteFollowRepository};
use crate::repo::normalize_limit;
use rusqlite::Connection;

pub const DEFAULT_PERIOD_DAYS: u32 = 30;
pub const MAX_PERIOD_DAYS: u32 = 365;

pub struct AnalyticsService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AnalyticsService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn overview(&self, actor: &User, days: Option<u32>) -> ServiceResult<PlatformOverview> {
        require_admin(actor)?;
        let days = window_days(days, DEFAULT_PERIOD_DAYS, MAX_PERIOD_DAYS)?;
        let mut overview = SqliteAnalyticsRepository::new(self.conn).overview(since(days))?;
        overview.period_days = days;
        Ok(overview)
    }

    pub fn growth(&self, actor: &User, days: Option<u32>) -> ServiceResult<Vec<GrowthPoint>> {
        require_admin(actor)?;
        let days = window_days(days, DEFAULT_PERIOD_DAYS, MAX_PERIOD_DAYS)?;
        Ok(SqliteAnalyticsRepository::new(self.conn).growth_series(since(days - 1))?)
    }

    pub fn top_articles(
        &self,
        days: Option<u32>,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<ScoredArticle>> {
        let days = window_days(days, DEFAULT_PERIOD_DAYS, MAX_PERIOD_DAYS)?;
        Ok(SqliteArticleRepository::new(self.conn).trending(since(days), normalize_limit(limit))?)
    }

    pub fn top_authors(&self, days: Option<u32>, limit: Option<u32>) -> ServiceResult<Vec<AuthorRank>> {
        let days = window_days(days, DEFAULT_PERIOD_DAYS, MAX_PERIOD_DAYS)?;
        Ok(SqliteAnalyticsRepository::new(self.conn).top_authors(since(days), normalize_limit(limit))?)
    }

    pub fn tag_stats(&self, limit: Option<u32>) -> ServiceResult<Vec<TagStat>> {
        Ok(SqliteAnalyticsRepository::new(self.conn).tag_stats(normalize_limit(limit))?)
    }

    pub fn article(
        &self,
        actor: &User,
        article_id: ArticleId,
        days: Option<u32>,
    ) -> ServiceResult<ArticleAnalytics> {
        let article = SqliteArticleRepository::new(self.conn)
            .get_article(article_id)?
            .ok_or_else(|| ServiceError::not_found("article", article_id))?;
        if article.author_id != actor.id && !actor.is_admin() {
            return Err(ServiceError::forbidden(
                "only the author or an admin can view article analytics",
            ));
        }
        let days = window_days(days, DEFAULT_PERIOD_DAYS, MAX_PERIOD_DAYS)?;

        let analytics = SqliteAnalyticsRepository::new(self.conn);
        let stats = analytics
            .article_stats(article_id)?
            .ok_or_else(|| ServiceError::not_found("article", article_id))?;
        Ok(ArticleAnalytics {
            stats,
            unique_viewers: analytics.unique_viewers(article_id)?,
            clappers: SqliteEngagementRepository::new(self.conn)
                .clap_summary(article_id)?
                .clappers,
            reads: analytics.read_stats(article_id)?,
            views_by_day: analytics.views_by_day(article_id, since(days))?,
        })
    }

    /// Per-article stats and totals for the caller's own articles.
    pub fn author(&self, actor: &User) -> ServiceResult<AuthorAnalytics> {
        let articles =
            SqliteAnalyticsRepository::new(self.conn).author_article_stats(actor.id, None)?;
        Ok(AuthorAnalytics {
            user_id: actor.id,
            followers: SqliteFollowRepository::new(self.conn).follower_count(actor.id)?,
            totals: EngagementTotals::sum(&articles),
            articles,
        })
    }
}

fn since(days: u32) -> i64 {
    now_epoch_ms() - i64::from(days) * DAY_MS
}
