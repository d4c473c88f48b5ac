//! Read-only aggregates for dashboards and platform analytics.

use super::article::{ArticleId, ArticleStatus};
use super::user::UserId;
use super::LabelCount;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformOverview {
    pub total_users: i64,
    pub published_articles: i64,
    pub total_claps: i64,
    pub total_comments: i64,
    pub total_views: i64,
    pub new_users: i64,
    pub new_articles: i64,
    pub period_days: u32,
}

/// One calendar day (UTC, `YYYY-MM-DD`) of platform growth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthPoint {
    pub day: String,
    pub new_users: i64,
    pub new_articles: i64,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRank {
    pub user_id: UserId,
    pub username: String,
    pub claps_received: i64,
    pub published_articles: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagStat {
    pub name: String,
    pub article_count: i64,
    pub total_views: i64,
    pub total_claps: i64,
}

/// Engagement counters for one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleStats {
    pub article_id: ArticleId,
    pub title: String,
    pub slug: String,
    pub status: ArticleStatus,
    pub views: i64,
    pub claps: i64,
    pub comments: i64,
    pub bookmarks: i64,
    pub published_at: Option<i64>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngagementTotals {
    pub views: i64,
    pub claps: i64,
    pub comments: i64,
    pub bookmarks: i64,
}

impl EngagementTotals {
    pub fn sum(stats: &[ArticleStats]) -> Self {
        stats.iter().fold(Self::default(), |acc, item| Self {
            views: acc.views + item.views,
            claps: acc.claps + item.claps,
            comments: acc.comments + item.comments,
            bookmarks: acc.bookmarks + item.bookmarks,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReadStats {
    pub reads: i64,
    pub avg_read_percentage: f64,
    pub avg_time_spent_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleAnalytics {
    #[serde(flatten)]
    pub stats: ArticleStats,
    pub unique_viewers: i64,
    pub clappers: i64,
    pub reads: ReadStats,
    pub views_by_day: Vec<DailyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorAnalytics {
    pub user_id: UserId,
    pub followers: i64,
    pub totals: EngagementTotals,
    pub articles: Vec<ArticleStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorDashboard {
    pub articles_by_status: Vec<LabelCount>,
    pub totals: EngagementTotals,
    pub followers: i64,
    pub recent_articles: Vec<ArticleStats>,
}
