//! Aggregate queries for analytics and author dashboards.
//!
//! # Invariants
//! - Read-only: nothing here mutates rows.
//! - Day buckets are UTC calendar days derived from epoch-ms columns.

use super::{parse_column, RepoResult};
use crate::model::analytics::{
    ArticleStats, AuthorRank, DailyCount, GrowthPoint, PlatformOverview, ReadStats, TagStat,
};
use crate::model::article::{ArticleId, ArticleStatus};
use crate::model::user::UserId;
use crate::model::LabelCount;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ARTICLE_STATS_SQL: &str = "SELECT
    a.id,
    a.title,
    a.slug,
    a.status,
    a.view_count,
    (SELECT COALESCE(SUM(c.count), 0) FROM claps c WHERE c.article_id = a.id),
    (SELECT COUNT(*) FROM comments cm WHERE cm.article_id = a.id AND cm.is_deleted = 0),
    (SELECT COUNT(*) FROM bookmarks b WHERE b.article_id = a.id),
    a.published_at,
    a.updated_at
FROM articles a";

pub trait AnalyticsRepository {
    /// Platform totals; `new_*` counters start at `since_ms`.
    fn overview(&self, since_ms: i64) -> RepoResult<PlatformOverview>;
    /// One point per UTC day from `since_ms` through today, gaps included.
    fn growth_series(&self, since_ms: i64) -> RepoResult<Vec<GrowthPoint>>;
    /// Authors ranked by claps given on their articles since `since_ms`.
    fn top_authors(&self, since_ms: i64, limit: u32) -> RepoResult<Vec<AuthorRank>>;
    fn tag_stats(&self, limit: u32) -> RepoResult<Vec<TagStat>>;
    fn article_stats(&self, article_id: ArticleId) -> RepoResult<Option<ArticleStats>>;
    /// An author's articles, most recently updated first.
    fn author_article_stats(&self, author_id: UserId, limit: Option<u32>)
        -> RepoResult<Vec<ArticleStats>>;
    fn status_counts(&self, author_id: UserId) -> RepoResult<Vec<LabelCount>>;
    fn views_by_day(&self, article_id: ArticleId, since_ms: i64) -> RepoResult<Vec<DailyCount>>;
    /// Distinct signed-in viewers plus distinct anonymous IPs.
    fn unique_viewers(&self, article_id: ArticleId) -> RepoResult<i64>;
    fn read_stats(&self, article_id: ArticleId) -> RepoResult<ReadStats>;
}

pub struct SqliteAnalyticsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnalyticsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AnalyticsRepository for SqliteAnalyticsRepository<'_> {
    fn overview(&self, since_ms: i64) -> RepoResult<PlatformOverview> {
        let overview = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM articles WHERE status = 'published'),
                (SELECT COALESCE(SUM(count), 0) FROM claps),
                (SELECT COUNT(*) FROM comments WHERE is_deleted = 0),
                (SELECT COALESCE(SUM(view_count), 0) FROM articles),
                (SELECT COUNT(*) FROM users WHERE created_at >= ?1),
                (SELECT COUNT(*) FROM articles
                  WHERE status = 'published' AND published_at >= ?1);",
            [since_ms],
            |row| {
                Ok(PlatformOverview {
                    total_users: row.get(0)?,
                    published_articles: row.get(1)?,
                    total_claps: row.get(2)?,
                    total_comments: row.get(3)?,
                    total_views: row.get(4)?,
                    new_users: row.get(5)?,
                    new_articles: row.get(6)?,
                    period_days: 0,
                })
            },
        )?;
        Ok(overview)
    }

    fn growth_series(&self, since_ms: i64) -> RepoResult<Vec<GrowthPoint>> {
        let mut stmt = self.conn.prepare(
            "WITH RECURSIVE days(day) AS (
                SELECT date(?1 / 1000, 'unixepoch')
                UNION ALL
                SELECT date(day, '+1 day') FROM days WHERE day < date('now')
             )
             SELECT
                d.day,
                (SELECT COUNT(*) FROM users u
                  WHERE date(u.created_at / 1000, 'unixepoch') = d.day),
                (SELECT COUNT(*) FROM articles a
                  WHERE a.published_at IS NOT NULL
                    AND date(a.published_at / 1000, 'unixepoch') = d.day),
                (SELECT COUNT(*) FROM article_views v
                  WHERE date(v.created_at / 1000, 'unixepoch') = d.day)
             FROM days d
             ORDER BY d.day ASC;",
        )?;
        let mut rows = stmt.query([since_ms])?;
        let mut points = Vec::new();
        while let Some(row) = rows.next()? {
            points.push(GrowthPoint {
                day: row.get(0)?,
                new_users: row.get(1)?,
                new_articles: row.get(2)?,
                views: row.get(3)?,
            });
        }
        Ok(points)
    }

    fn top_authors(&self, since_ms: i64, limit: u32) -> RepoResult<Vec<AuthorRank>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                u.id,
                u.username,
                COALESCE(SUM(c.count), 0) AS claps_received,
                (SELECT COUNT(*) FROM articles p
                  WHERE p.author_id = u.id AND p.status = 'published')
             FROM users u
             INNER JOIN articles a ON a.author_id = u.id
             INNER JOIN claps c ON c.article_id = a.id AND c.updated_at >= ?1
             GROUP BY u.id
             ORDER BY claps_received DESC, u.id ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![since_ms, i64::from(limit)])?;
        let mut authors = Vec::new();
        while let Some(row) = rows.next()? {
            authors.push(AuthorRank {
                user_id: row.get(0)?,
                username: row.get(1)?,
                claps_received: row.get(2)?,
                published_articles: row.get(3)?,
            });
        }
        Ok(authors)
    }

    fn tag_stats(&self, limit: u32) -> RepoResult<Vec<TagStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.name,
                COUNT(a.id) AS article_count,
                COALESCE(SUM(a.view_count), 0),
                COALESCE(SUM(
                    (SELECT COALESCE(SUM(c.count), 0) FROM claps c WHERE c.article_id = a.id)
                ), 0)
             FROM tags t
             INNER JOIN article_tags atg ON atg.tag_id = t.id
             INNER JOIN articles a ON a.id = atg.article_id AND a.status = 'published'
             GROUP BY t.id
             ORDER BY article_count DESC, t.name ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut stats = Vec::new();
        while let Some(row) = rows.next()? {
            stats.push(TagStat {
                name: row.get(0)?,
                article_count: row.get(1)?,
                total_views: row.get(2)?,
                total_claps: row.get(3)?,
            });
        }
        Ok(stats)
    }

    fn article_stats(&self, article_id: ArticleId) -> RepoResult<Option<ArticleStats>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_STATS_SQL} WHERE a.id = ?1;"))?;
        let mut rows = stmt.query([article_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_stats_row(row)?)),
            None => Ok(None),
        }
    }

    fn author_article_stats(
        &self,
        author_id: UserId,
        limit: Option<u32>,
    ) -> RepoResult<Vec<ArticleStats>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_STATS_SQL}
             WHERE a.author_id = ?1
             ORDER BY a.updated_at DESC, a.id DESC
             LIMIT ?2;"
        ))?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(i64::from).unwrap_or(-1);
        let mut rows = stmt.query(params![author_id, limit])?;
        let mut stats = Vec::new();
        while let Some(row) = rows.next()? {
            stats.push(parse_stats_row(row)?);
        }
        Ok(stats)
    }

    fn status_counts(&self, author_id: UserId) -> RepoResult<Vec<LabelCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*)
             FROM articles
             WHERE author_id = ?1
             GROUP BY status
             ORDER BY status ASC;",
        )?;
        let mut rows = stmt.query([author_id])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            counts.push(LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            });
        }
        Ok(counts)
    }

    fn views_by_day(&self, article_id: ArticleId, since_ms: i64) -> RepoResult<Vec<DailyCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT date(created_at / 1000, 'unixepoch') AS day, COUNT(*)
             FROM article_views
             WHERE article_id = ?1 AND created_at >= ?2
             GROUP BY day
             ORDER BY day ASC;",
        )?;
        let mut rows = stmt.query(params![article_id, since_ms])?;
        let mut days = Vec::new();
        while let Some(row) = rows.next()? {
            days.push(DailyCount {
                day: row.get(0)?,
                count: row.get(1)?,
            });
        }
        Ok(days)
    }

    fn unique_viewers(&self, article_id: ArticleId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(DISTINCT COALESCE('u:' || user_id, 'ip:' || ip_address))
             FROM article_views
             WHERE article_id = ?1;",
            [article_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn read_stats(&self, article_id: ArticleId) -> RepoResult<ReadStats> {
        let stats = self
            .conn
            .query_row(
                "SELECT COUNT(*), AVG(read_percentage), AVG(time_spent)
                 FROM article_reads
                 WHERE article_id = ?1;",
                [article_id],
                |row| {
                    Ok(ReadStats {
                        reads: row.get(0)?,
                        avg_read_percentage: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                        avg_time_spent_seconds: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    })
                },
            )
            .optional()?;
        Ok(stats.unwrap_or_default())
    }
}

fn parse_stats_row(row: &Row<'_>) -> RepoResult<ArticleStats> {
    let status_text: String = row.get(3)?;
    Ok(ArticleStats {
        article_id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        status: parse_column(&status_text, "articles.status", ArticleStatus::parse)?,
        views: row.get(4)?,
        claps: row.get(5)?,
        comments: row.get(6)?,
        bookmarks: row.get(7)?,
        published_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
