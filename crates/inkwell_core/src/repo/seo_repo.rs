//! Public URL inventory for sitemap generation.

use super::RepoResult;
use rusqlite::Connection;

/// One public page: site-relative path plus last modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub path: String,
    pub updated_at: i64,
}

pub trait SeoRepository {
    /// Published articles, newest first.
    fn published_article_pages(&self) -> RepoResult<Vec<SitemapEntry>>;
    /// Authors with at least one published article.
    fn author_pages(&self) -> RepoResult<Vec<SitemapEntry>>;
    fn publication_pages(&self) -> RepoResult<Vec<SitemapEntry>>;
}

pub struct SqliteSeoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSeoRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn entries(&self, sql: &str, prefix: &str) -> RepoResult<Vec<SitemapEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            entries.push(SitemapEntry {
                path: format!("{prefix}{key}"),
                updated_at: row.get(1)?,
            });
        }
        Ok(entries)
    }
}

impl SeoRepository for SqliteSeoRepository<'_> {
    fn published_article_pages(&self) -> RepoResult<Vec<SitemapEntry>> {
        self.entries(
            "SELECT slug, updated_at
             FROM articles
             WHERE status = 'published'
             ORDER BY published_at DESC, id DESC;",
            "/article/",
        )
    }

    fn author_pages(&self) -> RepoResult<Vec<SitemapEntry>> {
        self.entries(
            "SELECT u.username, MAX(a.updated_at)
             FROM users u
             INNER JOIN articles a ON a.author_id = u.id AND a.status = 'published'
             WHERE u.is_suspended = 0
             GROUP BY u.id
             ORDER BY u.username COLLATE NOCASE ASC;",
            "/profile/",
        )
    }

    fn publication_pages(&self) -> RepoResult<Vec<SitemapEntry>> {
        self.entries(
            "SELECT slug, updated_at FROM publications ORDER BY name COLLATE NOCASE ASC;",
            "/publication/",
        )
    }
}
