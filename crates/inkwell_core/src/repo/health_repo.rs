//! Storage diagnostics for the admin health check.

use super::RepoResult;
use crate::model::LabelCount;
use rusqlite::Connection;

/// Tables reported by `table_counts`, in display order.
pub const COUNTED_TABLES: &[&str] = &[
    "users",
    "articles",
    "comments",
    "claps",
    "bookmarks",
    "follows",
    "publications",
    "notifications",
    "reports",
    "uploads",
];

pub trait HealthRepository {
    /// Result lines of `PRAGMA quick_check`; `["ok"]` when healthy.
    fn quick_check(&self) -> RepoResult<Vec<String>>;
    /// `page_count * page_size`.
    fn database_size_bytes(&self) -> RepoResult<i64>;
    fn table_counts(&self) -> RepoResult<Vec<LabelCount>>;
}

pub struct SqliteHealthRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHealthRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HealthRepository for SqliteHealthRepository<'_> {
    fn quick_check(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA quick_check;")?;
        let mut rows = stmt.query([])?;
        let mut lines = Vec::new();
        while let Some(row) = rows.next()? {
            lines.push(row.get(0)?);
        }
        Ok(lines)
    }

    fn database_size_bytes(&self) -> RepoResult<i64> {
        let page_count: i64 = self.conn.query_row("PRAGMA page_count;", [], |row| row.get(0))?;
        let page_size: i64 = self.conn.query_row("PRAGMA page_size;", [], |row| row.get(0))?;
        Ok(page_count * page_size)
    }

    fn table_counts(&self) -> RepoResult<Vec<LabelCount>> {
        let mut counts = Vec::with_capacity(COUNTED_TABLES.len());
        for table in COUNTED_TABLES {
            let count = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))?;
            counts.push(LabelCount {
                label: (*table).to_string(),
                count,
            });
        }
        Ok(counts)
    }
}
