//! Article repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `articles` and tag-link replacement.
//! - Record reader views/reads and serve feed/trending queries.
//!
//! # Invariants
//! - Tag replacement and article writes happen in one transaction.
//! - `published_at` is set once, on the first transition to `published`.
//! - `view_count` always equals the number of `article_views` rows.

use super::{map_constraint, parse_column, Page, RepoError, RepoResult};
use crate::model::article::{
    Article, ArticleId, ArticleRow, ArticleStatus, ScoredArticle, TagCount,
};
use crate::model::engagement::ReadProgress;
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

pub(crate) const ARTICLE_SELECT_SQL: &str = "SELECT
    a.id,
    a.author_id,
    u.username AS author_username,
    a.publication_id,
    a.title,
    a.subtitle,
    a.slug,
    a.content,
    a.excerpt,
    a.featured_image,
    a.status,
    a.reading_time,
    a.view_count,
    a.meta_title,
    a.meta_description,
    a.published_at,
    a.created_at,
    a.updated_at
FROM articles a
INNER JOIN users u ON u.id = a.author_id";

pub const VIEW_WEIGHT: i64 = 1;
pub const CLAP_WEIGHT: i64 = 2;
pub const COMMENT_WEIGHT: i64 = 3;
pub const BOOKMARK_WEIGHT: i64 = 4;

/// Weighted engagement since the epoch-ms bound at `?1`, for alias `a`.
pub(crate) fn engagement_score_sql() -> String {
    format!(
        "((SELECT COUNT(*) FROM article_views v
            WHERE v.article_id = a.id AND v.created_at >= ?1) * {VIEW_WEIGHT}
        + (SELECT COALESCE(SUM(c.count), 0) FROM claps c
            WHERE c.article_id = a.id AND c.updated_at >= ?1) * {CLAP_WEIGHT}
        + (SELECT COUNT(*) FROM comments cm
            WHERE cm.article_id = a.id AND cm.is_deleted = 0 AND cm.created_at >= ?1) * {COMMENT_WEIGHT}
        + (SELECT COUNT(*) FROM bookmarks b
            WHERE b.article_id = a.id AND b.created_at >= ?1) * {BOOKMARK_WEIGHT})"
    )
}

/// Query options for listing articles.
#[derive(Debug, Clone, Default)]
pub struct ArticleListQuery {
    pub author_id: Option<UserId>,
    pub tag: Option<String>,
    pub publication_id: Option<i64>,
    /// `None` lists every status.
    pub status: Option<ArticleStatus>,
    pub page: Page,
}

pub trait ArticleRepository {
    fn create_article(
        &self,
        author_id: UserId,
        row: &ArticleRow,
        slug: &str,
        tags: &[String],
    ) -> RepoResult<ArticleId>;
    /// Replaces article fields and tags; `slug = None` keeps the current slug.
    fn update_article(
        &self,
        id: ArticleId,
        row: &ArticleRow,
        slug: Option<&str>,
        tags: &[String],
    ) -> RepoResult<()>;
    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>>;
    fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Article>>;
    fn slug_exists(&self, slug: &str, excluding: Option<ArticleId>) -> RepoResult<bool>;
    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<Article>>;
    fn set_status(&self, id: ArticleId, status: ArticleStatus) -> RepoResult<()>;
    fn set_publication(&self, id: ArticleId, publication_id: Option<i64>) -> RepoResult<()>;
    fn delete_article(&self, id: ArticleId) -> RepoResult<()>;
    fn record_view(
        &self,
        id: ArticleId,
        viewer: Option<UserId>,
        ip_address: Option<&str>,
    ) -> RepoResult<i64>;
    fn record_read(
        &self,
        id: ArticleId,
        reader: Option<UserId>,
        progress: &ReadProgress,
    ) -> RepoResult<()>;
    fn popular_tags(&self, limit: u32) -> RepoResult<Vec<TagCount>>;
    fn search_tags(&self, prefix: &str, limit: u32) -> RepoResult<Vec<TagCount>>;
    /// Published articles written by authors `follower_id` follows.
    fn followed_feed(&self, follower_id: UserId, page: Page) -> RepoResult<Vec<Article>>;
    /// Published articles ranked by engagement since `since_ms`.
    fn trending(&self, since_ms: i64, limit: u32) -> RepoResult<Vec<ScoredArticle>>;
}

pub struct SqliteArticleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ArticleRepository for SqliteArticleRepository<'_> {
    fn create_article(
        &self,
        author_id: UserId,
        row: &ArticleRow,
        slug: &str,
        tags: &[String],
    ) -> RepoResult<ArticleId> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO articles (
                author_id,
                title,
                subtitle,
                slug,
                content,
                excerpt,
                featured_image,
                reading_time,
                meta_title,
                meta_description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                author_id,
                row.title.as_str(),
                row.subtitle.as_deref(),
                slug,
                row.content.as_str(),
                row.excerpt.as_deref(),
                row.featured_image.as_deref(),
                row.reading_time_minutes,
                row.meta_title.as_deref(),
                row.meta_description.as_deref(),
            ],
        )
        .map_err(|err| map_constraint(err, format!("slug `{slug}` already taken")))?;
        let id = tx.last_insert_rowid();
        replace_tags(&tx, id, tags)?;
        tx.commit()?;
        Ok(id)
    }

    fn update_article(
        &self,
        id: ArticleId,
        row: &ArticleRow,
        slug: Option<&str>,
        tags: &[String],
    ) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx
            .execute(
                "UPDATE articles
                 SET
                    title = ?2,
                    subtitle = ?3,
                    slug = COALESCE(?4, slug),
                    content = ?5,
                    excerpt = ?6,
                    featured_image = ?7,
                    reading_time = ?8,
                    meta_title = ?9,
                    meta_description = ?10,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    id,
                    row.title.as_str(),
                    row.subtitle.as_deref(),
                    slug,
                    row.content.as_str(),
                    row.excerpt.as_deref(),
                    row.featured_image.as_deref(),
                    row.reading_time_minutes,
                    row.meta_title.as_deref(),
                    row.meta_description.as_deref(),
                ],
            )
            .map_err(|err| map_constraint(err, "slug already taken"))?;
        if changed == 0 {
            return Err(RepoError::not_found("article", id));
        }
        replace_tags(&tx, id, tags)?;
        tx.commit()?;
        Ok(())
    }

    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        let sql = format!("{ARTICLE_SELECT_SQL} WHERE a.id = ?;");
        Ok(load_articles(self.conn, &sql, vec![Value::Integer(id)])?
            .into_iter()
            .next())
    }

    fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Article>> {
        let sql = format!("{ARTICLE_SELECT_SQL} WHERE a.slug = ?;");
        Ok(load_articles(self.conn, &sql, vec![Value::Text(slug.to_string())])?
            .into_iter()
            .next())
    }

    fn slug_exists(&self, slug: &str, excluding: Option<ArticleId>) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM articles WHERE slug = ?1 AND (?2 IS NULL OR id <> ?2)
            );",
            params![slug, excluding],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<Article>> {
        let mut sql = format!("{ARTICLE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(author_id) = query.author_id {
            sql.push_str(" AND a.author_id = ?");
            bind_values.push(Value::Integer(author_id));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND a.status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(publication_id) = query.publication_id {
            sql.push_str(" AND a.publication_id = ?");
            bind_values.push(Value::Integer(publication_id));
        }
        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM article_tags at
                    INNER JOIN tags t ON t.id = at.tag_id
                    WHERE at.article_id = a.id
                      AND t.name = ? COLLATE NOCASE
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }

        sql.push_str(" ORDER BY COALESCE(a.published_at, a.updated_at) DESC, a.id DESC");
        query.page.push_sql(&mut sql, &mut bind_values);

        load_articles(self.conn, &sql, bind_values)
    }

    fn set_status(&self, id: ArticleId, status: ArticleStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET
                status = ?2,
                published_at = CASE
                    WHEN ?2 = 'published' AND published_at IS NULL
                        THEN (strftime('%s', 'now') * 1000)
                    ELSE published_at
                END,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("article", id));
        }
        Ok(())
    }

    fn set_publication(&self, id: ArticleId, publication_id: Option<i64>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET publication_id = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, publication_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("article", id));
        }
        Ok(())
    }

    fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM articles WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("article", id));
        }
        Ok(())
    }

    fn record_view(
        &self,
        id: ArticleId,
        viewer: Option<UserId>,
        ip_address: Option<&str>,
    ) -> RepoResult<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("article", id));
        }
        tx.execute(
            "INSERT INTO article_views (article_id, user_id, ip_address) VALUES (?1, ?2, ?3);",
            params![id, viewer, ip_address],
        )?;
        let views: i64 = tx.query_row(
            "SELECT view_count FROM articles WHERE id = ?1;",
            [id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(views)
    }

    fn record_read(
        &self,
        id: ArticleId,
        reader: Option<UserId>,
        progress: &ReadProgress,
    ) -> RepoResult<()> {
        progress.validate()?;
        self.conn
            .execute(
                "INSERT INTO article_reads (article_id, user_id, read_percentage, time_spent)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id,
                    reader,
                    progress.read_percentage,
                    progress.time_spent_seconds
                ],
            )
            .map_err(|err| match map_constraint(err, "invalid read") {
                RepoError::Conflict(_) => RepoError::not_found("article", id),
                other => other,
            })?;
        Ok(())
    }

    fn popular_tags(&self, limit: u32) -> RepoResult<Vec<TagCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name, COUNT(a.id) AS article_count
             FROM tags t
             INNER JOIN article_tags at ON at.tag_id = t.id
             INNER JOIN articles a ON a.id = at.article_id AND a.status = 'published'
             GROUP BY t.id
             ORDER BY article_count DESC, t.name ASC
             LIMIT ?1;",
        )?;
        let counts = collect_tag_counts(stmt.query([i64::from(limit)])?);
        counts
    }

    fn search_tags(&self, prefix: &str, limit: u32) -> RepoResult<Vec<TagCount>> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT
                t.name,
                (SELECT COUNT(*)
                   FROM article_tags at
                   INNER JOIN articles a ON a.id = at.article_id
                  WHERE at.tag_id = t.id AND a.status = 'published') AS article_count
             FROM tags t
             WHERE t.name LIKE ?1 ESCAPE '\\'
             ORDER BY article_count DESC, t.name ASC
             LIMIT ?2;",
        )?;
        let pattern = format!("{}%", super::user_repo::escape_like(&prefix));
        let counts = collect_tag_counts(stmt.query(params![pattern, i64::from(limit)])?);
        counts
    }

    fn followed_feed(&self, follower_id: UserId, page: Page) -> RepoResult<Vec<Article>> {
        let mut sql = format!(
            "{ARTICLE_SELECT_SQL}
             WHERE a.status = 'published'
               AND a.author_id IN (SELECT following_id FROM follows WHERE follower_id = ?)
             ORDER BY a.published_at DESC, a.id DESC"
        );
        let mut bind_values = vec![Value::Integer(follower_id)];
        page.push_sql(&mut sql, &mut bind_values);
        load_articles(self.conn, &sql, bind_values)
    }

    fn trending(&self, since_ms: i64, limit: u32) -> RepoResult<Vec<ScoredArticle>> {
        let sql = format!(
            "{}
             WHERE a.status = 'published'
             ORDER BY score DESC, a.published_at DESC, a.id DESC
             LIMIT ?2;",
            scored_select_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![since_ms, i64::from(limit)])?;
        let mut scored = Vec::new();
        while let Some(row) = rows.next()? {
            let mut article = parse_article_row(row)?;
            article.tags = load_tags(self.conn, article.id)?;
            scored.push(ScoredArticle {
                article,
                score: row.get("score")?,
            });
        }
        Ok(scored)
    }
}

/// Article select with an extra `score` column bound to `?1` (since ms).
pub(crate) fn scored_select_sql() -> String {
    ARTICLE_SELECT_SQL.replacen(
        "\nFROM articles a",
        &format!(",\n    {} AS score\nFROM articles a", engagement_score_sql()),
        1,
    )
}

/// Runs an article select and attaches tags to each row.
pub(crate) fn load_articles(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Article>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut articles = Vec::new();
    while let Some(row) = rows.next()? {
        articles.push(parse_article_row(row)?);
    }
    for article in &mut articles {
        article.tags = load_tags(conn, article.id)?;
    }
    Ok(articles)
}

pub(crate) fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let status_text: String = row.get("status")?;
    Ok(Article {
        id: row.get("id")?,
        author_id: row.get("author_id")?,
        author_username: row.get("author_username")?,
        publication_id: row.get("publication_id")?,
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        slug: row.get("slug")?,
        content: row.get("content")?,
        excerpt: row.get("excerpt")?,
        featured_image: row.get("featured_image")?,
        status: parse_column(&status_text, "articles.status", ArticleStatus::parse)?,
        reading_time_minutes: row.get("reading_time")?,
        view_count: row.get("view_count")?,
        meta_title: row.get("meta_title")?,
        meta_description: row.get("meta_description")?,
        published_at: row.get("published_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        tags: Vec::new(),
    })
}

pub(crate) fn load_tags(conn: &Connection, article_id: ArticleId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.name
         FROM article_tags at
         INNER JOIN tags t ON t.id = at.tag_id
         WHERE at.article_id = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([article_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

/// Replaces the full tag set of one article; caller owns the transaction.
fn replace_tags(conn: &Connection, article_id: ArticleId, tags: &[String]) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM article_tags WHERE article_id = ?1;",
        [article_id],
    )?;
    for tag in tags {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1);", [tag.as_str()])?;
        conn.execute(
            "INSERT OR IGNORE INTO article_tags (article_id, tag_id)
             SELECT ?1, id FROM tags WHERE name = ?2 COLLATE NOCASE;",
            params![article_id, tag.as_str()],
        )?;
    }
    Ok(())
}

fn collect_tag_counts(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<TagCount>> {
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        tags.push(TagCount {
            name: name.to_lowercase(),
            article_count: row.get(1)?,
        });
    }
    Ok(tags)
}
