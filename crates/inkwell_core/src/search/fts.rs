//! SQLite FTS5-based article search.
//!
//! # Responsibility
//! - Provide keyword search over article title, subtitle and content.
//! - Return typed hits with highlighted snippets.
//!
//! # Invariants
//! - Only published articles are returned.
//! - Result ordering is deterministic by rank, `published_at` and id.

use crate::db::DbError;
use crate::model::article::ArticleId;
use crate::model::user::UserId;
use crate::repo::normalize_limit;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for full-text query behavior.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text.
    pub text: String,
    /// Optional tag filter (case-insensitive).
    pub tag: Option<String>,
    /// Maximum number of hits; defaulted and clamped like list pages.
    pub limit: Option<u32>,
    pub offset: u32,
    /// Whether to pass text directly as raw FTS5 expression.
    ///
    /// Default is `false` so partially typed input never fails on syntax.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    /// Creates a query with default pagination and no tag filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: None,
            limit: None,
            offset: 0,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit returned by [`search_articles`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub article_id: ArticleId,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub author_id: UserId,
    pub author_username: String,
    pub excerpt: Option<String>,
    pub reading_time_minutes: i64,
    pub published_at: Option<i64>,
    /// Content fragment with matches wrapped in `<mark>`.
    pub snippet: String,
}

/// Searches published articles via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries.
pub fn search_articles(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    let mut sql = String::from(
        "SELECT
            a.id AS id,
            a.title AS title,
            a.subtitle AS subtitle,
            a.slug AS slug,
            a.author_id AS author_id,
            u.username AS author_username,
            a.excerpt AS excerpt,
            a.reading_time AS reading_time,
            a.published_at AS published_at,
            snippet(articles_fts, 2, '<mark>', '</mark>', ' ... ', 16) AS snippet
         FROM articles_fts
         JOIN articles a ON a.id = articles_fts.rowid
         JOIN users u ON u.id = a.author_id
         WHERE articles_fts MATCH ?
           AND a.status = 'published'",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|tag| !tag.is_empty()) {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM article_tags at
                JOIN tags t ON t.id = at.tag_id
                WHERE at.article_id = a.id AND t.name = ? COLLATE NOCASE
            )",
        );
        bind_values.push(Value::Text(tag.to_string()));
    }

    sql.push_str(" ORDER BY bm25(articles_fts), a.published_at DESC, a.id DESC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(normalize_limit(query.limit))));
    if query.offset > 0 {
        sql.push_str(" OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.offset)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let hits = stmt
        .query_and_then(params_from_iter(bind_values), parse_search_hit)
        .map_err(SearchError::from)
        .and_then(|rows| rows.collect::<SearchResult<Vec<_>>>())
        .map_err(|err| reclassify(err, &match_expr))?;
    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let title: String = row.get("title")?;
    if title.is_empty() {
        return Err(SearchError::InvalidData("article with empty title".to_string()));
    }
    Ok(SearchHit {
        article_id: row.get("id")?,
        title,
        subtitle: row.get("subtitle")?,
        slug: row.get("slug")?,
        author_id: row.get("author_id")?,
        author_username: row.get("author_username")?,
        excerpt: row.get("excerpt")?,
        reading_time_minutes: row.get("reading_time")?,
        published_at: row.get("published_at")?,
        snippet: row.get("snippet")?,
    })
}

/// Quotes every term and ANDs them; the last term also matches as a prefix.
///
/// Terms without a letter or digit tokenize to nothing and are dropped.
fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }
    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms: Vec<String> = text
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();
    let (last, rest) = terms.split_last()?;
    let mut expr = rest.join(" AND ");
    if !expr.is_empty() {
        expr.push_str(" AND ");
    }
    expr.push_str(last);
    expr.push('*');
    Some(expr)
}

/// Turns FTS5 parse failures into `InvalidQuery`; other errors pass through.
fn reclassify(err: SearchError, expr: &str) -> SearchError {
    let message = match &err {
        SearchError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(_, Some(message)))) => {
            Some(message.clone())
        }
        _ => None,
    };
    let Some(message) = message else {
        return err;
    };
    let lowered = message.to_lowercase();
    let syntax = (lowered.contains("fts5") && lowered.contains("syntax"))
        || lowered.contains("malformed match expression")
        || lowered.contains("unterminated")
        || lowered.contains("no such column");
    if syntax {
        SearchError::InvalidQuery {
            query: expr.to_string(),
            message,
        }
    } else {
        err
    }
}
