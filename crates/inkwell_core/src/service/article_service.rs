//! Article authoring, lifecycle and reader-tracking use-cases.
//!
//! # Responsibility
//! - Create and update drafts, deriving slug, excerpt and reading time.
//! - Drive `draft -> published -> archived` transitions with ownership checks.
//! - Screen published content through the content filter.
//!
//! # Invariants
//! - Only the author or an admin mutates an article.
//! - The slug is regenerated only while the article is an unpublished draft.
//! - Drafts and archived articles are visible only to the author or an admin.

use super::moderation_service::scan_and_flag;
use super::{ServiceError, ServiceResult};
use crate::model::article::{
    normalize_tag, normalize_tags, slug_with_suffix, slugify, Article, ArticleId, ArticleInput, ArticleRow,
    ArticleStatus,
};
use crate::model::engagement::ReadProgress;
use crate::model::moderation::TargetType;
use crate::model::user::{User, UserId};
use crate::repo::article_repo::{ArticleListQuery, ArticleRepository, SqliteArticleRepository};
use crate::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use crate::repo::engagement_repo::{EngagementRepository, SqliteEngagementRepository};
use crate::repo::Page;
use log::info;
use rusqlite::Connection;
use serde::Serialize;

const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Article with engagement counters and caller-specific state.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub clap_total: i64,
    pub clapper_count: i64,
    pub comment_count: i64,
    pub bookmark_count: i64,
    pub bookmarked: bool,
    pub user_claps: i64,
}

/// Listing filters accepted from callers.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub author_id: Option<UserId>,
    pub tag: Option<String>,
    pub publication_id: Option<i64>,
    pub status: Option<ArticleStatus>,
    pub page: Page,
}

/// Returns the first free slug derived from `title`.
pub(crate) fn unique_slug(
    articles: &impl ArticleRepository,
    title: &str,
    excluding: Option<ArticleId>,
) -> ServiceResult<String> {
    let base = slugify(title);
    if !articles.slug_exists(&base, excluding)? {
        return Ok(base);
    }
    for n in 2..=MAX_SLUG_ATTEMPTS {
        let candidate = slug_with_suffix(&base, n);
        if !articles.slug_exists(&candidate, excluding)? {
            return Ok(candidate);
        }
    }
    Err(ServiceError::Conflict(format!("no free slug for `{base}`")))
}

pub(crate) fn can_edit(actor: &User, article: &Article) -> bool {
    actor.is_admin() || actor.id == article.author_id
}

pub(crate) fn can_view(viewer: Option<&User>, article: &Article) -> bool {
    article.is_published() || viewer.is_some_and(|user| can_edit(user, article))
}

pub struct ArticleService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ArticleService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, author: &User, input: &ArticleInput) -> ServiceResult<Article> {
        input.validate()?;
        let articles = SqliteArticleRepository::new(self.conn);
        let row = ArticleRow::from_input(input);
        let slug = unique_slug(&articles, &row.title, None)?;
        let id = articles.create_article(author.id, &row, &slug, &normalize_tags(&input.tags))?;
        info!(
            "event=article_create module=articles status=ok article_id={} author_id={}",
            id, author.id
        );
        self.require(id)
    }

    pub fn update(&self, actor: &User, id: ArticleId, input: &ArticleInput) -> ServiceResult<Article> {
        let existing = self.require_editable(actor, id)?;
        input.validate()?;

        let articles = SqliteArticleRepository::new(self.conn);
        let row = ArticleRow::from_input(input);
        let slug = if existing.status == ArticleStatus::Draft && existing.published_at.is_none() {
            Some(unique_slug(&articles, &row.title, Some(id))?)
        } else {
            None
        };
        articles.update_article(id, &row, slug.as_deref(), &normalize_tags(&input.tags))?;
        let flagged = if existing.status == ArticleStatus::Published {
            self.screen(id, &row.title, &row.content)?
        } else {
            false
        };
        info!("event=article_update module=articles status=ok article_id={id} flagged={flagged}");
        self.require(id)
    }

    /// Publishes an article and screens its text; flags never block publishing.
    ///
    /// Publishing an already published article returns it unchanged.
    pub fn publish(&self, actor: &User, id: ArticleId) -> ServiceResult<Article> {
        let existing = self.require_editable(actor, id)?;
        if existing.status == ArticleStatus::Published {
            return Ok(existing);
        }
        if existing.content.trim().is_empty() {
            return Err(ServiceError::invalid("cannot publish an article without content"));
        }
        SqliteArticleRepository::new(self.conn).set_status(id, ArticleStatus::Published)?;
        let flagged = self.screen(id, &existing.title, &existing.content)?;
        info!("event=article_publish module=articles status=ok article_id={id} flagged={flagged}");
        self.require(id)
    }

    fn screen(&self, id: ArticleId, title: &str, content: &str) -> ServiceResult<bool> {
        let scan = scan_and_flag(
            self.conn,
            TargetType::Article,
            id,
            &format!("{title}\n{content}"),
        )?;
        Ok(scan.needs_review)
    }

    pub fn unpublish(&self, actor: &User, id: ArticleId) -> ServiceResult<Article> {
        self.transition(actor, id, ArticleStatus::Draft)
    }

    pub fn archive(&self, actor: &User, id: ArticleId) -> ServiceResult<Article> {
        self.transition(actor, id, ArticleStatus::Archived)
    }

    pub fn delete(&self, actor: &User, id: ArticleId) -> ServiceResult<()> {
        self.require_editable(actor, id)?;
        SqliteArticleRepository::new(self.conn).delete_article(id)?;
        info!("event=article_delete module=articles status=ok article_id={id}");
        Ok(())
    }

    pub fn get(&self, viewer: Option<&User>, id: ArticleId) -> ServiceResult<ArticleDetail> {
        let article = SqliteArticleRepository::new(self.conn).get_article(id)?;
        self.detail(viewer, article, &id.to_string())
    }

    pub fn get_by_slug(&self, viewer: Option<&User>, slug: &str) -> ServiceResult<ArticleDetail> {
        let article = SqliteArticleRepository::new(self.conn).get_by_slug(slug)?;
        self.detail(viewer, article, slug)
    }

    /// Lists articles; non-owners only ever see published rows.
    pub fn list(&self, viewer: Option<&User>, filter: &ArticleFilter) -> ServiceResult<Vec<Article>> {
        let sees_all = viewer.is_some_and(|user| {
            user.is_admin() || filter.author_id.is_some_and(|author| author == user.id)
        });
        let status = if sees_all {
            filter.status
        } else {
            Some(ArticleStatus::Published)
        };
        if !sees_all && filter.status.is_some_and(|status| status != ArticleStatus::Published) {
            return Err(ServiceError::forbidden(
                "only the author or an admin can list unpublished articles",
            ));
        }

        Ok(SqliteArticleRepository::new(self.conn).list_articles(&ArticleListQuery {
            author_id: filter.author_id,
            tag: filter.tag.as_deref().and_then(normalize_tag),
            publication_id: filter.publication_id,
            status,
            page: filter.page,
        })?)
    }

    /// Records one view of a published article; returns the new view count.
    pub fn record_view(
        &self,
        id: ArticleId,
        viewer: Option<UserId>,
        ip_address: Option<&str>,
    ) -> ServiceResult<i64> {
        self.require_published(id)?;
        Ok(SqliteArticleRepository::new(self.conn).record_view(id, viewer, ip_address)?)
    }

    pub fn record_read(
        &self,
        id: ArticleId,
        reader: Option<UserId>,
        progress: &ReadProgress,
    ) -> ServiceResult<()> {
        progress.validate()?;
        self.require_published(id)?;
        Ok(SqliteArticleRepository::new(self.conn).record_read(id, reader, progress)?)
    }

    pub(crate) fn require_published(&self, id: ArticleId) -> ServiceResult<Article> {
        let article = self.require(id)?;
        if !article.is_published() {
            return Err(ServiceError::not_found("article", id));
        }
        Ok(article)
    }

    pub(crate) fn require_editable(&self, actor: &User, id: ArticleId) -> ServiceResult<Article> {
        let article = self.require(id)?;
        if !can_edit(actor, &article) {
            return Err(ServiceError::forbidden(
                "only the author or an admin can modify this article",
            ));
        }
        Ok(article)
    }

    fn require(&self, id: ArticleId) -> ServiceResult<Article> {
        SqliteArticleRepository::new(self.conn)
            .get_article(id)?
            .ok_or_else(|| ServiceError::not_found("article", id))
    }

    fn transition(&self, actor: &User, id: ArticleId, status: ArticleStatus) -> ServiceResult<Article> {
        self.require_editable(actor, id)?;
        SqliteArticleRepository::new(self.conn).set_status(id, status)?;
        info!(
            "event=article_status module=articles status=ok article_id={} to={}",
            id,
            status.as_str()
        );
        self.require(id)
    }

    fn detail(
        &self,
        viewer: Option<&User>,
        article: Option<Article>,
        key: &str,
    ) -> ServiceResult<ArticleDetail> {
        let article = article
            .filter(|article| can_view(viewer, article))
            .ok_or_else(|| ServiceError::not_found("article", key))?;

        let engagement = SqliteEngagementRepository::new(self.conn);
        let claps = engagement.clap_summary(article.id)?;
        let (bookmarked, user_claps) = match viewer {
            Some(user) => (
                engagement.is_bookmarked(user.id, article.id)?,
                engagement.user_claps(article.id, user.id)?,
            ),
            None => (false, 0),
        };
        Ok(ArticleDetail {
            clap_total: claps.total_claps,
            clapper_count: claps.clappers,
            comment_count: SqliteCommentRepository::new(self.conn).count_for_article(article.id)?,
            bookmark_count: engagement.bookmark_count(article.id)?,
            bookmarked,
            user_claps,
            article,
        })
    }
}
