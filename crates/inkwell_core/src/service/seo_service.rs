//! Search-engine metadata, sitemap and robots.txt.

use super::article_service::unique_slug;
use super::{ServiceError, ServiceResult};
use crate::model::article::{slugify, Article, ArticleId};
use crate::repo::article_repo::{ArticleRepository, SqliteArticleRepository};
use crate::repo::seo_repo::{SeoRepository, SitemapEntry, SqliteSeoRepository};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};

pub const SITE_NAME: &str = "Inkwell";
pub const META_TITLE_MAX_CHARS: usize = 60;
pub const META_DESCRIPTION_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, Serialize)]
pub struct OpenGraph {
    #[serde(rename = "og:type")]
    pub og_type: &'static str,
    #[serde(rename = "og:title")]
    pub title: String,
    #[serde(rename = "og:description")]
    pub description: String,
    #[serde(rename = "og:url")]
    pub url: String,
    #[serde(rename = "og:site_name")]
    pub site_name: &'static str,
    #[serde(rename = "og:image", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleMeta {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub keywords: Vec<String>,
    pub author: String,
    pub published_time: Option<String>,
    pub modified_time: String,
    pub open_graph: OpenGraph,
    pub json_ld: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlugAvailability {
    pub slug: String,
    pub available: bool,
    /// First free variant when `slug` is taken.
    pub suggestion: String,
}

pub struct SeoService<'conn> {
    conn: &'conn Connection,
    base_url: String,
}

impl<'conn> SeoService<'conn> {
    pub fn new(conn: &'conn Connection, base_url: &str) -> Self {
        Self {
            conn,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn article_meta(&self, slug: &str) -> ServiceResult<ArticleMeta> {
        let article = SqliteArticleRepository::new(self.conn)
            .get_by_slug(slug)?
            .filter(Article::is_published)
            .ok_or_else(|| ServiceError::not_found("article", slug))?;
        Ok(self.build_meta(&article))
    }

    pub fn sitemap_xml(&self) -> ServiceResult<String> {
        let seo = SqliteSeoRepository::new(self.conn);
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        push_url(&mut xml, &format!("{}/", self.base_url), None, "daily", "1.0");
        for entry in seo.published_article_pages()? {
            self.push_entry(&mut xml, &entry, "weekly", "0.8");
        }
        for entry in seo.author_pages()? {
            self.push_entry(&mut xml, &entry, "weekly", "0.6");
        }
        for entry in seo.publication_pages()? {
            self.push_entry(&mut xml, &entry, "weekly", "0.6");
        }
        xml.push_str("</urlset>\n");
        Ok(xml)
    }

    pub fn robots_txt(&self) -> String {
        format!(
            "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {}/sitemap.xml\n",
            self.base_url
        )
    }

    /// Slugifies `candidate` and reports whether it is free.
    pub fn slug_availability(
        &self,
        candidate: &str,
        excluding: Option<ArticleId>,
    ) -> ServiceResult<SlugAvailability> {
        let slug = slugify(candidate);
        let articles = SqliteArticleRepository::new(self.conn);
        let available = !articles.slug_exists(&slug, excluding)?;
        let suggestion = if available {
            slug.clone()
        } else {
            unique_slug(&articles, candidate, excluding)?
        };
        Ok(SlugAvailability {
            slug,
            available,
            suggestion,
        })
    }

    fn push_entry(&self, xml: &mut String, entry: &SitemapEntry, changefreq: &str, priority: &str) {
        let loc = format!("{}{}", self.base_url, entry.path);
        let lastmod = format_date(entry.updated_at);
        push_url(xml, &loc, lastmod.as_deref(), changefreq, priority);
    }

    fn build_meta(&self, article: &Article) -> ArticleMeta {
        let title = truncate_on_word(
            article.meta_title.as_deref().unwrap_or(&article.title),
            META_TITLE_MAX_CHARS,
        );
        let description = truncate_on_word(
            article
                .meta_description
                .as_deref()
                .or(article.excerpt.as_deref())
                .unwrap_or_default(),
            META_DESCRIPTION_MAX_CHARS,
        );
        let canonical_url = format!("{}/article/{}", self.base_url, article.slug);
        let image = article
            .featured_image
            .as_deref()
            .map(|image| self.absolute(image));
        let published_time = article.published_at.and_then(format_timestamp);
        let modified_time = format_timestamp(article.updated_at).unwrap_or_default();

        let mut json_ld = json!({
            "@context": "https://schema.org",
            "@type": "Article",
            "headline": title,
            "description": description,
            "url": canonical_url,
            "mainEntityOfPage": canonical_url,
            "author": {
                "@type": "Person",
                "name": article.author_username,
                "url": format!("{}/profile/{}", self.base_url, article.author_username),
            },
            "publisher": { "@type": "Organization", "name": SITE_NAME },
            "dateModified": modified_time,
            "keywords": article.tags.join(", "),
            "timeRequired": format!("PT{}M", article.reading_time_minutes),
        });
        if let Some(published) = &published_time {
            json_ld["datePublished"] = json!(published);
        }
        if let Some(image) = &image {
            json_ld["image"] = json!(image);
        }

        ArticleMeta {
            open_graph: OpenGraph {
                og_type: "article",
                title: title.clone(),
                description: description.clone(),
                url: canonical_url.clone(),
                site_name: SITE_NAME,
                image,
            },
            title,
            description,
            canonical_url,
            keywords: article.tags.clone(),
            author: article.author_username.clone(),
            published_time,
            modified_time,
            json_ld,
        }
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

/// Cuts `text` to `max_chars`, backing off to the last word boundary.
pub fn truncate_on_word(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let next_is_space = text
        .chars()
        .nth(max_chars)
        .is_some_and(char::is_whitespace);
    if next_is_space {
        return cut.trim_end().to_string();
    }
    match cut.rfind(char::is_whitespace) {
        Some(index) if index > 0 => cut[..index].trim_end().to_string(),
        _ => cut,
    }
}

pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn push_url(xml: &mut String, loc: &str, lastmod: Option<&str>, changefreq: &str, priority: &str) {
    xml.push_str("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(loc)));
    if let Some(lastmod) = lastmod {
        xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
    }
    xml.push_str(&format!("    <changefreq>{changefreq}</changefreq>\n"));
    xml.push_str(&format!("    <priority>{priority}</priority>\n"));
    xml.push_str("  </url>\n");
}

fn format_timestamp(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn format_date(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map(|time| time.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::{format_date, format_timestamp, truncate_on_word, xml_escape};

    #[test]
    fn truncation_backs_off_to_word_boundary() {
        assert_eq!(truncate_on_word("short title", 60), "short title");
        assert_eq!(truncate_on_word("hello wonderful world", 12), "hello");
        assert_eq!(truncate_on_word("hello world again", 11), "hello world");
        assert_eq!(truncate_on_word("supercalifragilistic", 5), "super");
    }

    #[test]
    fn xml_escape_covers_markup_characters() {
        assert_eq!(
            xml_escape("a&b <c> \"d\" 'e'"),
            "a&amp;b &lt;c&gt; &quot;d&quot; &apos;e&apos;"
        );
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_date(0).as_deref(), Some("1970-01-01"));
        assert_eq!(
            format_timestamp(86_400_000).as_deref(),
            Some("1970-01-02T00:00:00Z")
        );
    }
}
