//! Article model and text derivations.
//!
//! # Responsibility
//! - Define article records, lifecycle status and write inputs.
//! - Derive slug, excerpt, cover image and reading time from markdown.
//!
//! # Invariants
//! - `slug` is lowercase ASCII, `-` separated, never empty, at most 80 chars.
//! - `reading_time_minutes >= 1`.
//! - Tags are lowercase, trimmed, deduplicated, at most 5 per article.

use super::user::UserId;
use super::{limit_text, require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type ArticleId = i64;

pub const TITLE_MAX_CHARS: usize = 200;
pub const SUBTITLE_MAX_CHARS: usize = 300;
pub const SLUG_MAX_CHARS: usize = 80;
pub const EXCERPT_MAX_CHARS: usize = 160;
pub const MAX_TAGS_PER_ARTICLE: usize = 5;
pub const TAG_MAX_CHARS: usize = 30;
const WORDS_PER_MINUTE: usize = 200;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub author_id: UserId,
    pub author_username: String,
    pub publication_id: Option<i64>,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: ArticleStatus,
    pub reading_time_minutes: i64,
    pub view_count: i64,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub tags: Vec<String>,
}

impl Article {
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }
}

/// Tag with the number of published articles carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub article_count: i64,
}

/// Article ranked by a weighted engagement score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    pub score: i64,
}

/// Author-supplied article fields for create and full update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArticleInput {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
}

impl ArticleInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, 1, TITLE_MAX_CHARS)?;
        limit_text("subtitle", self.subtitle.as_deref(), SUBTITLE_MAX_CHARS)?;
        limit_text("meta_title", self.meta_title.as_deref(), 120)?;
        limit_text("meta_description", self.meta_description.as_deref(), 320)?;
        validate_tags(&self.tags)?;
        Ok(())
    }
}

/// Fully derived row ready for insert/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRow {
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub reading_time_minutes: i64,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

impl ArticleRow {
    /// Derives excerpt, cover image fallback and reading time from input.
    pub fn from_input(input: &ArticleInput) -> Self {
        let preview = derive_markdown_preview(&input.content, EXCERPT_MAX_CHARS);
        let featured_image = input
            .featured_image
            .clone()
            .filter(|value| !value.trim().is_empty())
            .or(preview.first_image);
        Self {
            title: input.title.trim().to_string(),
            subtitle: non_blank(input.subtitle.as_deref()),
            content: input.content.clone(),
            excerpt: preview.text,
            featured_image,
            reading_time_minutes: reading_time_minutes(&input.content),
            meta_title: non_blank(input.meta_title.as_deref()),
            meta_description: non_blank(input.meta_description.as_deref()),
        }
    }
}

/// Markdown-derived preview projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownPreview {
    pub text: Option<String>,
    pub first_image: Option<String>,
}

/// Derives a plain-text preview and the first image path from markdown.
///
/// Rules:
/// - `first_image`: first markdown image path matched by regex.
/// - `text`: markdown symbols removed, whitespace normalized, first
///   `max_chars` chars retained.
pub fn derive_markdown_preview(content: &str, max_chars: usize) -> MarkdownPreview {
    let first_image = MARKDOWN_IMAGE_RE
        .captures(content)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty());

    let plain = plain_text(content);
    let text = if plain.is_empty() {
        None
    } else {
        Some(plain.chars().take(max_chars).collect())
    };

    MarkdownPreview { text, first_image }
}

/// Strips markdown images, links and symbols and collapses whitespace.
pub fn plain_text(content: &str) -> String {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    WHITESPACE_RE
        .replace_all(&without_symbols, " ")
        .trim()
        .to_string()
}

/// `ceil(words / 200)`, never less than one minute.
pub fn reading_time_minutes(content: &str) -> i64 {
    let words = plain_text(content).split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    minutes as i64
}

/// Lowercase ASCII slug with `-` separators.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > SLUG_MAX_CHARS {
        slug.truncate(SLUG_MAX_CHARS);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Collision variant `{base}-{n}`, trimmed so the result fits the slug cap.
pub fn slug_with_suffix(base: &str, n: u32) -> String {
    let suffix = format!("-{n}");
    let mut head: String = base.chars().take(SLUG_MAX_CHARS - suffix.len()).collect();
    while head.ends_with('-') {
        head.pop();
    }
    format!("{head}{suffix}")
}

/// Normalizes one tag value: trimmed and lowercase, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values, sorted by name.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    for tag in tags {
        if tag.trim().is_empty() {
            return Err(ValidationError::new("tags", "tag must not be blank"));
        }
        if tag.trim().chars().count() > TAG_MAX_CHARS {
            return Err(ValidationError::new(
                "tags",
                format!("tag `{}` exceeds {TAG_MAX_CHARS} characters", tag.trim()),
            ));
        }
    }
    if normalize_tags(tags).len() > MAX_TAGS_PER_ARTICLE {
        return Err(ValidationError::new(
            "tags",
            format!("at most {MAX_TAGS_PER_ARTICLE} tags per article"),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators_and_lowercases() {
        assert_eq!(slugify("  Hello, World!  Rust 2024 "), "hello-world-rust-2024");
        assert_eq!(slugify("Ünïcode ☃"), "n-code");
        assert_eq!(slugify("!!!"), "untitled");
    }

    #[test]
    fn slugify_caps_length_without_trailing_dash() {
        let slug = slugify(&"word ".repeat(40));
        assert!(slug.len() <= SLUG_MAX_CHARS);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn slug_suffix_fits_cap() {
        assert_eq!(slug_with_suffix("hello", 2), "hello-2");
        let long = slug_with_suffix(&"a".repeat(SLUG_MAX_CHARS), 12);
        assert_eq!(long.len(), SLUG_MAX_CHARS);
        assert!(long.ends_with("-12"));
    }

    #[test]
    fn reading_time_rounds_up_with_one_minute_floor() {
        assert_eq!(reading_time_minutes(""), 1);
        assert_eq!(reading_time_minutes(&"w ".repeat(200)), 1);
        assert_eq!(reading_time_minutes(&"w ".repeat(201)), 2);
    }

    #[test]
    fn preview_extracts_first_image_path() {
        let preview = derive_markdown_preview("x ![a](one.png) y ![b](two.png)", 160);
        assert_eq!(preview.first_image.as_deref(), Some("one.png"));
    }

    #[test]
    fn preview_strips_markdown_symbols_and_limits_length() {
        let source = "# title\n\n- [link](https://example.com)\n**bold** `code`";
        let preview = derive_markdown_preview(source, 10);
        let text = preview.text.expect("preview text should exist");
        assert!(!text.contains('#'));
        assert!(!text.contains('*'));
        assert!(text.chars().count() <= 10);
    }

    #[test]
    fn tags_are_normalized_and_limited() {
        let tags = vec!["Rust".to_string(), " rust ".to_string(), "WEB".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["rust", "web"]);

        let too_many: Vec<String> = (0..6).map(|idx| format!("t{idx}")).collect();
        assert!(validate_tags(&too_many).is_err());
        assert!(validate_tags(&["  ".to_string()]).is_err());
    }

    #[test]
    fn row_falls_back_to_first_image_for_cover() {
        let input = ArticleInput {
            title: " Title ".to_string(),
            content: "![c](cover.png) body".to_string(),
            ..ArticleInput::default()
        };
        let row = ArticleRow::from_input(&input);
        assert_eq!(row.title, "Title");
        assert_eq!(row.featured_image.as_deref(), Some("cover.png"));
        assert_eq!(row.excerpt.as_deref(), Some("body"));
    }
}
