mod common;

use common::{article_input, draft, published, register, register_with_role, setup};
use inkwell_core::model::article::ArticleStatus;
use inkwell_core::model::engagement::ReadProgress;
use inkwell_core::model::user::UserRole;
use inkwell_core::repo::Page;
use inkwell_core::service::article_service::{ArticleFilter, ArticleService};
use inkwell_core::service::bookmark_service::BookmarkService;
use inkwell_core::service::clap_service::ClapService;
use inkwell_core::service::feed_service::FeedService;
use inkwell_core::service::follow_service::FollowService;
use inkwell_core::{search_articles, SearchQuery, ServiceError};

#[test]
fn create_derives_slug_excerpt_and_reading_time() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let body = format!("# Heading\n\n{}", "word ".repeat(450));
    let article = ArticleService::new(&conn)
        .create(&ada, &article_input("Hello, World!", &body, &["Rust", "rust", " SQL "]))
        .unwrap();

    assert_eq!(article.slug, "hello-world");
    assert_eq!(article.status, ArticleStatus::Draft);
    assert_eq!(article.reading_time_minutes, 3);
    assert!(article.published_at.is_none());
    assert_eq!(article.tags, vec!["rust".to_string(), "sql".to_string()]);
    let excerpt = article.excerpt.unwrap();
    assert!(excerpt.starts_with("Heading word"));
    assert!(excerpt.chars().count() <= 160);
}

#[test]
fn slug_collisions_get_numeric_suffixes() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let first = draft(&conn, &ada, "Same Title", "a");
    let second = draft(&conn, &ada, "Same Title", "b");
    let third = draft(&conn, &ada, "Same Title", "c");

    assert_eq!(first.slug, "same-title");
    assert_eq!(second.slug, "same-title-2");
    assert_eq!(third.slug, "same-title-3");
}

#[test]
fn slug_is_frozen_after_first_publish() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let service = ArticleService::new(&conn);
    let article = draft(&conn, &ada, "Working Title", "body");

    let renamed = service
        .update(&ada, article.id, &article_input("Better Title", "body", &[]))
        .unwrap();
    assert_eq!(renamed.slug, "better-title");

    service.publish(&ada, article.id).unwrap();
    service.unpublish(&ada, article.id).unwrap();
    let renamed_again = service
        .update(&ada, article.id, &article_input("Final Title", "body", &[]))
        .unwrap();
    assert_eq!(renamed_again.slug, "better-title");
    assert_eq!(renamed_again.title, "Final Title");
}

#[test]
fn only_author_or_admin_can_modify() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let mallory = register(&conn, "mallory");
    let admin = register_with_role(&conn, "root_admin", UserRole::Admin);
    let service = ArticleService::new(&conn);
    let article = draft(&conn, &ada, "Mine", "body");

    assert!(matches!(
        service.update(&mallory, article.id, &article_input("Theirs", "x", &[])),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.delete(&mallory, article.id),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(service.archive(&admin, article.id).is_ok());
}

#[test]
fn publish_requires_content_and_sets_published_at_once() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let service = ArticleService::new(&conn);

    let empty = draft(&conn, &ada, "Empty", "   ");
    assert!(matches!(
        service.publish(&ada, empty.id),
        Err(ServiceError::InvalidInput(_))
    ));

    let article = draft(&conn, &ada, "Real", "content");
    let first = service.publish(&ada, article.id).unwrap();
    let first_published_at = first.published_at.unwrap();
    service.unpublish(&ada, article.id).unwrap();
    let again = service.publish(&ada, article.id).unwrap();
    assert_eq!(again.published_at, Some(first_published_at));
}

#[test]
fn publishing_spammy_content_creates_flags() {
    let conn = setup();
    let ada = register(&conn, "ada");
    published(
        &conn,
        &ada,
        "Offer",
        "Buy now and get a free money bonus, click here",
        &[],
    );

    let flags: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM content_flags WHERE target_type = 'article' AND flag_type = 'spam'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(flags, 1);
}

#[test]
fn drafts_are_hidden_from_other_readers() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let service = ArticleService::new(&conn);
    let article = draft(&conn, &ada, "Secret", "body");

    assert!(service.get(Some(&ada), article.id).is_ok());
    assert!(matches!(
        service.get(Some(&grace), article.id),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.get_by_slug(None, &article.slug),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn detail_includes_caller_engagement() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let article = published(&conn, &ada, "Popular", "body", &["rust"]);
    ClapService::new(&conn).clap(&grace, article.id, 5).unwrap();
    BookmarkService::new(&conn).add(&grace, article.id).unwrap();

    let detail = ArticleService::new(&conn)
        .get_by_slug(Some(&grace), "popular")
        .unwrap();
    assert_eq!(detail.clap_total, 5);
    assert_eq!(detail.clapper_count, 1);
    assert_eq!(detail.user_claps, 5);
    assert!(detail.bookmarked);
    assert_eq!(detail.bookmark_count, 1);
    assert_eq!(detail.article.tags, vec!["rust".to_string()]);
}

#[test]
fn listing_hides_unpublished_rows_from_non_owners() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let service = ArticleService::new(&conn);
    published(&conn, &ada, "Public", "body", &["rust"]);
    draft(&conn, &ada, "Private", "body");

    let own = service
        .list(
            Some(&ada),
            &ArticleFilter {
                author_id: Some(ada.id),
                ..ArticleFilter::default()
            },
        )
        .unwrap();
    assert_eq!(own.len(), 2);

    let public = service
        .list(
            None,
            &ArticleFilter {
                author_id: Some(ada.id),
                ..ArticleFilter::default()
            },
        )
        .unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].title, "Public");

    let err = service
        .list(
            Some(&grace),
            &ArticleFilter {
                author_id: Some(ada.id),
                status: Some(ArticleStatus::Draft),
                ..ArticleFilter::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let tagged = service
        .list(
            None,
            &ArticleFilter {
                tag: Some("RUST".to_string()),
                ..ArticleFilter::default()
            },
        )
        .unwrap();
    assert_eq!(tagged.len(), 1);
}

#[test]
fn list_limit_is_capped() {
    let conn = setup();
    let ada = register(&conn, "ada");
    for index in 0..12 {
        published(&conn, &ada, &format!("Post {index}"), "body", &[]);
    }
    let service = ArticleService::new(&conn);

    let default_page = service.list(None, &ArticleFilter::default()).unwrap();
    assert_eq!(default_page.len(), 10);
    let second_page = service
        .list(
            None,
            &ArticleFilter {
                page: Page::new(10, 10),
                ..ArticleFilter::default()
            },
        )
        .unwrap();
    assert_eq!(second_page.len(), 2);
}

#[test]
fn views_and_reads_are_recorded_for_published_articles() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let service = ArticleService::new(&conn);
    let article = published(&conn, &ada, "Tracked", "body", &[]);

    assert_eq!(service.record_view(article.id, None, Some("1.2.3.4")).unwrap(), 1);
    assert_eq!(service.record_view(article.id, Some(ada.id), None).unwrap(), 2);
    service
        .record_read(
            article.id,
            None,
            &ReadProgress {
                read_percentage: 80,
                time_spent_seconds: 42,
            },
        )
        .unwrap();
    assert!(matches!(
        service.record_read(
            article.id,
            None,
            &ReadProgress {
                read_percentage: 101,
                time_spent_seconds: 0,
            },
        ),
        Err(ServiceError::InvalidInput(_))
    ));

    let hidden = draft(&conn, &ada, "Hidden", "body");
    assert!(matches!(
        service.record_view(hidden.id, None, None),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn personalized_feed_falls_back_to_latest() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let reader = register(&conn, "reader");
    published(&conn, &ada, "From Ada", "body", &[]);
    published(&conn, &grace, "From Grace", "body", &[]);
    let feed = FeedService::new(&conn);

    assert_eq!(feed.personalized(&reader, Page::default()).unwrap().len(), 2);

    FollowService::new(&conn).follow(&reader, ada.id).unwrap();
    let followed = feed.personalized(&reader, Page::default()).unwrap();
    assert_eq!(followed.len(), 1);
    assert_eq!(followed[0].title, "From Ada");
}

#[test]
fn trending_ranks_by_weighted_engagement() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let quiet = published(&conn, &ada, "Quiet", "body", &[]);
    let loud = published(&conn, &ada, "Loud", "body", &[]);
    ArticleService::new(&conn)
        .record_view(quiet.id, None, None)
        .unwrap();
    ClapService::new(&conn).clap(&grace, loud.id, 3).unwrap();
    BookmarkService::new(&conn).add(&grace, loud.id).unwrap();

    let trending = FeedService::new(&conn).trending(None, None).unwrap();
    assert_eq!(trending[0].article.id, loud.id);
    assert_eq!(trending[0].score, 3 * 2 + 4);
    assert_eq!(trending[1].article.id, quiet.id);
    assert_eq!(trending[1].score, 1);

    assert!(matches!(
        FeedService::new(&conn).trending(Some(0), None),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn tags_are_counted_over_published_articles() {
    let conn = setup();
    let ada = register(&conn, "ada");
    published(&conn, &ada, "One", "body", &["rust", "sqlite"]);
    published(&conn, &ada, "Two", "body", &["rust"]);
    let hidden = draft(&conn, &ada, "Three", "body");
    ArticleService::new(&conn)
        .update(&ada, hidden.id, &article_input("Three", "body", &["rust"]))
        .unwrap();
    let feed = FeedService::new(&conn);

    let popular = feed.popular_tags(None).unwrap();
    assert_eq!(popular[0].name, "rust");
    assert_eq!(popular[0].article_count, 2);
    assert_eq!(feed.search_tags("sq", None).unwrap()[0].name, "sqlite");
    assert_eq!(feed.tag_articles("Rust", Page::default()).unwrap().len(), 2);
}

#[test]
fn search_matches_published_articles_only() {
    let conn = setup();
    let ada = register(&conn, "ada");
    published(&conn, &ada, "Ownership in Rust", "Borrowing rules explained", &["rust"]);
    draft(&conn, &ada, "Rust drafts", "Borrowing never shown");

    let hits = search_articles(&conn, &SearchQuery::new("borrowing")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Ownership in Rust");
    assert_eq!(hits[0].author_username, "ada");
    assert!(hits[0].snippet.contains("<mark>"));
    assert_eq!(search_articles(&conn, &SearchQuery::new("borrow")).unwrap().len(), 1);

    assert!(search_articles(&conn, &SearchQuery::new("   ")).unwrap().is_empty());
}

#[test]
fn search_tolerates_fts_operators_in_plain_mode() {
    let conn = setup();
    let ada = register(&conn, "ada");
    published(&conn, &ada, "C++ tips", "Templates AND macros", &[]);

    let hits = search_articles(&conn, &SearchQuery::new("templates \"macros")).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn search_ignores_trailing_punctuation_terms() {
    let conn = setup();
    let ada = register(&conn, "ada");
    published(&conn, &ada, "Rust tips", "Small habits for rust code", &["rust"]);

    for text in ["rust !!!", "rust tips (", "rust -"] {
        let hits = search_articles(&conn, &SearchQuery::new(text)).unwrap();
        assert_eq!(hits.len(), 1, "query `{text}`");
    }
    assert!(search_articles(&conn, &SearchQuery::new("!!! (")).unwrap().is_empty());
}
