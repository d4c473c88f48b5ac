mod common;

use common::{count_rows, draft, published, register, register_with_role, setup};
use inkwell_core::model::article::ArticleStatus;
use inkwell_core::model::engagement::ReadProgress;
use inkwell_core::model::user::UserRole;
use inkwell_core::repo::user_repo::UserListQuery;
use inkwell_core::repo::Page;
use inkwell_core::service::admin_service::{AdminService, METRIC_DB_INTEGRITY, METRIC_USER_COUNT};
use inkwell_core::service::analytics_service::AnalyticsService;
use inkwell_core::service::article_service::ArticleService;
use inkwell_core::service::clap_service::ClapService;
use inkwell_core::service::dashboard_service::{BulkAction, DashboardService, MAX_BULK_IDS};
use inkwell_core::service::follow_service::FollowService;
use inkwell_core::service::seo_service::SeoService;
use inkwell_core::service::upload_service::{UploadService, UploadSettings};
use inkwell_core::ServiceError;
use tempfile::TempDir;

const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

#[test]
fn admin_operations_refuse_non_admins() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let moderator = register_with_role(&conn, "moderator", UserRole::Moderator);
    let admin = AdminService::new(&conn);

    assert!(matches!(
        admin.list_users(&moderator, &UserListQuery::default()),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        admin.change_role(&ada, ada.id, UserRole::Admin),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        AnalyticsService::new(&conn).overview(&moderator, None),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn list_users_filters_by_role_and_search() {
    let conn = setup();
    register(&conn, "ada");
    register(&conn, "grace");
    let root = register_with_role(&conn, "root_admin", UserRole::Admin);
    let admin = AdminService::new(&conn);

    assert_eq!(admin.list_users(&root, &UserListQuery::default()).unwrap().len(), 3);
    let admins = admin
        .list_users(
            &root,
            &UserListQuery {
                role: Some(UserRole::Admin),
                ..UserListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(admins.len(), 1);
    let found = admin
        .list_users(
            &root,
            &UserListQuery {
                search: Some("GRA".to_string()),
                ..UserListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "grace");
}

#[test]
fn role_changes_protect_the_last_admin() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let root = register_with_role(&conn, "root_admin", UserRole::Admin);
    let admin = AdminService::new(&conn);

    assert!(matches!(
        admin.change_role(&root, root.id, UserRole::User),
        Err(ServiceError::Forbidden(_))
    ));

    let promoted = admin.change_role(&root, ada.id, UserRole::Admin).unwrap();
    assert_eq!(promoted.role, UserRole::Admin);
    let demoted = admin.change_role(&promoted, root.id, UserRole::Moderator).unwrap();
    assert_eq!(demoted.role, UserRole::Moderator);

    assert!(matches!(
        admin.delete_user(&promoted, promoted.id),
        Err(ServiceError::Forbidden(_))
    ));
    assert_eq!(
        count_rows(
            &conn,
            "SELECT COUNT(*) FROM audit_logs WHERE action = 'admin_change_role'"
        ),
        2
    );
}

#[test]
fn suspension_revokes_sessions() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let root = register_with_role(&conn, "root_admin", UserRole::Admin);
    let admin = AdminService::new(&conn);
    assert!(count_rows(&conn, &format!("SELECT COUNT(*) FROM auth_sessions WHERE user_id = {}", ada.id)) > 0);

    let suspended = admin.suspend(&root, ada.id, Some("abuse")).unwrap();
    assert!(suspended.is_suspended);
    assert_eq!(
        count_rows(&conn, &format!("SELECT COUNT(*) FROM auth_sessions WHERE user_id = {}", ada.id)),
        0
    );
    assert!(matches!(
        admin.suspend(&root, root.id, None),
        Err(ServiceError::Forbidden(_))
    ));

    let restored = admin.unsuspend(&root, ada.id).unwrap();
    assert!(!restored.is_suspended);
}

#[test]
fn deleting_a_user_removes_their_articles() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let root = register_with_role(&conn, "root_admin", UserRole::Admin);
    published(&conn, &ada, "Doomed", "body", &[]);

    AdminService::new(&conn).delete_user(&root, ada.id).unwrap();
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM articles"), 0);
    assert!(matches!(
        AdminService::new(&conn).delete_user(&root, ada.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn system_health_records_metrics() {
    let conn = setup();
    let root = register_with_role(&conn, "root_admin", UserRole::Admin);
    let uploads = TempDir::new().unwrap();
    let admin = AdminService::new(&conn);

    let health = admin.system_health(&root, uploads.path()).unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.database_reachable);
    assert_eq!(health.integrity, vec!["ok".to_string()]);
    assert!(health.upload_dir_writable);
    assert!(health
        .table_counts
        .iter()
        .any(|count| count.label == "users" && count.count == 1));

    let users = admin
        .metric_history(&root, Some(METRIC_USER_COUNT), Page::default())
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].value, 1.0);
    let integrity = admin
        .metric_history(&root, Some(METRIC_DB_INTEGRITY), Page::default())
        .unwrap();
    assert_eq!(integrity[0].value, 1.0);
}

#[test]
fn unwritable_upload_dir_degrades_health() {
    let conn = setup();
    let root = register_with_role(&conn, "root_admin", UserRole::Admin);
    let scratch = TempDir::new().unwrap();
    let blocked = scratch.path().join("not-a-dir");
    std::fs::write(&blocked, b"file").unwrap();

    let health = AdminService::new(&conn)
        .system_health(&root, &blocked)
        .unwrap();
    assert_eq!(health.status, "degraded");
    assert!(!health.upload_dir_writable);
}

#[test]
fn overview_and_growth_cover_the_window() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let root = register_with_role(&conn, "root_admin", UserRole::Admin);
    let article = published(&conn, &ada, "Counted", "body", &[]);
    ClapService::new(&conn).clap(&grace, article.id, 4).unwrap();
    ArticleService::new(&conn)
        .record_view(article.id, Some(grace.id), None)
        .unwrap();
    let analytics = AnalyticsService::new(&conn);

    let overview = analytics.overview(&root, Some(7)).unwrap();
    assert_eq!(overview.total_users, 3);
    assert_eq!(overview.published_articles, 1);
    assert_eq!(overview.total_claps, 4);
    assert_eq!(overview.total_views, 1);
    assert_eq!(overview.new_users, 3);
    assert_eq!(overview.period_days, 7);

    let growth = analytics.growth(&root, Some(7)).unwrap();
    assert_eq!(growth.len(), 7);
    let today = growth.last().unwrap();
    assert_eq!(today.new_users, 3);
    assert_eq!(today.new_articles, 1);
    assert_eq!(today.views, 1);

    assert!(matches!(
        analytics.growth(&root, Some(366)),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn public_rankings_order_authors_and_tags() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let reader = register(&conn, "reader");
    let by_ada = published(&conn, &ada, "Ada", "body", &["rust"]);
    let by_grace = published(&conn, &grace, "Grace", "body", &["rust", "cobol"]);
    let claps = ClapService::new(&conn);
    claps.clap(&reader, by_ada.id, 10).unwrap();
    claps.clap(&reader, by_grace.id, 3).unwrap();
    let analytics = AnalyticsService::new(&conn);

    let authors = analytics.top_authors(None, None).unwrap();
    assert_eq!(authors[0].username, "ada");
    assert_eq!(authors[0].claps_received, 10);
    assert_eq!(authors[1].claps_received, 3);

    let tags = analytics.tag_stats(None).unwrap();
    assert_eq!(tags[0].name, "rust");
    assert_eq!(tags[0].article_count, 2);
    assert_eq!(tags[0].total_claps, 13);

    let top = analytics.top_articles(None, Some(1)).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].article.id, by_ada.id);
}

#[test]
fn article_analytics_are_private_to_the_author() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let article = published(&conn, &ada, "Measured", "body", &[]);
    let articles = ArticleService::new(&conn);
    articles.record_view(article.id, Some(grace.id), None).unwrap();
    articles.record_view(article.id, Some(grace.id), None).unwrap();
    articles.record_view(article.id, None, Some("9.9.9.9")).unwrap();
    articles
        .record_read(
            article.id,
            Some(grace.id),
            &ReadProgress {
                read_percentage: 60,
                time_spent_seconds: 30,
            },
        )
        .unwrap();
    articles
        .record_read(
            article.id,
            None,
            &ReadProgress {
                read_percentage: 100,
                time_spent_seconds: 90,
            },
        )
        .unwrap();
    ClapService::new(&conn).clap(&grace, article.id, 2).unwrap();
    let analytics = AnalyticsService::new(&conn);

    assert!(matches!(
        analytics.article(&grace, article.id, None),
        Err(ServiceError::Forbidden(_))
    ));
    let report = analytics.article(&ada, article.id, None).unwrap();
    assert_eq!(report.stats.views, 3);
    assert_eq!(report.stats.claps, 2);
    assert_eq!(report.unique_viewers, 2);
    assert_eq!(report.clappers, 1);
    assert_eq!(report.reads.reads, 2);
    assert_eq!(report.reads.avg_read_percentage, 80.0);
    assert_eq!(report.reads.avg_time_spent_seconds, 60.0);
    assert_eq!(report.views_by_day.len(), 1);
    assert_eq!(report.views_by_day[0].count, 3);
}

#[test]
fn author_dashboard_summarizes_own_articles() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let live = published(&conn, &ada, "Live", "body", &[]);
    draft(&conn, &ada, "Pending", "body");
    FollowService::new(&conn).follow(&grace, ada.id).unwrap();
    ClapService::new(&conn).clap(&grace, live.id, 7).unwrap();

    let dashboard = DashboardService::new(&conn).author_dashboard(&ada).unwrap();
    assert_eq!(dashboard.followers, 1);
    assert_eq!(dashboard.totals.claps, 7);
    assert_eq!(dashboard.recent_articles.len(), 2);
    let statuses: Vec<(&str, i64)> = dashboard
        .articles_by_status
        .iter()
        .map(|entry| (entry.label.as_str(), entry.count))
        .collect();
    assert_eq!(statuses, vec![("draft", 1), ("published", 1)]);

    let analytics = AnalyticsService::new(&conn).author(&ada).unwrap();
    assert_eq!(analytics.articles.len(), 2);
    assert_eq!(analytics.totals.claps, 7);
}

#[test]
fn bulk_operations_report_partial_failures() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let first = draft(&conn, &ada, "First", "body");
    let second = draft(&conn, &ada, "Second", "body");
    let foreign = draft(&conn, &grace, "Foreign", "body");
    let dashboard = DashboardService::new(&conn);

    let outcome = dashboard
        .bulk_operations(&ada, BulkAction::Publish, &[first.id, second.id, foreign.id, 999])
        .unwrap();
    assert_eq!(outcome.processed, 4);
    assert_eq!(outcome.succeeded, vec![first.id, second.id]);
    assert_eq!(outcome.failed.len(), 2);
    assert_eq!(outcome.failed[0].id, foreign.id);

    let archived = dashboard
        .bulk_operations(&ada, BulkAction::Archive, &[first.id])
        .unwrap();
    assert_eq!(archived.succeeded, vec![first.id]);
    assert_eq!(
        ArticleService::new(&conn)
            .get(Some(&ada), first.id)
            .unwrap()
            .article
            .status,
        ArticleStatus::Archived
    );

    assert!(matches!(
        dashboard.bulk_operations(&ada, BulkAction::Delete, &[]),
        Err(ServiceError::InvalidInput(_))
    ));
    let too_many: Vec<i64> = (1..=(MAX_BULK_IDS as i64 + 1)).collect();
    assert!(matches!(
        dashboard.bulk_operations(&ada, BulkAction::Delete, &too_many),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn article_meta_builds_canonical_and_open_graph() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let mut input = common::article_input("Lifetimes", "Lifetimes tie references together.", &["rust"]);
    input.featured_image = Some("/uploads/cover.png".to_string());
    let service = ArticleService::new(&conn);
    let article = service.create(&ada, &input).unwrap();
    service.publish(&ada, article.id).unwrap();
    let seo = SeoService::new(&conn, "https://ink.example/");

    let meta = seo.article_meta("lifetimes").unwrap();
    assert_eq!(meta.canonical_url, "https://ink.example/article/lifetimes");
    assert_eq!(meta.title, "Lifetimes");
    assert_eq!(meta.description, "Lifetimes tie references together.");
    assert_eq!(meta.keywords, vec!["rust".to_string()]);
    assert_eq!(meta.author, "ada");
    assert!(meta.published_time.unwrap().ends_with('Z'));
    assert_eq!(
        meta.open_graph.image.as_deref(),
        Some("https://ink.example/uploads/cover.png")
    );
    assert_eq!(meta.json_ld["@type"], "Article");
    assert_eq!(meta.json_ld["author"]["name"], "ada");
}

#[test]
fn article_meta_hides_drafts() {
    let conn = setup();
    let ada = register(&conn, "ada");
    draft(&conn, &ada, "Secret", "body");

    assert!(matches!(
        SeoService::new(&conn, "https://ink.example").article_meta("secret"),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn sitemap_lists_public_pages_only() {
    let conn = setup();
    let ada = register(&conn, "ada");
    register(&conn, "lurker");
    published(&conn, &ada, "Public & Proud", "body", &[]);
    draft(&conn, &ada, "Hidden", "body");
    let seo = SeoService::new(&conn, "https://ink.example");

    let xml = seo.sitemap_xml().unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<loc>https://ink.example/</loc>"));
    assert!(xml.contains("<loc>https://ink.example/article/public-proud</loc>"));
    assert!(xml.contains("<loc>https://ink.example/profile/ada</loc>"));
    assert!(!xml.contains("hidden"));
    assert!(!xml.contains("lurker"));

    let robots = seo.robots_txt();
    assert!(robots.contains("Disallow: /api/"));
    assert!(robots.contains("Sitemap: https://ink.example/sitemap.xml"));
}

#[test]
fn slug_availability_suggests_a_free_variant() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let existing = draft(&conn, &ada, "Taken Title", "body");
    let seo = SeoService::new(&conn, "https://ink.example");

    let taken = seo.slug_availability("Taken Title", None).unwrap();
    assert!(!taken.available);
    assert_eq!(taken.slug, "taken-title");
    assert_eq!(taken.suggestion, "taken-title-2");

    let own = seo.slug_availability("Taken Title", Some(existing.id)).unwrap();
    assert!(own.available);
    let free = seo.slug_availability("Fresh Idea", None).unwrap();
    assert!(free.available);
    assert_eq!(free.suggestion, "fresh-idea");
}

#[test]
fn uploads_are_stored_listed_and_deleted_by_owner() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let dir = TempDir::new().unwrap();
    let settings = UploadSettings::new(dir.path().join("uploads"));
    let uploads = UploadService::new(&conn, &settings);

    let upload = uploads
        .store(&ada, PNG_BYTES, Some("image/png"), Some("../../cover.png"))
        .unwrap();
    assert_eq!(upload.mime_type, "image/png");
    assert_eq!(upload.original_name.as_deref(), Some("cover.png"));
    assert_eq!(upload.size_bytes, PNG_BYTES.len() as i64);
    assert!(upload.stored_name.ends_with(".png"));
    assert_eq!(upload.url, format!("/uploads/{}", upload.stored_name));

    let stored = uploads.open(&upload.stored_name).unwrap();
    assert_eq!(std::fs::read(&stored.path).unwrap(), PNG_BYTES);
    assert_eq!(uploads.list(&ada, Page::default()).unwrap().len(), 1);
    assert!(uploads.list(&grace, Page::default()).unwrap().is_empty());

    assert!(matches!(
        uploads.delete(&grace, upload.id),
        Err(ServiceError::Forbidden(_))
    ));
    uploads.delete(&ada, upload.id).unwrap();
    assert!(!stored.path.exists());
    assert!(matches!(
        uploads.open(&upload.stored_name),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn uploads_reject_bad_content() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let dir = TempDir::new().unwrap();
    let settings = UploadSettings::new(dir.path()).with_max_bytes(8);
    let uploads = UploadService::new(&conn, &settings);

    assert!(matches!(
        uploads.store(&ada, PNG_BYTES, Some("image/png"), None),
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        uploads.store(&ada, b"GIF89a", Some("image/png"), None),
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        uploads.open("../etc/passwd"),
        Err(ServiceError::InvalidInput(_))
    ));
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM uploads"), 0);
}
