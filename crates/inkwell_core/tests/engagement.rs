mod common;

use common::{draft, published, register, register_with_role, setup};
use inkwell_core::model::notification::NotificationKind;
use inkwell_core::model::user::UserRole;
use inkwell_core::repo::Page;
use inkwell_core::service::bookmark_service::BookmarkService;
use inkwell_core::service::clap_service::ClapService;
use inkwell_core::service::comment_service::{CommentService, NewCommentInput};
use inkwell_core::service::notification_service::NotificationService;
use inkwell_core::ServiceError;

#[test]
fn claps_are_capped_per_user() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let article = published(&conn, &ada, "Clappable", "body", &[]);
    let claps = ClapService::new(&conn);

    let first = claps.clap(&grace, article.id, 30).unwrap();
    assert_eq!(first.added, 30);
    let second = claps.clap(&grace, article.id, 30).unwrap();
    assert_eq!(second.added, 20);
    assert_eq!(second.user_total, 50);
    let third = claps.clap(&grace, article.id, 1).unwrap();
    assert_eq!(third.added, 0);
    assert_eq!(third.article_total, 50);

    let summary = claps.summary(article.id).unwrap();
    assert_eq!(summary.total_claps, 50);
    assert_eq!(summary.clappers, 1);
}

#[test]
fn clap_count_is_validated() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let article = published(&conn, &ada, "Clappable", "body", &[]);
    let claps = ClapService::new(&conn);

    assert!(matches!(
        claps.clap(&grace, article.id, 0),
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        claps.clap(&grace, article.id, 51),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn authors_cannot_clap_for_themselves() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let article = published(&conn, &ada, "Mine", "body", &[]);

    assert!(matches!(
        ClapService::new(&conn).clap(&ada, article.id, 1),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn drafts_cannot_be_clapped_or_bookmarked() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let article = draft(&conn, &ada, "Unfinished", "body");

    assert!(matches!(
        ClapService::new(&conn).clap(&grace, article.id, 1),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        BookmarkService::new(&conn).add(&grace, article.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn clapping_notifies_the_author_once_per_effective_clap() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let article = published(&conn, &ada, "Clappable", "body", &[]);
    let claps = ClapService::new(&conn);
    claps.clap(&grace, article.id, 50).unwrap();
    claps.clap(&grace, article.id, 5).unwrap();

    let inbox = NotificationService::new(&conn)
        .list(ada.id, false, Page::default())
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Clap);
    assert_eq!(inbox[0].actor_id, Some(grace.id));
    assert_eq!(inbox[0].entity_id, Some(article.id));
}

#[test]
fn bookmarks_are_idempotent() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let first = published(&conn, &ada, "First", "body", &[]);
    let second = published(&conn, &ada, "Second", "body", &[]);
    let bookmarks = BookmarkService::new(&conn);

    assert!(bookmarks.add(&grace, first.id).unwrap());
    assert!(!bookmarks.add(&grace, first.id).unwrap());
    assert!(bookmarks.add(&grace, second.id).unwrap());

    let saved = bookmarks.list(&grace, Page::default()).unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].id, second.id);

    assert!(bookmarks.remove(&grace, first.id).unwrap());
    assert!(!bookmarks.remove(&grace, first.id).unwrap());
    assert_eq!(bookmarks.list(&grace, Page::default()).unwrap().len(), 1);
}

#[test]
fn comment_and_reply_notify_the_right_people() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let linus = register(&conn, "linus");
    let article = published(&conn, &ada, "Discuss", "body", &[]);
    let comments = CommentService::new(&conn);

    let top = comments
        .create(
            &grace,
            &NewCommentInput {
                article_id: article.id,
                parent_id: None,
                content: "  Great read  ".to_string(),
            },
        )
        .unwrap();
    assert_eq!(top.content, "Great read");
    assert_eq!(top.username, "grace");

    let reply = comments
        .create(
            &linus,
            &NewCommentInput {
                article_id: article.id,
                parent_id: Some(top.id),
                content: "Agreed".to_string(),
            },
        )
        .unwrap();
    assert_eq!(reply.parent_id, Some(top.id));

    let notifications = NotificationService::new(&conn);
    let ada_inbox = notifications.list(ada.id, false, Page::default()).unwrap();
    assert_eq!(ada_inbox.len(), 2);
    assert!(ada_inbox
        .iter()
        .all(|notification| notification.kind == NotificationKind::Comment));

    let grace_inbox = notifications.list(grace.id, false, Page::default()).unwrap();
    assert_eq!(grace_inbox.len(), 1);
    assert_eq!(grace_inbox[0].kind, NotificationKind::Reply);

    assert_eq!(comments.list_for_article(article.id).unwrap().len(), 2);
}

#[test]
fn authors_commenting_on_their_own_article_are_not_notified() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let article = published(&conn, &ada, "Monologue", "body", &[]);
    CommentService::new(&conn)
        .create(
            &ada,
            &NewCommentInput {
                article_id: article.id,
                parent_id: None,
                content: "Addendum".to_string(),
            },
        )
        .unwrap();

    assert_eq!(NotificationService::new(&conn).unread_count(ada.id).unwrap(), 0);
}

#[test]
fn replies_must_target_a_live_comment_on_the_same_article() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let first = published(&conn, &ada, "First", "body", &[]);
    let second = published(&conn, &ada, "Second", "body", &[]);
    let comments = CommentService::new(&conn);
    let on_first = comments
        .create(
            &grace,
            &NewCommentInput {
                article_id: first.id,
                parent_id: None,
                content: "hello".to_string(),
            },
        )
        .unwrap();

    let cross = comments.create(
        &grace,
        &NewCommentInput {
            article_id: second.id,
            parent_id: Some(on_first.id),
            content: "wrong thread".to_string(),
        },
    );
    assert!(matches!(cross, Err(ServiceError::InvalidInput(_))));

    comments.delete(&grace, on_first.id).unwrap();
    let to_deleted = comments.create(
        &grace,
        &NewCommentInput {
            article_id: first.id,
            parent_id: Some(on_first.id),
            content: "too late".to_string(),
        },
    );
    assert!(matches!(to_deleted, Err(ServiceError::InvalidInput(_))));
}

#[test]
fn blank_comments_are_rejected() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let article = published(&conn, &ada, "Quiet", "body", &[]);

    let result = CommentService::new(&conn).create(
        &grace,
        &NewCommentInput {
            article_id: article.id,
            parent_id: None,
            content: "   ".to_string(),
        },
    );
    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
}

#[test]
fn comment_edit_and_delete_permissions() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let linus = register(&conn, "linus");
    let moderator = register_with_role(&conn, "mod", UserRole::Moderator);
    let article = published(&conn, &ada, "Rules", "body", &[]);
    let comments = CommentService::new(&conn);
    let new_comment = |content: &str| NewCommentInput {
        article_id: article.id,
        parent_id: None,
        content: content.to_string(),
    };

    let by_grace = comments.create(&grace, &new_comment("first")).unwrap();
    assert!(matches!(
        comments.edit(&ada, by_grace.id, "hijacked"),
        Err(ServiceError::Forbidden(_))
    ));
    assert_eq!(
        comments.edit(&grace, by_grace.id, "edited").unwrap().content,
        "edited"
    );

    assert!(matches!(
        comments.delete(&linus, by_grace.id),
        Err(ServiceError::Forbidden(_))
    ));
    comments.delete(&ada, by_grace.id).unwrap();

    let second = comments.create(&grace, &new_comment("second")).unwrap();
    comments.delete(&moderator, second.id).unwrap();

    let listed = comments.list_for_article(article.id).unwrap();
    assert!(listed.iter().all(|comment| comment.is_deleted));
    assert!(matches!(
        comments.edit(&grace, second.id, "revive"),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn notification_inbox_is_scoped_to_its_owner() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let first = published(&conn, &ada, "First", "body", &[]);
    let second = published(&conn, &ada, "Second", "body", &[]);
    ClapService::new(&conn).clap(&grace, first.id, 1).unwrap();
    ClapService::new(&conn).clap(&grace, second.id, 1).unwrap();
    let notifications = NotificationService::new(&conn);

    let inbox = notifications.list(ada.id, false, Page::default()).unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(notifications.unread_count(ada.id).unwrap(), 2);

    assert!(matches!(
        notifications.mark_read(grace.id, inbox[0].id),
        Err(ServiceError::NotFound(_))
    ));
    notifications.mark_read(ada.id, inbox[0].id).unwrap();
    assert_eq!(notifications.unread_count(ada.id).unwrap(), 1);
    assert_eq!(
        notifications.list(ada.id, true, Page::default()).unwrap().len(),
        1
    );

    assert_eq!(notifications.mark_all_read(ada.id).unwrap(), 1);
    assert_eq!(notifications.unread_count(ada.id).unwrap(), 0);

    assert!(matches!(
        notifications.delete(grace.id, inbox[1].id),
        Err(ServiceError::NotFound(_))
    ));
    notifications.delete(ada.id, inbox[1].id).unwrap();
    assert_eq!(
        notifications.list(ada.id, false, Page::default()).unwrap().len(),
        1
    );
}
