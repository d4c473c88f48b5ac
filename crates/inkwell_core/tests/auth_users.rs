mod common;

use common::{auth, count_rows, published, register, setup, PASSWORD};
use inkwell_core::model::user::ProfileUpdate;
use inkwell_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use inkwell_core::repo::Page;
use inkwell_core::service::auth_service::{LoginInput, RegisterInput};
use inkwell_core::service::follow_service::FollowService;
use inkwell_core::service::user_service::UserService;
use inkwell_core::ServiceError;

fn login(login: &str, password: &str) -> LoginInput {
    LoginInput {
        login: login.to_string(),
        password: password.to_string(),
    }
}

#[test]
fn register_issues_a_working_session() {
    let conn = setup();
    let session = auth(&conn)
        .register(
            &RegisterInput {
                username: "ada".to_string(),
                email: "Ada@Example.com".to_string(),
                password: PASSWORD.to_string(),
                name: Some("Ada Lovelace".to_string()),
            },
            None,
        )
        .unwrap();

    assert_eq!(session.user.email, "ada@example.com");
    let user = auth(&conn).authenticate(&session.token).unwrap();
    assert_eq!(user.id, session.user.id);
    assert_eq!(user.name.as_deref(), Some("Ada Lovelace"));
}

#[test]
fn duplicate_username_or_email_conflicts() {
    let conn = setup();
    register(&conn, "ada");

    let err = auth(&conn)
        .register(
            &RegisterInput {
                username: "ADA".to_string(),
                email: "other@example.com".to_string(),
                password: PASSWORD.to_string(),
                name: None,
            },
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)), "{err}");

    let err = auth(&conn)
        .register(
            &RegisterInput {
                username: "grace".to_string(),
                email: "ada@example.com".to_string(),
                password: PASSWORD.to_string(),
                name: None,
            },
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)), "{err}");
}

#[test]
fn short_password_is_rejected() {
    let conn = setup();
    let err = auth(&conn)
        .register(
            &RegisterInput {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "short".to_string(),
                name: None,
            },
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn login_accepts_username_or_email() {
    let conn = setup();
    register(&conn, "ada");

    assert!(auth(&conn).login(&login("ada", PASSWORD), None).is_ok());
    assert!(auth(&conn)
        .login(&login("ada@example.com", PASSWORD), None)
        .is_ok());
    assert_eq!(
        count_rows(&conn, "SELECT COUNT(*) FROM security_events WHERE event_type = 'login'"),
        2
    );
}

#[test]
fn failed_login_records_a_warning_event() {
    let conn = setup();
    register(&conn, "ada");

    let err = auth(&conn)
        .login(&login("ada", "wrong password"), Some("10.0.0.9"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    let (severity, ip): (String, String) = conn
        .query_row(
            "SELECT severity, ip_address FROM security_events WHERE event_type = 'failed_login'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(severity, "warning");
    assert_eq!(ip, "10.0.0.9");
}

#[test]
fn suspended_user_cannot_login_or_authenticate() {
    let conn = setup();
    let session = auth(&conn)
        .register(
            &RegisterInput {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password: PASSWORD.to_string(),
                name: None,
            },
            None,
        )
        .unwrap();
    SqliteUserRepository::new(&conn)
        .set_suspended(session.user.id, true)
        .unwrap();

    let err = auth(&conn).login(&login("ada", PASSWORD), None).unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let err = auth(&conn).authenticate(&session.token).unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn logout_and_unknown_tokens_are_unauthorized() {
    let conn = setup();
    register(&conn, "ada");
    let session = auth(&conn).login(&login("ada", PASSWORD), None).unwrap();

    auth(&conn).logout(&session.token).unwrap();
    let err = auth(&conn).authenticate(&session.token).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    assert!(auth(&conn).authenticate("not-a-token").is_err());
}

#[test]
fn expired_sessions_are_rejected_and_purged() {
    let conn = setup();
    register(&conn, "ada");
    let session = auth(&conn).login(&login("ada", PASSWORD), None).unwrap();
    conn.execute(
        "UPDATE auth_sessions SET expires_at = 1 WHERE token = ?1",
        [&session.token],
    )
    .unwrap();

    assert!(matches!(
        auth(&conn).authenticate(&session.token),
        Err(ServiceError::Unauthorized(_))
    ));
    assert_eq!(auth(&conn).purge_expired_sessions().unwrap(), 1);
}

#[test]
fn login_sweeps_expired_sessions() {
    let conn = setup();
    register(&conn, "ada");
    auth(&conn).login(&login("ada", PASSWORD), None).unwrap();
    conn.execute("UPDATE auth_sessions SET expires_at = 1", []).unwrap();

    let fresh = auth(&conn).login(&login("ada", PASSWORD), None).unwrap();
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM auth_sessions"), 1);
    assert!(auth(&conn).authenticate(&fresh.token).is_ok());
}

#[test]
fn change_password_revokes_other_sessions() {
    let conn = setup();
    let user = register(&conn, "ada");
    let keep = auth(&conn).login(&login("ada", PASSWORD), None).unwrap();
    let other = auth(&conn).login(&login("ada", PASSWORD), None).unwrap();

    let err = auth(&conn)
        .change_password(user.id, "wrong password", "brand new secret", None)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    auth(&conn)
        .change_password(user.id, PASSWORD, "brand new secret", Some(&keep.token))
        .unwrap();
    assert!(auth(&conn).authenticate(&keep.token).is_ok());
    assert!(auth(&conn).authenticate(&other.token).is_err());
    assert!(auth(&conn).login(&login("ada", PASSWORD), None).is_err());
    assert!(auth(&conn)
        .login(&login("ada", "brand new secret"), None)
        .is_ok());
}

#[test]
fn profile_reports_stats_and_follow_state() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    published(&conn, &ada, "Engines", "Analytical engine notes", &[]);
    FollowService::new(&conn).follow(&grace, ada.id).unwrap();

    let users = UserService::new(&conn);
    let profile = users.profile_by_username(Some(&grace), "ada").unwrap();
    assert_eq!(profile.user.id, ada.id);
    assert_eq!(profile.stats.followers, 1);
    assert_eq!(profile.stats.published_articles, 1);
    assert_eq!(profile.is_following, Some(true));

    let anonymous = users.profile(None, ada.id).unwrap();
    assert_eq!(anonymous.is_following, None);
    assert!(matches!(
        users.profile(None, 999),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn update_profile_validates_bio_length() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let users = UserService::new(&conn);

    let updated = users
        .update_profile(
            &ada,
            &ProfileUpdate {
                name: Some("Ada".to_string()),
                bio: Some("Mathematician".to_string()),
                avatar_url: None,
            },
        )
        .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("Mathematician"));

    let err = users
        .update_profile(
            &ada,
            &ProfileUpdate {
                name: None,
                bio: Some("x".repeat(501)),
                avatar_url: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn follow_is_idempotent_and_notifies_once() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let follows = FollowService::new(&conn);

    let status = follows.follow(&grace, ada.id).unwrap();
    assert!(status.following);
    assert_eq!(status.followers, 1);
    let status = follows.follow(&grace, ada.id).unwrap();
    assert_eq!(status.followers, 1);
    assert_eq!(
        count_rows(&conn, "SELECT COUNT(*) FROM notifications WHERE type = 'follow'"),
        1
    );

    let users = UserService::new(&conn);
    assert_eq!(users.followers(ada.id, Page::default()).unwrap()[0].id, grace.id);
    assert_eq!(users.following(grace.id, Page::default()).unwrap()[0].id, ada.id);

    let status = follows.unfollow(&grace, ada.id).unwrap();
    assert!(!status.following);
    assert_eq!(status.followers, 0);
    assert!(follows.unfollow(&grace, ada.id).is_ok());
}

#[test]
fn self_follow_and_unknown_target_are_rejected() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let follows = FollowService::new(&conn);

    assert!(matches!(
        follows.follow(&ada, ada.id),
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        follows.follow(&ada, 404),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn user_search_matches_username_substrings() {
    let conn = setup();
    register(&conn, "ada_lovelace");
    register(&conn, "grace");

    let hits = UserService::new(&conn).search("love", None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].username, "ada_lovelace");
}
