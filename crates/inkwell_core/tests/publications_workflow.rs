mod common;

use common::{draft, published, register, register_with_role, setup};
use inkwell_core::model::article::ArticleStatus;
use inkwell_core::model::notification::NotificationKind;
use inkwell_core::model::publication::{MemberRole, Publication, PublicationInput, SubmissionStatus};
use inkwell_core::model::user::{User, UserRole};
use inkwell_core::repo::Page;
use inkwell_core::service::article_service::ArticleService;
use inkwell_core::service::notification_service::NotificationService;
use inkwell_core::service::publication_service::PublicationService;
use inkwell_core::service::workflow_service::WorkflowService;
use inkwell_core::ServiceError;
use rusqlite::Connection;

#[test]
fn creator_becomes_owner() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let publication = create_publication(&conn, &ada, "Systems Weekly");

    assert_eq!(publication.slug, "systems-weekly");
    assert_eq!(publication.owner_id, ada.id);
    assert_eq!(publication.member_count, 1);
    let members = PublicationService::new(&conn).members(publication.id).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, MemberRole::Owner);
}

#[test]
fn publication_names_are_unique_ignoring_case() {
    let conn = setup();
    let ada = register(&conn, "ada");
    create_publication(&conn, &ada, "Systems Weekly");

    let duplicate = PublicationService::new(&conn).create(
        &ada,
        &PublicationInput {
            name: "systems weekly".to_string(),
            ..PublicationInput::default()
        },
    );
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
}

#[test]
fn only_managers_edit_the_publication() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let service = PublicationService::new(&conn);
    let publication = create_publication(&conn, &ada, "Systems Weekly");
    service
        .add_member(&ada, publication.id, grace.id, MemberRole::Editor)
        .unwrap();

    let input = PublicationInput {
        name: "Systems Monthly".to_string(),
        description: Some("Longer reads".to_string()),
        ..PublicationInput::default()
    };
    assert!(matches!(
        service.update(&grace, publication.id, &input),
        Err(ServiceError::Forbidden(_))
    ));
    let updated = service.update(&ada, publication.id, &input).unwrap();
    assert_eq!(updated.name, "Systems Monthly");
    assert_eq!(updated.description.as_deref(), Some("Longer reads"));

    assert!(matches!(
        service.delete(&grace, publication.id),
        Err(ServiceError::Forbidden(_))
    ));
    service.delete(&ada, publication.id).unwrap();
    assert!(matches!(
        service.get(publication.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn member_roles_follow_the_hierarchy() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let linus = register(&conn, "linus");
    let ken = register(&conn, "ken");
    let service = PublicationService::new(&conn);
    let publication = create_publication(&conn, &ada, "Systems Weekly");

    service
        .add_member(&ada, publication.id, grace.id, MemberRole::Admin)
        .unwrap();
    let invites = NotificationService::new(&conn)
        .list(grace.id, false, Page::default())
        .unwrap();
    assert_eq!(invites[0].kind, NotificationKind::PublicationInvite);

    assert!(matches!(
        service.add_member(&grace, publication.id, linus.id, MemberRole::Admin),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.add_member(&ada, publication.id, linus.id, MemberRole::Owner),
        Err(ServiceError::Forbidden(_))
    ));
    let members = service
        .add_member(&grace, publication.id, linus.id, MemberRole::Writer)
        .unwrap();
    assert_eq!(members.len(), 3);
    assert!(matches!(
        service.add_member(&grace, publication.id, linus.id, MemberRole::Editor),
        Err(ServiceError::Conflict(_))
    ));

    assert!(matches!(
        service.add_member(&linus, publication.id, ken.id, MemberRole::Writer),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.change_role(&grace, publication.id, ada.id, MemberRole::Writer),
        Err(ServiceError::Forbidden(_))
    ));

    let promoted = service
        .change_role(&grace, publication.id, linus.id, MemberRole::Editor)
        .unwrap();
    let linus_member = promoted
        .iter()
        .find(|member| member.user_id == linus.id)
        .unwrap();
    assert_eq!(linus_member.role, MemberRole::Editor);
}

#[test]
fn owner_stays_and_members_may_leave() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let linus = register(&conn, "linus");
    let service = PublicationService::new(&conn);
    let publication = create_publication(&conn, &ada, "Systems Weekly");
    service
        .add_member(&ada, publication.id, grace.id, MemberRole::Admin)
        .unwrap();
    service
        .add_member(&ada, publication.id, linus.id, MemberRole::Writer)
        .unwrap();

    assert!(matches!(
        service.remove_member(&grace, publication.id, ada.id),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.remove_member(&linus, publication.id, grace.id),
        Err(ServiceError::Forbidden(_))
    ));

    service.remove_member(&linus, publication.id, linus.id).unwrap();
    service.remove_member(&ada, publication.id, grace.id).unwrap();
    assert_eq!(service.members(publication.id).unwrap().len(), 1);
}

#[test]
fn site_admins_manage_any_publication() {
    let conn = setup();
    let ada = register(&conn, "ada");
    let grace = register(&conn, "grace");
    let admin = register_with_role(&conn, "site_admin", UserRole::Admin);
    let service = PublicationService::new(&conn);
    let publication = create_publication(&conn, &ada, "Systems Weekly");

    service
        .add_member(&admin, publication.id, grace.id, MemberRole::Admin)
        .unwrap();
    service.delete(&admin, publication.id).unwrap();
}

#[test]
fn submission_approval_publishes_under_the_publication() {
    let conn = setup();
    let owner = register(&conn, "owner");
    let editor = register(&conn, "editor");
    let writer = register(&conn, "writer");
    let publication = staffed_publication(&conn, &owner, &editor, &writer);
    let article = draft(&conn, &writer, "Pitch", "A considered essay");
    let workflow = WorkflowService::new(&conn);

    let submission = workflow.submit(&writer, article.id, publication.id).unwrap();
    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(submission.article_title, "Pitch");

    let notifications = NotificationService::new(&conn);
    for reviewer in [&owner, &editor] {
        let inbox = notifications.list(reviewer.id, false, Page::default()).unwrap();
        assert!(inbox
            .iter()
            .any(|notification| notification.kind == NotificationKind::SubmissionReceived));
    }

    assert!(matches!(
        workflow.submit(&writer, article.id, publication.id),
        Err(ServiceError::Conflict(_))
    ));
    assert_eq!(workflow.review_queue(&editor, publication.id).unwrap().len(), 1);
    assert!(matches!(
        workflow.review_queue(&writer, publication.id),
        Err(ServiceError::Forbidden(_))
    ));

    let approved = workflow
        .approve(&editor, submission.id, Some("Lovely"))
        .unwrap();
    assert_eq!(approved.status, SubmissionStatus::Approved);
    assert_eq!(approved.reviewer_id, Some(editor.id));
    assert_eq!(approved.feedback.as_deref(), Some("Lovely"));
    assert!(approved.reviewed_at.is_some());

    let article = ArticleService::new(&conn)
        .get(Some(&writer), article.id)
        .unwrap()
        .article;
    assert_eq!(article.status, ArticleStatus::Published);
    assert_eq!(article.publication_id, Some(publication.id));
    assert!(article.published_at.is_some());

    let listed = PublicationService::new(&conn)
        .articles(publication.id, Page::default())
        .unwrap();
    assert_eq!(listed.len(), 1);

    let writer_inbox = notifications.list(writer.id, false, Page::default()).unwrap();
    assert!(writer_inbox
        .iter()
        .any(|notification| notification.kind == NotificationKind::SubmissionApproved));
}

#[test]
fn reviewed_submissions_cannot_be_reviewed_again() {
    let conn = setup();
    let owner = register(&conn, "owner");
    let editor = register(&conn, "editor");
    let writer = register(&conn, "writer");
    let publication = staffed_publication(&conn, &owner, &editor, &writer);
    let article = draft(&conn, &writer, "Pitch", "text");
    let workflow = WorkflowService::new(&conn);
    let submission = workflow.submit(&writer, article.id, publication.id).unwrap();

    let rejected = workflow.reject(&editor, submission.id, None).unwrap();
    assert_eq!(rejected.status, SubmissionStatus::Rejected);
    assert!(matches!(
        workflow.approve(&owner, submission.id, None),
        Err(ServiceError::Conflict(_))
    ));

    let resubmitted = workflow.submit(&writer, article.id, publication.id).unwrap();
    assert!(matches!(
        workflow.request_revision(&editor, resubmitted.id, "  "),
        Err(ServiceError::InvalidInput(_))
    ));
    let revised = workflow
        .request_revision(&editor, resubmitted.id, "Tighten the intro")
        .unwrap();
    assert_eq!(revised.status, SubmissionStatus::RevisionRequested);

    let mine = workflow.my_submissions(&writer).unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(
        ArticleService::new(&conn)
            .get(Some(&writer), article.id)
            .unwrap()
            .article
            .status,
        ArticleStatus::Draft
    );
}

#[test]
fn only_members_submit_their_own_articles() {
    let conn = setup();
    let owner = register(&conn, "owner");
    let editor = register(&conn, "editor");
    let writer = register(&conn, "writer");
    let outsider = register(&conn, "outsider");
    let publication = staffed_publication(&conn, &owner, &editor, &writer);
    let workflow = WorkflowService::new(&conn);

    let outsider_article = published(&conn, &outsider, "Outside", "text", &[]);
    assert!(matches!(
        workflow.submit(&outsider, outsider_article.id, publication.id),
        Err(ServiceError::Forbidden(_))
    ));

    let writer_article = draft(&conn, &writer, "Inside", "text");
    assert!(matches!(
        workflow.submit(&editor, writer_article.id, publication.id),
        Err(ServiceError::Forbidden(_))
    ));

    ArticleService::new(&conn)
        .archive(&writer, writer_article.id)
        .unwrap();
    assert!(matches!(
        workflow.submit(&writer, writer_article.id, publication.id),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn submissions_are_visible_to_submitter_and_reviewers_only() {
    let conn = setup();
    let owner = register(&conn, "owner");
    let editor = register(&conn, "editor");
    let writer = register(&conn, "writer");
    let stranger = register(&conn, "stranger");
    let publication = staffed_publication(&conn, &owner, &editor, &writer);
    let article = draft(&conn, &writer, "Pitch", "text");
    let workflow = WorkflowService::new(&conn);
    let submission = workflow.submit(&writer, article.id, publication.id).unwrap();

    assert!(workflow.get(&writer, submission.id).is_ok());
    assert!(workflow.get(&editor, submission.id).is_ok());
    assert!(matches!(
        workflow.get(&stranger, submission.id),
        Err(ServiceError::Forbidden(_))
    ));
}

fn create_publication(conn: &Connection, owner: &User, name: &str) -> Publication {
    PublicationService::new(conn)
        .create(
            owner,
            &PublicationInput {
                name: name.to_string(),
                ..PublicationInput::default()
            },
        )
        .unwrap()
}

fn staffed_publication(
    conn: &Connection,
    owner: &User,
    editor: &User,
    writer: &User,
) -> Publication {
    let publication = create_publication(conn, owner, "The Review");
    let service = PublicationService::new(conn);
    service
        .add_member(owner, publication.id, editor.id, MemberRole::Editor)
        .unwrap();
    service
        .add_member(owner, publication.id, writer.id, MemberRole::Writer)
        .unwrap();
    publication
}
