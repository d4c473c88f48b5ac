//! Publication submission (review workflow) persistence.
//!
//! # Invariants
//! - At most one `pending` submission per (article, publication); enforced by
//!   a partial unique index.
//! - Only `pending` rows transition; `review` is a compare-and-set.

use super::{map_constraint, parse_column, RepoError, RepoResult};
use crate::model::article::ArticleId;
use crate::model::publication::{PublicationId, Submission, SubmissionId, SubmissionStatus};
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SUBMISSION_SELECT_SQL: &str = "SELECT
    s.id,
    s.article_id,
    a.title AS article_title,
    s.publication_id,
    s.submitted_by,
    s.status,
    s.reviewer_id,
    s.feedback,
    s.submitted_at,
    s.reviewed_at
FROM article_submissions s
INNER JOIN articles a ON a.id = s.article_id";

pub trait SubmissionRepository {
    fn create_submission(
        &self,
        article_id: ArticleId,
        publication_id: PublicationId,
        submitted_by: UserId,
    ) -> RepoResult<Submission>;
    fn get_submission(&self, id: SubmissionId) -> RepoResult<Option<Submission>>;
    /// Moves a pending submission to `status`; `Conflict` when not pending.
    fn review(
        &self,
        id: SubmissionId,
        reviewer_id: UserId,
        status: SubmissionStatus,
        feedback: Option<&str>,
    ) -> RepoResult<Submission>;
    /// Submissions for a publication, oldest first, optionally by status.
    fn list_for_publication(
        &self,
        publication_id: PublicationId,
        status: Option<SubmissionStatus>,
    ) -> RepoResult<Vec<Submission>>;
    /// A user's submissions, newest first.
    fn list_for_submitter(&self, user_id: UserId) -> RepoResult<Vec<Submission>>;
}

pub struct SqliteSubmissionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubmissionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require(&self, id: SubmissionId) -> RepoResult<Submission> {
        self.get_submission(id)?
            .ok_or_else(|| RepoError::not_found("submission", id))
    }

    fn query(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Submission>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut submissions = Vec::new();
        while let Some(row) = rows.next()? {
            submissions.push(parse_submission_row(row)?);
        }
        Ok(submissions)
    }
}

impl SubmissionRepository for SqliteSubmissionRepository<'_> {
    fn create_submission(
        &self,
        article_id: ArticleId,
        publication_id: PublicationId,
        submitted_by: UserId,
    ) -> RepoResult<Submission> {
        self.conn
            .execute(
                "INSERT INTO article_submissions (article_id, publication_id, submitted_by)
                 VALUES (?1, ?2, ?3);",
                params![article_id, publication_id, submitted_by],
            )
            .map_err(|err| {
                map_constraint(err, "article already has a pending submission here")
            })?;
        self.require(self.conn.last_insert_rowid())
    }

    fn get_submission(&self, id: SubmissionId) -> RepoResult<Option<Submission>> {
        let sql = format!("{SUBMISSION_SELECT_SQL} WHERE s.id = ?;");
        Ok(self.query(&sql, vec![Value::Integer(id)])?.into_iter().next())
    }

    fn review(
        &self,
        id: SubmissionId,
        reviewer_id: UserId,
        status: SubmissionStatus,
        feedback: Option<&str>,
    ) -> RepoResult<Submission> {
        let changed = self.conn.execute(
            "UPDATE article_submissions
             SET
                status = ?2,
                reviewer_id = ?3,
                feedback = ?4,
                reviewed_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND status = 'pending';",
            params![id, status.as_str(), reviewer_id, feedback],
        )?;
        if changed == 0 {
            let existing = self.require(id)?;
            return Err(RepoError::Conflict(format!(
                "submission is already {}",
                existing.status.as_str()
            )));
        }
        self.require(id)
    }

    fn list_for_publication(
        &self,
        publication_id: PublicationId,
        status: Option<SubmissionStatus>,
    ) -> RepoResult<Vec<Submission>> {
        let mut sql = format!("{SUBMISSION_SELECT_SQL} WHERE s.publication_id = ?");
        let mut bind_values = vec![Value::Integer(publication_id)];
        if let Some(status) = status {
            sql.push_str(" AND s.status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY s.submitted_at ASC, s.id ASC;");
        self.query(&sql, bind_values)
    }

    fn list_for_submitter(&self, user_id: UserId) -> RepoResult<Vec<Submission>> {
        let sql = format!(
            "{SUBMISSION_SELECT_SQL}
             WHERE s.submitted_by = ?
             ORDER BY s.submitted_at DESC, s.id DESC;"
        );
        self.query(&sql, vec![Value::Integer(user_id)])
    }
}

fn parse_submission_row(row: &Row<'_>) -> RepoResult<Submission> {
    let status_text: String = row.get("status")?;
    Ok(Submission {
        id: row.get("id")?,
        article_id: row.get("article_id")?,
        article_title: row.get("article_title")?,
        publication_id: row.get("publication_id")?,
        submitted_by: row.get("submitted_by")?,
        status: parse_column(
            &status_text,
            "article_submissions.status",
            SubmissionStatus::parse,
        )?,
        reviewer_id: row.get("reviewer_id")?,
        feedback: row.get("feedback")?,
        submitted_at: row.get("submitted_at")?,
        reviewed_at: row.get("reviewed_at")?,
    })
}
