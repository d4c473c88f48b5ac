//! Reports, moderator actions and automatic content flags.
//!
//! # Invariants
//! - A reporter holds at most one `pending` report per target.
//! - Reports leave `pending` exactly once.
//! - `content_flags.matched_terms` is a JSON array of strings.

use super::{int_to_bool, parse_column, Page, RepoError, RepoResult};
use crate::model::moderation::{
    ContentFlag, FlagKind, ModerationAction, ModerationActionKind, ModerationStats, NewReport,
    Report, ReportId, ReportReason, ReportStatus, TargetType,
};
use crate::model::user::UserId;
use crate::model::LabelCount;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const REPORT_SELECT_SQL: &str = "SELECT
    id,
    reporter_id,
    target_type,
    target_id,
    reason,
    description,
    status,
    reviewed_by,
    resolution_note,
    resolved_at,
    created_at
FROM reports";

const FLAG_SELECT_SQL: &str = "SELECT
    id,
    target_type,
    target_id,
    flag_type,
    matched_terms,
    score,
    CASE WHEN status = 'reviewed' THEN 1 ELSE 0 END AS reviewed,
    reviewed_by,
    created_at
FROM content_flags";

/// Insert model for one moderator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModerationAction<'a> {
    pub moderator_id: UserId,
    pub target_type: TargetType,
    pub target_id: i64,
    pub action: ModerationActionKind,
    pub reason: Option<&'a str>,
    pub report_id: Option<ReportId>,
}

pub trait ModerationRepository {
    fn create_report(&self, reporter_id: UserId, report: &NewReport) -> RepoResult<Report>;
    fn has_pending_report(
        &self,
        reporter_id: UserId,
        target_type: TargetType,
        target_id: i64,
    ) -> RepoResult<bool>;
    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>>;
    fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> RepoResult<Vec<Report>>;
    /// Moves a pending report to `status`; `Conflict` when already closed.
    fn close_report(
        &self,
        id: ReportId,
        status: ReportStatus,
        reviewer_id: UserId,
        note: Option<&str>,
    ) -> RepoResult<Report>;
    fn record_action(&self, action: &NewModerationAction<'_>) -> RepoResult<ModerationAction>;
    fn list_actions(&self, page: Page) -> RepoResult<Vec<ModerationAction>>;
    /// Inserts an open flag; `None` when the same open flag already exists.
    fn create_flag(
        &self,
        target_type: TargetType,
        target_id: i64,
        flag: FlagKind,
        matched_terms: &[String],
        score: i64,
    ) -> RepoResult<Option<i64>>;
    fn list_flags(&self, open_only: bool, page: Page) -> RepoResult<Vec<ContentFlag>>;
    fn mark_flag_reviewed(&self, id: i64, reviewer_id: UserId) -> RepoResult<()>;
    /// Report/flag counters; actions are counted from `actions_since_ms`.
    fn stats(&self, actions_since_ms: i64) -> RepoResult<ModerationStats>;
}

pub struct SqliteModerationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteModerationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require_report(&self, id: ReportId) -> RepoResult<Report> {
        self.get_report(id)?
            .ok_or_else(|| RepoError::not_found("report", id))
    }
}

impl ModerationRepository for SqliteModerationRepository<'_> {
    fn create_report(&self, reporter_id: UserId, report: &NewReport) -> RepoResult<Report> {
        report.validate()?;
        self.conn.execute(
            "INSERT INTO reports (reporter_id, target_type, target_id, reason, description)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                reporter_id,
                report.target_type.as_str(),
                report.target_id,
                report.reason.as_str(),
                report.description.as_deref(),
            ],
        )?;
        self.require_report(self.conn.last_insert_rowid())
    }

    fn has_pending_report(
        &self,
        reporter_id: UserId,
        target_type: TargetType,
        target_id: i64,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM reports
                WHERE reporter_id = ?1
                  AND target_type = ?2
                  AND target_id = ?3
                  AND status = 'pending'
            );",
            params![reporter_id, target_type.as_str(), target_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REPORT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_report_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> RepoResult<Vec<Report>> {
        let mut sql = format!("{REPORT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(status) = status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut reports = Vec::new();
        while let Some(row) = rows.next()? {
            reports.push(parse_report_row(row)?);
        }
        Ok(reports)
    }

    fn close_report(
        &self,
        id: ReportId,
        status: ReportStatus,
        reviewer_id: UserId,
        note: Option<&str>,
    ) -> RepoResult<Report> {
        let changed = self.conn.execute(
            "UPDATE reports
             SET
                status = ?2,
                reviewed_by = ?3,
                resolution_note = ?4,
                resolved_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND status = 'pending';",
            params![id, status.as_str(), reviewer_id, note],
        )?;
        if changed == 0 {
            let existing = self.require_report(id)?;
            return Err(RepoError::Conflict(format!(
                "report is already {}",
                existing.status.as_str()
            )));
        }
        self.require_report(id)
    }

    fn record_action(&self, action: &NewModerationAction<'_>) -> RepoResult<ModerationAction> {
        self.conn.execute(
            "INSERT INTO moderation_actions (
                moderator_id, target_type, target_id, action_type, reason, report_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                action.moderator_id,
                action.target_type.as_str(),
                action.target_id,
                action.action.as_str(),
                action.reason,
                action.report_id,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let created_at: i64 = self.conn.query_row(
            "SELECT created_at FROM moderation_actions WHERE id = ?1;",
            [id],
            |row| row.get(0),
        )?;
        Ok(ModerationAction {
            id,
            moderator_id: Some(action.moderator_id),
            target_type: action.target_type,
            target_id: action.target_id,
            action: action.action,
            reason: action.reason.map(str::to_string),
            report_id: action.report_id,
            created_at,
        })
    }

    fn list_actions(&self, page: Page) -> RepoResult<Vec<ModerationAction>> {
        let mut sql = String::from(
            "SELECT id, moderator_id, target_type, target_id, action_type, reason, report_id, created_at
             FROM moderation_actions
             ORDER BY created_at DESC, id DESC",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut actions = Vec::new();
        while let Some(row) = rows.next()? {
            let target_text: String = row.get("target_type")?;
            let action_text: String = row.get("action_type")?;
            actions.push(ModerationAction {
                id: row.get("id")?,
                moderator_id: row.get("moderator_id")?,
                target_type: parse_column(
                    &target_text,
                    "moderation_actions.target_type",
                    TargetType::parse,
                )?,
                target_id: row.get("target_id")?,
                action: parse_column(
                    &action_text,
                    "moderation_actions.action_type",
                    ModerationActionKind::parse,
                )?,
                reason: row.get("reason")?,
                report_id: row.get("report_id")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(actions)
    }

    fn create_flag(
        &self,
        target_type: TargetType,
        target_id: i64,
        flag: FlagKind,
        matched_terms: &[String],
        score: i64,
    ) -> RepoResult<Option<i64>> {
        let terms_json = serde_json::to_string(matched_terms)
            .map_err(|err| RepoError::InvalidData(format!("matched terms: {err}")))?;
        let inserted = self.conn.execute(
            "INSERT INTO content_flags (target_type, target_id, flag_type, matched_terms, score)
             SELECT ?1, ?2, ?3, ?4, ?5
             WHERE NOT EXISTS (
                SELECT 1 FROM content_flags
                WHERE target_type = ?1 AND target_id = ?2 AND flag_type = ?3 AND status = 'open'
             );",
            params![target_type.as_str(), target_id, flag.as_str(), terms_json, score],
        )?;
        Ok((inserted > 0).then(|| self.conn.last_insert_rowid()))
    }

    fn list_flags(&self, open_only: bool, page: Page) -> RepoResult<Vec<ContentFlag>> {
        let mut sql = format!("{FLAG_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if open_only {
            sql.push_str(" AND status = 'open'");
        }
        sql.push_str(" ORDER BY score DESC, created_at ASC, id ASC");
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut flags = Vec::new();
        while let Some(row) = rows.next()? {
            flags.push(parse_flag_row(row)?);
        }
        Ok(flags)
    }

    fn mark_flag_reviewed(&self, id: i64, reviewer_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE content_flags SET status = 'reviewed', reviewed_by = ?2 WHERE id = ?1;",
            params![id, reviewer_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("content flag", id));
        }
        Ok(())
    }

    fn stats(&self, actions_since_ms: i64) -> RepoResult<ModerationStats> {
        let mut stats = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM reports WHERE status = 'pending'),
                (SELECT COUNT(*) FROM reports WHERE status = 'resolved'),
                (SELECT COUNT(*) FROM reports WHERE status = 'dismissed'),
                (SELECT COUNT(*) FROM content_flags WHERE status = 'open'),
                (SELECT COUNT(*) FROM moderation_actions WHERE created_at >= ?1);",
            [actions_since_ms],
            |row| {
                Ok(ModerationStats {
                    pending_reports: row.get(0)?,
                    resolved_reports: row.get(1)?,
                    dismissed_reports: row.get(2)?,
                    reports_by_reason: Vec::new(),
                    open_flags: row.get(3)?,
                    actions_last_30_days: row.get(4)?,
                })
            },
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT reason, COUNT(*) AS total
             FROM reports
             GROUP BY reason
             ORDER BY total DESC, reason ASC;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            stats.reports_by_reason.push(LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            });
        }
        Ok(stats)
    }
}

fn parse_report_row(row: &Row<'_>) -> RepoResult<Report> {
    let target_text: String = row.get("target_type")?;
    let reason_text: String = row.get("reason")?;
    let status_text: String = row.get("status")?;
    Ok(Report {
        id: row.get("id")?,
        reporter_id: row.get("reporter_id")?,
        target_type: parse_column(&target_text, "reports.target_type", TargetType::parse)?,
        target_id: row.get("target_id")?,
        reason: parse_column(&reason_text, "reports.reason", ReportReason::parse)?,
        description: row.get("description")?,
        status: parse_column(&status_text, "reports.status", ReportStatus::parse)?,
        reviewed_by: row.get("reviewed_by")?,
        resolution_note: row.get("resolution_note")?,
        resolved_at: row.get("resolved_at")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_flag_row(row: &Row<'_>) -> RepoResult<ContentFlag> {
    let target_text: String = row.get("target_type")?;
    let flag_text: String = row.get("flag_type")?;
    let terms_json: Option<String> = row.get("matched_terms")?;
    let matched_terms = match terms_json {
        Some(json) => serde_json::from_str(&json).map_err(|err| {
            RepoError::InvalidData(format!("invalid content_flags.matched_terms: {err}"))
        })?,
        None => Vec::new(),
    };
    Ok(ContentFlag {
        id: row.get("id")?,
        target_type: parse_column(&target_text, "content_flags.target_type", TargetType::parse)?,
        target_id: row.get("target_id")?,
        flag: parse_column(&flag_text, "content_flags.flag_type", FlagKind::parse)?,
        matched_terms,
        score: row.get("score")?,
        reviewed: int_to_bool(row.get("reviewed")?, "content_flags.status")?,
        reviewed_by: row.get("reviewed_by")?,
        created_at: row.get("created_at")?,
    })
}
