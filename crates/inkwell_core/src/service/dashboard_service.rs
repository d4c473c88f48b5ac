//! Author dashboard and bulk article operations.
//!
//! # Invariants
//! - Bulk operations process each id independently, without a shared
//!   transaction; one failure never stops the rest.
//! - Authorization is checked per id.

use super::article_service::ArticleService;
use super::{ServiceError, ServiceResult};
use crate::model::analytics::{AuthorDashboard, EngagementTotals};
use crate::model::article::ArticleId;
use crate::model::user::User;
use crate::repo::analytics_repo::{AnalyticsRepository, SqliteAnalyticsRepository};
use crate::repo::follow_repo::{FollowRepository, SqliteFollowRepository};
use log::info;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const MAX_BULK_IDS: usize = 100;
pub const RECENT_ARTICLES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Publish,
    Unpublish,
    Archive,
    Delete,
}

impl BulkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Archive => "archive",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: ArticleId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub processed: usize,
    pub succeeded: Vec<ArticleId>,
    pub failed: Vec<BulkFailure>,
}

pub struct DashboardService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DashboardService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn author_dashboard(&self, actor: &User) -> ServiceResult<AuthorDashboard> {
        let analytics = SqliteAnalyticsRepository::new(self.conn);
        let all = analytics.author_article_stats(actor.id, None)?;
        Ok(AuthorDashboard {
            articles_by_status: analytics.status_counts(actor.id)?,
            totals: EngagementTotals::sum(&all),
            followers: SqliteFollowRepository::new(self.conn).follower_count(actor.id)?,
            recent_articles: all.into_iter().take(RECENT_ARTICLES as usize).collect(),
        })
    }

    pub fn bulk_operations(
        &self,
        actor: &User,
        action: BulkAction,
        ids: &[ArticleId],
    ) -> ServiceResult<BulkOutcome> {
        if ids.is_empty() {
            return Err(ServiceError::invalid("ids must not be empty"));
        }
        if ids.len() > MAX_BULK_IDS {
            return Err(ServiceError::invalid(format!(
                "at most {MAX_BULK_IDS} ids per request"
            )));
        }

        let articles = ArticleService::new(self.conn);
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            let result = match action {
                BulkAction::Publish => articles.publish(actor, id).map(|_| ()),
                BulkAction::Unpublish => articles.unpublish(actor, id).map(|_| ()),
                BulkAction::Archive => articles.archive(actor, id).map(|_| ()),
                BulkAction::Delete => articles.delete(actor, id),
            };
            outcome.processed += 1;
            match result {
                Ok(()) => outcome.succeeded.push(id),
                Err(err) => outcome.failed.push(BulkFailure {
                    id,
                    error: err.to_string(),
                }),
            }
        }
        info!(
            "event=bulk_operation module=dashboard action={} processed={} succeeded={} failed={}",
            action.as_str(),
            outcome.processed,
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }
}
