//! Clap use-cases.
//!
//! # Invariants
//! - Authors cannot clap their own articles.
//! - Only published articles accept claps.

use super::article_service::ArticleService;
use super::notification_service::notify;
use super::{ServiceError, ServiceResult};
use crate::model::article::ArticleId;
use crate::model::engagement::{ClapOutcome, ClapSummary};
use crate::model::notification::NotificationKind;
use crate::model::user::User;
use crate::repo::engagement_repo::{EngagementRepository, SqliteEngagementRepository};
use log::info;
use rusqlite::Connection;

pub struct ClapService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ClapService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn clap(&self, actor: &User, article_id: ArticleId, count: i64) -> ServiceResult<ClapOutcome> {
        let article = ArticleService::new(self.conn).require_published(article_id)?;
        if article.author_id == actor.id {
            return Err(ServiceError::forbidden("you cannot clap for your own article"));
        }

        let outcome = SqliteEngagementRepository::new(self.conn).add_claps(article_id, actor.id, count)?;
        if outcome.added > 0 {
            notify(
                self.conn,
                article.author_id,
                Some(actor.id),
                NotificationKind::Clap,
                format!(
                    "{} clapped {} times for \"{}\"",
                    actor.username, outcome.added, article.title
                ),
                Some(article_id),
            )?;
        }
        info!(
            "event=clap module=claps status=ok article_id={} added={} user_total={}",
            article_id, outcome.added, outcome.user_total
        );
        Ok(outcome)
    }

    pub fn summary(&self, article_id: ArticleId) -> ServiceResult<ClapSummary> {
        ArticleService::new(self.conn).require_published(article_id)?;
        Ok(SqliteEngagementRepository::new(self.conn).clap_summary(article_id)?)
    }
}
