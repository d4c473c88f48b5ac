//! Publication and membership use-cases.
//!
//! # Invariants
//! - The creator is the single `owner`; the owner role is never assigned.
//! - Only the owner grants or revokes `admin`.
//! - The owner can never be removed.

use super::notification_service::notify;
use super::{ServiceError, ServiceResult};
use crate::model::article::{slug_with_suffix, slugify, Article, ArticleStatus};
use crate::model::notification::NotificationKind;
use crate::model::publication::{
    MemberRole, Publication, PublicationId, PublicationInput, PublicationMember,
};
use crate::model::user::{User, UserId};
use crate::repo::article_repo::{ArticleListQuery, ArticleRepository, SqliteArticleRepository};
use crate::repo::publication_repo::{PublicationRepository, SqlitePublicationRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::Page;
use log::info;
use rusqlite::Connection;

const MAX_SLUG_ATTEMPTS: u32 = 1000;

pub struct PublicationService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> PublicationService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, owner: &User, input: &PublicationInput) -> ServiceResult<Publication> {
        input.validate()?;
        let publications = SqlitePublicationRepository::new(self.conn);
        let slug = self.unique_slug(&publications, &input.name)?;
        let publication = publications.create_publication(owner.id, input, &slug)?;
        info!(
            "event=publication_create module=publications status=ok publication_id={} owner_id={}",
            publication.id, owner.id
        );
        Ok(publication)
    }

    pub fn update(
        &self,
        actor: &User,
        id: PublicationId,
        input: &PublicationInput,
    ) -> ServiceResult<Publication> {
        self.require(id)?;
        let role = self.role_of(id, actor)?;
        if !role.is_some_and(MemberRole::can_edit_publication) {
            return Err(ServiceError::forbidden(
                "only the owner or a publication admin can edit it",
            ));
        }
        Ok(SqlitePublicationRepository::new(self.conn).update_publication(id, input)?)
    }

    pub fn delete(&self, actor: &User, id: PublicationId) -> ServiceResult<()> {
        let publication = self.require(id)?;
        if publication.owner_id != actor.id && !actor.is_admin() {
            return Err(ServiceError::forbidden("only the owner can delete a publication"));
        }
        SqlitePublicationRepository::new(self.conn).delete_publication(id)?;
        info!("event=publication_delete module=publications status=ok publication_id={id}");
        Ok(())
    }

    pub fn get(&self, id: PublicationId) -> ServiceResult<Publication> {
        self.require(id)
    }

    pub fn list(&self, page: Page) -> ServiceResult<Vec<Publication>> {
        Ok(SqlitePublicationRepository::new(self.conn).list_publications(page)?)
    }

    pub fn members(&self, id: PublicationId) -> ServiceResult<Vec<PublicationMember>> {
        self.require(id)?;
        Ok(SqlitePublicationRepository::new(self.conn).list_members(id)?)
    }

    pub fn add_member(
        &self,
        actor: &User,
        id: PublicationId,
        user_id: UserId,
        role: MemberRole,
    ) -> ServiceResult<Vec<PublicationMember>> {
        let publication = self.require(id)?;
        let actor_role = self.require_manager(id, actor)?;
        check_assignable(actor_role, role)?;
        SqliteUserRepository::new(self.conn)
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::not_found("user", user_id))?;

        let publications = SqlitePublicationRepository::new(self.conn);
        publications.add_member(id, user_id, role)?;
        notify(
            self.conn,
            user_id,
            Some(actor.id),
            NotificationKind::PublicationInvite,
            format!(
                "{} added you to \"{}\" as {}",
                actor.username,
                publication.name,
                role.as_str()
            ),
            Some(id),
        )?;
        info!(
            "event=member_add module=publications status=ok publication_id={} user_id={} role={}",
            id,
            user_id,
            role.as_str()
        );
        Ok(publications.list_members(id)?)
    }

    pub fn change_role(
        &self,
        actor: &User,
        id: PublicationId,
        user_id: UserId,
        role: MemberRole,
    ) -> ServiceResult<Vec<PublicationMember>> {
        self.require(id)?;
        let actor_role = self.require_manager(id, actor)?;
        let publications = SqlitePublicationRepository::new(self.conn);
        let current = publications
            .member_role(id, user_id)?
            .ok_or_else(|| ServiceError::not_found("publication member", user_id))?;
        if current == MemberRole::Owner {
            return Err(ServiceError::forbidden("the owner's role cannot change"));
        }
        check_assignable(actor_role, role)?;
        if current == MemberRole::Admin && actor_role != MemberRole::Owner {
            return Err(ServiceError::forbidden("only the owner can revoke admin"));
        }
        publications.set_member_role(id, user_id, role)?;
        Ok(publications.list_members(id)?)
    }

    /// Managers remove others; any non-owner member may leave.
    pub fn remove_member(&self, actor: &User, id: PublicationId, user_id: UserId) -> ServiceResult<()> {
        self.require(id)?;
        let publications = SqlitePublicationRepository::new(self.conn);
        let target = publications
            .member_role(id, user_id)?
            .ok_or_else(|| ServiceError::not_found("publication member", user_id))?;
        if target == MemberRole::Owner {
            return Err(ServiceError::forbidden("the owner cannot be removed"));
        }
        if actor.id != user_id {
            let actor_role = self.require_manager(id, actor)?;
            if target == MemberRole::Admin && actor_role != MemberRole::Owner {
                return Err(ServiceError::forbidden("only the owner can remove an admin"));
            }
        }
        publications.remove_member(id, user_id)?;
        info!(
            "event=member_remove module=publications status=ok publication_id={id} user_id={user_id}"
        );
        Ok(())
    }

    pub fn articles(&self, id: PublicationId, page: Page) -> ServiceResult<Vec<Article>> {
        self.require(id)?;
        Ok(SqliteArticleRepository::new(self.conn).list_articles(&ArticleListQuery {
            publication_id: Some(id),
            status: Some(ArticleStatus::Published),
            page,
            ..ArticleListQuery::default()
        })?)
    }

    fn require(&self, id: PublicationId) -> ServiceResult<Publication> {
        SqlitePublicationRepository::new(self.conn)
            .get_publication(id)?
            .ok_or_else(|| ServiceError::not_found("publication", id))
    }

    /// Member role of `actor`; site admins act as publication owners.
    fn role_of(&self, id: PublicationId, actor: &User) -> ServiceResult<Option<MemberRole>> {
        if actor.is_admin() {
            return Ok(Some(MemberRole::Owner));
        }
        Ok(SqlitePublicationRepository::new(self.conn).member_role(id, actor.id)?)
    }

    fn require_manager(&self, id: PublicationId, actor: &User) -> ServiceResult<MemberRole> {
        match self.role_of(id, actor)? {
            Some(role) if role.can_manage_members() => Ok(role),
            _ => Err(ServiceError::forbidden(
                "only the owner or a publication admin can manage members",
            )),
        }
    }

    fn unique_slug(
        &self,
        publications: &SqlitePublicationRepository<'_>,
        name: &str,
    ) -> ServiceResult<String> {
        let base = slugify(name);
        if !publications.slug_exists(&base)? {
            return Ok(base);
        }
        for n in 2..=MAX_SLUG_ATTEMPTS {
            let candidate = slug_with_suffix(&base, n);
            if !publications.slug_exists(&candidate)? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Conflict(format!("no free slug for `{base}`")))
    }
}

fn check_assignable(actor_role: MemberRole, role: MemberRole) -> ServiceResult<()> {
    match role {
        MemberRole::Owner => Err(ServiceError::forbidden("the owner role cannot be assigned")),
        MemberRole::Admin if actor_role != MemberRole::Owner => {
            Err(ServiceError::forbidden("only the owner can grant admin"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::check_assignable;
    use crate::model::publication::MemberRole;

    #[test]
    fn only_owner_grants_admin_and_nobody_grants_owner() {
        assert!(check_assignable(MemberRole::Owner, MemberRole::Admin).is_ok());
        assert!(check_assignable(MemberRole::Admin, MemberRole::Admin).is_err());
        assert!(check_assignable(MemberRole::Admin, MemberRole::Editor).is_ok());
        assert!(check_assignable(MemberRole::Owner, MemberRole::Owner).is_err());
    }
}
