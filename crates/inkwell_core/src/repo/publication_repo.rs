//! Publication and membership persistence.
//!
//! # Invariants
//! - Creating a publication inserts its owner membership in the same
//!   transaction.
//! - Member rows are keyed by (publication, user).

use super::{map_constraint, parse_column, Page, RepoError, RepoResult};
use crate::model::publication::{
    MemberRole, Publication, PublicationId, PublicationInput, PublicationMember,
};
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const PUBLICATION_SELECT_SQL: &str = "SELECT
    p.id,
    p.name,
    p.slug,
    p.description,
    p.logo_url,
    p.owner_id,
    (SELECT COUNT(*) FROM publication_members m WHERE m.publication_id = p.id) AS member_count,
    p.created_at,
    p.updated_at
FROM publications p";

pub trait PublicationRepository {
    fn create_publication(
        &self,
        owner_id: UserId,
        input: &PublicationInput,
        slug: &str,
    ) -> RepoResult<Publication>;
    fn update_publication(
        &self,
        id: PublicationId,
        input: &PublicationInput,
    ) -> RepoResult<Publication>;
    fn delete_publication(&self, id: PublicationId) -> RepoResult<()>;
    fn get_publication(&self, id: PublicationId) -> RepoResult<Option<Publication>>;
    fn slug_exists(&self, slug: &str) -> RepoResult<bool>;
    fn list_publications(&self, page: Page) -> RepoResult<Vec<Publication>>;
    fn member_role(&self, id: PublicationId, user_id: UserId) -> RepoResult<Option<MemberRole>>;
    fn add_member(&self, id: PublicationId, user_id: UserId, role: MemberRole) -> RepoResult<()>;
    fn set_member_role(
        &self,
        id: PublicationId,
        user_id: UserId,
        role: MemberRole,
    ) -> RepoResult<()>;
    fn remove_member(&self, id: PublicationId, user_id: UserId) -> RepoResult<bool>;
    fn list_members(&self, id: PublicationId) -> RepoResult<Vec<PublicationMember>>;
    /// Ids of members holding at least `min_role`.
    fn member_ids_with_role(&self, id: PublicationId, min_role: MemberRole)
        -> RepoResult<Vec<UserId>>;
}

pub struct SqlitePublicationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePublicationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require(&self, id: PublicationId) -> RepoResult<Publication> {
        self.get_publication(id)?
            .ok_or_else(|| RepoError::not_found("publication", id))
    }
}

impl PublicationRepository for SqlitePublicationRepository<'_> {
    fn create_publication(
        &self,
        owner_id: UserId,
        input: &PublicationInput,
        slug: &str,
    ) -> RepoResult<Publication> {
        input.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO publications (name, slug, description, logo_url, owner_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                input.name.trim(),
                slug,
                input.description.as_deref(),
                input.logo_url.as_deref(),
                owner_id,
            ],
        )
        .map_err(|err| map_constraint(err, "publication name already taken"))?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO publication_members (publication_id, user_id, role)
             VALUES (?1, ?2, 'owner');",
            params![id, owner_id],
        )?;
        tx.commit()?;

        self.require(id)
    }

    fn update_publication(
        &self,
        id: PublicationId,
        input: &PublicationInput,
    ) -> RepoResult<Publication> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE publications
                 SET
                    name = ?2,
                    description = ?3,
                    logo_url = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    id,
                    input.name.trim(),
                    input.description.as_deref(),
                    input.logo_url.as_deref(),
                ],
            )
            .map_err(|err| map_constraint(err, "publication name already taken"))?;
        if changed == 0 {
            return Err(RepoError::not_found("publication", id));
        }
        self.require(id)
    }

    fn delete_publication(&self, id: PublicationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM publications WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("publication", id));
        }
        Ok(())
    }

    fn get_publication(&self, id: PublicationId) -> RepoResult<Option<Publication>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PUBLICATION_SELECT_SQL} WHERE p.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_publication_row(row)?)),
            None => Ok(None),
        }
    }

    fn slug_exists(&self, slug: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM publications WHERE slug = ?1);",
            [slug],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_publications(&self, page: Page) -> RepoResult<Vec<Publication>> {
        let mut sql = format!("{PUBLICATION_SELECT_SQL} ORDER BY p.name COLLATE NOCASE ASC");
        let mut bind_values: Vec<Value> = Vec::new();
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut publications = Vec::new();
        while let Some(row) = rows.next()? {
            publications.push(parse_publication_row(row)?);
        }
        Ok(publications)
    }

    fn member_role(&self, id: PublicationId, user_id: UserId) -> RepoResult<Option<MemberRole>> {
        let role: Option<String> = self
            .conn
            .query_row(
                "SELECT role FROM publication_members WHERE publication_id = ?1 AND user_id = ?2;",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        role.map(|value| parse_column(&value, "publication_members.role", MemberRole::parse))
            .transpose()
    }

    fn add_member(&self, id: PublicationId, user_id: UserId, role: MemberRole) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO publication_members (publication_id, user_id, role)
                 VALUES (?1, ?2, ?3);",
                params![id, user_id, role.as_str()],
            )
            .map_err(|err| map_constraint(err, "user is already a member"))?;
        Ok(())
    }

    fn set_member_role(
        &self,
        id: PublicationId,
        user_id: UserId,
        role: MemberRole,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE publication_members SET role = ?3
             WHERE publication_id = ?1 AND user_id = ?2;",
            params![id, user_id, role.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("publication member", user_id));
        }
        Ok(())
    }

    fn remove_member(&self, id: PublicationId, user_id: UserId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM publication_members WHERE publication_id = ?1 AND user_id = ?2;",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn list_members(&self, id: PublicationId) -> RepoResult<Vec<PublicationMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.publication_id, m.user_id, u.username, m.role, m.joined_at
             FROM publication_members m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.publication_id = ?1
             ORDER BY
                CASE m.role
                    WHEN 'owner' THEN 0
                    WHEN 'admin' THEN 1
                    WHEN 'editor' THEN 2
                    ELSE 3
                END,
                m.joined_at ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let role_text: String = row.get(3)?;
            members.push(PublicationMember {
                publication_id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get(2)?,
                role: parse_column(&role_text, "publication_members.role", MemberRole::parse)?,
                joined_at: row.get(4)?,
            });
        }
        Ok(members)
    }

    fn member_ids_with_role(
        &self,
        id: PublicationId,
        min_role: MemberRole,
    ) -> RepoResult<Vec<UserId>> {
        Ok(self
            .list_members(id)?
            .into_iter()
            .filter(|member| member.role >= min_role)
            .map(|member| member.user_id)
            .collect())
    }
}

fn parse_publication_row(row: &Row<'_>) -> RepoResult<Publication> {
    Ok(Publication {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        logo_url: row.get("logo_url")?,
        owner_id: row.get("owner_id")?,
        member_count: row.get("member_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
