//! Upload metadata persistence. File bytes live on disk, not here.

use super::{Page, RepoError, RepoResult};
use crate::model::upload::{public_url, Upload};
use crate::model::user::UserId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const UPLOAD_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    stored_name,
    original_name,
    mime_type,
    size_bytes,
    created_at
FROM uploads";

/// Insert model for one stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload<'a> {
    pub user_id: UserId,
    pub stored_name: &'a str,
    pub original_name: Option<&'a str>,
    pub mime_type: &'a str,
    pub size_bytes: i64,
}

pub trait UploadRepository {
    fn create_upload(&self, upload: &NewUpload<'_>) -> RepoResult<Upload>;
    fn get_upload(&self, id: i64) -> RepoResult<Option<Upload>>;
    fn find_by_stored_name(&self, stored_name: &str) -> RepoResult<Option<Upload>>;
    fn list_for_user(&self, user_id: UserId, page: Page) -> RepoResult<Vec<Upload>>;
    fn delete_upload(&self, id: i64) -> RepoResult<()>;
}

pub struct SqliteUploadRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUploadRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Upload>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut uploads = Vec::new();
        while let Some(row) = rows.next()? {
            uploads.push(parse_upload_row(row)?);
        }
        Ok(uploads)
    }
}

impl UploadRepository for SqliteUploadRepository<'_> {
    fn create_upload(&self, upload: &NewUpload<'_>) -> RepoResult<Upload> {
        self.conn.execute(
            "INSERT INTO uploads (user_id, stored_name, original_name, mime_type, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                upload.user_id,
                upload.stored_name,
                upload.original_name,
                upload.mime_type,
                upload.size_bytes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_upload(id)?
            .ok_or_else(|| RepoError::not_found("upload", id))
    }

    fn get_upload(&self, id: i64) -> RepoResult<Option<Upload>> {
        let sql = format!("{UPLOAD_SELECT_SQL} WHERE id = ?;");
        Ok(self.query(&sql, vec![Value::Integer(id)])?.into_iter().next())
    }

    fn find_by_stored_name(&self, stored_name: &str) -> RepoResult<Option<Upload>> {
        let sql = format!("{UPLOAD_SELECT_SQL} WHERE stored_name = ?;");
        Ok(self
            .query(&sql, vec![Value::Text(stored_name.to_string())])?
            .into_iter()
            .next())
    }

    fn list_for_user(&self, user_id: UserId, page: Page) -> RepoResult<Vec<Upload>> {
        let mut sql = format!("{UPLOAD_SELECT_SQL} WHERE user_id = ? ORDER BY created_at DESC, id DESC");
        let mut bind_values = vec![Value::Integer(user_id)];
        page.push_sql(&mut sql, &mut bind_values);
        self.query(&sql, bind_values)
    }

    fn delete_upload(&self, id: i64) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM uploads WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("upload", id));
        }
        Ok(())
    }
}

fn parse_upload_row(row: &Row<'_>) -> RepoResult<Upload> {
    let stored_name: String = row.get("stored_name")?;
    Ok(Upload {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        url: public_url(&stored_name),
        stored_name,
        original_name: row.get("original_name")?,
        mime_type: row.get("mime_type")?,
        size_bytes: row.get("size_bytes")?,
        created_at: row.get("created_at")?,
    })
}
