//! Image upload storage and safe retrieval.
//!
//! # Invariants
//! - Only jpeg, png, gif and webp are stored; the type comes from magic bytes.
//! - Stored names are `{uuid}.{ext}`; nothing else is ever served.
//! - Metadata rows and files are created and removed together.

use super::{ServiceError, ServiceResult};
use crate::model::upload::{ImageKind, Upload};
use crate::model::user::User;
use crate::repo::upload_repo::{NewUpload, SqliteUploadRepository, UploadRepository};
use crate::repo::Page;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const ORIGINAL_NAME_MAX_CHARS: usize = 255;

static STORED_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f-]{36}\.(jpg|png|gif|webp)$").expect("stored name regex must compile")
});

/// Upload directory and size limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl UploadSettings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

/// A stored file resolved for serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub kind: ImageKind,
}

pub struct UploadService<'conn> {
    conn: &'conn Connection,
    settings: &'conn UploadSettings,
}

impl<'conn> UploadService<'conn> {
    pub fn new(conn: &'conn Connection, settings: &'conn UploadSettings) -> Self {
        Self { conn, settings }
    }

    pub fn store(
        &self,
        actor: &User,
        bytes: &[u8],
        declared_mime: Option<&str>,
        original_name: Option<&str>,
    ) -> ServiceResult<Upload> {
        let kind = validate_image(bytes, declared_mime, self.settings.max_bytes)?;
        let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), kind.extension());
        let original_name = original_name.map(clean_original_name).filter(|name| !name.is_empty());

        fs::create_dir_all(&self.settings.dir)?;
        let path = self.settings.dir.join(&stored_name);
        fs::write(&path, bytes)?;

        let created = SqliteUploadRepository::new(self.conn).create_upload(&NewUpload {
            user_id: actor.id,
            stored_name: &stored_name,
            original_name: original_name.as_deref(),
            mime_type: kind.mime_type(),
            size_bytes: bytes.len() as i64,
        });
        match created {
            Ok(upload) => {
                info!(
                    "event=upload_store module=uploads status=ok upload_id={} size_bytes={}",
                    upload.id,
                    bytes.len()
                );
                Ok(upload)
            }
            Err(err) => {
                remove_file_quietly(&path);
                Err(err.into())
            }
        }
    }

    /// Resolves a public file name; anything not shaped like a stored name is rejected.
    pub fn open(&self, name: &str) -> ServiceResult<StoredFile> {
        if !is_stored_name(name) {
            return Err(ServiceError::invalid("invalid file name"));
        }
        let kind = name
            .rsplit('.')
            .next()
            .and_then(ImageKind::from_extension)
            .ok_or_else(|| ServiceError::invalid("invalid file name"))?;
        let path = self.settings.dir.join(name);
        if !path.is_file() {
            return Err(ServiceError::not_found("file", name));
        }
        Ok(StoredFile { path, kind })
    }

    pub fn list(&self, actor: &User, page: Page) -> ServiceResult<Vec<Upload>> {
        Ok(SqliteUploadRepository::new(self.conn).list_for_user(actor.id, page)?)
    }

    pub fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let uploads = SqliteUploadRepository::new(self.conn);
        let upload = uploads
            .get_upload(id)?
            .ok_or_else(|| ServiceError::not_found("upload", id))?;
        if upload.user_id != actor.id {
            return Err(ServiceError::forbidden("you can only delete your own uploads"));
        }
        uploads.delete_upload(id)?;
        if is_stored_name(&upload.stored_name) {
            remove_file_quietly(&self.settings.dir.join(&upload.stored_name));
        }
        info!("event=upload_delete module=uploads status=ok upload_id={id}");
        Ok(())
    }
}

pub fn is_stored_name(name: &str) -> bool {
    STORED_NAME_RE.is_match(name)
}

/// Checks size, sniffs the type and compares it to the declared content type.
pub fn validate_image(
    bytes: &[u8],
    declared_mime: Option<&str>,
    max_bytes: usize,
) -> ServiceResult<ImageKind> {
    if bytes.is_empty() {
        return Err(ServiceError::invalid("file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(ServiceError::invalid(format!(
            "file exceeds the {max_bytes} byte limit"
        )));
    }
    let kind = ImageKind::sniff(bytes)
        .ok_or_else(|| ServiceError::invalid("only jpeg, png, gif and webp images are accepted"))?;

    let declared = declared_mime
        .map(str::trim)
        .filter(|mime| !mime.is_empty() && *mime != "application/octet-stream");
    if let Some(mime) = declared {
        match ImageKind::from_mime(mime) {
            Some(declared_kind) if declared_kind == kind => {}
            Some(_) => {
                return Err(ServiceError::invalid(format!(
                    "declared type {mime} does not match file contents ({})",
                    kind.mime_type()
                )))
            }
            None => return Err(ServiceError::invalid(format!("unsupported type {mime}"))),
        }
    }
    Ok(kind)
}

fn clean_original_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|ch| !ch.is_control())
        .take(ORIGINAL_NAME_MAX_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

fn remove_file_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != ErrorKind::NotFound {
            warn!(
                "event=upload_cleanup module=uploads status=error path={} error={}",
                path.display(),
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{clean_original_name, is_stored_name, validate_image};
    use crate::model::upload::ImageKind;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn stored_names_reject_traversal() {
        assert!(is_stored_name("123e4567-e89b-12d3-a456-426614174000.png"));
        assert!(!is_stored_name("../etc/passwd"));
        assert!(!is_stored_name("123e4567-e89b-12d3-a456-426614174000.svg"));
        assert!(!is_stored_name("../23e4567-e89b-12d3-a456-426614174000.png"));
    }

    #[test]
    fn declared_type_must_match_contents() {
        assert_eq!(validate_image(PNG, Some("image/png"), 100).unwrap(), ImageKind::Png);
        assert_eq!(validate_image(PNG, None, 100).unwrap(), ImageKind::Png);
        assert!(validate_image(PNG, Some("image/jpeg"), 100).is_err());
        assert!(validate_image(PNG, Some("text/html"), 100).is_err());
    }

    #[test]
    fn size_limits_apply() {
        assert!(validate_image(&[], None, 100).is_err());
        assert!(validate_image(PNG, None, 4).is_err());
    }

    #[test]
    fn original_names_drop_directories() {
        assert_eq!(clean_original_name("C:\\photos\\cat.png"), "cat.png");
        assert_eq!(clean_original_name("../../x.gif"), "x.gif");
    }
}
