//! User account model.
//!
//! # Invariants
//! - `username` is 3..=30 chars of `[A-Za-z0-9_]`, unique case-insensitively.
//! - `email` is stored lowercase.
//! - Password hashes never leave the repository layer in serialized form.

use super::{limit_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub type UserId = i64;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("valid username regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

pub const PASSWORD_MIN_CHARS: usize = 8;
pub const BIO_MAX_CHARS: usize = 500;
pub const NAME_MAX_CHARS: usize = 100;

/// Platform-wide role. Publication roles are separate, see `MemberRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Moderators and admins may act on reports and content flags.
    pub fn can_moderate(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub is_verified: bool,
    pub is_suspended: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn can_moderate(&self) -> bool {
        self.role.can_moderate()
    }

    /// Public projection without the email address.
    pub fn public_profile(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
            created_at: self.created_at,
        }
    }
}

/// User fields safe to expose to other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}

/// Insert model; `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        limit_text("name", self.name.as_deref(), NAME_MAX_CHARS)?;
        if self.password_hash.is_empty() {
            return Err(ValidationError::new("password", "must not be empty"));
        }
        Ok(())
    }
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        limit_text("name", self.name.as_deref(), NAME_MAX_CHARS)?;
        limit_text("bio", self.bio.as_deref(), BIO_MAX_CHARS)?;
        limit_text("avatar_url", self.avatar_url.as_deref(), 500)?;
        Ok(())
    }
}

/// Aggregate counters shown on profile pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub followers: i64,
    pub following: i64,
    pub published_articles: i64,
    pub claps_received: i64,
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "username",
            "must be 3-30 characters of letters, digits or underscore",
        ))
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() <= 254 && EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::new("email", "must be a valid email address"))
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::new(
            "password",
            format!("must be at least {PASSWORD_MIN_CHARS} characters"),
        ));
    }
    if password.len() > 72 {
        // bcrypt silently truncates beyond 72 bytes.
        return Err(ValidationError::new("password", "must be at most 72 bytes"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_email, validate_password, validate_username, UserRole};

    #[test]
    fn username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn email_and_password_rules() {
        assert!(validate_email("a@b.io").is_ok());
        assert!(validate_email("nope").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn role_ordering_and_moderation() {
        assert!(UserRole::Admin > UserRole::Moderator);
        assert!(UserRole::Moderator.can_moderate());
        assert!(!UserRole::User.can_moderate());
        assert_eq!(UserRole::parse("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("root"), None);
    }
}
