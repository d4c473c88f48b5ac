//! Request handlers, one module per resource.

pub mod admin;
pub mod analytics;
pub mod articles;
pub mod auth;
pub mod bookmarks;
pub mod claps;
pub mod comments;
pub mod dashboard;
pub mod feed;
pub mod follows;
pub mod health;
pub mod moderation;
pub mod notifications;
pub mod publications;
pub mod search;
pub mod security;
pub mod seo;
pub mod tags;
pub mod uploads;
pub mod users;
pub mod workflow;
