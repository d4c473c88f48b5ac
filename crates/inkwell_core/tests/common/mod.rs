#![allow(dead_code)]

use inkwell_core::model::article::{Article, ArticleInput};
use inkwell_core::model::user::{User, UserRole};
use inkwell_core::open_db_in_memory;
use inkwell_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use inkwell_core::service::article_service::ArticleService;
use inkwell_core::service::auth_service::{AuthService, RegisterInput};
use rusqlite::Connection;

pub const PASSWORD: &str = "correct horse battery";
/// Lowest cost bcrypt accepts.
pub const TEST_BCRYPT_COST: u32 = 4;

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn auth(conn: &Connection) -> AuthService<'_> {
    AuthService::new(conn).with_bcrypt_cost(TEST_BCRYPT_COST)
}

pub fn register(conn: &Connection, username: &str) -> User {
    auth(conn)
        .register(
            &RegisterInput {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: PASSWORD.to_string(),
                name: None,
            },
            Some("127.0.0.1"),
        )
        .unwrap()
        .user
}

pub fn register_with_role(conn: &Connection, username: &str, role: UserRole) -> User {
    let user = register(conn, username);
    let users = SqliteUserRepository::new(conn);
    users.set_role(user.id, role).unwrap();
    users.get_user(user.id).unwrap().unwrap()
}

pub fn article_input(title: &str, content: &str, tags: &[&str]) -> ArticleInput {
    ArticleInput {
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        ..ArticleInput::default()
    }
}

pub fn draft(conn: &Connection, author: &User, title: &str, content: &str) -> Article {
    ArticleService::new(conn)
        .create(author, &article_input(title, content, &[]))
        .unwrap()
}

pub fn published(conn: &Connection, author: &User, title: &str, content: &str, tags: &[&str]) -> Article {
    let service = ArticleService::new(conn);
    let article = service
        .create(author, &article_input(title, content, tags))
        .unwrap();
    service.publish(author, article.id).unwrap()
}

pub fn count_rows(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}
