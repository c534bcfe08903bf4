//! User repository with mocked authentication
//!
//! Credentials are only checked for presence; there is no password storage.
//! Signing in hands out an opaque bearer token kept in `auth_tokens`.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use uuid::Uuid;

use super::{DbPool, conn, parse_datetime};
use crate::{Error, Result};

const MOCK_GOOGLE_NAME: &str = "Google User";
const MOCK_GOOGLE_EMAIL: &str = "user@example.com";
const MOCK_GOOGLE_PHOTO: &str = "https://via.placeholder.com/150";

const USER_COLUMNS: &str =
    "id, name, email, photo_url, selected_kitchen_id, created_at, updated_at";

/// A user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub selected_kitchen_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A signed-in user and their bearer token
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// User repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a user and sign them in
    ///
    /// Registering an email that already exists signs in the existing user.
    ///
    /// # Errors
    ///
    /// Returns error if any field is empty or the database operation fails
    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput(
                "invalid registration details".to_string(),
            ));
        }

        let conn = conn(&self.pool)?;
        let user = find_or_create(&conn, name, email, None)?;
        let token = issue_token(&conn, &user.id)?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(AuthSession { token, user })
    }

    /// Sign in with email and password
    ///
    /// The display name of a new user is the local part of the email.
    ///
    /// # Errors
    ///
    /// Returns error if either credential is empty or the database operation fails
    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::Auth("invalid credentials".to_string()));
        }

        let name = email.split('@').next().unwrap_or(email);

        let conn = conn(&self.pool)?;
        let user = find_or_create(&conn, name, email, None)?;
        let token = issue_token(&conn, &user.id)?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(AuthSession { token, user })
    }

    /// Sign in as the mock Google account
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn login_with_google(&self) -> Result<AuthSession> {
        let conn = conn(&self.pool)?;
        let user = find_or_create(
            &conn,
            MOCK_GOOGLE_NAME,
            MOCK_GOOGLE_EMAIL,
            Some(MOCK_GOOGLE_PHOTO),
        )?;
        let token = issue_token(&conn, &user.id)?;

        tracing::info!(user_id = %user.id, "user logged in with google");
        Ok(AuthSession { token, user })
    }

    /// Revoke a token, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn logout(&self, token: &str) -> Result<bool> {
        let conn = conn(&self.pool)?;
        let deleted = conn.execute("DELETE FROM auth_tokens WHERE token = ?1", [token])?;
        Ok(deleted > 0)
    }

    /// Resolve a bearer token to its user
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let conn = conn(&self.pool)?;

        let user = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE id = (SELECT user_id FROM auth_tokens WHERE token = ?1)"
                ),
                [token],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    /// Find a user by ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<User>> {
        let conn = conn(&self.pool)?;

        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    /// Find a user by email (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = conn(&self.pool)?;
        find_by_email(&conn, email.trim())
    }
}

fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            [email],
            user_from_row,
        )
        .optional()?;

    Ok(user)
}

fn find_or_create(
    conn: &Connection,
    name: &str,
    email: &str,
    photo_url: Option<&str>,
) -> Result<User> {
    if let Some(user) = find_by_email(conn, email)? {
        return Ok(user);
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, name, email, photo_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, name, email, photo_url, now],
    )?;

    tracing::debug!(user_id = %id, "created user");

    find_by_email(conn, email)?.ok_or_else(|| Error::Database("user insert lost".to_string()))
}

fn issue_token(conn: &Connection, user_id: &str) -> Result<String> {
    let token = Uuid::new_v4().simple().to_string();

    conn.execute(
        "INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, Utc::now().to_rfc3339()],
    )?;

    Ok(token)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        photo_url: row.get(3)?,
        selected_kitchen_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}
