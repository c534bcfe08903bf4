//! Kitchen repository
//!
//! A kitchen is an independent inventory and shopping scope owned by one
//! user. Each user has a selected kitchen recorded on their user row.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use uuid::Uuid;

use super::{DbPool, conn, parse_datetime, skip_malformed};
use crate::{Error, Result};

/// Name given to the kitchen created for a user who has none
pub const DEFAULT_KITCHEN_NAME: &str = "My Kitchen";

/// A kitchen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kitchen {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// Kitchen repository
#[derive(Clone)]
pub struct KitchenRepo {
    pool: DbPool,
}

impl KitchenRepo {
    /// Create a new kitchen repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// List a user's kitchens, oldest first
    ///
    /// A user without kitchens gets a default one, which is selected.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self, owner_id: &str) -> Result<Vec<Kitchen>> {
        let conn = conn(&self.pool)?;

        let kitchens = list_owned(&conn, owner_id)?;
        if !kitchens.is_empty() {
            return Ok(kitchens);
        }

        let kitchen = insert(&conn, owner_id, DEFAULT_KITCHEN_NAME)?;
        set_selected(&conn, owner_id, Some(&kitchen.id))?;

        tracing::info!(owner_id, kitchen_id = %kitchen.id, "created default kitchen");
        Ok(vec![kitchen])
    }

    /// Create a kitchen and select it
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or the database operation fails
    pub fn add(&self, owner_id: &str, name: &str) -> Result<Kitchen> {
        let name = validate_name(name)?;
        let conn = conn(&self.pool)?;

        let kitchen = insert(&conn, owner_id, name)?;
        set_selected(&conn, owner_id, Some(&kitchen.id))?;

        tracing::info!(owner_id, kitchen_id = %kitchen.id, "kitchen added");
        Ok(kitchen)
    }

    /// Fetch a kitchen owned by `owner_id`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the kitchen does not exist or belongs to someone else
    pub fn get(&self, owner_id: &str, id: &str) -> Result<Kitchen> {
        let conn = conn(&self.pool)?;
        get_owned(&conn, owner_id, id)
    }

    /// Make a kitchen the user's selected one
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the kitchen is not owned by the user
    pub fn select(&self, owner_id: &str, id: &str) -> Result<Kitchen> {
        let conn = conn(&self.pool)?;

        let kitchen = get_owned(&conn, owner_id, id)?;
        set_selected(&conn, owner_id, Some(&kitchen.id))?;

        tracing::debug!(owner_id, kitchen_id = id, "kitchen selected");
        Ok(kitchen)
    }

    /// Rename a kitchen
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or the kitchen is not owned by the user
    pub fn rename(&self, owner_id: &str, id: &str, name: &str) -> Result<Kitchen> {
        let name = validate_name(name)?;
        let conn = conn(&self.pool)?;

        let updated = conn.execute(
            "UPDATE kitchens SET name = ?1 WHERE id = ?2 AND owner_id = ?3",
            params![name, id, owner_id],
        )?;
        if updated == 0 {
            return Err(not_found(id));
        }

        get_owned(&conn, owner_id, id)
    }

    /// Delete a kitchen with all of its inventory and shopping items
    ///
    /// If it was selected, the oldest remaining kitchen becomes selected.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the kitchen is not owned by the user
    pub fn remove(&self, owner_id: &str, id: &str) -> Result<()> {
        let mut conn = conn(&self.pool)?;
        let tx = conn.transaction()?;

        get_owned(&tx, owner_id, id)?;

        tx.execute("DELETE FROM inventory_items WHERE kitchen_id = ?1", [id])?;
        tx.execute("DELETE FROM shopping_items WHERE kitchen_id = ?1", [id])?;
        tx.execute("DELETE FROM kitchens WHERE id = ?1", [id])?;

        if selected_id(&tx, owner_id)?.as_deref() == Some(id) {
            let next = list_owned(&tx, owner_id)?.into_iter().next();
            set_selected(&tx, owner_id, next.as_ref().map(|k| k.id.as_str()))?;
        }

        tx.commit()?;

        tracing::info!(owner_id, kitchen_id = id, "kitchen removed");
        Ok(())
    }

    /// The user's selected kitchen, falling back to their oldest one
    ///
    /// Creates the default kitchen for users who have none.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn selected(&self, owner_id: &str) -> Result<Kitchen> {
        let kitchens = self.list(owner_id)?;
        let conn = conn(&self.pool)?;
        let selected = selected_id(&conn, owner_id)?;

        kitchens
            .iter()
            .find(|k| Some(&k.id) == selected.as_ref())
            .or_else(|| kitchens.first())
            .cloned()
            .ok_or_else(|| Error::NotFound("no kitchen available".to_string()))
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "kitchen name cannot be empty".to_string(),
        ));
    }
    Ok(name)
}

fn not_found(id: &str) -> Error {
    Error::NotFound(format!("kitchen {id}"))
}

fn insert(conn: &Connection, owner_id: &str, name: &str) -> Result<Kitchen> {
    let kitchen = Kitchen {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        owner_id: owner_id.to_string(),
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO kitchens (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            kitchen.id,
            kitchen.name,
            kitchen.owner_id,
            kitchen.created_at.to_rfc3339()
        ],
    )?;

    Ok(kitchen)
}

fn list_owned(conn: &Connection, owner_id: &str) -> Result<Vec<Kitchen>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, owner_id, created_at FROM kitchens
         WHERE owner_id = ?1 ORDER BY created_at, rowid",
    )?;

    let kitchens: Vec<Kitchen> = stmt
        .query_map([owner_id], kitchen_from_row)?
        .filter_map(skip_malformed)
        .collect();

    Ok(kitchens)
}

fn get_owned(conn: &Connection, owner_id: &str, id: &str) -> Result<Kitchen> {
    conn.query_row(
        "SELECT id, name, owner_id, created_at FROM kitchens WHERE id = ?1 AND owner_id = ?2",
        [id, owner_id],
        kitchen_from_row,
    )
    .optional()?
    .ok_or_else(|| not_found(id))
}

fn selected_id(conn: &Connection, owner_id: &str) -> Result<Option<String>> {
    let selected = conn
        .query_row(
            "SELECT selected_kitchen_id FROM users WHERE id = ?1",
            [owner_id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();

    Ok(selected)
}

fn set_selected(conn: &Connection, owner_id: &str, kitchen_id: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE users SET selected_kitchen_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![kitchen_id, Utc::now().to_rfc3339(), owner_id],
    )?;
    Ok(())
}

fn kitchen_from_row(row: &Row<'_>) -> rusqlite::Result<Kitchen> {
    Ok(Kitchen {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}
