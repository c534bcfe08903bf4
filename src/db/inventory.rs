//! Inventory repository

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DbPool, conn, parse_datetime, skip_malformed};
use crate::{Error, Result};

const ITEM_COLUMNS: &str =
    "id, kitchen_id, name, category, quantity, unit, low_threshold, added_at, updated_at";

/// An item on hand in a kitchen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    pub id: String,
    pub kitchen_id: String,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub low_threshold: f64,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// At or below its low-stock threshold
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.quantity <= self.low_threshold
    }
}

/// Fields for a new inventory entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub low_threshold: f64,
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub low_threshold: Option<f64>,
}

/// Listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryFilter {
    /// Case-insensitive name substring
    pub search: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Only items at or below their threshold
    #[serde(default)]
    pub low_stock: bool,
}

/// Inventory repository
#[derive(Clone)]
pub struct InventoryRepo {
    pool: DbPool,
}

impl InventoryRepo {
    /// Create a new inventory repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a new entry; inventory entries are never merged
    ///
    /// # Errors
    ///
    /// Returns error if the item is invalid or the database operation fails
    pub fn add(&self, kitchen_id: &str, item: NewInventoryItem) -> Result<InventoryItem> {
        validate(&item.name, item.quantity, item.low_threshold)?;

        let conn = conn(&self.pool)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO inventory_items
             (id, kitchen_id, name, category, quantity, unit, low_threshold, added_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id,
                kitchen_id,
                item.name.trim(),
                item.category,
                item.quantity,
                item.unit,
                item.low_threshold,
                now
            ],
        )?;

        tracing::debug!(kitchen_id, item_id = %id, name = %item.name, "inventory item added");
        drop(conn);

        self.get(kitchen_id, &id)
    }

    /// Fetch one entry from a kitchen
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such item exists in the kitchen
    pub fn get(&self, kitchen_id: &str, id: &str) -> Result<InventoryItem> {
        let conn = conn(&self.pool)?;

        conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1 AND kitchen_id = ?2"),
            [id, kitchen_id],
            item_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("inventory item {id}")))
    }

    /// Apply a partial update
    ///
    /// # Errors
    ///
    /// Returns error if the item is missing or the result would be invalid
    pub fn update(&self, kitchen_id: &str, id: &str, patch: InventoryPatch) -> Result<InventoryItem> {
        let mut item = self.get(kitchen_id, id)?;

        if let Some(name) = patch.name {
            item.name = name.trim().to_string();
        }
        if let Some(category) = patch.category {
            item.category = category;
        }
        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            item.unit = unit;
        }
        if let Some(low_threshold) = patch.low_threshold {
            item.low_threshold = low_threshold;
        }
        validate(&item.name, item.quantity, item.low_threshold)?;

        let conn = conn(&self.pool)?;
        conn.execute(
            "UPDATE inventory_items
             SET name = ?1, category = ?2, quantity = ?3, unit = ?4, low_threshold = ?5,
                 updated_at = ?6
             WHERE id = ?7 AND kitchen_id = ?8",
            params![
                item.name,
                item.category,
                item.quantity,
                item.unit,
                item.low_threshold,
                Utc::now().to_rfc3339(),
                id,
                kitchen_id
            ],
        )?;
        drop(conn);

        self.get(kitchen_id, id)
    }

    /// Delete an entry
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such item exists in the kitchen
    pub fn remove(&self, kitchen_id: &str, id: &str) -> Result<()> {
        let conn = conn(&self.pool)?;

        let deleted = conn.execute(
            "DELETE FROM inventory_items WHERE id = ?1 AND kitchen_id = ?2",
            [id, kitchen_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("inventory item {id}")));
        }

        tracing::debug!(kitchen_id, item_id = id, "inventory item removed");
        Ok(())
    }

    /// List a kitchen's inventory sorted by name
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self, kitchen_id: &str, filter: &InventoryFilter) -> Result<Vec<InventoryItem>> {
        let conn = conn(&self.pool)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items
             WHERE kitchen_id = ?1
               AND (?2 IS NULL OR instr(lower(name), lower(?2)) > 0)
               AND (?3 IS NULL OR category = ?3)
               AND (?4 = 0 OR quantity <= low_threshold)
             ORDER BY name COLLATE NOCASE, added_at"
        ))?;

        let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
        let category = filter.category.as_deref().filter(|c| !c.is_empty());

        let items: Vec<InventoryItem> = stmt
            .query_map(
                params![kitchen_id, search, category, filter.low_stock],
                item_from_row,
            )?
            .filter_map(skip_malformed)
        .collect();

        Ok(items)
    }
}

fn validate(name: &str, quantity: f64, low_threshold: f64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("item name cannot be empty".to_string()));
    }
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(Error::InvalidInput(
            "quantity must be zero or more".to_string(),
        ));
    }
    if !low_threshold.is_finite() || low_threshold < 0.0 {
        return Err(Error::InvalidInput(
            "low threshold must be zero or more".to_string(),
        ));
    }
    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        kitchen_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        low_threshold: row.get(6)?,
        added_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}
