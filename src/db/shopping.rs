//! Shopping list repository
//!
//! Adding an item whose name (ignoring case) and unit match an existing
//! entry merges into it rather than creating a duplicate.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DbPool, conn, parse_datetime, skip_malformed};
use crate::{Error, Result};

const ITEM_COLUMNS: &str =
    "id, kitchen_id, name, category, quantity, unit, is_checked, automatic, added_at, updated_at";

/// An entry on a kitchen's shopping list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingItem {
    pub id: String,
    pub kitchen_id: String,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub is_checked: bool,
    /// Queued by a low-stock trigger rather than by hand
    pub automatic: bool,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new shopping entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewShoppingItem {
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub automatic: bool,
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShoppingPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub is_checked: Option<bool>,
}

/// Listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShoppingFilter {
    /// Case-insensitive name substring
    pub search: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Only automatic (`true`) or only manual (`false`) entries
    pub automatic: Option<bool>,
}

/// Shopping list repository
#[derive(Clone)]
pub struct ShoppingRepo {
    pool: DbPool,
}

impl ShoppingRepo {
    /// Create a new shopping list repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add an entry, merging with a matching one
    ///
    /// On merge the quantities are summed and the entry stays automatic only
    /// if both the existing and the new entry are automatic.
    ///
    /// # Errors
    ///
    /// Returns error if the item is invalid or the database operation fails
    pub fn add(&self, kitchen_id: &str, item: NewShoppingItem) -> Result<ShoppingItem> {
        let name = item.name.trim();
        validate(name, item.quantity)?;

        let mut conn = conn(&self.pool)?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<(String, f64, bool)> = tx
            .query_row(
                "SELECT id, quantity, automatic FROM shopping_items
                 WHERE kitchen_id = ?1 AND lower(name) = lower(?2) AND unit = ?3
                 ORDER BY added_at LIMIT 1",
                params![kitchen_id, name, item.unit],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let id = if let Some((id, quantity, automatic)) = existing {
            tx.execute(
                "UPDATE shopping_items SET quantity = ?1, automatic = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![quantity + item.quantity, automatic && item.automatic, now, id],
            )?;
            tracing::debug!(kitchen_id, item_id = %id, name, "shopping item merged");
            id
        } else {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO shopping_items
                 (id, kitchen_id, name, category, quantity, unit, is_checked, automatic,
                  added_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?8)",
                params![
                    id,
                    kitchen_id,
                    name,
                    item.category,
                    item.quantity,
                    item.unit,
                    item.automatic,
                    now
                ],
            )?;
            tracing::debug!(kitchen_id, item_id = %id, name, automatic = item.automatic, "shopping item added");
            id
        };

        tx.commit()?;
        drop(conn);

        self.get(kitchen_id, &id)
    }

    /// Fetch one entry from a kitchen
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such item exists in the kitchen
    pub fn get(&self, kitchen_id: &str, id: &str) -> Result<ShoppingItem> {
        let conn = conn(&self.pool)?;

        conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM shopping_items WHERE id = ?1 AND kitchen_id = ?2"),
            [id, kitchen_id],
            item_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("shopping item {id}")))
    }

    /// Apply a partial update
    ///
    /// # Errors
    ///
    /// Returns error if the item is missing or the result would be invalid
    pub fn update(&self, kitchen_id: &str, id: &str, patch: ShoppingPatch) -> Result<ShoppingItem> {
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
        if let Some(is_checked) = patch.is_checked {
            item.is_checked = is_checked;
        }
        validate(&item.name, item.quantity)?;

        let conn = conn(&self.pool)?;
        conn.execute(
            "UPDATE shopping_items
             SET name = ?1, category = ?2, quantity = ?3, unit = ?4, is_checked = ?5,
                 updated_at = ?6
             WHERE id = ?7 AND kitchen_id = ?8",
            params![
                item.name,
                item.category,
                item.quantity,
                item.unit,
                item.is_checked,
                Utc::now().to_rfc3339(),
                id,
                kitchen_id
            ],
        )?;
        drop(conn);

        self.get(kitchen_id, id)
    }

    /// Flip the checked state of an entry
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such item exists in the kitchen
    pub fn toggle_checked(&self, kitchen_id: &str, id: &str) -> Result<ShoppingItem> {
        let conn = conn(&self.pool)?;

        let updated = conn.execute(
            "UPDATE shopping_items SET is_checked = NOT is_checked, updated_at = ?1
             WHERE id = ?2 AND kitchen_id = ?3",
            params![Utc::now().to_rfc3339(), id, kitchen_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("shopping item {id}")));
        }
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
            "DELETE FROM shopping_items WHERE id = ?1 AND kitchen_id = ?2",
            [id, kitchen_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("shopping item {id}")));
        }

        Ok(())
    }

    /// Delete every checked entry, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn clear_checked(&self, kitchen_id: &str) -> Result<usize> {
        let conn = conn(&self.pool)?;

        let deleted = conn.execute(
            "DELETE FROM shopping_items WHERE kitchen_id = ?1 AND is_checked = 1",
            [kitchen_id],
        )?;

        tracing::debug!(kitchen_id, deleted, "cleared checked shopping items");
        Ok(deleted)
    }

    /// List entries: unchecked first, then by category and name
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self, kitchen_id: &str, filter: &ShoppingFilter) -> Result<Vec<ShoppingItem>> {
        let conn = conn(&self.pool)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM shopping_items
             WHERE kitchen_id = ?1
               AND (?2 IS NULL OR instr(lower(name), lower(?2)) > 0)
               AND (?3 IS NULL OR category = ?3)
               AND (?4 IS NULL OR automatic = ?4)
             ORDER BY is_checked, category, name COLLATE NOCASE"
        ))?;

        let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
        let category = filter.category.as_deref().filter(|c| !c.is_empty());

        let items: Vec<ShoppingItem> = stmt
            .query_map(
                params![kitchen_id, search, category, filter.automatic],
                item_from_row,
            )?
            .filter_map(skip_malformed)
        .collect();

        Ok(items)
    }
}

fn validate(name: &str, quantity: f64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("item name cannot be empty".to_string()));
    }
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(Error::InvalidInput(
            "quantity must be zero or more".to_string(),
        ));
    }
    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ShoppingItem> {
    Ok(ShoppingItem {
        id: row.get(0)?,
        kitchen_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        is_checked: row.get(6)?,
        automatic: row.get(7)?,
        added_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{KitchenRepo, UserRepo, init_memory};

    fn setup() -> (ShoppingRepo, String) {
        let pool = init_memory().unwrap();
        let user = UserRepo::new(pool.clone())
            .login("cook@example.com", "pw")
            .unwrap()
            .user;
        let kitchen = KitchenRepo::new(pool.clone()).add(&user.id, "Home").unwrap();
        (ShoppingRepo::new(pool), kitchen.id)
    }

    fn item(name: &str, quantity: f64, unit: &str, automatic: bool) -> NewShoppingItem {
        NewShoppingItem {
            name: name.to_string(),
            category: "Dairy".to_string(),
            quantity,
            unit: unit.to_string(),
            automatic,
        }
    }

    #[test]
    fn test_add_merges_same_name_and_unit() {
        let (repo, kitchen) = setup();

        let first = repo.add(&kitchen, item("Milk", 1.0, "bottle", false)).unwrap();
        let merged = repo.add(&kitchen, item("milk", 2.0, "bottle", false)).unwrap();

        assert_eq!(first.id, merged.id);
        assert!((merged.quantity - 3.0).abs() < f64::EPSILON);
        assert_eq!(merged.name, "Milk");
        assert_eq!(repo.list(&kitchen, &ShoppingFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_different_unit_is_separate_entry() {
        let (repo, kitchen) = setup();

        repo.add(&kitchen, item("milk", 1.0, "bottle", false)).unwrap();
        repo.add(&kitchen, item("milk", 1.0, "cup", false)).unwrap();

        assert_eq!(repo.list(&kitchen, &ShoppingFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn test_merge_keeps_automatic_only_if_both_are() {
        let (repo, kitchen) = setup();

        repo.add(&kitchen, item("milk", 1.0, "bottle", true)).unwrap();
        let still_auto = repo.add(&kitchen, item("milk", 1.0, "bottle", true)).unwrap();
        assert!(still_auto.automatic);

        let manual = repo.add(&kitchen, item("milk", 1.0, "bottle", false)).unwrap();
        assert!(!manual.automatic);
    }

    #[test]
    fn test_toggle_and_clear_checked() {
        let (repo, kitchen) = setup();

        let milk = repo.add(&kitchen, item("milk", 1.0, "bottle", false)).unwrap();
        repo.add(&kitchen, item("cheese", 1.0, "pcs", false)).unwrap();

        assert!(repo.toggle_checked(&kitchen, &milk.id).unwrap().is_checked);
        assert_eq!(repo.clear_checked(&kitchen).unwrap(), 1);

        let remaining = repo.list(&kitchen, &ShoppingFilter::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "cheese");

        assert!(repo.toggle_checked(&kitchen, &remaining[0].id).unwrap().is_checked);
        assert!(matches!(
            repo.toggle_checked(&kitchen, &milk.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_order_and_filters() {
        let (repo, kitchen) = setup();

        let mut bread = item("bread", 1.0, "pcs", true);
        bread.category = "Grains".to_string();
        let bread = repo.add(&kitchen, bread).unwrap();
        repo.add(&kitchen, item("yogurt", 1.0, "pcs", false)).unwrap();
        repo.add(&kitchen, item("butter", 1.0, "pcs", false)).unwrap();
        repo.toggle_checked(&kitchen, &bread.id).unwrap();

        let names = |filter: ShoppingFilter| -> Vec<String> {
            repo.list(&kitchen, &filter)
                .unwrap()
                .into_iter()
                .map(|i| i.name)
                .collect()
        };

        // Unchecked first, then category, then name
        assert_eq!(
            names(ShoppingFilter::default()),
            vec!["butter", "yogurt", "bread"]
        );
        assert_eq!(
            names(ShoppingFilter {
                automatic: Some(true),
                ..ShoppingFilter::default()
            }),
            vec!["bread"]
        );
        assert_eq!(
            names(ShoppingFilter {
                search: Some("UT".to_string()),
                ..ShoppingFilter::default()
            }),
            vec!["butter"]
        );
    }

    #[test]
    fn test_partial_update() {
        let (repo, kitchen) = setup();

        let milk = repo.add(&kitchen, item("milk", 1.0, "bottle", false)).unwrap();
        let updated = repo
            .update(
                &kitchen,
                &milk.id,
                ShoppingPatch {
                    quantity: Some(4.0),
                    is_checked: Some(true),
                    ..ShoppingPatch::default()
                },
            )
            .unwrap();

        assert!((updated.quantity - 4.0).abs() < f64::EPSILON);
        assert!(updated.is_checked);
        assert_eq!(updated.unit, "bottle");
    }

    #[test]
    fn test_list_skips_malformed_rows() {
        let (repo, kitchen) = setup();

        repo.add(&kitchen, item("milk", 1.0, "bottle", false)).unwrap();
        repo.pool
            .get()
            .unwrap()
            .execute(
                "INSERT INTO shopping_items (id, kitchen_id, name, category, quantity, unit)
                 VALUES ('broken', ?1, 'eggs', 'Dairy', 'a dozen', 'pcs')",
                [&kitchen],
            )
            .unwrap();

        let items = repo.list(&kitchen, &ShoppingFilter::default()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "milk");
    }
}
