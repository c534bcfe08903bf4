//! Kitchen-scoped view over inventory and shopping list
//!
//! Links the two collections: depleting inventory to its low-stock
//! threshold queues an automatic shopping entry.

use serde::Serialize;

use crate::db::{
    DbPool, InventoryItem, InventoryPatch, InventoryRepo, NewInventoryItem, NewShoppingItem,
    ShoppingItem, ShoppingRepo,
};
use crate::voice::ItemSink;
use crate::{Error, Result};

/// Result of consuming inventory
#[derive(Debug, Clone, Serialize)]
pub struct Depletion {
    pub item: InventoryItem,
    /// Entry queued on the shopping list, if the item ran low
    pub restock: Option<ShoppingItem>,
}

/// Inventory and shopping list of one kitchen
#[derive(Clone)]
pub struct KitchenStore {
    inventory: InventoryRepo,
    shopping: ShoppingRepo,
    kitchen_id: String,
}

impl KitchenStore {
    #[must_use]
    pub fn new(pool: &DbPool, kitchen_id: impl Into<String>) -> Self {
        Self {
            inventory: InventoryRepo::new(pool.clone()),
            shopping: ShoppingRepo::new(pool.clone()),
            kitchen_id: kitchen_id.into(),
        }
    }

    #[must_use]
    pub fn kitchen_id(&self) -> &str {
        &self.kitchen_id
    }

    /// Consume `amount` of an inventory item
    ///
    /// Quantity never drops below zero. When the new quantity is at or below
    /// the threshold, the previous quantity is queued on the shopping list as
    /// an automatic entry.
    ///
    /// # Errors
    ///
    /// Returns error if the amount is negative or the item does not exist
    pub fn decrease_quantity(&self, item_id: &str, amount: f64) -> Result<Depletion> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidInput(
                "amount must be zero or more".to_string(),
            ));
        }

        let current = self.inventory.get(&self.kitchen_id, item_id)?;
        let remaining = (current.quantity - amount).max(0.0);

        let item = self.inventory.update(
            &self.kitchen_id,
            item_id,
            InventoryPatch {
                quantity: Some(remaining),
                ..InventoryPatch::default()
            },
        )?;

        let restock = if item.is_low() {
            let queued = self.shopping.add(
                &self.kitchen_id,
                NewShoppingItem {
                    name: current.name.clone(),
                    category: current.category.clone(),
                    quantity: current.quantity,
                    unit: current.unit.clone(),
                    automatic: true,
                },
            )?;

            tracing::info!(
                kitchen_id = %self.kitchen_id,
                item = %item.name,
                remaining,
                threshold = item.low_threshold,
                "low stock, added to shopping list"
            );
            Some(queued)
        } else {
            None
        };

        Ok(Depletion { item, restock })
    }
}

impl ItemSink for KitchenStore {
    fn add_inventory_item(&self, item: NewInventoryItem) -> Result<()> {
        self.inventory.add(&self.kitchen_id, item).map(|_| ())
    }

    fn add_shopping_item(&self, item: NewShoppingItem) -> Result<()> {
        self.shopping.add(&self.kitchen_id, item).map(|_| ())
    }
}
