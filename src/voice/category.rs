//! Keyword-based category classification for item names

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grocery category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Vegetables,
    Fruits,
    Grains,
    Dairy,
    Meat,
    Seafood,
    Spices,
    Condiments,
    Baking,
    Canned,
    Frozen,
    Beverages,
    Snacks,
    Other,
}

impl Category {
    /// Every category offered to item forms, in display order
    pub const ALL: [Self; 14] = [
        Self::Vegetables,
        Self::Fruits,
        Self::Grains,
        Self::Dairy,
        Self::Meat,
        Self::Seafood,
        Self::Spices,
        Self::Condiments,
        Self::Baking,
        Self::Canned,
        Self::Frozen,
        Self::Beverages,
        Self::Snacks,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vegetables => "Vegetables",
            Self::Fruits => "Fruits",
            Self::Grains => "Grains",
            Self::Dairy => "Dairy",
            Self::Meat => "Meat",
            Self::Seafood => "Seafood",
            Self::Spices => "Spices",
            Self::Condiments => "Condiments",
            Self::Baking => "Baking",
            Self::Canned => "Canned",
            Self::Frozen => "Frozen",
            Self::Beverages => "Beverages",
            Self::Snacks => "Snacks",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Keyword table, matched in declaration order
///
/// Order decides ties: "pepper" is listed under both Vegetables and Spices,
/// and Vegetables wins.
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Vegetables,
        &[
            "tomato", "potato", "onion", "carrot", "cucumber", "lettuce", "spinach", "cabbage",
            "pepper", "bell pepper", "chili",
        ],
    ),
    (
        Category::Fruits,
        &[
            "apple", "banana", "orange", "grape", "mango", "strawberry", "blueberry", "avocado",
            "kiwi", "pear", "peach",
        ],
    ),
    (Category::Dairy, &["milk", "cheese", "yogurt", "butter", "cream"]),
    (Category::Meat, &["chicken", "beef", "pork", "lamb", "turkey"]),
    (Category::Seafood, &["fish", "shrimp", "salmon", "tuna"]),
    (Category::Grains, &["rice", "pasta", "bread", "flour", "cereal"]),
    (Category::Spices, &["salt", "pepper", "cumin", "coriander", "turmeric"]),
    (Category::Condiments, &["ketchup", "mayonnaise", "mustard", "sauce"]),
    (Category::Baking, &["sugar", "baking powder", "vanilla", "chocolate"]),
    (Category::Canned, &["beans", "soup", "tomato sauce"]),
    (Category::Beverages, &["water", "juice", "soda", "coffee", "tea"]),
];

/// Classify an item name by substring keyword match
///
/// Returns [`Category::Other`] when no keyword appears in the name.
#[must_use]
pub fn classify(item_name: &str) -> Category {
    let name = item_name.to_lowercase();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map_or(Category::Other, |(category, _)| *category)
}
