//! Voice command interpretation and dispatch
//!
//! Turns an utterance such as "add 3 kg of rice to inventory" into an
//! [`AddIntent`], or into a [`Clarification`] naming the first thing that
//! could not be understood. [`CommandProcessor`] dispatches intents to an
//! [`ItemSink`] and reports the result through a [`Feedback`] channel.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::category::{Category, classify};
use super::feedback::Feedback;
use super::quantity::{ParsedQuantity, extract, is_quantity_phrase};
use crate::Result;
use crate::db::{NewInventoryItem, NewShoppingItem};

const INVENTORY_PHRASE: &str = "to inventory";
const SHOPPING_PHRASES: [&str; 2] = ["to shopping", "to shopping list"];

/// Collection an add command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Inventory,
    ShoppingList,
}

impl Destination {
    pub const ALL: [Self; 2] = [Self::Inventory, Self::ShoppingList];

    /// Phrases that select this destination
    #[must_use]
    pub const fn phrases(self) -> &'static [&'static str] {
        match self {
            Self::Inventory => &[INVENTORY_PHRASE],
            Self::ShoppingList => &SHOPPING_PHRASES,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::ShoppingList => "shopping list",
        }
    }
}

/// A fully understood add command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddIntent {
    pub destination: Destination,
    pub item_name: String,
    pub quantity: ParsedQuantity,
    pub category: Category,
}

impl AddIntent {
    /// Low-stock threshold for new inventory: 20% of the quantity, rounded up
    #[must_use]
    pub const fn low_threshold(&self) -> u32 {
        self.quantity.quantity.div_ceil(5)
    }

    /// Confirmation spoken after a successful add
    #[must_use]
    pub fn confirmation(&self) -> String {
        format!(
            "Added {} {} of {} to {}",
            self.quantity.quantity,
            self.quantity.unit,
            self.item_name,
            self.destination.label()
        )
    }

    fn inventory_item(&self) -> NewInventoryItem {
        NewInventoryItem {
            name: self.item_name.clone(),
            category: self.category.to_string(),
            quantity: f64::from(self.quantity.quantity),
            unit: self.quantity.unit.clone(),
            low_threshold: f64::from(self.low_threshold()),
        }
    }

    fn shopping_item(&self) -> NewShoppingItem {
        NewShoppingItem {
            name: self.item_name.clone(),
            category: self.category.to_string(),
            quantity: f64::from(self.quantity.quantity),
            unit: self.quantity.unit.clone(),
            automatic: false,
        }
    }
}

/// Why a command needs to be repeated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Clarification {
    /// Neither inventory nor shopping list was named
    MissingDestination,
    /// Nothing between "add" and "to"
    MissingItemName,
    /// No quantity/unit pair in the utterance
    MissingQuantity { item_name: String },
}

impl Clarification {
    /// Prompt spoken back to the user
    #[must_use]
    pub fn prompt(&self) -> String {
        match self {
            Self::MissingDestination => {
                "Please specify if you want to add to inventory or shopping list".to_string()
            }
            Self::MissingItemName => {
                "I didn't catch the item name. Could you repeat that?".to_string()
            }
            Self::MissingQuantity { item_name } => {
                format!("What quantity of {item_name} would you like to add?")
            }
        }
    }
}

impl fmt::Display for Clarification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prompt())
    }
}

/// Result of interpreting one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "detail", rename_all = "snake_case")]
pub enum Interpretation {
    Dispatch(AddIntent),
    Clarify(Clarification),
}

/// Interpret an utterance as an add command
///
/// The text is lower-cased first. Each step is a gate: destination phrase,
/// item name, then quantity. The first one missing becomes the clarification.
#[must_use]
pub fn interpret(text: &str) -> Interpretation {
    let text = text.to_lowercase();

    let is_inventory = text.contains(INVENTORY_PHRASE);
    let is_shopping = SHOPPING_PHRASES.iter().any(|p| text.contains(p));

    if !text.contains("add") || !(is_inventory || is_shopping) {
        return Interpretation::Clarify(Clarification::MissingDestination);
    }

    let item_name = item_name(&text);
    if item_name.is_empty() {
        return Interpretation::Clarify(Clarification::MissingItemName);
    }

    // Inventory wins when both phrases are present
    let destination = if is_inventory {
        Destination::Inventory
    } else {
        Destination::ShoppingList
    };

    let Some(quantity) = extract(&text) else {
        return Interpretation::Clarify(Clarification::MissingQuantity { item_name });
    };

    let category = classify(&item_name);

    Interpretation::Dispatch(AddIntent {
        destination,
        item_name,
        quantity,
        category,
    })
}

/// Item name from the words strictly between the first "add" and the first "to"
///
/// A quantity phrase at either end of that span is dropped along with the
/// "of" joining it to the name, so "add 5 pcs of apple to" names "apple".
/// Punctuation around each word is ignored.
fn item_name(text: &str) -> String {
    let words: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|w| !w.is_empty())
        .collect();

    let start = words.iter().position(|w| *w == "add");
    let end = words.iter().position(|w| *w == "to");

    match (start, end) {
        (Some(start), Some(end)) if start + 1 < end => {
            strip_quantity(&words[start + 1..end]).join(" ")
        }
        _ => String::new(),
    }
}

fn strip_quantity<'a>(mut words: &'a [&'a str]) -> &'a [&'a str] {
    let leading = phrase_len(words, |n| words[..n].join(" "));
    if leading > 0 {
        words = &words[leading..];
        if words.first() == Some(&"of") {
            words = &words[1..];
        }
    }

    let trailing = phrase_len(words, |n| words[words.len() - n..].join(" "));
    &words[..words.len() - trailing]
}

/// Length of the quantity phrase (one or two words) picked out by `phrase`
fn phrase_len(words: &[&str], phrase: impl Fn(usize) -> String) -> usize {
    [2, 1]
        .into_iter()
        .find(|n| *n <= words.len() && is_quantity_phrase(&phrase(*n)))
        .unwrap_or(0)
}

/// Destination collections for dispatched commands
///
/// Implemented by the kitchen store; the kitchen scope is carried by the
/// implementation, not the items.
pub trait ItemSink {
    /// Add a new inventory entry
    ///
    /// # Errors
    ///
    /// Returns error if the item cannot be stored
    fn add_inventory_item(&self, item: NewInventoryItem) -> Result<()>;

    /// Add (or merge into) a shopping list entry
    ///
    /// # Errors
    ///
    /// Returns error if the item cannot be stored
    fn add_shopping_item(&self, item: NewShoppingItem) -> Result<()>;
}

/// What happened to a processed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Intent stored in its destination
    Added { intent: AddIntent },
    /// Command was incomplete, nothing stored
    Clarify { clarification: Clarification },
    /// Intent understood but the store rejected it
    Failed { intent: AddIntent },
}

impl CommandOutcome {
    /// Message spoken for this outcome
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Added { intent } => intent.confirmation(),
            Self::Clarify { clarification } => clarification.prompt(),
            Self::Failed { intent } => format!("Sorry, I couldn't save {}", intent.item_name),
        }
    }
}

/// Consumes finalized utterances
pub trait UtteranceHandler: Send {
    fn handle(&mut self, utterance: &str);
}

/// Interprets utterances and dispatches them into an [`ItemSink`]
pub struct CommandProcessor<S> {
    sink: S,
    feedback: Arc<dyn Feedback>,
}

impl<S: ItemSink> CommandProcessor<S> {
    #[must_use]
    pub fn new(sink: S, feedback: Arc<dyn Feedback>) -> Self {
        Self { sink, feedback }
    }

    /// Interpret and dispatch one utterance, speaking the result
    ///
    /// Clarifications and store failures are spoken, never returned as errors.
    pub fn process(&self, text: &str) -> CommandOutcome {
        tracing::info!(command = text, "processing voice command");

        let outcome = match interpret(text) {
            Interpretation::Clarify(clarification) => {
                tracing::debug!(?clarification, "command needs clarification");
                CommandOutcome::Clarify { clarification }
            }
            Interpretation::Dispatch(intent) => self.dispatch(intent),
        };

        self.feedback.speak(&outcome.message());
        outcome
    }

    fn dispatch(&self, intent: AddIntent) -> CommandOutcome {
        let stored = match intent.destination {
            Destination::Inventory => self.sink.add_inventory_item(intent.inventory_item()),
            Destination::ShoppingList => self.sink.add_shopping_item(intent.shopping_item()),
        };

        match stored {
            Ok(()) => {
                tracing::info!(
                    item = %intent.item_name,
                    quantity = intent.quantity.quantity,
                    unit = %intent.quantity.unit,
                    category = %intent.category,
                    destination = intent.destination.label(),
                    "voice command dispatched"
                );
                CommandOutcome::Added { intent }
            }
            Err(e) => {
                tracing::error!(error = %e, item = %intent.item_name, "failed to store voice command");
                CommandOutcome::Failed { intent }
            }
        }
    }
}

impl<S: ItemSink + Send> UtteranceHandler for CommandProcessor<S> {
    fn handle(&mut self, utterance: &str) {
        let _ = self.process(utterance);
    }
}
