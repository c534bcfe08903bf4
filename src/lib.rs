//! Larder - kitchen inventory and shopping list service with voice commands
//!
//! This library provides the core functionality for larder:
//! - Kitchens owned by users, each with an inventory and a shopping list
//! - Voice commands ("add 2 kg of rice to inventory") interpreted into items
//! - Microphone sessions with silence detection, STT and spoken replies
//! - An HTTP API over all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                       │
//! │        HTTP API        │        Voice session       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Command layer                      │
//! │   Interpreter  │  Quantity  │  Category  │  Store   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                     SQLite                          │
//! │   Users  │  Kitchens  │  Inventory  │  Shopping     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod store;
pub mod voice;

pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use store::{Depletion, KitchenStore};
