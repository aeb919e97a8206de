//! Positional pinning store for hotbars.
//!
//! A hotbar is a named, fixed-capacity row of slots, each empty or pinning a
//! catalog entity by its stable uid. The [`store::HotbarStore`] persists every
//! hotbar in one JSON document, migrates historical document formats forward
//! on load, and exposes the pin/unpin/restack/activate operations.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod store;

pub use catalog::{CatalogLookup, EmptyCatalog, StaticCatalog};
pub use config::{PersistMode, StoreConfig};
pub use error::StoreError;
pub use store::HotbarStore;
