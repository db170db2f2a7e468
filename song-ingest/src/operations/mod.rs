//! The three batch operations and their raw input records.

pub mod catalog;
pub mod favorite;
pub mod rating;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use catalog::{CatalogSongInput, CatalogUpsert};
pub use favorite::{FavoriteMode, FavoriteRefInput, FavoriteToggle};
pub use rating::{RateSongs, RatingInput, RatingRecord};

/// Name of the submitted collection; prefixes every defect path.
pub const SONGS: &str = "songs";

/// Turn raw array elements into typed input records.
///
/// Elements that are not objects decode as records with every field
/// absent, so they fail validation in their own slot instead of failing
/// the request.
pub fn decode_items<T: DeserializeOwned + Default>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).unwrap_or_default(),
            _ => T::default(),
        })
        .collect()
}
