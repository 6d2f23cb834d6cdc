// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components and the entity metadata traits

pub mod comment;
pub mod photo;
pub mod query;

pub use comment::*;
pub use photo::*;
pub use query::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Persisted record type with a data-source assigned numeric id
/// DOCUMENTATION: The metadata here drives filter validation, table routing
/// and relation wiring in the generic repository layer.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Model name used in error messages
    const NAME: &'static str;

    /// Data-source table holding this entity
    const TABLE: &'static str;

    /// Stored properties a filter may reference (including `id`)
    const PROPERTIES: &'static [&'static str];

    /// Relation names accepted by `include`
    const RELATIONS: &'static [&'static str];

    /// Foreign keys checked before every write
    const FOREIGN_KEYS: &'static [ForeignKey<Self>];

    fn id(&self) -> i64;
}

/// Foreign key column on entity `E` pointing at another entity's id
pub struct ForeignKey<E> {
    /// Property name on `E`
    pub field: &'static str,
    /// Name of the referenced entity
    pub target: &'static str,
    /// Table of the referenced entity
    pub target_table: &'static str,
    /// Reads the key from a loaded record
    pub get: fn(&E) -> Option<i64>,
}

impl<E> Clone for ForeignKey<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ForeignKey<E> {}

impl<E> std::fmt::Debug for ForeignKey<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignKey")
            .field("field", &self.field)
            .field("target", &self.target)
            .field("target_table", &self.target_table)
            .finish()
    }
}
