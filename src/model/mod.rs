//! Object-model collaborator: what the adapter needs from persisted objects.
//!
//! - `Model`: one live record (identity, plain-data snapshot, hydration)
//! - `ModelKind`: constructor for one named entity type
//! - `ModelRegistry`: identity assignment and in-memory bookkeeping

pub mod document;
pub mod registry;

pub use document::{Document, DocumentKind};
pub use registry::{MemoryRegistry, ModelRegistry};

use crate::db::ID_COLUMN;
use crate::error::DaoError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Plain-data bag: field name to JSON value.
pub type Record = Map<String, Value>;

/// A constructed, shareable object instance.
pub type Instance = Arc<dyn Model>;

#[async_trait]
pub trait Model: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// Full plain-data snapshot. Always contains `id`.
    fn to_record(&self) -> Record;

    /// Value for a native column of the same name.
    fn field(&self, name: &str) -> Option<Value> {
        self.to_record().remove(name)
    }

    /// Resolves once post-construction hydration is complete.
    async fn ready(&self) -> Result<(), DaoError> {
        Ok(())
    }
}

impl dyn Model {
    /// Deserialize the snapshot into a caller-side type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DaoError> {
        Ok(serde_json::from_value(Value::Object(self.to_record()))?)
    }
}

/// Constructor capability for one registered entity type.
pub trait ModelKind: Send + Sync {
    /// Kind name; also the backing table name.
    fn name(&self) -> &str;

    /// Build an instance from a plain-data bag that already carries an `id`.
    fn construct(&self, data: Record) -> Result<Instance, DaoError>;
}

/// Extract a usable id from a plain-data bag.
pub fn record_id(data: &Record) -> Option<&str> {
    data.get(ID_COLUMN)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}
