//! Resource store module
//!
//! The dispatcher talks to documents only through the [`ResourceStore`]
//! trait. A store is indexed by resource name; [`Collection`] is the
//! capability set (list, get, create, update, delete) for one resource.

mod filter;
mod json;
#[cfg(test)]
pub mod testing;

pub use json::JsonStore;

use serde_json::{Map, Value};
use thiserror::Error;

/// One JSON object belonging to a resource
pub type Document = Map<String, Value>;

/// Merged query/body data: filters for listing, fields for writes
pub type ParamMap = Map<String, Value>;

/// Identity field of every document
pub const ID_FIELD: &str = "id";

/// How an update applies its fields to an existing document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// PUT: the fields become the document (identity kept)
    Replace,
    /// PATCH: the fields are deep-merged into the document
    Merge,
}

/// Policy for updates that target an id the store does not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Answer "not found"
    Reject,
    /// Create the document under the requested id
    Upsert,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{resource}/{id} not found")]
    NotFound { resource: String, id: String },

    #[error("invalid resource name '{0}'")]
    InvalidResource(String),

    #[error("collection '{0}' is not a list of documents")]
    Corrupt(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn not_found(resource: &str, id: &str) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

/// CRUD + filter operations over named collections of JSON documents.
///
/// Implementations serialize mutations so id assignment and writes never
/// interleave; reads may run concurrently.
pub trait ResourceStore: Send + Sync {
    /// Documents of `resource` whose fields match every entry of `filter`.
    /// An unknown resource is an empty list.
    fn filter(&self, resource: &str, filter: &ParamMap) -> Result<Vec<Document>, StoreError>;

    fn get(&self, resource: &str, id: &str) -> Result<Document, StoreError>;

    /// Store a new document with a store-assigned id
    fn create(&self, resource: &str, fields: &ParamMap) -> Result<Document, StoreError>;

    fn update(
        &self,
        resource: &str,
        id: &str,
        fields: &ParamMap,
        mode: UpdateMode,
        missing: MissingPolicy,
    ) -> Result<Document, StoreError>;

    /// Remove a document, returning it
    fn delete(&self, resource: &str, id: &str) -> Result<Document, StoreError>;
}

/// Handle on one named collection of a store
pub struct Collection<'a> {
    store: &'a dyn ResourceStore,
    name: &'a str,
}

impl<'a> Collection<'a> {
    /// Open the collection `name`, rejecting malformed resource names
    pub fn open(store: &'a dyn ResourceStore, name: &'a str) -> Result<Self, StoreError> {
        validate_resource_name(name)?;
        Ok(Self { store, name })
    }

    pub fn list(&self, filter: &ParamMap) -> Result<Vec<Document>, StoreError> {
        self.store.filter(self.name, filter)
    }

    pub fn get(&self, id: &str) -> Result<Document, StoreError> {
        self.store.get(self.name, id)
    }

    pub fn create(&self, fields: &ParamMap) -> Result<Document, StoreError> {
        self.store.create(self.name, fields)
    }

    pub fn update(
        &self,
        id: &str,
        fields: &ParamMap,
        mode: UpdateMode,
        missing: MissingPolicy,
    ) -> Result<Document, StoreError> {
        self.store.update(self.name, id, fields, mode, missing)
    }

    pub fn delete(&self, id: &str) -> Result<Document, StoreError> {
        self.store.delete(self.name, id)
    }
}

/// Resource names are non-empty ASCII words (`A-Z a-z 0-9 _ - .`)
pub fn validate_resource_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidResource(name.to_string()))
    }
}

/// Textual form of an id value; stored ids may be strings or numbers
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Recursively overlay `overlay` onto `base`: maps merge key by key,
/// any other value on the right replaces the left.
pub fn deep_merge(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (base.get_mut(key), value)
        {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}
