// JSON document store
// Keeps a json-server style database ({"Resource": [docs...]}) in memory,
// optionally mirrored to a file after every successful mutation.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

use super::{
    deep_merge, filter, id_text, Document, MissingPolicy, ParamMap, ResourceStore, StoreError,
    UpdateMode, ID_FIELD,
};

/// Document store backed by a single JSON object
pub struct JsonStore {
    /// resource name -> array of documents
    data: RwLock<Map<String, Value>>,
    /// Database file (in-memory only if not set)
    path: Option<PathBuf>,
    pretty: bool,
}

impl JsonStore {
    /// Create an empty store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(Map::new()),
            path: None,
            pretty: false,
        }
    }

    /// Open a file-backed store; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>, pretty: bool) -> Result<Self, StoreError> {
        let path = path.into();
        let data = Self::load(&path)?;
        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
            pretty,
        })
    }

    /// Build an in-memory store from an existing database object
    #[cfg(test)]
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(data) => Ok(Self {
                data: RwLock::new(data),
                path: None,
                pretty: false,
            }),
            _ => Err(StoreError::Corrupt("<root>".to_string())),
        }
    }

    /// Load the database from file
    fn load(path: &Path) -> Result<Map<String, Value>, StoreError> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read(path)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        match serde_json::from_slice(&content)? {
            Value::Object(data) => Ok(data),
            _ => Err(StoreError::Corrupt("<root>".to_string())),
        }
    }

    /// Write the database to file via a temporary sibling and rename
    fn persist(&self, data: &Map<String, Value>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = if self.pretty {
            serde_json::to_vec_pretty(data)?
        } else {
            serde_json::to_vec(data)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Run `op` on one collection under the write lock.
    ///
    /// The collection is restored if `op` or the file write fails, so the
    /// in-memory state never runs ahead of the file.
    fn mutate<T>(
        &self,
        resource: &str,
        op: impl FnOnce(&mut Vec<Value>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().map_err(|_| StoreError::LockPoisoned)?;
        let previous = data.get(resource).cloned();

        let entry = data
            .entry(resource.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(docs) = entry else {
            return Err(StoreError::Corrupt(resource.to_string()));
        };

        let result = op(docs).and_then(|value| self.persist(&data).map(|()| value));
        if result.is_err() {
            match previous {
                Some(collection) => {
                    data.insert(resource.to_string(), collection);
                }
                None => {
                    data.shift_remove(resource);
                }
            }
        }
        result
    }

    /// Run `op` on one collection under the read lock; unknown collections
    /// are seen as empty
    fn read<T>(&self, resource: &str, op: impl FnOnce(&[Value]) -> T) -> Result<T, StoreError> {
        let data = self.data.read().map_err(|_| StoreError::LockPoisoned)?;
        match data.get(resource) {
            None => Ok(op(&[])),
            Some(Value::Array(docs)) => Ok(op(docs)),
            Some(_) => Err(StoreError::Corrupt(resource.to_string())),
        }
    }
}

fn position(docs: &[Value], id: &str) -> Option<usize> {
    docs.iter().position(|doc| {
        doc.get(ID_FIELD)
            .and_then(id_text)
            .is_some_and(|stored| stored == id)
    })
}

/// New document with the identity field first and `fields` after it
fn with_id(id: Value, fields: &ParamMap) -> Document {
    let mut doc = Map::with_capacity(fields.len() + 1);
    doc.insert(ID_FIELD.to_string(), id);
    for (key, value) in fields {
        if key != ID_FIELD {
            doc.insert(key.clone(), value.clone());
        }
    }
    doc
}

fn as_document(value: &Value) -> Option<Document> {
    value.as_object().cloned()
}

impl ResourceStore for JsonStore {
    fn filter(&self, resource: &str, filter: &ParamMap) -> Result<Vec<Document>, StoreError> {
        self.read(resource, |docs| {
            docs.iter()
                .filter_map(Value::as_object)
                .filter(|doc| filter::matches(doc, filter))
                .cloned()
                .collect()
        })
    }

    fn get(&self, resource: &str, id: &str) -> Result<Document, StoreError> {
        self.read(resource, |docs| {
            position(docs, id).and_then(|i| as_document(&docs[i]))
        })?
        .ok_or_else(|| StoreError::not_found(resource, id))
    }

    fn create(&self, resource: &str, fields: &ParamMap) -> Result<Document, StoreError> {
        self.mutate(resource, |docs| {
            let doc = with_id(Value::String(Uuid::new_v4().to_string()), fields);
            docs.push(Value::Object(doc.clone()));
            Ok(doc)
        })
    }

    fn update(
        &self,
        resource: &str,
        id: &str,
        fields: &ParamMap,
        mode: UpdateMode,
        missing: MissingPolicy,
    ) -> Result<Document, StoreError> {
        self.mutate(resource, |docs| {
            let Some(index) = position(docs, id) else {
                return match missing {
                    MissingPolicy::Reject => Err(StoreError::not_found(resource, id)),
                    MissingPolicy::Upsert => {
                        let doc = with_id(Value::String(id.to_string()), fields);
                        docs.push(Value::Object(doc.clone()));
                        Ok(doc)
                    }
                };
            };

            // Keep the stored id as-is (a numeric id stays numeric)
            let stored_id = docs[index]
                .get(ID_FIELD)
                .cloned()
                .unwrap_or_else(|| Value::String(id.to_string()));

            let doc = match mode {
                UpdateMode::Replace => with_id(stored_id, fields),
                UpdateMode::Merge => {
                    let mut doc = as_document(&docs[index]).unwrap_or_default();
                    deep_merge(&mut doc, fields);
                    doc.insert(ID_FIELD.to_string(), stored_id);
                    doc
                }
            };

            docs[index] = Value::Object(doc.clone());
            Ok(doc)
        })
    }

    fn delete(&self, resource: &str, id: &str) -> Result<Document, StoreError> {
        self.mutate(resource, |docs| {
            let index = position(docs, id).ok_or_else(|| StoreError::not_found(resource, id))?;
            let removed = docs.remove(index);
            Ok(as_document(&removed).unwrap_or_default())
        })
    }
}
