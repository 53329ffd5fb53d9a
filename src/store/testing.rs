// Test doubles for the resource store

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    Document, JsonStore, MissingPolicy, ParamMap, ResourceStore, StoreError, UpdateMode,
};

/// Wraps an in-memory store and counts every call made to it
pub struct CountingStore {
    inner: JsonStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: JsonStore::in_memory(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl ResourceStore for CountingStore {
    fn filter(&self, resource: &str, filter: &ParamMap) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.filter(resource, filter)
    }

    fn get(&self, resource: &str, id: &str) -> Result<Document, StoreError> {
        self.hit();
        self.inner.get(resource, id)
    }

    fn create(&self, resource: &str, fields: &ParamMap) -> Result<Document, StoreError> {
        self.hit();
        self.inner.create(resource, fields)
    }

    fn update(
        &self,
        resource: &str,
        id: &str,
        fields: &ParamMap,
        mode: UpdateMode,
        missing: MissingPolicy,
    ) -> Result<Document, StoreError> {
        self.hit();
        self.inner.update(resource, id, fields, mode, missing)
    }

    fn delete(&self, resource: &str, id: &str) -> Result<Document, StoreError> {
        self.hit();
        self.inner.delete(resource, id)
    }
}

/// Every operation fails with a storage fault
pub struct FailingStore;

fn fault() -> StoreError {
    StoreError::Io(std::io::Error::other("disk unavailable"))
}

impl ResourceStore for FailingStore {
    fn filter(&self, _: &str, _: &ParamMap) -> Result<Vec<Document>, StoreError> {
        Err(fault())
    }

    fn get(&self, _: &str, _: &str) -> Result<Document, StoreError> {
        Err(fault())
    }

    fn create(&self, _: &str, _: &ParamMap) -> Result<Document, StoreError> {
        Err(fault())
    }

    fn update(
        &self,
        _: &str,
        _: &str,
        _: &ParamMap,
        _: UpdateMode,
        _: MissingPolicy,
    ) -> Result<Document, StoreError> {
        Err(fault())
    }

    fn delete(&self, _: &str, _: &str) -> Result<Document, StoreError> {
        Err(fault())
    }
}
