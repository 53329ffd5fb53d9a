//! Command dispatch
//!
//! Maps a normalized [`Command`] onto one store operation:
//!
//! | Method    | id  | Operation | Status |
//! |-----------|-----|-----------|--------|
//! | GET       | no  | list      | 200    |
//! | GET       | yes | get       | 200    |
//! | POST      | no  | create    | 201    |
//! | PUT/PATCH | yes | update    | 200    |
//! | DELETE    | yes | delete    | 200    |
//!
//! Every other combination is rejected before the store is touched.

use hyper::StatusCode;
use serde_json::Value;

use super::normalize::{Command, CommandMethod};
use crate::error::ApiError;
use crate::store::{Collection, MissingPolicy, ResourceStore, UpdateMode};

/// Successful dispatch result
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub payload: Value,
}

impl Reply {
    const fn new(status: StatusCode, payload: Value) -> Self {
        Self { status, payload }
    }
}

pub struct Dispatcher<'a> {
    store: &'a dyn ResourceStore,
    missing: MissingPolicy,
}

impl<'a> Dispatcher<'a> {
    pub fn new(store: &'a dyn ResourceStore, missing: MissingPolicy) -> Self {
        Self { store, missing }
    }

    pub fn dispatch(&self, cmd: &Command) -> Result<Reply, ApiError> {
        match (cmd.method(), cmd.id()) {
            (CommandMethod::Get, None) => {
                let docs = self.collection(cmd)?.list(cmd.params())?;
                let docs = docs.into_iter().map(Value::Object).collect();
                Ok(Reply::new(StatusCode::OK, Value::Array(docs)))
            }
            (CommandMethod::Get, Some(id)) => {
                let doc = self.collection(cmd)?.get(id)?;
                Ok(Reply::new(StatusCode::OK, Value::Object(doc)))
            }
            (CommandMethod::Post, None) => {
                let doc = self.collection(cmd)?.create(cmd.params())?;
                Ok(Reply::new(StatusCode::CREATED, Value::Object(doc)))
            }
            (CommandMethod::Put | CommandMethod::Patch, Some(id)) => {
                let mode = if *cmd.method() == CommandMethod::Put {
                    UpdateMode::Replace
                } else {
                    UpdateMode::Merge
                };
                let doc = self
                    .collection(cmd)?
                    .update(id, cmd.params(), mode, self.missing)?;
                Ok(Reply::new(StatusCode::OK, Value::Object(doc)))
            }
            (CommandMethod::Delete, Some(id)) => {
                let doc = self.collection(cmd)?.delete(id)?;
                Ok(Reply::new(StatusCode::OK, Value::Object(doc)))
            }
            (CommandMethod::Post, Some(_)) => Err(ApiError::UnsupportedOperation(format!(
                "POST /{} does not take a target id",
                cmd.resource()
            ))),
            (CommandMethod::Put | CommandMethod::Patch | CommandMethod::Delete, None) => {
                Err(ApiError::UnsupportedOperation(format!(
                    "an id is required for {:?} /{}",
                    cmd.method(),
                    cmd.resource()
                )))
            }
            (CommandMethod::Other(method), _) => Err(ApiError::UnsupportedOperation(format!(
                "method {method} is not supported"
            ))),
        }
    }

    fn collection<'c>(&self, cmd: &'c Command) -> Result<Collection<'c>, ApiError>
    where
        'a: 'c,
    {
        Collection::open(self.store, cmd.resource()).map_err(ApiError::from)
    }
}
