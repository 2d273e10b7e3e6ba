//! A static, in-memory `DataClient` (spec.md §1: "inline-route parser" as a
//! minimal reference client). Its route set never changes after
//! construction, so `load_update` always reports an empty delta.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::route::RouteSpec;

use super::super::data_client::{DataClient, DataClientError};

pub struct InlineDataClient {
    name: String,
    routes: Mutex<Vec<RouteSpec>>,
}

impl InlineDataClient {
    pub fn new(name: impl Into<String>, routes: Vec<RouteSpec>) -> Self {
        Self {
            name: name.into(),
            routes: Mutex::new(routes),
        }
    }

    /// Replaces the whole route set; the next `load_update` reports it as a
    /// bulk upsert. Intended for tests and for embedding skipper as a
    /// library with programmatically-defined routes.
    pub fn replace(&self, routes: Vec<RouteSpec>) {
        *self.routes.lock().expect("inline data client mutex poisoned") = routes;
    }
}

#[async_trait]
impl DataClient for InlineDataClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_all(&self) -> Result<Vec<RouteSpec>, DataClientError> {
        Ok(self.routes.lock().expect("inline data client mutex poisoned").clone())
    }

    async fn load_update(&self) -> Result<(Vec<RouteSpec>, Vec<String>), DataClientError> {
        Ok((Vec::new(), Vec::new()))
    }

    async fn close(&self) {}
}
