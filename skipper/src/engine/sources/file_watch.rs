//! A file-watching `DataClient` (spec.md §1: "eskip file watcher" as a
//! minimal reference client). The eskip grammar itself is out of scope —
//! this client is generic over a `parse` function that turns file contents
//! into routes, so it works for eskip text, JSON, or any other on-disk
//! format a caller supplies.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::route::{RouteId, RouteSpec};

use super::super::data_client::{DataClient, DataClientError};

pub type ParseFn = Arc<dyn Fn(&str) -> Result<Vec<RouteSpec>, String> + Send + Sync>;

pub struct FileWatchDataClient {
    name: String,
    path: PathBuf,
    parse: ParseFn,
    last: Mutex<HashMap<RouteId, RouteSpec>>,
    dirty: Arc<AtomicBool>,
    // Held only to keep the OS watch alive for the client's lifetime.
    _watcher: Option<RecommendedWatcher>,
}

impl FileWatchDataClient {
    pub fn new(name: impl Into<String>, path: PathBuf, parse: ParseFn) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let watcher = spawn_watcher(&path, dirty.clone());
        Self {
            name: name.into(),
            path,
            parse,
            last: Mutex::new(HashMap::new()),
            dirty,
            _watcher: watcher,
        }
    }

    fn read_and_parse(&self) -> Result<Vec<RouteSpec>, DataClientError> {
        let text = std::fs::read_to_string(&self.path).map_err(|err| DataClientError::Transient {
            source: self.name.clone(),
            reason: format!("reading {:?}: {err}", self.path),
        })?;
        (self.parse)(&text).map_err(|reason| DataClientError::Transient {
            source: self.name.clone(),
            reason,
        })
    }
}

fn spawn_watcher(path: &PathBuf, dirty: Arc<AtomicBool>) -> Option<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            dirty.store(true, Ordering::Relaxed);
        }
    })
    .ok()?;
    watcher.watch(path, RecursiveMode::NonRecursive).ok()?;
    Some(watcher)
}

#[async_trait]
impl DataClient for FileWatchDataClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_all(&self) -> Result<Vec<RouteSpec>, DataClientError> {
        let routes = self.read_and_parse()?;
        let mut last = self.last.lock().expect("file watch mutex poisoned");
        *last = routes.iter().map(|r| (r.id.clone(), r.clone())).collect();
        self.dirty.store(false, Ordering::Relaxed);
        Ok(routes)
    }

    async fn load_update(&self) -> Result<(Vec<RouteSpec>, Vec<String>), DataClientError> {
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok((Vec::new(), Vec::new()));
        }

        let routes = self.read_and_parse()?;
        let mut last = self.last.lock().expect("file watch mutex poisoned");

        let fresh: HashMap<RouteId, RouteSpec> =
            routes.iter().map(|r| (r.id.clone(), r.clone())).collect();
        let deletes: Vec<String> = last
            .keys()
            .filter(|id| !fresh.contains_key(*id))
            .map(|id| id.to_string())
            .collect();

        *last = fresh;
        Ok((routes, deletes))
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::BackendSpec;

    fn noop_parse() -> ParseFn {
        Arc::new(|_text: &str| {
            Ok(vec![RouteSpec {
                id: "r".into(),
                predicates: vec![],
                filters: vec![],
                backend: BackendSpec::Shunt,
            }])
        })
    }

    #[tokio::test]
    async fn load_all_reads_and_parses_the_file() {
        let dir = std::env::temp_dir().join(format!("skipper-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("routes.eskip");
        std::fs::write(&path, "anything").unwrap();

        let client = FileWatchDataClient::new("file", path.clone(), noop_parse());
        let routes = client.load_all().await.unwrap();
        assert_eq!(routes.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
