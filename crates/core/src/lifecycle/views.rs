use std::sync::{Arc, Mutex};

use tracing::debug;

/// Fire-and-forget invalidation of cached views.
pub trait ViewRefresher: Send + Sync {
    fn invalidate(&self, path: &str);
}

#[derive(Clone, Debug, Default)]
pub struct TracingViewRefresher;

impl ViewRefresher for TracingViewRefresher {
    fn invalidate(&self, path: &str) {
        debug!(event_name = "view.invalidated", path, "view invalidated");
    }
}

#[derive(Clone, Default)]
pub struct RecordingViewRefresher {
    paths: Arc<Mutex<Vec<String>>>,
}

impl RecordingViewRefresher {
    pub fn paths(&self) -> Vec<String> {
        match self.paths.lock() {
            Ok(paths) => paths.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ViewRefresher for RecordingViewRefresher {
    fn invalidate(&self, path: &str) {
        match self.paths.lock() {
            Ok(mut paths) => paths.push(path.to_string()),
            Err(poisoned) => poisoned.into_inner().push(path.to_string()),
        }
    }
}
