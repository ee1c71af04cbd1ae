//! Latest dispatch results

use parking_lot::RwLock;
use std::sync::Arc;

use crate::hook::dispatch::DispatchLog;

/// Single slot holding the most recent dispatch log.
///
/// Replacing swaps the whole log at once; readers get either the old log or
/// the new one, never a mix.
#[derive(Debug, Default)]
pub struct ResponseStore {
    current: RwLock<Arc<DispatchLog>>,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, log: DispatchLog) {
        *self.current.write() = Arc::new(log);
    }

    pub fn current(&self) -> Arc<DispatchLog> {
        self.current.read().clone()
    }
}
