//! Push event handling: authorize, dispatch, record

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::event::PushEvent;
use crate::hook::HookRegistry;
use crate::hook::dispatch::{DispatchLog, Dispatcher};
use crate::policy::{PolicySet, Rejection};
use crate::store::ResponseStore;

pub struct RequestHandler {
    hooks: HookRegistry,
    policies: PolicySet,
    dispatcher: Dispatcher,
    store: ResponseStore,
    // Held for a whole dispatch; hooks may share local state
    dispatch_lock: Mutex<()>,
}

impl RequestHandler {
    pub fn new(hooks: HookRegistry, policies: PolicySet, dispatcher: Dispatcher) -> Self {
        Self {
            hooks,
            policies,
            dispatcher,
            store: ResponseStore::new(),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Authorize `event` and, if allowed, run every hook with its tag.
    ///
    /// Rejected events leave the stored log untouched.
    pub async fn handle(&self, event: &PushEvent) -> Result<DispatchLog, Rejection> {
        let tag = match self.policies.authorize(event) {
            Ok(tag) => tag,
            Err(rejection) => {
                log::info!("Rejected push event: {}", rejection);
                return Err(rejection);
            }
        };

        let _guard = self.dispatch_lock.lock().await;

        log::info!(
            "Dispatching {} hooks for {} (tag {})",
            self.hooks.len(),
            event.repository.as_deref().unwrap_or_default(),
            tag
        );
        let log = self.dispatcher.run(self.hooks.hooks(), &tag).await;

        let failed = log.iter().filter(|(_, result)| !result.success()).count();
        log::info!("Dispatch finished: {} hooks, {} failed", log.len(), failed);

        self.store.replace(log.clone());

        Ok(log)
    }

    /// The latest dispatch log, without dispatching
    pub fn peek(&self) -> Arc<DispatchLog> {
        self.store.current()
    }
}
