use std::rc::Rc;

use crate::database::{Database, OpenCallback};
use crate::registry::ConnectionRegistry;
use crate::scheduler::Scheduler;

/// The driver environment: one scheduler and one connection registry.
///
/// Created once at process start; tests create a fresh `Driver` each for
/// isolated registries and task queues.
pub struct Driver {
    scheduler: Rc<Scheduler>,
    registry: ConnectionRegistry,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scheduler: Scheduler::new(),
            registry: ConnectionRegistry::new(),
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Open a database, uncached.
    #[must_use]
    pub fn open(&self, target: &str, mode: Option<i32>, callback: Option<OpenCallback>) -> Database {
        Database::open(&self.scheduler, target, mode, callback)
    }

    /// Open a database through the path-keyed connection cache.
    #[must_use]
    pub fn open_cached(
        &self,
        target: &str,
        mode: Option<i32>,
        callback: Option<OpenCallback>,
    ) -> Database {
        self.registry.open(&self.scheduler, target, mode, callback)
    }

    /// Run every deferred callback, including ones deferred while draining.
    pub fn run_until_idle(&self) {
        self.scheduler.run_until_idle();
    }
}
