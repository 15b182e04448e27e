//! Path-keyed connection cache.
//!
//! The legacy contract shares one connection per database file: every open
//! of the same file, under any spelling of its path, must yield the same
//! handle. The registry is an explicit, injectable value rather than
//! process-global state, so tests run with isolated registries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::database::{Database, MEMORY, OpenCallback};
use crate::error::DriverError;
use crate::flags::{OPEN_DEFAULT, OpenOptions};
use crate::scheduler::Scheduler;

enum SlotState {
    /// Engine open has completed but the open event has not fired yet;
    /// callbacks queue here until it does.
    Opening { waiters: Vec<OpenCallback> },
    Ready,
}

struct Slot {
    db: Database,
    state: SlotState,
}

#[derive(Default)]
struct RegistryInner {
    slots: RefCell<HashMap<PathBuf, Rc<RefCell<Slot>>>>,
}

/// Maps a canonical file path to a single shared connection handle.
///
/// In-memory databases are never cached; each open of the memory sentinel
/// constructs a fresh, private handle.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Rc<RegistryInner>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a database through the cache.
    ///
    /// A first open constructs the connection and fires the callback on a
    /// later tick. A later open of the same canonical path returns the
    /// cached handle: immediately schedulable if the open event already
    /// fired, otherwise queued behind it, so no caller observes a handle
    /// before it is open. A failed open is surfaced through the callback
    /// and leaves no cache entry, so a retry starts clean.
    pub fn open(
        &self,
        scheduler: &Rc<Scheduler>,
        target: &str,
        mode: Option<i32>,
        callback: Option<OpenCallback>,
    ) -> Database {
        if target == MEMORY {
            return Database::open(scheduler, target, mode, callback);
        }

        let key = canonical_key(Path::new(target));
        let existing = self.inner.slots.borrow().get(&key).cloned();
        if let Some(slot_rc) = existing {
            let mut slot = slot_rc.borrow_mut();
            debug!(path = target, "connection cache hit");
            match &mut slot.state {
                SlotState::Opening { waiters } => {
                    if let Some(cb) = callback {
                        waiters.push(cb);
                    }
                }
                SlotState::Ready => {
                    if let Some(cb) = callback {
                        scheduler.defer(move || cb(ExecutionContext::default(), Ok(())));
                    }
                }
            }
            return slot.db.clone();
        }

        let opts = OpenOptions::decode(mode.unwrap_or(OPEN_DEFAULT));
        match Database::open_engine(target, opts) {
            Err(err) => {
                let db = Database::from_engine(scheduler.clone(), target, None);
                match callback {
                    Some(cb) => scheduler.defer(move || cb(ExecutionContext::default(), Err(err))),
                    None => warn!(path = target, error = %err, "cached open failed"),
                }
                db
            }
            Ok(engine) => {
                debug!(path = target, key = %key.display(), "connection cached");
                let db = Database::from_engine(scheduler.clone(), target, Some(engine));

                let registry = Rc::downgrade(&self.inner);
                let evict_key = key.clone();
                db.set_evict_hook(move || {
                    if let Some(inner) = registry.upgrade() {
                        inner.slots.borrow_mut().remove(&evict_key);
                    }
                });

                let slot = Rc::new(RefCell::new(Slot {
                    db: db.clone(),
                    state: SlotState::Opening {
                        waiters: callback.into_iter().collect(),
                    },
                }));
                self.inner.slots.borrow_mut().insert(key, slot.clone());

                // the open event: flip to ready, then release the waiters in
                // arrival order. A close issued before this tick takes the
                // engine away; the waiters then get an error, not a handle
                // that is already dead.
                scheduler.defer(move || {
                    let (waiters, open) = {
                        let mut slot = slot.borrow_mut();
                        let waiters =
                            match std::mem::replace(&mut slot.state, SlotState::Ready) {
                                SlotState::Opening { waiters } => waiters,
                                SlotState::Ready => Vec::new(),
                            };
                        (waiters, slot.db.is_open())
                    };
                    for cb in waiters {
                        let outcome = if open {
                            Ok(())
                        } else {
                            Err(DriverError::DatabaseClosed)
                        };
                        cb(ExecutionContext::default(), outcome);
                    }
                });
                db
            }
        }
    }

    /// Number of cached connections.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }
}

/// Resolve a path to its canonical, symlink-free absolute form.
///
/// Two different relative or symlinked spellings of one file must land on
/// the same cache key. When the file does not exist yet, its parent is
/// canonicalized instead and the file name re-attached.
fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if let (Some(dir), Some(name)) = (absolute.parent(), absolute.file_name()) {
        if let Ok(dir) = std::fs::canonicalize(dir) {
            return dir.join(name);
        }
    }
    absolute
}
