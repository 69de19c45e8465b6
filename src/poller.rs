//! Polling engine.
//!
//! One poller owns one fetch key. Each cycle stamps itself with the key's
//! current epoch before fetching; if the epoch moved while the fetch was
//! in flight (a dependency changed), the late result is discarded instead
//! of overwriting newer state. Snapshots go out wholesale over a watch
//! channel: a single writer per key, any number of readers, no
//! field-by-field merging ever.

use anyhow::Error;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One published state of a fetch key.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub value: T,
    /// Error of the cycle that produced this snapshot, if it failed
    pub error: Option<Arc<Error>>,
    /// Epoch the producing cycle ran under
    pub epoch: u64,
    /// True until the first cycle settles
    pub is_loading: bool,
}

impl<T: Default> Snapshot<T> {
    fn loading() -> Self {
        Self { value: T::default(), error: None, epoch: 0, is_loading: true }
    }
}

impl<T> Snapshot<T> {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Handle to a running poller. Dropping it aborts the task; the watch
/// channel keeps serving the last snapshot to existing readers.
pub struct PollerHandle<T> {
    epoch: Arc<AtomicU64>,
    notify: Arc<Notify>,
    receiver: watch::Receiver<Snapshot<T>>,
    task: JoinHandle<()>,
}

impl<T> PollerHandle<T> {
    /// A fresh reader of the snapshot stream.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.receiver.clone()
    }

    /// Dependency change: bump the epoch so any in-flight cycle is
    /// discarded, then wake the loop for an immediate refetch.
    pub fn refresh(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Current epoch, visible on every published snapshot.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

impl<T> Drop for PollerHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a polling loop for `fetch`.
///
/// Every `interval` (and immediately on `refresh`) the loop runs one
/// cycle. A successful cycle publishes the fetched value; a failed cycle
/// resets the value to `T::default()` and surfaces the error; the next
/// tick retries on its own, with no backoff. Either way the snapshot is
/// published only if the epoch is unchanged since the cycle started.
pub fn spawn_poller<T, F, Fut>(name: &'static str, interval: Duration, fetch: F) -> PollerHandle<T>
where
    T: Clone + Default + Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, Error>> + Send,
{
    let epoch = Arc::new(AtomicU64::new(0));
    let notify = Arc::new(Notify::new());
    let (sender, receiver) = watch::channel(Snapshot::loading());

    let task = tokio::spawn({
        let epoch = Arc::clone(&epoch);
        let notify = Arc::clone(&notify);
        async move {
            loop {
                let cycle_epoch = epoch.load(Ordering::SeqCst);
                let result = fetch().await;

                if epoch.load(Ordering::SeqCst) != cycle_epoch {
                    debug!("{}: discarding stale cycle (epoch moved)", name);
                } else {
                    let snapshot = match result {
                        Ok(value) => Snapshot {
                            value,
                            error: None,
                            epoch: cycle_epoch,
                            is_loading: false,
                        },
                        Err(err) => {
                            warn!("{}: poll cycle failed: {:#}", name, err);
                            Snapshot {
                                value: T::default(),
                                error: Some(Arc::new(err)),
                                epoch: cycle_epoch,
                                is_loading: false,
                            }
                        }
                    };
                    if sender.send(snapshot).is_err() {
                        // nobody is listening anymore
                        break;
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = notify.notified() => {
                        debug!("{}: woken for immediate refetch", name);
                    }
                }
            }
        }
    });

    PollerHandle { epoch, notify, receiver, task }
}
