//! Single-slot background execution of long running commands.
//!
//! At most one task runs at a time on a dedicated worker thread. The slot
//! holds the cancel action of the running task; whoever takes it out of the
//! slot (a `stop` command, a timer, the worker after a failure) is the one
//! who runs it, so every cancel action runs at most once.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::anyhow;
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;

/// Asks a running task to finish early.
pub type CancelAction = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// Receives failures of background work and of cancel actions.
pub type ErrorSink = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

type Job = Box<dyn FnOnce() + Send>;

struct Running {
    id: u64,
    cancel: CancelAction,
}

struct Slot {
    running: Mutex<Option<Running>>,
    sink: ErrorSink,
}

impl Slot {
    fn take(&self) -> Option<Running> {
        self.running.lock().take()
    }

    fn take_if(&self, id: u64) -> Option<Running> {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| r.id == id) {
            running.take()
        } else {
            None
        }
    }

    fn cancel(&self, running: Running) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(running.cancel))
            .unwrap_or_else(|payload| Err(anyhow!("cancel action panicked: {}", panic_message(&*payload))));
        if let Err(e) = outcome {
            (self.sink)(&e.context("failed to stop background task"));
        }
    }

    fn stop(&self, id: Option<u64>) -> bool {
        let running = match id {
            Some(id) => self.take_if(id),
            None => self.take(),
        };
        match running {
            Some(running) => {
                log::debug!("stopping background task {}", running.id);
                self.cancel(running);
                true
            }
            None => false,
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs one task at a time on a background thread.
pub struct BackgroundTaskManager {
    slot: Arc<Slot>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    next_id: AtomicU64,
}

impl BackgroundTaskManager {
    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn new(sink: ErrorSink) -> std::io::Result<Self> {
        let (jobs, queue) = unbounded::<Job>();
        let worker = thread::Builder::new()
            .name("uci-background".to_string())
            .spawn(move || {
                for job in queue {
                    job();
                }
            })?;

        Ok(BackgroundTaskManager {
            slot: Arc::new(Slot {
                running: Mutex::new(None),
                sink,
            }),
            jobs: Some(jobs),
            worker: Some(worker),
            next_id: AtomicU64::new(1),
        })
    }

    /// Run `work` in the background unless a task is already running.
    ///
    /// `cancel` is kept until `work` returns and is called if a stop is
    /// requested in the meantime, or if `work` fails.
    ///
    /// # Returns
    ///
    /// `false` if another task occupies the slot; nothing is scheduled then.
    pub fn submit<W>(&self, work: W, cancel: CancelAction) -> bool
    where
        W: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.submit_with_stopper(|_| work(), cancel)
    }

    /// Like [`submit`](Self::submit), but `work` receives a stopper bound
    /// to this submission.
    ///
    /// The stopper only cancels this task. Once the task has left the slot
    /// (finished or stopped) it does nothing, even if another task runs.
    pub fn submit_with_stopper<W>(&self, work: W, cancel: CancelAction) -> bool
    where
        W: FnOnce(TaskStopper) -> anyhow::Result<()> + Send + 'static,
    {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut running = self.slot.running.lock();
            if running.is_some() {
                return false;
            }
            *running = Some(Running { id, cancel });
        }

        let slot = Arc::clone(&self.slot);
        let own_stopper = TaskStopper {
            slot: Arc::clone(&self.slot),
            id: Some(id),
        };
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(own_stopper)))
                .unwrap_or_else(|payload| {
                    Err(anyhow!("background task panicked: {}", panic_message(&*payload)))
                });
            let pending = slot.take_if(id);
            if let Err(e) = outcome {
                (slot.sink)(&e);
                if let Some(running) = pending {
                    slot.cancel(running);
                }
            }
        });

        if jobs.send(job).is_err() {
            log::error!("background worker is gone, task {id} dropped");
            self.slot.take_if(id);
            return false;
        }
        log::debug!("background task {id} submitted");
        true
    }

    /// Stop the running task, if any.
    ///
    /// The cancel action runs on the calling thread; its failures go to the
    /// error sink.
    ///
    /// # Returns
    ///
    /// Whether a task was running.
    pub fn request_stop(&self) -> bool {
        self.slot.stop(None)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.slot.running.lock().is_some()
    }

    /// A handle that can stop the running task from another thread.
    #[must_use]
    pub fn stopper(&self) -> TaskStopper {
        TaskStopper {
            slot: Arc::clone(&self.slot),
            id: None,
        }
    }

    /// Stop the running task and wait for the worker to exit.
    pub fn close(&mut self) {
        self.request_stop();
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("background worker panicked");
            }
        }
    }
}

impl Drop for BackgroundTaskManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Stops a task of the manager it came from.
///
/// A stopper from [`BackgroundTaskManager::stopper`] stops whatever is
/// running; one handed to the work of
/// [`BackgroundTaskManager::submit_with_stopper`] only stops that work.
#[derive(Clone)]
pub struct TaskStopper {
    slot: Arc<Slot>,
    id: Option<u64>,
}

impl TaskStopper {
    /// Same as [`BackgroundTaskManager::request_stop`], limited to the bound
    /// task if there is one.
    pub fn request_stop(&self) -> bool {
        self.slot.stop(self.id)
    }
}
