//! Cancellable units of engine work.

use std::fmt;

use super::EngineError;
use crate::sync::StopFlag;

type Job<T> = Box<dyn FnOnce(&StopFlag) -> Result<T, EngineError> + Send>;

/// A computation that runs on the caller's thread when [`get`](Self::get)
/// is called and can be asked to finish early from any thread.
///
/// The job polls the [`StopFlag`] it is given and is expected to return
/// its best result so far shortly after the flag is set.
pub struct LongRunningTask<T> {
    stop: StopFlag,
    job: Job<T>,
}

impl<T> LongRunningTask<T> {
    pub fn new<F>(job: F) -> Self
    where
        F: FnOnce(&StopFlag) -> Result<T, EngineError> + Send + 'static,
    {
        LongRunningTask {
            stop: StopFlag::new(),
            job: Box::new(job),
        }
    }

    /// Run the job to completion.
    ///
    /// # Errors
    ///
    /// Returns whatever error the job reports.
    pub fn get(self) -> Result<T, EngineError> {
        (self.job)(&self.stop)
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// A handle that stops this task from another thread.
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }
}

impl<T> fmt::Debug for LongRunningTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongRunningTask")
            .field("stopped", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}
