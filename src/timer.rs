//! Cancellable deadline timers.
//!
//! A timer runs an action on its own thread once a duration has elapsed,
//! unless it is cancelled first. Cancellation joins the timer thread, so
//! once [`DeadlineTimer::cancel`] returns the action has either finished
//! or will never run.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// Calculate the duration from now until a deadline, if the deadline is in the future.
///
/// Returns `None` if the deadline has already passed.
#[inline]
fn duration_until(deadline: Instant) -> Option<Duration> {
    let now = Instant::now();
    if deadline > now {
        Some(deadline - now)
    } else {
        None
    }
}

pub struct DeadlineTimer {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    /// Start a timer that runs `action` after `duration`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer thread cannot be spawned.
    pub fn start<F>(duration: Duration, action: F) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel, cancelled) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("deadline-timer".to_string())
            .spawn(move || {
                // A disconnect means the owner cancelled before the deadline.
                if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(duration) {
                    log::debug!("deadline of {} ms reached", duration.as_millis());
                    action();
                }
            })?;

        Ok(DeadlineTimer {
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }

    /// Start a timer that runs `action` at `deadline`.
    ///
    /// A deadline in the past runs the action immediately on the calling
    /// thread and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer thread cannot be spawned.
    pub fn start_at<F>(deadline: Instant, action: F) -> std::io::Result<Option<Self>>
    where
        F: FnOnce() + Send + 'static,
    {
        match duration_until(deadline) {
            Some(duration) => Self::start(duration, action).map(Some),
            None => {
                action();
                Ok(None)
            }
        }
    }

    /// Cancel the timer and wait for its thread to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("deadline timer action panicked");
            }
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::StopFlag;

    #[test]
    fn test_timer_triggers() {
        let flag = StopFlag::new();
        let remote = flag.clone();
        let timer = DeadlineTimer::start(Duration::from_millis(20), move || remote.stop())
            .expect("timer thread");

        thread::sleep(Duration::from_millis(200));
        assert!(flag.is_stopped());
        timer.cancel();
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let flag = StopFlag::new();
        let remote = flag.clone();
        let timer = DeadlineTimer::start(Duration::from_millis(100), move || remote.stop())
            .expect("timer thread");
        timer.cancel();

        thread::sleep(Duration::from_millis(200));
        assert!(!flag.is_stopped());
    }

    #[test]
    fn test_dropped_timer_never_fires() {
        let flag = StopFlag::new();
        let remote = flag.clone();
        {
            let _timer = DeadlineTimer::start(Duration::from_millis(100), move || remote.stop())
                .expect("timer thread");
        }
        thread::sleep(Duration::from_millis(200));
        assert!(!flag.is_stopped());
    }

    #[test]
    fn test_deadline_in_past() {
        let flag = StopFlag::new();
        let remote = flag.clone();
        let past = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .expect("1 second ago should be valid");
        let timer = DeadlineTimer::start_at(past, move || remote.stop()).expect("no spawn needed");
        assert!(timer.is_none());
        assert!(flag.is_stopped());
    }
}
