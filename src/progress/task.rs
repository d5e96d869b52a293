//! Supervised estimator task
//!
//! One background thread per phase. It ticks the estimator, writes the event,
//! then waits on its stop channel for one tick interval, so a stop request
//! wakes it immediately. Stopping is a request: the owner waits at most the
//! join timeout and then detaches the thread. Dropping the task stops it the
//! same way, which covers early returns and unwinding out of the foreign call.
//! Stopping also clears an active flag that the thread checks under the
//! emitter lock, so a detached thread never writes after the owner's next line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::emitter::ProgressEmitter;
use super::estimator::PhaseEstimator;

/// How a stop request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The thread finished within the timeout and was joined
    Joined,
    /// The thread did not finish in time and was detached
    TimedOut,
    /// Stop had already been requested
    AlreadyStopped,
}

/// Handle to a running estimator thread
#[derive(Debug)]
pub struct EstimatorTask {
    name: String,
    stop_tx: Option<Sender<()>>,
    done_rx: Receiver<()>,
    active: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl EstimatorTask {
    /// Start ticking `estimator` into `emitter` every `tick`
    pub fn spawn(
        name: &str,
        estimator: Arc<PhaseEstimator>,
        emitter: ProgressEmitter,
        tick: Duration,
        join_timeout: Duration,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let thread_name = format!("progress-{}", name);
        let active = Arc::new(AtomicBool::new(true));
        let thread_active = Arc::clone(&active);

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let started = Instant::now();
                loop {
                    let event = estimator.tick(started.elapsed());
                    if !emitter.emit_if(&thread_active, &event) {
                        break;
                    }

                    match stop_rx.recv_timeout(tick) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // Stop signal, or the owner went away
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                let _ = done_tx.send(());
            })?;

        debug!("[{}] started (tick {:?})", thread_name, tick);

        Ok(Self {
            name: thread_name,
            stop_tx: Some(stop_tx),
            done_rx,
            active,
            handle: Some(handle),
            join_timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request stop and wait up to the join timeout
    pub fn stop(mut self) -> StopOutcome {
        self.shutdown()
    }

    fn shutdown(&mut self) -> StopOutcome {
        let Some(handle) = self.handle.take() else {
            return StopOutcome::AlreadyStopped;
        };

        self.active.store(false, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        match self.done_rx.recv_timeout(self.join_timeout) {
            // Disconnected means the thread exited without reporting (panic)
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    warn!("[{}] panicked", self.name);
                }
                debug!("[{}] stopped", self.name);
                StopOutcome::Joined
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "[{}] did not stop within {:?}; detaching",
                    self.name, self.join_timeout
                );
                StopOutcome::TimedOut
            }
        }
    }
}

impl Drop for EstimatorTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeparatorConfig;
    use std::io::{self, Write};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stop_joins_promptly() {
        let capture = Capture::default();
        let estimator = Arc::new(PhaseEstimator::loading(&SeparatorConfig::default(), 3));
        let task = EstimatorTask::spawn(
            "test",
            estimator,
            ProgressEmitter::new(Box::new(capture.clone())),
            Duration::from_secs(10),
            Duration::from_secs(1),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        assert_eq!(task.stop(), StopOutcome::Joined);
        // The 10s tick wait is interrupted by the stop signal
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!capture.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_stops_thread() {
        let capture = Capture::default();
        let estimator = Arc::new(PhaseEstimator::loading(&SeparatorConfig::default(), 3));
        {
            let _task = EstimatorTask::spawn(
                "drop",
                estimator,
                ProgressEmitter::new(Box::new(capture.clone())),
                Duration::from_millis(5),
                Duration::from_secs(1),
            )
            .unwrap();
            thread::sleep(Duration::from_millis(30));
        }

        let written = capture.0.lock().unwrap().len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(capture.0.lock().unwrap().len(), written);
    }
}
