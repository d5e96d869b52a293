//! Progress line protocol
//!
//! `PROGRESS:<percent>:<stage>\n`, one line per update, flushed immediately.
//! The final result object is written through the same lock so it can never
//! interleave with a progress line.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Line prefix of the progress protocol
pub const PROGRESS_PREFIX: &str = "PROGRESS:";

/// One progress update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Percent complete, 0..=100
    pub percent: u8,
    /// Free-form stage text without newlines
    pub stage: String,
}

impl ProgressEvent {
    /// Create an event, clamping percent and flattening newlines in the stage
    pub fn new(percent: u8, stage: impl Into<String>) -> Self {
        let stage: String = stage.into();
        Self {
            percent: percent.min(100),
            stage: stage.replace(['\r', '\n'], " "),
        }
    }

    /// Parse a protocol line; `None` for anything that is not a progress line
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line
            .trim_end_matches(['\r', '\n'])
            .strip_prefix(PROGRESS_PREFIX)?;
        let (percent, stage) = rest.split_once(':').unwrap_or((rest, ""));
        let percent: u8 = percent.trim().parse().ok()?;
        if percent > 100 {
            return None;
        }
        Some(Self::new(percent, stage))
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", PROGRESS_PREFIX, self.percent, self.stage)
    }
}

/// Shared, serialized progress sink
///
/// Cloning shares the underlying writer.
#[derive(Clone)]
pub struct ProgressEmitter {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ProgressEmitter {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(writer)),
        }
    }

    /// Emitter writing to the process's standard output
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Write one progress line
    pub fn emit(&self, percent: u8, stage: &str) {
        self.emit_event(&ProgressEvent::new(percent, stage));
    }

    pub fn emit_event(&self, event: &ProgressEvent) {
        // A closed pipe on the host side must not take the run down.
        if let Err(e) = self.write_line(&event.to_string()) {
            debug!("Dropped progress line {:?}: {}", event, e);
        }
    }

    /// Write the event only while `active` is set
    ///
    /// The flag is read under the sink lock, so once an owner clears it and
    /// returns, no line from this call can follow its own writes.
    pub fn emit_if(&self, active: &AtomicBool, event: &ProgressEvent) -> bool {
        let mut sink = self.lock();
        if !active.load(Ordering::SeqCst) {
            return false;
        }
        if let Err(e) = write_to(&mut **sink, &event.to_string()) {
            debug!("Dropped progress line {:?}: {}", event, e);
        }
        true
    }

    /// Write the final result as a single JSON line
    pub fn emit_result<T: Serialize>(&self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        self.write_line(&line)?;
        Ok(())
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        write_to(&mut **self.lock(), line)
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A panicking writer thread must not silence the others.
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn write_to<W: Write + ?Sized>(sink: &mut W, line: &str) -> io::Result<()> {
    sink.write_all(line.as_bytes())?;
    sink.write_all(b"\n")?;
    sink.flush()
}

impl fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEmitter").finish_non_exhaustive()
    }
}
