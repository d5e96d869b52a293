//! Asymptotic phase estimation
//!
//! `percent = floor + (ceiling - floor) * (1 - 0.5^(elapsed / τ))`
//!
//! τ is the half-life of the remaining band: after τ seconds the curve is
//! halfway between floor and ceiling, after 2τ three quarters, and so on. The
//! integer result is capped at `ceiling - 1` so a phase never reports its own
//! ceiling.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use super::emitter::ProgressEvent;
use crate::config::SeparatorConfig;

/// Linear climb used when no time constant is known
const FALLBACK_PERCENT_PER_SEC: f64 = 2.0;

/// ETA is only shown above this percent
const ETA_MIN_PERCENT: u8 = 15;

/// ...and once this fraction of the band is done
const ETA_MIN_FRACTION: f64 = 0.05;

/// Parameters of one progress curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseEstimate {
    pub floor: u8,
    pub ceiling: u8,
    /// Half-life in seconds; zero selects the linear fallback
    pub time_constant_secs: f64,
}

impl PhaseEstimate {
    pub fn new(floor: u8, ceiling: u8, time_constant_secs: f64) -> Self {
        let floor = floor.min(99);
        Self {
            floor,
            ceiling: ceiling.max(floor.saturating_add(1)).min(100),
            time_constant_secs: time_constant_secs.max(0.0),
        }
    }

    /// Highest percent this phase may report
    pub fn max_percent(&self) -> u8 {
        self.ceiling - 1
    }

    /// Curve value after `elapsed`, in `[floor, ceiling)`
    pub fn percent_at(&self, elapsed: Duration) -> u8 {
        let floor = self.floor as f64;
        let span = (self.ceiling - self.floor) as f64;
        let secs = elapsed.as_secs_f64();

        let raw = if self.time_constant_secs > 0.0 {
            floor + span * (1.0 - 0.5f64.powf(secs / self.time_constant_secs))
        } else {
            floor + secs * FALLBACK_PERCENT_PER_SEC
        };

        raw.floor().clamp(floor, self.max_percent() as f64) as u8
    }

    /// Fraction of the band covered at `percent`
    pub fn fraction(&self, percent: u8) -> f64 {
        let span = (self.ceiling - self.floor) as f64;
        (percent.saturating_sub(self.floor) as f64 / span).clamp(0.0, 1.0)
    }
}

/// Which phase an estimator describes; selects the stage text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Loading,
    Processing,
}

/// A phase curve with a monotonic clamp
///
/// `tick` may be called from a background thread while the foreground reads
/// `last_emitted`.
#[derive(Debug)]
pub struct PhaseEstimator {
    kind: PhaseKind,
    estimate: PhaseEstimate,
    last_emitted: AtomicU8,
}

impl PhaseEstimator {
    /// Create an estimator whose output never drops below `seed`
    pub fn new(kind: PhaseKind, estimate: PhaseEstimate, seed: u8) -> Self {
        let seed = seed.clamp(estimate.floor, estimate.max_percent());
        Self {
            kind,
            estimate,
            last_emitted: AtomicU8::new(seed),
        }
    }

    /// Model loading phase, seeded with the last checkpoint emitted before it
    pub fn loading(config: &SeparatorConfig, seed: u8) -> Self {
        let estimate = PhaseEstimate::new(
            config.loading.floor,
            config.loading.ceiling,
            config.loading_time_constant_secs,
        );
        Self::new(PhaseKind::Loading, estimate, seed)
    }

    /// Processing phase with τ equal to the expected processing time
    pub fn processing(config: &SeparatorConfig, expected_secs: f64) -> Self {
        let estimate = PhaseEstimate::new(
            config.processing.floor,
            config.processing.ceiling,
            expected_secs,
        );
        Self::new(PhaseKind::Processing, estimate, config.processing.floor)
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn estimate(&self) -> &PhaseEstimate {
        &self.estimate
    }

    pub fn last_emitted(&self) -> u8 {
        self.last_emitted.load(Ordering::SeqCst)
    }

    /// Compute the next event, never lower than any previous one
    pub fn tick(&self, elapsed: Duration) -> ProgressEvent {
        let curve = self.estimate.percent_at(elapsed);
        let previous = self.last_emitted.fetch_max(curve, Ordering::SeqCst);
        let percent = previous.max(curve);
        ProgressEvent::new(percent, self.stage_text(percent, elapsed))
    }

    /// Remaining time extrapolated from progress so far
    pub fn eta(&self, percent: u8, elapsed: Duration) -> Option<Duration> {
        if percent <= ETA_MIN_PERCENT {
            return None;
        }
        let fraction = self.estimate.fraction(percent);
        if fraction <= ETA_MIN_FRACTION {
            return None;
        }
        let elapsed_secs = elapsed.as_secs_f64();
        let remaining = (elapsed_secs / fraction - elapsed_secs).max(0.0);
        Some(Duration::from_secs_f64(remaining))
    }

    fn stage_text(&self, percent: u8, elapsed: Duration) -> String {
        let secs = elapsed.as_secs();
        match self.kind {
            PhaseKind::Loading if secs < 60 => format!("Loading model ({}s)", secs),
            PhaseKind::Loading => format!("Loading model ({})", format_clock(secs)),
            PhaseKind::Processing => match self.eta(percent, elapsed) {
                Some(eta) => format!(
                    "Processing ({} | ETA {})",
                    format_clock(secs),
                    format_clock(eta.as_secs())
                ),
                None => format!("Processing ({})", format_clock(secs)),
            },
        }
    }
}

/// `m:ss`
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
