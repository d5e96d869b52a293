//! Stemperator - AI Stem Separation Launcher
//!
//! Stemperator drives an external stem-separation library and reports
//! estimated progress while the library's blocking calls run.
//!
//! # Architecture
//!
//! - `device`: device catalog, token resolution with fallback, and the
//!   device string translation table
//! - `progress`: the `PROGRESS:<pct>:<stage>` emitter, asymptotic phase
//!   estimators, and the supervised estimator task
//! - `separation`: the backend seam, the Python bridge, the run orchestrator
//!   and the stem reconciler
//! - `cli`: argument surface and command handlers

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod progress;
pub mod separation;

pub use error::{Result, StemError};
