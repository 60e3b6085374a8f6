//! Per-symbol cooldown after consecutive failed predictions.
//!
//! The store is the only state shared between analyses. Every access goes
//! through one mutex; a poisoned lock is recovered since the map holds no
//! invariant a panicking writer could break halfway.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::config::CooldownConfig;
use crate::domain::OutcomeStats;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock moved by hand, for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub until_ms: i64,
    pub reason: String,
}

/// Cooldown status of one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CooldownStatus {
    pub active: bool,
    pub until_ms: Option<i64>,
    pub remaining_ms: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CooldownEntry>,
    /// Losses in a row recorded through `record_result`.
    streaks: HashMap<String, u32>,
    /// Total external losses already covered by a window, per symbol.
    consumed: HashMap<String, u32>,
}

#[derive(Debug)]
pub struct CooldownStore {
    config: CooldownConfig,
    inner: Mutex<Inner>,
}

impl CooldownStore {
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Status of `symbol` at `now_ms`. Expired windows are dropped.
    pub fn check(&self, symbol: &str, now_ms: i64) -> CooldownStatus {
        let mut inner = self.lock();
        match inner.entries.get(symbol) {
            Some(entry) if entry.until_ms > now_ms => CooldownStatus {
                active: true,
                until_ms: Some(entry.until_ms),
                remaining_ms: entry.until_ms - now_ms,
                reason: Some(entry.reason.clone()),
            },
            Some(_) => {
                inner.entries.remove(symbol);
                CooldownStatus::default()
            }
            None => CooldownStatus::default(),
        }
    }

    /// Open a window from externally tracked outcome statistics.
    ///
    /// Returns the window when one was written. An active window is never
    /// extended, and a streak opens at most one window: the same stats seen
    /// again after expiry stay quiet until a new loss is recorded.
    pub fn record_outcomes(&self, symbol: &str, stats: &OutcomeStats, now_ms: i64) -> Option<CooldownEntry> {
        let mut inner = self.lock();
        if stats.consecutive_losses < self.config.loss_streak {
            inner.consumed.remove(symbol);
            return None;
        }
        if inner.consumed.get(symbol).is_some_and(|&seen| stats.losses <= seen) {
            return None;
        }
        inner.consumed.insert(symbol.to_string(), stats.losses);
        self.open_window(&mut inner, symbol, stats.consecutive_losses, now_ms)
    }

    /// Record one prediction result and open a window on a losing streak.
    pub fn record_result(&self, symbol: &str, success: bool, now_ms: i64) -> Option<CooldownEntry> {
        let mut inner = self.lock();
        if success {
            inner.streaks.remove(symbol);
            return None;
        }
        let streak = {
            let s = inner.streaks.entry(symbol.to_string()).or_insert(0);
            *s += 1;
            *s
        };
        if streak < self.config.loss_streak {
            return None;
        }
        inner.streaks.remove(symbol);
        self.open_window(&mut inner, symbol, streak, now_ms)
    }

    fn open_window(&self, inner: &mut Inner, symbol: &str, losses: u32, now_ms: i64) -> Option<CooldownEntry> {
        if inner.entries.get(symbol).is_some_and(|e| e.until_ms > now_ms) {
            return None;
        }
        let entry = CooldownEntry {
            until_ms: now_ms + self.config.duration_ms(),
            reason: format!("{losses} consecutive failed predictions"),
        };
        warn!(symbol, until_ms = entry.until_ms, losses, "cooldown opened");
        inner.entries.insert(symbol.to_string(), entry.clone());
        Some(entry)
    }

}

impl Default for CooldownStore {
    fn default() -> Self {
        Self::new(CooldownConfig::default())
    }
}
