//! Pacing between fetches.
//!
//! Every pause in the system goes through a `Pacer`, so tests can swap in
//! `NoDelay` (or a seeded `JitterPacer`) and run deterministically.

use crate::config::PacingConfig;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Randomized pause before each target inside a Pass 1 session.
    ThinkTime,
    /// Pause before retrying after attempt `attempt` failed.
    Backoff { attempt: u32 },
    /// Fixed pause between consecutive targets in the rescue pass.
    RescueGap,
    /// Longer fixed pause used throughout the deep rescue pass.
    DeepGap,
}

pub trait Pacer: Send + Sync {
    fn delay(&self, pause: Pause) -> Duration;
}

/// Sleeps for whatever the pacer asks for.
pub async fn pause(pacer: &dyn Pacer, pause: Pause) {
    let delay = pacer.delay(pause);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Pacer that never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn delay(&self, _pause: Pause) -> Duration {
        Duration::ZERO
    }
}

/// Config-driven pacer with uniform jitter on think time and linear backoff.
#[derive(Debug)]
pub struct JitterPacer {
    settings: PacingConfig,
    rng: Mutex<fastrand::Rng>,
}

impl JitterPacer {
    pub fn new(settings: PacingConfig) -> Self {
        Self {
            settings,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(settings: PacingConfig, seed: u64) -> Self {
        Self {
            settings,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    fn think_time_ms(&self) -> u64 {
        let min = self.settings.think_time_min_ms;
        let max = self.settings.think_time_max_ms.max(min);
        match self.rng.lock() {
            Ok(mut rng) => rng.u64(min..=max),
            Err(poisoned) => poisoned.into_inner().u64(min..=max),
        }
    }
}

impl Pacer for JitterPacer {
    fn delay(&self, pause: Pause) -> Duration {
        let ms = match pause {
            Pause::ThinkTime => self.think_time_ms(),
            Pause::Backoff { attempt } => self
                .settings
                .backoff_step_ms
                .saturating_mul(u64::from(attempt)),
            Pause::RescueGap => self.settings.rescue_gap_ms,
            Pause::DeepGap => self.settings.deep_gap_ms,
        };
        Duration::from_millis(ms)
    }
}
