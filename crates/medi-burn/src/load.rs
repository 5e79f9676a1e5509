//! Load Monitor (spec.md §4.3): sliding-window rate estimator feeding a
//! clamped, exponentially-smoothed load multiplier.
//!
//! Grounded on `chronx-consensus::difficulty::DifficultyConfig` — a
//! bounded sample window driving a single smoothed scalar — re-purposed
//! from PoW difficulty adjustment to burn-load scaling.

use std::collections::VecDeque;

use medi_config::LoadConfig;

const MAX_BURN_SAMPLES: usize = 1_000;

/// Tracks recent submission/settlement timestamps and burn amounts, and
/// derives the smoothed load multiplier `λ` every tick.
pub struct LoadMonitor {
    submission_timestamps: VecDeque<i64>,
    settlement_timestamps: VecDeque<i64>,
    recent_burns: VecDeque<f64>,
    lambda: f64,
}

impl LoadMonitor {
    pub fn new() -> Self {
        Self {
            submission_timestamps: VecDeque::new(),
            settlement_timestamps: VecDeque::new(),
            recent_burns: VecDeque::new(),
            lambda: 1.0,
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn record_submission(&mut self, now_ms: i64, burn_amount: f64) {
        self.submission_timestamps.push_back(now_ms);
        self.recent_burns.push_back(burn_amount);
        if self.recent_burns.len() > MAX_BURN_SAMPLES {
            self.recent_burns.pop_front();
        }
    }

    pub fn record_settlement(&mut self, now_ms: i64) {
        self.settlement_timestamps.push_back(now_ms);
    }

    fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms - medi_core::LOAD_WINDOW_SECS * 1000;
        while matches!(self.submission_timestamps.front(), Some(t) if *t < cutoff) {
            self.submission_timestamps.pop_front();
        }
        while matches!(self.settlement_timestamps.front(), Some(t) if *t < cutoff) {
            self.settlement_timestamps.pop_front();
        }
    }

    /// Run one load-monitor tick, updating and returning the new `λ`.
    ///
    /// Formula (spec.md §4.3, worked example S2):
    /// `intentRate = submissions in the trailing 60s` (the 5-min deque is
    /// only the retention window; the *rate* is always per-minute);
    /// `loadFactor = intentRate / targetIntentRate`;
    /// `ratioCap = maxIntentRate / targetIntentRate`;
    /// `targetMultiplier = clamp(1 + (loadFactor-1)/(ratioCap-1) * (maxLoadMultiplier-1), 1, maxLoadMultiplier)`;
    /// `λ_new = clamp(λ_old*(1-α) + targetMultiplier*α, 1, maxLoadMultiplier)`.
    pub fn tick(&mut self, config: &LoadConfig, now_ms: i64) -> f64 {
        self.prune(now_ms);

        let one_minute_ago = now_ms - 60_000;
        let intent_rate = self
            .submission_timestamps
            .iter()
            .filter(|t| **t >= one_minute_ago)
            .count() as f64;

        let load_factor = if config.target_intent_rate > 0.0 {
            intent_rate / config.target_intent_rate
        } else {
            0.0
        };

        let ratio_cap = (config.max_intent_rate / config.target_intent_rate).max(1.0 + f64::EPSILON);
        let target_multiplier = if load_factor <= 1.0 {
            1.0
        } else {
            1.0 + (load_factor - 1.0) / (ratio_cap - 1.0) * (config.max_load_multiplier - 1.0)
        }
        .clamp(1.0, config.max_load_multiplier);

        let alpha = config.smoothing_factor;
        let smoothed = self.lambda * (1.0 - alpha) + target_multiplier * alpha;
        self.lambda = smoothed.clamp(1.0, config.max_load_multiplier);
        self.lambda
    }

    pub fn avg_burn(&self) -> f64 {
        if self.recent_burns.is_empty() {
            0.0
        } else {
            self.recent_burns.iter().sum::<f64>() / self.recent_burns.len() as f64
        }
    }
}

impl Default for LoadMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_config() -> LoadConfig {
        LoadConfig {
            monitor_interval_ms: 30_000,
            target_intent_rate: 10.0,
            max_intent_rate: 50.0,
            max_load_multiplier: 10.0,
            smoothing_factor: 0.3,
        }
    }

    #[test]
    fn s2_load_surge_matches_worked_example() {
        let config = load_config();
        let mut monitor = LoadMonitor::new();
        for i in 0..25 {
            monitor.record_submission(i * 1000, 0.0);
        }
        let lambda = monitor.tick(&config, 25_000);
        assert!((lambda - 2.0125).abs() < 1e-6, "got {lambda}");
    }

    #[test]
    fn lambda_always_stays_within_clamp() {
        let config = load_config();
        let mut monitor = LoadMonitor::new();
        for i in 0..500 {
            monitor.record_submission(i * 10, 0.0);
            let lambda = monitor.tick(&config, i * 10);
            assert!((1.0..=config.max_load_multiplier).contains(&lambda));
        }
    }

    #[test]
    fn idle_window_relaxes_toward_one() {
        let config = load_config();
        let mut monitor = LoadMonitor::new();
        for i in 0..25 {
            monitor.record_submission(i * 1000, 0.0);
        }
        monitor.tick(&config, 25_000);
        let lambda = monitor.tick(&config, 400_000);
        assert!(lambda < 2.0125);
    }
}
