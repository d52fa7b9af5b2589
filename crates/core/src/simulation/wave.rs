//! Wave scheduler
//!
//! Single finite state machine pacing particle spawns:
//!
//! ```text
//! WAITING --buffer_time--> SWELLING --swell_time--> ACTIVE
//!    ^                                                 |
//!    +---- queue empty and all settled, or timeout ----+
//! ```
//!
//! Timer-driven transitions anchor the next state at the deadline they
//! crossed, so a wave cycle does not drift by a tick per transition. The
//! anchor is never earlier than one clamped frame before the tick that
//! noticed it: after a stall the swell still plays out in full.
//!
//! The ACTIVE timeout runs from the moment the spawn queue drained, or from
//! ACTIVE entry when it never drained. A wave whose sites cannot be found
//! therefore still times out, abandons its queue, and lets the next wave
//! begin.

use crate::config::WaveConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveState {
    /// Resting between waves
    Waiting,
    /// Swell indicator rising before a wave
    Swelling,
    /// Wave spawning and descending
    Active,
}

impl std::fmt::Display for WaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WaveState::Waiting => "WAITING",
            WaveState::Swelling => "SWELLING",
            WaveState::Active => "ACTIVE",
        };
        f.pad(name)
    }
}

/// A state change observed during [`WaveScheduler::update`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveTransition {
    pub from: WaveState,
    pub to: WaveState,
    /// Simulation time of the tick that made the change
    pub at: f64,
    /// ACTIVE ended by timeout rather than by settling
    pub forced: bool,
}

/// Process-wide wave state machine
#[derive(Debug, Clone)]
pub struct WaveScheduler {
    config: WaveConfig,
    /// Seconds covered by one tick at `frame_scale = 1`
    reference_frame: f64,
    state: WaveState,
    entered_at: f64,
    spawn_queue: u32,
    spawn_completed_at: Option<f64>,
    swell_opacity: f32,
    waves_started: u32,
    waves_completed: u32,
    forced_settles: u32,
}

impl WaveScheduler {
    /// Start in WAITING so the first swell begins at `first_delay`.
    ///
    /// `reference_frame` is the tick duration `frame_scale` is measured in.
    pub fn new(config: &WaveConfig, reference_frame: f32) -> Self {
        Self {
            config: config.clone(),
            reference_frame: f64::from(reference_frame),
            state: WaveState::Waiting,
            entered_at: config.first_delay - config.buffer_time,
            spawn_queue: 0,
            spawn_completed_at: None,
            swell_opacity: config.swell_baseline,
            waves_started: 0,
            waves_completed: 0,
            forced_settles: 0,
        }
    }

    /// Evaluate transitions for the tick at `now`.
    ///
    /// `settled` describes the non-fading particles: `None` when there are
    /// none, otherwise whether every one of them has settled. At most one
    /// transition happens per call. `frame_scale` is the clamped length of
    /// this tick in reference frames.
    pub fn update(
        &mut self,
        now: f64,
        frame_scale: f32,
        settled: Option<bool>,
    ) -> Option<WaveTransition> {
        let transition = match self.state {
            WaveState::Active => self.check_active(now, settled),
            WaveState::Waiting => {
                let deadline = self.entered_at + self.config.buffer_time;
                (now >= deadline).then(|| {
                    let anchor = self.timer_anchor(deadline, now, frame_scale);
                    self.enter(WaveState::Swelling, anchor, now, false)
                })
            }
            WaveState::Swelling => {
                let deadline = self.entered_at + self.config.swell_time;
                (now >= deadline).then(|| {
                    let anchor = self.timer_anchor(deadline, now, frame_scale);
                    self.spawn_queue = self.config.particles_per_wave;
                    self.spawn_completed_at = None;
                    self.waves_started += 1;
                    self.swell_opacity = self.config.swell_peak;
                    self.enter(WaveState::Active, anchor, now, false)
                })
            }
        };

        self.update_swell(now, frame_scale, transition.is_some());
        transition
    }

    /// Entry time for a timer transition crossed at `deadline`, noticed at `now`
    fn timer_anchor(&self, deadline: f64, now: f64, frame_scale: f32) -> f64 {
        let frame = f64::from(frame_scale) * self.reference_frame;
        deadline.max(now - frame)
    }

    fn check_active(&mut self, now: f64, settled: Option<bool>) -> Option<WaveTransition> {
        if self.spawn_queue == 0 && settled == Some(true) {
            self.waves_completed += 1;
            return Some(self.enter(WaveState::Waiting, now, now, false));
        }

        let anchor = self.spawn_completed_at.unwrap_or(self.entered_at);
        if now - anchor < self.config.max_wave_interval {
            return None;
        }

        if self.spawn_queue > 0 {
            debug!(
                "Wave {} timed out with {} unplaced particles",
                self.waves_started, self.spawn_queue
            );
            self.spawn_queue = 0;
        } else {
            debug!("Wave {} forced to settle", self.waves_started);
        }
        self.waves_completed += 1;
        self.forced_settles += 1;
        Some(self.enter(WaveState::Waiting, now, now, true))
    }

    fn enter(&mut self, to: WaveState, entered_at: f64, now: f64, forced: bool) -> WaveTransition {
        let from = self.state;
        info!(
            "Wave state {} -> {} at t={:.2}s{}",
            from,
            to,
            now,
            if forced { " (forced)" } else { "" }
        );
        self.state = to;
        self.entered_at = entered_at;
        WaveTransition {
            from,
            to,
            at: now,
            forced,
        }
    }

    /// Swell indicator: eases in while swelling, exhales otherwise
    fn update_swell(&mut self, now: f64, frame_scale: f32, just_changed: bool) {
        let baseline = self.config.swell_baseline;
        match self.state {
            WaveState::Swelling => {
                let progress =
                    ((now - self.entered_at) / self.config.swell_time).clamp(0.0, 1.0) as f32;
                self.swell_opacity =
                    baseline + (self.config.swell_peak - baseline) * progress * progress;
            }
            // Snapped to peak this tick
            WaveState::Active if just_changed => {}
            _ => {
                let retain = self.config.exhale_decay.powf(frame_scale);
                self.swell_opacity = baseline + (self.swell_opacity - baseline) * retain;
            }
        }
    }

    /// Consume one slot of the spawn queue.
    ///
    /// Returns `false` when the queue was already empty. Draining the last
    /// slot records the completion time that anchors the ACTIVE timeout.
    pub fn record_placement(&mut self, now: f64) -> bool {
        if self.spawn_queue == 0 {
            return false;
        }
        self.spawn_queue -= 1;
        if self.spawn_queue == 0 {
            self.spawn_completed_at = Some(now);
            debug!("Wave {} fully spawned at t={:.2}s", self.waves_started, now);
        }
        true
    }

    pub fn state(&self) -> WaveState {
        self.state
    }

    /// Particles still to place for the current wave
    pub fn spawn_queue(&self) -> u32 {
        self.spawn_queue
    }

    /// Active particles are held in place while the queue is non-empty
    pub fn is_staging(&self) -> bool {
        self.spawn_queue > 0
    }

    /// Time the current state was entered
    pub fn entered_at(&self) -> f64 {
        self.entered_at
    }

    /// Time the current wave's queue drained, if it has
    pub fn spawn_completed_at(&self) -> Option<f64> {
        self.spawn_completed_at
    }

    /// Swell indicator value (e.g. wireframe opacity)
    pub fn swell_opacity(&self) -> f32 {
        self.swell_opacity
    }

    pub fn waves_started(&self) -> u32 {
        self.waves_started
    }

    pub fn waves_completed(&self) -> u32 {
        self.waves_completed
    }

    /// Waves ended by the timeout instead of settling
    pub fn forced_settles(&self) -> u32 {
        self.forced_settles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;
    const REFERENCE_FRAME: f32 = 1.0 / 60.0;

    fn config() -> WaveConfig {
        WaveConfig::default()
    }

    /// Tick until `pred` holds, returning the time it first did
    fn run_until(
        scheduler: &mut WaveScheduler,
        start: f64,
        limit: f64,
        settled: Option<bool>,
        pred: impl Fn(&WaveScheduler) -> bool,
    ) -> Option<f64> {
        let mut t = start;
        while t <= limit {
            scheduler.update(t, 1.0, settled);
            if pred(scheduler) {
                return Some(t);
            }
            t += DT;
        }
        None
    }

    #[test]
    fn test_initial_state() {
        let c = config();
        let s = WaveScheduler::new(&c, REFERENCE_FRAME);
        assert_eq!(s.state(), WaveState::Waiting);
        assert_relative_eq!(s.entered_at(), c.first_delay - c.buffer_time);
        assert_eq!(s.spawn_queue(), 0);
        assert!(!s.is_staging());
        assert_relative_eq!(s.swell_opacity(), c.swell_baseline);
    }

    #[test]
    fn test_first_swell_starts_after_first_delay() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        let t = run_until(&mut s, 0.0, 10.0, None, |s| s.state() == WaveState::Swelling)
            .expect("never swelled");
        assert!(t >= c.first_delay && t < c.first_delay + DT + 1e-9);
    }

    #[test]
    fn test_reaches_active_within_buffer_and_swell() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        // Enter WAITING at a known time
        s.entered_at = 0.0;
        let t = run_until(&mut s, 0.0, 20.0, None, |s| s.state() == WaveState::Active)
            .expect("never went active");
        let expected = c.buffer_time + c.swell_time;
        assert!(t >= expected && t < expected + DT + 1e-9, "active at {t}");
        assert_eq!(s.spawn_queue(), c.particles_per_wave);
        assert_relative_eq!(s.swell_opacity(), c.swell_peak);
        assert_eq!(s.waves_started(), 1);
    }

    #[test]
    fn test_swell_curve_is_quadratic() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        s.state = WaveState::Swelling;
        s.entered_at = 10.0;
        s.update(10.0 + c.swell_time * 0.5, 1.0, None);
        assert_eq!(s.state(), WaveState::Swelling);
        let expected = c.swell_baseline + (c.swell_peak - c.swell_baseline) * 0.25;
        assert_relative_eq!(s.swell_opacity(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_exhale_decays_toward_baseline() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        s.swell_opacity = c.swell_peak;
        s.entered_at = 100.0;
        let mut last = s.swell_opacity();
        for i in 0..200 {
            s.update(f64::from(i) * DT, 1.0, None);
            assert!(s.swell_opacity() <= last);
            assert!(s.swell_opacity() >= c.swell_baseline);
            last = s.swell_opacity();
        }
        assert!(last - c.swell_baseline < 0.01);
    }

    #[test]
    fn test_settles_when_queue_empty_and_all_settled() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        s.state = WaveState::Active;
        s.entered_at = 0.0;
        s.spawn_queue = 2;

        // Queue still non-empty: settled particles do not end the wave
        assert_eq!(s.update(1.0, 1.0, Some(true)), None);
        assert!(s.record_placement(1.1));
        assert!(s.record_placement(1.2));
        assert!(!s.record_placement(1.3));
        assert_eq!(s.spawn_completed_at(), Some(1.2));

        assert_eq!(s.update(2.0, 1.0, Some(false)), None);
        let transition = s.update(3.0, 1.0, Some(true)).expect("should settle");
        assert_eq!(transition.from, WaveState::Active);
        assert_eq!(transition.to, WaveState::Waiting);
        assert!(!transition.forced);
        assert_eq!(s.waves_completed(), 1);
        assert_eq!(s.forced_settles(), 0);
    }

    #[test]
    fn test_timeout_anchored_at_spawn_completion() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        s.state = WaveState::Active;
        s.entered_at = 0.0;
        s.spawn_queue = 1;
        s.record_placement(5.0);

        assert_eq!(s.update(5.0 + c.max_wave_interval - 0.1, 1.0, Some(false)), None);
        let transition = s
            .update(5.0 + c.max_wave_interval, 1.0, Some(false))
            .expect("should time out");
        assert!(transition.forced);
        assert_eq!(s.forced_settles(), 1);
    }

    #[test]
    fn test_zero_spawn_wave_does_not_deadlock() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        let active_at = run_until(&mut s, 0.0, 20.0, None, |s| s.state() == WaveState::Active)
            .expect("never went active");

        // No placements ever succeed and no particles exist
        let waiting_at = run_until(&mut s, active_at + DT, active_at + 60.0, None, |s| {
            s.state() == WaveState::Waiting
        })
        .expect("zero-spawn wave never ended");
        assert!(waiting_at - active_at <= c.max_wave_interval + DT + 1e-9);
        assert_eq!(s.spawn_queue(), 0);
        assert_eq!(s.forced_settles(), 1);

        let again = run_until(&mut s, waiting_at + DT, waiting_at + 20.0, None, |s| {
            s.state() == WaveState::Active
        })
        .expect("next wave never started");
        assert!(again - waiting_at <= c.buffer_time + c.swell_time + DT + 1e-9);
        assert_eq!(s.waves_started(), 2);
    }

    #[test]
    fn test_one_transition_per_update() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        // Far past every deadline
        let t = s.update(1000.0, 1.0, None).expect("transition");
        assert_eq!(t.to, WaveState::Swelling);
        assert_eq!(s.state(), WaveState::Swelling);
    }

    #[test]
    fn test_swell_not_skipped_after_stall() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        s.update(0.0, 1.0, None);

        // Long frame clamped to three reference frames
        let stalled = 40.0;
        let t = s.update(stalled, 3.0, None).expect("transition");
        assert_eq!(t.to, WaveState::Swelling);
        assert_relative_eq!(s.entered_at(), stalled - 3.0 * DT, epsilon = 1e-6);

        // The next frame is early in the swell, not past its end
        assert_eq!(s.update(stalled + DT, 1.0, None), None);
        assert_eq!(s.state(), WaveState::Swelling);
        let progress = (4.0 * DT / c.swell_time) as f32;
        let expected = c.swell_baseline + (c.swell_peak - c.swell_baseline) * progress * progress;
        assert_relative_eq!(s.swell_opacity(), expected, epsilon = 1e-5);

        let active_at = run_until(&mut s, stalled + 2.0 * DT, stalled + 10.0, None, |s| {
            s.state() == WaveState::Active
        })
        .expect("never went active");
        let expected = stalled - 3.0 * DT + c.swell_time;
        assert!(active_at > expected - 1e-6 && active_at < expected + DT + 1e-6);
    }

    #[test]
    fn test_on_time_frames_anchor_at_deadline() {
        let c = config();
        let mut s = WaveScheduler::new(&c, REFERENCE_FRAME);
        s.entered_at = 0.0;
        let t = run_until(&mut s, 0.0, 10.0, None, |s| s.state() == WaveState::Swelling)
            .expect("never swelled");
        assert!(t > c.buffer_time - 1e-9);
        assert_relative_eq!(s.entered_at(), c.buffer_time);
    }
}
