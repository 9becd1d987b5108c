//! Dual-rate frame clock.
//!
//! Every animation frame the host polls one [`DualClock`], which decides
//! independently whether the update threshold and the render threshold have
//! been crossed.
//!
//! ```text
//! frame ─► poll(now) ─┬─ now - last_update >= update_period ─► update(dt = elapsed)
//!                     └─ now - last_render >= render_period ─► render(latest state)
//! ```
//!
//! `dt` is the measured elapsed time, not the nominal period.

use explorable_env::FrameHandle;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate caps for the two clocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum update ticks per second (non-positive or non-finite = uncapped)
    pub max_update_hz: f64,
    /// Maximum render ticks per second (non-positive or non-finite = uncapped)
    pub max_render_hz: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_update_hz: 120.0,
            max_render_hz: 60.0,
        }
    }
}

impl SchedulerConfig {
    /// Both clocks fire on every frame.
    pub fn uncapped() -> Self {
        Self {
            max_update_hz: 0.0,
            max_render_hz: 0.0,
        }
    }

    pub fn update_period(&self) -> Duration {
        period(self.max_update_hz)
    }

    pub fn render_period(&self) -> Duration {
        period(self.max_render_hz)
    }
}

fn period(hz: f64) -> Duration {
    if hz.is_finite() && hz > 0.0 {
        Duration::from_nanos((1e9 / hz) as u64)
    } else {
        Duration::ZERO
    }
}

/// Per-instance clock bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockState {
    /// Host time of the last polled frame, cleared on reset
    pub last_frame_time: Option<Duration>,
    pub last_update_time: Option<Duration>,
    pub last_render_time: Option<Duration>,
    /// Outstanding frame request, if the loop is armed
    pub animation_handle: Option<FrameHandle>,
}

/// What to run on this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDecision {
    /// Elapsed seconds since the last update, if an update is due
    pub update_dt: Option<f64>,
    pub render: bool,
    /// Seconds since the previous polled frame, `None` on the first frame after a reset
    pub frame_gap: Option<f64>,
}

impl FrameDecision {
    pub fn is_idle(&self) -> bool {
        self.update_dt.is_none() && !self.render
    }
}

/// Update and render clocks sharing one frame callback.
#[derive(Debug, Clone)]
pub struct DualClock {
    update_period: Duration,
    render_period: Duration,
    state: ClockState,
}

impl DualClock {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            update_period: config.update_period(),
            render_period: config.render_period(),
            state: ClockState::default(),
        }
    }

    /// Fresh baselines: the next update measures from `now`, the next frame renders.
    pub fn reset(&mut self, now: Duration) {
        self.state.last_frame_time = None;
        self.state.last_update_time = Some(now);
        self.state.last_render_time = None;
    }

    pub fn poll(&mut self, now: Duration) -> FrameDecision {
        let frame_gap = self
            .state
            .last_frame_time
            .replace(now)
            .map(|last| now.saturating_sub(last).as_secs_f64());

        let update_dt = match self.state.last_update_time {
            Some(last) => {
                let elapsed = now.saturating_sub(last);
                (elapsed >= self.update_period).then(|| {
                    self.state.last_update_time = Some(now);
                    elapsed.as_secs_f64()
                })
            }
            None => {
                self.state.last_update_time = Some(now);
                None
            }
        };

        let render = match self.state.last_render_time {
            Some(last) => now.saturating_sub(last) >= self.render_period,
            None => true,
        };
        if render {
            self.state.last_render_time = Some(now);
        }

        FrameDecision {
            update_dt,
            render,
            frame_gap,
        }
    }

    /// Records the outstanding frame request.
    pub fn arm(&mut self, handle: FrameHandle) {
        self.state.animation_handle = Some(handle);
    }

    /// Clears and returns the outstanding frame request.
    pub fn disarm(&mut self) -> Option<FrameHandle> {
        self.state.animation_handle.take()
    }

    pub fn is_armed(&self) -> bool {
        self.state.animation_handle.is_some()
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }

    pub fn update_period(&self) -> Duration {
        self.update_period
    }

    pub fn render_period(&self) -> Duration {
        self.render_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_default_rates() {
        let config = SchedulerConfig::default();
        assert_eq!(config.update_period(), Duration::from_nanos(8_333_333));
        assert_eq!(config.render_period(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn test_non_positive_rate_is_uncapped() {
        let config = SchedulerConfig {
            max_update_hz: -1.0,
            max_render_hz: f64::NAN,
        };
        assert_eq!(config.update_period(), Duration::ZERO);
        assert_eq!(config.render_period(), Duration::ZERO);
    }

    #[test]
    fn test_first_frame_after_reset_renders() {
        let mut clock = DualClock::new(&SchedulerConfig::default());
        clock.reset(ms(0));
        let decision = clock.poll(ms(0));
        assert_eq!(decision.update_dt, None);
        assert!(decision.render);
        assert_eq!(decision.frame_gap, None);
    }

    #[test]
    fn test_frame_gap_tracks_polls_not_updates() {
        let config = SchedulerConfig {
            max_update_hz: 10.0,
            max_render_hz: 10.0,
        };
        let mut clock = DualClock::new(&config);
        clock.reset(ms(0));
        clock.poll(ms(0));

        // Neither clock is due, the gap still advances
        let decision = clock.poll(ms(16));
        assert!(decision.is_idle());
        assert_eq!(decision.frame_gap, Some(0.016));
        assert_eq!(clock.state().last_frame_time, Some(ms(16)));

        let decision = clock.poll(ms(48));
        assert_eq!(decision.frame_gap, Some(0.032));

        // Hidden and shown again: the suspended span is not a gap
        clock.reset(ms(10_000));
        assert_eq!(clock.state().last_frame_time, None);
        assert_eq!(clock.poll(ms(10_016)).frame_gap, None);
        assert_eq!(clock.poll(ms(10_032)).frame_gap, Some(0.016));
    }

    #[test]
    fn test_dt_is_measured_not_nominal() {
        let mut clock = DualClock::new(&SchedulerConfig::default());
        clock.reset(ms(1000));

        // Stalled for 250ms: one update with the full elapsed time
        let decision = clock.poll(ms(1250));
        assert_eq!(decision.update_dt, Some(0.25));
    }

    #[test]
    fn test_clocks_are_independent() {
        let config = SchedulerConfig {
            max_update_hz: 100.0,
            max_render_hz: 25.0,
        };
        let mut clock = DualClock::new(&config);
        clock.reset(ms(0));

        let (mut updates, mut renders) = (0, 0);
        for frame in 1..=100 {
            let decision = clock.poll(ms(frame * 10));
            updates += decision.update_dt.is_some() as u32;
            renders += decision.render as u32;
        }
        assert_eq!(updates, 100);
        assert_eq!(renders, 25);
    }

    #[test]
    fn test_reset_discards_suspended_time() {
        let mut clock = DualClock::new(&SchedulerConfig::uncapped());
        clock.reset(ms(0));
        clock.poll(ms(16));

        // Hidden for a minute, then visible again
        clock.reset(ms(60_016));
        let decision = clock.poll(ms(60_032));
        assert_eq!(decision.update_dt, Some(0.016));
    }

    #[test]
    fn test_backwards_time_saturates() {
        let mut clock = DualClock::new(&SchedulerConfig::uncapped());
        clock.reset(ms(100));
        let decision = clock.poll(ms(50));
        assert_eq!(decision.update_dt, Some(0.0));
    }

    #[test]
    fn test_arm_and_disarm() {
        let mut clock = DualClock::new(&SchedulerConfig::default());
        assert!(!clock.is_armed());
        clock.arm(FrameHandle(3));
        assert_eq!(clock.state().animation_handle, Some(FrameHandle(3)));
        assert_eq!(clock.disarm(), Some(FrameHandle(3)));
        assert_eq!(clock.disarm(), None);
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"max_render_hz": 30.0}"#).unwrap();
        assert_eq!(config.max_update_hz, 120.0);
        assert_eq!(config.max_render_hz, 30.0);
    }

    proptest! {
        #[test]
        fn prop_update_dts_sum_to_elapsed(steps in prop::collection::vec(1u64..50, 1..200)) {
            let mut clock = DualClock::new(&SchedulerConfig::default());
            clock.reset(Duration::ZERO);

            let mut now = Duration::ZERO;
            let mut last_update = Duration::ZERO;
            let mut total = 0.0;
            for step in steps {
                now += ms(step);
                if let Some(dt) = clock.poll(now).update_dt {
                    total += dt;
                    last_update = now;
                }
            }
            prop_assert!((total - last_update.as_secs_f64()).abs() < 1e-9);
        }
    }
}
