//! Frame ordering and the periodic refresh timer.
//!
//! Bevy's `Update` schedule drives every per-frame system. This plugin fixes
//! the order of the [`FrameSet`]s and ticks the [`RefreshClock`] that paces
//! network refreshes.

use std::time::Duration;

use bevy::prelude::*;

use crate::config::ViewerConfig;
use crate::types::FrameSet;

/// Plugin providing frame ordering and the refresh clock.
pub struct ClockPlugin;

impl Plugin for ClockPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                FrameSet::Input,
                FrameSet::Tracking,
                FrameSet::Actor,
                FrameSet::Trail,
                FrameSet::Picking,
                FrameSet::Animate,
            )
                .chain(),
        )
        .init_resource::<RefreshClock>()
        .add_systems(Startup, configure_refresh_clock)
        .add_systems(Update, advance_refresh_clock.before(FrameSet::Tracking));
    }
}

/// Repeating timer that marks a refresh as due.
///
/// The tracking pipeline consumes `due` and decides whether a refresh can
/// actually start (a satellite is active and nothing is in flight).
#[derive(Resource)]
pub struct RefreshClock {
    timer: Timer,
    due: bool,
    /// Number of times the timer has fired.
    pub fired: u64,
}

impl Default for RefreshClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl RefreshClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            timer: Timer::new(interval, TimerMode::Repeating),
            due: false,
            fired: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.timer.duration()
    }

    /// Advance the timer; returns true when it fired during this step.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.timer.tick(delta);
        let fired = self.timer.times_finished_this_tick() > 0;
        if fired {
            self.due = true;
            self.fired += 1;
        }
        fired
    }

    /// Mark a refresh as due right away (e.g. after bootstrap).
    pub fn request_now(&mut self) {
        self.due = true;
    }

    /// Consume the due flag.
    pub fn take_due(&mut self) -> bool {
        std::mem::take(&mut self.due)
    }

    pub fn is_due(&self) -> bool {
        self.due
    }
}

fn configure_refresh_clock(config: Option<Res<ViewerConfig>>, mut clock: ResMut<RefreshClock>) {
    let Some(config) = config else {
        return;
    };
    if clock.interval() != config.refresh_interval {
        *clock = RefreshClock::new(config.refresh_interval);
    }
}

/// Tick the refresh timer with the frame delta.
fn advance_refresh_clock(mut clock: ResMut<RefreshClock>, time: Res<Time>) {
    clock.tick(time.delta());
}
