//! Primitives a host view supplies to the scheduler.

use std::fmt;
use std::time::Duration;

/// Which fade animation to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fade {
    In,
    Out,
}

impl fmt::Display for Fade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("fade-in"),
            Self::Out => f.write_str("fade-out"),
        }
    }
}

/// Identifies one scheduled cycle.
///
/// The scheduler hands a fresh token to every timer and completion
/// registration it installs. Wake-ups carrying any other token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleToken(u64);

impl CycleToken {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// A continuation the host delivers back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The interval timer installed for this cycle elapsed.
    TimerElapsed(CycleToken),
    /// The animation watched for this cycle finished.
    FadeOutFinished(CycleToken),
}

impl Wake {
    #[must_use]
    pub const fn token(self) -> CycleToken {
        match self {
            Self::TimerElapsed(token) | Self::FadeOutFinished(token) => token,
        }
    }
}

/// Host view primitives.
///
/// Implementations own the real timers and animations. Once a timer fires or
/// a watched animation ends, the host's event loop passes the matching
/// [`Wake`] to [`RotatingTextScheduler::wake`](crate::RotatingTextScheduler::wake).
/// None of these calls may call back into the scheduler synchronously.
pub trait Host {
    /// Handle for a scheduled timer.
    type Timer;

    /// Show `text` without animating it.
    fn display_text(&mut self, text: &str);

    /// Start a fade animation. The scheduler only calls this while shown and
    /// not stopped.
    fn play(&mut self, fade: Fade);

    /// Attach a one-shot completion for `token` to whatever animation is
    /// currently playing.
    ///
    /// Returns `false` when nothing is playing; no completion will follow.
    fn watch_completion(&mut self, token: CycleToken) -> bool;

    /// Cancel the in-flight animation and drop any completion watcher.
    fn cancel_animation(&mut self);

    /// Arrange for [`Wake::TimerElapsed`] with `token` after `delay`.
    fn schedule_after(&mut self, delay: Duration, token: CycleToken) -> Self::Timer;

    /// Remove a timer so it never fires.
    fn cancel_timer(&mut self, timer: Self::Timer);

    /// Request a redraw.
    fn invalidate(&mut self) {}

    /// Design-time rendering (layout previews) never runs cycles.
    fn is_design_time_preview(&self) -> bool {
        false
    }

    /// Minimum time the platform needs to load and start an animation.
    ///
    /// Added to timeouts that come from declarative configuration.
    fn animation_allowance(&self) -> Duration {
        Duration::ZERO
    }
}
