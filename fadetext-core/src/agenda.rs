//! Timer and animation bookkeeping shared by the bundled hosts.
//!
//! An [`Agenda`] knows nothing about clocks. Callers pass the current instant
//! in and ask for whatever has come due, so the same bookkeeping serves a
//! virtual clock and `tokio::time`.

use crate::host::{CycleToken, Fade, Wake};
use std::ops::Add;
use std::time::Duration;

/// Handle for a timer held by an [`Agenda`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct PendingTimer<I> {
    id: TimerId,
    due: I,
    token: CycleToken,
}

#[derive(Debug, Clone)]
struct PlayingAnimation<I> {
    fade: Fade,
    ends_at: I,
    watcher: Option<CycleToken>,
}

/// Something that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due<I> {
    /// When it was due.
    pub at: I,
    /// The wake-up to deliver, if anyone was waiting for it.
    pub wake: Option<Wake>,
}

/// Pending timers plus the single animation currently playing.
#[derive(Debug, Clone)]
pub struct Agenda<I> {
    timers: Vec<PendingTimer<I>>,
    animation: Option<PlayingAnimation<I>>,
    next_timer: u64,
}

impl<I> Default for Agenda<I> {
    fn default() -> Self {
        Self {
            timers: Vec::new(),
            animation: None,
            next_timer: 0,
        }
    }
}

impl<I> Agenda<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a timer firing `delay` after `now`.
    pub fn schedule(&mut self, now: I, delay: Duration, token: CycleToken) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        self.timers.push(PendingTimer {
            id,
            due: now + delay,
            token,
        });
        id
    }

    /// Remove a timer. Returns `false` if it had already fired or been removed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    /// Number of timers that have not fired yet.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Start `fade`, replacing whatever was playing. A watcher on the
    /// replaced animation is dropped.
    pub fn start_animation(&mut self, now: I, fade: Fade, duration: Duration) {
        self.animation = Some(PlayingAnimation {
            fade,
            ends_at: now + duration,
            watcher: None,
        });
    }

    /// Stop the current animation without completing it.
    pub fn cancel_animation(&mut self) -> Option<Fade> {
        self.animation.take().map(|animation| animation.fade)
    }

    /// The animation that has started and not yet ended, if any.
    #[must_use]
    pub fn current_animation(&self) -> Option<Fade> {
        self.animation.as_ref().map(|animation| animation.fade)
    }

    /// Attach a one-shot completion for `token` to the current animation.
    pub fn watch(&mut self, token: CycleToken) -> bool {
        match self.animation.as_mut() {
            Some(animation) => {
                animation.watcher = Some(token);
                true
            }
            None => false,
        }
    }

    /// Earliest instant at which something comes due.
    #[must_use]
    pub fn next_due(&self) -> Option<I> {
        let timer = self.timers.iter().map(|timer| timer.due).min();
        let animation = self.animation.as_ref().map(|animation| animation.ends_at);
        match (timer, animation) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Remove and return the earliest item due at or before `now`.
    ///
    /// An animation ending at the same instant as a timer comes first, since
    /// it was started earlier. Timers due together fire in scheduling order.
    pub fn pop_due(&mut self, now: I) -> Option<Due<I>> {
        let timer = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= now)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, timer)| (index, timer.due));

        let animation_end = self
            .animation
            .as_ref()
            .map(|animation| animation.ends_at)
            .filter(|ends_at| *ends_at <= now);

        match (timer, animation_end) {
            (Some((_, due)), Some(ends_at)) if ends_at <= due => self.finish_animation(),
            (None, Some(_)) => self.finish_animation(),
            (Some((index, _)), _) => {
                let timer = self.timers.remove(index);
                Some(Due {
                    at: timer.due,
                    wake: Some(Wake::TimerElapsed(timer.token)),
                })
            }
            (None, None) => None,
        }
    }

    fn finish_animation(&mut self) -> Option<Due<I>> {
        self.animation.take().map(|animation| Due {
            at: animation.ends_at,
            wake: animation.watcher.map(Wake::FadeOutFinished),
        })
    }
}
