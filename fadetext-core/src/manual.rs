//! Deterministic host driven by a virtual clock.
//!
//! [`ManualHost`] records every primitive call and keeps its own notion of
//! "now". Time only moves when
//! [`RotatingTextScheduler::advance`](crate::RotatingTextScheduler::advance)
//! is called, which makes it suitable for tests and for embedding the
//! scheduler in an event loop that ticks it explicitly.

use crate::agenda::{Agenda, Due, TimerId};
use crate::host::{CycleToken, Fade, Host};
use crate::scheduler::RotatingTextScheduler;
use std::time::Duration;

/// A primitive call made by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Display(String),
    Play(Fade),
    /// An animation that was still playing got cancelled.
    CancelAnimation(Fade),
    Schedule { at: Duration, token: CycleToken },
    CancelTimer(TimerId),
    Invalidate,
}

#[derive(Debug, Clone)]
pub struct ManualHost {
    now: Duration,
    fade_duration: Duration,
    allowance: Duration,
    design_time_preview: bool,
    animations_ready: bool,
    agenda: Agenda<Duration>,
    displayed: Option<String>,
    calls: Vec<HostCall>,
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualHost {
    /// Host at t=0 with instant fades and no animation allowance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            fade_duration: Duration::ZERO,
            allowance: Duration::ZERO,
            design_time_preview: false,
            animations_ready: true,
            agenda: Agenda::new(),
            displayed: None,
            calls: Vec::new(),
        }
    }

    /// How long each fade takes to play.
    #[must_use]
    pub const fn with_fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self
    }

    /// Minimum animation time reported to declarative configuration.
    #[must_use]
    pub const fn with_animation_allowance(mut self, allowance: Duration) -> Self {
        self.allowance = allowance;
        self
    }

    #[must_use]
    pub const fn with_design_time_preview(mut self, preview: bool) -> Self {
        self.design_time_preview = preview;
        self
    }

    /// When `false`, play requests are recorded but nothing starts playing,
    /// as with a view whose animations have not loaded.
    #[must_use]
    pub const fn with_animations_ready(mut self, ready: bool) -> Self {
        self.animations_ready = ready;
        self
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// The text currently on screen.
    #[must_use]
    pub fn displayed(&self) -> Option<&str> {
        self.displayed.as_deref()
    }

    /// Calls recorded since construction or the last [`take_calls`](Self::take_calls).
    #[must_use]
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    /// Every text displayed among the recorded calls, in order.
    #[must_use]
    pub fn displayed_texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Display(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.agenda.pending_timers()
    }

    #[must_use]
    pub fn current_animation(&self) -> Option<Fade> {
        self.agenda.current_animation()
    }

    /// Pop the next item due no later than `deadline`, moving the clock to it.
    fn pop_due(&mut self, deadline: Duration) -> Option<Due<Duration>> {
        let due = self.agenda.pop_due(deadline)?;
        self.now = self.now.max(due.at);
        Some(due)
    }
}

impl Host for ManualHost {
    type Timer = TimerId;

    fn display_text(&mut self, text: &str) {
        self.displayed = Some(text.to_string());
        self.calls.push(HostCall::Display(text.to_string()));
    }

    fn play(&mut self, fade: Fade) {
        self.calls.push(HostCall::Play(fade));
        if self.animations_ready {
            self.agenda
                .start_animation(self.now, fade, self.fade_duration);
        }
    }

    fn watch_completion(&mut self, token: CycleToken) -> bool {
        self.agenda.watch(token)
    }

    fn cancel_animation(&mut self) {
        if let Some(fade) = self.agenda.cancel_animation() {
            self.calls.push(HostCall::CancelAnimation(fade));
        }
    }

    fn schedule_after(&mut self, delay: Duration, token: CycleToken) -> TimerId {
        self.calls.push(HostCall::Schedule {
            at: self.now + delay,
            token,
        });
        self.agenda.schedule(self.now, delay, token)
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        if self.agenda.cancel(timer) {
            self.calls.push(HostCall::CancelTimer(timer));
        }
    }

    fn invalidate(&mut self) {
        self.calls.push(HostCall::Invalidate);
    }

    fn is_design_time_preview(&self) -> bool {
        self.design_time_preview
    }

    fn animation_allowance(&self) -> Duration {
        self.allowance
    }
}

impl RotatingTextScheduler<ManualHost> {
    /// Move the virtual clock forward by `by`, delivering every timer and
    /// animation completion that comes due, in time order.
    pub fn advance(&mut self, by: Duration) {
        let deadline = self.host().now() + by;
        while let Some(due) = self.host_mut().pop_due(deadline) {
            if let Some(wake) = due.wake {
                self.wake(wake);
            }
        }
        self.host_mut().now = deadline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let mut host = ManualHost::new();
        host.display_text("A");
        host.play(Fade::In);
        host.schedule_after(Duration::from_millis(100), CycleToken::new(1));

        assert_eq!(
            host.calls(),
            [
                HostCall::Display("A".to_string()),
                HostCall::Play(Fade::In),
                HostCall::Schedule {
                    at: Duration::from_millis(100),
                    token: CycleToken::new(1),
                },
            ]
        );
        assert_eq!(host.displayed(), Some("A"));
    }

    #[test]
    fn test_cancel_only_recorded_when_something_stops() {
        let mut host = ManualHost::new();
        host.cancel_animation();
        assert!(host.calls().is_empty());

        host.play(Fade::Out);
        host.cancel_animation();
        assert_eq!(host.calls().last(), Some(&HostCall::CancelAnimation(Fade::Out)));
    }

    #[test]
    fn test_watch_fails_without_ready_animations() {
        let mut host = ManualHost::new().with_animations_ready(false);
        host.play(Fade::Out);
        assert!(!host.watch_completion(CycleToken::new(1)));
    }

    #[test]
    fn test_advance_moves_clock() {
        let mut scheduler = RotatingTextScheduler::new(ManualHost::new());
        scheduler.advance(Duration::from_secs(3));
        assert_eq!(scheduler.host().now(), Duration::from_secs(3));
    }
}
