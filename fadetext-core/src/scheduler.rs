//! The rotating-text state machine.
//!
//! A cycle is: show the text at the current position and fade it in, wait
//! for the interval, fade it out, and once the fade-out completes advance the
//! position and start the next cycle. Nothing loops; every step is a
//! continuation the host hands back through [`RotatingTextScheduler::wake`].

use crate::config::RotationConfig;
use crate::error::{InvalidConfiguration, Result};
use crate::host::{CycleToken, Fade, Host, Wake};
use crate::texts::{StringArrays, TextSet};
use crate::time::{DurationExt, TimeUnit};
use rand::Rng;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

/// Interval used when no timeout was ever configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the scheduler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// Shown and allowed to animate.
    Running,
    /// Hidden; resumes from the current position.
    Paused,
    /// Animations disabled until [`RotatingTextScheduler::restart`].
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Paused => f.write_str("paused"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// The `shown`/`stopped` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifecycleFlags {
    pub shown: bool,
    pub stopped: bool,
}

impl Default for LifecycleFlags {
    fn default() -> Self {
        Self {
            shown: true,
            stopped: false,
        }
    }
}

impl LifecycleFlags {
    /// Whether any animation may start.
    #[must_use]
    pub const fn can_animate(self) -> bool {
        self.shown && !self.stopped
    }

    #[must_use]
    pub const fn state(self) -> SchedulerState {
        if self.stopped {
            SchedulerState::Stopped
        } else if self.shown {
            SchedulerState::Running
        } else {
            SchedulerState::Paused
        }
    }
}

/// What the installed cycle is waiting for.
enum Stage<T> {
    /// The interval timer, before the fade-out starts.
    Timer(T),
    /// Completion of the animation playing after the fade-out was requested.
    FadeOut,
}

/// The single cycle allowed to be in flight.
struct PendingCycle<T> {
    token: CycleToken,
    stage: Stage<T>,
}

/// Cycles a [`TextSet`] through a host view, one fade at a time.
///
/// At most one cycle is ever pending. Every operation that starts a cycle
/// first cancels the previous timer and animation, so callbacks from a
/// replaced cycle arrive with a stale token and are dropped.
pub struct RotatingTextScheduler<H: Host> {
    host: H,
    texts: Option<TextSet>,
    position: usize,
    interval: Duration,
    flags: LifecycleFlags,
    pending: Option<PendingCycle<H::Timer>>,
    last_token: CycleToken,
}

impl<H: Host> fmt::Debug for RotatingTextScheduler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingTextScheduler")
            .field("texts", &self.texts)
            .field("position", &self.position)
            .field("interval", &self.interval)
            .field("flags", &self.flags)
            .field("pending", &self.pending.as_ref().map(|cycle| cycle.token))
            .finish_non_exhaustive()
    }
}

impl<H: Host> RotatingTextScheduler<H> {
    /// Create a scheduler with no texts and the default timeout.
    ///
    /// Nothing is displayed until texts are set or the host attaches.
    pub fn new(host: H) -> Self {
        Self {
            host,
            texts: None,
            position: 0,
            interval: DEFAULT_TIMEOUT,
            flags: LifecycleFlags::default(),
            pending: None,
            last_token: CycleToken::new(0),
        }
    }

    /// Create a scheduler from declarative configuration.
    ///
    /// The interval is `|timeout_ms|` plus the host's animation allowance.
    /// Texts come from the inline list, or failing that from `arrays` by
    /// reference, and are shuffled once if requested.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the texts are empty or cannot be
    /// resolved, if shuffling is requested without texts, or if the
    /// resulting interval is zero.
    pub fn from_config<A>(host: H, config: &RotationConfig, arrays: &A) -> Result<Self>
    where
        A: StringArrays + ?Sized,
    {
        let texts = config.resolve_texts(arrays)?;
        let interval = Duration::from_millis(config.timeout_ms.unsigned_abs())
            .checked_add(host.animation_allowance())
            .ok_or(InvalidConfiguration::TimeoutOutOfRange)?;
        if interval.is_zero() {
            return Err(InvalidConfiguration::NonPositiveTimeout.into());
        }

        let mut scheduler = Self::new(host);
        scheduler.texts = texts;
        scheduler.interval = interval;
        if config.shuffle {
            scheduler.shuffle()?;
        }

        debug!(
            interval_ms = scheduler.interval.as_millis_u64(),
            texts = scheduler.texts.as_ref().map_or(0, TextSet::len),
            "Scheduler configured"
        );
        Ok(scheduler)
    }

    /// Show and (re)start the cycle at the current position, unless stopped.
    pub fn resume(&mut self) {
        self.flags.shown = true;
        if self.flags.stopped {
            debug!("Resume ignored while stopped");
            return;
        }
        self.start_cycle();
    }

    /// Hide and cancel the pending cycle. The current text stays displayed.
    pub fn pause(&mut self) {
        self.flags.shown = false;
        self.cancel_pending();
        debug!(position = self.position, "Paused");
    }

    /// Hide and disable animations until [`restart`](Self::restart).
    pub fn stop(&mut self) {
        self.flags.shown = false;
        self.flags.stopped = true;
        self.cancel_pending();
        debug!(position = self.position, "Stopped");
    }

    /// Clear both flags and restart the cycle at the current position.
    pub fn restart(&mut self) {
        self.flags = LifecycleFlags::default();
        self.start_cycle();
        self.host.invalidate();
    }

    /// The host view was attached.
    pub fn attach(&mut self) {
        self.resume();
    }

    /// The host view was detached. Never stops, so re-attaching resumes.
    pub fn detach(&mut self) {
        self.pause();
    }

    /// Replace the texts and start over from the first one.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::EmptyTexts`] when `texts` is empty;
    /// texts and position are then left untouched.
    pub fn set_texts<I, S>(&mut self, texts: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts = TextSet::new(texts)?;
        debug!(count = texts.len(), "Texts replaced");
        self.texts = Some(texts);
        self.position = 0;
        self.start_cycle();
        Ok(())
    }

    /// Replace the texts with the string array registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::UnknownTextArray`] if `arrays` has no
    /// such id, or [`InvalidConfiguration::EmptyTexts`] if the array is empty.
    pub fn set_texts_from<A>(&mut self, arrays: &A, id: &str) -> Result<()>
    where
        A: StringArrays + ?Sized,
    {
        let texts = arrays
            .string_array(id)
            .ok_or_else(|| InvalidConfiguration::UnknownTextArray { id: id.to_string() })?;
        self.set_texts(texts)
    }

    /// Set the interval between a fade-in and its fade-out.
    ///
    /// An already scheduled timer keeps its old deadline; the new interval
    /// applies from the next cycle on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `duration` is not positive or cannot
    /// be represented; the previous interval stays in effect.
    pub fn set_timeout(&mut self, duration: f64, unit: TimeUnit) -> Result<()> {
        self.interval = unit.interval(duration)?;
        debug!(interval_ms = self.interval.as_millis_u64(), "Timeout set");
        Ok(())
    }

    /// Shuffle the texts using the thread-local generator.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::TextsUnset`] when no texts are set.
    pub fn shuffle(&mut self) -> Result<()> {
        self.shuffle_with(&mut rand::rng())
    }

    /// Shuffle the texts in place.
    ///
    /// The position is kept and the cycle is not restarted, so the text that
    /// follows the current one is whatever now sits after the unchanged
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::TextsUnset`] when no texts are set.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let texts = self
            .texts
            .as_mut()
            .ok_or(InvalidConfiguration::TextsUnset)?;
        texts.shuffle_with(rng);
        Ok(())
    }

    /// Show the text at `index`, then freeze on it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if no texts are set or `index` is out
    /// of range.
    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        let len = self
            .texts
            .as_ref()
            .ok_or(InvalidConfiguration::TextsUnset)?
            .len();
        if index >= len {
            return Err(InvalidConfiguration::IndexOutOfRange { index, len }.into());
        }

        self.position = index;
        self.flags.shown = true;
        self.start_cycle();
        self.pause();
        Ok(())
    }

    /// Cancel whatever is pending and restart at the current position.
    pub fn force_refresh(&mut self) {
        self.start_cycle();
    }

    /// Deliver a continuation from the host.
    ///
    /// Wake-ups that do not belong to the pending cycle are ignored.
    pub fn wake(&mut self, wake: Wake) {
        let expected = self.pending.as_ref().is_some_and(|cycle| {
            cycle.token == wake.token()
                && matches!(
                    (&cycle.stage, wake),
                    (Stage::Timer(_), Wake::TimerElapsed(_))
                        | (Stage::FadeOut, Wake::FadeOutFinished(_))
                )
        });
        if !expected {
            trace!(?wake, "Ignoring stale wake-up");
            return;
        }

        // The host has already consumed the timer or watcher.
        self.pending = None;
        match wake {
            Wake::TimerElapsed(token) => self.begin_fade_out(token),
            Wake::FadeOutFinished(_) => self.advance_position(),
        }
    }

    #[must_use]
    pub const fn texts(&self) -> Option<&TextSet> {
        self.texts.as_ref()
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Text at the current position.
    #[must_use]
    pub fn current_text(&self) -> Option<&str> {
        self.texts.as_ref().and_then(|texts| texts.get(self.position))
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn flags(&self) -> LifecycleFlags {
        self.flags
    }

    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.flags.state()
    }

    #[must_use]
    pub const fn is_shown(&self) -> bool {
        self.flags.shown
    }

    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.flags.stopped
    }

    /// Whether a timer or completion registration is outstanding.
    #[must_use]
    pub const fn has_pending_cycle(&self) -> bool {
        self.pending.is_some()
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Give the host back, cancelling anything pending.
    pub fn into_host(mut self) -> H {
        self.cancel_pending();
        self.host
    }

    fn start_cycle(&mut self) {
        self.cancel_pending();

        if self.host.is_design_time_preview() {
            trace!("Design-time preview, not cycling");
            return;
        }
        let Some(text) = self.texts.as_ref().and_then(|texts| texts.get(self.position)) else {
            debug!("No texts to display");
            return;
        };

        self.host.display_text(text);
        self.play(Fade::In);

        if !self.flags.can_animate() {
            debug!(state = %self.state(), "Cycle suppressed");
            return;
        }

        let token = self.issue_token();
        let timer = self.host.schedule_after(self.interval, token);
        self.pending = Some(PendingCycle {
            token,
            stage: Stage::Timer(timer),
        });
        trace!(
            position = self.position,
            token = token.raw(),
            interval_ms = self.interval.as_millis_u64(),
            "Cycle scheduled"
        );
    }

    fn begin_fade_out(&mut self, token: CycleToken) {
        self.play(Fade::Out);
        if self.host.watch_completion(token) {
            self.pending = Some(PendingCycle {
                token,
                stage: Stage::FadeOut,
            });
        } else {
            debug!(position = self.position, "No animation playing, cycle ends here");
        }
    }

    fn advance_position(&mut self) {
        if !self.flags.shown {
            debug!(position = self.position, "Fade-out finished while hidden");
            return;
        }
        if let Some(texts) = &self.texts {
            self.position = texts.next_position(self.position);
        }
        self.start_cycle();
    }

    /// Every animation request goes through here.
    fn play(&mut self, fade: Fade) {
        if self.flags.can_animate() {
            self.host.play(fade);
        } else {
            trace!(%fade, state = %self.state(), "Animation suppressed");
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(PendingCycle { stage, token }) = self.pending.take() {
            if let Stage::Timer(timer) = stage {
                self.host.cancel_timer(timer);
            }
            trace!(token = token.raw(), "Pending cycle cancelled");
        }
        self.host.cancel_animation();
    }

    fn issue_token(&mut self) -> CycleToken {
        self.last_token = self.last_token.next();
        self.last_token
    }
}
