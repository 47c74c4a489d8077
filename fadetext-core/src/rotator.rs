//! Runs a scheduler on a tokio task.
//!
//! The task owns the [`RotatingTextScheduler`] outright. Commands from any
//! number of [`RotatorHandle`]s and wake-ups from tokio timers are handled
//! one at a time on that task, so the scheduler never runs concurrently with
//! itself.

use crate::agenda::{Agenda, Due, TimerId};
use crate::config::{AnimationConfig, FadeTextConfig};
use crate::error::{CoreError, Result};
use crate::host::{CycleToken, Fade, Host};
use crate::scheduler::{RotatingTextScheduler, SchedulerState};
use crate::time::TimeUnit;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Events emitted while the rotator runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationEvent {
    /// A text was put on screen
    TextDisplayed { text: String },
    /// A fade animation started
    FadeStarted { fade: Fade },
    /// A fade animation was cut short
    AnimationCancelled { fade: Fade },
    /// The view should be redrawn
    Redraw,
}

/// Host that turns primitives into [`RotationEvent`]s and keeps its timers
/// on the tokio clock.
pub struct TokioHost {
    events: broadcast::Sender<RotationEvent>,
    agenda: Agenda<Instant>,
    fade_in: Duration,
    fade_out: Duration,
    allowance: Duration,
}

impl TokioHost {
    #[must_use]
    pub fn new(events: broadcast::Sender<RotationEvent>, animation: &AnimationConfig) -> Self {
        Self {
            events,
            agenda: Agenda::new(),
            fade_in: animation.fade_in(),
            fade_out: animation.fade_out(),
            allowance: animation.allowance(),
        }
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RotationEvent> {
        self.events.subscribe()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.agenda.next_due()
    }

    fn pop_due(&mut self, now: Instant) -> Option<Due<Instant>> {
        self.agenda.pop_due(now)
    }

    fn emit(&self, event: RotationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Host for TokioHost {
    type Timer = TimerId;

    fn display_text(&mut self, text: &str) {
        self.emit(RotationEvent::TextDisplayed {
            text: text.to_string(),
        });
    }

    fn play(&mut self, fade: Fade) {
        let duration = match fade {
            Fade::In => self.fade_in,
            Fade::Out => self.fade_out,
        };
        self.agenda.start_animation(Instant::now(), fade, duration);
        self.emit(RotationEvent::FadeStarted { fade });
    }

    fn watch_completion(&mut self, token: CycleToken) -> bool {
        self.agenda.watch(token)
    }

    fn cancel_animation(&mut self) {
        if let Some(fade) = self.agenda.cancel_animation() {
            self.emit(RotationEvent::AnimationCancelled { fade });
        }
    }

    fn schedule_after(&mut self, delay: Duration, token: CycleToken) -> TimerId {
        self.agenda.schedule(Instant::now(), delay, token)
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.agenda.cancel(timer);
    }

    fn invalidate(&mut self) {
        self.emit(RotationEvent::Redraw);
    }

    fn animation_allowance(&self) -> Duration {
        self.allowance
    }
}

/// Point-in-time view of a running rotator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatorSnapshot {
    pub state: SchedulerState,
    pub position: usize,
    pub current_text: Option<String>,
    pub texts: Option<Vec<String>>,
    pub interval: Duration,
}

enum Command {
    Resume,
    Pause,
    Stop,
    Restart,
    Attach,
    Detach,
    ForceRefresh,
    SetTexts {
        texts: Vec<String>,
        reply: oneshot::Sender<Result<()>>,
    },
    SetTimeout {
        duration: f64,
        unit: TimeUnit,
        reply: oneshot::Sender<Result<()>>,
    },
    Shuffle {
        reply: oneshot::Sender<Result<()>>,
    },
    JumpTo {
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<RotatorSnapshot>,
    },
}

/// Scheduler plus the channels feeding it
pub struct Rotator {
    scheduler: RotatingTextScheduler<TokioHost>,
    commands: mpsc::Receiver<Command>,
    cancel_token: CancellationToken,
}

/// Cloneable control surface for a [`Rotator`]
#[derive(Clone)]
pub struct RotatorHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<RotationEvent>,
    cancel_token: CancellationToken,
}

impl Rotator {
    /// Build a rotator from loaded configuration
    ///
    /// # Arguments
    /// * `config` - Rotation, animation and string-array settings
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the rotation settings are invalid.
    pub fn new(
        config: &FadeTextConfig,
        cancel_token: Option<CancellationToken>,
    ) -> Result<(Self, RotatorHandle)> {
        let (event_tx, _) = broadcast::channel(64);
        let host = TokioHost::new(event_tx, &config.animation);
        let scheduler = RotatingTextScheduler::from_config(host, &config.rotation, config)?;
        Ok(Self::with_scheduler(scheduler, cancel_token))
    }

    /// Wrap an already configured scheduler
    #[must_use]
    pub fn with_scheduler(
        scheduler: RotatingTextScheduler<TokioHost>,
        cancel_token: Option<CancellationToken>,
    ) -> (Self, RotatorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let cancel_token = cancel_token.unwrap_or_default();
        let handle = RotatorHandle {
            commands: command_tx,
            events: scheduler.host().events.clone(),
            cancel_token: cancel_token.clone(),
        };
        let rotator = Self {
            scheduler,
            commands: command_rx,
            cancel_token,
        };
        (rotator, handle)
    }

    /// Start the rotator in a background task
    #[must_use]
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Attach, run until cancelled or every handle is gone, then detach
    pub async fn run(mut self) {
        info!("Rotator started");
        self.scheduler.attach();

        loop {
            let deadline = self.scheduler.host().next_deadline();
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Rotator shutting down");
                    break;
                }
                command = self.commands.recv() => {
                    if let Some(command) = command {
                        self.apply(command);
                    } else {
                        info!("All rotator handles dropped, shutting down");
                        break;
                    }
                }
                () = sleep_until(deadline) => self.deliver_due(),
            }
        }

        self.scheduler.detach();
    }

    fn deliver_due(&mut self) {
        let now = Instant::now();
        while let Some(due) = self.scheduler.host_mut().pop_due(now) {
            if let Some(wake) = due.wake {
                self.scheduler.wake(wake);
            }
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Resume => self.scheduler.resume(),
            Command::Pause => self.scheduler.pause(),
            Command::Stop => self.scheduler.stop(),
            Command::Restart => self.scheduler.restart(),
            Command::Attach => self.scheduler.attach(),
            Command::Detach => self.scheduler.detach(),
            Command::ForceRefresh => self.scheduler.force_refresh(),
            Command::SetTexts { texts, reply } => {
                reply_with(reply, self.scheduler.set_texts(texts));
            }
            Command::SetTimeout {
                duration,
                unit,
                reply,
            } => reply_with(reply, self.scheduler.set_timeout(duration, unit)),
            Command::Shuffle { reply } => reply_with(reply, self.scheduler.shuffle()),
            Command::JumpTo { index, reply } => {
                reply_with(reply, self.scheduler.jump_to(index));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> RotatorSnapshot {
        RotatorSnapshot {
            state: self.scheduler.state(),
            position: self.scheduler.position(),
            current_text: self.scheduler.current_text().map(str::to_string),
            texts: self
                .scheduler
                .texts()
                .map(|texts| texts.as_slice().to_vec()),
            interval: self.scheduler.interval(),
        }
    }
}

fn reply_with(reply: oneshot::Sender<Result<()>>, result: Result<()>) {
    if let Err(e) = &result {
        warn!("Rejected rotator command: {e}");
    }
    if reply.send(result).is_err() {
        debug!("Caller stopped waiting for the reply");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl RotatorHandle {
    /// Subscribe to rotation events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RotationEvent> {
        self.events.subscribe()
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Ask the rotator task to detach and exit
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn resume(&self) -> Result<()> {
        self.send(Command::Resume).await
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn restart(&self) -> Result<()> {
        self.send(Command::Restart).await
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn attach(&self) -> Result<()> {
        self.send(Command::Attach).await
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn detach(&self) -> Result<()> {
        self.send(Command::Detach).await
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn force_refresh(&self) -> Result<()> {
        self.send(Command::ForceRefresh).await
    }

    /// Replace the texts, starting again from the first
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an empty list, or
    /// [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn set_texts<I, S>(&self, texts: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts = texts.into_iter().map(Into::into).collect();
        self.request(|reply| Command::SetTexts { texts, reply })
            .await?
    }

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a non-positive duration, or
    /// [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn set_timeout(&self, duration: f64, unit: TimeUnit) -> Result<()> {
        self.request(|reply| Command::SetTimeout {
            duration,
            unit,
            reply,
        })
        .await?
    }

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when no texts are set, or
    /// [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn shuffle(&self) -> Result<()> {
        self.request(|reply| Command::Shuffle { reply }).await?
    }

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an index out of range, or
    /// [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn jump_to(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::JumpTo { index, reply })
            .await?
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RotatorClosed`] if the rotator has stopped.
    pub async fn snapshot(&self) -> Result<RotatorSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::RotatorClosed)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(command(reply_tx)).await?;
        reply_rx.await.map_err(|_| CoreError::RotatorClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RotationConfig;
    use crate::error::InvalidConfiguration;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn config(texts: &[&str], timeout_ms: i64) -> FadeTextConfig {
        FadeTextConfig {
            rotation: RotationConfig {
                texts: Some(texts.iter().map(ToString::to_string).collect()),
                timeout_ms,
                ..RotationConfig::default()
            },
            animation: AnimationConfig {
                fade_in_ms: 0,
                fade_out_ms: 0,
                allowance_ms: 0,
            },
            ..FadeTextConfig::default()
        }
    }

    async fn next_text(events: &mut broadcast::Receiver<RotationEvent>) -> String {
        loop {
            if let RotationEvent::TextDisplayed { text } = events.recv().await.unwrap() {
                return text;
            }
        }
    }

    fn drain_texts(events: &mut broadcast::Receiver<RotationEvent>) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let RotationEvent::TextDisplayed { text } = event {
                texts.push(text);
            }
        }
        texts
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotates_texts_on_schedule() {
        let (rotator, handle) = Rotator::new(&config(&["A", "B", "C"], 100), None).unwrap();
        let mut events = handle.subscribe();
        let task = rotator.start();

        assert_eq!(next_text(&mut events).await, "A");
        let started = Instant::now();
        assert_eq!(next_text(&mut events).await, "B");
        assert!(started.elapsed() >= ms(100));
        assert!(started.elapsed() < ms(200));
        assert_eq!(next_text(&mut events).await, "C");
        assert_eq!(next_text(&mut events).await, "A");

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_current_text() {
        let (rotator, handle) = Rotator::new(&config(&["A", "B"], 100), None).unwrap();
        let mut events = handle.subscribe();
        let task = rotator.start();
        assert_eq!(next_text(&mut events).await, "A");

        handle.pause().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, SchedulerState::Paused);
        assert_eq!(snapshot.current_text.as_deref(), Some("A"));

        tokio::time::sleep(ms(1_000)).await;
        assert!(drain_texts(&mut events).is_empty());

        handle.resume().await.unwrap();
        assert_eq!(next_text(&mut events).await, "A");
        assert_eq!(next_text(&mut events).await, "B");

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_commands_report_errors() {
        let (rotator, handle) = Rotator::new(&config(&["A", "B"], 100), None).unwrap();
        let task = rotator.start();

        let err = handle.set_texts(Vec::<String>::new()).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidConfiguration(InvalidConfiguration::EmptyTexts)
        ));
        let err = handle.set_timeout(0.0, TimeUnit::Seconds).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidConfiguration(InvalidConfiguration::NonPositiveTimeout)
        ));
        let err = handle.jump_to(5).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidConfiguration(InvalidConfiguration::IndexOutOfRange { .. })
        ));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.texts, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(snapshot.interval, ms(100));

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_texts_and_timeout_through_handle() {
        let (rotator, handle) = Rotator::new(&config(&["A", "B"], 100), None).unwrap();
        let mut events = handle.subscribe();
        let task = rotator.start();
        assert_eq!(next_text(&mut events).await, "A");

        handle.set_timeout(2.0, TimeUnit::Seconds).await.unwrap();
        handle.set_texts(["X", "Y"]).await.unwrap();
        assert_eq!(next_text(&mut events).await, "X");

        let started = Instant::now();
        assert_eq!(next_text(&mut events).await, "Y");
        assert!(started.elapsed() >= ms(2_000));

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_restart() {
        let (rotator, handle) = Rotator::new(&config(&["A", "B"], 100), None).unwrap();
        let mut events = handle.subscribe();
        let task = rotator.start();
        assert_eq!(next_text(&mut events).await, "A");

        handle.stop().await.unwrap();
        handle.resume().await.unwrap();
        handle.attach().await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().state, SchedulerState::Stopped);
        tokio::time::sleep(ms(500)).await;
        assert!(drain_texts(&mut events).is_empty());

        handle.restart().await.unwrap();
        assert_eq!(next_text(&mut events).await, "A");
        let mut saw_redraw = false;
        while let Ok(event) = events.try_recv() {
            saw_redraw |= event == RotationEvent::Redraw;
        }
        assert!(saw_redraw);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancellation_closes_handle() {
        let cancel_token = CancellationToken::new();
        let (rotator, handle) =
            Rotator::new(&config(&["A"], 100), Some(cancel_token.clone())).unwrap();
        let task = rotator.start();

        cancel_token.cancel();
        task.await.unwrap();

        assert!(matches!(handle.pause().await, Err(CoreError::RotatorClosed)));
        assert!(matches!(handle.snapshot().await, Err(CoreError::RotatorClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_ends_task() {
        let (rotator, handle) = Rotator::new(&config(&["A"], 100), None).unwrap();
        let task = rotator.start();

        drop(handle);
        task.await.unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Rotator::new(&config(&[], 100), None).err().unwrap();
        assert!(matches!(
            err,
            CoreError::InvalidConfiguration(InvalidConfiguration::EmptyTexts)
        ));
    }
}
