//! Runs a [`QuizSession`] on tokio with a live countdown per question.
//!
//! Each presented question gets its own countdown task. The task sends the
//! question's generation number through an mpsc channel once per tick and
//! exits when its `watch` stop signal fires or its sender is replaced. A pump
//! task feeds ticks into the session, which ignores any stale generation.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use quiz_core::model::EngineSettings;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::controller::{Advance, Countdown, QuizSession, Tick};
use super::result::{QuestionOutcome, SessionResult};
use crate::error::SessionError;

/// Updates for the hosting shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Presented { index: usize, countdown: Countdown },
    Tick { generation: u64, remaining: u32 },
    TimedOut(QuestionOutcome),
    Completed(SessionResult),
}

type CompletionCallback = Box<dyn FnOnce(SessionResult) + Send>;

/// Starts sessions. Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy)]
pub struct SessionDriver {
    tick_interval: Duration,
}

impl SessionDriver {
    #[must_use]
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            tick_interval: Duration::from_millis(settings.tick_interval_ms()),
        }
    }

    /// Present the first question and arm its countdown.
    pub async fn start_session(&self, session: QuizSession) -> SessionHandle {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            stop: StdMutex::new(None),
            callbacks: StdMutex::new(Vec::new()),
            tick_tx,
            events,
            tick_interval: self.tick_interval,
        });

        let pump = tokio::spawn(pump_ticks(Arc::clone(&shared), tick_rx));

        {
            let mut session = shared.session.lock().await;
            if !session.is_complete() {
                shared.present(&mut session);
            }
        }

        SessionHandle { shared, pump }
    }
}

struct Shared {
    session: Mutex<QuizSession>,
    stop: StdMutex<Option<watch::Sender<bool>>>,
    callbacks: StdMutex<Vec<CompletionCallback>>,
    tick_tx: mpsc::UnboundedSender<u64>,
    events: broadcast::Sender<SessionEvent>,
    tick_interval: Duration,
}

impl Shared {
    fn present(&self, session: &mut QuizSession) {
        let Ok(countdown) = session.present() else {
            return;
        };
        let index = session.current_index().unwrap_or_default();

        let (stop_tx, stop_rx) = watch::channel(false);
        if let Ok(mut slot) = self.stop.lock() {
            // dropping the previous sender ends its countdown too
            if let Some(previous) = slot.replace(stop_tx) {
                let _ = previous.send(true);
            }
        }
        spawn_countdown(countdown, self.tick_interval, self.tick_tx.clone(), stop_rx);
        let _ = self.events.send(SessionEvent::Presented { index, countdown });
    }

    fn stop_countdown(&self) {
        let stop = self.stop.lock().ok().and_then(|mut slot| slot.take());
        if let Some(stop) = stop {
            let _ = stop.send(true);
        }
    }

    fn complete(&self, result: &SessionResult) {
        self.stop_countdown();
        let callbacks = match self.callbacks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        };
        for callback in callbacks {
            callback(result.clone());
        }
        let _ = self.events.send(SessionEvent::Completed(result.clone()));
    }
}

fn spawn_countdown(
    countdown: Countdown,
    period: Duration,
    ticks: mpsc::UnboundedSender<u64>,
    mut stop: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        for _ in 0..countdown.seconds {
            tokio::select! {
                _ = interval.tick() => {
                    if ticks.send(countdown.generation).is_err() {
                        break;
                    }
                }
                _ = stop.changed() => break,
            }
        }
    });
}

async fn pump_ticks(shared: Arc<Shared>, mut ticks: mpsc::UnboundedReceiver<u64>) {
    while let Some(generation) = ticks.recv().await {
        let mut session = shared.session.lock().await;
        match session.tick(generation) {
            Tick::Stale => {}
            Tick::Running { remaining } => {
                let _ = shared.events.send(SessionEvent::Tick {
                    generation,
                    remaining,
                });
            }
            Tick::Expired(outcome) => {
                shared.stop_countdown();
                let _ = shared.events.send(SessionEvent::TimedOut(outcome));
            }
        }
    }
}

/// Live session handed to the hosting shell.
///
/// Dropping the handle abandons the attempt: countdowns stop and nothing is persisted.
pub struct SessionHandle {
    shared: Arc<Shared>,
    pump: JoinHandle<()>,
}

impl SessionHandle {
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Register a callback for the finalized result. Runs at once if already complete.
    pub async fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(SessionResult) + Send + 'static,
    {
        let session = self.shared.session.lock().await;
        if let Some(result) = session.result() {
            callback(result.clone());
            return;
        }
        if let Ok(mut callbacks) = self.shared.callbacks.lock() {
            callbacks.push(Box::new(callback));
        }
    }

    /// Read the session under its lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&QuizSession) -> R) -> R {
        let session = self.shared.session.lock().await;
        f(&session)
    }

    /// # Errors
    ///
    /// Returns `SessionError` when the session rejects the event.
    pub async fn flip_card(&self) -> Result<(), SessionError> {
        self.shared.session.lock().await.flip_card()
    }

    /// # Errors
    ///
    /// Returns `SessionError` when the session rejects the event.
    pub async fn type_answer(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.shared.session.lock().await.type_answer(text)
    }

    /// # Errors
    ///
    /// Returns `SessionError` when the session rejects the event.
    pub async fn select_option(&self, option: usize) -> Result<(), SessionError> {
        self.shared.session.lock().await.select_option(option)
    }

    /// # Errors
    ///
    /// Returns `SessionError` when the session rejects the event.
    pub async fn grid_press(&self, cell: usize) -> Result<(), SessionError> {
        self.shared.session.lock().await.grid_press(cell)
    }

    /// # Errors
    ///
    /// Returns `SessionError` when the session rejects the event.
    pub async fn grid_enter(&self, cell: usize) -> Result<bool, SessionError> {
        self.shared.session.lock().await.grid_enter(cell)
    }

    /// # Errors
    ///
    /// Returns `SessionError` when the session rejects the event.
    pub async fn grid_release(&self) -> Result<Option<String>, SessionError> {
        self.shared.session.lock().await.grid_release()
    }

    /// Submit the pending answer and stop the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` unless an answer is awaited.
    pub async fn submit(&self) -> Result<QuestionOutcome, SessionError> {
        let mut session = self.shared.session.lock().await;
        let outcome = session.submit()?;
        self.shared.stop_countdown();
        Ok(outcome)
    }

    /// Continue from feedback. Presents the next question or completes the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` unless feedback is showing.
    pub async fn advance(&self) -> Result<Advance, SessionError> {
        let mut session = self.shared.session.lock().await;
        let advance = session.advance()?;
        match &advance {
            Advance::Next(_) => self.shared.present(&mut session),
            Advance::Completed(result) => self.shared.complete(result),
        }
        Ok(advance)
    }

    /// Abandon the attempt.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shared.stop_countdown();
        self.pump.abort();
    }
}
