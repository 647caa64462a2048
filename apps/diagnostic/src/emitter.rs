//! Timer-driven publishing loop shared by every emitter.
//!
//! A [`PeriodicEmitter`] walks through `Idle -> Running -> Stopped`:
//!
//! ```text
//! new() ──► Idle ──start()──► Running ──stop()──► Stopped
//!             └──────────────stop()──────────────────┘
//! ```
//!
//! ## Rules
//! - One loop per emitter; `start()` spawns it and returns immediately.
//! - The first publish happens one full interval after `start()`.
//! - Ticks are sequential: a slow publish delays the next tick of this
//!   emitter only, missed ticks are not replayed in a burst.
//! - Cancellation is polled ahead of the timer, so once `stop()` has been
//!   requested no new publish begins. A publish already in flight is allowed
//!   to finish.
//! - `stop()` returns only after the loop task has exited, for every caller.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use transport_bus::Publisher;

use crate::error::{EmitError, EmitterError};

/// What an emitter sends on each tick.
pub trait Emission: Send + Sync + 'static {
    /// Short label used in logs and errors.
    fn kind(&self) -> &'static str;

    fn topic(&self) -> &str;

    /// Build the payload for one tick. An error skips the tick.
    fn payload(&self) -> Result<Bytes, EmitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Idle,
    Running,
    Stopped,
}

enum Phase {
    Idle,
    Running(CancellationToken),
    Stopped,
}

pub struct PeriodicEmitter<E: Emission> {
    emission: Arc<E>,
    interval: Duration,
    publisher: Arc<dyn Publisher>,
    phase: Mutex<Phase>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<E: Emission> PeriodicEmitter<E> {
    pub fn new(
        emission: E,
        interval: Duration,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, EmitterError> {
        if interval.is_zero() {
            return Err(EmitterError::ZeroInterval);
        }
        // the loop schedules its deadlines as instant + interval
        let schedulable = Instant::now()
            .checked_add(interval)
            .and_then(|first| first.checked_add(interval));
        if schedulable.is_none() {
            return Err(EmitterError::IntervalTooLarge(interval));
        }
        Ok(Self {
            emission: Arc::new(emission),
            interval,
            publisher,
            phase: Mutex::new(Phase::Idle),
            task: tokio::sync::Mutex::new(None),
        })
    }

    pub fn kind(&self) -> &'static str {
        self.emission.kind()
    }

    pub fn topic(&self) -> &str {
        self.emission.topic()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> EmitterState {
        match *self.phase.lock() {
            Phase::Idle => EmitterState::Idle,
            Phase::Running(_) => EmitterState::Running,
            Phase::Stopped => EmitterState::Stopped,
        }
    }

    /// Spawn the timer loop on the current tokio runtime.
    pub fn start(&self) -> Result<(), EmitterError> {
        let kind = self.kind();
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Idle => {}
            Phase::Running(_) => return Err(EmitterError::AlreadyStarted(kind)),
            Phase::Stopped => return Err(EmitterError::Terminated(kind)),
        }
        let runtime =
            Handle::try_current().map_err(|source| EmitterError::NoRuntime { kind, source })?;
        // stop() leaves Idle before it takes the slot, so an Idle phase means the slot is free
        let mut slot = self
            .task
            .try_lock()
            .map_err(|_| EmitterError::Terminated(kind))?;

        let cancel = CancellationToken::new();
        let span = info_span!("emitter", kind);
        let handle = runtime.spawn(
            run_loop(
                Arc::clone(&self.emission),
                Arc::clone(&self.publisher),
                self.interval,
                cancel.clone(),
            )
            .instrument(span),
        );
        *slot = Some(handle);
        *phase = Phase::Running(cancel);

        info!(
            kind,
            topic = %self.topic(),
            interval_s = self.interval.as_secs(),
            "emitter started"
        );
        Ok(())
    }

    /// Stop the loop and wait for it to exit. Idempotent; also valid before `start()`.
    pub async fn stop(&self) -> Result<(), EmitterError> {
        let kind = self.kind();
        let previous = std::mem::replace(&mut *self.phase.lock(), Phase::Stopped);
        match previous {
            Phase::Running(cancel) => cancel.cancel(),
            Phase::Idle => debug!(kind, "stop requested before start"),
            Phase::Stopped => {}
        }

        let mut slot = self.task.lock().await;
        if let Some(handle) = slot.as_mut() {
            let joined = handle.await;
            *slot = None;
            joined.map_err(|source| EmitterError::LoopPanicked { kind, source })?;
            info!(kind, "emitter stopped");
        }
        Ok(())
    }
}

impl<E: Emission> Drop for PeriodicEmitter<E> {
    fn drop(&mut self) {
        if let Phase::Running(cancel) = self.phase.get_mut() {
            cancel.cancel();
        }
    }
}

async fn run_loop<E: Emission>(
    emission: Arc<E>,
    publisher: Arc<dyn Publisher>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if let Err(err) = emit_once(emission.as_ref(), publisher.as_ref()).await {
            warn!(topic = %emission.topic(), error = %err, "tick skipped");
        }
    }
    debug!("emitter loop exited");
}

/// Build and publish one payload.
pub async fn emit_once<E: Emission>(emission: &E, publisher: &dyn Publisher) -> Result<(), EmitError> {
    let payload = emission.payload()?;
    debug!(topic = %emission.topic(), bytes = payload.len(), "publishing");
    publisher.publish(emission.topic(), payload).await?;
    Ok(())
}
