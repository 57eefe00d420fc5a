//! Ordered playback of synthesized steps.
//!
//! A queue owns an ordered list of [`PlaybackItem`]s and renders them
//! one at a time through an [`ItemRenderer`]. One item fault never
//! takes down the run: the failure is logged and the cursor advances.
//! Pause takes effect at the next item boundary; stop interrupts the
//! item currently rendering and resets the queue.
//!
//! Queues sharing an [`AudioOutput`] never render concurrently: `play`
//! claims the output for its whole run and fails fast with
//! [`TtsError::OutputBusy`] when another queue holds it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::errors::TtsError;
use crate::types::PlaybackItem;

/// Renders a single queue item to audible output.
pub trait ItemRenderer: Send + Sync {
    /// Render one item, resolving when its audio has finished.
    ///
    /// Dropping the returned future cancels the rendering.
    fn render(
        &self,
        item: &PlaybackItem,
    ) -> impl std::future::Future<Output = Result<(), TtsError>> + Send;
}

// ============================================================================
// Output Arbitration
// ============================================================================

/// The single audible output of a host.
///
/// Clones share the same underlying slot; hand one clone to every
/// queue that must not talk over the others.
#[derive(Debug, Clone, Default)]
pub struct AudioOutput {
    slot: Arc<tokio::sync::Mutex<()>>,
}

/// Exclusive hold on an [`AudioOutput`], released on drop.
#[derive(Debug)]
pub struct OutputGrant {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl AudioOutput {
    /// Create a fresh output slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the output without waiting.
    ///
    /// Returns `None` if another holder has it; callers surface this
    /// as [`TtsError::OutputBusy`] rather than queueing behind it.
    pub fn try_claim(&self) -> Option<OutputGrant> {
        self.slot
            .clone()
            .try_lock_owned()
            .ok()
            .map(|guard| OutputGrant { _guard: guard })
    }
}

// ============================================================================
// Queue State
// ============================================================================

/// Lifecycle state of a [`PlaybackQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueState {
    /// Created, never played.
    #[default]
    Idle,
    /// Actively rendering items.
    Playing,
    /// Suspended at an item boundary; cursor retained.
    Paused,
    /// Finished or stopped.
    Stopped,
}

/// Control command delivered to a running queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Command {
    #[default]
    Run,
    Pause,
    Stop,
}

/// Handle for controlling a queue from another task.
///
/// Cheap to clone. Commands are latched: the queue acts on the most
/// recent one, so repeated or stale commands are harmless.
#[derive(Debug, Clone)]
pub struct QueueControl {
    tx: watch::Sender<Command>,
}

impl QueueControl {
    /// Suspend playback at the next item boundary.
    pub fn pause(&self) {
        self.tx.send_replace(Command::Pause);
    }

    /// Resume a paused queue from its cursor.
    pub fn resume(&self) {
        self.tx.send_replace(Command::Run);
    }

    /// Stop playback, interrupting the current item.
    ///
    /// Idempotent; stopping an already stopped queue does nothing.
    pub fn stop(&self) {
        self.tx.send_replace(Command::Stop);
    }
}

// ============================================================================
// Playback Queue
// ============================================================================

/// What a completed `play` run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayReport {
    /// Items rendered to completion.
    pub rendered: usize,
    /// Items that faulted and were skipped over.
    pub failed: usize,
}

/// Ordered, controllable playback of synthesized steps.
///
/// ## Examples
///
/// ```ignore
/// use step_speaks::{AudioOutput, PlaybackQueue};
///
/// let mut queue = PlaybackQueue::new(AudioOutput::new());
/// queue.enqueue(items);
/// let report = queue.play(&renderer).await?;
/// ```
#[derive(Debug)]
pub struct PlaybackQueue {
    items: Vec<PlaybackItem>,
    cursor: usize,
    state: QueueState,
    output: AudioOutput,
    tx: watch::Sender<Command>,
}

impl PlaybackQueue {
    /// Create an empty queue bound to an output slot.
    pub fn new(output: AudioOutput) -> Self {
        let (tx, _rx) = watch::channel(Command::Run);
        Self {
            items: Vec::new(),
            cursor: 0,
            state: QueueState::Idle,
            output,
            tx,
        }
    }

    /// Replace the queue's items and rewind the cursor.
    ///
    /// Ignored with a warning while playback is active.
    pub fn enqueue(&mut self, items: impl IntoIterator<Item = PlaybackItem>) {
        if self.state == QueueState::Playing {
            tracing::warn!("Enqueue ignored while playback is active");
            return;
        }
        self.items = items.into_iter().collect();
        self.cursor = 0;
        self.state = QueueState::Idle;
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of the next item to render.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current lifecycle state.
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// A clonable control handle for this queue.
    pub fn control(&self) -> QueueControl {
        QueueControl {
            tx: self.tx.clone(),
        }
    }

    /// Stop and reset the queue directly.
    ///
    /// Clears all items and rewinds the cursor. Idempotent.
    pub fn stop(&mut self) {
        self.reset_stopped();
    }

    fn reset_stopped(&mut self) {
        self.items.clear();
        self.cursor = 0;
        self.state = QueueState::Stopped;
    }

    /// Render every item from the cursor onward, in order.
    ///
    /// Resolves when the queue finishes naturally or a stop command
    /// arrives. Item faults are logged and skipped; they never abort
    /// the run.
    ///
    /// ## Errors
    ///
    /// Returns [`TtsError::OutputBusy`] when another queue holds the
    /// shared output.
    pub async fn play<R: ItemRenderer>(&mut self, renderer: &R) -> Result<PlayReport, TtsError> {
        let _grant = self.output.try_claim().ok_or(TtsError::OutputBusy)?;

        // A fresh run ignores commands latched before it started.
        self.tx.send_replace(Command::Run);
        let mut rx = self.tx.subscribe();
        let mut report = PlayReport::default();

        tracing::debug!(items = self.items.len(), cursor = self.cursor, "Playback started");

        while self.cursor < self.items.len() {
            // Item boundary: latest command decides whether to proceed.
            loop {
                // Copy out so no watch lock is held across the await.
                let command = *self.tx.borrow();
                match command {
                    Command::Run => break,
                    Command::Pause => {
                        if self.state != QueueState::Paused {
                            tracing::debug!(cursor = self.cursor, "Playback paused");
                            self.state = QueueState::Paused;
                        }
                        if rx.changed().await.is_err() {
                            break;
                        }
                    }
                    Command::Stop => {
                        tracing::debug!(cursor = self.cursor, "Playback stopped");
                        self.reset_stopped();
                        return Ok(report);
                    }
                }
            }

            self.state = QueueState::Playing;
            let item = &self.items[self.cursor];

            let interrupted = tokio::select! {
                result = renderer.render(item) => {
                    match result {
                        Ok(()) => {
                            report.rendered += 1;
                        }
                        Err(error) => {
                            // One bad item must not silence the rest.
                            tracing::warn!(
                                step = item.step_index,
                                error = %error,
                                "Playback item failed, skipping"
                            );
                            report.failed += 1;
                        }
                    }
                    false
                },
                // Dropping the render future cancels the item's audio.
                _ = stop_requested(&mut rx) => true,
            };

            if interrupted {
                tracing::debug!(cursor = self.cursor, "Playback interrupted by stop");
                self.reset_stopped();
                return Ok(report);
            }

            self.cursor += 1;
        }

        self.state = QueueState::Stopped;
        tracing::debug!(
            rendered = report.rendered,
            failed = report.failed,
            "Playback complete"
        );
        Ok(report)
    }
}

/// Resolve once a stop command arrives; pause is ignored mid-item.
async fn stop_requested(rx: &mut watch::Receiver<Command>) {
    loop {
        if rx.changed().await.is_err() {
            // Sender gone; nothing can request a stop any more.
            std::future::pending::<()>().await;
        }
        if *rx.borrow_and_update() == Command::Stop {
            return;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
