//! Hand-off state shared between a reader and its decode worker.
//!
//! The worker offers each produced slot through a zero-capacity channel, so it
//! holds at most one frame the caller has not taken yet. Commands flow the
//! other way through an unbounded channel so the caller never blocks on them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::shared::frame::Frame;

/// Why the worker stopped producing frames at the current position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The backend has no more frames.
    Exhausted,
    /// Retrieving, converting or seeking failed; the message is for diagnostics.
    DecodeFailed(String),
    /// The session was stopped or its worker exited. Only `close` and a new
    /// `open` recover from this.
    Stopped,
}

pub(crate) enum SlotPayload {
    Frame(Frame),
    End(EndReason),
}

/// One produced-but-unconsumed result of the worker.
pub(crate) struct FrameSlot {
    /// Seek generation the slot was produced for.
    pub generation: u64,
    pub index: usize,
    pub payload: SlotPayload,
}

pub(crate) enum WorkerCommand {
    Seek { generation: u64, index: usize },
    Stop,
}

/// The reader's half of the shared state.
pub(crate) struct CallerSide {
    pub slots: Receiver<FrameSlot>,
    pub commands: Sender<WorkerCommand>,
    pub stop: Arc<AtomicBool>,
}

/// The worker's half of the shared state.
pub(crate) struct WorkerSide {
    pub slots: Sender<FrameSlot>,
    pub commands: Receiver<WorkerCommand>,
    pub stop: Arc<AtomicBool>,
}

impl WorkerSide {
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Creates the connected caller/worker halves for one decode session.
pub(crate) fn shared_state() -> (CallerSide, WorkerSide) {
    let (slot_tx, slot_rx) = crossbeam_channel::bounded(0);
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let stop = Arc::new(AtomicBool::new(false));
    (
        CallerSide {
            slots: slot_rx,
            commands: command_tx,
            stop: stop.clone(),
        },
        WorkerSide {
            slots: slot_tx,
            commands: command_rx,
            stop,
        },
    )
}

/// Requests shutdown of a decode session from any thread.
///
/// Stopping wakes a worker waiting to hand over a frame and, once the worker
/// exits, unblocks a `read_frame` waiting on it. It does not join the worker;
/// the owning reader still does that in `close`.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    commands: Sender<WorkerCommand>,
}

impl ShutdownHandle {
    pub(crate) fn new(side: &CallerSide) -> Self {
        Self {
            stop: side.stop.clone(),
            commands: side.commands.clone(),
        }
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        // The worker may already be gone.
        let _ = self.commands.send(WorkerCommand::Stop);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}
