use crossbeam_channel::Sender;

use crate::reader::shared_state::{FrameSlot, WorkerCommand};

/// Caller-side bookkeeping that keeps the worker's decode target in step with
/// the reader's cursor.
///
/// Sequential reads never touch the worker. When the cursor jumps, a seek
/// with a fresh generation is sent and every slot still tagged with an older
/// generation is ignored until the worker catches up.
pub(crate) struct SeekCoordinator {
    generation: u64,
    /// Index the worker is producing, or `None` when it must be told again.
    worker_pos: Option<usize>,
}

impl SeekCoordinator {
    pub fn new() -> Self {
        Self {
            generation: 0,
            worker_pos: Some(0),
        }
    }

    /// Sends a seek when `read_pos` differs from the worker's target.
    /// Returns whether one was sent.
    pub fn reconcile(&mut self, read_pos: usize, commands: &Sender<WorkerCommand>) -> bool {
        if self.worker_pos == Some(read_pos) {
            return false;
        }
        self.generation += 1;
        self.worker_pos = Some(read_pos);
        log::debug!(
            "Repositioning decoder to frame {read_pos} (generation {})",
            self.generation
        );
        // A closed channel means the worker is gone; the next receive reports it.
        let _ = commands.send(WorkerCommand::Seek {
            generation: self.generation,
            index: read_pos,
        });
        true
    }

    /// Whether `slot` answers the most recent request.
    pub fn is_current(&self, slot: &FrameSlot) -> bool {
        slot.generation == self.generation
    }

    /// Records that the frame at `index` was consumed.
    pub fn consumed(&mut self, index: usize) {
        self.worker_pos = Some(index + 1);
    }

    /// Records that the worker reached the end and now waits for a command.
    pub fn ended(&mut self) {
        self.worker_pos = None;
    }
}
