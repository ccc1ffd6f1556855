use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Select, TryRecvError};

use crate::reader::shared_state::{EndReason, FrameSlot, SlotPayload, WorkerCommand, WorkerSide};
use crate::shared::constants::DECODE_THREAD_NAME;
use crate::video::domain::pixel_converter::PixelConverter;
use crate::video::domain::video_codec::VideoCodec;

/// Worker lifecycle: `Idle → Decoding → FrameReady → … | Stopped`.
enum WorkerState {
    /// Nothing to produce until a command arrives (after end of stream).
    Idle,
    Decoding,
    /// A slot is produced and waits for the caller to take it.
    FrameReady(FrameSlot),
    Stopped,
}

enum Offered {
    /// The caller took the slot (`false`: the caller is gone).
    Taken(bool),
    /// A command arrived first (`None`: the caller is gone).
    Interrupted(Option<WorkerCommand>),
}

/// Background decoder producing one frame ahead of the reader's cursor.
///
/// Owns the codec exclusively; the reader repositions it only by sending
/// [`WorkerCommand::Seek`].
pub(crate) struct DecodeWorker {
    codec: Box<dyn VideoCodec>,
    converter: Arc<dyn PixelConverter>,
    link: WorkerSide,
    /// Index of the frame the next grab produces.
    position: usize,
    generation: u64,
}

impl DecodeWorker {
    pub fn new(
        codec: Box<dyn VideoCodec>,
        converter: Arc<dyn PixelConverter>,
        link: WorkerSide,
    ) -> Self {
        Self {
            codec,
            converter,
            link,
            position: 0,
            generation: 0,
        }
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(DECODE_THREAD_NAME.to_string())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        log::debug!("Decode worker started");
        let mut state = WorkerState::Decoding;
        loop {
            state = match state {
                WorkerState::Idle => self.wait_for_command(),
                WorkerState::Decoding => self.decode(),
                WorkerState::FrameReady(slot) => self.offer(slot),
                WorkerState::Stopped => break,
            };
        }
        self.codec.close();
        log::debug!("Decode worker stopped at frame {}", self.position);
    }

    fn decode(&mut self) -> WorkerState {
        if let Some(next) = self.drain_commands() {
            return next;
        }
        if self.link.stop_requested() {
            return WorkerState::Stopped;
        }

        let index = self.position;
        if !self.codec.grab() {
            return if self.link.stop_requested() {
                WorkerState::Stopped
            } else {
                self.end_slot(index, EndReason::Exhausted)
            };
        }
        // The codec may be closing; never materialize against it.
        if self.link.stop_requested() {
            return WorkerState::Stopped;
        }

        let converted = self
            .codec
            .retrieve()
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.converter
                    .convert(&raw, index)
                    .map_err(|e| e.to_string())
            });

        match converted {
            Ok(frame) => {
                self.position = index + 1;
                WorkerState::FrameReady(FrameSlot {
                    generation: self.generation,
                    index,
                    payload: SlotPayload::Frame(frame),
                })
            }
            Err(message) => {
                log::warn!("Failed to decode frame {index}: {message}");
                self.end_slot(index, EndReason::DecodeFailed(message))
            }
        }
    }

    /// Hands the slot to the caller while staying responsive to commands.
    fn offer(&mut self, slot: FrameSlot) -> WorkerState {
        if let Some(next) = self.drain_commands() {
            return next;
        }
        if self.link.stop_requested() {
            return WorkerState::Stopped;
        }

        let ended = matches!(slot.payload, SlotPayload::End(_));
        let offered = {
            let mut sel = Select::new();
            let send_op = sel.send(&self.link.slots);
            sel.recv(&self.link.commands);
            let oper = sel.select();
            if oper.index() == send_op {
                Offered::Taken(oper.send(&self.link.slots, slot).is_ok())
            } else {
                Offered::Interrupted(oper.recv(&self.link.commands).ok())
            }
        };

        match offered {
            Offered::Taken(false) | Offered::Interrupted(None) => WorkerState::Stopped,
            Offered::Taken(true) if ended => WorkerState::Idle,
            Offered::Taken(true) => WorkerState::Decoding,
            Offered::Interrupted(Some(command)) => self.handle(command),
        }
    }

    fn wait_for_command(&mut self) -> WorkerState {
        match self.link.commands.recv() {
            Ok(command) => self.handle(command),
            Err(_) => WorkerState::Stopped,
        }
    }

    /// Handles a received command together with anything queued behind it.
    fn handle(&mut self, command: WorkerCommand) -> WorkerState {
        match command {
            WorkerCommand::Stop => WorkerState::Stopped,
            seek => self.drain_from(Some(seek)).unwrap_or(WorkerState::Decoding),
        }
    }

    /// Applies queued commands without blocking.
    fn drain_commands(&mut self) -> Option<WorkerState> {
        self.drain_from(None)
    }

    /// Only the newest seek matters, so earlier ones are skipped instead of
    /// repositioning the codec for each.
    fn drain_from(&mut self, mut latest: Option<WorkerCommand>) -> Option<WorkerState> {
        loop {
            match self.link.commands.try_recv() {
                Ok(WorkerCommand::Stop) | Err(TryRecvError::Disconnected) => {
                    return Some(WorkerState::Stopped)
                }
                Ok(seek @ WorkerCommand::Seek { .. }) => latest = Some(seek),
                Err(TryRecvError::Empty) => break,
            }
        }
        latest.map(|command| self.apply(command))
    }

    fn apply(&mut self, command: WorkerCommand) -> WorkerState {
        match command {
            WorkerCommand::Stop => WorkerState::Stopped,
            WorkerCommand::Seek { generation, index } => {
                log::debug!("Seeking to frame {index} (generation {generation})");
                self.generation = generation;
                self.position = index;
                match self.codec.set_position(index) {
                    Ok(()) => WorkerState::Decoding,
                    Err(e) => {
                        log::warn!("Failed to seek to frame {index}: {e}");
                        self.end_slot(index, EndReason::DecodeFailed(e.to_string()))
                    }
                }
            }
        }
    }

    fn end_slot(&self, index: usize, reason: EndReason) -> WorkerState {
        WorkerState::FrameReady(FrameSlot {
            generation: self.generation,
            index,
            payload: SlotPayload::End(reason),
        })
    }
}
