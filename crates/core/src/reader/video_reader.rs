use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;

use crate::reader::decode_worker::DecodeWorker;
use crate::reader::seek_coordinator::SeekCoordinator;
use crate::reader::shared_state::{
    shared_state, CallerSide, EndReason, ShutdownHandle, SlotPayload, WorkerCommand,
};
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::pixel_converter::PixelConverter;
use crate::video::domain::video_codec::{CodecError, VideoCodec};

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("failed to open video {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("failed to start decode thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Creates a fresh, unopened codec for each `open`.
pub type CodecFactory = Box<dyn Fn() -> Box<dyn VideoCodec> + Send>;

/// Reads video frames in order while a background thread decodes one frame
/// ahead.
///
/// `read_frame` hands over the frame at the current cursor and lets the worker
/// start on the next one. Moving the cursor with `set_current_frame_index`
/// repositions the worker lazily, on the next read.
///
/// All methods take the reader by reference from a single owning thread. Use
/// [`ShutdownHandle`] to stop a session from elsewhere.
pub struct VideoReader {
    codec_factory: CodecFactory,
    converter: Arc<dyn PixelConverter>,
    metadata: Option<VideoMetadata>,
    read_pos: usize,
    end_reason: Option<EndReason>,
    session: Option<Session>,
}

struct Session {
    link: CallerSide,
    seek: SeekCoordinator,
    worker: JoinHandle<()>,
    /// The worker exited; nothing more will arrive.
    disconnected: bool,
}

impl VideoReader {
    pub fn new<F, C>(make_codec: F, converter: Arc<dyn PixelConverter>) -> Self
    where
        F: Fn() -> C + Send + 'static,
        C: VideoCodec + 'static,
    {
        Self::from_factory(
            Box::new(move || Box::new(make_codec()) as Box<dyn VideoCodec>),
            converter,
        )
    }

    pub fn from_factory(codec_factory: CodecFactory, converter: Arc<dyn PixelConverter>) -> Self {
        Self {
            codec_factory,
            converter,
            metadata: None,
            read_pos: 0,
            end_reason: None,
            session: None,
        }
    }

    /// Opens `path` and starts decoding its first frame in the background.
    ///
    /// Any previous session is closed first. On error the reader stays closed.
    pub fn open(&mut self, path: &Path) -> Result<&VideoMetadata, ReaderError> {
        self.close();

        let mut codec = (self.codec_factory)();
        codec.open(path).map_err(|source| ReaderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = VideoMetadata::from_codec(codec.as_ref(), path.to_path_buf());

        let (link, worker_side) = shared_state();
        let worker = DecodeWorker::new(codec, self.converter.clone(), worker_side)
            .spawn()
            .map_err(ReaderError::Spawn)?;

        log::info!(
            "Opened {}: {}x{} @ {:.2} fps, {} frames",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.frame_count
        );

        self.session = Some(Session {
            link,
            seek: SeekCoordinator::new(),
            worker,
            disconnected: false,
        });
        Ok(self.metadata.insert(metadata))
    }

    /// Stops and joins the decode worker and resets the reader.
    ///
    /// Safe to call repeatedly or on a reader that was never opened. Waits
    /// for a backend call already in progress to return.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            let Session { link, worker, .. } = session;
            link.stop.store(true, Ordering::Release);
            let _ = link.commands.send(WorkerCommand::Stop);
            // Dropping the receiver fails any hand-off the worker is attempting.
            drop(link);

            if worker.join().is_err() {
                log::error!("Decode worker panicked");
            }
            if let Some(metadata) = &self.metadata {
                log::info!("Closed {}", metadata.source_path.display());
            }
        }
        self.metadata = None;
        self.read_pos = 0;
        self.end_reason = None;
    }

    /// Returns a handle that can stop this session from another thread, or
    /// `None` when not open.
    pub fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        self.session
            .as_ref()
            .map(|session| ShutdownHandle::new(&session.link))
    }

    /// Returns the frame at the cursor and advances the cursor.
    ///
    /// Blocks until the worker has the frame. Returns `None` when not open,
    /// once the cursor reaches the end of the stream, or after a decode
    /// failure at the cursor (see [`end_reason`](Self::end_reason)).
    pub fn read_frame(&mut self) -> Option<Frame> {
        let frame_count = self.frame_count();
        let session = self.session.as_mut()?;

        if self.end_reason.is_some() {
            return None;
        }
        if session.disconnected || session.link.stop.load(Ordering::Acquire) {
            self.end_reason = Some(EndReason::Stopped);
            return None;
        }
        if frame_count > 0 && self.read_pos >= frame_count {
            self.end_reason = Some(EndReason::Exhausted);
            return None;
        }

        session.seek.reconcile(self.read_pos, &session.link.commands);

        loop {
            let Ok(slot) = session.link.slots.recv() else {
                log::debug!("Decode worker exited while frame {} was pending", self.read_pos);
                session.disconnected = true;
                self.end_reason = Some(EndReason::Stopped);
                return None;
            };
            if !session.seek.is_current(&slot) {
                log::trace!("Dropping stale frame {}", slot.index);
                continue;
            }
            debug_assert_eq!(slot.index, self.read_pos);

            return match slot.payload {
                SlotPayload::Frame(frame) => {
                    session.seek.consumed(slot.index);
                    self.read_pos = slot.index + 1;
                    Some(frame)
                }
                SlotPayload::End(reason) => {
                    session.seek.ended();
                    self.end_reason = Some(reason);
                    None
                }
            };
        }
    }

    /// Moves the cursor; the next `read_frame` returns frame `index`.
    ///
    /// `index` is clamped to `[0, frame_count]` when the frame count is known.
    /// A stopped session stays stopped.
    pub fn set_current_frame_index(&mut self, index: usize) {
        if !self.is_open() {
            return;
        }
        let frame_count = self.frame_count();
        self.read_pos = if frame_count > 0 {
            index.min(frame_count)
        } else {
            index
        };
        if self.end_reason != Some(EndReason::Stopped) {
            self.end_reason = None;
        }
    }

    pub fn current_frame_index(&self) -> usize {
        self.read_pos
    }

    /// Fraction of the stream already read, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self.frame_count() {
            0 => 0.0,
            count => self.read_pos as f64 / count as f64,
        }
    }

    /// Time of the frame at the cursor, in seconds.
    pub fn pos_sec(&self) -> f64 {
        match self.fps() {
            fps if fps > 0.0 => self.read_pos as f64 / fps,
            _ => 0.0,
        }
    }

    pub fn reached_end(&self) -> bool {
        if !self.is_open() {
            return false;
        }
        let frame_count = self.frame_count();
        self.end_reason.is_some() || (frame_count > 0 && self.read_pos >= frame_count)
    }

    /// Why reading stopped at the cursor, if it did.
    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        self.metadata
            .as_ref()
            .map_or((0, 0), |meta| (meta.width, meta.height))
    }

    pub fn fps(&self) -> f64 {
        self.metadata.as_ref().map_or(0.0, |meta| meta.fps)
    }

    pub fn frame_count(&self) -> usize {
        self.metadata.as_ref().map_or(0, |meta| meta.frame_count)
    }

    pub fn length_sec(&self) -> f64 {
        self.metadata.as_ref().map_or(0.0, VideoMetadata::length_sec)
    }

    pub fn frame_delta_sec(&self) -> f64 {
        self.metadata
            .as_ref()
            .map_or(0.0, VideoMetadata::frame_delta_sec)
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.metadata
            .as_ref()
            .map(|meta| meta.source_path.as_path())
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        self.metadata.as_ref()
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        self.close();
    }
}
