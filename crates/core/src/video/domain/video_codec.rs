use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::video::domain::raw_frame::RawFrame;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("no video stream found in {0}")]
    NoVideoStream(PathBuf),
    #[error("codec is not open")]
    NotOpen,
    #[error("retrieve called without a grabbed frame")]
    NothingGrabbed,
    #[error("failed to seek to frame {index}: {source}")]
    Seek {
        index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("decode failed: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Stream properties a codec reports after a successful `open`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecProperty {
    Width,
    Height,
    Fps,
    FrameCount,
}

/// Demuxer/decoder backend driven by the decode worker.
///
/// The grab/retrieve split lets the worker advance the stream and check for
/// shutdown before paying for pixel materialization. A codec is owned by one
/// thread at a time, hence `Send` but not `Sync`.
pub trait VideoCodec: Send {
    /// Opens the source. Properties are valid only after this succeeds.
    fn open(&mut self, path: &Path) -> Result<(), CodecError>;

    /// Advances the stream by one frame. Returns `false` at end of stream or
    /// on any decode error.
    fn grab(&mut self) -> bool;

    /// Materializes the frame produced by the last successful `grab`.
    fn retrieve(&mut self) -> Result<RawFrame, CodecError>;

    /// Repositions so that the next `grab` yields `frame_index`.
    fn set_position(&mut self, frame_index: usize) -> Result<(), CodecError>;

    /// Returns a stream property; 0 when unknown or not open.
    fn property(&self, property: CodecProperty) -> f64;

    /// Releases the backend. Must be safe to call more than once.
    fn close(&mut self);
}
