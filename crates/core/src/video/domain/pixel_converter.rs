use thiserror::Error;

use crate::shared::frame::Frame;
use crate::video::domain::raw_frame::{PixelLayout, RawFrame};

#[derive(Error, Debug, PartialEq)]
pub enum ConvertError {
    #[error("raw {layout:?} frame {width}x{height} needs {expected} bytes, got {actual}")]
    BufferTooSmall {
        layout: PixelLayout,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("row stride {stride} is shorter than a {width}-pixel {layout:?} row")]
    InvalidStride {
        layout: PixelLayout,
        width: u32,
        stride: usize,
    },
}

/// Converts a backend-native frame into the engine's image representation.
///
/// Shared by every decode worker a reader spawns, so implementations must be
/// stateless or internally synchronized.
pub trait PixelConverter: Send + Sync {
    fn convert(&self, raw: &RawFrame, index: usize) -> Result<Frame, ConvertError>;
}
