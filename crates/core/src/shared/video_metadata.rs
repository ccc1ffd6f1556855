use std::path::PathBuf;

use crate::video::domain::video_codec::{CodecProperty, VideoCodec};

/// Immutable properties of an opened video source.
///
/// `frame_count == 0` means the backend could not determine the length (or the
/// source is empty); callers treat it as "unknown".
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: usize,
    pub source_path: PathBuf,
}

impl VideoMetadata {
    /// Reads the stream properties from an opened codec.
    pub fn from_codec(codec: &dyn VideoCodec, source_path: PathBuf) -> Self {
        Self {
            width: non_negative(codec.property(CodecProperty::Width)) as u32,
            height: non_negative(codec.property(CodecProperty::Height)) as u32,
            fps: non_negative(codec.property(CodecProperty::Fps)),
            frame_count: non_negative(codec.property(CodecProperty::FrameCount)) as usize,
            source_path,
        }
    }

    /// Total duration in seconds, or 0 when fps is unknown.
    pub fn length_sec(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Duration of a single frame in seconds, or 0 when fps is unknown.
    pub fn frame_delta_sec(&self) -> f64 {
        if self.fps > 0.0 {
            1.0 / self.fps
        } else {
            0.0
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
